use thiserror::Error;

/// Errors surfaced by broker adapters and the manager.
///
/// The taxonomy is fixed: connection/session failures, order precondition
/// or backend-rule violations, and market data lookup failures. Each
/// carries only a message; the core attaches no retry metadata.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Cannot reach, authenticate against, or maintain the backend session.
    #[error("connection error: {0}")]
    Connection(String),

    /// An order precondition or backend rule was violated.
    #[error("order error: {0}")]
    Order(String),

    /// Symbol or market data lookup failed.
    #[error("quote error: {0}")]
    Quote(String),

    /// No adapter is registered for the requested broker type.
    #[error("unsupported broker: {0}")]
    Unsupported(String),

    /// Broker configuration failed template validation.
    #[error("invalid broker config: {0}")]
    Config(String),
}

impl BrokerError {
    pub fn connection(msg: impl Into<String>) -> Self {
        BrokerError::Connection(msg.into())
    }

    pub fn order(msg: impl Into<String>) -> Self {
        BrokerError::Order(msg.into())
    }

    pub fn quote(msg: impl Into<String>) -> Self {
        BrokerError::Quote(msg.into())
    }
}
