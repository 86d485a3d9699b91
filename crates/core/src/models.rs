use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Markets & Trading Mode
// ---------------------------------------------------------------------------

/// A market a broker can route orders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    Us,
    Hk,
    Cn,
    Sg,
    Jp,
    Eu,
}

/// Paper (simulated funds) vs live (real account). Orthogonal to
/// connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    Paper,
    Live,
}

impl TradingMode {
    pub fn is_paper(&self) -> bool {
        matches!(self, TradingMode::Paper)
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// The kind of order. Each adapter supports a variant-dependent subset,
/// reported via [`BrokerCapabilities::order_kinds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderKind {
    /// Whether this kind requires a limit price at placement.
    pub fn requires_price(&self) -> bool {
        matches!(self, OrderKind::Limit | OrderKind::StopLimit)
    }

    /// Whether this kind requires a stop trigger price at placement.
    pub fn requires_stop_price(&self) -> bool {
        matches!(self, OrderKind::Stop | OrderKind::StopLimit)
    }
}

/// The lifecycle state of an order.
///
/// `pending → filled` (fills accumulate into `filled_quantity`, terminal
/// once it reaches `quantity`) or `pending → cancelled`. `Filled` and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

/// An order as known to the adapter that created it. The application only
/// ever holds read-only copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Adapter-assigned identifier.
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub status: OrderStatus,
    pub filled_quantity: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub commission: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

// ---------------------------------------------------------------------------
// Account & Positions
// ---------------------------------------------------------------------------

/// An open position. Derived data: recomputed from the latest adapter
/// snapshot on every fetch, never cached across calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Signed quantity (negative for short).
    pub quantity: Decimal,
    pub avg_cost: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
}

/// Account snapshot, including the current positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub currency: String,
    pub total_value: Decimal,
    pub available_cash: Decimal,
    pub buying_power: Decimal,
    pub day_trading_buying_power: Option<Decimal>,
    pub maintenance_margin: Option<Decimal>,
    pub positions: Vec<Position>,
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

/// An ephemeral market data snapshot. Subscribers receive a fresh value on
/// every push tick; no history is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub volume: u64,
    pub timestamp: DateTime<Utc>,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub bid_size: Option<Decimal>,
    pub ask_size: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Capabilities & Connection
// ---------------------------------------------------------------------------

/// Static declaration of what an adapter supports. Fixed at construction;
/// callers may branch on these flags without touching the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerCapabilities {
    pub markets: Vec<Market>,
    pub order_kinds: Vec<OrderKind>,
    pub auto_trading: bool,
    pub paper_trading: bool,
    pub real_time_data: bool,
    pub options_trading: bool,
    pub crypto_trading: bool,
    pub margin_trading: bool,
    pub fractional_shares: bool,
}

impl BrokerCapabilities {
    pub fn supports_kind(&self, kind: OrderKind) -> bool {
        self.order_kinds.contains(&kind)
    }

    pub fn supports_market(&self, market: Market) -> bool {
        self.markets.contains(&market)
    }
}

/// Connection state machine:
/// `disconnected → connecting → connected → disconnected`, with `error`
/// reachable from `connecting`/`connected` on any failure. There is no
/// reconnecting state; callers re-invoke `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

// ---------------------------------------------------------------------------
// Broker Config
// ---------------------------------------------------------------------------

/// Untyped broker configuration: a string-keyed map of JSON values, the
/// shape every adapter is constructed from. Field meaning is declared per
/// broker type by its config template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig(pub serde_json::Map<String, serde_json::Value>);

impl BrokerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and scripted setup.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// String field, `None` if absent or not a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Numeric field, accepting either a JSON number or a numeric string
    /// (config UIs submit both).
    pub fn number_field(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// True when the field is missing, null, or a blank string.
    pub fn is_blank(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_status_terminality() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
    }

    #[test]
    fn test_order_kind_price_requirements() {
        assert!(OrderKind::Limit.requires_price());
        assert!(OrderKind::StopLimit.requires_price());
        assert!(!OrderKind::Market.requires_price());
        assert!(OrderKind::Stop.requires_stop_price());
        assert!(OrderKind::StopLimit.requires_stop_price());
        assert!(!OrderKind::Limit.requires_stop_price());
    }

    #[test]
    fn test_config_field_access() {
        let config = BrokerConfig::new()
            .with("apiKey", "ft_demo")
            .with("port", 11111)
            .with("host", "  ");

        assert_eq!(config.str_field("apiKey"), Some("ft_demo"));
        assert_eq!(config.number_field("port"), Some(11111.0));
        assert!(config.is_blank("host"));
        assert!(config.is_blank("account"));
        assert!(!config.is_blank("apiKey"));
    }

    #[test]
    fn test_config_numeric_string() {
        let config = BrokerConfig::new().with("port", "7497");
        assert_eq!(config.number_field("port"), Some(7497.0));
        assert_eq!(config.number_field("missing"), None);
    }

    #[test]
    fn test_order_activity() {
        let order = Order {
            id: "X1".to_string(),
            symbol: "AAPL".to_string(),
            side: OrderSide::Buy,
            kind: OrderKind::Limit,
            quantity: dec!(10),
            price: Some(dec!(210)),
            stop_price: None,
            status: OrderStatus::Pending,
            filled_quantity: Decimal::ZERO,
            avg_fill_price: None,
            commission: Decimal::ZERO,
            created_at: Utc::now(),
            updated_at: None,
        };
        assert!(order.is_active());
    }

    #[test]
    fn test_market_serde_wire_form() {
        assert_eq!(serde_json::to_string(&Market::Us).unwrap(), "\"US\"");
        assert_eq!(serde_json::to_string(&Market::Hk).unwrap(), "\"HK\"");
        let back: Market = serde_json::from_str("\"SG\"").unwrap();
        assert_eq!(back, Market::Sg);
    }
}
