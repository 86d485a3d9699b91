use crate::error::BrokerError;
use crate::models::*;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Callback invoked with a fresh batch of quotes on every push tick of a
/// subscription.
pub type QuoteCallback = Arc<dyn Fn(Vec<Quote>) + Send + Sync>;

/// The contract every brokerage backend implements.
///
/// Connection lifecycle: `connect` is valid from `Disconnected` or `Error`
/// and ends in `Connected` (or `Error` on backend rejection); `disconnect`
/// is valid from any state, never fails, and always ends in `Disconnected`,
/// releasing all quote subscriptions and credential material. All trading
/// and market data operations require `Connected` and fail with
/// [`BrokerError::Connection`] otherwise.
///
/// Reads (`account`, `positions`, `orders`, quotes) are side-effect-free
/// and return fresh snapshots; nothing is cached across calls.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Human-readable broker name.
    fn name(&self) -> &str;

    /// Static capabilities, consistent with what the operations actually
    /// accept.
    fn capabilities(&self) -> BrokerCapabilities;

    fn mode(&self) -> TradingMode;

    fn set_mode(&mut self, mode: TradingMode);

    fn state(&self) -> ConnectionState;

    /// Message of the last failure that moved the adapter into `Error`.
    fn last_error(&self) -> Option<&str>;

    /// Validate credentials, authenticate, and establish the session.
    ///
    /// Config validation happens before any state transition: a missing
    /// required field fails with [`BrokerError::Connection`] and leaves the
    /// adapter `Disconnected`. Backend rejection lands in `Error`.
    async fn connect(&mut self) -> Result<(), BrokerError>;

    /// Tear down the session. Cancels every active quote subscription,
    /// drops credential material, and always ends `Disconnected`; internal
    /// failures are logged, never raised.
    async fn disconnect(&mut self);

    /// True iff the adapter holds a usable session. Variants may require
    /// more than `state() == Connected` (e.g. a non-empty session token).
    fn is_connected(&self) -> bool;

    async fn account(&self) -> Result<Account, BrokerError>;

    async fn positions(&self) -> Result<Vec<Position>, BrokerError>;

    /// Orders known to this adapter, optionally filtered by symbol.
    async fn orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, BrokerError>;

    /// Place an order.
    ///
    /// Validates quantity > 0, a limit price when the kind requires one,
    /// and a stop price when the kind requires a trigger; checks funds
    /// (buy) and holdings (sell). Market orders return `Filled` with an
    /// average fill price resolved from the current quote; limit/stop
    /// orders return `Pending` with zero filled quantity. Commission is
    /// computed by the variant's formula and attached.
    async fn place_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        kind: OrderKind,
        quantity: Decimal,
        price: Option<Decimal>,
        stop_price: Option<Decimal>,
    ) -> Result<Order, BrokerError>;

    /// Cancel a pending order. Fails with [`BrokerError::Order`] if the id
    /// is unknown or the order is already terminal.
    async fn cancel_order(&mut self, order_id: &str) -> Result<(), BrokerError>;

    /// Modify a pending order's quantity and/or price, refreshing its
    /// update timestamp. Fails if the id is unknown or the order is not
    /// modifiable.
    async fn modify_order(
        &mut self,
        order_id: &str,
        quantity: Option<Decimal>,
        price: Option<Decimal>,
    ) -> Result<Order, BrokerError>;

    /// Quote for a single symbol; [`BrokerError::Quote`] if the backend
    /// does not know it.
    async fn quote(&self, symbol: &str) -> Result<Quote, BrokerError>;

    /// Batch quote fetch. Fans out to [`Self::quote`] unless the variant
    /// has a true batch path.
    async fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, BrokerError>;

    /// Register a quote subscription and start its periodic push.
    ///
    /// Returns as soon as the subscription is registered; the first push is
    /// scheduled, not synchronous (variants may push once immediately).
    /// Re-subscribing a symbol set that is already active replaces the
    /// prior callback and timer.
    async fn subscribe_quotes(
        &mut self,
        symbols: &[String],
        callback: QuoteCallback,
    ) -> Result<(), BrokerError>;

    /// Stop the subscription matching this symbol set. The backing timer is
    /// stopped before this returns; no further pushes are scheduled.
    /// Unsubscribing a set that was never subscribed is a no-op.
    async fn unsubscribe_quotes(&mut self, symbols: &[String]) -> Result<(), BrokerError>;
}
