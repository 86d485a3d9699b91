//! Futu broker adapter.
//!
//! Simulated backend: authentication is a structural check on the API key
//! (`ft_` prefix stands in for the real OpenAPI handshake), account data
//! depends on the trading mode, and every operation pays a fixed simulated
//! round trip.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use tradedesk_brokers_common::{
    network_delay, next_order_id, spawn_quote_push, subscription_key, validate_order_request,
    OrderStore, QuoteTable, SubscriptionRegistry,
};
use tradedesk_core::*;

mod latency {
    pub const HANDSHAKE_MS: u64 = 1000;
    pub const AUTH_MS: u64 = 500;
    pub const STREAM_MS: u64 = 300;
    pub const ACCOUNT_MS: u64 = 200;
    pub const POSITIONS_MS: u64 = 150;
    pub const ORDERS_MS: u64 = 100;
    pub const PLACE_MS: u64 = 300;
    pub const CANCEL_MS: u64 = 200;
    pub const MODIFY_MS: u64 = 250;
    pub const QUOTE_MS: u64 = 100;
    pub const PUSH_INTERVAL_MS: u64 = 1000;
}

/// Per-tick drift bound for pushed quotes.
fn push_volatility(_symbol: &str) -> f64 {
    0.005
}

pub struct FutuAdapter {
    config: BrokerConfig,
    mode: TradingMode,
    state: ConnectionState,
    last_error: Option<String>,
    /// Stand-in for the streaming channel the real OpenAPI gateway keeps.
    stream_open: bool,
    quote_table: QuoteTable,
    orders: OrderStore,
    subscriptions: SubscriptionRegistry,
}

impl FutuAdapter {
    pub fn new(config: BrokerConfig, mode: TradingMode) -> Self {
        Self {
            config,
            mode,
            state: ConnectionState::Disconnected,
            last_error: None,
            stream_open: false,
            quote_table: Arc::new(quote_table()),
            orders: OrderStore::new(),
            subscriptions: SubscriptionRegistry::new(),
        }
    }

    fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
        self.state = ConnectionState::Error;
    }

    fn ensure_connected(&self) -> Result<(), BrokerError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BrokerError::connection("not connected to Futu"))
        }
    }

    fn current_price(&self, symbol: &str) -> Result<Decimal, BrokerError> {
        self.quote_table
            .get(symbol)
            .map(|q| q.price)
            .ok_or_else(|| BrokerError::quote(format!("unknown symbol: {symbol}")))
    }

    /// Commission: 0.03% of notional with a $0.99 floor.
    fn commission(&self, quantity: Decimal, price: Decimal) -> Decimal {
        let notional = quantity * price;
        (notional * dec!(0.0003)).max(dec!(0.99)).round_dp(2)
    }

    fn account_snapshot(&self) -> Account {
        let paper = self.mode.is_paper();
        Account {
            id: self
                .config
                .str_field("account")
                .unwrap_or("DU1234567")
                .to_string(),
            name: if paper {
                "Futu Paper Account".to_string()
            } else {
                "Futu Live Account".to_string()
            },
            currency: "USD".to_string(),
            total_value: if paper { dec!(100000) } else { dec!(50000) },
            available_cash: if paper { dec!(85000) } else { dec!(25000) },
            buying_power: if paper { dec!(170000) } else { dec!(50000) },
            day_trading_buying_power: Some(if paper { dec!(340000) } else { dec!(100000) }),
            maintenance_margin: None,
            positions: self.position_snapshot(),
        }
    }

    fn position_snapshot(&self) -> Vec<Position> {
        if self.mode.is_paper() {
            vec![
                position("AAPL", dec!(100), dec!(210.50), dec!(215.30), dec!(0)),
                position("TSLA", dec!(50), dec!(185.00), dec!(195.20), dec!(0)),
            ]
        } else {
            vec![position("AAPL", dec!(50), dec!(208.00), dec!(215.30), dec!(120))]
        }
    }

    /// Historical orders the backend reports on a fresh session.
    fn seed_orders(&mut self) {
        self.orders.insert(Order {
            id: "FT20250824001".to_string(),
            symbol: "AAPL".to_string(),
            side: OrderSide::Buy,
            kind: OrderKind::Limit,
            quantity: dec!(100),
            price: Some(dec!(210.50)),
            stop_price: None,
            status: OrderStatus::Filled,
            filled_quantity: dec!(100),
            avg_fill_price: Some(dec!(210.50)),
            commission: dec!(1.5),
            created_at: Utc::now(),
            updated_at: Some(Utc::now()),
        });
        self.orders.insert(Order {
            id: "FT20250824002".to_string(),
            symbol: "TSLA".to_string(),
            side: OrderSide::Sell,
            kind: OrderKind::Limit,
            quantity: dec!(50),
            price: Some(dec!(198.00)),
            stop_price: None,
            status: OrderStatus::Pending,
            filled_quantity: Decimal::ZERO,
            avg_fill_price: None,
            commission: Decimal::ZERO,
            created_at: Utc::now(),
            updated_at: None,
        });
    }
}

#[async_trait]
impl BrokerAdapter for FutuAdapter {
    fn name(&self) -> &str {
        "Futu"
    }

    fn capabilities(&self) -> BrokerCapabilities {
        BrokerCapabilities {
            markets: vec![Market::Us, Market::Hk, Market::Cn],
            order_kinds: vec![OrderKind::Market, OrderKind::Limit],
            auto_trading: true,
            paper_trading: true,
            real_time_data: true,
            options_trading: true,
            crypto_trading: false,
            margin_trading: true,
            fractional_shares: false,
        }
    }

    fn mode(&self) -> TradingMode {
        self.mode
    }

    fn set_mode(&mut self, mode: TradingMode) {
        self.mode = mode;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    async fn connect(&mut self) -> Result<(), BrokerError> {
        // Local credential validation happens before any state change.
        if self.config.is_blank("apiKey") || self.config.is_blank("host") {
            return Err(BrokerError::connection("api key or host not configured"));
        }

        self.state = ConnectionState::Connecting;
        network_delay(latency::HANDSHAKE_MS).await;

        network_delay(latency::AUTH_MS).await;
        let authenticated = self
            .config
            .str_field("apiKey")
            .is_some_and(|key| key.starts_with("ft_"));
        if !authenticated {
            let message = "authentication rejected: check the api key";
            self.set_error(message);
            return Err(BrokerError::connection(message));
        }

        // Open the streaming channel.
        network_delay(latency::STREAM_MS).await;
        self.stream_open = true;

        self.seed_orders();
        self.last_error = None;
        self.state = ConnectionState::Connected;
        info!(mode = ?self.mode, "connected to Futu");
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.subscriptions.clear();
        self.stream_open = false;
        self.state = ConnectionState::Disconnected;
        info!("disconnected from Futu");
    }

    fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.stream_open
    }

    async fn account(&self) -> Result<Account, BrokerError> {
        self.ensure_connected()?;
        network_delay(latency::ACCOUNT_MS).await;
        Ok(self.account_snapshot())
    }

    async fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        self.ensure_connected()?;
        network_delay(latency::POSITIONS_MS).await;
        Ok(self.position_snapshot())
    }

    async fn orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, BrokerError> {
        self.ensure_connected()?;
        network_delay(latency::ORDERS_MS).await;
        Ok(self.orders.snapshot(symbol))
    }

    async fn place_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        kind: OrderKind,
        quantity: Decimal,
        price: Option<Decimal>,
        stop_price: Option<Decimal>,
    ) -> Result<Order, BrokerError> {
        self.ensure_connected()?;
        validate_order_request(&self.capabilities(), symbol, kind, quantity, price, stop_price)?;

        network_delay(latency::PLACE_MS).await;

        // Holdings are checked before any price resolution: selling a
        // symbol the account does not hold fails the same way whether or
        // not the backend quotes it.
        if side == OrderSide::Sell {
            let held = self
                .position_snapshot()
                .iter()
                .find(|p| p.symbol == symbol)
                .map(|p| p.quantity)
                .unwrap_or(Decimal::ZERO);
            if held < quantity {
                return Err(BrokerError::order("insufficient holdings"));
            }
        }

        let market_price = self
            .current_price(symbol)
            .map_err(|_| BrokerError::order(format!("unknown symbol: {symbol}")))?;
        let reference_price = price.unwrap_or(market_price);

        if side == OrderSide::Buy {
            let notional = quantity * reference_price;
            if notional > self.account_snapshot().available_cash {
                return Err(BrokerError::order("insufficient funds"));
            }
        }

        let filled = kind == OrderKind::Market;
        let order = Order {
            id: next_order_id("FT"),
            symbol: symbol.to_string(),
            side,
            kind,
            quantity,
            price,
            stop_price,
            status: if filled {
                OrderStatus::Filled
            } else {
                OrderStatus::Pending
            },
            filled_quantity: if filled { quantity } else { Decimal::ZERO },
            avg_fill_price: filled.then_some(reference_price),
            commission: self.commission(quantity, reference_price),
            created_at: Utc::now(),
            updated_at: None,
        };

        self.orders.insert(order.clone());
        info!(symbol, ?side, ?kind, %quantity, order_id = %order.id, "order placed");
        Ok(order)
    }

    async fn cancel_order(&mut self, order_id: &str) -> Result<(), BrokerError> {
        self.ensure_connected()?;
        network_delay(latency::CANCEL_MS).await;
        self.orders.cancel(order_id)?;
        info!(order_id, "order cancelled");
        Ok(())
    }

    async fn modify_order(
        &mut self,
        order_id: &str,
        quantity: Option<Decimal>,
        price: Option<Decimal>,
    ) -> Result<Order, BrokerError> {
        self.ensure_connected()?;
        network_delay(latency::MODIFY_MS).await;
        let order = self.orders.modify(order_id, quantity, price)?;
        info!(order_id, "order modified");
        Ok(order)
    }

    async fn quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
        self.ensure_connected()?;
        network_delay(latency::QUOTE_MS).await;
        let base = self
            .quote_table
            .get(symbol)
            .ok_or_else(|| BrokerError::quote(format!("unknown symbol: {symbol}")))?;
        Ok(tradedesk_brokers_common::drift_quote(base, 0.0))
    }

    async fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, BrokerError> {
        let mut quotes = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            quotes.push(self.quote(symbol).await?);
        }
        Ok(quotes)
    }

    async fn subscribe_quotes(
        &mut self,
        symbols: &[String],
        callback: QuoteCallback,
    ) -> Result<(), BrokerError> {
        self.ensure_connected()?;
        for symbol in symbols {
            if !self.quote_table.contains_key(symbol) {
                return Err(BrokerError::quote(format!("unknown symbol: {symbol}")));
            }
        }

        let key = subscription_key(symbols);
        let handle = spawn_quote_push(
            Arc::clone(&self.quote_table),
            symbols.to_vec(),
            Duration::from_millis(latency::PUSH_INTERVAL_MS),
            false,
            push_volatility,
            callback,
        );
        self.subscriptions.insert(key.clone(), handle);
        info!(key = %key, "quote subscription started");
        Ok(())
    }

    async fn unsubscribe_quotes(&mut self, symbols: &[String]) -> Result<(), BrokerError> {
        let key = subscription_key(symbols);
        if !self.subscriptions.remove(&key) {
            warn!(key = %key, "unsubscribe for unknown subscription key");
        }
        Ok(())
    }
}

fn position(
    symbol: &str,
    quantity: Decimal,
    avg_cost: Decimal,
    current_price: Decimal,
    realized_pnl: Decimal,
) -> Position {
    Position {
        symbol: symbol.to_string(),
        quantity,
        avg_cost,
        current_price,
        market_value: (quantity * current_price).round_dp(2),
        unrealized_pnl: (quantity * (current_price - avg_cost)).round_dp(2),
        realized_pnl,
    }
}

fn quote_table() -> HashMap<String, Quote> {
    let mut table = HashMap::new();
    table.insert(
        "AAPL".to_string(),
        Quote {
            symbol: "AAPL".to_string(),
            price: dec!(215.30),
            change: dec!(4.80),
            change_percent: dec!(2.28),
            volume: 45_623_000,
            timestamp: Utc::now(),
            bid: Some(dec!(215.25)),
            ask: Some(dec!(215.35)),
            bid_size: Some(dec!(100)),
            ask_size: Some(dec!(200)),
        },
    );
    table.insert(
        "TSLA".to_string(),
        Quote {
            symbol: "TSLA".to_string(),
            price: dec!(195.20),
            change: dec!(-2.15),
            change_percent: dec!(-1.09),
            volume: 98_234_000,
            timestamp: Utc::now(),
            bid: Some(dec!(195.15)),
            ask: Some(dec!(195.25)),
            bid_size: Some(dec!(150)),
            ask_size: Some(dec!(100)),
        },
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn demo_config() -> BrokerConfig {
        BrokerConfig::new()
            .with("apiKey", "ft_demo")
            .with("host", "openapi.futunn.com")
            .with("port", 11111)
            .with("account", "DU1")
    }

    async fn connected_adapter() -> FutuAdapter {
        let mut adapter = FutuAdapter::new(demo_config(), TradingMode::Paper);
        adapter.connect().await.unwrap();
        adapter
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_without_api_key_stays_disconnected() {
        let config = BrokerConfig::new().with("host", "openapi.futunn.com");
        let mut adapter = FutuAdapter::new(config, TradingMode::Paper);

        let err = adapter.connect().await.unwrap_err();
        assert!(matches!(err, BrokerError::Connection(_)));
        assert_eq!(adapter.state(), ConnectionState::Disconnected);
        assert!(!adapter.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_rejected_key_lands_in_error_state() {
        let config = BrokerConfig::new()
            .with("apiKey", "wrong_prefix")
            .with("host", "openapi.futunn.com");
        let mut adapter = FutuAdapter::new(config, TradingMode::Paper);

        let err = adapter.connect().await.unwrap_err();
        assert!(matches!(err, BrokerError::Connection(_)));
        assert_eq!(adapter.state(), ConnectionState::Error);
        assert!(adapter.last_error().is_some());

        // disconnect must still work from the error state
        adapter.disconnect().await;
        assert_eq!(adapter.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_error() {
        let config = BrokerConfig::new()
            .with("apiKey", "bad")
            .with("host", "openapi.futunn.com");
        let mut adapter = FutuAdapter::new(config, TradingMode::Paper);
        assert!(adapter.connect().await.is_err());

        adapter.config = demo_config();
        adapter.connect().await.unwrap();
        assert!(adapter.is_connected());
        assert!(adapter.last_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paper_account_baseline() {
        let adapter = connected_adapter().await;
        let account = adapter.account().await.unwrap();
        assert_eq!(account.available_cash, dec!(85000));
        assert_eq!(account.total_value, dec!(100000));
        assert_eq!(account.positions.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_require_connection() {
        let adapter = FutuAdapter::new(demo_config(), TradingMode::Paper);
        assert!(matches!(
            adapter.account().await.unwrap_err(),
            BrokerError::Connection(_)
        ));
        assert!(matches!(
            adapter.quote("AAPL").await.unwrap_err(),
            BrokerError::Connection(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_market_buy_fills_immediately() {
        let mut adapter = connected_adapter().await;
        let order = adapter
            .place_order("AAPL", OrderSide::Buy, OrderKind::Market, dec!(10), None, None)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_quantity, dec!(10));
        assert!(order.avg_fill_price.is_some());
        assert!(order.commission > Decimal::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_order_stays_pending() {
        let mut adapter = connected_adapter().await;
        let order = adapter
            .place_order(
                "AAPL",
                OrderSide::Buy,
                OrderKind::Limit,
                dec!(10),
                Some(dec!(210)),
                None,
            )
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.filled_quantity, Decimal::ZERO);
        assert!(order.avg_fill_price.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_quantity_creates_no_order() {
        let mut adapter = connected_adapter().await;
        let before = adapter.orders(None).await.unwrap().len();

        let err = adapter
            .place_order("AAPL", OrderSide::Buy, OrderKind::Market, dec!(0), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Order(_)));

        assert_eq!(adapter.orders(None).await.unwrap().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_order_kind_rejected() {
        let mut adapter = connected_adapter().await;
        let err = adapter
            .place_order(
                "AAPL",
                OrderSide::Buy,
                OrderKind::Stop,
                dec!(10),
                None,
                Some(dec!(200)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Order(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_buy_beyond_cash_rejected() {
        let mut adapter = connected_adapter().await;
        // 1000 shares * 215.30 is far beyond the 85k paper cash
        let err = adapter
            .place_order("AAPL", OrderSide::Buy, OrderKind::Market, dec!(1000), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Order(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sell_more_than_held_rejected() {
        let mut adapter = connected_adapter().await;
        // paper account holds 100 AAPL
        let err = adapter
            .place_order("AAPL", OrderSide::Sell, OrderKind::Market, dec!(500), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Order(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending_then_terminal() {
        let mut adapter = connected_adapter().await;
        let order = adapter
            .place_order(
                "TSLA",
                OrderSide::Buy,
                OrderKind::Limit,
                dec!(5),
                Some(dec!(190)),
                None,
            )
            .await
            .unwrap();

        adapter.cancel_order(&order.id).await.unwrap();
        let err = adapter.cancel_order(&order.id).await.unwrap_err();
        assert!(matches!(err, BrokerError::Order(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_filled_order_rejected() {
        let mut adapter = connected_adapter().await;
        let order = adapter
            .place_order("AAPL", OrderSide::Buy, OrderKind::Market, dec!(1), None, None)
            .await
            .unwrap();

        let err = adapter.cancel_order(&order.id).await.unwrap_err();
        assert!(matches!(err, BrokerError::Order(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_modify_refreshes_update_timestamp() {
        let mut adapter = connected_adapter().await;
        let order = adapter
            .place_order(
                "AAPL",
                OrderSide::Buy,
                OrderKind::Limit,
                dec!(10),
                Some(dec!(210)),
                None,
            )
            .await
            .unwrap();
        assert!(order.updated_at.is_none());

        let updated = adapter
            .modify_order(&order.id, Some(dec!(20)), Some(dec!(208)))
            .await
            .unwrap();
        assert_eq!(updated.quantity, dec!(20));
        assert_eq!(updated.price, Some(dec!(208)));
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_symbol_quote_fails() {
        let adapter = connected_adapter().await;
        let err = adapter.quote("ZZZZ").await.unwrap_err();
        assert!(matches!(err, BrokerError::Quote(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_filter_by_symbol() {
        let mut adapter = connected_adapter().await;
        adapter
            .place_order("AAPL", OrderSide::Buy, OrderKind::Market, dec!(1), None, None)
            .await
            .unwrap();

        let aapl_orders = adapter.orders(Some("AAPL")).await.unwrap();
        assert!(aapl_orders.iter().all(|o| o.symbol == "AAPL"));
        assert!(!aapl_orders.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_commission_is_pure_with_floor() {
        let adapter = connected_adapter().await;
        let first = adapter.commission(dec!(100), dec!(210.50));
        let second = adapter.commission(dec!(100), dec!(210.50));
        assert_eq!(first, second);
        assert_eq!(first, dec!(6.32));

        // tiny notional hits the floor
        assert_eq!(adapter.commission(dec!(1), dec!(10)), dec!(0.99));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_pushes_full_batches() {
        let mut adapter = connected_adapter().await;
        let symbols = vec!["AAPL".to_string(), "TSLA".to_string()];

        let count = Arc::new(AtomicUsize::new(0));
        let seen_symbols = Arc::new(Mutex::new(Vec::new()));
        let count_cb = Arc::clone(&count);
        let seen_cb = Arc::clone(&seen_symbols);
        let callback: QuoteCallback = Arc::new(move |quotes| {
            let mut names: Vec<String> = quotes.iter().map(|q| q.symbol.clone()).collect();
            names.sort();
            seen_cb.lock().unwrap().push(names);
            count_cb.fetch_add(1, Ordering::SeqCst);
        });

        adapter.subscribe_quotes(&symbols, callback).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(count.load(Ordering::SeqCst) >= 2);
        for batch in seen_symbols.lock().unwrap().iter() {
            assert_eq!(batch, &["AAPL".to_string(), "TSLA".to_string()]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_stops_pushes() {
        let mut adapter = connected_adapter().await;
        let symbols = vec!["AAPL".to_string()];

        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = Arc::clone(&count);
        let callback: QuoteCallback = Arc::new(move |_| {
            count_cb.fetch_add(1, Ordering::SeqCst);
        });

        adapter.subscribe_quotes(&symbols, callback).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        adapter.unsubscribe_quotes(&symbols).await.unwrap();

        let frozen = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(count.load(Ordering::SeqCst), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribe_replaces_prior_subscription() {
        let mut adapter = connected_adapter().await;
        let symbols = vec!["AAPL".to_string()];
        let noop: QuoteCallback = Arc::new(|_| {});

        adapter.subscribe_quotes(&symbols, Arc::clone(&noop)).await.unwrap();
        adapter.subscribe_quotes(&symbols, noop).await.unwrap();
        assert_eq!(adapter.subscriptions.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_unknown_symbol_fails() {
        let mut adapter = connected_adapter().await;
        let noop: QuoteCallback = Arc::new(|_| {});
        let err = adapter
            .subscribe_quotes(&["ZZZZ".to_string()], noop)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Quote(_)));
        assert!(adapter.subscriptions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_releases_subscriptions() {
        let mut adapter = connected_adapter().await;
        let noop: QuoteCallback = Arc::new(|_| {});
        adapter
            .subscribe_quotes(&["AAPL".to_string()], noop)
            .await
            .unwrap();
        assert_eq!(adapter.subscriptions.len(), 1);

        adapter.disconnect().await;
        assert!(adapter.subscriptions.is_empty());
        assert_eq!(adapter.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_kinds_are_in_capabilities() {
        let mut adapter = connected_adapter().await;
        let caps = adapter.capabilities();
        assert!(!caps.order_kinds.is_empty());

        for kind in [OrderKind::Market, OrderKind::Limit] {
            let placed = adapter
                .place_order(
                    "AAPL",
                    OrderSide::Buy,
                    kind,
                    dec!(1),
                    Some(dec!(210)),
                    None,
                )
                .await
                .unwrap();
            assert!(caps.supports_kind(placed.kind));
        }
    }
}
