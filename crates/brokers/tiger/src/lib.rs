//! Tiger broker adapter.
//!
//! Simulated backend with an OAuth-shaped session: connect validates both
//! key and secret (`tiger_` key prefix stands in for the real token
//! exchange) and issues an access token that `is_connected` requires on
//! top of the connection state. Supports more markets and order kinds than
//! the Futu variant, including crypto and fractional shares.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use tradedesk_brokers_common::{
    drift_quote, network_delay, next_order_id, spawn_quote_push, subscription_key,
    validate_order_request, OrderStore, QuoteTable, SubscriptionRegistry,
};
use tradedesk_core::*;

mod latency {
    pub const HANDSHAKE_MS: u64 = 800;
    pub const AUTH_MS: u64 = 600;
    pub const ACCOUNT_MS: u64 = 250;
    pub const POSITIONS_MS: u64 = 200;
    pub const ORDERS_MS: u64 = 150;
    pub const PLACE_MS: u64 = 400;
    pub const CANCEL_MS: u64 = 300;
    pub const MODIFY_MS: u64 = 350;
    pub const QUOTE_MS: u64 = 120;
    pub const BATCH_QUOTE_MS: u64 = 200;
    pub const PUSH_INTERVAL_MS: u64 = 800;
}

/// Crypto symbols move harder per tick than equities.
fn push_volatility(symbol: &str) -> f64 {
    if symbol.contains("BTC") {
        0.02
    } else {
        0.005
    }
}

pub struct TigerAdapter {
    config: BrokerConfig,
    mode: TradingMode,
    state: ConnectionState,
    last_error: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    quote_table: QuoteTable,
    orders: OrderStore,
    subscriptions: SubscriptionRegistry,
}

impl TigerAdapter {
    pub fn new(config: BrokerConfig, mode: TradingMode) -> Self {
        Self {
            config,
            mode,
            state: ConnectionState::Disconnected,
            last_error: None,
            access_token: None,
            refresh_token: None,
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
            Err(BrokerError::connection("not connected to Tiger"))
        }
    }

    fn current_price(&self, symbol: &str) -> Result<Decimal, BrokerError> {
        self.quote_table
            .get(symbol)
            .map(|q| q.price)
            .ok_or_else(|| BrokerError::quote(format!("unknown symbol: {symbol}")))
    }

    /// Tiered commission: sub-$100 prices are treated as HK-style lots
    /// (0.08% with a $3 floor), fractional quantities as crypto (flat
    /// 0.1%), everything else as US equities (0.25% with a $0.99 floor).
    fn commission(&self, quantity: Decimal, price: Decimal) -> Decimal {
        let notional = quantity * price;
        let commission = if price < dec!(100) {
            (notional * dec!(0.0008)).max(dec!(3.0))
        } else if quantity < Decimal::ONE {
            notional * dec!(0.001)
        } else {
            (notional * dec!(0.0025)).max(dec!(0.99))
        };
        commission.round_dp(2)
    }

    fn account_snapshot(&self) -> Account {
        let paper = self.mode.is_paper();
        Account {
            id: self
                .config
                .str_field("account")
                .unwrap_or("TG123456789")
                .to_string(),
            name: if paper {
                "Tiger Paper Account".to_string()
            } else {
                "Tiger Live Account".to_string()
            },
            currency: "USD".to_string(),
            total_value: if paper { dec!(200000) } else { dec!(75000) },
            available_cash: if paper { dec!(150000) } else { dec!(45000) },
            buying_power: if paper { dec!(300000) } else { dec!(90000) },
            day_trading_buying_power: Some(if paper { dec!(600000) } else { dec!(180000) }),
            maintenance_margin: Some(dec!(5000)),
            positions: self.position_snapshot(),
        }
    }

    fn position_snapshot(&self) -> Vec<Position> {
        if self.mode.is_paper() {
            vec![
                position("NVDA", dec!(20), dec!(485.00), dec!(492.50), dec!(0)),
                position("META", dec!(30), dec!(298.80), dec!(301.20), dec!(0)),
                position("BTC-USD", dec!(0.5), dec!(43000), dec!(44500), dec!(0)),
            ]
        } else {
            vec![position("NVDA", dec!(10), dec!(480.00), dec!(492.50), dec!(50))]
        }
    }

    fn seed_orders(&mut self) {
        self.orders.insert(Order {
            id: "TG20250824001".to_string(),
            symbol: "NVDA".to_string(),
            side: OrderSide::Buy,
            kind: OrderKind::Limit,
            quantity: dec!(20),
            price: Some(dec!(485.00)),
            stop_price: None,
            status: OrderStatus::Filled,
            filled_quantity: dec!(20),
            avg_fill_price: Some(dec!(485.00)),
            commission: dec!(2.0),
            created_at: Utc::now(),
            updated_at: Some(Utc::now()),
        });
        self.orders.insert(Order {
            id: "TG20250824002".to_string(),
            symbol: "META".to_string(),
            side: OrderSide::Buy,
            kind: OrderKind::StopLimit,
            quantity: dec!(30),
            price: Some(dec!(300.00)),
            stop_price: Some(dec!(295.00)),
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
impl BrokerAdapter for TigerAdapter {
    fn name(&self) -> &str {
        "Tiger"
    }

    fn capabilities(&self) -> BrokerCapabilities {
        BrokerCapabilities {
            markets: vec![Market::Us, Market::Hk, Market::Cn, Market::Sg],
            order_kinds: vec![
                OrderKind::Market,
                OrderKind::Limit,
                OrderKind::Stop,
                OrderKind::StopLimit,
            ],
            auto_trading: true,
            paper_trading: true,
            real_time_data: true,
            options_trading: true,
            crypto_trading: true,
            margin_trading: true,
            fractional_shares: true,
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
        if self.config.is_blank("apiKey") || self.config.is_blank("apiSecret") {
            return Err(BrokerError::connection(
                "api key or api secret not configured",
            ));
        }

        self.state = ConnectionState::Connecting;
        network_delay(latency::HANDSHAKE_MS).await;

        // Token exchange.
        network_delay(latency::AUTH_MS).await;
        let authenticated = self
            .config
            .str_field("apiKey")
            .is_some_and(|key| key.starts_with("tiger_"));
        if !authenticated {
            let message = "authentication rejected: check the api key and secret";
            self.set_error(message);
            return Err(BrokerError::connection(message));
        }

        self.access_token = Some(format!("tiger_access_{}", Uuid::new_v4().simple()));
        self.refresh_token = Some(format!("tiger_refresh_{}", Uuid::new_v4().simple()));

        self.seed_orders();
        self.last_error = None;
        self.state = ConnectionState::Connected;
        info!(mode = ?self.mode, "connected to Tiger");
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.subscriptions.clear();
        self.access_token = None;
        self.refresh_token = None;
        self.state = ConnectionState::Disconnected;
        info!("disconnected from Tiger");
    }

    fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.access_token.is_some()
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
            id: next_order_id("TG"),
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
        Ok(drift_quote(base, 0.0))
    }

    /// True batch path: one round trip regardless of symbol count.
    async fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, BrokerError> {
        self.ensure_connected()?;
        network_delay(latency::BATCH_QUOTE_MS).await;
        symbols
            .iter()
            .map(|symbol| {
                self.quote_table
                    .get(symbol)
                    .map(|q| drift_quote(q, 0.0))
                    .ok_or_else(|| BrokerError::quote(format!("unknown symbol: {symbol}")))
            })
            .collect()
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
            true,
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
        "NVDA".to_string(),
        Quote {
            symbol: "NVDA".to_string(),
            price: dec!(492.50),
            change: dec!(7.50),
            change_percent: dec!(1.55),
            volume: 28_456_000,
            timestamp: Utc::now(),
            bid: Some(dec!(492.45)),
            ask: Some(dec!(492.55)),
            bid_size: Some(dec!(200)),
            ask_size: Some(dec!(150)),
        },
    );
    table.insert(
        "META".to_string(),
        Quote {
            symbol: "META".to_string(),
            price: dec!(301.20),
            change: dec!(2.40),
            change_percent: dec!(0.80),
            volume: 15_623_000,
            timestamp: Utc::now(),
            bid: Some(dec!(301.15)),
            ask: Some(dec!(301.25)),
            bid_size: Some(dec!(100)),
            ask_size: Some(dec!(250)),
        },
    );
    table.insert(
        "BTC-USD".to_string(),
        Quote {
            symbol: "BTC-USD".to_string(),
            price: dec!(44500),
            change: dec!(1500),
            change_percent: dec!(3.49),
            volume: 1_250_000,
            timestamp: Utc::now(),
            bid: Some(dec!(44495)),
            ask: Some(dec!(44505)),
            bid_size: Some(dec!(0.5)),
            ask_size: Some(dec!(0.3)),
        },
    );
    // Tencent, HK board lot
    table.insert(
        "00700".to_string(),
        Quote {
            symbol: "00700".to_string(),
            price: dec!(385.50),
            change: dec!(-2.50),
            change_percent: dec!(-0.64),
            volume: 8_560_000,
            timestamp: Utc::now(),
            bid: Some(dec!(385.40)),
            ask: Some(dec!(385.60)),
            bid_size: Some(dec!(1000)),
            ask_size: Some(dec!(800)),
        },
    );
    table
}
