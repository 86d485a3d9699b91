use rand::Rng;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tradedesk_core::{BrokerCapabilities, BrokerError, OrderKind, Quote, QuoteCallback};
use uuid::Uuid;

/// Static per-variant quote board, shared read-only with push tasks.
pub type QuoteTable = Arc<HashMap<String, Quote>>;

/// Simulated network round trip. Used only to preserve observable async
/// ordering, not as a performance model.
pub async fn network_delay(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Adapter-assigned order id with a variant prefix.
pub fn next_order_id(prefix: &str) -> String {
    format!("{}{}", prefix, Uuid::new_v4().simple())
}

/// Local order parameter validation, performed before any simulated
/// round trip.
pub fn validate_order_request(
    capabilities: &BrokerCapabilities,
    symbol: &str,
    kind: OrderKind,
    quantity: Decimal,
    price: Option<Decimal>,
    stop_price: Option<Decimal>,
) -> Result<(), BrokerError> {
    if symbol.trim().is_empty() {
        return Err(BrokerError::order("symbol must not be empty"));
    }
    if !capabilities.supports_kind(kind) {
        return Err(BrokerError::order(format!(
            "order kind {:?} not supported by this broker",
            kind
        )));
    }
    if quantity <= Decimal::ZERO {
        return Err(BrokerError::order("quantity must be greater than zero"));
    }
    if kind.requires_price() && !price.is_some_and(|p| p > Decimal::ZERO) {
        return Err(BrokerError::order("limit orders require a positive price"));
    }
    if kind.requires_stop_price() && !stop_price.is_some_and(|p| p > Decimal::ZERO) {
        return Err(BrokerError::order(
            "stop orders require a positive trigger price",
        ));
    }
    Ok(())
}

/// Rebuild a quote from its table entry with a small random price drift,
/// refreshing change/percent/timestamp. `volatility` is the maximum
/// fractional move per tick.
pub fn drift_quote(base: &Quote, volatility: f64) -> Quote {
    let mut fresh = base.clone();
    if volatility > 0.0 {
        let pct: f64 = rand::thread_rng().gen_range(-volatility..volatility);
        let factor = Decimal::from_f64_retain(pct).unwrap_or(Decimal::ZERO);
        let delta = (base.price * factor).round_dp(4);
        fresh.price = base.price + delta;
        fresh.change = base.change + delta;
        let prev_close = fresh.price - fresh.change;
        fresh.change_percent = if prev_close.is_zero() {
            Decimal::ZERO
        } else {
            (fresh.change / prev_close * Decimal::ONE_HUNDRED).round_dp(2)
        };
    }
    fresh.timestamp = chrono::Utc::now();
    fresh
}

/// Spawn the recurring push task for one subscription.
///
/// Each tick rebuilds the batch from the quote table with per-symbol drift
/// and hands it to the callback. With `push_immediately` the first batch
/// goes out right away; otherwise the first push lands one full period
/// after registration.
pub fn spawn_quote_push(
    table: QuoteTable,
    symbols: Vec<String>,
    period: Duration,
    push_immediately: bool,
    volatility: fn(&str) -> f64,
    callback: QuoteCallback,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        if !push_immediately {
            // interval's first tick completes at once; skip it
            ticker.tick().await;
        }
        loop {
            ticker.tick().await;
            let quotes: Vec<Quote> = symbols
                .iter()
                .filter_map(|s| table.get(s))
                .map(|q| drift_quote(q, volatility(&q.symbol)))
                .collect();
            callback(quotes);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tradedesk_core::Market;

    fn test_quote(symbol: &str, price: Decimal) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            price,
            change: dec!(1.50),
            change_percent: dec!(0.70),
            volume: 1_000_000,
            timestamp: Utc::now(),
            bid: Some(price - dec!(0.05)),
            ask: Some(price + dec!(0.05)),
            bid_size: Some(dec!(100)),
            ask_size: Some(dec!(200)),
        }
    }

    fn test_capabilities() -> BrokerCapabilities {
        BrokerCapabilities {
            markets: vec![Market::Us],
            order_kinds: vec![OrderKind::Market, OrderKind::Limit],
            auto_trading: true,
            paper_trading: true,
            real_time_data: true,
            options_trading: false,
            crypto_trading: false,
            margin_trading: false,
            fractional_shares: false,
        }
    }

    #[test]
    fn test_validate_rejects_non_positive_quantity() {
        let caps = test_capabilities();
        let err = validate_order_request(
            &caps,
            "AAPL",
            OrderKind::Market,
            Decimal::ZERO,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, BrokerError::Order(_)));
    }

    #[test]
    fn test_validate_requires_limit_price() {
        let caps = test_capabilities();
        let err = validate_order_request(&caps, "AAPL", OrderKind::Limit, dec!(10), None, None)
            .unwrap_err();
        assert!(matches!(err, BrokerError::Order(_)));

        validate_order_request(&caps, "AAPL", OrderKind::Limit, dec!(10), Some(dec!(210)), None)
            .unwrap();
    }

    #[test]
    fn test_validate_rejects_unsupported_kind() {
        let caps = test_capabilities();
        let err = validate_order_request(
            &caps,
            "AAPL",
            OrderKind::StopLimit,
            dec!(10),
            Some(dec!(210)),
            Some(dec!(205)),
        )
        .unwrap_err();
        assert!(matches!(err, BrokerError::Order(_)));
    }

    #[test]
    fn test_validate_rejects_blank_symbol() {
        let caps = test_capabilities();
        let err = validate_order_request(&caps, "  ", OrderKind::Market, dec!(1), None, None)
            .unwrap_err();
        assert!(matches!(err, BrokerError::Order(_)));
    }

    #[test]
    fn test_drift_stays_within_bounds() {
        let base = test_quote("AAPL", dec!(200));
        for _ in 0..50 {
            let drifted = drift_quote(&base, 0.01);
            let delta = (drifted.price - base.price).abs();
            assert!(delta <= dec!(2), "drift {delta} exceeded 1% of price");
        }
    }

    #[test]
    fn test_zero_volatility_leaves_price_untouched() {
        let base = test_quote("AAPL", dec!(200));
        let drifted = drift_quote(&base, 0.0);
        assert_eq!(drifted.price, base.price);
        assert_eq!(drifted.change, base.change);
    }

    #[test]
    fn test_order_ids_are_unique_and_prefixed() {
        let a = next_order_id("FT");
        let b = next_order_id("FT");
        assert!(a.starts_with("FT"));
        assert_ne!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_task_delivers_batches_in_timer_order() {
        let mut table = HashMap::new();
        table.insert("AAPL".to_string(), test_quote("AAPL", dec!(215.30)));
        table.insert("TSLA".to_string(), test_quote("TSLA", dec!(195.20)));
        let table: QuoteTable = Arc::new(table);

        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = Arc::clone(&count);
        let callback: QuoteCallback = Arc::new(move |quotes| {
            assert_eq!(quotes.len(), 2);
            count_cb.fetch_add(1, Ordering::SeqCst);
        });

        let handle = spawn_quote_push(
            table,
            vec!["AAPL".to_string(), "TSLA".to_string()],
            Duration::from_millis(1000),
            false,
            |_| 0.005,
            callback,
        );

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let seen = count.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected at least 2 pushes, saw {seen}");

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_push_fires_before_first_period() {
        let mut table = HashMap::new();
        table.insert("NVDA".to_string(), test_quote("NVDA", dec!(492.50)));
        let table: QuoteTable = Arc::new(table);

        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = Arc::clone(&count);
        let callback: QuoteCallback = Arc::new(move |_| {
            count_cb.fetch_add(1, Ordering::SeqCst);
        });

        let handle = spawn_quote_push(
            table,
            vec!["NVDA".to_string()],
            Duration::from_millis(800),
            true,
            |_| 0.005,
            callback,
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.abort();
    }
}
