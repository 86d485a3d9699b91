use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tradedesk_core::{BrokerError, Order, OrderStatus};

/// Per-adapter order book for the simulated backends.
///
/// Holds both the historical orders seeded at connect time and everything
/// placed through the adapter afterwards. Enforces the order state
/// machine: `Filled` and `Cancelled` are terminal.
#[derive(Default)]
pub struct OrderStore {
    orders: HashMap<String, Order>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, order: Order) {
        self.orders.insert(order.id.clone(), order);
    }

    pub fn get(&self, id: &str) -> Option<&Order> {
        self.orders.get(id)
    }

    /// Fresh snapshot, optionally filtered by symbol, oldest first.
    pub fn snapshot(&self, symbol: Option<&str>) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|o| symbol.is_none_or(|s| o.symbol == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        orders
    }

    /// Cancel a non-terminal order.
    pub fn cancel(&mut self, id: &str) -> Result<(), BrokerError> {
        let order = self
            .orders
            .get_mut(id)
            .ok_or_else(|| BrokerError::order(format!("order not found: {id}")))?;
        if order.status.is_terminal() {
            return Err(BrokerError::order(format!(
                "order {id} is already {:?} and cannot be cancelled",
                order.status
            )));
        }
        order.status = OrderStatus::Cancelled;
        order.updated_at = Some(Utc::now());
        Ok(())
    }

    /// Update quantity/price of a pending order, refreshing its update
    /// timestamp.
    pub fn modify(
        &mut self,
        id: &str,
        quantity: Option<Decimal>,
        price: Option<Decimal>,
    ) -> Result<Order, BrokerError> {
        let order = self
            .orders
            .get_mut(id)
            .ok_or_else(|| BrokerError::order(format!("order not found: {id}")))?;
        if order.status != OrderStatus::Pending {
            return Err(BrokerError::order(format!(
                "order {id} is {:?}; only pending orders can be modified",
                order.status
            )));
        }
        if let Some(quantity) = quantity {
            order.quantity = quantity;
        }
        if let Some(price) = price {
            order.price = Some(price);
        }
        order.updated_at = Some(Utc::now());
        Ok(order.clone())
    }

    pub fn clear(&mut self) {
        self.orders.clear();
    }
}
