//! Shared plumbing for the simulated broker adapters.
//!
//! Each variant owns its own copies of these pieces; nothing here is
//! shared mutable state between two adapter instances.

pub mod orders;
pub mod sim;
pub mod subscriptions;

pub use orders::OrderStore;
pub use sim::{
    drift_quote, network_delay, next_order_id, spawn_quote_push, validate_order_request, QuoteTable,
};
pub use subscriptions::{subscription_key, SubscriptionRegistry};
