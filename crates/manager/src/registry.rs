use std::collections::HashMap;
use tradedesk_brokers_futu::FutuAdapter;
use tradedesk_brokers_tiger::TigerAdapter;
use tradedesk_core::{BrokerAdapter, BrokerConfig, BrokerError, TradingMode};

/// Constructor for one adapter variant.
pub type AdapterCtor = fn(BrokerConfig, TradingMode) -> Box<dyn BrokerAdapter>;

/// Maps broker-type tags to adapter constructors.
///
/// Registration is explicit; callers run [`register_default_adapters`]
/// once at startup rather than relying on load-time side effects.
#[derive(Default)]
pub struct AdapterRegistry {
    ctors: HashMap<String, AdapterCtor>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `tag`. Registering the same tag again
    /// silently overwrites; the last registration wins.
    pub fn register(&mut self, tag: &str, ctor: AdapterCtor) {
        self.ctors.insert(tag.to_string(), ctor);
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.ctors.contains_key(tag)
    }

    /// Tags with a registered constructor, sorted.
    pub fn supported(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.ctors.keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Build the adapter for `tag`.
    pub fn create(
        &self,
        tag: &str,
        config: BrokerConfig,
        mode: TradingMode,
    ) -> Result<Box<dyn BrokerAdapter>, BrokerError> {
        let ctor = self
            .ctors
            .get(tag)
            .ok_or_else(|| BrokerError::Unsupported(tag.to_string()))?;
        Ok(ctor(config, mode))
    }
}

/// Install the built-in adapter variants. Call once during startup.
pub fn register_default_adapters(registry: &mut AdapterRegistry) {
    registry.register("futu", |config, mode| {
        Box::new(FutuAdapter::new(config, mode))
    });
    registry.register("tiger", |config, mode| {
        Box::new(TigerAdapter::new(config, mode))
    });
}
