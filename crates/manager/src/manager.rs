use crate::registry::AdapterRegistry;
use crate::templates::{template_for, validate_broker_config};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};
use tradedesk_core::{BrokerAdapter, BrokerConfig, BrokerError, ConnectionState, TradingMode};

/// The configuration a broker instance was created from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBrokerConfig {
    pub broker_type: String,
    pub config: BrokerConfig,
    pub mode: TradingMode,
}

/// Per-id outcome of a bulk connect/disconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResult {
    pub id: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Read-only status aggregation for one managed broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerStatus {
    pub id: String,
    pub broker_type: String,
    pub mode: TradingMode,
    pub connected: bool,
    pub state: ConnectionState,
    pub last_error: Option<String>,
}

/// Owns the configured adapter instances and their configs, keyed by an
/// opaque id. The manager only ever talks to adapters through the
/// [`BrokerAdapter`] contract; it never reaches into their internals.
pub struct BrokerManager {
    registry: AdapterRegistry,
    instances: BTreeMap<String, Box<dyn BrokerAdapter>>,
    configs: BTreeMap<String, StoredBrokerConfig>,
}

impl BrokerManager {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self {
            registry,
            instances: BTreeMap::new(),
            configs: BTreeMap::new(),
        }
    }

    /// Manager with the built-in adapter variants registered.
    pub fn with_default_adapters() -> Self {
        let mut registry = AdapterRegistry::new();
        crate::registry::register_default_adapters(&mut registry);
        Self::new(registry)
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Validate `config` against the type's template, build the adapter,
    /// and store both under `id`, overwriting any prior entry.
    ///
    /// Validation failures surface before any adapter is constructed.
    pub fn add_broker(
        &mut self,
        id: &str,
        broker_type: &str,
        mut config: BrokerConfig,
        mode: TradingMode,
    ) -> Result<(), BrokerError> {
        validate_broker_config(broker_type, &config)?;
        if let Some(template) = template_for(broker_type) {
            template.apply_defaults(&mut config);
        }

        let instance = self.registry.create(broker_type, config.clone(), mode)?;
        if self.instances.insert(id.to_string(), instance).is_some() {
            info!(id, "replacing existing broker instance");
        }
        self.configs.insert(
            id.to_string(),
            StoredBrokerConfig {
                broker_type: broker_type.to_string(),
                config,
                mode,
            },
        );
        info!(id, broker_type, ?mode, "broker added");
        Ok(())
    }

    pub fn instance(&self, id: &str) -> Option<&dyn BrokerAdapter> {
        self.instances.get(id).map(|b| b.as_ref())
    }

    pub fn instance_mut(&mut self, id: &str) -> Option<&mut dyn BrokerAdapter> {
        self.instances.get_mut(id).map(|b| &mut **b as &mut dyn BrokerAdapter)
    }

    pub fn config(&self, id: &str) -> Option<&StoredBrokerConfig> {
        self.configs.get(id)
    }

    pub fn broker_ids(&self) -> Vec<String> {
        self.instances.keys().cloned().collect()
    }

    /// Disconnect (best-effort) and drop the instance and its config.
    /// Unknown ids are a no-op.
    pub async fn remove_broker(&mut self, id: &str) {
        if let Some(mut instance) = self.instances.remove(id) {
            instance.disconnect().await;
            info!(id, "broker removed");
        }
        self.configs.remove(id);
    }

    /// Connect every managed instance. A failure on one never prevents
    /// attempting the others; the outcome is reported per id.
    pub async fn connect_all(&mut self) -> Vec<BulkResult> {
        let mut results = Vec::with_capacity(self.instances.len());
        for (id, instance) in self.instances.iter_mut() {
            match instance.connect().await {
                Ok(()) => results.push(BulkResult {
                    id: id.clone(),
                    success: true,
                    error: None,
                }),
                Err(err) => {
                    warn!(id = %id, error = %err, "broker failed to connect");
                    results.push(BulkResult {
                        id: id.clone(),
                        success: false,
                        error: Some(err.to_string()),
                    });
                }
            }
        }
        results
    }

    /// Disconnect every managed instance, reporting one outcome per id.
    pub async fn disconnect_all(&mut self) -> Vec<BulkResult> {
        let mut results = Vec::with_capacity(self.instances.len());
        for (id, instance) in self.instances.iter_mut() {
            instance.disconnect().await;
            results.push(BulkResult {
                id: id.clone(),
                success: true,
                error: None,
            });
        }
        results
    }

    /// Switch the stored mode and inform the instance. Returns false when
    /// the id is unknown.
    pub fn switch_trading_mode(&mut self, id: &str, mode: TradingMode) -> bool {
        match (self.instances.get_mut(id), self.configs.get_mut(id)) {
            (Some(instance), Some(stored)) => {
                instance.set_mode(mode);
                stored.mode = mode;
                info!(id, ?mode, "trading mode switched");
                true
            }
            _ => false,
        }
    }

    /// Live status of every managed broker. Read-only; never mutates.
    pub fn all_broker_status(&self) -> Vec<BrokerStatus> {
        self.instances
            .iter()
            .map(|(id, instance)| {
                let stored = &self.configs[id];
                BrokerStatus {
                    id: id.clone(),
                    broker_type: stored.broker_type.clone(),
                    mode: stored.mode,
                    connected: instance.is_connected(),
                    state: instance.state(),
                    last_error: instance.last_error().map(str::to_string),
                }
            })
            .collect()
    }
}
