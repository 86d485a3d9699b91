pub mod manager;
pub mod registry;
pub mod templates;

pub use manager::{BrokerManager, BrokerStatus, BulkResult, StoredBrokerConfig};
pub use registry::{register_default_adapters, AdapterCtor, AdapterRegistry};
pub use templates::{
    all_templates, template_for, validate_broker_config, BrokerTemplate, ConfigField, FieldType,
};
