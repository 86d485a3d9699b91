use serde::{Deserialize, Serialize};
use tradedesk_core::{BrokerConfig, BrokerError, Market};

/// Input widget/validation type of a config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Password,
    Number,
}

/// One entry of a broker type's declarative config template. Consumed by
/// validation here and by whatever configuration UI sits on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigField {
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub default: Option<serde_json::Value>,
    pub placeholder: Option<String>,
    pub description: Option<String>,
}

impl ConfigField {
    fn required(key: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            field_type,
            required: true,
            default: None,
            placeholder: None,
            description: None,
        }
    }

    fn placeholder(mut self, value: &str) -> Self {
        self.placeholder = Some(value.to_string());
        self
    }

    fn default_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    fn description(mut self, value: &str) -> Self {
        self.description = Some(value.to_string());
        self
    }
}

/// Declarative description of a broker type: identity plus the ordered
/// config field list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerTemplate {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub markets: Vec<Market>,
    pub config_fields: Vec<ConfigField>,
}

impl BrokerTemplate {
    /// Fill absent or blank fields from the template defaults, the same way
    /// a config form would pre-populate them.
    pub fn apply_defaults(&self, config: &mut BrokerConfig) {
        for field in &self.config_fields {
            if let Some(default) = &field.default {
                if config.is_blank(&field.key) {
                    config.0.insert(field.key.clone(), default.clone());
                }
            }
        }
    }
}

fn futu_template() -> BrokerTemplate {
    BrokerTemplate {
        name: "futu".to_string(),
        display_name: "Futu".to_string(),
        description: "HK/US brokerage with an OpenAPI gateway".to_string(),
        markets: vec![Market::Us, Market::Hk, Market::Cn],
        config_fields: vec![
            ConfigField::required("apiKey", "API Key", FieldType::Password)
                .placeholder("ft_api_key_...")
                .description("API key issued by the Futu developer console"),
            ConfigField::required("host", "Host", FieldType::Text)
                .default_value("openapi.futunn.com")
                .description("OpenAPI gateway address"),
            ConfigField::required("port", "Port", FieldType::Number)
                .default_value(11111)
                .description("OpenAPI gateway port"),
            ConfigField::required("account", "Account", FieldType::Text)
                .placeholder("DU1234567")
                .description("Trading account number"),
        ],
    }
}

fn tiger_template() -> BrokerTemplate {
    BrokerTemplate {
        name: "tiger".to_string(),
        display_name: "Tiger".to_string(),
        description: "Global brokerage with OAuth-style API access".to_string(),
        markets: vec![Market::Us, Market::Hk, Market::Cn, Market::Sg],
        config_fields: vec![
            ConfigField::required("apiKey", "API Key", FieldType::Password)
                .placeholder("tiger_api_..."),
            ConfigField::required("apiSecret", "API Secret", FieldType::Password)
                .placeholder("tiger_secret_..."),
            ConfigField::required("host", "Host", FieldType::Text)
                .default_value("openapi.tigerbrokers.com"),
            ConfigField::required("account", "Account", FieldType::Text)
                .placeholder("TG123456789"),
        ],
    }
}

// No adapter is registered for IB yet; the template exists so the config
// surface can already collect credentials for it.
fn ib_template() -> BrokerTemplate {
    BrokerTemplate {
        name: "ib".to_string(),
        display_name: "Interactive Brokers".to_string(),
        description: "TWS / IB Gateway connection".to_string(),
        markets: vec![Market::Us, Market::Hk, Market::Eu, Market::Jp, Market::Sg],
        config_fields: vec![
            ConfigField::required("host", "Host", FieldType::Text)
                .default_value("127.0.0.1")
                .description("TWS or IB Gateway address"),
            ConfigField::required("port", "Port", FieldType::Number)
                .default_value(7497)
                .description("TWS port (7497) or IB Gateway port (4001)"),
            ConfigField::required("account", "Account", FieldType::Text)
                .placeholder("DU123456"),
        ],
    }
}

/// Template for one broker type, if known.
pub fn template_for(broker_type: &str) -> Option<BrokerTemplate> {
    match broker_type {
        "futu" => Some(futu_template()),
        "tiger" => Some(tiger_template()),
        "ib" => Some(ib_template()),
        _ => None,
    }
}

/// All known broker templates.
pub fn all_templates() -> Vec<BrokerTemplate> {
    vec![futu_template(), tiger_template(), ib_template()]
}

/// Check `config` against the declarative template for `broker_type`:
/// required fields present and non-blank (a template default counts as
/// present), numeric fields numeric. All problems are reported in one
/// error.
pub fn validate_broker_config(
    broker_type: &str,
    config: &BrokerConfig,
) -> Result<(), BrokerError> {
    let template = template_for(broker_type)
        .ok_or_else(|| BrokerError::Unsupported(broker_type.to_string()))?;

    let mut problems = Vec::new();
    for field in &template.config_fields {
        if field.required && field.default.is_none() && config.is_blank(&field.key) {
            problems.push(format!("{} is required", field.label));
            continue;
        }
        if field.field_type == FieldType::Number
            && !config.is_blank(&field.key)
            && config.number_field(&field.key).is_none()
        {
            problems.push(format!("{} must be a number", field.label));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(BrokerError::Config(problems.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_exist_for_known_types() {
        assert!(template_for("futu").is_some());
        assert!(template_for("tiger").is_some());
        assert!(template_for("ib").is_some());
        assert!(template_for("robinhood").is_none());
        assert_eq!(all_templates().len(), 3);
    }

    #[test]
    fn test_valid_config_passes() {
        let config = BrokerConfig::new()
            .with("apiKey", "ft_demo")
            .with("host", "x")
            .with("port", 11111)
            .with("account", "DU1");
        validate_broker_config("futu", &config).unwrap();
    }

    #[test]
    fn test_missing_fields_all_reported() {
        let config = BrokerConfig::new().with("host", "x");
        let err = validate_broker_config("tiger", &config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("API Key is required"));
        assert!(message.contains("API Secret is required"));
        assert!(message.contains("Account is required"));
    }

    #[test]
    fn test_defaulted_fields_satisfy_required() {
        // host and port carry template defaults and may be omitted
        let config = BrokerConfig::new()
            .with("apiKey", "ft_demo")
            .with("account", "DU1");
        validate_broker_config("futu", &config).unwrap();
    }

    #[test]
    fn test_apply_defaults_fills_absent_fields() {
        let mut config = BrokerConfig::new()
            .with("apiKey", "ft_demo")
            .with("account", "DU1");
        template_for("futu").unwrap().apply_defaults(&mut config);

        assert_eq!(config.str_field("host"), Some("openapi.futunn.com"));
        assert_eq!(config.number_field("port"), Some(11111.0));
        // explicit values are never overridden
        let mut config = BrokerConfig::new().with("port", 22222);
        template_for("futu").unwrap().apply_defaults(&mut config);
        assert_eq!(config.number_field("port"), Some(22222.0));
    }

    #[test]
    fn test_non_numeric_number_field_rejected() {
        let config = BrokerConfig::new()
            .with("apiKey", "ft_demo")
            .with("host", "x")
            .with("port", "not-a-port")
            .with("account", "DU1");
        let err = validate_broker_config("futu", &config).unwrap_err();
        assert!(err.to_string().contains("Port must be a number"));
    }

    #[test]
    fn test_numeric_string_accepted() {
        let config = BrokerConfig::new()
            .with("apiKey", "ft_demo")
            .with("host", "x")
            .with("port", "11111")
            .with("account", "DU1");
        validate_broker_config("futu", &config).unwrap();
    }

    #[test]
    fn test_unknown_broker_type_rejected() {
        let err = validate_broker_config("robinhood", &BrokerConfig::new()).unwrap_err();
        assert!(matches!(err, BrokerError::Unsupported(_)));
    }
}
