use thiserror::Error;

use crate::config::{
    AgentSettings, DatabaseSettings, GatewaySettings, QuoteApiSettings, ServerSettings, Settings,
};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_server(&settings.server) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_database(&settings.database) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_gateway(&settings.gateway) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_agent(&settings.agent) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_quote_api(&settings.quote_api) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.port".to_string(),
                reason: "port must be non-zero".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_database(database: &DatabaseSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if database.url.is_empty() {
            errors.push(ValidationError::MissingField("database.url".to_string()));
        }

        if database.max_connections == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "database.max_connections".to_string(),
                reason: "pool needs at least one connection".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_gateway(gateway: &GatewaySettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if gateway.base_url.is_empty() {
            errors.push(ValidationError::MissingField("gateway.base_url".to_string()));
        }

        if gateway.api_key.is_empty() {
            errors.push(ValidationError::MissingField("gateway.api_key".to_string()));
        }

        if gateway.default_model.is_empty() {
            errors.push(ValidationError::MissingField(
                "gateway.default_model".to_string(),
            ));
        }

        if gateway.web_search_model.is_empty() {
            errors.push(ValidationError::MissingField(
                "gateway.web_search_model".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_agent(agent: &AgentSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if agent.max_steps == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "agent.max_steps".to_string(),
                reason: "at least one step is required".to_string(),
            });
        }

        if agent.run_timeout_secs == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "agent.run_timeout_secs".to_string(),
                reason: "timeout must be non-zero".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_quote_api(quote_api: &QuoteApiSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if quote_api.base_url.is_empty() {
            errors.push(ValidationError::MissingField(
                "quote_api.base_url".to_string(),
            ));
        }

        if quote_api.timeout_secs == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "quote_api.timeout_secs".to_string(),
                reason: "timeout must be non-zero".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
