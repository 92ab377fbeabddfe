//! Domain tools the model can invoke during a conversation
//!
//! Each tool validates its input against a JSON schema generated from a
//! typed input struct, runs one self-contained data access (or, for quote
//! generation, one outbound HTTP call), and returns a camelCase JSON
//! envelope tagged `status: ok | error`. Failures never leak internal
//! detail to the model: every error variant carries a safe French message.

pub mod claim_coverage;
pub mod claim_status;
pub mod lookup;
pub mod payment_status;
pub mod policy_info;
pub mod product_info;
pub mod quote;

pub use claim_coverage::ClaimCoverageTool;
pub use claim_status::ClaimStatusTool;
pub use lookup::ClientLookupInput;
pub use payment_status::PaymentStatusTool;
pub use policy_info::PolicyInfoTool;
pub use product_info::ProductInfoTool;
pub use quote::{GenerateQuoteTool, QuoteApi, QuoteClient};

use crate::agent::domain::ToolDefinition;
use crate::persistence::{InsuranceStore, PersistenceError};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Tool-level failure taxonomy
#[derive(Debug, Error)]
pub enum ToolError {
    /// Input rejected before dispatch
    #[error("Invalid tool input: {0}")]
    SchemaViolation(String),

    /// A resolvable entity is absent
    #[error("No matching record: {0}")]
    NotFound(String),

    /// The external quote API returned a non-success status or did not respond
    #[error("Quote API failure: {0}")]
    UpstreamFailure(String),

    /// The insurance database is unreachable or the query failed
    #[error("Insurance database failure: {0}")]
    DataAccessFailure(String),
}

impl ToolError {
    /// Safe French message shown to the end user in place of the raw error
    pub fn user_message(&self) -> &'static str {
        match self {
            ToolError::SchemaViolation(_) => {
                "Les informations fournies sont invalides ou incomplètes. \
                 Pouvez-vous reformuler votre demande ?"
            }
            ToolError::NotFound(_) => {
                "Aucune information trouvée pour les critères fournis. \
                 Veuillez vérifier les références communiquées."
            }
            ToolError::UpstreamFailure(_) => {
                "Le service de devis est temporairement indisponible. \
                 Veuillez réessayer plus tard."
            }
            ToolError::DataAccessFailure(_) => {
                "Je rencontre actuellement des difficultés pour accéder aux données. \
                 Veuillez réessayer dans quelques instants."
            }
        }
    }
}

impl From<PersistenceError> for ToolError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound {
                entity_type,
                identifier,
            } => ToolError::NotFound(format!("{entity_type} {identifier}")),
            other => ToolError::DataAccessFailure(other.to_string()),
        }
    }
}

/// A single model-invocable operation over the insurance domain
#[async_trait]
pub trait InsuranceTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the input, advertised to the model
    fn input_schema(&self) -> Value;

    async fn execute(&self, input: Value) -> Result<Value, ToolError>;
}

/// Dispatch surface driven by the conversation loop
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Definitions advertised to the model on every completion request
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run one tool call. `arguments` is the raw JSON text produced by the
    /// model; malformed text is a schema violation, not a crash.
    async fn dispatch(&self, name: &str, arguments: &str) -> Result<Value, ToolError>;
}

/// The fixed tool set, resolved by name
pub struct ToolRegistry {
    tools: Vec<Arc<dyn InsuranceTool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn InsuranceTool>>) -> Self {
        Self { tools }
    }

    /// All six domain tools backed by the given store and quote API
    pub fn standard(store: InsuranceStore, quote_api: Arc<dyn QuoteApi>) -> Self {
        Self::new(vec![
            Arc::new(ProductInfoTool::new(store.clone())),
            Arc::new(PolicyInfoTool::new(store.clone())),
            Arc::new(ClaimCoverageTool::new(store.clone())),
            Arc::new(PaymentStatusTool::new(store.clone())),
            Arc::new(ClaimStatusTool::new(store)),
            Arc::new(GenerateQuoteTool::new(quote_api)),
        ])
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn InsuranceTool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }
}

#[async_trait]
impl ToolDispatcher for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.input_schema(),
            })
            .collect()
    }

    async fn dispatch(&self, name: &str, arguments: &str) -> Result<Value, ToolError> {
        let tool = self
            .find(name)
            .ok_or_else(|| ToolError::SchemaViolation(format!("unknown tool: {name}")))?;
        let input = parse_arguments(arguments)?;

        tracing::debug!(tool = name, "dispatching tool call");
        let started = Instant::now();
        let result = tool.execute(input).await;
        match &result {
            Ok(_) => tracing::info!(
                tool = name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "tool call completed"
            ),
            Err(err) => tracing::warn!(tool = name, error = %err, "tool call failed"),
        }
        result
    }
}

/// Parse the model-produced argument text. Empty text means no arguments.
fn parse_arguments(arguments: &str) -> Result<Value, ToolError> {
    let trimmed = arguments.trim();
    if trimmed.is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(trimmed)
        .map_err(|err| ToolError::SchemaViolation(format!("arguments are not valid JSON: {err}")))
}

/// Deserialize a typed tool input, mapping serde failures to SchemaViolation
pub(crate) fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|err| ToolError::SchemaViolation(err.to_string()))
}

/// JSON schema for a typed tool input. The `$schema` key is stripped since
/// model providers reject it.
pub(crate) fn input_schema_for<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| json!({"type": "object", "properties": {}}));
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
    }
    schema
}

/// Wrap a tool result in the ok envelope the model receives
pub(crate) fn ok_envelope<T: Serialize>(payload: &T) -> Value {
    let mut value = serde_json::to_value(payload).unwrap_or_else(|_| json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.insert("status".to_string(), json!("ok"));
    }
    value
}

/// Error envelope fed back to the model in place of a result
pub fn error_envelope(err: &ToolError) -> Value {
    json!({ "status": "error", "message": err.user_message() })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl InsuranceTool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echo the input back"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, input: Value) -> Result<Value, ToolError> {
            Ok(json!({ "status": "ok", "echo": input }))
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(vec![Arc::new(EchoTool)])
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let err = registry().dispatch("nope", "{}").await.unwrap_err();
        assert!(matches!(err, ToolError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_dispatch_malformed_arguments() {
        let err = registry().dispatch("echo", "{not json").await.unwrap_err();
        assert!(matches!(err, ToolError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_dispatch_empty_arguments_become_empty_object() {
        let value = registry().dispatch("echo", "").await.unwrap();
        assert_eq!(value["echo"], json!({}));
    }

    #[test]
    fn test_definitions_expose_schema() {
        let defs = registry().definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].parameters["type"], "object");
    }

    #[test]
    fn test_user_messages_are_french_and_safe() {
        let err = ToolError::DataAccessFailure("connection refused to 10.0.0.3".to_string());
        assert!(err.user_message().contains("accéder aux données"));
        assert!(!err.user_message().contains("10.0.0.3"));

        let err = ToolError::UpstreamFailure("timeout".to_string());
        assert!(err.user_message().contains("devis"));
    }

    #[test]
    fn test_error_display_keys_route_the_safe_message_mapping() {
        // The adapter layer keys on "database" / "API" in the raw text.
        assert!(ToolError::DataAccessFailure(String::new())
            .to_string()
            .contains("database"));
        assert!(ToolError::UpstreamFailure(String::new())
            .to_string()
            .contains("API"));
    }

    #[test]
    fn test_persistence_error_conversion() {
        let err: ToolError = PersistenceError::NotFound {
            entity_type: "contrat".to_string(),
            identifier: "X-1".to_string(),
        }
        .into();
        assert!(matches!(err, ToolError::NotFound(_)));

        let err: ToolError = PersistenceError::Connection("pool exhausted".to_string()).into();
        assert!(matches!(err, ToolError::DataAccessFailure(_)));
    }

    #[test]
    fn test_envelopes() {
        #[derive(Serialize)]
        struct Out {
            total: u32,
        }
        let ok = ok_envelope(&Out { total: 3 });
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["total"], 3);

        let err = error_envelope(&ToolError::NotFound("x".to_string()));
        assert_eq!(err["status"], "error");
        assert!(err["message"].as_str().unwrap().starts_with("Aucune information"));
    }
}
