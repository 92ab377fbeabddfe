//! Error types for the conversation agent

use thiserror::Error;

/// Errors specific to LLM gateway operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// API error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Authentication error
    #[error("Gateway authentication failed: {0}")]
    Authentication(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Streaming error
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::Network(format!("Connection error: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Map a raw error text to the message shown to the client.
///
/// Internal error details never reach the chat stream; the raw text is
/// only inspected for routing, first match wins.
pub fn safe_user_message(raw: &str) -> &'static str {
    if raw.contains("database") {
        "Je rencontre actuellement des difficultés pour accéder aux données. Veuillez réessayer dans quelques instants."
    } else if raw.contains("API") {
        "Le service de devis est temporairement indisponible. Veuillez réessayer plus tard."
    } else if raw.contains("authentication") {
        "Problème d'authentification. Veuillez vérifier vos informations de connexion."
    } else {
        "Une erreur s'est produite lors du traitement de votre demande. Veuillez réessayer."
    }
}
