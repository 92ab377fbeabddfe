pub mod chat_handler;
pub mod health_handler;
pub mod metrics_handler;

pub use chat_handler::{chat, list_models, AppState};
pub use health_handler::HealthHandler;
pub use metrics_handler::{InstrumentedTools, MetricsCollector, MetricsHandler};
