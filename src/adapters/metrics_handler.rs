use async_trait::async_trait;
use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use serde_json::Value;
use std::sync::Arc;

use crate::agent::ToolDefinition;
use crate::tools::{ToolDispatcher, ToolError};

pub struct MetricsCollector {
    registry: Registry,

    // Request metrics
    pub requests_total: CounterVec,

    // Chat run metrics
    pub chat_runs_total: CounterVec,
    pub chat_run_duration: Histogram,
    pub chat_runs_in_flight: Gauge,

    // Tool metrics
    pub tool_executions: CounterVec,
    pub tool_duration: HistogramVec,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("aegis_requests_total", "Total number of API requests"),
            &["endpoint"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let chat_runs_total = CounterVec::new(
            Opts::new("aegis_chat_runs_total", "Total chat runs by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(chat_runs_total.clone()))?;

        let chat_run_duration = Histogram::with_opts(HistogramOpts::new(
            "aegis_chat_run_duration_seconds",
            "Chat run duration in seconds",
        ))?;
        registry.register(Box::new(chat_run_duration.clone()))?;

        let chat_runs_in_flight = Gauge::new(
            "aegis_chat_runs_in_flight",
            "Number of chat runs currently streaming",
        )?;
        registry.register(Box::new(chat_runs_in_flight.clone()))?;

        let tool_executions = CounterVec::new(
            Opts::new("aegis_tool_executions_total", "Total tool executions"),
            &["tool", "outcome"],
        )?;
        registry.register(Box::new(tool_executions.clone()))?;

        let tool_duration = HistogramVec::new(
            HistogramOpts::new("aegis_tool_duration_seconds", "Tool execution duration"),
            &["tool"],
        )?;
        registry.register(Box::new(tool_duration.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            chat_runs_total,
            chat_run_duration,
            chat_runs_in_flight,
            tool_executions,
            tool_duration,
        })
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

pub struct MetricsHandler {
    collector: Arc<MetricsCollector>,
}

impl MetricsHandler {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }

    pub async fn metrics(&self) -> String {
        self.collector.encode().unwrap_or_else(|e| {
            tracing::error!("Failed to encode metrics: {}", e);
            String::from("# Error encoding metrics\n")
        })
    }
}

/// Tool dispatcher wrapper counting executions and timing them.
pub struct InstrumentedTools {
    inner: Arc<dyn ToolDispatcher>,
    metrics: Arc<MetricsCollector>,
}

impl InstrumentedTools {
    pub fn new(inner: Arc<dyn ToolDispatcher>, metrics: Arc<MetricsCollector>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl ToolDispatcher for InstrumentedTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.inner.definitions()
    }

    async fn dispatch(&self, name: &str, arguments: &str) -> Result<Value, ToolError> {
        let timer = self
            .metrics
            .tool_duration
            .with_label_values(&[name])
            .start_timer();
        let result = self.inner.dispatch(name, arguments).await;
        timer.observe_duration();

        let outcome = if result.is_ok() { "ok" } else { "error" };
        self.metrics
            .tool_executions
            .with_label_values(&[name, outcome])
            .inc();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct OkTools;

    #[async_trait]
    impl ToolDispatcher for OkTools {
        fn definitions(&self) -> Vec<ToolDefinition> {
            Vec::new()
        }

        async fn dispatch(&self, name: &str, _arguments: &str) -> Result<Value, ToolError> {
            match name {
                "getClaimStatus" => Ok(json!({"status": "ok"})),
                other => Err(ToolError::SchemaViolation(format!("unknown tool: {other}"))),
            }
        }
    }

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new();
        assert!(collector.is_ok());
    }

    #[test]
    fn test_metrics_encoding() {
        let collector = MetricsCollector::new().unwrap();

        collector
            .requests_total
            .with_label_values(&["/api/chat"])
            .inc();
        collector
            .chat_runs_total
            .with_label_values(&["completed"])
            .inc();

        let encoded = collector.encode().unwrap();
        assert!(encoded.contains("aegis_requests_total"));
        assert!(encoded.contains("aegis_chat_runs_total"));
    }

    #[tokio::test]
    async fn test_metrics_handler() {
        let collector = Arc::new(MetricsCollector::new().unwrap());
        let handler = MetricsHandler::new(collector.clone());

        collector
            .requests_total
            .with_label_values(&["/api/models"])
            .inc();

        let metrics = handler.metrics().await;
        assert!(metrics.contains("aegis_requests_total"));
    }

    #[tokio::test]
    async fn test_instrumented_dispatch_counts_outcomes() {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let tools = InstrumentedTools::new(Arc::new(OkTools), metrics.clone());

        tools.dispatch("getClaimStatus", "{}").await.unwrap();
        tools.dispatch("nope", "{}").await.unwrap_err();

        let ok = metrics
            .tool_executions
            .with_label_values(&["getClaimStatus", "ok"])
            .get();
        let err = metrics
            .tool_executions
            .with_label_values(&["nope", "error"])
            .get();
        assert_eq!(ok as u64, 1);
        assert_eq!(err as u64, 1);
    }
}
