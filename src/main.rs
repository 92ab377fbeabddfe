use aegis::adapters::chat_handler::AppState;
use aegis::adapters::health_handler::HealthHandler;
use aegis::adapters::metrics_handler::{InstrumentedTools, MetricsCollector, MetricsHandler};
use aegis::agent::{ChatSession, GatewayProvider, RunBudgets};
use aegis::cli::Cli;
use aegis::config::Settings;
use aegis::persistence;
use aegis::tools::{QuoteClient, ToolRegistry};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration before tracing so the configured level applies
    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let host = settings.server.host.clone();
    let port = settings.server.port;
    info!("Starting Aegis assistant server on {}:{}", host, port);

    // Database, migrations, and demo data
    let store = persistence::initialize(&settings.database).await?;

    // LLM gateway and quote service clients
    let provider = Arc::new(GatewayProvider::new(&settings.gateway)?);
    let quote_client = Arc::new(QuoteClient::new(&settings.quote_api)?);

    // Tools, instrumented for Prometheus
    let metrics = Arc::new(MetricsCollector::new()?);
    let registry = Arc::new(ToolRegistry::standard(store.clone(), quote_client));
    let tools = Arc::new(InstrumentedTools::new(registry, metrics.clone()));

    let session = ChatSession::new(provider, tools).with_budgets(RunBudgets::new(
        settings.agent.max_steps,
        settings.agent.run_timeout_secs,
    ));

    let app_state = AppState {
        session: Arc::new(session),
        metrics: metrics.clone(),
        default_model: settings.gateway.default_model.clone(),
        web_search_model: settings.gateway.web_search_model.clone(),
    };
    let health_handler = Arc::new(HealthHandler::new(Arc::new(store)));
    let metrics_handler = Arc::new(MetricsHandler::new(metrics));

    let app = aegis::create_app(app_state, health_handler, metrics_handler);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
