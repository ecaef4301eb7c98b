use std::sync::Arc;

use fabri8_api::api::{self, AppState};
use fabri8_api::config::AppConfig;
use fabri8_api::infrastructure::repositories::FsProjectRepository;
use fabri8_api::llm::{OpenRouterClient, RateLimiter};
use fabri8_api::workflow::{BroadcastNotifier, Orchestrator};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Initialize tracing, RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rate_limiter = Arc::new(RateLimiter::per_second(config.rate_limit_calls));
    let generator = Arc::new(
        OpenRouterClient::new(&config, rate_limiter).expect("Failed to build OpenRouter client"),
    );
    tracing::info!(endpoint = generator.endpoint(), "Generation client ready");

    let notifier = Arc::new(BroadcastNotifier::new());
    let mut notifications = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(notification) => tracing::info!(
                    target: "fabri8_api::progress",
                    run_id = %notification.run_id,
                    phase = notification.phase,
                    kind = ?notification.kind,
                    role = ?notification.role,
                    "{}",
                    notification.message
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Progress subscriber lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let orchestrator = Orchestrator::from_config(&config, generator, notifier)
        .expect("Invalid workflow plan");
    let projects = FsProjectRepository::new(config.output_dir.clone());
    tracing::info!(output_dir = %config.output_dir.display(), "Storing projects");

    let app = api::router(AppState::new(Arc::new(orchestrator), Arc::new(projects)));

    // Start server
    let addr = config.socket_addr().expect("Invalid server address");
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed");
}
