use project_service::config::AppConfig;
use project_service::error::AppError;
use project_service::observability::init_tracing;
use project_service::services::init_metrics;
use project_service::startup::Application;
use tokio::signal;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = AppConfig::load()?;

    init_tracing(&config.common.log_level);

    // Initialize metrics recorder (must be before any metrics are recorded)
    init_metrics();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.common.port,
        "Starting project-service"
    );

    let app = Application::build(config).await?;

    tokio::select! {
        result = app.run_until_stopped() => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {}
    }

    Ok(())
}
