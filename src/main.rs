use anyhow::Context;

use beauty_book::app::{AppState, router};
use beauty_book::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;
    let stripe_key = if config.stripe_secret_key.is_some() {
        "present"
    } else {
        "absent"
    };
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        db_path = %config.db_path.display(),
        session_cookie = %config.session_cookie,
        stripe_key,
        "Starting Beauty Book"
    );

    // ── Database ─────────────────────────────────────────────────────────
    let state = AppState::open(&config)
        .await
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;

    // ── HTTP ─────────────────────────────────────────────────────────────
    let app = router(&state, &config);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
