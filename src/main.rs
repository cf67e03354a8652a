use anyhow::Context;

use eaisy_mail::api::{AppState, api_routes};
use eaisy_mail::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    eprintln!("✉️  EAIsy Mail v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Owner: {} ({})", config.owner.name, config.owner.language);
    eprintln!("   Model: {:?} / {}", config.llm.backend, config.llm.model);
    eprintln!(
        "   SMTP: {}:{} ({:?})",
        config.mail.smtp_host, config.mail.smtp_port, config.mail.security
    );
    eprintln!("   Recipient: {}", config.mail.recipient);
    eprintln!("   Templates: {}", config.template_path.display());
    eprintln!("   API: http://0.0.0.0:{}/api\n", config.port);

    let state = AppState::from_config(&config)
        .await
        .context("Failed to initialize services")?;
    let app = api_routes(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
