use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quotalink::{
    config::AppConfig, handlers, service::LinkService, shell::Shell, store::LinkStore,
    sweeper::ExpirySweeper, AppState,
};

#[derive(Parser)]
#[command(name = "quotalink", version, about = "Short links with visit quotas and expiry")]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, Copy)]
enum Mode {
    /// Interactive command shell (default)
    Shell,
    /// HTTP server
    Serve,
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent; env vars may already be set)
    dotenvy::dotenv().ok();

    // Logs go to stderr so the shell's stdout stays readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quotalink=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Default limit {}, TTL {} min, sweep every {}s, display domain {}",
        config.default_visit_limit,
        config.default_ttl_minutes,
        config.sweep_interval_seconds,
        config.display_domain
    );

    let links = Arc::new(LinkService::new(LinkStore::new(), config.link_policy()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = ExpirySweeper::spawn(links.clone(), config.sweep_interval(), shutdown_rx);

    let interrupted = match cli.mode.unwrap_or(Mode::Shell) {
        Mode::Shell => run_shell(links).await?,
        Mode::Serve => {
            serve(config, links).await?;
            false
        }
    };

    let _ = shutdown_tx.send(true);
    sweeper.await?;

    if interrupted {
        // A pending stdin read would otherwise hold the runtime open.
        std::process::exit(0);
    }
    Ok(())
}

/// Run the interactive shell until `exit`, end of input, or Ctrl-C.
/// Returns `true` when interrupted.
async fn run_shell(links: Arc<LinkService>) -> anyhow::Result<bool> {
    let mut shell = Shell::new(links);
    tracing::info!("Shell session owner {}", shell.owner());

    tokio::select! {
        result = shell.run(tokio::io::stdin(), tokio::io::stdout()) => {
            result?;
            Ok(false)
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(true)
        }
    }
}

async fn serve(config: AppConfig, links: Arc<LinkService>) -> anyhow::Result<()> {
    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, links));
    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
