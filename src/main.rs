use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use revid_serve::{AppState, Config, config::resolve_served_root, create_router};

#[derive(Parser, Debug)]
#[command(name = "revid-serve")]
#[command(about = "A simple static file server")]
#[command(
    long_about = "revid-serve is a secure static file server.\n\n\
                  Directories are shown as HTML listings, files are streamed as-is."
)]
#[command(after_help = "Examples:\n  revid-serve -d ./media\n  revid-serve -d . -p 8080")]
#[command(version)]
struct Cli {
    /// Directory to serve (required)
    #[arg(short, long, env = "REVID_SERVE_DIR")]
    dir: PathBuf,

    /// Port to listen on
    #[arg(short, long, env = "REVID_SERVE_PORT", default_value_t = 8080)]
    port: u16,

    /// Address to bind to (overrides the config file)
    #[arg(short, long, env = "REVID_SERVE_BIND")]
    bind: Option<IpAddr>,

    /// Config file path (optional)
    #[arg(short, long, env = "REVID_SERVE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, env = "REVID_SERVE_VERBOSE")]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(err) = run(cli).await {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn init_logging(cli: &Cli) {
    let filter = if cli.verbose {
        "revid_serve=debug,tower_http=debug"
    } else {
        "revid_serve=info,tower_http=info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if cli.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Load config from file if provided, otherwise use defaults
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind = bind.to_string();
    }

    let root = resolve_served_root(&cli.dir).context("invalid serve directory")?;
    info!("Serving files from: {}", root.path().display());

    let ip: IpAddr = config
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.bind))?;
    let addr = SocketAddr::new(ip, cli.port);

    let app = create_router(AppState::with_config(root, config));

    info!("Starting server...");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    info!("Server is running at http://localhost:{}", cli.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("running server")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("failed to install signal handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
