use clap::Parser;
use gemini_relay::config::{config_search_paths, load_env_file};
use gemini_relay::{build_router, AppState, RelayConfig, SharedLogger, Upstream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "gemini-relay",
    about = "Relay chat messages to the Gemini generateContent API",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Exchange log file path
    #[arg(long, default_value = "gemini-relay.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A missing .env is fine; the key may come from the real environment.
    if let Err(e) = load_env_file(Path::new(".env")) {
        warn!(error = %e, "Ignoring .env");
    }

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = RelayConfig::find_and_load(cli.config.as_deref())?;

    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    // Fails fast when the API key is missing: nothing is bound yet.
    let upstream = Upstream::from_config(&config)?;

    let logger = SharedLogger::new(&cli.log_file)?;

    info!("gemini-relay v{}", env!("CARGO_PKG_VERSION"));
    info!("  Upstream:  {}", upstream.url());
    info!("  Timeout:   {}s", config.upstream.timeout_secs);
    info!("  CORS:      {}", config.cors.allow_origins.join(", "));
    info!("  Log file:  {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting gemini-relay upstream={} bind={}",
            upstream.url(),
            config.bind_addr()
        ),
    );

    let bind_addr = config.bind_addr();
    let state = Arc::new(AppState {
        config,
        upstream,
        logger,
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
