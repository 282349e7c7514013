use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use auth_gate::app::create_app;
use auth_gate::config::Config;
use auth_gate::logging::Severity;
use auth_gate::verifier::JwksVerifier;

#[derive(Parser, Debug)]
#[command(author, version, about = "forward-authentication decision service", long_about = None)]
struct Cli {
    /// Path of the configuration file
    #[arg(short = 'c', long)]
    configuration: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    let cli = Cli::parse();

    // An invalid configuration is fatal; the listener never opens.
    let config = Config::load(&cli.configuration)?;
    init_tracing(config.log_level);

    let verifier = JwksVerifier::new(
        config.jwks_uri.as_str(),
        config.audience.as_str(),
        config.issuer.as_str(),
        config.algorithms()?,
    )?;
    let app = create_app(&config, Arc::new(verifier))?;

    let port = std::env::var("APP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8888);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing(level: Severity) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    // RUST_LOG wins when set; otherwise gate on the configured level while
    // keeping the audit target open so decision lines always come through.
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!("{},audit=info", level.as_str()))
        });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
