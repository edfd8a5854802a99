use anyhow::Result;
use clap::Parser;
use nut_monitor::config::{Config, MonitorConfig};
use nut_monitor::server;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// NUT daemon host; replaces the configured monitors with a single
    /// monitor named "default"
    #[arg(long, env = "NUT_HOST")]
    nut_host: Option<String>,

    /// NUT daemon port (used with --nut-host)
    #[arg(long, env = "NUT_PORT", default_value = "3493")]
    nut_port: u16,

    /// NUT username (used with --nut-host)
    #[arg(long, env = "NUT_USERNAME")]
    nut_username: Option<String>,

    /// NUT password (used with --nut-host)
    #[arg(long, env = "NUT_PASSWORD")]
    nut_password: Option<String>,

    /// Port to listen on for the HTTP endpoints
    #[arg(short, long, env = "MONITOR_PORT", default_value = "9199")]
    port: u16,

    /// Address to bind to
    #[arg(short, long, env = "MONITOR_ADDR", default_value = "0.0.0.0")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting NUT Monitor v{}", env!("CARGO_PKG_VERSION"));

    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if let Some(host) = args.nut_host {
        let mut monitor = MonitorConfig::new("default", host);
        monitor.port = args.nut_port;
        monitor.username = args.nut_username;
        monitor.password = args
            .nut_password
            .map(|password| secrecy::SecretString::new(password.into()));
        config.monitors = vec![monitor];
    }
    config.server.port = args.port;
    config.server.addr = args.addr;
    config.validate()?;

    info!("Configuration loaded successfully");
    info!(
        "Monitoring {} NUT server(s): {}",
        config.monitors.len(),
        config
            .monitors
            .iter()
            .map(|m| format!("{} ({}:{})", m.name, m.host, m.port))
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!(
        "Metrics endpoint: http://{}:{}/metrics",
        config.server.addr, config.server.port
    );

    // Start the monitor
    if let Err(e) = server::start(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
