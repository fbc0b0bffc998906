use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tryon_proxy::{app::App, models::Config, server::Server};

#[derive(Debug, Parser)]
#[command(name = "tryon-proxy")]
#[command(about = "Serve virtual try-on requests against image providers")]
struct CliArgs {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000", value_parser = parse_bind_arg)]
    bind: SocketAddr,
}

fn parse_bind_arg(input: &str) -> std::result::Result<SocketAddr, String> {
    input
        .parse()
        .map_err(|_| format!("Invalid address '{}'. Expected HOST:PORT", input))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tryon_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tryon-proxy");

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app = App::new(&config);
    if let Err(e) = Server::start(app, args.bind).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
