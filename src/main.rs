use std::time::Duration;

use battleship_server::{
    init_logging, init_logging_with, AiStrategy, Server, ServerConfig, DEFAULT_PORT,
};
use clap::Parser;
use log::{info, LevelFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Lobby and game server for two-player naval combat", long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Thinking pause before each computer shot, in milliseconds
    #[arg(long, default_value_t = 1000)]
    ai_delay_ms: u64,
    /// Computer targeting: `hunt` follows up on hits, `random` never does
    #[arg(long, default_value_t = AiStrategy::Hunt)]
    ai_strategy: AiStrategy,
    /// Silently drop game-rule violations instead of answering with ERROR
    #[arg(long)]
    lenient: bool,
    #[arg(long, help = "Fix RNG seed for reproducible AI games (e.g., --seed 12345)")]
    seed: Option<u64>,
    /// Log level (error, warn, info, debug, trace); overrides BATTLESHIP_LOG
    #[arg(long)]
    log_level: Option<LevelFilter>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            ai_delay: Duration::from_millis(args.ai_delay_ms),
            ai_strategy: args.ai_strategy,
            report_rule_violations: !args.lenient,
            seed: args.seed,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    match args.log_level {
        Some(level) => init_logging_with(level),
        None => init_logging(),
    }
    if let Some(seed) = args.seed {
        info!("Using fixed seed: {} (AI games will be reproducible)", seed);
    }

    let server = Server::bind(args.into()).await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await
}
