// src/main.rs
mod cli;

use clap::Parser;
use env_logger::Builder;
use log::{error, LevelFilter};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = cli::Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_timestamp_secs()
        .init();

    if let Err(e) = cli::run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
