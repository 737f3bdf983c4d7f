//! pigg-server: HTTP backend for the PIGG investment simulation.
//!
//! Usage:
//!   pigg-server --bind 0.0.0.0:8787 --db pigg.db
//!   PIGG_DB=:memory: pigg-server

use anyhow::Result;
use pigg_server::config::Config;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = Config::load(&args)?;
    pigg_server::start_server(config).await
}
