//! Runtime configuration: environment variables, overridden by
//! `--flag value` pairs on the command line.

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;

pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
pub const DEFAULT_DB: &str = "pigg.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: SocketAddr,
    /// SQLite path, `file:` URI, or `:memory:`.
    pub db: String,
}

impl Config {
    pub fn load(args: &[String]) -> Result<Self> {
        Self::from_sources(args, |key| env::var(key).ok())
    }

    pub fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind = setting(args, "--bind", "PIGG_BIND", &env, DEFAULT_BIND);
        let bind = bind
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid bind address {bind:?}"))?;
        let db = setting(args, "--db", "PIGG_DB", &env, DEFAULT_DB);
        Ok(Self { bind, db })
    }
}

fn setting(
    args: &[String],
    flag: &str,
    key: &str,
    env: &impl Fn(&str) -> Option<String>,
    default: &str,
) -> String {
    if let Some(w) = args.windows(2).find(|w| w[0] == flag) {
        return w[1].clone();
    }
    env(key).unwrap_or_else(|| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    })
}
