pub mod cli;
pub mod commands;
pub mod config;

use anyhow::Result;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub use mtx_core as core;
pub use mtx_core::capture;
pub use mtx_core::model;
pub use mtx_core::parser;
pub use mtx_core::views;

pub use mtx_core::AppConfig;

pub const LOG_ENV: &str = "MTX_LOG";

/// Install the stderr subscriber. `--log` wins; otherwise `MTX_LOG`, then `warn`.
pub fn init_tracing(filter: Option<String>) -> Result<()> {
    let builder = EnvFilter::builder()
        .with_env_var(LOG_ENV)
        .with_default_directive(LevelFilter::WARN.into());
    let env_filter = match filter {
        Some(filter) => builder.parse(filter)?,
        None => builder.from_env_lossy(),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}
