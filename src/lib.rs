pub use mtx_cli::cli;
pub use mtx_cli::commands;
pub use mtx_cli::config;
pub use mtx_cli::init_tracing;
pub use mtx_cli::AppConfig;

pub use mtx_core as core;
pub use mtx_core::capture;
pub use mtx_core::gateway as db;
pub use mtx_core::model;
pub use mtx_core::parser;
pub use mtx_core::store;
