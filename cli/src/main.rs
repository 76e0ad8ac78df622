mod commands;

use std::env;
use std::process::ExitCode;

use argcommand_core::error::Result;
use argcommand_core::{DispatchConfig, execute_with};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable naming an optional YAML dispatch config.
const CONFIG_ENV: &str = "ARGCOMMAND_CONFIG";

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let config = load_config()?;
    Ok(execute_with(&commands::app(), config))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Result<DispatchConfig> {
    match env::var_os(CONFIG_ENV) {
        Some(path) => {
            debug!(path = %path.to_string_lossy(), "loading dispatch config");
            Ok(DispatchConfig::load(path)?)
        }
        None => Ok(DispatchConfig::default()),
    }
}
