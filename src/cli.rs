//! Command-line flags layered over the configuration file.

use clap::Parser;

use crate::config::AppConfig;

/// Reverse proxy folding upstream reasoning into the visible answer stream.
#[derive(Debug, Parser)]
#[command(name = "thinkbridge")]
#[command(about = "Reasoning-aware reverse proxy for chat completion APIs")]
#[command(version)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short = 'c', long = "config", default_value = "config.yaml")]
    pub config: String,

    /// Log full request and response bodies of non-stream exchanges
    #[arg(long = "debug")]
    pub debug: bool,

    /// Override `server.port` from the configuration file
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
}

impl Cli {
    /// Apply flag overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if self.debug {
            config.features.debug_exchanges = true;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}
