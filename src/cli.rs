use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::{ServerConfig, DEFAULT_PASSWORD, DEFAULT_USERNAME};
use crate::error::AVAILABLE_ENDPOINTS;

#[derive(Parser, Debug)]
#[command(name = "icontrol-sim")]
#[command(about = "Simulate a BIG-IP iControl REST management API")]
#[command(version)]
pub struct Args {
    /// Address to listen on
    #[arg(long, value_name = "ADDR", default_value = "0.0.0.0")]
    pub bind_addr: String,

    /// Port to listen on
    #[arg(short, long, value_name = "PORT", env = "F5_SIM_PORT", default_value_t = crate::config::DEFAULT_PORT)]
    pub port: u16,

    /// Username accepted by basic auth and login
    #[arg(long, env = "F5_USERNAME", default_value = DEFAULT_USERNAME)]
    pub username: String,

    /// Password accepted by basic auth and login
    #[arg(long, env = "F5_PASSWORD", default_value = DEFAULT_PASSWORD, hide_env_values = true)]
    pub password: String,

    /// Path to a .env file providing F5_USERNAME / F5_PASSWORD
    #[arg(long, value_name = "FILE")]
    pub env_file: Option<PathBuf>,

    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Log level implied by the `-v` count
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Startup banner listing the listen address, credentials and endpoints.
/// Pure function - returns a formatted string.
pub fn format_banner(config: &ServerConfig) -> String {
    let mut output = String::new();

    output.push_str(&format!("iControl REST simulator on http://{}\n", config.addr));
    output.push_str(&format!(
        "Default credentials: {}:{}\n",
        config.credentials.username, config.credentials.password
    ));
    output.push_str("Endpoints:\n");
    for endpoint in AVAILABLE_ENDPOINTS {
        output.push_str(&format!("  {}\n", endpoint));
    }

    output
}
