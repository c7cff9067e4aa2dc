use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use thiserror::Error;

use crate::cli::Args;

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "f5password";
pub const DEFAULT_PORT: u16 = 8080;

/// Errors while assembling the server configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load env file {path}: {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Invalid bind address: {0}")]
    InvalidBindAddr(String),

    #[error("Username must not be empty")]
    EmptyUsername,
}

/// The fixed username/password pair accepted by the management API
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME, DEFAULT_PASSWORD)
    }
}

// Keep the password out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything the server needs at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub credentials: Credentials,
}

impl ServerConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let ip: IpAddr = args
            .bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(args.bind_addr.clone()))?;

        if args.username.is_empty() {
            return Err(ConfigError::EmptyUsername);
        }

        Ok(Self {
            addr: SocketAddr::new(ip, args.port),
            credentials: Credentials::new(args.username.clone(), args.password.clone()),
        })
    }
}

/// Load a .env file into the process environment.
///
/// Must run before the CLI is parsed so `F5_USERNAME`/`F5_PASSWORD` from the
/// file are visible to clap's `env` fallbacks.
pub fn load_env_file(path: &Path) -> Result<(), ConfigError> {
    dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
        path: path.display().to_string(),
        source,
    })
}
