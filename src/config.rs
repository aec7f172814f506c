//! Configuration management for shell-socket.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::ServerConfig;
use crate::cli::Args;
use crate::execution::ShellExecutor;
use crate::security::AuthConfig;
use crate::workspace::DEFAULT_PROMPT_SUFFIX;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Authentication configuration.
    pub auth: AuthSection,
    /// Command execution and navigation.
    pub shell: ShellSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Search upward for a free port when `port` is taken.
    pub find_next_port: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8099,
            find_next_port: false,
        }
    }
}

/// Authentication configuration section.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Enable authentication.
    pub enabled: bool,
    /// The only accepted user name.
    pub user: String,
    /// Password for `user`.
    pub password: Option<String>,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            enabled: false,
            user: "admin".to_string(),
            password: None,
        }
    }
}

impl std::fmt::Debug for AuthSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSection")
            .field("enabled", &self.enabled)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Shell configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSection {
    /// Directory a bare `cd` returns to.
    pub home: Option<PathBuf>,
    /// Shell program; the platform shell when unset.
    pub program: Option<String>,
    /// Flag passing the command line to `program`.
    pub flag: Option<String>,
    /// Text appended to the working directory to form the prompt.
    pub prompt_suffix: String,
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            home: None,
            program: None,
            flag: None,
            prompt_suffix: DEFAULT_PROMPT_SUFFIX.to_string(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("SHELL_SOCKET_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("SHELL_SOCKET_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Some(password) = var("SHELL_SOCKET_PASSWORD") {
            if !password.is_empty() {
                self.auth.enabled = true;
                self.auth.password = Some(password);
            }
        }

        if let Some(home) = var("SHELL_SOCKET_HOME") {
            self.shell.home = Some(PathBuf::from(home));
        } else if self.shell.home.is_none() {
            self.shell.home = var("HOME").filter(|h| !h.is_empty()).map(PathBuf::from);
        }

        if let Some(level) = var("SHELL_SOCKET_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if args.find_next_port {
            self.server.find_next_port = true;
        }

        if let Some(ref password) = args.password {
            self.auth.enabled = true;
            self.auth.password = Some(password.clone());
        }

        if args.no_auth {
            self.auth.enabled = false;
        }

        if let Some(ref home) = args.home {
            self.shell.home = Some(home.clone());
        }
        if let Some(ref shell) = args.shell {
            self.shell.program = Some(shell.clone());
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Check settings that cannot be defaulted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.enabled && self.password().is_none() {
            return Err(ConfigError::MissingPassword);
        }
        if self.auth.enabled && self.auth.user.is_empty() {
            return Err(ConfigError::InvalidUser);
        }
        Ok(())
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        Ok(ServerConfig::new(host.to_string(), self.server.port)
            .with_find_next_port(self.server.find_next_port))
    }

    /// Gatekeeper settings.
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            enabled: self.auth.enabled,
            user: self.auth.user.clone(),
            ..AuthConfig::default()
        }
    }

    /// The configured password, if non-empty.
    pub fn password(&self) -> Option<&str> {
        self.auth.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Executor for the configured shell.
    pub fn executor(&self) -> ShellExecutor {
        match self.shell.program {
            Some(ref program) => {
                let default_flag = if cfg!(windows) { "/C" } else { "-c" };
                let flag = self.shell.flag.as_deref().unwrap_or(default_flag);
                ShellExecutor::new(program.clone(), flag)
            }
            None => ShellExecutor::system_default(),
        }
    }

    /// Home directory for bare `cd`, falling back to `start`.
    pub fn home_dir(&self, start: &Path) -> PathBuf {
        self.shell
            .home
            .clone()
            .unwrap_or_else(|| start.to_path_buf())
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
    /// Authentication is enabled without a password.
    MissingPassword,
    /// Authentication is enabled with an empty user name.
    InvalidUser,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
            Self::MissingPassword => write!(
                f,
                "authentication is enabled but no password is set (use --password, SHELL_SOCKET_PASSWORD or --no-auth)"
            ),
            Self::InvalidUser => write!(f, "authentication user name must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}
