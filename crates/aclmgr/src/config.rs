//! Configuration file support for aclmgr
//!
//! Loads and validates aclmgr configuration from TOML files.
//! Default location: /etc/aclmgr/aclmgr.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tnsr_acl_common::{AclPaths, DEFAULT_API_PATH, DEFAULT_MODULE};

use crate::error::{AclMgrError, Result};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/aclmgr/aclmgr.toml";

/// RESTCONF endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestconfConfig {
    /// URL scheme (http or https)
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Host name or address of the TNSR instance
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port, scheme default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// RESTCONF API root
    #[serde(default = "default_api_path")]
    pub api_path: String,

    /// YANG module prefix of the ACL model
    #[serde(default = "default_module")]
    pub module: String,

    /// Accept self-signed or otherwise invalid TLS certificates
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (overridden by RUST_LOG)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub json: bool,
}

/// Complete aclmgr configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AclMgrConfig {
    /// RESTCONF endpoint
    #[serde(default)]
    pub restconf: RestconfConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default functions
fn default_scheme() -> String {
    "https".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_api_path() -> String {
    DEFAULT_API_PATH.to_string()
}

fn default_module() -> String {
    DEFAULT_MODULE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for RestconfConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: default_host(),
            port: None,
            api_path: default_api_path(),
            module: default_module(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl RestconfConfig {
    /// Base URL of the RESTCONF API, e.g. `https://tnsr:8443/restconf`
    pub fn base_url(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}{}", self.scheme, self.host, port, self.api_path),
            None => format!("{}://{}{}", self.scheme, self.host, self.api_path),
        }
    }

    /// URL builder for this endpoint
    pub fn paths(&self) -> Result<AclPaths> {
        Ok(AclPaths::new(&self.base_url(), self.module.clone())?)
    }
}

impl AclMgrConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                let config = toml::from_str(&content).map_err(|e| {
                    AclMgrError::Config(format!(
                        "Failed to parse config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                eprintln!(
                    "aclmgr: Config file {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(AclMgrError::Io(e)),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> Result<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AclMgrError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let restconf = &self.restconf;

        if restconf.scheme != "http" && restconf.scheme != "https" {
            return Err(AclMgrError::Config(format!(
                "scheme must be http or https, got '{}'",
                restconf.scheme
            )));
        }

        if restconf.host.trim().is_empty() {
            return Err(AclMgrError::Config("host must not be empty".to_string()));
        }

        if restconf.port == Some(0) {
            return Err(AclMgrError::Config("port must be > 0".to_string()));
        }

        if !restconf.api_path.starts_with('/') {
            return Err(AclMgrError::Config(format!(
                "api_path must start with '/', got '{}'",
                restconf.api_path
            )));
        }

        if restconf.module.trim().is_empty() {
            return Err(AclMgrError::Config("module must not be empty".to_string()));
        }

        restconf.paths()?;
        Ok(())
    }
}
