//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `WC_*`
//! environment variables, and merging configurations with proper
//! precedence rules.
//!
//! ```toml
//! [defaults]
//! timeout = "15s"
//! port = 43
//! accept_invalid_certs = false
//! servers_file = "/etc/whois-check/servers.json"
//!
//! [servers]
//! test = ["whois.nic.test", "NOT FOUND"]
//!
//! [output]
//! json = true
//! ```

use crate::directory::{RouteEntry, StaticDirectory};
use crate::error::WhoisError;
use crate::types::LookupConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for lookup options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Extra or overriding server table rows, `tld = [server, rule?]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<HashMap<String, Vec<String>>>,

    /// Output formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Timeout for every network wait (as string, e.g., "5s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Socket connect timeout, overrides `timeout`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<String>,

    /// HTTP request timeout, overrides `timeout`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_timeout: Option<String>,

    /// WHOIS TCP port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Skip TLS certificate verification for HTTP servers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_invalid_certs: Option<bool>,

    /// JSON server table layered over the bundled one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers_file: Option<String>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Print JSON reports by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,

    /// Print WHOIS text with `<br />` line breaks by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<bool>,
}

impl DefaultsConfig {
    /// Apply these defaults on top of `config`.
    ///
    /// Values are assumed valid; [`ConfigManager::load_file`] checks them.
    pub fn apply_to(&self, mut config: LookupConfig) -> LookupConfig {
        if let Some(timeout) = self.timeout.as_deref().and_then(parse_timeout) {
            config = config.with_timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout.as_deref().and_then(parse_timeout) {
            config = config.with_connect_timeout(timeout);
        }
        if let Some(timeout) = self.http_timeout.as_deref().and_then(parse_timeout) {
            config = config.with_http_timeout(timeout);
        }
        if let Some(port) = self.port {
            config = config.with_whois_port(port);
        }
        if let Some(accept) = self.accept_invalid_certs {
            config = config.with_accept_invalid_certs(accept);
        }
        config
    }
}

impl FileConfig {
    /// The `[servers]` table as a directory overlay.
    pub fn server_overrides(&self) -> Result<StaticDirectory, WhoisError> {
        match &self.servers {
            Some(rows) => StaticDirectory::from_rows(rows.clone()),
            None => Ok(StaticDirectory::new()),
        }
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which config files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if reading, parsing or
    /// validation fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, WhoisError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(WhoisError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            WhoisError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            WhoisError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;
        debug!(path = %path.display(), "Loaded configuration file");

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Looks for configuration files in standard locations and merges them;
    /// later locations win per field. Unreadable or invalid files are
    /// skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, WhoisError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping configuration file"),
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            for (i, path) in loaded_files.iter().enumerate() {
                let status = if i == loaded_files.len() - 1 {
                    "highest precedence"
                } else {
                    "overridden per field"
                };
                info!(path = %path.display(), status, "Configuration file");
            }
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    ///
    /// Looks for configuration files in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./whois-check.toml", "./.whois-check.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Get the global configuration file path.
    ///
    /// Looks for configuration files in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let candidates = [".whois-check.toml", "whois-check.toml"];

        candidates
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// `$XDG_CONFIG_HOME/whois-check/config.toml`.
    ///
    /// An unset or empty `XDG_CONFIG_HOME` falls back to `~/.config`.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let base = match env::var_os("XDG_CONFIG_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from(env::var_os("HOME")?).join(".config"),
        };

        Some(base.join("whois-check").join("config.toml")).filter(|path| path.is_file())
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower_defaults), Some(higher_defaults)) => Some(DefaultsConfig {
                    timeout: higher_defaults.timeout.or(lower_defaults.timeout),
                    connect_timeout: higher_defaults
                        .connect_timeout
                        .or(lower_defaults.connect_timeout),
                    http_timeout: higher_defaults.http_timeout.or(lower_defaults.http_timeout),
                    port: higher_defaults.port.or(lower_defaults.port),
                    accept_invalid_certs: higher_defaults
                        .accept_invalid_certs
                        .or(lower_defaults.accept_invalid_certs),
                    servers_file: higher_defaults.servers_file.or(lower_defaults.servers_file),
                }),
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            servers: match (lower.servers, higher.servers) {
                (Some(mut lower_servers), Some(higher_servers)) => {
                    // Higher precedence wins for the same TLD
                    lower_servers.extend(higher_servers);
                    Some(lower_servers)
                }
                (lower_servers, higher_servers) => higher_servers.or(lower_servers),
            },
            output: match (lower.output, higher.output) {
                (Some(lower_output), Some(higher_output)) => Some(OutputConfig {
                    json: higher_output.json.or(lower_output.json),
                    html: higher_output.html.or(lower_output.html),
                }),
                (lower_output, higher_output) => higher_output.or(lower_output),
            },
        }
    }

    /// Validate a configuration for common issues.
    pub fn validate_config(&self, config: &FileConfig) -> Result<(), WhoisError> {
        if let Some(defaults) = &config.defaults {
            let timeouts = [
                ("timeout", &defaults.timeout),
                ("connect_timeout", &defaults.connect_timeout),
                ("http_timeout", &defaults.http_timeout),
            ];
            for (name, value) in timeouts {
                if let Some(value) = value {
                    if parse_timeout(value).is_none() {
                        return Err(WhoisError::config(format!(
                            "Invalid {} format '{}'. Use format like '5s', '30s', '2m'",
                            name, value
                        )));
                    }
                }
            }

            if defaults.port == Some(0) {
                return Err(WhoisError::config("Port must be between 1 and 65535"));
            }

            if let Some(path) = &defaults.servers_file {
                if path.trim().is_empty() {
                    return Err(WhoisError::config("servers_file cannot be empty"));
                }
            }
        }

        if let Some(servers) = &config.servers {
            for (tld, row) in servers {
                if tld.trim().is_empty() {
                    return Err(WhoisError::config("Server table keys cannot be empty"));
                }
                RouteEntry::from_row(tld, row)?;
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via WC_* environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub timeout: Option<String>,
    pub connect_timeout: Option<String>,
    pub http_timeout: Option<String>,
    pub port: Option<u16>,
    pub insecure: Option<bool>,
    pub servers_file: Option<String>,
    pub config: Option<String>,
    pub json: Option<bool>,
}

impl EnvConfig {
    /// The environment layer as file-style defaults, for merging.
    pub fn to_defaults(&self) -> DefaultsConfig {
        DefaultsConfig {
            timeout: self.timeout.clone(),
            connect_timeout: self.connect_timeout.clone(),
            http_timeout: self.http_timeout.clone(),
            port: self.port,
            accept_invalid_certs: self.insecure,
            servers_file: self.servers_file.clone(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    let parsed = parse_bool(&value);
    if parsed.is_none() {
        warn!(var = name, value = %value, "Invalid boolean, use true/false");
    }
    parsed
}

fn env_timeout(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    if parse_timeout_string(&value).is_some() {
        Some(value)
    } else {
        warn!(var = name, value = %value, "Invalid timeout, use format like '5s', '30s', '2m'");
        None
    }
}

fn env_path(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Load configuration from environment variables.
///
/// Parses all WC_* environment variables and returns a structured
/// configuration. Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    let port = env::var("WC_PORT").ok().and_then(|value| {
        match value.trim().parse::<u16>() {
            Ok(port) if port > 0 => Some(port),
            _ => {
                warn!(var = "WC_PORT", value = %value, "Invalid port, must be 1-65535");
                None
            }
        }
    });

    let env_config = EnvConfig {
        timeout: env_timeout("WC_TIMEOUT"),
        connect_timeout: env_timeout("WC_CONNECT_TIMEOUT"),
        http_timeout: env_timeout("WC_HTTP_TIMEOUT"),
        port,
        insecure: env_bool("WC_INSECURE"),
        servers_file: env_path("WC_SERVERS_FILE"),
        config: env_path("WC_CONFIG"),
        json: env_bool("WC_JSON"),
    };

    debug!(?env_config, "Environment configuration");
    env_config
}

/// Parse a timeout string like "5s", "30s", "2m" into seconds.
///
/// # Arguments
///
/// * `timeout_str` - String representation of timeout
///
/// # Returns
///
/// Number of seconds, or None if parsing fails.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok()
    }
}

/// [`parse_timeout_string`] as a non-zero `Duration`.
pub fn parse_timeout(timeout_str: &str) -> Option<Duration> {
    parse_timeout_string(timeout_str)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{NotFoundRule, ServerDirectory};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("5s"), Some(5));
        assert_eq!(parse_timeout_string("30s"), Some(30));
        assert_eq!(parse_timeout_string("2m"), Some(120));
        assert_eq!(parse_timeout_string("5"), Some(5));
        assert_eq!(parse_timeout_string(" 10S "), Some(10));
        assert_eq!(parse_timeout_string("invalid"), None);
    }

    #[test]
    fn test_parse_timeout_rejects_zero() {
        assert_eq!(parse_timeout("0s"), None);
        assert_eq!(parse_timeout("1m"), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
timeout = "15s"
http_timeout = "1m"
port = 4343
accept_invalid_certs = true

[servers]
test = ["whois.nic.test", "MAXCHARS:40"]
"co.test" = ["https://whois.co.test/?q="]

[output]
json = true
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(temp_file.path()).unwrap();

        let defaults = config.defaults.clone().unwrap();
        assert_eq!(defaults.timeout, Some("15s".to_string()));
        assert_eq!(defaults.port, Some(4343));
        assert_eq!(config.output.as_ref().unwrap().json, Some(true));

        let overlay = config.server_overrides().unwrap();
        assert_eq!(overlay.len(), 2);
        assert_eq!(
            overlay.route("test").unwrap().not_found,
            NotFoundRule::MaxChars(40)
        );
        assert!(overlay.route("co.test").unwrap().is_http());
    }

    #[test]
    fn test_apply_defaults() {
        let defaults = DefaultsConfig {
            timeout: Some("15s".to_string()),
            http_timeout: Some("1m".to_string()),
            port: Some(4343),
            accept_invalid_certs: Some(true),
            ..Default::default()
        };

        let config = defaults.apply_to(LookupConfig::default());
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.read_timeout, Duration::from_secs(15));
        assert_eq!(config.http_timeout, Duration::from_secs(60));
        assert_eq!(config.whois_port, 4343);
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn test_invalid_timeout() {
        let temp_file = write_config("[defaults]\ntimeout = \"soon\"\n");
        let err = ConfigManager::new(false).load_file(temp_file.path()).unwrap_err();
        assert!(matches!(err, WhoisError::ConfigError { .. }));
    }

    #[test]
    fn test_invalid_port() {
        let temp_file = write_config("[defaults]\nport = 0\n");
        assert!(ConfigManager::new(false).load_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_invalid_server_row() {
        let temp_file = write_config("[servers]\ntest = [\"a\", \"b\", \"c\"]\n");
        assert!(ConfigManager::new(false).load_file(temp_file.path()).is_err());

        let temp_file = write_config("[servers]\ntest = [\"whois.nic.test\", \"MAXCHARS:many\"]\n");
        assert!(ConfigManager::new(false).load_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigManager::new(false)
            .load_file("/nonexistent/whois-check.toml")
            .unwrap_err();
        assert!(matches!(err, WhoisError::FileError { .. }));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                timeout: Some("10s".to_string()),
                port: Some(43),
                ..Default::default()
            }),
            servers: Some(HashMap::from([
                ("test".to_string(), vec!["whois.lower.test".to_string()]),
                ("other".to_string(), vec!["whois.other.test".to_string()]),
            ])),
            ..Default::default()
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                port: Some(4343),
                ..Default::default()
            }),
            servers: Some(HashMap::from([(
                "test".to_string(),
                vec!["whois.higher.test".to_string()],
            )])),
            output: Some(OutputConfig {
                html: Some(true),
                ..Default::default()
            }),
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();

        assert_eq!(defaults.port, Some(4343)); // Higher wins
        assert_eq!(defaults.timeout, Some("10s".to_string())); // Lower preserved

        let servers = merged.servers.unwrap();
        assert_eq!(servers["test"], vec!["whois.higher.test".to_string()]);
        assert_eq!(servers["other"], vec!["whois.other.test".to_string()]);
        assert_eq!(merged.output.unwrap().html, Some(true));
    }

    #[test]
    fn test_env_config() {
        env::set_var("WC_TIMEOUT", "7s");
        env::set_var("WC_PORT", "not-a-port");
        env::set_var("WC_INSECURE", "yes");
        env::set_var("WC_JSON", "maybe");

        let env_config = load_env_config();

        env::remove_var("WC_TIMEOUT");
        env::remove_var("WC_PORT");
        env::remove_var("WC_INSECURE");
        env::remove_var("WC_JSON");

        assert_eq!(env_config.timeout, Some("7s".to_string()));
        assert_eq!(env_config.port, None);
        assert_eq!(env_config.insecure, Some(true));
        assert_eq!(env_config.json, None);

        let defaults = env_config.to_defaults();
        assert_eq!(defaults.accept_invalid_certs, Some(true));
    }
}
