//! Agent configuration
//!
//! One [`AgentConfig`] is built at process start from an optional YAML (or
//! JSON) file plus command-line overrides, validated, and then passed by
//! reference to everything that needs it.

use super::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

lazy_static! {
    static ref DESCRIPTOR_NAME: Regex =
        Regex::new(r"(?i)\(\s*(?:SERVICE_NAME|SID)\s*=\s*([^)\s]+)\s*\)").unwrap();
}

/// Top-level configuration for the agent
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Database connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Instance identifier attached to every line; derived from the DSN when absent
    #[serde(default)]
    pub instance: Option<String>,

    /// Whether the built-in metrics run before the dynamic ones. Default: true.
    #[serde(default = "default_true")]
    pub fixed_metrics: bool,

    /// Operator-declared dynamic metrics, in emission order
    #[serde(default)]
    pub metrics: Vec<MetricBlock>,
}

/// Database connection settings
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Database user
    #[serde(default)]
    pub user: String,

    /// Password, when given inline
    #[serde(default)]
    pub password: String,

    /// File holding the password; wins over `password`
    #[serde(default)]
    pub password_file: Option<String>,

    /// Connect descriptor, Easy Connect string or TNS alias
    #[serde(default)]
    pub dsn: String,
}

// Keep the password out of debug logs
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("user", &self.user)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("password_file", &self.password_file)
            .field("dsn", &self.dsn)
            .finish()
    }
}

fn default_true() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            instance: None,
            fixed_metrics: default_true(),
            metrics: Vec::new(),
        }
    }
}

/// Values given on the command line, each overriding the file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub user: Option<String>,
    pub password: Option<String>,
    pub password_file: Option<String>,
    pub dsn: Option<String>,
    pub instance: Option<String>,
}

impl AgentConfig {
    /// Load configuration from a YAML or JSON file
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let data = std::fs::read_to_string(path)
            .map_err(|e| agent_config_error(display.as_str(), format!("reading config file: {e}")))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            serde_json::from_str(&data).map_err(|e| from_serde_json_error(&display, e))
        } else {
            Self::from_yaml(&data).map_err(|e| from_serde_yaml_error(&display, e))
        }
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(data: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty file is an empty mapping
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(data)
    }

    /// Apply command-line overrides on top of file values
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(user) = overrides.user {
            self.connection.user = user;
        }
        if let Some(password) = overrides.password {
            self.connection.password = password;
        }
        if let Some(password_file) = overrides.password_file {
            self.connection.password_file = Some(password_file);
        }
        if let Some(dsn) = overrides.dsn {
            self.connection.dsn = dsn;
        }
        if let Some(instance) = overrides.instance {
            self.instance = Some(instance);
        }
        self
    }

    /// Read the password file, if one is configured
    ///
    /// The file content is trimmed and replaces any inline password.
    pub fn resolve_password(mut self) -> Result<Self> {
        if let Some(path) = self.connection.password_file.take() {
            let password = std::fs::read_to_string(&path).map_err(|e| {
                agent_config_error("connection.password_file", format!("{path}: {e}"))
            })?;
            self.connection.password = password.trim().to_string();
        }
        Ok(self)
    }

    /// Validate the configuration for required fields and consistency
    pub fn validate(&self) -> Result<()> {
        if self.connection.user.trim().is_empty() {
            return Err(agent_config_error("connection.user", "user is required"));
        }

        if self.connection.dsn.trim().is_empty() {
            return Err(agent_config_error("connection.dsn", "dsn is required"));
        }

        if let Some(instance) = &self.instance {
            validate_instance(instance)?;
        }

        let mut contexts = HashSet::new();
        for block in &self.metrics {
            validate_block(block)?;

            if !contexts.insert(block.context.as_str()) {
                return Err(agent_config_error(
                    "metrics",
                    format!("metric context '{}' is declared more than once", block.context),
                ));
            }
        }

        Ok(())
    }

    /// The instance identifier for this run
    pub fn instance_id(&self) -> Result<InstanceId> {
        let name = match &self.instance {
            Some(instance) => instance.clone(),
            None => derive_instance_name(&self.connection.dsn).ok_or_else(|| {
                agent_config_error(
                    "instance",
                    format!("cannot derive an instance name from dsn '{}'", self.connection.dsn),
                )
            })?,
        };

        validate_instance(&name)?;
        Ok(InstanceId::new(name))
    }
}

/// Derive an instance name from a connection descriptor
///
/// Tries, in order: `SERVICE_NAME=`/`SID=` in a full descriptor, the service
/// segment of an Easy Connect string, the host of `host:port`, and finally
/// the whole string as a TNS alias.
///
/// # Examples
/// ```rust
/// use oracle_metrics_agent::derive_instance_name;
///
/// assert_eq!(derive_instance_name("db01:1521/ORCLPDB1").as_deref(), Some("ORCLPDB1"));
/// assert_eq!(derive_instance_name("PRODDB").as_deref(), Some("PRODDB"));
/// ```
pub fn derive_instance_name(dsn: &str) -> Option<String> {
    let dsn = dsn.trim();
    if dsn.is_empty() {
        return None;
    }

    if dsn.starts_with('(') {
        return DESCRIPTOR_NAME
            .captures(dsn)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
    }

    let without_scheme = dsn.split_once("://").map_or(dsn, |(_, rest)| rest);
    let without_slashes = without_scheme.trim_start_matches('/');
    // Drop "?param=value" suffixes of Easy Connect Plus
    let address = without_slashes.split('?').next().unwrap_or(without_slashes);

    let name = match address.split_once('/') {
        // host[:port]/service[:server][/instance]
        Some((_, service)) => service.split(&['/', ':'][..]).next().unwrap_or(service),
        // host:port or alias
        None => address.split(':').next().unwrap_or(address),
    };

    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
