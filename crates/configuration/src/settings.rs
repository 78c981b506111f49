use crate::error::ConfigError;
use serde::Deserialize;

/// The root configuration structure for the log sink application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub sink: SinkSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where records are written: the connection descriptor and the target table.
///
/// Both fields are optional at the deserialization level so that a missing
/// value is reported by `validate` as a specific error rather than a generic
/// parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SinkSettings {
    pub connection: Option<ConnectionSettings>,
    /// The table rows are inserted into, optionally schema-qualified (`audit.logs`).
    pub table_name: Option<String>,
}

impl SinkSettings {
    /// Checks that a connection descriptor and a usable table name are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let connection = self.connection.as_ref().ok_or(ConfigError::MissingConnection)?;
        validate_table_name(self.table_name.as_deref())?;
        connection.validate()
    }
}

/// Which insert strategy a sink uses against its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum BackendKind {
    /// A parameterized INSERT statement run on a pooled connection.
    #[default]
    Pool,
    /// A structured insert assembled with a query builder.
    Builder,
}

/// Describes how to reach the database.
///
/// Every field is optional. Fields left unset fall back to the driver's
/// defaults, which honor the libpq `PGHOST`, `PGPORT`, `PGUSER`, `PGPASSWORD`
/// and `PGDATABASE` environment variables. When `url` is set it is applied
/// first and the individual fields override it.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    /// Upper bound on concurrent inserts.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub backend: BackendKind,
}

impl ConnectionSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "connection.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: None,
            username: None,
            password: None,
            database: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            backend: BackendKind::default(),
        }
    }
}

/// Settings for the diagnostic output of the sink itself.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive such as `info` or `sink=debug,sqlx=warn`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { filter: default_log_filter() }
    }
}

/// Returns the trimmed table name, or an error when it is missing or blank.
pub fn validate_table_name(table_name: Option<&str>) -> Result<&str, ConfigError> {
    match table_name.map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(ConfigError::MissingTableName),
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_log_filter() -> String {
    "info".to_string()
}
