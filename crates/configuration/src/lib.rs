use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    BackendKind, ConnectionSettings, LoggingSettings, Settings, SinkSettings, validate_table_name,
};

/// Loads the application configuration.
///
/// Reads `path` when given, otherwise an optional `config.toml` in the working
/// directory, then applies environment overrides such as
/// `PGSINK_SINK__TABLE_NAME=logs` or `PGSINK_SINK__CONNECTION__URL=postgres://...`.
/// The result is not validated; call `SinkSettings::validate` before use.
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder();
    let builder = match path {
        Some(path) => builder.add_source(config::File::from(path)),
        None => builder.add_source(config::File::with_name("config").required(false)),
    };

    let config = builder
        .add_source(
            config::Environment::with_prefix("PGSINK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = config.try_deserialize::<Settings>()?;
    tracing::debug!(
        table = settings.sink.table_name.as_deref().unwrap_or("<unset>"),
        "Configuration loaded."
    );
    Ok(settings)
}
