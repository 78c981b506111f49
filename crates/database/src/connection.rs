use crate::error::DbError;
use configuration::ConnectionSettings;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::time::Duration;

/// Resolves a connection descriptor into driver options.
///
/// Starts from `url` when present, otherwise from the driver defaults (which
/// read the libpq `PG*` environment variables), then applies every field that
/// is explicitly set.
pub fn connect_options(settings: &ConnectionSettings) -> Result<PgConnectOptions, DbError> {
    let mut options = match &settings.url {
        Some(url) => url
            .parse::<PgConnectOptions>()
            .map_err(|e| DbError::ConnectionConfigError(e.to_string()))?,
        None => PgConnectOptions::new(),
    };

    if let Some(host) = &settings.host {
        options = options.host(host);
    }
    if let Some(port) = settings.port {
        options = options.port(port);
    }
    if let Some(username) = &settings.username {
        options = options.username(username);
    }
    if let Some(password) = &settings.password {
        options = options.password(password);
    }
    if let Some(database) = &settings.database {
        options = options.database(database);
    }

    Ok(options)
}

/// Creates a connection pool for the log sink without opening any connection.
///
/// Connections are established on the first insert, so a sink that is ended
/// before it ever writes never touches the network. Must be called from
/// within a Tokio runtime.
pub fn connect_lazy(settings: &ConnectionSettings) -> Result<PgPool, DbError> {
    settings
        .validate()
        .map_err(|e| DbError::ConnectionConfigError(e.to_string()))?;
    let options = connect_options(settings)?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .connect_lazy_with(options);

    Ok(pool)
}
