use configuration::SinkSettings;
use database::Connection;

/// Construction input for `LogSink::new`.
///
/// Both `connection` and `table_name` are required; they are optional here so
/// that their absence is reported as a configuration error at construction.
#[derive(Debug, Clone)]
pub struct SinkOptions {
    pub connection: Option<Connection>,
    pub table_name: Option<String>,
    /// Whether `end()` also closes a pool the caller handed in through
    /// `Connection::Pool` or `Connection::Builder`. Pools the sink creates from
    /// a descriptor are always closed.
    pub close_supplied_connection: bool,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            connection: None,
            table_name: None,
            close_supplied_connection: true,
        }
    }
}

impl SinkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(mut self, connection: impl Into<Connection>) -> Self {
        self.connection = Some(connection.into());
        self
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn close_supplied_connection(mut self, close: bool) -> Self {
        self.close_supplied_connection = close;
        self
    }

    /// Options from loaded settings. Nothing is validated until `LogSink::new`.
    pub fn from_settings(settings: &SinkSettings) -> Self {
        Self {
            connection: settings.connection.clone().map(Connection::Settings),
            table_name: settings.table_name.clone(),
            ..Self::default()
        }
    }
}
