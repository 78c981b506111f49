use clap::{Parser, Subcommand};
use configuration::{BackendKind, ConnectionSettings, Settings};
use database::TableName;
use sink::{LogSink, SinkOptions};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the pg-log-sink application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut settings = configuration::load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);

    // Diagnostics go to stderr so stdout stays free for piping.
    let _guard = init_tracing(&settings.logging.filter)?;

    match cli.command {
        Commands::Ingest => handle_ingest(settings).await,
        Commands::Check(args) => handle_check(args, settings).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Persists newline-delimited JSON log records into a PostgreSQL table.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML configuration file (defaults to ./config.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target table, optionally schema-qualified (e.g. "audit.logs").
    #[arg(long, global = true)]
    table: Option<String>,

    /// PostgreSQL connection URL. Falls back to DATABASE_URL.
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// How rows are inserted.
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendKind>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read log lines from stdin until EOF (or Ctrl-C) and persist each one.
    Ingest,
    /// Validate the configuration and print the resolved target.
    Check(CheckArgs),
}

#[derive(Parser)]
struct CheckArgs {
    /// Also connect and verify that the target table is reachable.
    #[arg(long)]
    connect: bool,
}

impl Cli {
    /// Applies command-line flags on top of the loaded settings.
    ///
    /// `--database-url` always wins; `DATABASE_URL` only fills in a missing URL.
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(table) = &self.table {
            settings.sink.table_name = Some(table.clone());
        }

        if let Some(url) = &self.database_url {
            connection_mut(settings).url = Some(url.clone());
        } else if let Ok(url) = std::env::var("DATABASE_URL") {
            let has_url = settings
                .sink
                .connection
                .as_ref()
                .is_some_and(|connection| connection.url.is_some());
            if !has_url {
                connection_mut(settings).url = Some(url);
            }
        }

        if let Some(backend) = self.backend {
            connection_mut(settings).backend = backend;
        }
    }
}

fn connection_mut(settings: &mut Settings) -> &mut ConnectionSettings {
    settings
        .sink
        .connection
        .get_or_insert_with(ConnectionSettings::default)
}

fn init_tracing(default_filter: &str) -> anyhow::Result<WorkerGuard> {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}

// ==============================================================================
// Ingest Command Logic
// ==============================================================================

/// Streams stdin into the sink, then drains it.
///
/// Lines that fail to decode are skipped with a warning. Insert failures are
/// logged by the sink as they happen and counted in the final summary.
async fn handle_ingest(settings: Settings) -> anyhow::Result<()> {
    settings.sink.validate()?;
    let sink = LogSink::new(SinkOptions::from_settings(&settings.sink))?;

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut line = Vec::new();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        line.clear();
        let read = tokio::select! {
            read = reader.read_until(b'\n', &mut line) => read?,
            _ = &mut interrupt => {
                tracing::info!("Interrupted. Draining pending records.");
                break;
            }
        };
        if read == 0 {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        // The per-write outcome is not awaited; failures show up in the stats.
        if let Err(e) = sink.write(&line) {
            tracing::warn!(error = %e, "Skipping log line.");
        }
    }

    sink.end().await?;

    let stats = sink.stats();
    tracing::info!(
        accepted = stats.accepted,
        committed = stats.committed,
        failed = stats.failed,
        rejected = stats.rejected,
        "Ingest complete."
    );

    if stats.failed > 0 {
        anyhow::bail!(
            "{} of {} log records could not be persisted",
            stats.failed,
            stats.accepted
        );
    }
    Ok(())
}

// ==============================================================================
// Check Command Logic
// ==============================================================================

async fn handle_check(args: CheckArgs, settings: Settings) -> anyhow::Result<()> {
    settings.sink.validate()?;
    let connection = settings
        .sink
        .connection
        .as_ref()
        .ok_or(configuration::error::ConfigError::MissingConnection)?;
    let table = TableName::parse(settings.sink.table_name.as_deref().unwrap_or_default())?;
    let options = database::connect_options(connection)?;

    println!("table:    {}", table.quoted());
    println!("host:     {}:{}", options.get_host(), options.get_port());
    println!("database: {}", options.get_database().unwrap_or("<default>"));
    println!("user:     {}", options.get_username());
    println!("backend:  {:?}", connection.backend);

    if args.connect {
        let pool = database::connect_lazy(connection)?;
        let probe = format!("SELECT 1 FROM {} LIMIT 0", table.quoted());
        let result = sqlx::query(&probe).execute(&pool).await;
        pool.close().await;
        result?;
        println!("status:   reachable");
    }

    Ok(())
}
