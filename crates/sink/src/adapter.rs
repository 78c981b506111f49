use crate::error::SinkError;
use crate::options::SinkOptions;
use crate::state::{SinkState, begin_drain};
use crate::stats::{Counters, SinkStats};
use crate::write::PendingWrite;
use configuration::error::ConfigError;
use database::{Backend, DbError, PgBackend, TableName};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use record::LogRecord;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot, watch};

type Outcome = Result<(), DbError>;

enum Job {
    Insert {
        record: LogRecord,
        outcome: oneshot::Sender<Outcome>,
    },
    Drain,
}

/// A write stream that persists every decoded log line through a `Backend`.
///
/// `write` never waits on the database: it decodes the chunk, queues the insert
/// and returns a `PendingWrite`. A single dispatcher task starts the inserts in
/// the order the writes arrived and lets them run concurrently. `end` is the
/// only call that waits. It resolves after every accepted insert has settled
/// and the backend has been shut down.
pub struct LogSink<B: Backend = PgBackend> {
    backend: Arc<B>,
    jobs: mpsc::UnboundedSender<Job>,
    state: Arc<watch::Sender<SinkState>>,
    shutdown: Mutex<Option<oneshot::Receiver<Outcome>>>,
    counters: Arc<Counters>,
}

impl LogSink<PgBackend> {
    /// Validates `options` and builds a sink over the matching Postgres backend.
    ///
    /// Must be called from within a Tokio runtime. No database connection is
    /// opened until the first record is written.
    pub fn new(options: SinkOptions) -> Result<Self, SinkError> {
        let connection = options.connection.ok_or(ConfigError::MissingConnection)?;
        let table = TableName::parse(options.table_name.as_deref().unwrap_or_default())?;

        let backend =
            PgBackend::from_connection(connection, table, options.close_supplied_connection)?;
        tracing::info!(table = %backend.table(), kind = ?backend.kind(), "Log sink opened.");

        Ok(Self::with_backend(backend))
    }
}

impl<B: Backend> LogSink<B> {
    /// Builds a sink over any backend and spawns its dispatcher task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_backend(backend: B) -> Self {
        let backend = Arc::new(backend);
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(SinkState::Open);
        let state = Arc::new(state);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let counters = Arc::new(Counters::default());

        tokio::spawn(dispatch(
            Arc::clone(&backend),
            jobs_rx,
            Arc::clone(&state),
            Arc::clone(&counters),
            shutdown_tx,
        ));

        Self {
            backend,
            jobs: jobs_tx,
            state,
            shutdown: Mutex::new(Some(shutdown_rx)),
            counters,
        }
    }

    /// Accepts one serialized log record.
    ///
    /// Fails immediately with `SinkError::Closed` once `end` has been called,
    /// and with `SinkError::Codec` when the chunk cannot be decoded; in both
    /// cases the backend is not touched and the sink stays usable. Otherwise the
    /// insert is queued and its outcome is delivered through the returned
    /// `PendingWrite`.
    pub fn write(&self, raw: impl AsRef<[u8]>) -> Result<PendingWrite, SinkError> {
        if self.state() != SinkState::Open {
            return Err(SinkError::Closed);
        }

        let record = record::decode(raw).inspect_err(|_| self.counters.rejected())?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        // Counted before the send so the insert can never settle uncounted.
        self.counters.issued();
        let job = Job::Insert {
            record,
            outcome: outcome_tx,
        };
        if self.jobs.send(job).is_err() {
            // The dispatcher already stopped receiving: the sink was ended concurrently.
            self.counters.withdrawn();
            return Err(SinkError::Closed);
        }

        Ok(PendingWrite::new(outcome_rx))
    }

    /// Ends the stream: waits for every accepted write to settle, then shuts
    /// the backend down.
    ///
    /// The first call performs the shutdown and reports its failure, if any.
    /// Any later or concurrent call waits for the sink to close and returns
    /// `Ok(())` without shutting the backend down a second time.
    pub async fn end(&self) -> Result<(), SinkError> {
        if begin_drain(&self.state) {
            tracing::debug!(pending = self.pending_writes(), "Draining log sink.");
            let _ = self.jobs.send(Job::Drain);

            let shutdown = self
                .shutdown
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(shutdown) = shutdown {
                return match shutdown.await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(SinkError::Shutdown(e)),
                    Err(_) => Err(SinkError::Terminated),
                };
            }
        }

        let mut state = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = state.wait_for(|state| *state == SinkState::Closed).await;
        Ok(())
    }

    pub fn state(&self) -> SinkState {
        *self.state.borrow()
    }

    /// Number of inserts issued but not yet settled.
    pub fn pending_writes(&self) -> usize {
        self.counters.pending()
    }

    pub fn stats(&self) -> SinkStats {
        self.counters.snapshot()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Marks the sink `Closed` however the dispatcher exits, including by a panic
/// in a backend, so callers waiting in `end` are always released.
struct CloseOnExit(Arc<watch::Sender<SinkState>>);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| {
            let changed = *state != SinkState::Closed;
            *state = SinkState::Closed;
            changed
        });
    }
}

/// Owns the receiving end of the job queue for the lifetime of the sink.
///
/// At most `backend.max_in_flight()` inserts run at once; further jobs wait in
/// the queue in arrival order. Runs until the queue is drained (after
/// `Job::Drain` or once every sender is gone) and no insert is in flight, then
/// shuts the backend down exactly once.
async fn dispatch<B: Backend>(
    backend: Arc<B>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    state: Arc<watch::Sender<SinkState>>,
    counters: Arc<Counters>,
    shutdown: oneshot::Sender<Outcome>,
) {
    let _close = CloseOnExit(Arc::clone(&state));
    let limit = backend.max_in_flight().max(1);
    let mut in_flight = FuturesUnordered::new();
    let mut accepting = true;

    loop {
        tokio::select! {
            job = jobs.recv(), if accepting && in_flight.len() < limit => match job {
                Some(Job::Insert { record, outcome }) => {
                    in_flight.push(insert(Arc::clone(&backend), record, outcome, Arc::clone(&counters)));
                }
                // Jobs already queued are still received; later sends fail.
                Some(Job::Drain) => jobs.close(),
                None => accepting = false,
            },
            Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
            else => break,
        }
    }

    // Reached without `end()` when the sink was dropped.
    begin_drain(&state);

    let result = backend.shutdown().await;
    match &result {
        Ok(()) => tracing::info!(stats = ?counters.snapshot(), "Log sink drained and closed."),
        Err(e) => tracing::error!(error = %e, "Failed to shut down log sink backend."),
    }

    state.send_replace(SinkState::Closed);
    let _ = shutdown.send(result);
}

async fn insert<B: Backend>(
    backend: Arc<B>,
    record: LogRecord,
    outcome: oneshot::Sender<Outcome>,
    counters: Arc<Counters>,
) {
    let result = backend.insert(record).await;

    counters.settled(result.is_ok());
    if let Err(e) = &result {
        tracing::warn!(error = %e, "Log record was not persisted.");
    }
    let _ = outcome.send(result);
}
