use database::{Backend, DbError};
use record::LogRecord;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// What the mock backend observed, shared with the test after the sink takes
/// ownership of the backend.
#[derive(Debug, Default)]
pub struct Probe {
    /// Messages in the order their inserts began.
    pub started: Mutex<Vec<String>>,
    /// Messages in the order their inserts committed.
    pub committed: Mutex<Vec<String>>,
    pub failed: AtomicUsize,
    pub shutdowns: AtomicUsize,
    /// Inserts settled at the moment `shutdown` was first called.
    pub settled_at_shutdown: AtomicUsize,
}

impl Probe {
    pub fn settled(&self) -> usize {
        self.committed.lock().unwrap().len() + self.failed.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

/// Delays each insert by `pid % 7` milliseconds so completions interleave,
/// and fails every record whose message starts with `fail`.
pub struct MockBackend {
    probe: Arc<Probe>,
    fail_shutdown: bool,
}

impl MockBackend {
    pub fn new() -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let backend = Self {
            probe: Arc::clone(&probe),
            fail_shutdown: false,
        };
        (backend, probe)
    }

    pub fn failing_shutdown() -> (Self, Arc<Probe>) {
        let (mut backend, probe) = Self::new();
        backend.fail_shutdown = true;
        (backend, probe)
    }
}

impl Backend for MockBackend {
    async fn insert(&self, record: LogRecord) -> Result<(), DbError> {
        let msg = record.msg.clone().unwrap_or_default();
        self.probe.started.lock().unwrap().push(msg.clone());

        let delay = u64::from(record.pid.unwrap_or_default().unsigned_abs() % 7);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        if msg.starts_with("fail") {
            self.probe.failed.fetch_add(1, Ordering::SeqCst);
            return Err(DbError::InsertFailed(sqlx::Error::Protocol(
                "simulated constraint violation".to_string(),
            )));
        }

        self.probe.committed.lock().unwrap().push(msg);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), DbError> {
        if self.probe.shutdowns.fetch_add(1, Ordering::SeqCst) == 0 {
            self.probe
                .settled_at_shutdown
                .store(self.probe.settled(), Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;

        if self.fail_shutdown {
            return Err(DbError::ShutdownFailed("simulated close failure".to_string()));
        }
        Ok(())
    }
}

/// Behaves like a connection pool: each insert must take one of `size` slots
/// within `acquire_timeout`, or it fails the way a timed-out acquire does.
pub struct SlotBackend {
    slots: Semaphore,
    size: usize,
    acquire_timeout: Duration,
    hold: Duration,
    committed: Arc<AtomicUsize>,
}

impl SlotBackend {
    pub fn new(size: usize, acquire_timeout: Duration, hold: Duration) -> (Self, Arc<AtomicUsize>) {
        let committed = Arc::new(AtomicUsize::new(0));
        let backend = Self {
            slots: Semaphore::new(size),
            size,
            acquire_timeout,
            hold,
            committed: Arc::clone(&committed),
        };
        (backend, committed)
    }
}

impl Backend for SlotBackend {
    async fn insert(&self, _record: LogRecord) -> Result<(), DbError> {
        let _slot = tokio::time::timeout(self.acquire_timeout, self.slots.acquire())
            .await
            .map_err(|_| DbError::InsertFailed(sqlx::Error::PoolTimedOut))?
            .map_err(|_| DbError::InsertFailed(sqlx::Error::PoolClosed))?;

        tokio::time::sleep(self.hold).await;
        self.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), DbError> {
        self.slots.close();
        Ok(())
    }

    fn max_in_flight(&self) -> usize {
        self.size
    }
}

/// Panics on any record whose message is `panic`.
pub struct PanickingBackend;

impl Backend for PanickingBackend {
    async fn insert(&self, record: LogRecord) -> Result<(), DbError> {
        tokio::task::yield_now().await;
        if record.msg.as_deref() == Some("panic") {
            panic!("backend bug");
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), DbError> {
        Ok(())
    }
}

/// One bunyan-formatted line, terminated the way bunyan writes it.
pub fn line(msg: &str, pid: i32) -> String {
    let record = serde_json::json!({
        "name": "test logger",
        "hostname": "localhost",
        "pid": pid,
        "level": 30,
        "msg": msg,
        "time": "2024-01-01T00:00:00.000Z",
        "v": 0,
    });
    format!("{record}\n")
}
