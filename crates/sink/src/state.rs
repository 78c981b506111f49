use tokio::sync::watch;

/// Lifecycle of a `LogSink`. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Accepting writes.
    Open,
    /// Shutdown requested; waiting for in-flight inserts to settle.
    Draining,
    /// The backend has been released. Terminal.
    Closed,
}

/// Moves `Open` to `Draining`. Returns `true` only for the caller that made the move.
pub(crate) fn begin_drain(state: &watch::Sender<SinkState>) -> bool {
    state.send_if_modified(|state| {
        if *state == SinkState::Open {
            *state = SinkState::Draining;
            true
        } else {
            false
        }
    })
}
