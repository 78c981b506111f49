use crate::error::SinkError;
use database::DbError;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::sync::oneshot;

/// The completion of one accepted write.
///
/// Resolves once the backend has committed or rejected the record. Dropping it
/// does not cancel the insert; the outcome is simply discarded.
#[derive(Debug)]
#[must_use = "dropping a PendingWrite discards the insert outcome; the insert itself still runs"]
pub struct PendingWrite {
    outcome: oneshot::Receiver<Result<(), DbError>>,
}

impl PendingWrite {
    pub(crate) fn new(outcome: oneshot::Receiver<Result<(), DbError>>) -> Self {
        Self { outcome }
    }
}

impl Future for PendingWrite {
    type Output = Result<(), SinkError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = match ready!(Pin::new(&mut self.outcome).poll(cx)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SinkError::Backend(e)),
            // The dispatcher went away without reporting, e.g. the runtime shut down.
            Err(_) => Err(SinkError::Terminated),
        };
        Poll::Ready(outcome)
    }
}
