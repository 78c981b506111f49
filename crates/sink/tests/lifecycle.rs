mod common;

use common::{MockBackend, PanickingBackend, SlotBackend, line};
use configuration::error::ConfigError;
use futures::FutureExt;
use sink::{Connection, ConnectionSettings, LogSink, SinkError, SinkOptions, SinkState};
use std::sync::atomic::Ordering;
use std::time::Duration;

#[test]
fn construction_requires_a_connection() {
    let result = LogSink::new(SinkOptions::new().table_name("test"));
    assert!(matches!(
        result,
        Err(SinkError::Configuration(ConfigError::MissingConnection))
    ));
}

#[test]
fn construction_requires_a_table_name() {
    let result = LogSink::new(SinkOptions::new().connection(ConnectionSettings::default()));
    assert!(matches!(
        result,
        Err(SinkError::Configuration(ConfigError::MissingTableName))
    ));

    let result = LogSink::new(
        SinkOptions::new()
            .connection(ConnectionSettings::default())
            .table_name(""),
    );
    assert!(matches!(
        result,
        Err(SinkError::Configuration(ConfigError::MissingTableName))
    ));
}

#[tokio::test]
async fn ending_an_unused_sink_releases_its_pool() {
    let sink = LogSink::new(
        SinkOptions::new()
            .connection(ConnectionSettings::default())
            .table_name("logs"),
    )
    .unwrap();

    sink.end().await.unwrap();

    assert_eq!(sink.state(), SinkState::Closed);
    assert!(sink.backend().pool().is_closed());
}

#[tokio::test]
async fn supplied_pool_survives_when_the_caller_keeps_ownership() {
    let pool = database::connect_lazy(&ConnectionSettings::default()).unwrap();
    let sink = LogSink::new(
        SinkOptions::new()
            .connection(Connection::Builder(pool.clone()))
            .table_name("logs")
            .close_supplied_connection(false),
    )
    .unwrap();

    sink.end().await.unwrap();

    assert!(!pool.is_closed());
    pool.close().await;
}

#[tokio::test]
async fn every_write_settles_before_shutdown() {
    let (backend, probe) = MockBackend::new();
    let sink = LogSink::with_backend(backend);

    let writes: Vec<_> = (0..200)
        .map(|i| sink.write(line(&format!("record {i}"), i)).unwrap())
        .collect();
    sink.end().await.unwrap();

    assert_eq!(probe.settled_at_shutdown.load(Ordering::SeqCst), 200);
    for write in writes {
        assert!(matches!(write.now_or_never(), Some(Ok(()))));
    }
    assert_eq!(sink.pending_writes(), 0);
    assert_eq!(sink.state(), SinkState::Closed);
}

#[tokio::test]
async fn inserts_start_in_arrival_order() {
    let (backend, probe) = MockBackend::new();
    let sink = LogSink::with_backend(backend);

    let messages: Vec<String> = (0..100).map(|i| format!("ordered {i}")).collect();
    for (i, message) in messages.iter().enumerate() {
        // Later records get shorter delays so they tend to finish first.
        let _ = sink.write(line(message, 100 - i as i32)).unwrap();
    }
    sink.end().await.unwrap();

    assert_eq!(*probe.started.lock().unwrap(), messages);

    let mut committed = probe.committed.lock().unwrap().clone();
    committed.sort();
    let mut expected = messages.clone();
    expected.sort();
    assert_eq!(committed, expected);
}

#[tokio::test]
async fn a_failed_insert_only_affects_its_own_write() {
    let (backend, _probe) = MockBackend::new();
    let sink = LogSink::with_backend(backend);

    let kept = sink.write(line("kept", 1)).unwrap();
    let failed = sink.write(line("fail: duplicate key", 2)).unwrap();
    let after = sink.write(line("after the failure", 3)).unwrap();

    assert!(kept.await.is_ok());
    assert!(matches!(failed.await, Err(SinkError::Backend(_))));
    assert!(after.await.is_ok());
    assert_eq!(sink.state(), SinkState::Open);

    let stats = sink.stats();
    assert_eq!(stats.accepted, 3);
    assert_eq!(stats.committed, 2);
    assert_eq!(stats.failed, 1);

    sink.end().await.unwrap();
}

#[tokio::test]
async fn malformed_chunk_is_rejected_synchronously() {
    let (backend, probe) = MockBackend::new();
    let sink = LogSink::with_backend(backend);

    let err = sink.write("{not json").unwrap_err();
    assert!(matches!(err, SinkError::Codec(_)));
    assert_eq!(sink.state(), SinkState::Open);
    assert_eq!(sink.pending_writes(), 0);

    sink.write(line("valid after malformed", 1)).unwrap().await.unwrap();
    assert_eq!(*probe.started.lock().unwrap(), vec!["valid after malformed".to_string()]);

    let stats = sink.stats();
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.accepted, 1);

    sink.end().await.unwrap();
}

#[tokio::test]
async fn ending_twice_shuts_the_backend_down_once() {
    let (backend, probe) = MockBackend::new();
    let sink = LogSink::with_backend(backend);

    let _ = sink.write(line("in flight", 6)).unwrap();
    let (first, second) = tokio::join!(sink.end(), sink.end());
    assert!(first.is_ok());
    assert!(second.is_ok());

    sink.end().await.unwrap();
    assert_eq!(probe.shutdowns(), 1);
    assert_eq!(probe.committed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn writes_after_end_are_refused() {
    let (backend, probe) = MockBackend::new();
    let sink = LogSink::with_backend(backend);

    sink.end().await.unwrap();

    assert!(matches!(sink.write(line("too late", 1)), Err(SinkError::Closed)));
    assert!(probe.started.lock().unwrap().is_empty());
}

#[tokio::test]
async fn writes_while_draining_are_refused() {
    let (backend, probe) = MockBackend::new();
    let sink = LogSink::with_backend(backend);

    let queued = sink.write(line("queued before end", 6)).unwrap();
    let end = sink.end();
    tokio::pin!(end);
    assert!(end.as_mut().now_or_never().is_none());
    assert_eq!(sink.state(), SinkState::Draining);

    assert!(matches!(sink.write(line("while draining", 1)), Err(SinkError::Closed)));

    end.await.unwrap();
    assert!(queued.await.is_ok());
    assert_eq!(
        *probe.started.lock().unwrap(),
        vec!["queued before end".to_string()]
    );
    assert_eq!(sink.stats().accepted, 1);
}

#[tokio::test]
async fn shutdown_failure_is_reported_once_and_still_closes() {
    let (backend, probe) = MockBackend::failing_shutdown();
    let sink = LogSink::with_backend(backend);

    assert!(matches!(sink.end().await, Err(SinkError::Shutdown(_))));
    assert_eq!(sink.state(), SinkState::Closed);

    assert!(sink.end().await.is_ok());
    assert_eq!(probe.shutdowns(), 1);
}

#[tokio::test]
async fn no_record_is_dropped_under_volume() {
    let (backend, probe) = MockBackend::new();
    let sink = LogSink::with_backend(backend);

    for i in 0..5000 {
        let _ = sink.write(line(&format!("before draining pool: {i}"), i)).unwrap();
    }
    sink.end().await.unwrap();

    assert_eq!(probe.committed.lock().unwrap().len(), 5000);
    assert_eq!(sink.stats().committed, 5000);
    assert_eq!(sink.pending_writes(), 0);
}

#[tokio::test]
async fn slow_inserts_queue_for_a_slot_instead_of_timing_out() {
    // 400 records over 4 slots at 10 ms each take about 1 s, well past the
    // 100 ms any single insert may wait for a slot.
    let (backend, committed) =
        SlotBackend::new(4, Duration::from_millis(100), Duration::from_millis(10));
    let sink = LogSink::with_backend(backend);

    for i in 0..400 {
        let _ = sink.write(line(&format!("slow record {i}"), i)).unwrap();
    }
    sink.end().await.unwrap();

    let stats = sink.stats();
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.committed, 400);
    assert_eq!(committed.load(Ordering::SeqCst), 400);
}

#[tokio::test]
async fn a_panicking_backend_still_releases_every_end_call() {
    let sink = LogSink::with_backend(PanickingBackend);

    let write = sink.write(line("panic", 1)).unwrap();
    let (first, second) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(sink.end(), sink.end())
    })
    .await
    .unwrap();

    assert!(matches!(first, Err(SinkError::Terminated)));
    assert!(second.is_ok());
    assert!(matches!(write.await, Err(SinkError::Terminated)));
    assert_eq!(sink.state(), SinkState::Closed);
    assert!(sink.end().await.is_ok());
}

#[tokio::test]
async fn dropping_the_sink_still_drains_and_shuts_down() {
    let (backend, probe) = MockBackend::new();
    let sink = LogSink::with_backend(backend);

    let write = sink.write(line("written before drop", 4)).unwrap();
    drop(sink);

    assert!(write.await.is_ok());
    tokio::time::timeout(Duration::from_secs(5), async {
        while probe.shutdowns() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(
        *probe.committed.lock().unwrap(),
        vec!["written before drop".to_string()]
    );
}
