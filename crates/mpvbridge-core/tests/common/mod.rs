#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use mpvbridge_core::loopback::{LoopbackEngine, LoopbackFactory};
use mpvbridge_core::{CallbackResult, CallbackSink, EventId, LogLevel, PropertyValue, RenderTarget};

pub const WAIT: Duration = Duration::from_secs(5);
pub const QUIET: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Event(EventId),
    Property(String, PropertyValue),
    Log { prefix: String, level: LogLevel, text: String },
}

pub struct RecordingSink {
    tx: Sender<Record>,
}

impl RecordingSink {
    pub fn new() -> (Arc<Self>, Receiver<Record>) {
        let (tx, rx) = unbounded();
        (Arc::new(Self { tx }), rx)
    }
}

impl CallbackSink for RecordingSink {
    fn on_event(&self, id: EventId) -> CallbackResult {
        let _ = self.tx.send(Record::Event(id));
        Ok(())
    }

    fn on_property(&self, name: &str, value: PropertyValue) -> CallbackResult {
        let _ = self.tx.send(Record::Property(name.to_owned(), value));
        Ok(())
    }

    fn on_log_message(&self, prefix: &str, level: LogLevel, text: &str) -> CallbackResult {
        let _ = self.tx.send(Record::Log { prefix: prefix.to_owned(), level, text: text.to_owned() });
        Ok(())
    }
}

pub fn loopback() -> (Arc<LoopbackEngine>, Arc<LoopbackFactory>) {
    let engine = Arc::new(LoopbackEngine::new());
    let factory = Arc::new(LoopbackFactory::new(engine.clone()));
    (engine, factory)
}

pub fn next(rx: &Receiver<Record>) -> Record {
    match rx.recv_timeout(WAIT) {
        Ok(record) => record,
        Err(RecvTimeoutError::Timeout) => panic!("no sink record within {WAIT:?}"),
        Err(RecvTimeoutError::Disconnected) => panic!("sink dropped"),
    }
}

/// Collects records up to and including the `marker` event.
pub fn until_marker(rx: &Receiver<Record>, marker: EventId) -> Vec<Record> {
    let mut records = Vec::new();
    loop {
        let record = next(rx);
        if record == Record::Event(marker) {
            return records;
        }
        records.push(record);
    }
}

pub fn assert_quiet(rx: &Receiver<Record>) {
    if let Ok(record) = rx.recv_timeout(QUIET) {
        panic!("unexpected sink record {record:?}");
    }
}

/// Render target that counts its own releases.
pub struct TrackedTarget {
    window: i64,
    drops: Arc<AtomicUsize>,
}

impl TrackedTarget {
    pub fn new(window: i64) -> (Arc<Self>, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        (Arc::new(Self { window, drops: drops.clone() }), drops)
    }
}

impl RenderTarget for TrackedTarget {
    fn native_window(&self) -> i64 {
        self.window
    }
}

impl Drop for TrackedTarget {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}
