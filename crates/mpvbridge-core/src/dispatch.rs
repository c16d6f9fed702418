//! The per-instance event dispatch thread.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use log::{debug, error, trace, warn};

use crate::engine::{EngineEvent, LogMessage, NativeEngineRef, PropertyChange};
use crate::host::{CallbackResult, CallbackSink, HostAttachment, HostRuntime};
use crate::value::PropertyValue;

const LOG_TARGET: &str = "mpvbridge::dispatch";

/// Block on the engine queue until woken.
const WAIT_FOREVER: f64 = -1.0;

pub(crate) struct DispatchContext {
    pub(crate) engine: NativeEngineRef,
    pub(crate) sink: Weak<dyn CallbackSink>,
    pub(crate) host: Arc<dyn HostRuntime>,
    pub(crate) exit: Arc<AtomicBool>,
}

pub(crate) fn spawn(ctx: DispatchContext, name: &str, stack_size: Option<usize>) -> io::Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name(name.to_owned());
    if let Some(size) = stack_size {
        builder = builder.stack_size(size);
    }
    builder.spawn(move || ctx.run())
}

impl DispatchContext {
    #[inline]
    fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }

    fn run(self) {
        let thread_name = thread::current().name().unwrap_or("mpv-dispatch").to_owned();
        let _attachment = match HostAttachment::attach(self.host.as_ref(), &thread_name) {
            Ok(attachment) => attachment,
            Err(e) => {
                error!(target: LOG_TARGET, "{e}; no events will be delivered");
                return;
            }
        };

        debug!(target: LOG_TARGET, "dispatch thread '{thread_name}' started");

        while !self.exit_requested() {
            let event = self.engine.wait_event(WAIT_FOREVER);
            if self.exit_requested() {
                break;
            }
            match event {
                None | Some(EngineEvent::None) => continue,
                Some(event) => self.dispatch(event),
            }
        }

        debug!(target: LOG_TARGET, "dispatch thread '{thread_name}' stopped");
    }

    fn dispatch(&self, event: EngineEvent) {
        match event {
            EngineEvent::None => {}
            EngineEvent::LogMessage(message) => self.forward_log(message),
            EngineEvent::PropertyChange(change) => self.forward_property(change),
            EngineEvent::Other(id) => {
                trace!(target: LOG_TARGET, "event {id}");
                self.deliver("event", |sink| sink.on_event(id));
            }
        }
    }

    fn forward_log(&self, message: LogMessage) {
        let Some(text) = log_text(&message.text) else {
            debug!(
                target: LOG_TARGET,
                "dropping {} byte log line from '{}': not valid UTF-8",
                message.text.len(),
                message.prefix
            );
            return;
        };
        self.deliver("log message", |sink| sink.on_log_message(&message.prefix, message.level, text));
    }

    fn forward_property(&self, change: PropertyChange) {
        match PropertyValue::try_from(&change.value) {
            Ok(value) => self.deliver("property", |sink| sink.on_property(&change.name, value)),
            Err(e) => warn!(target: LOG_TARGET, "dropping change of '{}': {e}", change.name),
        }
    }

    /// Runs one sink callback, absorbing errors and panics.
    ///
    /// Nothing new starts once teardown has raised the exit flag, even when
    /// the event was taken off the queue before it.
    fn deliver<F>(&self, what: &str, f: F)
    where
        F: FnOnce(&dyn CallbackSink) -> CallbackResult,
    {
        if self.exit_requested() {
            trace!(target: LOG_TARGET, "exit requested, {what} not delivered");
            return;
        }
        let Some(sink) = self.sink.upgrade() else {
            trace!(target: LOG_TARGET, "sink released, {what} not delivered");
            return;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| f(sink.as_ref()))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(target: LOG_TARGET, "{what} callback failed: {e}"),
            Err(payload) => error!(target: LOG_TARGET, "{what} callback panicked: {}", panic_message(payload.as_ref())),
        }
    }
}

/// Lead bytes that never occur in well-formed UTF-8.
#[inline]
const fn is_invalid_lead_byte(b: u8) -> bool {
    matches!(b, 0xC0 | 0xC1 | 0xF5..=0xFF)
}

/// Returns the text when it is safe to hand to the host as a string.
pub(crate) fn log_text(bytes: &[u8]) -> Option<&str> {
    if bytes.iter().copied().any(is_invalid_lead_byte) {
        return None;
    }
    std::str::from_utf8(bytes).ok()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::engine::{EventId, LogLevel};
    use crate::host::NullHostRuntime;
    use crate::loopback::LoopbackEngine;

    #[derive(Default)]
    struct CountingSink(AtomicUsize);

    impl CallbackSink for CountingSink {
        fn on_event(&self, _id: EventId) -> CallbackResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_property(&self, _name: &str, _value: PropertyValue) -> CallbackResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_log_message(&self, _prefix: &str, _level: LogLevel, _text: &str) -> CallbackResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn dequeued_events_are_dropped_once_exit_is_requested() {
        let sink = Arc::new(CountingSink::default());
        let weak: Weak<dyn CallbackSink> = Arc::downgrade(&sink) as Weak<dyn CallbackSink>;
        let ctx = DispatchContext {
            engine: Arc::new(LoopbackEngine::new()),
            sink: weak,
            host: Arc::new(NullHostRuntime),
            exit: Arc::new(AtomicBool::new(false)),
        };

        ctx.dispatch(EngineEvent::Other(EventId::FILE_LOADED));
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);

        ctx.exit.store(true, Ordering::Release);
        ctx.dispatch(EngineEvent::Other(EventId::FILE_LOADED));
        ctx.dispatch(EngineEvent::LogMessage(LogMessage {
            prefix: "cplayer".into(),
            level: LogLevel::INFO,
            text: b"playing".to_vec(),
        }));
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn accepts_plain_and_multibyte_text() {
        assert_eq!(log_text(b"[ffmpeg] opening file\n"), Some("[ffmpeg] opening file\n"));
        assert_eq!(log_text("Grüße".as_bytes()), Some("Grüße"));
        assert_eq!(log_text(b""), Some(""));
    }

    #[test]
    fn rejects_invalid_lead_bytes() {
        assert_eq!(log_text(&[b'a', 0xC0, 0x80]), None);
        assert_eq!(log_text(&[0xC1, 0xBF]), None);
        assert_eq!(log_text(&[0xF5, 0x80, 0x80, 0x80]), None);
        assert_eq!(log_text(&[0xFF]), None);
    }

    #[test]
    fn rejects_truncated_sequences() {
        assert_eq!(log_text(&[0xE2, 0x82]), None);
    }

    #[test]
    fn panic_payloads_render() {
        let p: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(p.as_ref()), "boom");
        let p: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(p.as_ref()), "bang");
        let p: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(p.as_ref()), "non-string panic payload");
    }
}
