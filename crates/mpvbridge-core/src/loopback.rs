//! In-process engine with a property store and a scripted event queue.
//!
//! Used by the integration tests and by the player's `--loopback` mode. It
//! accepts the same calls as the real engine and converts between formats
//! the way libmpv does for scalar properties.

use std::collections::{HashMap, VecDeque};
use std::ffi::{c_int, CStr, CString};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::engine::{
    code, EngineEvent, EngineFactory, EngineString, EventId, EventValue, LogLevel, LogMessage, NativeEngine,
    NativeEngineRef, NativeReply, NativeValue, PropertyChange,
};
use crate::value::{flag_from_native, flag_to_native, Format, PropertyValue};

/// Longest single wait; keeps `Duration::from_secs_f64` in range.
const MAX_WAIT_SECS: f64 = 86_400.0;

struct Observer {
    reply_id: u64,
    name: String,
    format: Format,
}

#[derive(Default)]
struct LoopbackState {
    initialized: bool,
    terminated: bool,
    init_failure: Option<c_int>,
    log_level: Option<String>,
    properties: HashMap<String, PropertyValue>,
    options: HashMap<String, PropertyValue>,
    rejected_options: HashMap<String, c_int>,
    observers: Vec<Observer>,
    queue: VecDeque<EngineEvent>,
    wake_pending: bool,
    commands: Vec<Vec<String>>,
}

impl LoopbackState {
    fn push(&mut self, event: EngineEvent) {
        if !self.terminated {
            self.queue.push_back(event);
        }
    }

    fn store_property(&mut self, name: &str, value: PropertyValue) {
        for observer in self.observers.iter().filter(|o| o.name == name) {
            let change = PropertyChange {
                name: name.to_owned(),
                reply_id: observer.reply_id,
                value: event_value(&value, observer.format),
            };
            self.queue.push_back(EngineEvent::PropertyChange(change));
        }
        self.properties.insert(name.to_owned(), value);
    }

    fn run_command(&mut self, args: &[String]) -> c_int {
        match args {
            [verb, name, value] if verb == "set" => {
                self.store_property(name, PropertyValue::String(value.clone()));
                code::SUCCESS
            }
            [verb, path, ..] if verb == "loadfile" => {
                self.store_property("path", PropertyValue::String(path.clone()));
                self.push(EngineEvent::Other(EventId::START_FILE));
                self.push(EngineEvent::Other(EventId::FILE_LOADED));
                code::SUCCESS
            }
            [verb] if verb == "stop" => {
                self.push(EngineEvent::Other(EventId::END_FILE));
                code::SUCCESS
            }
            [verb, ..] if verb == "quit" => {
                self.push(EngineEvent::Other(EventId::SHUTDOWN));
                code::SUCCESS
            }
            [verb, ..] if verb == "set" || verb == "loadfile" => code::INVALID_PARAMETER,
            _ => code::SUCCESS,
        }
    }
}

/// Loopback implementation of [`NativeEngine`].
///
/// Commands other than `set`, `loadfile`, `stop` and `quit` are recorded
/// and accepted without effect. Observers get no initial notification.
#[derive(Default)]
pub struct LoopbackEngine {
    state: Mutex<LoopbackState>,
    ready: Condvar,
    live_strings: Arc<AtomicUsize>,
    terminations: AtomicUsize,
    wakeups: AtomicUsize,
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `initialize` calls fail with `code`.
    pub fn fail_initialize(&self, code: c_int) {
        self.state.lock().init_failure = Some(code);
    }

    /// Makes option writes to `name` fail with `code`.
    pub fn reject_option(&self, name: &str, code: c_int) {
        self.state.lock().rejected_options.insert(name.to_owned(), code);
    }

    /// Seeds a property without notifying observers.
    pub fn insert_property(&self, name: &str, value: PropertyValue) {
        self.state.lock().properties.insert(name.to_owned(), value);
    }

    pub fn emit(&self, event: EngineEvent) {
        self.state.lock().push(event);
        self.ready.notify_all();
    }

    pub fn emit_log(&self, prefix: &str, level: LogLevel, text: impl Into<Vec<u8>>) {
        self.emit(EngineEvent::LogMessage(LogMessage { prefix: prefix.to_owned(), level, text: text.into() }));
    }

    pub fn emit_property(&self, name: &str, value: EventValue) {
        self.emit(EngineEvent::PropertyChange(PropertyChange { name: name.to_owned(), reply_id: 0, value }));
    }

    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.state.lock().properties.get(name).cloned()
    }

    pub fn option(&self, name: &str) -> Option<PropertyValue> {
        self.state.lock().options.get(name).cloned()
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.state.lock().commands.clone()
    }

    pub fn observed(&self) -> Vec<(String, Format)> {
        self.state.lock().observers.iter().map(|o| (o.name.clone(), o.format)).collect()
    }

    pub fn log_level(&self) -> Option<String> {
        self.state.lock().log_level.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    pub fn wakeups(&self) -> usize {
        self.wakeups.load(Ordering::SeqCst)
    }

    /// Engine strings handed out and not yet freed.
    pub fn live_strings(&self) -> usize {
        self.live_strings.load(Ordering::SeqCst)
    }

    fn engine_string(&self, text: &str) -> EngineString {
        let raw = CString::new(text.replace('\0', "")).unwrap_or_default().into_raw();
        let live = self.live_strings.clone();
        live.fetch_add(1, Ordering::SeqCst);
        let ptr = NonNull::new(raw).unwrap_or_else(|| unreachable!("CString::into_raw is never null"));
        // SAFETY: `raw` came from `CString::into_raw` and is reclaimed exactly once.
        unsafe {
            EngineString::with_release(ptr, move |p| {
                drop(CString::from_raw(p.as_ptr()));
                live.fetch_sub(1, Ordering::SeqCst);
            })
        }
    }

    fn reply(&self, value: PropertyValue) -> Result<NativeReply, c_int> {
        Ok(match value {
            PropertyValue::Flag(v) => NativeReply::Flag(flag_to_native(v)),
            PropertyValue::Int64(v) => NativeReply::Int64(v),
            PropertyValue::Double(v) => NativeReply::Double(v),
            PropertyValue::String(v) => NativeReply::String(self.engine_string(&v)),
            PropertyValue::None => return Err(code::PROPERTY_UNAVAILABLE),
        })
    }
}

fn from_native(value: NativeValue<'_>) -> Option<PropertyValue> {
    Some(match value {
        NativeValue::None => return None,
        NativeValue::Flag(v) => PropertyValue::Flag(flag_from_native(v)),
        NativeValue::Int64(v) => PropertyValue::Int64(v),
        NativeValue::Double(v) => PropertyValue::Double(v),
        NativeValue::String(v) => PropertyValue::String(v.to_string_lossy().into_owned()),
    })
}

/// Converts a stored value to `format`, failing like libmpv does.
fn convert(value: &PropertyValue, format: Format) -> Result<PropertyValue, c_int> {
    let converted = match (format, value) {
        (Format::String | Format::OsdString, v) => PropertyValue::String(as_text(v)),
        (Format::Flag, PropertyValue::Flag(v)) => PropertyValue::Flag(*v),
        (Format::Flag, PropertyValue::String(s)) => match s.as_str() {
            "yes" => PropertyValue::Flag(true),
            "no" => PropertyValue::Flag(false),
            _ => return Err(code::PROPERTY_FORMAT),
        },
        (Format::Int64, PropertyValue::Int64(v)) => PropertyValue::Int64(*v),
        (Format::Int64, PropertyValue::String(s)) => {
            PropertyValue::Int64(s.trim().parse().map_err(|_| code::PROPERTY_FORMAT)?)
        }
        (Format::Double, PropertyValue::Double(v)) => PropertyValue::Double(*v),
        (Format::Double, PropertyValue::Int64(v)) => PropertyValue::Double(*v as f64),
        (Format::Double, PropertyValue::String(s)) => {
            PropertyValue::Double(s.trim().parse().map_err(|_| code::PROPERTY_FORMAT)?)
        }
        (Format::None, _) => PropertyValue::None,
        _ => return Err(code::PROPERTY_FORMAT),
    };
    Ok(converted)
}

fn as_text(value: &PropertyValue) -> String {
    match value {
        PropertyValue::None => String::new(),
        PropertyValue::Flag(v) => (if *v { "yes" } else { "no" }).to_owned(),
        PropertyValue::Int64(v) => v.to_string(),
        PropertyValue::Double(v) => format!("{v:.6}"),
        PropertyValue::String(v) => v.clone(),
    }
}

fn event_value(value: &PropertyValue, format: Format) -> EventValue {
    if !format.is_supported() {
        return EventValue::Unsupported(format.as_raw());
    }
    match convert(value, format) {
        Ok(PropertyValue::Flag(v)) => EventValue::Flag(flag_to_native(v)),
        Ok(PropertyValue::Int64(v)) => EventValue::Int64(v),
        Ok(PropertyValue::Double(v)) => EventValue::Double(v),
        Ok(PropertyValue::String(v)) => EventValue::String(CString::new(v.replace('\0', "")).unwrap_or_default()),
        Ok(PropertyValue::None) | Err(_) => EventValue::None,
    }
}

impl NativeEngine for LoopbackEngine {
    fn initialize(&self) -> c_int {
        let mut state = self.state.lock();
        if state.terminated {
            return code::UNINITIALIZED;
        }
        if let Some(code) = state.init_failure {
            return code;
        }
        if state.initialized {
            return code::INVALID_PARAMETER;
        }
        state.initialized = true;
        code::SUCCESS
    }

    fn terminate_destroy(&self) {
        let mut state = self.state.lock();
        state.terminated = true;
        state.queue.clear();
        self.terminations.fetch_add(1, Ordering::SeqCst);
        drop(state);
        self.ready.notify_all();
    }

    fn request_log_messages(&self, min_level: &CStr) -> c_int {
        let level = min_level.to_string_lossy();
        if LogLevel::from_name(&level).is_none() {
            return code::INVALID_PARAMETER;
        }
        self.state.lock().log_level = Some(level.into_owned());
        code::SUCCESS
    }

    fn command(&self, args: &[&CStr]) -> c_int {
        let mut state = self.state.lock();
        if state.terminated {
            return code::UNINITIALIZED;
        }
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        let code = state.run_command(&args);
        state.commands.push(args);
        drop(state);
        self.ready.notify_all();
        code
    }

    fn set_option(&self, name: &CStr, value: NativeValue<'_>) -> c_int {
        let name = name.to_string_lossy();
        let mut state = self.state.lock();
        if state.terminated {
            return code::UNINITIALIZED;
        }
        if let Some(code) = state.rejected_options.get(name.as_ref()) {
            return *code;
        }
        let Some(value) = from_native(value) else {
            return code::OPTION_FORMAT;
        };
        state.options.insert(name.into_owned(), value);
        code::SUCCESS
    }

    fn set_option_string(&self, name: &CStr, value: &CStr) -> c_int {
        self.set_option(name, NativeValue::String(value))
    }

    fn get_property(&self, name: &CStr, format: Format) -> Result<NativeReply, c_int> {
        let state = self.state.lock();
        if state.terminated {
            return Err(code::UNINITIALIZED);
        }
        if !format.is_supported() || format == Format::None {
            return Err(code::PROPERTY_FORMAT);
        }
        let stored = state.properties.get(name.to_string_lossy().as_ref()).ok_or(code::PROPERTY_NOT_FOUND)?;
        let value = convert(stored, format)?;
        drop(state);
        self.reply(value)
    }

    fn set_property(&self, name: &CStr, value: NativeValue<'_>) -> c_int {
        let Some(value) = from_native(value) else {
            return code::PROPERTY_FORMAT;
        };
        let mut state = self.state.lock();
        if state.terminated {
            return code::UNINITIALIZED;
        }
        state.store_property(&name.to_string_lossy(), value);
        drop(state);
        self.ready.notify_all();
        code::SUCCESS
    }

    fn observe_property(&self, reply_id: u64, name: &CStr, format: Format) -> c_int {
        let mut state = self.state.lock();
        if state.terminated {
            return code::UNINITIALIZED;
        }
        state.observers.push(Observer { reply_id, name: name.to_string_lossy().into_owned(), format });
        code::SUCCESS
    }

    fn wait_event(&self, timeout: f64) -> Option<EngineEvent> {
        let deadline = (timeout > 0.0).then(|| Instant::now() + Duration::from_secs_f64(timeout.min(MAX_WAIT_SECS)));
        let mut state = self.state.lock();
        loop {
            if state.terminated {
                return None;
            }
            if let Some(event) = state.queue.pop_front() {
                return Some(event);
            }
            if state.wake_pending {
                state.wake_pending = false;
                return Some(EngineEvent::None);
            }
            match deadline {
                _ if timeout == 0.0 => return Some(EngineEvent::None),
                None => self.ready.wait(&mut state),
                Some(deadline) => {
                    if self.ready.wait_until(&mut state, deadline).timed_out() {
                        return Some(EngineEvent::None);
                    }
                }
            }
        }
    }

    fn wakeup(&self) {
        self.state.lock().wake_pending = true;
        self.wakeups.fetch_add(1, Ordering::SeqCst);
        self.ready.notify_all();
    }
}

/// Hands out one shared [`LoopbackEngine`], or nothing.
#[derive(Clone, Default)]
pub struct LoopbackFactory {
    engine: Option<Arc<LoopbackEngine>>,
}

impl LoopbackFactory {
    pub fn new(engine: Arc<LoopbackEngine>) -> Self {
        Self { engine: Some(engine) }
    }

    /// A factory whose every `create` fails.
    pub fn unavailable() -> Self {
        Self { engine: None }
    }
}

impl EngineFactory for LoopbackFactory {
    fn create(&self) -> Option<NativeEngineRef> {
        self.engine.clone().map(|engine| engine as NativeEngineRef)
    }
}
