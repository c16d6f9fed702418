use std::ffi::{c_char, c_int, c_void, CStr};
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use log::{debug, error};
use mpvbridge_core::engine::code;
use mpvbridge_core::{
    EngineEvent, EngineFactory, EngineString, EventId, EventValue, Format, LogLevel, LogMessage, NativeEngine,
    NativeEngineRef, NativeReply, NativeValue, PropertyChange,
};

use crate::api::MpvApi;
use crate::error::LoadError;
use crate::ffi::{MpvEvent, MpvEventLogMessage, MpvEventProperty, MpvHandle};

const LOG_TARGET: &str = "mpvbridge::libmpv";

/// Creates libmpv handles from a loaded client API.
#[derive(Clone)]
pub struct LibMpvFactory {
    api: Arc<MpvApi>,
}

impl LibMpvFactory {
    /// Loads libmpv from `path`, or from the platform's default names.
    pub fn load(path: Option<&Path>) -> Result<Self, LoadError> {
        let api = match path {
            Some(path) => MpvApi::load(path)?,
            None => MpvApi::load_default()?,
        };
        Ok(Self { api })
    }

    pub fn with_api(api: Arc<MpvApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Arc<MpvApi> {
        &self.api
    }
}

impl EngineFactory for LibMpvFactory {
    fn create(&self) -> Option<NativeEngineRef> {
        // SAFETY: no preconditions.
        let handle = unsafe { (self.api.create)() };
        if handle.is_null() {
            error!(target: LOG_TARGET, "mpv_create returned null");
            return None;
        }
        debug!(target: LOG_TARGET, "created mpv handle {handle:p}");
        Some(Arc::new(MpvEngine { api: self.api.clone(), handle: AtomicPtr::new(handle) }))
    }
}

/// One libmpv client handle.
///
/// The handle pointer is swapped to null by `terminate_destroy`; later calls
/// report [`code::UNINITIALIZED`] instead of touching freed memory.
pub struct MpvEngine {
    api: Arc<MpvApi>,
    handle: AtomicPtr<MpvHandle>,
}

impl MpvEngine {
    #[inline]
    fn handle(&self) -> Option<*mut MpvHandle> {
        let handle = self.handle.load(Ordering::Acquire);
        (!handle.is_null()).then_some(handle)
    }

    fn get_scalar<T: Default>(&self, handle: *mut MpvHandle, name: &CStr, format: Format) -> Result<T, c_int> {
        let mut out = T::default();
        // SAFETY: `out` has the C layout libmpv writes for `format`.
        let code = unsafe {
            (self.api.get_property)(handle, name.as_ptr(), format.as_raw(), ptr::addr_of_mut!(out).cast())
        };
        if code < 0 {
            Err(code)
        } else {
            Ok(out)
        }
    }
}

/// Lends `value` to libmpv in the in-memory layout its format expects.
fn with_native<R>(value: NativeValue<'_>, f: impl FnOnce(c_int, *mut c_void) -> R) -> R {
    match value {
        NativeValue::None => f(Format::None.as_raw(), ptr::null_mut()),
        NativeValue::Flag(mut v) => f(Format::Flag.as_raw(), ptr::addr_of_mut!(v).cast()),
        NativeValue::Int64(mut v) => f(Format::Int64.as_raw(), ptr::addr_of_mut!(v).cast()),
        NativeValue::Double(mut v) => f(Format::Double.as_raw(), ptr::addr_of_mut!(v).cast()),
        NativeValue::String(s) => {
            let mut p: *const c_char = s.as_ptr();
            f(Format::String.as_raw(), ptr::addr_of_mut!(p).cast())
        }
    }
}

impl NativeEngine for MpvEngine {
    fn initialize(&self) -> c_int {
        let Some(handle) = self.handle() else { return code::UNINITIALIZED };
        // SAFETY: live handle.
        unsafe { (self.api.initialize)(handle) }
    }

    fn terminate_destroy(&self) {
        let handle = self.handle.swap(ptr::null_mut(), Ordering::AcqRel);
        if !handle.is_null() {
            debug!(target: LOG_TARGET, "destroying mpv handle {handle:p}");
            // SAFETY: the swap above makes this the only call for `handle`.
            unsafe { (self.api.terminate_destroy)(handle) }
        }
    }

    fn request_log_messages(&self, min_level: &CStr) -> c_int {
        let Some(handle) = self.handle() else { return code::UNINITIALIZED };
        // SAFETY: live handle, NUL-terminated level.
        unsafe { (self.api.request_log_messages)(handle, min_level.as_ptr()) }
    }

    fn command(&self, args: &[&CStr]) -> c_int {
        let Some(handle) = self.handle() else { return code::UNINITIALIZED };
        let mut argv: Vec<*const c_char> =
            args.iter().map(|a| a.as_ptr()).chain(std::iter::once(ptr::null())).collect();
        // SAFETY: null-terminated argv of strings that outlive the call.
        unsafe { (self.api.command)(handle, argv.as_mut_ptr()) }
    }

    fn set_option(&self, name: &CStr, value: NativeValue<'_>) -> c_int {
        let Some(handle) = self.handle() else { return code::UNINITIALIZED };
        with_native(value, |format, data| {
            // SAFETY: `data` points at a value laid out for `format`.
            unsafe { (self.api.set_option)(handle, name.as_ptr(), format, data) }
        })
    }

    fn set_option_string(&self, name: &CStr, value: &CStr) -> c_int {
        let Some(handle) = self.handle() else { return code::UNINITIALIZED };
        // SAFETY: live handle, NUL-terminated strings.
        unsafe { (self.api.set_option_string)(handle, name.as_ptr(), value.as_ptr()) }
    }

    fn get_property(&self, name: &CStr, format: Format) -> Result<NativeReply, c_int> {
        let handle = self.handle().ok_or(code::UNINITIALIZED)?;
        match format {
            Format::Flag => self.get_scalar::<c_int>(handle, name, format).map(NativeReply::Flag),
            Format::Int64 => self.get_scalar::<i64>(handle, name, format).map(NativeReply::Int64),
            Format::Double => self.get_scalar::<f64>(handle, name, format).map(NativeReply::Double),
            Format::String | Format::OsdString => {
                let mut out: *mut c_char = ptr::null_mut();
                // SAFETY: libmpv stores an mpv_free-owned string pointer into `out`.
                let code = unsafe {
                    (self.api.get_property)(handle, name.as_ptr(), format.as_raw(), ptr::addr_of_mut!(out).cast())
                };
                if code < 0 {
                    return Err(code);
                }
                // SAFETY: on success `out` is a fresh string released only through mpv_free.
                unsafe { EngineString::from_raw(out, self.api.free) }
                    .map(NativeReply::String)
                    .ok_or(code::PROPERTY_UNAVAILABLE)
            }
            _ => Err(code::PROPERTY_FORMAT),
        }
    }

    fn set_property(&self, name: &CStr, value: NativeValue<'_>) -> c_int {
        let Some(handle) = self.handle() else { return code::UNINITIALIZED };
        with_native(value, |format, data| {
            // SAFETY: `data` points at a value laid out for `format`.
            unsafe { (self.api.set_property)(handle, name.as_ptr(), format, data) }
        })
    }

    fn observe_property(&self, reply_id: u64, name: &CStr, format: Format) -> c_int {
        let Some(handle) = self.handle() else { return code::UNINITIALIZED };
        // SAFETY: live handle, NUL-terminated name.
        unsafe { (self.api.observe_property)(handle, reply_id, name.as_ptr(), format.as_raw()) }
    }

    fn wait_event(&self, timeout: f64) -> Option<EngineEvent> {
        let handle = self.handle()?;
        // SAFETY: only the dispatch thread waits on a handle.
        let event = unsafe { (self.api.wait_event)(handle, timeout) };
        // SAFETY: the event stays valid until the next wait on this handle and
        // is copied out before returning.
        unsafe { event.as_ref() }.map(|event| unsafe { decode_event(event) })
    }

    fn wakeup(&self) {
        if let Some(handle) = self.handle() {
            // SAFETY: live handle; mpv_wakeup is thread-safe.
            unsafe { (self.api.wakeup)(handle) }
        }
    }
}

impl Drop for MpvEngine {
    fn drop(&mut self) {
        self.terminate_destroy();
    }
}

/// Copies an event out of libmpv-owned memory.
///
/// # Safety
/// `event` and everything it points to must be valid for the call.
unsafe fn decode_event(event: &MpvEvent) -> EngineEvent {
    let id = EventId(event.event_id);
    match id {
        EventId::NONE => EngineEvent::None,
        EventId::LOG_MESSAGE => {
            // SAFETY: log-message events carry an mpv_event_log_message.
            match unsafe { event.data.cast::<MpvEventLogMessage>().as_ref() } {
                Some(message) => EngineEvent::LogMessage(LogMessage {
                    prefix: unsafe { lossy(message.prefix) },
                    level: LogLevel(message.log_level),
                    text: unsafe { bytes(message.text) },
                }),
                None => EngineEvent::Other(id),
            }
        }
        EventId::PROPERTY_CHANGE => {
            // SAFETY: property-change events carry an mpv_event_property.
            match unsafe { event.data.cast::<MpvEventProperty>().as_ref() } {
                Some(property) => EngineEvent::PropertyChange(PropertyChange {
                    name: unsafe { lossy(property.name) },
                    reply_id: event.reply_userdata,
                    value: unsafe { decode_value(property.format, property.data) },
                }),
                None => EngineEvent::Other(id),
            }
        }
        _ => EngineEvent::Other(id),
    }
}

/// # Safety
/// `data` must be null or point at a value of the layout `format` names.
unsafe fn decode_value(format: c_int, data: *mut c_void) -> EventValue {
    let Some(known) = Format::from_raw(format) else {
        return EventValue::Unsupported(format);
    };
    if !known.is_supported() {
        return EventValue::Unsupported(format);
    }
    if data.is_null() {
        return EventValue::None;
    }
    unsafe {
        match known {
            Format::Flag => EventValue::Flag(*data.cast::<c_int>()),
            Format::Int64 => EventValue::Int64(*data.cast::<i64>()),
            Format::Double => EventValue::Double(*data.cast::<f64>()),
            Format::String | Format::OsdString => {
                let s = *data.cast::<*const c_char>();
                EventValue::String(if s.is_null() { Default::default() } else { CStr::from_ptr(s).to_owned() })
            }
            _ => EventValue::None,
        }
    }
}

/// # Safety
/// `s` must be null or a valid NUL-terminated string.
unsafe fn lossy(s: *const c_char) -> String {
    if s.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(s) }.to_string_lossy().into_owned()
    }
}

/// # Safety
/// Same as [`lossy`].
unsafe fn bytes(s: *const c_char) -> Vec<u8> {
    if s.is_null() {
        Vec::new()
    } else {
        unsafe { CStr::from_ptr(s) }.to_bytes().to_vec()
    }
}
