use std::ffi::{c_char, c_int, c_void, CString};
use std::ptr;

use mpvbridge_core::value::flag_to_native;
use mpvbridge_core::{CallbackError, CallbackResult, CallbackSink, EventId, LogLevel, PropertyValue, RenderTarget};

/// Property payload passed to `on_property`. Only the field matching
/// `format` is meaningful; `string` is borrowed for the callback's duration.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MpvBridgeValue {
    pub format: c_int,
    pub flag: c_int,
    pub int64: i64,
    pub double: f64,
    pub string: *const c_char,
}

/// Host callback table. Callbacks run on the dispatch thread, so
/// `user_data` must be usable from any thread. `release` is called exactly
/// once, when the bridge drops its reference to the sink.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MpvBridgeCallbacks {
    pub user_data: *mut c_void,
    pub on_event: Option<unsafe extern "C" fn(user_data: *mut c_void, event_id: c_int)>,
    pub on_property:
        Option<unsafe extern "C" fn(user_data: *mut c_void, name: *const c_char, value: *const MpvBridgeValue)>,
    pub on_log_message: Option<
        unsafe extern "C" fn(user_data: *mut c_void, prefix: *const c_char, level: c_int, text: *const c_char),
    >,
    pub release: Option<unsafe extern "C" fn(user_data: *mut c_void)>,
}

pub(crate) struct ForeignSink {
    callbacks: MpvBridgeCallbacks,
}

// SAFETY: the callback table contract requires `user_data` to be thread-safe.
unsafe impl Send for ForeignSink {}
unsafe impl Sync for ForeignSink {}

impl ForeignSink {
    pub(crate) fn new(callbacks: MpvBridgeCallbacks) -> Self {
        Self { callbacks }
    }
}

fn c_text(text: &str, what: &str) -> Result<CString, CallbackError> {
    CString::new(text).map_err(|_| CallbackError::new(format!("{what} contains a NUL byte")))
}

impl CallbackSink for ForeignSink {
    fn on_event(&self, id: EventId) -> CallbackResult {
        if let Some(on_event) = self.callbacks.on_event {
            // SAFETY: host-provided callback with host-provided user data.
            unsafe { on_event(self.callbacks.user_data, id.0) };
        }
        Ok(())
    }

    fn on_property(&self, name: &str, value: PropertyValue) -> CallbackResult {
        let Some(on_property) = self.callbacks.on_property else {
            return Ok(());
        };
        let name = c_text(name, "property name")?;
        let mut raw =
            MpvBridgeValue { format: value.format().as_raw(), flag: 0, int64: 0, double: 0.0, string: ptr::null() };
        let text;
        match &value {
            PropertyValue::None => {}
            PropertyValue::Flag(v) => raw.flag = flag_to_native(*v),
            PropertyValue::Int64(v) => raw.int64 = *v,
            PropertyValue::Double(v) => raw.double = *v,
            PropertyValue::String(v) => {
                text = c_text(v, "property value")?;
                raw.string = text.as_ptr();
            }
        }
        // SAFETY: `name`, `raw` and `text` outlive the call.
        unsafe { on_property(self.callbacks.user_data, name.as_ptr(), &raw) };
        Ok(())
    }

    fn on_log_message(&self, prefix: &str, level: LogLevel, text: &str) -> CallbackResult {
        let Some(on_log_message) = self.callbacks.on_log_message else {
            return Ok(());
        };
        let prefix = c_text(prefix, "log prefix")?;
        let text = c_text(text, "log text")?;
        // SAFETY: both strings outlive the call.
        unsafe { on_log_message(self.callbacks.user_data, prefix.as_ptr(), level.0, text.as_ptr()) };
        Ok(())
    }
}

impl Drop for ForeignSink {
    fn drop(&mut self) {
        if let Some(release) = self.callbacks.release {
            // SAFETY: called once, after the last callback.
            unsafe { release(self.callbacks.user_data) };
        }
    }
}

/// Render target owned by the host, released through its callback.
pub(crate) struct ForeignTarget {
    pub(crate) window: i64,
    pub(crate) user_data: *mut c_void,
    pub(crate) release: Option<unsafe extern "C" fn(user_data: *mut c_void)>,
}

// SAFETY: the attach contract requires `user_data` to be thread-safe.
unsafe impl Send for ForeignTarget {}
unsafe impl Sync for ForeignTarget {}

impl RenderTarget for ForeignTarget {
    fn native_window(&self) -> i64 {
        self.window
    }
}

impl Drop for ForeignTarget {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            // SAFETY: called once, when the bridge stops referencing the target.
            unsafe { release(self.user_data) };
        }
    }
}
