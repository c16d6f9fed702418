//! Contract between the bridge and the native media engine.
//!
//! The engine is an opaque collaborator. Status codes follow libmpv: zero or
//! positive means success, negative values are listed in [`code`].

pub mod code;
mod event;

use std::ffi::{c_char, c_int, c_void, CStr};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

pub use code::error_name;
pub use event::{EngineEvent, EventId, EventValue, LogLevel, LogMessage, PropertyChange};

use crate::value::Format;

/// Value handed to the engine for property and option writes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NativeValue<'a> {
    None,
    Flag(c_int),
    Int64(i64),
    Double(f64),
    String(&'a CStr),
}

impl NativeValue<'_> {
    pub fn format(&self) -> Format {
        match self {
            NativeValue::None => Format::None,
            NativeValue::Flag(_) => Format::Flag,
            NativeValue::Int64(_) => Format::Int64,
            NativeValue::Double(_) => Format::Double,
            NativeValue::String(_) => Format::String,
        }
    }
}

/// Successful property read in the requested format.
#[derive(Debug)]
pub enum NativeReply {
    Flag(c_int),
    Int64(i64),
    Double(f64),
    String(EngineString),
}

impl NativeReply {
    pub fn format(&self) -> Format {
        match self {
            NativeReply::Flag(_) => Format::Flag,
            NativeReply::Int64(_) => Format::Int64,
            NativeReply::Double(_) => Format::Double,
            NativeReply::String(_) => Format::String,
        }
    }
}

type Release = Box<dyn FnOnce(NonNull<c_char>) + Send>;

/// NUL-terminated string buffer allocated by the engine.
///
/// The buffer is returned to the engine when the value is dropped, so a
/// caller copies what it needs and lets this go.
pub struct EngineString {
    ptr: NonNull<c_char>,
    release: Option<Release>,
}

// SAFETY: the buffer is exclusively owned and the release closure is `Send`.
unsafe impl Send for EngineString {}

impl EngineString {
    /// Wraps a buffer that must be released with the engine's `free`.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    /// `ptr` must point to a NUL-terminated string that stays valid and
    /// unaliased until `free` is called on it, and nothing else frees it.
    pub unsafe fn from_raw(ptr: *mut c_char, free: unsafe extern "C" fn(*mut c_void)) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        Some(Self {
            ptr,
            // SAFETY: forwarded from the caller's contract on `ptr`.
            release: Some(Box::new(move |p: NonNull<c_char>| unsafe { free(p.as_ptr().cast()) })),
        })
    }

    /// Wraps a buffer released by an arbitrary closure.
    ///
    /// # Safety
    /// Same contract as [`EngineString::from_raw`], with `release` taking the
    /// role of the engine's `free`.
    pub unsafe fn with_release<F>(ptr: NonNull<c_char>, release: F) -> Self
    where
        F: FnOnce(NonNull<c_char>) + Send + 'static,
    {
        Self { ptr, release: Some(Box::new(release)) }
    }

    pub fn as_c_str(&self) -> &CStr {
        // SAFETY: valid NUL-terminated buffer until drop.
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
    }

    pub fn to_string_lossy(&self) -> String {
        self.as_c_str().to_string_lossy().into_owned()
    }
}

impl Drop for EngineString {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.ptr);
        }
    }
}

impl fmt::Debug for EngineString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EngineString").field(&self.as_c_str()).finish()
    }
}

/// One native engine instance.
///
/// Every method except `wait_event` may be called from any thread.
/// `wait_event` is only ever called from the dispatch thread. After
/// `terminate_destroy` all other calls must fail with
/// [`code::UNINITIALIZED`] (or return `None` from `wait_event`).
pub trait NativeEngine: Send + Sync {
    fn initialize(&self) -> c_int;

    /// Destroys the instance. Called exactly once per handle by the bridge.
    fn terminate_destroy(&self);

    fn request_log_messages(&self, min_level: &CStr) -> c_int;

    fn command(&self, args: &[&CStr]) -> c_int;

    fn set_option(&self, name: &CStr, value: NativeValue<'_>) -> c_int;

    fn set_option_string(&self, name: &CStr, value: &CStr) -> c_int;

    fn get_property(&self, name: &CStr, format: Format) -> Result<NativeReply, c_int>;

    fn set_property(&self, name: &CStr, value: NativeValue<'_>) -> c_int;

    fn observe_property(&self, reply_id: u64, name: &CStr, format: Format) -> c_int;

    /// Blocks up to `timeout` seconds; a negative timeout waits indefinitely.
    ///
    /// `None` is the null event pointer; `Some(EngineEvent::None)` is a
    /// timeout or wakeup.
    fn wait_event(&self, timeout: f64) -> Option<EngineEvent>;

    /// Interrupts a concurrent `wait_event`.
    fn wakeup(&self);
}

pub type NativeEngineRef = Arc<dyn NativeEngine>;

/// Allocates engine handles. `None` means the engine could not be created.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Option<NativeEngineRef>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn engine_string_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let raw = CString::new("hello").unwrap().into_raw();
        let counter = released.clone();
        let s = unsafe {
            EngineString::with_release(NonNull::new(raw).unwrap(), move |p| {
                drop(CString::from_raw(p.as_ptr()));
                counter.fetch_add(1, Ordering::SeqCst);
            })
        };
        assert_eq!(s.to_string_lossy(), "hello");
        drop(s);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn from_raw_rejects_null() {
        unsafe extern "C" fn never(_: *mut c_void) {
            unreachable!()
        }
        assert!(unsafe { EngineString::from_raw(std::ptr::null_mut(), never) }.is_none());
    }
}
