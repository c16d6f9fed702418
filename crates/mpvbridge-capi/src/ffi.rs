use std::ffi::{c_char, c_double, c_int, c_void, CStr, CString};
use std::path::Path;
use std::ptr;
use std::slice;
use std::sync::Arc;

use log::{error, warn};
use mpvbridge_core::{
    ArgumentFault, BridgeError, BridgeResult, CallbackSinkRef, EngineFactory, Format, Instance, MAX_COMMAND_ARGS,
};
use mpvbridge_libmpv::LibMpvFactory;

use crate::sink::{ForeignSink, ForeignTarget, MpvBridgeCallbacks};
use crate::status::{status_of, MPVBRIDGE_ERROR_INVALID_ARGUMENT, MPVBRIDGE_OK};

const LOG_TARGET: &str = "mpvbridge::capi";

/// Opaque handle owned by the host between create and destroy.
pub struct MpvBridge {
    instance: Instance,
}

/// Creates an instance over any engine factory.
///
/// Returns null on failure, after releasing the callbacks.
pub fn create_with_factory(factory: Arc<dyn EngineFactory>, callbacks: MpvBridgeCallbacks) -> *mut MpvBridge {
    create(factory, ForeignSink::new(callbacks))
}

fn create(factory: Arc<dyn EngineFactory>, sink: ForeignSink) -> *mut MpvBridge {
    let sink: CallbackSinkRef = Arc::new(sink);
    match Instance::create(factory, sink) {
        Ok(instance) => Box::into_raw(Box::new(MpvBridge { instance })),
        Err(e) => {
            error!(target: LOG_TARGET, "{e}");
            ptr::null_mut()
        }
    }
}

/// # Safety
/// `handle` must be null or a live handle from [`mpvbridge_create`].
unsafe fn bridge<'a>(handle: *mut MpvBridge) -> BridgeResult<&'a MpvBridge> {
    // SAFETY: forwarded from the caller.
    unsafe { handle.as_ref() }.ok_or(BridgeError::InvalidArgument("handle"))
}

/// # Safety
/// `ptr` must be null or a valid NUL-terminated string.
unsafe fn text<'a>(ptr: *const c_char, what: &'static str) -> BridgeResult<&'a str> {
    if ptr.is_null() {
        return Err(BridgeError::InvalidArgument(what));
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    unsafe { CStr::from_ptr(ptr) }.to_str().map_err(|_| BridgeError::InvalidArgument(what))
}

/// # Safety
/// `out` must be null or valid for one write of `T`.
unsafe fn write_out<T>(out: *mut T, value: impl FnOnce() -> BridgeResult<T>) -> BridgeResult<()> {
    if out.is_null() {
        return Err(BridgeError::InvalidArgument("output pointer"));
    }
    let value = value()?;
    // SAFETY: non-null and writable per the caller.
    unsafe { out.write(value) };
    Ok(())
}

fn status(result: BridgeResult<()>) -> c_int {
    match result {
        Ok(()) => MPVBRIDGE_OK,
        Err(e) => {
            warn!(target: LOG_TARGET, "{e}");
            status_of(&e)
        }
    }
}

/// Creates an instance backed by libmpv.
///
/// `library_path` may be null to search the platform's default names.
/// On failure returns null; `callbacks.release` has then already been called.
///
/// # Safety
/// `callbacks` must be null or point to a valid table; `library_path` must be
/// null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn mpvbridge_create(
    callbacks: *const MpvBridgeCallbacks,
    library_path: *const c_char,
) -> *mut MpvBridge {
    // SAFETY: forwarded from the caller.
    let Some(callbacks) = (unsafe { callbacks.as_ref() }).copied() else {
        warn!(target: LOG_TARGET, "mpvbridge_create: null callbacks");
        return ptr::null_mut();
    };
    let sink = ForeignSink::new(callbacks);

    let path = if library_path.is_null() {
        None
    } else {
        // SAFETY: forwarded from the caller.
        match unsafe { text(library_path, "library path") } {
            Ok(path) => Some(Path::new(path)),
            Err(e) => {
                warn!(target: LOG_TARGET, "mpvbridge_create: {e}");
                return ptr::null_mut();
            }
        }
    };

    let factory = match LibMpvFactory::load(path) {
        Ok(factory) => factory,
        Err(e) => {
            error!(target: LOG_TARGET, "{e}");
            return ptr::null_mut();
        }
    };

    create(Arc::new(factory), sink)
}

/// # Safety
/// `handle` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn mpvbridge_initialize(handle: *mut MpvBridge) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe { bridge(handle) }.and_then(|b| b.instance.initialize()))
}

/// Tears the instance down and frees the handle. Null is ignored.
///
/// # Safety
/// `handle` must be null or a live handle; it is invalid afterwards.
#[no_mangle]
pub unsafe extern "C" fn mpvbridge_destroy(handle: *mut MpvBridge) {
    if handle.is_null() {
        return;
    }
    // SAFETY: the handle came from Box::into_raw in create.
    let bridge = unsafe { Box::from_raw(handle) };
    bridge.instance.teardown();
}

/// # Safety
/// `handle` must be null or live; `argv` must be null or point to `argc`
/// pointers, each null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn mpvbridge_command(handle: *mut MpvBridge, argv: *const *const c_char, argc: c_int) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe { command(handle, argv, argc) })
}

unsafe fn command(handle: *mut MpvBridge, argv: *const *const c_char, argc: c_int) -> BridgeResult<()> {
    // SAFETY: forwarded from the caller.
    let bridge = unsafe { bridge(handle) }?;
    if argv.is_null() {
        return Err(BridgeError::InvalidArgument("argv"));
    }
    let count = usize::try_from(argc).map_err(|_| BridgeError::InvalidArgument("argc"))?;
    if count > MAX_COMMAND_ARGS {
        return Err(ArgumentFault::TooMany { count, max: MAX_COMMAND_ARGS }.into());
    }
    // SAFETY: `argv` holds `count` pointers per the caller.
    let raw = unsafe { slice::from_raw_parts(argv, count) };
    let mut args = Vec::with_capacity(count);
    for (index, &arg) in raw.iter().enumerate() {
        if arg.is_null() {
            return Err(ArgumentFault::Null { index }.into());
        }
        // SAFETY: non-null and NUL-terminated per the caller.
        let arg = unsafe { CStr::from_ptr(arg) }.to_str().map_err(|_| ArgumentFault::NotUtf8 { index })?;
        args.push(arg);
    }
    bridge.instance.command(&args)
}

/// Sets an option from text. Returns the engine's own status code on
/// success of the call itself, or a bridge status code.
///
/// # Safety
/// `handle` must be null or live; `name`/`value` null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn mpvbridge_set_option_string(
    handle: *mut MpvBridge,
    name: *const c_char,
    value: *const c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    let result = unsafe {
        bridge(handle).and_then(|b| b.instance.set_option(text(name, "option name")?, text(value, "option value")?))
    };
    match result {
        Ok(code) => code,
        Err(e) => status(Err(e)),
    }
}

macro_rules! property_getter {
    ($name:ident, $ty:ty, $method:ident, $convert:expr) => {
        /// # Safety
        /// `handle` must be null or live; `name` null or NUL-terminated;
        /// `out` null or writable.
        #[no_mangle]
        pub unsafe extern "C" fn $name(handle: *mut MpvBridge, name: *const c_char, out: *mut $ty) -> c_int {
            // SAFETY: forwarded from the caller.
            status(unsafe {
                write_out(out, || {
                    bridge(handle).and_then(|b| b.instance.$method(text(name, "property name")?)).map($convert)
                })
            })
        }
    };
}

macro_rules! property_setter {
    ($name:ident, $ty:ty, $method:ident, $convert:expr) => {
        /// # Safety
        /// `handle` must be null or live; `name` null or NUL-terminated.
        #[no_mangle]
        pub unsafe extern "C" fn $name(handle: *mut MpvBridge, name: *const c_char, value: $ty) -> c_int {
            // SAFETY: forwarded from the caller.
            status(unsafe {
                bridge(handle).and_then(|b| b.instance.$method(text(name, "property name")?, $convert(value)))
            })
        }
    };
}

property_getter!(mpvbridge_get_property_int, i64, get_int, |v| v);
property_getter!(mpvbridge_get_property_double, c_double, get_double, |v| v);
property_getter!(mpvbridge_get_property_flag, c_int, get_bool, c_int::from);
property_setter!(mpvbridge_set_property_int, i64, set_int, |v| v);
property_setter!(mpvbridge_set_property_double, c_double, set_double, |v| v);
property_setter!(mpvbridge_set_property_flag, c_int, set_bool, |v: c_int| v != 0);

/// Reads a property as text into `*out`, to be freed with
/// [`mpvbridge_free_string`].
///
/// # Safety
/// `handle` must be null or live; `name` null or NUL-terminated; `out` null
/// or writable.
#[no_mangle]
pub unsafe extern "C" fn mpvbridge_get_property_string(
    handle: *mut MpvBridge,
    name: *const c_char,
    out: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe {
        write_out(out, || {
            bridge(handle)
                .and_then(|b| b.instance.get_string(text(name, "property name")?))
                .and_then(|s| CString::new(s).map_err(|_| BridgeError::InvalidArgument("property value")))
                .map(CString::into_raw)
        })
    })
}

/// # Safety
/// `handle` must be null or live; `name`/`value` null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn mpvbridge_set_property_string(
    handle: *mut MpvBridge,
    name: *const c_char,
    value: *const c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe {
        bridge(handle).and_then(|b| b.instance.set_string(text(name, "property name")?, text(value, "property value")?))
    })
}

/// Observes a property in the given format tag.
///
/// # Safety
/// `handle` must be null or live; `name` null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn mpvbridge_observe_property(
    handle: *mut MpvBridge,
    name: *const c_char,
    format: c_int,
) -> c_int {
    let Some(format) = Format::from_raw(format) else {
        warn!(target: LOG_TARGET, "unknown format tag {format}");
        return MPVBRIDGE_ERROR_INVALID_ARGUMENT;
    };
    // SAFETY: forwarded from the caller.
    status(unsafe { bridge(handle).and_then(|b| b.instance.observe(text(name, "property name")?, format)) })
}

/// Attaches a host render target. `release` is called with `user_data`
/// once the bridge no longer references the target, including when the
/// attach itself fails.
///
/// # Safety
/// `handle` must be null or live; `user_data` must be usable from any thread.
#[no_mangle]
pub unsafe extern "C" fn mpvbridge_attach_target(
    handle: *mut MpvBridge,
    window: i64,
    user_data: *mut c_void,
    release: Option<unsafe extern "C" fn(user_data: *mut c_void)>,
) -> c_int {
    let target = Arc::new(ForeignTarget { window, user_data, release });
    // SAFETY: forwarded from the caller.
    status(unsafe { bridge(handle) }.and_then(|b| b.instance.attach_target(target)))
}

/// # Safety
/// `handle` must be null or live.
#[no_mangle]
pub unsafe extern "C" fn mpvbridge_detach_target(handle: *mut MpvBridge) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe { bridge(handle) }.and_then(|b| b.instance.detach_target()))
}

/// Frees a string returned by [`mpvbridge_get_property_string`]. Null is ignored.
///
/// # Safety
/// `s` must be null or a string from this library not yet freed.
#[no_mangle]
pub unsafe extern "C" fn mpvbridge_free_string(s: *mut c_char) {
    if !s.is_null() {
        // SAFETY: produced by CString::into_raw.
        drop(unsafe { CString::from_raw(s) });
    }
}
