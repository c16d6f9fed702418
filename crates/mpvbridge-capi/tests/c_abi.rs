use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use mpvbridge_capi::*;
use mpvbridge_core::loopback::{LoopbackEngine, LoopbackFactory};
use mpvbridge_core::{EventId, Format, PropertyValue};

#[derive(Debug, PartialEq)]
enum Seen {
    Event(i32),
    Property(String, c_int, i64),
    Log(String, c_int, String),
}

struct Host {
    tx: Sender<Seen>,
    released: Arc<AtomicUsize>,
}

unsafe extern "C" fn on_event(user_data: *mut c_void, event_id: c_int) {
    let host = unsafe { &*(user_data as *const Host) };
    let _ = host.tx.send(Seen::Event(event_id));
}

unsafe extern "C" fn on_property(user_data: *mut c_void, name: *const c_char, value: *const MpvBridgeValue) {
    let host = unsafe { &*(user_data as *const Host) };
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    let value = unsafe { &*value };
    let scalar = if value.format == Format::Flag.as_raw() { i64::from(value.flag) } else { value.int64 };
    let _ = host.tx.send(Seen::Property(name, value.format, scalar));
}

unsafe extern "C" fn on_log_message(user_data: *mut c_void, prefix: *const c_char, level: c_int, text: *const c_char) {
    let host = unsafe { &*(user_data as *const Host) };
    let prefix = unsafe { CStr::from_ptr(prefix) }.to_string_lossy().into_owned();
    let text = unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned();
    let _ = host.tx.send(Seen::Log(prefix, level, text));
}

unsafe extern "C" fn release(user_data: *mut c_void) {
    let host = unsafe { Box::from_raw(user_data as *mut Host) };
    host.released.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn release_target(user_data: *mut c_void) {
    let counter = unsafe { &*(user_data as *const AtomicUsize) };
    counter.fetch_add(1, Ordering::SeqCst);
}

struct Harness {
    engine: Arc<LoopbackEngine>,
    handle: *mut MpvBridge,
    rx: Receiver<Seen>,
    released: Arc<AtomicUsize>,
}

fn callbacks() -> (MpvBridgeCallbacks, Receiver<Seen>, Arc<AtomicUsize>) {
    let (tx, rx) = unbounded();
    let released = Arc::new(AtomicUsize::new(0));
    let host = Box::new(Host { tx, released: released.clone() });
    let callbacks = MpvBridgeCallbacks {
        user_data: Box::into_raw(host).cast(),
        on_event: Some(on_event),
        on_property: Some(on_property),
        on_log_message: Some(on_log_message),
        release: Some(release),
    };
    (callbacks, rx, released)
}

fn harness() -> Harness {
    let engine = Arc::new(LoopbackEngine::new());
    let (callbacks, rx, released) = callbacks();
    let handle = create_with_factory(Arc::new(LoopbackFactory::new(engine.clone())), callbacks);
    assert!(!handle.is_null());
    Harness { engine, handle, rx, released }
}

fn recv(rx: &Receiver<Seen>) -> Seen {
    rx.recv_timeout(Duration::from_secs(5)).expect("no callback")
}

#[test]
fn failed_create_releases_callbacks() {
    let (callbacks, _rx, released) = callbacks();
    let handle = create_with_factory(Arc::new(LoopbackFactory::unavailable()), callbacks);
    assert!(handle.is_null());
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn null_callbacks_are_rejected() {
    assert!(unsafe { mpvbridge_create(ptr::null(), ptr::null()) }.is_null());
}

#[test]
fn null_pointers_are_invalid_arguments() {
    let h = harness();
    let mut out = 0i64;
    unsafe {
        assert_eq!(mpvbridge_initialize(ptr::null_mut()), MPVBRIDGE_ERROR_INVALID_ARGUMENT);
        assert_eq!(mpvbridge_initialize(h.handle), MPVBRIDGE_OK);
        assert_eq!(mpvbridge_get_property_int(h.handle, ptr::null(), &mut out), MPVBRIDGE_ERROR_INVALID_ARGUMENT);
        let invalid = MPVBRIDGE_ERROR_INVALID_ARGUMENT;
        assert_eq!(mpvbridge_get_property_int(h.handle, c"volume".as_ptr(), ptr::null_mut()), invalid);
        assert_eq!(mpvbridge_set_property_string(h.handle, c"title".as_ptr(), ptr::null()), invalid);
        assert_eq!(mpvbridge_command(h.handle, ptr::null(), 1), MPVBRIDGE_ERROR_INVALID_ARGUMENT);
        mpvbridge_destroy(h.handle);
        mpvbridge_destroy(ptr::null_mut());
    }
    assert_eq!(h.released.load(Ordering::SeqCst), 1);
}

#[test]
fn properties_round_trip_through_c() {
    let h = harness();
    unsafe {
        assert_eq!(mpvbridge_initialize(h.handle), MPVBRIDGE_OK);

        assert_eq!(mpvbridge_set_property_int(h.handle, c"volume".as_ptr(), 55), MPVBRIDGE_OK);
        let mut volume = 0i64;
        assert_eq!(mpvbridge_get_property_int(h.handle, c"volume".as_ptr(), &mut volume), MPVBRIDGE_OK);
        assert_eq!(volume, 55);

        assert_eq!(mpvbridge_set_property_double(h.handle, c"speed".as_ptr(), 0.75), MPVBRIDGE_OK);
        let mut speed = 0.0f64;
        assert_eq!(mpvbridge_get_property_double(h.handle, c"speed".as_ptr(), &mut speed), MPVBRIDGE_OK);
        assert_eq!(speed, 0.75);

        assert_eq!(mpvbridge_set_property_flag(h.handle, c"pause".as_ptr(), 1), MPVBRIDGE_OK);
        let mut pause = 0;
        assert_eq!(mpvbridge_get_property_flag(h.handle, c"pause".as_ptr(), &mut pause), MPVBRIDGE_OK);
        assert_eq!(pause, 1);

        assert_eq!(mpvbridge_set_property_string(h.handle, c"title".as_ptr(), c"Sintel".as_ptr()), MPVBRIDGE_OK);
        let mut title: *mut c_char = ptr::null_mut();
        assert_eq!(mpvbridge_get_property_string(h.handle, c"title".as_ptr(), &mut title), MPVBRIDGE_OK);
        assert_eq!(CStr::from_ptr(title).to_str().unwrap(), "Sintel");
        mpvbridge_free_string(title);

        let mut missing = 0i64;
        assert_eq!(mpvbridge_get_property_int(h.handle, c"nope".as_ptr(), &mut missing), MPVBRIDGE_ERROR_PROPERTY_READ);

        mpvbridge_destroy(h.handle);
    }
    assert_eq!(h.engine.live_strings(), 0);
}

#[test]
fn callbacks_receive_events_properties_and_logs() {
    let h = harness();
    unsafe {
        assert_eq!(mpvbridge_initialize(h.handle), MPVBRIDGE_OK);
        assert_eq!(mpvbridge_observe_property(h.handle, c"pause".as_ptr(), Format::Flag.as_raw()), MPVBRIDGE_OK);
        assert_eq!(mpvbridge_observe_property(h.handle, c"pause".as_ptr(), 77), MPVBRIDGE_ERROR_INVALID_ARGUMENT);
    }

    h.engine.emit_log("cplayer", mpvbridge_core::LogLevel::INFO, "hello");
    assert_eq!(recv(&h.rx), Seen::Log("cplayer".into(), 40, "hello".into()));

    unsafe {
        assert_eq!(mpvbridge_set_property_flag(h.handle, c"pause".as_ptr(), 1), MPVBRIDGE_OK);
    }
    assert_eq!(recv(&h.rx), Seen::Property("pause".into(), Format::Flag.as_raw(), 1));

    let argv = [c"loadfile".as_ptr(), c"clip.mkv".as_ptr()];
    unsafe {
        assert_eq!(mpvbridge_command(h.handle, argv.as_ptr(), 2), MPVBRIDGE_OK);
    }
    assert_eq!(recv(&h.rx), Seen::Event(EventId::START_FILE.0));
    assert_eq!(recv(&h.rx), Seen::Event(EventId::FILE_LOADED.0));
    assert_eq!(h.engine.property("path"), Some(PropertyValue::String("clip.mkv".into())));

    unsafe { mpvbridge_destroy(h.handle) };
    assert_eq!(h.released.load(Ordering::SeqCst), 1);
}

#[test]
fn command_arguments_are_validated() {
    let h = harness();
    let with_null = [c"show-text".as_ptr(), ptr::null()];
    let too_many: Vec<*const c_char> = vec![c"x".as_ptr(); 129];
    let not_utf8 = CString::new(vec![b'a', 0xFF]).unwrap();
    let bad_text = [c"show-text".as_ptr(), not_utf8.as_ptr()];
    unsafe {
        assert_eq!(mpvbridge_command(h.handle, with_null.as_ptr(), 2), MPVBRIDGE_ERROR_ARGUMENT_CONVERSION);
        assert_eq!(mpvbridge_command(h.handle, too_many.as_ptr(), 129), MPVBRIDGE_ERROR_ARGUMENT_CONVERSION);
        assert_eq!(mpvbridge_command(h.handle, bad_text.as_ptr(), 2), MPVBRIDGE_ERROR_ARGUMENT_CONVERSION);
        assert_eq!(mpvbridge_command(h.handle, with_null.as_ptr(), -1), MPVBRIDGE_ERROR_INVALID_ARGUMENT);
        assert_eq!(mpvbridge_command(h.handle, with_null.as_ptr(), 0), MPVBRIDGE_ERROR_INVALID_ARGUMENT);
    }
    assert!(h.engine.commands().is_empty());
    unsafe { mpvbridge_destroy(h.handle) };
}

#[test]
fn targets_are_released_through_host_callback() {
    let h = harness();
    let first = AtomicUsize::new(0);
    let second = AtomicUsize::new(0);
    unsafe {
        let first_ptr = &first as *const AtomicUsize as *mut c_void;
        let second_ptr = &second as *const AtomicUsize as *mut c_void;
        assert_eq!(mpvbridge_attach_target(h.handle, 11, first_ptr, Some(release_target)), MPVBRIDGE_OK);
        assert_eq!(mpvbridge_attach_target(h.handle, 12, second_ptr, Some(release_target)), MPVBRIDGE_OK);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(h.engine.option("wid"), Some(PropertyValue::Int64(12)));

        assert_eq!(mpvbridge_detach_target(h.handle), MPVBRIDGE_OK);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        assert_eq!(mpvbridge_set_option_string(h.handle, c"hwdec".as_ptr(), c"no".as_ptr()), 0);
        mpvbridge_destroy(h.handle);
    }
}
