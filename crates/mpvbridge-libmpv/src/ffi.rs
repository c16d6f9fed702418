//! Layouts from libmpv's `client.h`.

use std::ffi::{c_char, c_int, c_void};

pub(crate) type MpvHandle = c_void;

#[repr(C)]
#[allow(dead_code)]
pub(crate) struct MpvEvent {
    pub(crate) event_id: c_int,
    pub(crate) error: c_int,
    pub(crate) reply_userdata: u64,
    pub(crate) data: *mut c_void,
}

#[repr(C)]
pub(crate) struct MpvEventProperty {
    pub(crate) name: *const c_char,
    pub(crate) format: c_int,
    pub(crate) data: *mut c_void,
}

#[repr(C)]
#[allow(dead_code)]
pub(crate) struct MpvEventLogMessage {
    pub(crate) prefix: *const c_char,
    pub(crate) level: *const c_char,
    pub(crate) text: *const c_char,
    pub(crate) log_level: c_int,
}

pub(crate) const fn make_version(major: u64, minor: u64) -> u64 {
    (major << 16) | minor
}
