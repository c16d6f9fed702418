//! libmpv client API status codes.

use std::ffi::c_int;

pub const SUCCESS: c_int = 0;
pub const EVENT_QUEUE_FULL: c_int = -1;
pub const NOMEM: c_int = -2;
pub const UNINITIALIZED: c_int = -3;
pub const INVALID_PARAMETER: c_int = -4;
pub const OPTION_NOT_FOUND: c_int = -5;
pub const OPTION_FORMAT: c_int = -6;
pub const OPTION_ERROR: c_int = -7;
pub const PROPERTY_NOT_FOUND: c_int = -8;
pub const PROPERTY_FORMAT: c_int = -9;
pub const PROPERTY_UNAVAILABLE: c_int = -10;
pub const PROPERTY_ERROR: c_int = -11;
pub const COMMAND: c_int = -12;
pub const LOADING_FAILED: c_int = -13;
pub const AO_INIT_FAILED: c_int = -14;
pub const VO_INIT_FAILED: c_int = -15;
pub const NOTHING_TO_PLAY: c_int = -16;
pub const UNKNOWN_FORMAT: c_int = -17;
pub const UNSUPPORTED: c_int = -18;
pub const NOT_IMPLEMENTED: c_int = -19;
pub const GENERIC: c_int = -20;

/// Human readable name of an engine status code.
pub fn error_name(code: c_int) -> &'static str {
    match code {
        c if c >= SUCCESS => "success",
        EVENT_QUEUE_FULL => "event queue full",
        NOMEM => "memory allocation failed",
        UNINITIALIZED => "core not initialized",
        INVALID_PARAMETER => "invalid parameter",
        OPTION_NOT_FOUND => "option not found",
        OPTION_FORMAT => "unsupported format for accessing option",
        OPTION_ERROR => "error setting option",
        PROPERTY_NOT_FOUND => "property not found",
        PROPERTY_FORMAT => "unsupported format for accessing property",
        PROPERTY_UNAVAILABLE => "property unavailable",
        PROPERTY_ERROR => "error accessing property",
        COMMAND => "error running command",
        LOADING_FAILED => "loading failed",
        AO_INIT_FAILED => "audio output initialization failed",
        VO_INIT_FAILED => "video output initialization failed",
        NOTHING_TO_PLAY => "no audio or video data played",
        UNKNOWN_FORMAT => "unrecognized file format",
        UNSUPPORTED => "not supported",
        NOT_IMPLEMENTED => "operation not implemented",
        GENERIC => "something happened",
        _ => "unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_cover_known_codes() {
        assert_eq!(error_name(0), "success");
        assert_eq!(error_name(PROPERTY_NOT_FOUND), "property not found");
        assert_eq!(error_name(GENERIC), "something happened");
        assert_eq!(error_name(-999), "unknown error");
    }
}
