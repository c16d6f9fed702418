use std::sync::Once;

use log::debug;

static NUMERIC_LOCALE: Once = Once::new();

/// Forces "C" numeric formatting for the whole process.
///
/// The engine parses floating point option strings with the C library,
/// which honors the `LC_NUMERIC` category. The process environment is not
/// touched.
pub(crate) fn normalize_numeric_locale() {
    NUMERIC_LOCALE.call_once(|| {
        set_c_numeric_locale();
        debug!(target: "mpvbridge::instance", "numeric locale normalized to C");
    });
}

#[cfg(unix)]
fn set_c_numeric_locale() {
    // SAFETY: static NUL-terminated argument; runs once per process.
    unsafe {
        libc::setlocale(libc::LC_NUMERIC, c"C".as_ptr());
    }
}

#[cfg(not(unix))]
fn set_c_numeric_locale() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn current_numeric_locale() -> String {
        // SAFETY: a null locale only queries; the returned string is copied
        // before any other locale call.
        unsafe {
            let current = libc::setlocale(libc::LC_NUMERIC, std::ptr::null());
            assert!(!current.is_null());
            std::ffi::CStr::from_ptr(current).to_string_lossy().into_owned()
        }
    }

    #[cfg(unix)]
    #[test]
    fn normalization_is_idempotent() {
        normalize_numeric_locale();
        normalize_numeric_locale();
        assert_eq!(current_numeric_locale(), "C");
    }
}
