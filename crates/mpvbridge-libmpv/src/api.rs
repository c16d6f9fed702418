use std::ffi::{c_char, c_int, c_ulong, c_void};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use libloading::Library;
use log::{debug, info};

use crate::error::LoadError;
use crate::ffi::{make_version, MpvEvent, MpvHandle};

const LOG_TARGET: &str = "mpvbridge::libmpv";

/// Oldest client API with every entry point used here.
const REQUIRED_API: u64 = make_version(1, 0);

#[cfg(target_os = "windows")]
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &["libmpv-2.dll", "mpv-2.dll", "mpv-1.dll"];
#[cfg(target_os = "macos")]
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &["libmpv.2.dylib", "libmpv.dylib"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &["libmpv.so.2", "libmpv.so.1", "libmpv.so"];

static DEFAULT_API: OnceLock<Result<Arc<MpvApi>, LoadError>> = OnceLock::new();

/// Resolved libmpv client API.
///
/// Function pointers stay valid for as long as the library is loaded, which
/// is the lifetime of this value.
pub struct MpvApi {
    path: PathBuf,
    client_api_version: u64,
    pub(crate) create: unsafe extern "C" fn() -> *mut MpvHandle,
    pub(crate) initialize: unsafe extern "C" fn(*mut MpvHandle) -> c_int,
    pub(crate) terminate_destroy: unsafe extern "C" fn(*mut MpvHandle),
    pub(crate) request_log_messages: unsafe extern "C" fn(*mut MpvHandle, *const c_char) -> c_int,
    pub(crate) command: unsafe extern "C" fn(*mut MpvHandle, *mut *const c_char) -> c_int,
    pub(crate) set_option: unsafe extern "C" fn(*mut MpvHandle, *const c_char, c_int, *mut c_void) -> c_int,
    pub(crate) set_option_string: unsafe extern "C" fn(*mut MpvHandle, *const c_char, *const c_char) -> c_int,
    pub(crate) get_property: unsafe extern "C" fn(*mut MpvHandle, *const c_char, c_int, *mut c_void) -> c_int,
    pub(crate) set_property: unsafe extern "C" fn(*mut MpvHandle, *const c_char, c_int, *mut c_void) -> c_int,
    pub(crate) observe_property: unsafe extern "C" fn(*mut MpvHandle, u64, *const c_char, c_int) -> c_int,
    pub(crate) wait_event: unsafe extern "C" fn(*mut MpvHandle, f64) -> *mut MpvEvent,
    pub(crate) wakeup: unsafe extern "C" fn(*mut MpvHandle),
    pub(crate) free: unsafe extern "C" fn(*mut c_void),
    _library: Library,
}

impl MpvApi {
    /// Opens libmpv from an explicit path.
    pub fn load(path: &Path) -> Result<Arc<Self>, LoadError> {
        Self::open(path).map(Arc::new)
    }

    /// Opens the first libmpv found under the platform's usual names.
    ///
    /// The result, success or failure, is cached for the process.
    pub fn load_default() -> Result<Arc<Self>, LoadError> {
        DEFAULT_API
            .get_or_init(|| {
                let mut tried = Vec::with_capacity(DEFAULT_LIBRARY_NAMES.len());
                for name in DEFAULT_LIBRARY_NAMES {
                    match Self::open(Path::new(name)) {
                        Ok(api) => return Ok(Arc::new(api)),
                        Err(LoadError::Open { message, .. }) => {
                            debug!(target: LOG_TARGET, "{name}: {message}");
                            tried.push((*name).to_owned());
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(LoadError::NotFound { tried })
            })
            .clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn client_api_version(&self) -> u64 {
        self.client_api_version
    }

    fn open(path: &Path) -> Result<Self, LoadError> {
        // SAFETY: loading libmpv runs its initializers, which have no
        // preconditions on the caller.
        let library = unsafe { Library::new(path) }
            .map_err(|e| LoadError::Open { path: path.to_path_buf(), message: e.to_string() })?;

        // SAFETY (all lookups): each type matches the prototype in client.h.
        let version: unsafe extern "C" fn() -> c_ulong = unsafe { symbol(&library, path, "mpv_client_api_version")? };
        // SAFETY: takes no arguments and only returns a constant.
        let client_api_version = u64::from(unsafe { version() });
        if client_api_version < REQUIRED_API {
            return Err(LoadError::Version { found: client_api_version, required: REQUIRED_API });
        }

        let api = unsafe {
            Self {
                path: path.to_path_buf(),
                client_api_version,
                create: symbol(&library, path, "mpv_create")?,
                initialize: symbol(&library, path, "mpv_initialize")?,
                terminate_destroy: symbol(&library, path, "mpv_terminate_destroy")?,
                request_log_messages: symbol(&library, path, "mpv_request_log_messages")?,
                command: symbol(&library, path, "mpv_command")?,
                set_option: symbol(&library, path, "mpv_set_option")?,
                set_option_string: symbol(&library, path, "mpv_set_option_string")?,
                get_property: symbol(&library, path, "mpv_get_property")?,
                set_property: symbol(&library, path, "mpv_set_property")?,
                observe_property: symbol(&library, path, "mpv_observe_property")?,
                wait_event: symbol(&library, path, "mpv_wait_event")?,
                wakeup: symbol(&library, path, "mpv_wakeup")?,
                free: symbol(&library, path, "mpv_free")?,
                _library: library,
            }
        };

        info!(
            target: LOG_TARGET,
            "loaded {} (client API {}.{})",
            path.display(),
            client_api_version >> 16,
            client_api_version & 0xffff
        );
        Ok(api)
    }
}

/// Copies a function pointer out of `library`.
///
/// # Safety
/// `T` must be the exact function pointer type of the exported symbol.
unsafe fn symbol<T: Copy>(library: &Library, path: &Path, name: &'static str) -> Result<T, LoadError> {
    let mut bytes = Vec::with_capacity(name.len() + 1);
    bytes.extend_from_slice(name.as_bytes());
    bytes.push(0);
    // SAFETY: forwarded from the caller.
    let symbol = unsafe { library.get::<T>(&bytes) }.map_err(|e| LoadError::Symbol {
        path: path.to_path_buf(),
        symbol: name,
        message: e.to_string(),
    })?;
    Ok(*symbol)
}
