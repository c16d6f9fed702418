//! C entry points over [`mpvbridge_core::Instance`].
//!
//! Every function takes the opaque handle returned by [`mpvbridge_create`].
//! Pointers are validated before use and a null handle or argument yields
//! [`MPVBRIDGE_ERROR_INVALID_ARGUMENT`]. Status codes are zero on success.

mod ffi;
mod sink;
mod status;

pub use ffi::*;
pub use sink::{MpvBridgeCallbacks, MpvBridgeValue};
pub use status::*;
