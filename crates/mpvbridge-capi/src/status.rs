use std::ffi::c_int;

use mpvbridge_core::BridgeError;

pub const MPVBRIDGE_OK: c_int = 0;
pub const MPVBRIDGE_ERROR_ENGINE_CREATE: c_int = -1;
pub const MPVBRIDGE_ERROR_ENGINE_INIT: c_int = -2;
pub const MPVBRIDGE_ERROR_THREAD_SPAWN: c_int = -3;
pub const MPVBRIDGE_ERROR_NOT_INITIALIZED: c_int = -4;
pub const MPVBRIDGE_ERROR_INVALID_ARGUMENT: c_int = -5;
pub const MPVBRIDGE_ERROR_INVALID_STATE: c_int = -6;
pub const MPVBRIDGE_ERROR_PROPERTY_READ: c_int = -7;
pub const MPVBRIDGE_ERROR_PROPERTY_WRITE: c_int = -8;
pub const MPVBRIDGE_ERROR_OBSERVE: c_int = -9;
pub const MPVBRIDGE_ERROR_TARGET_ATTACH: c_int = -10;
pub const MPVBRIDGE_ERROR_ARGUMENT_CONVERSION: c_int = -11;
pub const MPVBRIDGE_ERROR_COMMAND: c_int = -12;

pub(crate) fn status_of(err: &BridgeError) -> c_int {
    match err {
        BridgeError::EngineCreate => MPVBRIDGE_ERROR_ENGINE_CREATE,
        BridgeError::EngineInit { .. } => MPVBRIDGE_ERROR_ENGINE_INIT,
        BridgeError::ThreadSpawn(_) => MPVBRIDGE_ERROR_THREAD_SPAWN,
        BridgeError::EngineNotInitialized => MPVBRIDGE_ERROR_NOT_INITIALIZED,
        BridgeError::InvalidArgument(_) => MPVBRIDGE_ERROR_INVALID_ARGUMENT,
        BridgeError::InvalidState(_) => MPVBRIDGE_ERROR_INVALID_STATE,
        BridgeError::PropertyRead { .. } => MPVBRIDGE_ERROR_PROPERTY_READ,
        BridgeError::PropertyWrite { .. } => MPVBRIDGE_ERROR_PROPERTY_WRITE,
        BridgeError::Observe { .. } => MPVBRIDGE_ERROR_OBSERVE,
        BridgeError::TargetAttach { .. } => MPVBRIDGE_ERROR_TARGET_ATTACH,
        BridgeError::ArgumentConversion(_) => MPVBRIDGE_ERROR_ARGUMENT_CONVERSION,
        BridgeError::Command { .. } => MPVBRIDGE_ERROR_COMMAND,
    }
}
