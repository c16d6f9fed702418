use std::io;

use thiserror::Error;

use crate::engine::error_name;
use crate::instance::LifecycleState;

/// Why a command argument vector could not be handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentFault {
    #[error("{count} arguments exceed the limit of {max}")]
    TooMany { count: usize, max: usize },

    #[error("argument {index} contains an interior NUL byte")]
    InteriorNul { index: usize },

    #[error("argument {index} is a null pointer")]
    Null { index: usize },

    #[error("argument {index} is not valid UTF-8")]
    NotUtf8 { index: usize },
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("engine instance could not be created")]
    EngineCreate,

    #[error("engine failed to initialize: {} ({code})", error_name(*.code))]
    EngineInit { code: i32 },

    #[error("failed to spawn dispatch thread: {0}")]
    ThreadSpawn(#[source] io::Error),

    #[error("engine is not initialized or was torn down")]
    EngineNotInitialized,

    #[error("invalid {0}")]
    InvalidArgument(&'static str),

    #[error("operation not allowed while instance is {0}")]
    InvalidState(LifecycleState),

    #[error("failed to read property '{name}': {} ({code})", error_name(*.code))]
    PropertyRead { name: String, code: i32 },

    #[error("failed to write property '{name}': {} ({code})", error_name(*.code))]
    PropertyWrite { name: String, code: i32 },

    #[error("failed to observe property '{name}': {} ({code})", error_name(*.code))]
    Observe { name: String, code: i32 },

    #[error("render target rejected: {} ({code})", error_name(*.code))]
    TargetAttach { code: i32 },

    #[error("command arguments rejected: {0}")]
    ArgumentConversion(#[from] ArgumentFault),

    #[error("command failed: {} ({code})", error_name(*.code))]
    Command { code: i32 },
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result of [`Instance::teardown`](crate::Instance::teardown).
///
/// A repeated teardown is not an error; it reports [`TeardownOutcome::Noop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownOutcome {
    Completed,
    Noop,
}

impl TeardownOutcome {
    #[inline]
    pub fn is_noop(self) -> bool {
        matches!(self, TeardownOutcome::Noop)
    }
}
