//! The engine instance and its lifecycle.
//!
//! `impl Instance` is split by concern: lifecycle (create, initialize,
//! teardown), typed properties, render target and commands.

mod command;
mod lifecycle;
mod property;
mod target;

use std::ffi::CString;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Mutex, RwLock};

pub use lifecycle::InstanceBuilder;

use crate::config::BridgeConfig;
use crate::engine::{NativeEngine, NativeEngineRef};
use crate::error::{BridgeError, BridgeResult};
use crate::host::{CallbackSinkRef, HostRuntime, RenderTarget};

pub(crate) const LOG_TARGET: &str = "mpvbridge::instance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Created,
    Running,
    TearingDown,
    Destroyed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleState::Created => "created",
            LifecycleState::Running => "running",
            LifecycleState::TearingDown => "tearing down",
            LifecycleState::Destroyed => "destroyed",
        })
    }
}

/// State guarded by the handle lock.
///
/// Bridge operations hold the read side for the duration of their engine
/// call; teardown takes the write side to change state and to release.
struct Core {
    state: LifecycleState,
    engine: Option<NativeEngineRef>,
    engine_started: bool,
    environment_prepared: bool,
}

/// Which lifecycle states an operation may run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// `Created` or `Running`.
    Live,
    /// `Running` only.
    Running,
}

/// One native engine instance bound to one host callback sink.
///
/// `Instance` is `Send + Sync`; share it behind an `Arc` to call it from
/// several host threads. Dropping it tears it down.
pub struct Instance {
    config: BridgeConfig,
    host: Arc<dyn HostRuntime>,
    exit: Arc<AtomicBool>,
    core: RwLock<Core>,
    sink: Mutex<Option<CallbackSinkRef>>,
    target: Mutex<Option<Arc<dyn RenderTarget>>>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
}

impl Instance {
    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.core.read().state
    }

    #[inline]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[inline]
    fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }

    /// Runs `f` against the live engine handle with teardown fenced out.
    fn with_engine<R>(&self, access: Access, f: impl FnOnce(&dyn NativeEngine) -> BridgeResult<R>) -> BridgeResult<R> {
        if self.exit_requested() {
            return Err(BridgeError::EngineNotInitialized);
        }
        let core = self.core.read();
        match (core.state, access) {
            (LifecycleState::Running, _) | (LifecycleState::Created, Access::Live) => {}
            (LifecycleState::Created, Access::Running) => return Err(BridgeError::InvalidState(core.state)),
            (LifecycleState::TearingDown | LifecycleState::Destroyed, _) => {
                return Err(BridgeError::EngineNotInitialized)
            }
        }
        let engine = core.engine.as_deref().ok_or(BridgeError::EngineNotInitialized)?;
        f(engine)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("state", &self.state())
            .field("exit_requested", &self.exit_requested())
            .field("has_target", &self.target.lock().is_some())
            .finish_non_exhaustive()
    }
}

fn c_string(value: &str, what: &'static str) -> BridgeResult<CString> {
    CString::new(value).map_err(|_| BridgeError::InvalidArgument(what))
}
