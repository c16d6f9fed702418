use std::ffi::CStr;
use std::sync::Arc;

use log::{debug, warn};

use super::{Access, Instance, LOG_TARGET};
use crate::engine::{error_name, NativeValue};
use crate::error::{BridgeError, BridgeResult};
use crate::host::RenderTarget;

const TARGET_OPTION: &CStr = c"wid";

impl Instance {
    /// Hands `target` to the engine, replacing and releasing any held one.
    ///
    /// If the engine rejects it, no target is held afterwards. Released
    /// targets are dropped after the instance locks are let go, so their
    /// release hooks may call back into the instance.
    pub fn attach_target(&self, target: Arc<dyn RenderTarget>) -> BridgeResult<()> {
        let mut incoming = Some(target);
        let mut released = None;
        let result = self.with_engine(Access::Live, |engine| {
            let mut slot = self.target.lock();
            released = slot.take();

            let Some(target) = incoming.take() else {
                return Ok(());
            };
            let window = target.native_window();
            let code = engine.set_option(TARGET_OPTION, NativeValue::Int64(window));
            if code < 0 {
                warn!(target: LOG_TARGET, "render target {window:#x} rejected: {} ({code})", error_name(code));
                incoming = Some(target);
                return Err(BridgeError::TargetAttach { code });
            }

            *slot = Some(target);
            debug!(target: LOG_TARGET, "attached render target {window:#x}");
            Ok(())
        });

        if released.take().is_some() {
            debug!(target: LOG_TARGET, "released previous render target");
        }
        drop(incoming);
        result
    }

    /// Clears the engine's target and releases the held reference.
    /// Does nothing harmful when no target is held.
    pub fn detach_target(&self) -> BridgeResult<()> {
        let mut released = None;
        let result = self.with_engine(Access::Live, |engine| {
            let mut slot = self.target.lock();
            let code = engine.set_option(TARGET_OPTION, NativeValue::Int64(0));
            if code < 0 {
                warn!(target: LOG_TARGET, "clearing render target failed: {} ({code})", error_name(code));
            }
            released = slot.take();
            Ok(())
        });

        if released.take().is_some() {
            debug!(target: LOG_TARGET, "detached render target");
        }
        result
    }

    pub fn has_target(&self) -> bool {
        self.target.lock().is_some()
    }
}
