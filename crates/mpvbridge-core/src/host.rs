//! Host-side collaborators: the callback sink, render targets and the
//! runtime the dispatch thread attaches to.

use std::sync::Arc;

use thiserror::Error;

use crate::engine::{EventId, LogLevel};
use crate::value::PropertyValue;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CallbackError(String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type CallbackResult = Result<(), CallbackError>;

/// Receives engine output on the dispatch thread.
///
/// Errors and panics are logged and absorbed by the dispatch thread.
/// Implementations may call back into the owning instance, including
/// `teardown`.
pub trait CallbackSink: Send + Sync {
    fn on_event(&self, id: EventId) -> CallbackResult;

    fn on_property(&self, name: &str, value: PropertyValue) -> CallbackResult;

    fn on_log_message(&self, prefix: &str, level: LogLevel, text: &str) -> CallbackResult;
}

pub type CallbackSinkRef = Arc<dyn CallbackSink>;

/// A render destination the engine draws into.
pub trait RenderTarget: Send + Sync {
    /// Native window id passed to the engine's `wid` option.
    fn native_window(&self) -> i64;
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to attach thread '{thread}' to host runtime: {message}")]
    Attach { thread: String, message: String },

    #[error("failed to register host runtime with engine: {0}")]
    Register(String),
}

/// Host runtime hooks.
///
/// Hosts with a managed runtime (a VM, a scripting engine) register threads
/// with it before they may run host callbacks.
pub trait HostRuntime: Send + Sync {
    fn attach_current_thread(&self, _thread_name: &str) -> Result<(), HostError> {
        Ok(())
    }

    fn detach_current_thread(&self) {}

    /// One-time hand-off of the host runtime to the engine.
    fn register_with_engine(&self) -> Result<(), HostError> {
        Ok(())
    }
}

/// Host without a managed runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHostRuntime;

impl HostRuntime for NullHostRuntime {}

/// Keeps the current thread attached to the host runtime until dropped.
pub(crate) struct HostAttachment<'a> {
    host: &'a dyn HostRuntime,
}

impl<'a> HostAttachment<'a> {
    pub(crate) fn attach(host: &'a dyn HostRuntime, thread_name: &str) -> Result<Self, HostError> {
        host.attach_current_thread(thread_name)?;
        Ok(Self { host })
    }
}

impl Drop for HostAttachment<'_> {
    fn drop(&mut self) {
        self.host.detach_current_thread();
    }
}
