//! Bridge between a host runtime and a native media engine instance.
//!
//! An [`Instance`] owns one engine handle, a host callback sink and the
//! dispatch thread that pumps engine events back to that sink. Property,
//! command and render-target calls may run concurrently from any host thread;
//! [`Instance::teardown`] fences all of them before the handle is released.

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod instance;
pub mod loopback;
pub mod value;

mod dispatch;
mod environment;

pub use config::{BridgeConfig, ConfigError, ObservedProperty, MAX_COMMAND_ARGS};
pub use engine::{
    EngineEvent, EngineFactory, EngineString, EventId, EventValue, LogLevel, LogMessage,
    NativeEngine, NativeEngineRef, NativeReply, NativeValue, PropertyChange,
};
pub use error::{ArgumentFault, BridgeError, BridgeResult, TeardownOutcome};
pub use host::{
    CallbackError, CallbackResult, CallbackSink, CallbackSinkRef, HostError, HostRuntime, NullHostRuntime, RenderTarget,
};
pub use instance::{Instance, InstanceBuilder, LifecycleState};
pub use value::{Format, PropertyValue, UnsupportedFormat};
