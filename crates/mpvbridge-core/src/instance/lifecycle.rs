use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};

use super::{Core, Instance, LifecycleState, LOG_TARGET};
use crate::config::BridgeConfig;
use crate::dispatch::{self, DispatchContext};
use crate::engine::{error_name, EngineFactory};
use crate::environment;
use crate::error::{BridgeError, BridgeResult, TeardownOutcome};
use crate::host::{CallbackSinkRef, HostRuntime, NullHostRuntime};

pub struct InstanceBuilder {
    factory: Arc<dyn EngineFactory>,
    host: Arc<dyn HostRuntime>,
    config: BridgeConfig,
}

impl InstanceBuilder {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self { factory, host: Arc::new(NullHostRuntime), config: BridgeConfig::default() }
    }

    pub fn with_host(mut self, host: Arc<dyn HostRuntime>) -> Self {
        self.host = host;
        self
    }

    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Allocates the engine handle and binds `sink` to it.
    ///
    /// On failure the sink reference is released before returning.
    pub fn create(self, sink: CallbackSinkRef) -> BridgeResult<Instance> {
        let Some(engine) = self.factory.create() else {
            drop(sink);
            error!(target: LOG_TARGET, "engine create failed");
            return Err(BridgeError::EngineCreate);
        };

        match CString::new(self.config.engine_log_level.as_str()) {
            Ok(level) => {
                let code = engine.request_log_messages(&level);
                if code < 0 {
                    warn!(
                        target: LOG_TARGET,
                        "engine refused log level '{}': {} ({code})",
                        self.config.engine_log_level,
                        error_name(code)
                    );
                }
            }
            Err(_) => warn!(target: LOG_TARGET, "ignoring engine log level with interior NUL"),
        }

        let instance = Instance {
            config: self.config,
            host: self.host,
            exit: Arc::new(AtomicBool::new(false)),
            core: RwLock::new(Core {
                state: LifecycleState::Created,
                engine: Some(engine),
                engine_started: false,
                environment_prepared: false,
            }),
            sink: Mutex::new(Some(sink)),
            target: Mutex::new(None),
            dispatch: Mutex::new(None),
        };

        for (name, value) in &instance.config.options {
            match instance.set_option(name, value) {
                Ok(code) if code < 0 => {
                    warn!(target: LOG_TARGET, "option {name}={value} rejected: {} ({code})", error_name(code))
                }
                Ok(_) => {}
                Err(e) => warn!(target: LOG_TARGET, "option {name}={value} not applied: {e}"),
            }
        }

        info!(target: LOG_TARGET, "engine instance created");
        Ok(instance)
    }
}

impl Instance {
    pub fn builder(factory: Arc<dyn EngineFactory>) -> InstanceBuilder {
        InstanceBuilder::new(factory)
    }

    /// Creates an instance with the default config and no host runtime.
    pub fn create(factory: Arc<dyn EngineFactory>, sink: CallbackSinkRef) -> BridgeResult<Self> {
        InstanceBuilder::new(factory).create(sink)
    }

    /// Starts the engine and the dispatch thread.
    ///
    /// If the engine refuses to start, the instance stays `Created` and keeps
    /// its handle; `teardown` still releases it. If only the thread spawn
    /// fails, a later call retries just the spawn.
    pub fn initialize(&self) -> BridgeResult<()> {
        if self.exit_requested() {
            return Err(BridgeError::EngineNotInitialized);
        }

        let mut core = self.core.write();
        match core.state {
            LifecycleState::Created => {}
            LifecycleState::TearingDown | LifecycleState::Destroyed => return Err(BridgeError::EngineNotInitialized),
            state => return Err(BridgeError::InvalidState(state)),
        }
        let engine = core.engine.clone().ok_or(BridgeError::EngineNotInitialized)?;

        if !core.environment_prepared {
            self.prepare_environment();
            core.environment_prepared = true;
        }

        if !core.engine_started {
            let code = engine.initialize();
            if code < 0 {
                error!(target: LOG_TARGET, "engine initialize failed: {} ({code})", error_name(code));
                return Err(BridgeError::EngineInit { code });
            }
            core.engine_started = true;
        }

        let sink = self.sink.lock().as_ref().map(Arc::downgrade).ok_or(BridgeError::EngineNotInitialized)?;
        let ctx = DispatchContext { engine, sink, host: self.host.clone(), exit: self.exit.clone() };
        let handle = dispatch::spawn(ctx, &self.config.dispatch_thread_name, self.config.dispatch_stack_size)
            .map_err(|e| {
                error!(target: LOG_TARGET, "failed to spawn dispatch thread: {e}");
                BridgeError::ThreadSpawn(e)
            })?;
        *self.dispatch.lock() = Some(handle);
        core.state = LifecycleState::Running;
        drop(core);

        for property in &self.config.observe {
            if let Err(e) = self.observe(&property.name, property.format) {
                warn!(target: LOG_TARGET, "{e}");
            }
        }

        info!(target: LOG_TARGET, "engine instance running");
        Ok(())
    }

    fn prepare_environment(&self) {
        if self.config.normalize_numeric_locale {
            environment::normalize_numeric_locale();
        }
        if let Err(e) = self.host.register_with_engine() {
            warn!(target: LOG_TARGET, "{e}");
        }
    }

    /// Stops the dispatch thread and releases target, sink and handle.
    ///
    /// Safe to call repeatedly and from any thread, including from inside a
    /// sink callback on the dispatch thread (the thread is then detached
    /// rather than joined).
    pub fn teardown(&self) -> TeardownOutcome {
        let engine = {
            let mut core = self.core.write();
            match core.state {
                LifecycleState::TearingDown | LifecycleState::Destroyed => return TeardownOutcome::Noop,
                LifecycleState::Created | LifecycleState::Running => {}
            }
            core.state = LifecycleState::TearingDown;
            self.exit.store(true, Ordering::Release);
            core.engine.clone()
        };

        debug!(target: LOG_TARGET, "tearing down engine instance");

        if let Some(engine) = &engine {
            engine.wakeup();
        }
        drop(engine);

        if let Some(handle) = self.dispatch.lock().take() {
            if handle.thread().id() == thread::current().id() {
                debug!(target: LOG_TARGET, "teardown on dispatch thread, not joining");
            } else if handle.join().is_err() {
                error!(target: LOG_TARGET, "dispatch thread panicked");
            }
        }

        // Taken under the write lock so no in-flight operation can still be
        // using them; released outside it so release hooks may query the instance.
        let (target, sink, engine) = {
            let mut core = self.core.write();
            (self.target.lock().take(), self.sink.lock().take(), core.engine.take())
        };
        drop(target);
        drop(sink);
        if let Some(engine) = engine {
            engine.terminate_destroy();
        }
        self.core.write().state = LifecycleState::Destroyed;

        info!(target: LOG_TARGET, "engine instance destroyed");
        TeardownOutcome::Completed
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        if self.teardown() == TeardownOutcome::Completed {
            debug!(target: LOG_TARGET, "instance dropped without explicit teardown");
        }
    }
}
