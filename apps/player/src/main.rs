mod args;
mod sink;

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use crossbeam_channel::unbounded;
use log::{info, warn};

use mpvbridge_core::loopback::{LoopbackEngine, LoopbackFactory};
use mpvbridge_core::{BridgeConfig, EngineFactory, Format, Instance};
use mpvbridge_libmpv::LibMpvFactory;
use mpvbridge_modules_logging::{ConsoleLogger, ConsoleLoggerConfig};

use args::PlayerArgs;
use sink::{PlayerEvent, PlayerSink};

fn default_config() -> BridgeConfig {
    BridgeConfig::default()
        .with_observed("pause", Format::Flag)
        .with_observed("time-pos", Format::Double)
        .with_observed("duration", Format::Double)
}

fn main() -> Result<(), Box<dyn Error>> {
    ConsoleLogger::new(ConsoleLoggerConfig::from_env()).init()?;

    let args = PlayerArgs::parse();
    let config = match &args.config {
        Some(path) => BridgeConfig::from_json_file(path)?,
        None => default_config(),
    };

    let factory: Arc<dyn EngineFactory> = if args.loopback {
        info!(target: "player", "using loopback engine");
        Arc::new(LoopbackFactory::new(Arc::new(LoopbackEngine::new())))
    } else {
        Arc::new(LibMpvFactory::load(args.library.as_deref())?)
    };

    let (tx, rx) = unbounded();
    let tx_signal = tx.clone();
    ctrlc::set_handler(move || {
        let _ = tx_signal.send(PlayerEvent::Interrupted);
    })?;

    let instance = Instance::builder(factory).with_config(config).create(Arc::new(PlayerSink::new(tx)))?;
    instance.initialize()?;
    instance.command(&["loadfile", args.media.as_str()])?;
    if args.loopback {
        instance.command(&["stop"])?;
    }

    match rx.recv() {
        Ok(PlayerEvent::Finished) => info!(target: "player", "playback finished"),
        Ok(PlayerEvent::Interrupted) => warn!(target: "player", "interrupted"),
        Err(e) => warn!(target: "player", "event channel closed: {e}"),
    }

    instance.teardown();
    Ok(())
}
