use crossbeam_channel::Sender;
use log::{info, log};
use mpvbridge_core::{CallbackResult, CallbackSink, EventId, LogLevel, PropertyValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Finished,
    Interrupted,
}

/// Logs everything the engine reports and signals the end of playback.
pub struct PlayerSink {
    tx: Sender<PlayerEvent>,
}

impl PlayerSink {
    pub fn new(tx: Sender<PlayerEvent>) -> Self {
        Self { tx }
    }
}

impl CallbackSink for PlayerSink {
    fn on_event(&self, id: EventId) -> CallbackResult {
        info!(target: "player", "event: {id}");
        if id == EventId::END_FILE || id == EventId::SHUTDOWN {
            let _ = self.tx.send(PlayerEvent::Finished);
        }
        Ok(())
    }

    fn on_property(&self, name: &str, value: PropertyValue) -> CallbackResult {
        info!(target: "player", "{name} = {value}");
        Ok(())
    }

    fn on_log_message(&self, prefix: &str, level: LogLevel, text: &str) -> CallbackResult {
        if let Some(level) = level.to_log_level() {
            log!(target: "mpv", level, "[{prefix}] {}", text.trim_end());
        }
        Ok(())
    }
}
