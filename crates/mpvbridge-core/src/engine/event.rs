use std::ffi::{c_int, CString};
use std::fmt;

/// Numeric engine event identifier.
///
/// Kept as an open newtype: engines may emit ids this table does not know,
/// and those are still forwarded to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub i32);

impl EventId {
    pub const NONE: Self = Self(0);
    pub const SHUTDOWN: Self = Self(1);
    pub const LOG_MESSAGE: Self = Self(2);
    pub const GET_PROPERTY_REPLY: Self = Self(3);
    pub const SET_PROPERTY_REPLY: Self = Self(4);
    pub const COMMAND_REPLY: Self = Self(5);
    pub const START_FILE: Self = Self(6);
    pub const END_FILE: Self = Self(7);
    pub const FILE_LOADED: Self = Self(8);
    pub const CLIENT_MESSAGE: Self = Self(16);
    pub const VIDEO_RECONFIG: Self = Self(17);
    pub const AUDIO_RECONFIG: Self = Self(18);
    pub const SEEK: Self = Self(20);
    pub const PLAYBACK_RESTART: Self = Self(21);
    pub const PROPERTY_CHANGE: Self = Self(22);
    pub const QUEUE_OVERFLOW: Self = Self(24);
    pub const HOOK: Self = Self(25);

    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::NONE => "none",
            Self::SHUTDOWN => "shutdown",
            Self::LOG_MESSAGE => "log-message",
            Self::GET_PROPERTY_REPLY => "get-property-reply",
            Self::SET_PROPERTY_REPLY => "set-property-reply",
            Self::COMMAND_REPLY => "command-reply",
            Self::START_FILE => "start-file",
            Self::END_FILE => "end-file",
            Self::FILE_LOADED => "file-loaded",
            Self::CLIENT_MESSAGE => "client-message",
            Self::VIDEO_RECONFIG => "video-reconfig",
            Self::AUDIO_RECONFIG => "audio-reconfig",
            Self::SEEK => "seek",
            Self::PLAYBACK_RESTART => "playback-restart",
            Self::PROPERTY_CHANGE => "property-change",
            Self::QUEUE_OVERFLOW => "event-queue-overflow",
            Self::HOOK => "hook",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "event#{}", self.0),
        }
    }
}

/// Engine log severity, smaller is more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogLevel(pub i32);

impl LogLevel {
    pub const NONE: Self = Self(0);
    pub const FATAL: Self = Self(10);
    pub const ERROR: Self = Self(20);
    pub const WARN: Self = Self(30);
    pub const INFO: Self = Self(40);
    pub const V: Self = Self(50);
    pub const DEBUG: Self = Self(60);
    pub const TRACE: Self = Self(70);

    /// Parses the engine's textual level names ("fatal", "v", ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "no" => Self::NONE,
            "fatal" => Self::FATAL,
            "error" => Self::ERROR,
            "warn" => Self::WARN,
            "info" => Self::INFO,
            "v" => Self::V,
            "debug" => Self::DEBUG,
            "trace" => Self::TRACE,
            _ => return None,
        })
    }

    /// Closest `log` crate level; `None` for the "no output" level.
    pub fn to_log_level(self) -> Option<log::Level> {
        match self.0 {
            i32::MIN..=0 => None,
            1..=20 => Some(log::Level::Error),
            21..=30 => Some(log::Level::Warn),
            31..=40 => Some(log::Level::Info),
            41..=60 => Some(log::Level::Debug),
            _ => Some(log::Level::Trace),
        }
    }
}

/// Payload of a property-change event as the engine declared it.
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    None,
    Flag(c_int),
    Int64(i64),
    Double(f64),
    String(CString),
    /// Any format tag the marshaler cannot express; carries the raw tag.
    Unsupported(c_int),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    pub prefix: String,
    pub level: LogLevel,
    /// Raw bytes; validated before reaching the sink.
    pub text: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub name: String,
    pub reply_id: u64,
    pub value: EventValue,
}

/// One event taken off the engine queue, copied out of engine memory.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    None,
    LogMessage(LogMessage),
    PropertyChange(PropertyChange),
    Other(EventId),
}

impl EngineEvent {
    pub fn id(&self) -> EventId {
        match self {
            EngineEvent::None => EventId::NONE,
            EngineEvent::LogMessage(_) => EventId::LOG_MESSAGE,
            EngineEvent::PropertyChange(_) => EventId::PROPERTY_CHANGE,
            EngineEvent::Other(id) => *id,
        }
    }
}
