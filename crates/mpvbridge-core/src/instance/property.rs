use log::debug;

use super::{c_string, Access, Instance, LOG_TARGET};
use crate::engine::{code, error_name, NativeReply, NativeValue};
use crate::error::{BridgeError, BridgeResult};
use crate::value::{flag_from_native, flag_to_native, Format};

impl Instance {
    pub fn get_int(&self, name: &str) -> BridgeResult<i64> {
        match self.read_property(name, Format::Int64)? {
            NativeReply::Int64(v) => Ok(v),
            _ => Err(format_mismatch(name)),
        }
    }

    pub fn get_double(&self, name: &str) -> BridgeResult<f64> {
        match self.read_property(name, Format::Double)? {
            NativeReply::Double(v) => Ok(v),
            _ => Err(format_mismatch(name)),
        }
    }

    pub fn get_bool(&self, name: &str) -> BridgeResult<bool> {
        match self.read_property(name, Format::Flag)? {
            NativeReply::Flag(v) => Ok(flag_from_native(v)),
            _ => Err(format_mismatch(name)),
        }
    }

    /// Reads a property as text. The engine's buffer is copied and freed
    /// before this returns.
    pub fn get_string(&self, name: &str) -> BridgeResult<String> {
        match self.read_property(name, Format::String)? {
            NativeReply::String(buffer) => Ok(buffer.to_string_lossy()),
            _ => Err(format_mismatch(name)),
        }
    }

    pub fn set_int(&self, name: &str, value: i64) -> BridgeResult<()> {
        self.write_property(name, NativeValue::Int64(value))
    }

    pub fn set_double(&self, name: &str, value: f64) -> BridgeResult<()> {
        self.write_property(name, NativeValue::Double(value))
    }

    pub fn set_bool(&self, name: &str, value: bool) -> BridgeResult<()> {
        self.write_property(name, NativeValue::Flag(flag_to_native(value)))
    }

    pub fn set_string(&self, name: &str, value: &str) -> BridgeResult<()> {
        let value = c_string(value, "property value")?;
        self.write_property(name, NativeValue::String(&value))
    }

    /// Subscribes to change notifications, delivered through the sink's
    /// `on_property` on the dispatch thread.
    ///
    /// The engine decides whether an initial notification is sent.
    pub fn observe(&self, name: &str, format: Format) -> BridgeResult<()> {
        let c_name = c_string(name, "property name")?;
        self.with_engine(Access::Running, |engine| {
            let code = engine.observe_property(0, &c_name, format);
            if code < 0 {
                return Err(BridgeError::Observe { name: name.to_owned(), code });
            }
            debug!(target: LOG_TARGET, "observing '{name}' as {format:?}");
            Ok(())
        })
    }

    fn read_property(&self, name: &str, format: Format) -> BridgeResult<NativeReply> {
        let c_name = c_string(name, "property name")?;
        self.with_engine(Access::Running, |engine| {
            engine.get_property(&c_name, format).map_err(|code| {
                debug!(target: LOG_TARGET, "get '{name}' as {format:?}: {} ({code})", error_name(code));
                BridgeError::PropertyRead { name: name.to_owned(), code }
            })
        })
    }

    fn write_property(&self, name: &str, value: NativeValue<'_>) -> BridgeResult<()> {
        let c_name = c_string(name, "property name")?;
        self.with_engine(Access::Running, |engine| {
            let code = engine.set_property(&c_name, value);
            if code < 0 {
                debug!(target: LOG_TARGET, "set '{name}': {} ({code})", error_name(code));
                return Err(BridgeError::PropertyWrite { name: name.to_owned(), code });
            }
            Ok(())
        })
    }
}

fn format_mismatch(name: &str) -> BridgeError {
    BridgeError::PropertyRead { name: name.to_owned(), code: code::PROPERTY_FORMAT }
}
