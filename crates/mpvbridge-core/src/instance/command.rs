use std::ffi::{CStr, CString};

use log::{debug, trace};

use super::{c_string, Access, Instance, LOG_TARGET};
use crate::engine::error_name;
use crate::error::{ArgumentFault, BridgeError, BridgeResult};

impl Instance {
    /// Runs an engine command such as `["loadfile", "clip.mkv"]`.
    pub fn command<S: AsRef<str>>(&self, args: &[S]) -> BridgeResult<()> {
        let argv = command_argv(args, self.config.effective_max_command_args())?;
        let refs: Vec<&CStr> = argv.iter().map(CString::as_c_str).collect();
        self.with_engine(Access::Live, |engine| {
            let code = engine.command(&refs);
            if code < 0 {
                debug!(target: LOG_TARGET, "command {:?} failed: {} ({code})", args[0].as_ref(), error_name(code));
                return Err(BridgeError::Command { code });
            }
            trace!(target: LOG_TARGET, "command {:?} ok", args[0].as_ref());
            Ok(())
        })
    }

    /// Sets an engine option from text and returns the engine's status code.
    pub fn set_option(&self, name: &str, value: &str) -> BridgeResult<i32> {
        let c_name = c_string(name, "option name")?;
        let c_value = c_string(value, "option value")?;
        self.with_engine(Access::Live, |engine| Ok(engine.set_option_string(&c_name, &c_value)))
    }
}

/// Converts `args` to C strings, all or nothing.
fn command_argv<S: AsRef<str>>(args: &[S], max: usize) -> BridgeResult<Vec<CString>> {
    if args.is_empty() {
        return Err(BridgeError::InvalidArgument("empty command"));
    }
    if args.len() > max {
        return Err(ArgumentFault::TooMany { count: args.len(), max }.into());
    }

    let mut argv = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        match CString::new(arg.as_ref()) {
            Ok(arg) => argv.push(arg),
            Err(_) => return Err(ArgumentFault::InteriorNul { index }.into()),
        }
    }
    Ok(argv)
}
