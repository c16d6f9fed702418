use std::io::Write;

use env_logger::{Builder, WriteStyle};
use log::LevelFilter;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("logger init failed: {0}")]
    Init(#[from] log::SetLoggerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLoggerConfig {
    pub level: LevelFilter,
    pub colors: bool,
    pub include_module: bool,
}

impl ConsoleLoggerConfig {
    /// Reads `MPVBRIDGE_LOG`, `MPVBRIDGE_LOG_COLORS` and `MPVBRIDGE_LOG_MODULE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let level = lookup("MPVBRIDGE_LOG")
            .and_then(|v| v.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info);
        let colors = lookup("MPVBRIDGE_LOG_COLORS").map(|v| v != "0").unwrap_or(true);
        let include_module = lookup("MPVBRIDGE_LOG_MODULE").map(|v| v != "0").unwrap_or(true);

        Self { level, colors, include_module }
    }
}

impl Default for ConsoleLoggerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

pub struct ConsoleLogger {
    config: ConsoleLoggerConfig,
    initialized: bool,
}

impl ConsoleLogger {
    #[inline]
    pub fn new(config: ConsoleLoggerConfig) -> Self {
        Self { config, initialized: false }
    }

    #[inline]
    pub fn config(&self) -> &ConsoleLoggerConfig {
        &self.config
    }

    /// Installs the global logger. Later calls on the same value are no-ops.
    pub fn init(&mut self) -> Result<(), LoggerError> {
        if self.initialized {
            return Ok(());
        }

        let mut builder = Builder::new();
        builder.filter_level(self.config.level);
        builder.write_style(if self.config.colors { WriteStyle::Auto } else { WriteStyle::Never });

        let include_module = self.config.include_module;
        builder.format(move |buf, record| {
            let style = buf.default_level_style(record.level());
            if include_module {
                writeln!(
                    buf,
                    "[{style}{:<5}{style:#}] {:<25} {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            } else {
                writeln!(buf, "[{style}{:<5}{style:#}] {}", record.level(), record.args())
            }
        });

        builder.try_init()?;

        self.initialized = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let cfg = ConsoleLoggerConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, ConsoleLoggerConfig { level: LevelFilter::Info, colors: true, include_module: true });
    }

    #[test]
    fn variables_override_defaults() {
        let cfg = ConsoleLoggerConfig::from_lookup(lookup(&[
            ("MPVBRIDGE_LOG", "trace"),
            ("MPVBRIDGE_LOG_COLORS", "0"),
            ("MPVBRIDGE_LOG_MODULE", "0"),
        ]));
        assert_eq!(cfg.level, LevelFilter::Trace);
        assert!(!cfg.colors);
        assert!(!cfg.include_module);
    }

    #[test]
    fn unparsable_level_falls_back_to_info() {
        let cfg = ConsoleLoggerConfig::from_lookup(lookup(&[("MPVBRIDGE_LOG", "loud")]));
        assert_eq!(cfg.level, LevelFilter::Info);
    }

    #[test]
    fn second_init_is_a_noop() {
        let mut logger = ConsoleLogger::new(ConsoleLoggerConfig::from_lookup(lookup(&[("MPVBRIDGE_LOG", "off")])));
        logger.init().unwrap();
        logger.init().unwrap();
        log::info!(target: "mpvbridge::test", "not printed");
    }
}
