use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("libmpv not found (tried {})", tried.join(", "))]
    NotFound { tried: Vec<String> },

    #[error("failed to open {}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    #[error("symbol `{symbol}` missing from {}: {message}", path.display())]
    Symbol { path: PathBuf, symbol: &'static str, message: String },

    #[error("libmpv client API {found:#x} is older than the required {required:#x}")]
    Version { found: u64, required: u64 },
}
