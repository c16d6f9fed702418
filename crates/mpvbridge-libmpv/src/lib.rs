//! libmpv backend.
//!
//! The shared library is opened at runtime, so nothing links against
//! libmpv at build time. [`LibMpvFactory::load`] resolves the client API
//! once and every engine it creates shares that symbol table.

mod api;
mod engine;
mod error;
mod ffi;

pub use api::{MpvApi, DEFAULT_LIBRARY_NAMES};
pub use engine::{LibMpvFactory, MpvEngine};
pub use error::LoadError;
