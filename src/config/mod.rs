//! Configuration loading.
//!
//! - `types` - settings structure (`Settings` and its sections)
//! - `duration` - "10s"-style duration strings
//! - `parser` - discovery of `stackhub.yaml`, YAML parsing, env overrides
//! - `validation` - settings validation

mod duration;
mod parser;
mod types;
mod validation;

pub use duration::*;
pub use parser::*;
pub use types::*;
