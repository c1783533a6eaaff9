//! # Configuration
//!
//! - `configurator`: process-level settings loaded from environment variables
//! - `unit`: the unit configuration the reconciler acts on (`domain`, `tunnel-token`, `nameserver`)

mod configurator;
mod unit;

pub use configurator::{ConfiguratorConfig, LogFormat, RelationNames};
pub use unit::UnitConfig;
