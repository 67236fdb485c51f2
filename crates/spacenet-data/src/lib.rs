//! File-based loading of SpaceNet configuration and scenarios.
//!
//! Data files may be RON, TOML, or JSON; the format is chosen by extension.

pub mod loader;
pub mod schema;

pub use loader::{ConfigLoadError, RunSetup, load_config, load_run, load_scenario};
