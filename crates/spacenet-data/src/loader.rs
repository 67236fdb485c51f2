//! Loading pipeline: detects the file format, deserializes, and validates.
//!
//! A run directory holds a required `scenario` file and an optional
//! `settings` file, each in RON, TOML, or JSON. Loaded configurations are
//! validated before they reach the simulator.

use serde::de::DeserializeOwned;
use spacenet_core::config::{ConfigError, RunOptions, SimConfig};
use spacenet_core::scenario::{Scenario, ScenarioError};
use spacenet_core::simulator::Simulator;
use std::path::{Path, PathBuf};

use crate::schema::SettingsData;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading configuration or scenario files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The configuration parsed but holds invalid values.
    #[error("invalid configuration in {file}: {source}")]
    InvalidConfig { file: PathBuf, source: ConfigError },

    /// The scenario parsed but is malformed.
    #[error("invalid scenario in {file}: {source}")]
    InvalidScenario { file: PathBuf, source: ScenarioError },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, ConfigLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, ConfigLoadError> {
    let mut found: Option<PathBuf> = None;
    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(ConfigLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }
    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, ConfigLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| ConfigLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Parse `content` in the given format.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<T, ConfigLoadError> {
    let parse_error = |detail: String| ConfigLoadError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Loading
// ===========================================================================

fn validated(config: SimConfig, file: &Path) -> Result<SimConfig, ConfigLoadError> {
    config.validate().map_err(|source| ConfigLoadError::InvalidConfig {
        file: file.to_path_buf(),
        source,
    })
}

/// Load and validate a [`SimConfig`]. Missing fields take their defaults and
/// the aggregation threshold is clamped to [0, 1].
pub fn load_config(path: &Path) -> Result<SimConfig, ConfigLoadError> {
    let config: SimConfig = deserialize_file(path)?;
    let config = validated(config, path)?;
    tracing::debug!(file = %path.display(), "loaded simulation config");
    Ok(config)
}

/// Load and validate a [`Scenario`].
pub fn load_scenario(path: &Path) -> Result<Scenario, ConfigLoadError> {
    let mut scenario: Scenario = deserialize_file(path)?;
    scenario.config = validated(scenario.config, path)?;
    scenario
        .validate()
        .map_err(|source| ConfigLoadError::InvalidScenario {
            file: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(
        file = %path.display(),
        scenario = %scenario.name,
        elements = scenario.elements.len(),
        missions = scenario.missions.len(),
        "loaded scenario"
    );
    Ok(scenario)
}

/// A scenario together with the options to run it under.
#[derive(Debug, Clone)]
pub struct RunSetup {
    pub scenario: Scenario,
    pub options: RunOptions,
}

impl RunSetup {
    /// A simulator for this setup.
    pub fn simulator(&self) -> Simulator {
        Simulator::new(self.scenario.clone()).with_options(self.options)
    }
}

/// Load a run directory: the required `scenario` file and the optional
/// `settings` file. A config in the settings file replaces the scenario's.
pub fn load_run(dir: &Path) -> Result<RunSetup, ConfigLoadError> {
    let scenario_path = require_data_file(dir, "scenario")?;
    let mut scenario = load_scenario(&scenario_path)?;

    let settings = match find_data_file(dir, "settings")? {
        Some(path) => {
            let data: SettingsData = deserialize_file(&path)?;
            if let Some(config) = data.config.clone() {
                scenario.config = validated(config, &path)?;
            }
            data
        }
        None => SettingsData::default(),
    };

    tracing::info!(
        dir = %dir.display(),
        scenario = %scenario.name,
        "run directory loaded"
    );
    Ok(RunSetup {
        scenario,
        options: settings.options,
    })
}
