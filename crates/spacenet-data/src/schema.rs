//! Serde data file structs for run settings.
//!
//! A settings file pairs the scenario-wide [`SimConfig`] with the per-run
//! [`RunOptions`]. Both sections are optional and default when absent.

use serde::Deserialize;
use spacenet_core::config::{RunOptions, SimConfig};

// ===========================================================================
// Settings
// ===========================================================================

/// On-disk form of `settings.{ron,toml,json}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsData {
    /// Replaces the configuration stored in the scenario file when present.
    pub config: Option<SimConfig>,
    pub options: RunOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacenet_core::config::ItemDiscretization;

    #[test]
    fn empty_settings_default() {
        let settings: SettingsData = ron::from_str("()").unwrap();
        assert!(settings.config.is_none());
        assert_eq!(settings.options, RunOptions::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let settings: SettingsData = toml::from_str(
            r#"
            [config]
            item_discretization = "ByLocation"
            item_aggregation = 0.5

            [options]
            items_repaired = true
            "#,
        )
        .unwrap();
        let config = settings.config.unwrap();
        assert_eq!(config.item_discretization, ItemDiscretization::ByLocation);
        assert_eq!(config.item_aggregation, 0.5);
        assert_eq!(config.time_precision, SimConfig::default().time_precision);
        assert!(settings.options.items_repaired);
        assert!(settings.options.demands_satisfied);
    }

    #[test]
    fn json_options_only() {
        let settings: SettingsData =
            serde_json::from_str(r#"{ "options": { "demands_satisfied": false } }"#).unwrap();
        assert!(settings.config.is_none());
        assert!(!settings.options.demands_satisfied);
    }
}
