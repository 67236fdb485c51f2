//! Simulation configuration.
//!
//! Precisions and scenario-wide switches are carried in an explicit
//! [`SimConfig`] value that is threaded through every operation that rounds
//! or checks constraints. Per-run behavior toggles live in [`RunOptions`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be positive and finite, got {value}")]
    InvalidPrecision { field: &'static str, value: f64 },
    #[error("item aggregation must be finite, got {0}")]
    InvalidAggregation(f64),
}

// ---------------------------------------------------------------------------
// Item discretization policy
// ---------------------------------------------------------------------------

/// Scope over which fractional item demands are accumulated before being
/// rounded into whole units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemDiscretization {
    /// Item demands stay fractional.
    #[default]
    None,
    /// One accumulator per (element, item).
    ByElement,
    /// One accumulator per (location, item).
    ByLocation,
    /// One accumulator per item for the whole scenario.
    ByScenario,
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Scenario-wide numeric precisions and constraint switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Time resolution in days.
    pub time_precision: f64,
    /// Demand amount resolution in units.
    pub demand_precision: f64,
    /// Mass resolution in kilograms.
    pub mass_precision: f64,
    /// Volume resolution in cubic meters.
    pub volume_precision: f64,
    /// Whether carriers and containers enforce volume limits.
    pub volume_constrained: bool,
    /// Whether pressurized cargo is refused by unpressurized carriers.
    pub environment_constrained: bool,
    pub item_discretization: ItemDiscretization,
    /// Threshold `t` in [0, 1] at which an accrued fraction becomes a unit.
    pub item_aggregation: f64,
    /// Whether decommissioned elements donate their parts.
    pub scavenge_spares: bool,
    /// Whether EVAs are simulated as individual crew moves.
    pub detailed_eva: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            time_precision: 0.05,
            demand_precision: 0.01,
            mass_precision: 0.01,
            volume_precision: 1.0e-6,
            volume_constrained: false,
            environment_constrained: true,
            item_discretization: ItemDiscretization::None,
            item_aggregation: 0.0,
            scavenge_spares: false,
            detailed_eva: false,
        }
    }
}

impl SimConfig {
    /// Set the discretization policy and threshold, clamping the threshold
    /// into [0, 1].
    pub fn with_discretization(mut self, policy: ItemDiscretization, threshold: f64) -> Self {
        self.item_discretization = policy;
        self.item_aggregation = threshold.clamp(0.0, 1.0);
        self
    }

    /// Check precisions and normalize the aggregation threshold.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        for (field, value) in [
            ("time_precision", self.time_precision),
            ("demand_precision", self.demand_precision),
            ("mass_precision", self.mass_precision),
            ("volume_precision", self.volume_precision),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidPrecision { field, value });
            }
        }
        if !self.item_aggregation.is_finite() {
            return Err(ConfigError::InvalidAggregation(self.item_aggregation));
        }
        self.item_aggregation = self.item_aggregation.clamp(0.0, 1.0);
        Ok(self)
    }

    /// Round a time to the time precision, then to three decimals.
    pub fn round_time(&self, time: f64) -> f64 {
        (round_to(time, self.time_precision) * 1000.0).round() / 1000.0
    }

    pub fn round_demand(&self, amount: f64) -> f64 {
        round_to(amount, self.demand_precision)
    }

    pub fn round_mass(&self, mass: f64) -> f64 {
        round_to(mass, self.mass_precision)
    }

    pub fn round_volume(&self, volume: f64) -> f64 {
        round_to(volume, self.volume_precision)
    }
}

fn round_to(value: f64, precision: f64) -> f64 {
    if precision > 0.0 && value.is_finite() {
        (value / precision).round() * precision
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// RunOptions
// ---------------------------------------------------------------------------

/// Behavior toggles of a single simulator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Whether demand events draw on inventory. When off, every demand is
    /// reported as unmet.
    pub demands_satisfied: bool,
    /// Whether unmet demand is grossed up with a generic packaging demand.
    pub packing_demands_added: bool,
    /// Whether outstanding item demand may be covered by in-mission repair.
    pub items_repaired: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            demands_satisfied: true,
            packing_demands_added: false,
            items_repaired: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_catalogue_precisions() {
        let config = SimConfig::default();
        assert_eq!(config.time_precision, 0.05);
        assert_eq!(config.demand_precision, 0.01);
        assert!(config.environment_constrained);
        assert!(!config.volume_constrained);
        assert_eq!(config.item_discretization, ItemDiscretization::None);
    }

    #[test]
    fn round_time_snaps_to_precision() {
        let config = SimConfig::default();
        assert_eq!(config.round_time(1.02), 1.0);
        assert_eq!(config.round_time(1.03), 1.05);
        assert_eq!(config.round_time(10.0), 10.0);
    }

    #[test]
    fn round_mass_to_hundredths() {
        let config = SimConfig::default();
        assert!((config.round_mass(83.5249) - 83.52).abs() < 1e-9);
    }

    #[test]
    fn aggregation_is_clamped() {
        let config = SimConfig::default().with_discretization(ItemDiscretization::ByElement, 1.7);
        assert_eq!(config.item_aggregation, 1.0);
        let config = SimConfig {
            item_aggregation: -0.5,
            ..SimConfig::default()
        }
        .validate()
        .unwrap();
        assert_eq!(config.item_aggregation, 0.0);
    }

    #[test]
    fn zero_precision_is_rejected() {
        let result = SimConfig {
            mass_precision: 0.0,
            ..SimConfig::default()
        }
        .validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidPrecision {
                field: "mass_precision",
                ..
            })
        ));
    }

    #[test]
    fn run_options_default_satisfies_without_packing_or_repair() {
        let options = RunOptions::default();
        assert!(options.demands_satisfied);
        assert!(!options.packing_demands_added);
        assert!(!options.items_repaired);
    }
}
