//! Simulation logs.
//!
//! Simulated failures are values: executing an event yields
//! `Result<(), SimError>`, and the simulator appends the error to the
//! [`SimLog`] and carries on. Nothing in this module aborts a run.
//!
//! Records are appended in execution order, which is already ascending in
//! time. Sorted accessors use a stable sort, so records at equal times keep
//! their execution order.

use crate::cos::ClassOfSupply;
use crate::demand::{Demand, DemandSet};
use crate::event::EventType;
use crate::id::{ElementId, MissionId};
use crate::network::Location;
use crate::resource::Resource;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Unmet demand: the residual left after drawing on inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimDemand {
    pub time: f64,
    /// Name of the event that raised the demand.
    pub event: String,
    pub location: Option<Location>,
    /// Demanding element, `None` for mission-level demand.
    pub element: Option<ElementId>,
    pub demands: DemandSet,
}

/// An element was not where or when an event needed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSpatialError {
    pub time: f64,
    pub event: String,
    pub event_type: EventType,
    pub message: String,
}

/// A failure raised while executing an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum SimError {
    #[error("unmet demand at {:.3}: {}", .0.time, .0.demands)]
    Demand(SimDemand),
    #[error("spatial error at {:.3} in {}: {}", .0.time, .0.event, .0.message)]
    Spatial(SimSpatialError),
}

impl SimError {
    pub fn time(&self) -> f64 {
        match self {
            SimError::Demand(d) => d.time,
            SimError::Spatial(s) => s.time,
        }
    }
}

/// Advisory record. Never affects the outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimWarning {
    pub time: f64,
    pub event: String,
    pub message: String,
}

/// Item demand covered by in-mission repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimRepair {
    pub time: f64,
    pub item: Resource,
    pub amount: f64,
    pub crew_hours: f64,
    pub repair_mass: f64,
    pub location: Option<Location>,
    pub element: ElementId,
    /// Mission whose repair list covered the demand.
    pub mission: MissionId,
}

/// Item demand covered by parts of a decommissioned element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimScavenge {
    pub time: f64,
    pub item: Resource,
    pub amount: f64,
    pub location: Option<Location>,
    pub element: ElementId,
}

// ---------------------------------------------------------------------------
// SimLog
// ---------------------------------------------------------------------------

/// Everything a run records about failures and substitutions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimLog {
    pub unsatisfied_demands: Vec<SimDemand>,
    pub spatial_errors: Vec<SimSpatialError>,
    pub warnings: Vec<SimWarning>,
    pub repairs: Vec<SimRepair>,
    pub scavenges: Vec<SimScavenge>,
}

fn matches_cos(demand: &Demand, cos: Option<ClassOfSupply>) -> bool {
    cos.is_none_or(|cos| demand.resource.cos.is_instance_of(cos))
}

fn sorted_by_time<T: Clone>(records: &[T], time: impl Fn(&T) -> f64) -> Vec<T> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| time(a).total_cmp(&time(b)));
    sorted
}

impl SimLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.unsatisfied_demands.clear();
        self.spatial_errors.clear();
        self.warnings.clear();
        self.repairs.clear();
        self.scavenges.clear();
    }

    /// Append an execution failure to its list.
    pub fn record(&mut self, error: SimError) {
        tracing::warn!(%error, "simulation error");
        match error {
            SimError::Demand(demand) => self.unsatisfied_demands.push(demand),
            SimError::Spatial(spatial) => self.spatial_errors.push(spatial),
        }
    }

    pub fn warn(&mut self, time: f64, event: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(time, event, %message, "simulation warning");
        self.warnings.push(SimWarning {
            time,
            event: event.to_string(),
            message,
        });
    }

    /// Whether the plan was fully supplied and spatially consistent.
    pub fn is_clean(&self) -> bool {
        self.unsatisfied_demands.is_empty() && self.spatial_errors.is_empty()
    }

    // -- Ordered retrieval ---------------------------------------------------

    /// Unmet demand ascending by time; equal times keep execution order.
    pub fn demands_by_time(&self) -> Vec<SimDemand> {
        sorted_by_time(&self.unsatisfied_demands, |d| d.time)
    }

    /// Spatial errors ascending by time; equal times keep execution order.
    pub fn spatial_errors_by_time(&self) -> Vec<SimSpatialError> {
        sorted_by_time(&self.spatial_errors, |s| s.time)
    }

    // -- Demand history ------------------------------------------------------

    pub fn demand_history_for_element(&self, element: ElementId) -> Vec<&SimDemand> {
        self.unsatisfied_demands
            .iter()
            .filter(|d| d.element == Some(element))
            .collect()
    }

    /// Unmet demand raised in the window `(start, end]`.
    pub fn demand_history_in_window(&self, start: f64, end: f64) -> Vec<&SimDemand> {
        self.unsatisfied_demands
            .iter()
            .filter(|d| d.time > start && d.time <= end)
            .collect()
    }

    pub fn demand_history_at(&self, location: Location) -> Vec<&SimDemand> {
        self.unsatisfied_demands
            .iter()
            .filter(|d| d.location == Some(location))
            .collect()
    }

    // -- Totals --------------------------------------------------------------

    /// Unmet demand in `(start, end]`, optionally restricted to a class of
    /// supply and its subclasses.
    pub fn total_in_window(&self, start: f64, end: f64, cos: Option<ClassOfSupply>) -> DemandSet {
        self.demand_history_in_window(start, end)
            .into_iter()
            .flat_map(|d| d.demands.iter())
            .filter(|d| matches_cos(d, cos))
            .cloned()
            .collect()
    }

    /// Unmet demand in `(start, end]` raised by `element`, or by mission-level
    /// demand when `element` is `None`.
    pub fn total_in_window_for(
        &self,
        start: f64,
        end: f64,
        element: Option<ElementId>,
        cos: Option<ClassOfSupply>,
    ) -> DemandSet {
        self.demand_history_in_window(start, end)
            .into_iter()
            .filter(|d| d.element == element)
            .flat_map(|d| d.demands.iter())
            .filter(|d| matches_cos(d, cos))
            .cloned()
            .collect()
    }

    pub fn total_for_element(&self, element: ElementId, cos: Option<ClassOfSupply>) -> DemandSet {
        self.demand_history_for_element(element)
            .into_iter()
            .flat_map(|d| d.demands.iter())
            .filter(|d| matches_cos(d, cos))
            .cloned()
            .collect()
    }

    pub fn total_at(&self, location: Location, cos: Option<ClassOfSupply>) -> DemandSet {
        self.demand_history_at(location)
            .into_iter()
            .flat_map(|d| d.demands.iter())
            .filter(|d| matches_cos(d, cos))
            .cloned()
            .collect()
    }
}
