//! Measures of effectiveness.
//!
//! [`MoeCollector`] runs the scenario with in-mission repair enabled and
//! packing demand disabled, and records time series derived from what each
//! event does:
//!
//! - crew time per crew member and demand cycle, split into exploration and
//!   unavailable time, with repair hours moved from exploration to
//!   corrective maintenance;
//! - crew surface days and exploration capability (science and
//!   exploration equipment mass times days) at exploration sites;
//! - exploration mass delivered by transports arriving at exploration
//!   sites;
//! - launch mass and up-mass capacity utilization for transports leaving
//!   Earth's surface, down-mass utilization for those returning;
//! - a placement snapshot whenever the clock is about to move on.
//!
//! # Relative exploration capability
//!
//! Capability per launched mass, normalized by Apollo 17:
//! `(capability / 2594) / (launch_mass / 2_930_000)`.

use super::history::SimStateRecord;
use super::{SimulationError, Simulator};
use crate::config::RunOptions;
use crate::cos::ClassOfSupply;
use crate::event::{Event, EventKind};
use crate::id::ElementId;
use crate::network::{EdgeKind, Location};
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};

/// Exploration capability of Apollo 17, in kilogram-days.
pub const APOLLO_17_EXPLORATION_CAPABILITY: f64 = 2594.0;

/// Launch mass of Apollo 17, in kilograms.
pub const APOLLO_17_LAUNCH_MASS: f64 = 2_930_000.0;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrewTimeCategory {
    Exploration,
    CorrectiveMaintenance,
    Unavailable,
}

/// Crew-hours spent in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoeCrewTime {
    pub time: f64,
    pub location: Option<Location>,
    pub category: CrewTimeCategory,
    /// Crew-hours. Negative when hours are moved out of a category.
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoeCrewSurfaceDays {
    pub time: f64,
    pub location: Location,
    pub days: f64,
}

/// Exploration equipment on hand at a site for a stretch of days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoeExplorationCapability {
    pub time: f64,
    pub location: Location,
    pub mass: f64,
    pub days: f64,
}

/// A mass amount at a location, used for deliveries and launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoeMass {
    pub time: f64,
    pub location: Location,
    pub mass: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoeCapacityUtilization {
    pub time: f64,
    pub location: Location,
    /// Cargo mass carried.
    pub amount: f64,
    /// Cargo mass that could have been carried.
    pub capacity: f64,
}

/// Totals over every series of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoeReport {
    pub crew_surface_days: f64,
    pub crew_time: f64,
    pub exploration_capability: f64,
    pub exploration_mass_delivered: f64,
    pub launch_mass: f64,
    pub up_mass_capacity_utilization: f64,
    pub down_mass_capacity_utilization: f64,
    pub relative_exploration_capability: f64,
}

fn utilization(records: &[MoeCapacityUtilization]) -> f64 {
    let amount: f64 = records.iter().map(|r| r.amount).sum();
    let capacity: f64 = records.iter().map(|r| r.capacity).sum();
    if capacity > 0.0 { amount / capacity } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// A full run that records measures of effectiveness.
#[derive(Debug)]
pub struct MoeCollector {
    sim: Simulator,
    pub network_history: Vec<SimStateRecord>,
    pub crew_time: Vec<MoeCrewTime>,
    pub crew_surface_days: Vec<MoeCrewSurfaceDays>,
    pub exploration_capability: Vec<MoeExplorationCapability>,
    pub exploration_mass_delivered: Vec<MoeMass>,
    pub launch_mass: Vec<MoeMass>,
    pub up_mass_utilization: Vec<MoeCapacityUtilization>,
    pub down_mass_utilization: Vec<MoeCapacityUtilization>,
}

impl MoeCollector {
    pub fn new(scenario: Scenario) -> Self {
        let options = RunOptions {
            items_repaired: true,
            packing_demands_added: false,
            ..RunOptions::default()
        };
        Self {
            sim: Simulator::new(scenario).with_options(options),
            network_history: Vec::new(),
            crew_time: Vec::new(),
            crew_surface_days: Vec::new(),
            exploration_capability: Vec::new(),
            exploration_mass_delivered: Vec::new(),
            launch_mass: Vec::new(),
            up_mass_utilization: Vec::new(),
            down_mass_utilization: Vec::new(),
        }
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    fn clear(&mut self) {
        self.network_history.clear();
        self.crew_time.clear();
        self.crew_surface_days.clear();
        self.exploration_capability.clear();
        self.exploration_mass_delivered.clear();
        self.launch_mass.clear();
        self.up_mass_utilization.clear();
        self.down_mass_utilization.clear();
    }

    pub fn simulate(&mut self) -> Result<MoeReport, SimulationError> {
        self.clear();
        self.sim.initialize()?;
        self.snapshot();
        while self.sim.advance()? {
            if self.sim.duration() > 0.0 {
                self.tabulate_crew();
            }
            if let Some(event) = self.sim.current_event().cloned() {
                self.tabulate_transport(&event);
            }
            let repairs_before = self.sim.log().repairs.len();
            self.sim.handle_demands()?;
            self.tabulate_repairs(repairs_before);
            self.sim.execute();
            let clock = self.sim.clock();
            if self.sim.next_event().is_none_or(|next| next.time > clock) {
                self.snapshot();
            }
        }
        self.sim.finish();
        let report = self.report();
        tracing::info!(
            launch_mass = report.launch_mass,
            crew_surface_days = report.crew_surface_days,
            relative_exploration_capability = report.relative_exploration_capability,
            "measures of effectiveness collected"
        );
        Ok(report)
    }

    fn snapshot(&mut self) {
        self.network_history
            .push(SimStateRecord::capture(self.sim.clock(), self.sim.scenario()));
    }

    /// Mass of science and exploration equipment at a location.
    fn exploration_mass_at(scenario: &Scenario, location: Location) -> f64 {
        scenario
            .network
            .contents(location)
            .iter()
            .map(|id| exploration_mass(scenario, *id))
            .sum()
    }

    fn tabulate_crew(&mut self) {
        let scenario = self.sim.scenario();
        let (time, days) = (self.sim.clock(), self.sim.duration());
        for id in scenario.live_elements() {
            let Some(fraction) = scenario.element(id).and_then(|e| e.available_time_fraction()) else {
                continue;
            };
            let location = scenario.location_of(id);
            self.crew_time.push(MoeCrewTime {
                time,
                location,
                category: CrewTimeCategory::Exploration,
                amount: days * 24.0 * fraction,
            });
            self.crew_time.push(MoeCrewTime {
                time,
                location,
                category: CrewTimeCategory::Unavailable,
                amount: days * 24.0 * (1.0 - fraction),
            });
            let Some(location) = location else {
                continue;
            };
            if scenario.network.is_exploration_location(location) {
                self.crew_surface_days.push(MoeCrewSurfaceDays {
                    time,
                    location,
                    days,
                });
                self.exploration_capability.push(MoeExplorationCapability {
                    time,
                    location,
                    mass: Self::exploration_mass_at(scenario, location),
                    days,
                });
            }
        }
    }

    fn tabulate_transport(&mut self, event: &Event) {
        let (elements, flight_capacity) = match &event.kind {
            EventKind::SpaceTransport { elements, .. } => (elements, None),
            EventKind::FlightTransport { elements, edge } => {
                let capacity = match self.sim.scenario().network.edge(*edge).map(|e| &e.kind) {
                    Some(EdgeKind::Flight { max_cargo_mass, .. }) => *max_cargo_mass,
                    _ => 0.0,
                };
                (elements, Some(capacity))
            }
            _ => return,
        };
        let scenario = self.sim.scenario();
        let Some((origin, destination)) = scenario.transport_endpoints(event) else {
            return;
        };
        let time = self.sim.clock();
        let is_exploration_site = |node| {
            scenario
                .network
                .node(node)
                .is_some_and(|n| n.is_exploration_site())
        };
        let is_earth_surface = |node| {
            scenario
                .network
                .node(node)
                .is_some_and(|n| n.is_earth_surface())
        };

        if is_exploration_site(destination) {
            self.exploration_mass_delivered.push(MoeMass {
                time: time + scenario.event_duration(event),
                location: Location::Node(destination),
                mass: elements.iter().map(|id| exploration_mass(scenario, *id)).sum(),
            });
        }

        let carried = || {
            let carriers = elements.iter().filter(|id| {
                scenario.element(**id).and_then(|e| e.carrier()).is_some()
            });
            let amount: f64 = carriers.clone().map(|id| scenario.cargo_mass(*id)).sum();
            let capacity = flight_capacity.unwrap_or_else(|| {
                carriers
                    .filter_map(|id| scenario.element(*id).and_then(|e| e.carrier()))
                    .map(|c| c.max_cargo_mass)
                    .sum()
            });
            (amount, capacity)
        };
        if is_earth_surface(origin) {
            self.launch_mass.push(MoeMass {
                time,
                location: Location::Node(origin),
                mass: elements.iter().map(|id| scenario.total_mass(*id)).sum(),
            });
            let (amount, capacity) = carried();
            self.up_mass_utilization.push(MoeCapacityUtilization {
                time,
                location: Location::Node(origin),
                amount,
                capacity,
            });
        } else if is_earth_surface(destination) {
            let (amount, capacity) = carried();
            self.down_mass_utilization.push(MoeCapacityUtilization {
                time,
                location: Location::Node(destination),
                amount,
                capacity,
            });
        }
    }

    /// Move repair hours logged since `from` out of exploration time. The
    /// entries are dated at the start of the mission that did the repair.
    fn tabulate_repairs(&mut self, from: usize) {
        let windows = self.sim.mission_windows();
        for repair in &self.sim.log().repairs[from..] {
            let start = windows
                .iter()
                .find(|w| w.mission == repair.mission)
                .map_or(repair.time, |w| w.start);
            self.crew_time.push(MoeCrewTime {
                time: start,
                location: repair.location,
                category: CrewTimeCategory::CorrectiveMaintenance,
                amount: repair.crew_hours,
            });
            self.crew_time.push(MoeCrewTime {
                time: start,
                location: repair.location,
                category: CrewTimeCategory::Exploration,
                amount: -repair.crew_hours,
            });
        }
    }

    /// Crew-hours in one category over the whole run.
    pub fn crew_time_in(&self, category: CrewTimeCategory) -> f64 {
        self.crew_time
            .iter()
            .filter(|r| r.category == category)
            .map(|r| r.amount)
            .sum()
    }

    pub fn report(&self) -> MoeReport {
        let exploration_capability: f64 = self
            .exploration_capability
            .iter()
            .map(|r| r.mass * r.days)
            .sum();
        let launch_mass: f64 = self.launch_mass.iter().map(|r| r.mass).sum();
        let relative_exploration_capability = if launch_mass > 0.0 {
            (exploration_capability / APOLLO_17_EXPLORATION_CAPABILITY)
                / (launch_mass / APOLLO_17_LAUNCH_MASS)
        } else {
            0.0
        };
        MoeReport {
            crew_surface_days: self.crew_surface_days.iter().map(|r| r.days).sum(),
            crew_time: self.crew_time.iter().map(|r| r.amount).sum(),
            exploration_capability,
            exploration_mass_delivered: self.exploration_mass_delivered.iter().map(|r| r.mass).sum(),
            launch_mass,
            up_mass_capacity_utilization: utilization(&self.up_mass_utilization),
            down_mass_capacity_utilization: utilization(&self.down_mass_utilization),
            relative_exploration_capability,
        }
    }
}

/// Science (class 6) plus exploration (class 8) mass in an element tree.
fn exploration_mass(scenario: &Scenario, id: ElementId) -> f64 {
    scenario.total_mass_of(id, ClassOfSupply::COS6) + scenario.total_mass_of(id, ClassOfSupply::COS8)
}
