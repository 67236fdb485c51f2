//! Placement history for inspection and playback.
//!
//! [`StateHistory`] runs the whole scenario and snapshots where every live
//! element sits twice per event: once after the clock moves (before demand
//! and execution) and once after the event executes.

use super::{SimulationError, Simulator};
use crate::id::ElementId;
use crate::network::{Container, Location};
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};

/// Containers of every live element at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimStateRecord {
    pub time: f64,
    /// Live elements in key order with their direct container.
    pub placements: Vec<(ElementId, Option<Container>)>,
}

impl SimStateRecord {
    /// Snapshot the live elements of `scenario`.
    pub fn capture(time: f64, scenario: &Scenario) -> Self {
        let placements = scenario
            .live_elements()
            .map(|id| (id, scenario.element(id).and_then(|e| e.container)))
            .collect();
        Self {
            time: scenario.config.round_time(time),
            placements,
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.placements.iter().map(|(id, _)| *id)
    }

    pub fn container(&self, element: ElementId) -> Option<Container> {
        self.placements
            .iter()
            .find(|(id, _)| *id == element)
            .and_then(|(_, container)| *container)
    }

    /// Location of `element` at the snapshot, walking up its carriers.
    pub fn location(&self, element: ElementId) -> Option<Location> {
        let mut current = element;
        for _ in 0..=self.placements.len() {
            match self.container(current)? {
                Container::Location(location) => return Some(location),
                Container::Element(carrier) => current = carrier,
            }
        }
        None
    }

    /// Elements whose location is `location` at the snapshot.
    pub fn elements_at(&self, location: Location) -> Vec<ElementId> {
        self.elements()
            .filter(|id| self.location(*id) == Some(location))
            .collect()
    }
}

/// A full run that records [`SimStateRecord`]s around every event.
#[derive(Debug)]
pub struct StateHistory {
    sim: Simulator,
    records: Vec<SimStateRecord>,
}

impl StateHistory {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            sim: Simulator::new(scenario),
            records: Vec::new(),
        }
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    pub fn records(&self) -> &[SimStateRecord] {
        &self.records
    }

    /// Latest snapshot taken at or before `time`.
    pub fn at(&self, time: f64) -> Option<&SimStateRecord> {
        self.records.iter().rev().find(|r| r.time <= time)
    }

    pub fn simulate(&mut self) -> Result<&[SimStateRecord], SimulationError> {
        self.records.clear();
        self.sim.initialize()?;
        while self.sim.advance()? {
            self.records
                .push(SimStateRecord::capture(self.sim.clock(), self.sim.scenario()));
            self.sim.handle_demands()?;
            self.sim.execute();
            self.records
                .push(SimStateRecord::capture(self.sim.clock(), self.sim.scenario()));
        }
        self.sim.finish();
        tracing::debug!(snapshots = self.records.len(), "state history recorded");
        Ok(&self.records)
    }
}
