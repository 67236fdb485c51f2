//! In-mission repair of failed items.
//!
//! A mission may carry a list of [`RepairItem`]s: quantities of a part of a
//! specific element that the crew can repair instead of waiting for a spare.
//! During the demand cycle, outstanding item demand of that element is
//! covered from the list, at a cost in crew time and in generic repair
//! material (class 4).
//!
//! Only one crewed mission is consulted at a time. Missions are scanned in
//! start order; a mission qualifies while the clock is before its end and
//! not before the end of the last crewed mission that qualified. Once a
//! crewed mission qualifies, later missions cannot.

use crate::cos::ClassOfSupply;
use crate::demand::{Demand, DemandSet};
use crate::element::{Element, PartApplication};
use crate::id::ElementId;
use crate::log::SimRepair;
use crate::mission::MissionWindow;
use crate::resource::Resource;
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};

/// A repairable quantity of one part of one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairItem {
    /// Part and the amount still available for repair.
    pub demand: Demand,
    pub element: ElementId,
}

impl RepairItem {
    pub fn new(demand: Demand, element: ElementId) -> Self {
        Self { demand, element }
    }

    fn application<'a>(&self, element: &'a Element) -> Option<&'a PartApplication> {
        element
            .parts
            .iter()
            .find(|p| p.part == self.demand.resource)
    }

    /// Crew-hours to repair one unit. Unbounded when the element does not
    /// list the part.
    pub fn unit_mean_repair_time(&self, element: &Element) -> f64 {
        self.application(element)
            .map_or(f64::MAX, |p| p.mean_time_to_repair)
    }

    pub fn mean_repair_time(&self, element: &Element) -> f64 {
        self.unit_mean_repair_time(element) * self.demand.amount
    }

    pub fn unit_mass_to_repair(&self, element: &Element) -> f64 {
        self.application(element).map_or(0.0, |p| p.mass_to_repair)
    }

    pub fn mass_to_repair(&self, element: &Element) -> f64 {
        self.unit_mass_to_repair(element) * self.demand.amount
    }

    /// Crew-hours spent per kilogram of resupply mass saved. Lower is a
    /// better repair candidate.
    pub fn repair_value(&self, element: &Element) -> f64 {
        self.unit_mean_repair_time(element)
            / (self.demand.resource.unit_mass - self.unit_mass_to_repair(element))
    }
}

/// Order repair items by ascending repair value.
pub fn sort_by_repair_value(items: &mut [RepairItem], scenario: &Scenario) {
    let value = |item: &RepairItem| {
        scenario
            .element(item.element)
            .map_or(f64::MAX, |e| item.repair_value(e))
    };
    items.sort_by(|a, b| value(a).total_cmp(&value(b)));
}

impl Scenario {
    /// Cover item demand of `element` by repair. Returns one record per
    /// repaired quantity; the demand set is reduced by what was repaired and
    /// grows by the generic repair material consumed.
    pub(crate) fn repair_demands(
        &mut self,
        windows: &[MissionWindow],
        time: f64,
        element: ElementId,
        demands: &mut DemandSet,
    ) -> Vec<SimRepair> {
        let mut records = Vec::new();
        let Some(parts_owner) = self.elements.get(element) else {
            return records;
        };
        let location = self.location_of(element);
        let mut material = Vec::new();
        let mut last_time = 0.0;
        for window in windows {
            let Some(mission) = self.missions.get_mut(window.mission) else {
                continue;
            };
            if mission.repair_items.is_empty() || time >= window.end || time < last_time {
                continue;
            }
            if window.crewed {
                last_time = window.end;
            }
            for item in mission
                .repair_items
                .iter_mut()
                .filter(|item| item.element == element && item.demand.resource.is_item())
            {
                if item.demand.amount <= 0.0 {
                    continue;
                }
                let Some(demand) = demands.get_mut(&item.demand.resource) else {
                    continue;
                };
                let repaired = demand.amount.min(item.demand.amount);
                if repaired <= 0.0 {
                    continue;
                }
                let unit_time = item.unit_mean_repair_time(parts_owner);
                let unit_mass = item.unit_mass_to_repair(parts_owner);
                records.push(SimRepair {
                    time,
                    item: demand.resource.clone(),
                    amount: repaired,
                    crew_hours: repaired * unit_time,
                    repair_mass: repaired * unit_mass,
                    location,
                    element,
                    mission: window.mission,
                });
                demand.amount -= repaired;
                item.demand.amount -= repaired;
                material.push(Demand::new(
                    Resource::generic(ClassOfSupply::COS4),
                    unit_mass * repaired,
                ));
            }
        }
        demands.add_all(material);
        demands.clean(&self.config);
        records
    }
}
