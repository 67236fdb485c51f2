//! Unmet demand bucketed by where it can be resupplied.
//!
//! Every transport that executes opens a resupply opportunity: a
//! [`SupplyEdge`] covering the transit and a [`SupplyPoint`] at the arrival
//! node. After the run, each unmet demand is charged to the opportunity that
//! could have carried it:
//!
//! - demand at a node goes to the latest point at that node no later than
//!   the demand;
//! - demand on an edge goes to the transit on that edge whose span contains
//!   the demand time, preferring the one that arrives first.
//!
//! Node demand on Earth's surface with no point is dropped, since it is
//! supplied locally. Anything else left over is reported as a [`SupplyGap`].
//!
//! The aggregator also tabulates, per crewed mission, the unmet item demand
//! that the crew could repair instead of resupplying.

use super::{SimulationError, Simulator};
use crate::demand::DemandSet;
use crate::event::{Event, EventKind};
use crate::id::{EdgeId, ElementId, MissionId, NodeId};
use crate::log::{SimDemand, SimLog};
use crate::mission::MissionWindow;
use crate::network::Location;
use crate::repair::{RepairItem, sort_by_repair_value};
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Arrival of a transport at a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupplyPoint {
    pub node: NodeId,
    pub time: f64,
}

/// A transit along an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyEdge {
    pub edge: EdgeId,
    /// Surface traverse from the edge destination back to its origin.
    pub reversed: bool,
    pub start: f64,
    pub end: f64,
    /// Carriers in the transported stack.
    pub carriers: Vec<ElementId>,
    /// Summed cargo mass limit of the carriers, in kilograms.
    pub capacity: f64,
    /// Where the transit ends.
    pub point: SupplyPoint,
}

impl SupplyEdge {
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    fn same_transit(&self, other: &SupplyEdge) -> bool {
        self.edge == other.edge
            && self.reversed == other.reversed
            && self.start == other.start
            && self.end == other.end
    }
}

/// Unmet demand no supply point or edge could absorb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyGap {
    pub time: f64,
    pub location: Location,
    pub demands: DemandSet,
}

/// Repairable items found in one mission's window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairTable {
    pub mission: MissionId,
    /// In the order the demands were logged.
    pub unsorted: Vec<RepairItem>,
    /// Ascending by repair value.
    pub sorted: Vec<RepairItem>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

fn carrier_capacity(scenario: &Scenario, id: ElementId) -> f64 {
    scenario
        .element(id)
        .and_then(|e| e.carrier())
        .map_or(0.0, |c| c.max_cargo_mass)
}

/// Opportunity opened by a transport event about to execute.
fn supply_edge(scenario: &Scenario, event: &Event, clock: f64) -> Option<SupplyEdge> {
    let edge = event.kind.transport_edge()?;
    let (_, destination) = scenario.transport_endpoints(event)?;
    let reversed = scenario
        .network
        .edge(edge)
        .is_some_and(|e| e.destination != destination);
    let elements: Vec<ElementId> = match &event.kind {
        EventKind::SpaceTransport { elements, .. } | EventKind::FlightTransport { elements, .. } => {
            elements.clone()
        }
        EventKind::SurfaceTransport { vehicle, .. } => vec![*vehicle],
        _ => Vec::new(),
    };
    let carriers: Vec<ElementId> = elements
        .into_iter()
        .filter(|id| scenario.element(*id).and_then(|e| e.carrier()).is_some())
        .collect();
    let capacity = carriers.iter().map(|id| carrier_capacity(scenario, *id)).sum();
    let end = clock + scenario.event_duration(event);
    Some(SupplyEdge {
        edge,
        reversed,
        start: clock,
        end,
        carriers,
        capacity,
        point: SupplyPoint {
            node: destination,
            time: end,
        },
    })
}

/// Unmet item demand that could have been repaired, per mission window.
///
/// Windows are walked in mission order. Each crewed window covers
/// `(previous crewed end, own end]`; uncrewed missions get an empty table.
pub(crate) fn tabulate_repairs(
    scenario: &Scenario,
    windows: &[MissionWindow],
    log: &SimLog,
) -> Vec<RepairTable> {
    let mut tables = Vec::with_capacity(windows.len());
    let mut last_end = 0.0;
    for window in windows {
        let mut unsorted = Vec::new();
        if window.crewed {
            let (start, end) = (last_end, window.end);
            last_end = end;
            for unmet in &log.unsatisfied_demands {
                if unmet.time <= start || unmet.time > end {
                    continue;
                }
                let Some(id) = unmet.element else {
                    continue;
                };
                let Some(element) = scenario.element(id) else {
                    continue;
                };
                for demand in unmet.demands.iter().filter(|d| d.resource.is_item()) {
                    let repairable = element
                        .parts
                        .iter()
                        .any(|p| p.part == demand.resource && p.mean_time_to_repair > 0.0);
                    if repairable {
                        unsorted.push(RepairItem::new(demand.clone(), id));
                    }
                }
            }
        }
        let mut sorted = unsorted.clone();
        sort_by_repair_value(&mut sorted, scenario);
        tables.push(RepairTable {
            mission: window.mission,
            unsorted,
            sorted,
        });
    }
    tables
}

/// A full run that buckets unmet demand by resupply opportunity.
#[derive(Debug)]
pub struct SupplyAggregator {
    sim: Simulator,
    edges: Vec<(SupplyEdge, DemandSet)>,
    points: Vec<(SupplyPoint, DemandSet)>,
    gaps: Vec<SupplyGap>,
    repairs: Vec<RepairTable>,
}

impl SupplyAggregator {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            sim: Simulator::new(scenario),
            edges: Vec::new(),
            points: Vec::new(),
            gaps: Vec::new(),
            repairs: Vec::new(),
        }
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    /// Transits ascending by start time, each with the demand it absorbed.
    pub fn edges(&self) -> &[(SupplyEdge, DemandSet)] {
        &self.edges
    }

    /// Arrivals ascending by time, each with the demand it absorbed.
    pub fn points(&self) -> &[(SupplyPoint, DemandSet)] {
        &self.points
    }

    pub fn gaps(&self) -> &[SupplyGap] {
        &self.gaps
    }

    pub fn repair_tables(&self) -> &[RepairTable] {
        &self.repairs
    }

    pub fn repair_table(&self, mission: MissionId) -> Option<&RepairTable> {
        self.repairs.iter().find(|t| t.mission == mission)
    }

    fn record_transport(&mut self, edge: SupplyEdge) {
        let point = edge.point;
        if !self
            .points
            .iter()
            .any(|(p, _)| p.node == point.node && p.time == point.time)
        {
            self.points.push((point, DemandSet::new()));
        }
        match self.edges.iter_mut().find(|(e, _)| e.same_transit(&edge)) {
            // Stacks sharing a transit pool their carriers.
            Some((existing, _)) => {
                let scenario = self.sim.scenario();
                for carrier in edge.carriers {
                    if !existing.carriers.contains(&carrier) {
                        existing.carriers.push(carrier);
                        existing.capacity += carrier_capacity(scenario, carrier);
                    }
                }
            }
            None => self.edges.push((edge, DemandSet::new())),
        }
    }

    fn charge(&mut self, unmet: &SimDemand) {
        let Some(location) = unmet.location else {
            return;
        };
        match location {
            Location::Node(node) => {
                let target = self
                    .points
                    .iter_mut()
                    .filter(|(p, _)| p.node == node && p.time <= unmet.time)
                    .fold(None::<&mut (SupplyPoint, DemandSet)>, |best, candidate| match best {
                        Some(b) if b.0.time >= candidate.0.time => Some(b),
                        _ => Some(candidate),
                    });
                match target {
                    Some((_, demands)) => demands.add_all(unmet.demands.iter().cloned()),
                    None => {
                        let earth = self
                            .sim
                            .scenario()
                            .network
                            .node(node)
                            .is_some_and(|n| n.is_earth_surface());
                        if !earth {
                            self.gap(unmet, location);
                        }
                    }
                }
            }
            Location::Edge(edge) => {
                // Overlapping transits: the one arriving first carries it.
                let target = self
                    .edges
                    .iter_mut()
                    .filter(|(e, _)| e.edge == edge && e.contains(unmet.time))
                    .min_by(|a, b| a.0.end.total_cmp(&b.0.end));
                match target {
                    Some((_, demands)) => demands.add_all(unmet.demands.iter().cloned()),
                    None => self.gap(unmet, location),
                }
            }
        }
    }

    fn gap(&mut self, unmet: &SimDemand, location: Location) {
        tracing::warn!(
            time = unmet.time,
            location = %self.sim.scenario().network.location_name(location),
            demands = %unmet.demands,
            "no supply opportunity for unmet demand"
        );
        self.gaps.push(SupplyGap {
            time: unmet.time,
            location,
            demands: unmet.demands.clone(),
        });
    }

    pub fn simulate(&mut self) -> Result<(), SimulationError> {
        self.edges.clear();
        self.points.clear();
        self.gaps.clear();
        self.repairs.clear();
        self.sim.initialize()?;
        while self.sim.advance()? {
            let opened = self
                .sim
                .current_event()
                .and_then(|event| supply_edge(self.sim.scenario(), event, self.sim.clock()));
            if let Some(edge) = opened {
                self.record_transport(edge);
            }
            self.sim.handle_demands()?;
            self.sim.execute();
        }
        self.sim.finish();

        self.points.sort_by(|a, b| a.0.time.total_cmp(&b.0.time));
        self.edges.sort_by(|a, b| a.0.start.total_cmp(&b.0.start));
        self.repairs = tabulate_repairs(
            self.sim.scenario(),
            self.sim.mission_windows(),
            self.sim.log(),
        );
        let unmet = self.sim.log().unsatisfied_demands.clone();
        for demand in &unmet {
            self.charge(demand);
        }
        tracing::info!(
            points = self.points.len(),
            edges = self.edges.len(),
            gaps = self.gaps.len(),
            "supply aggregation complete"
        );
        Ok(())
    }
}
