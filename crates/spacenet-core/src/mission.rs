//! Missions and their derived timing.
//!
//! A mission owns event templates whose times are relative to its start.
//! Timing quantities (duration, transit, time at destination, crew size)
//! are derived from those templates and the scenario they run in, so they
//! are computed by [`Scenario`] rather than stored.

use crate::demand::DemandSet;
use crate::element::ElementKind;
use crate::event::{Event, EventKind};
use crate::id::{EdgeId, MissionId, NodeId};
use crate::model::{DemandModel, MissionProfile, ModelContext, ModelError};
use crate::network::{EdgeKind, Location};
use crate::repair::RepairItem;
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Mission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub name: String,
    /// Days from scenario start.
    pub start: f64,
    /// Event templates, timed relative to `start`.
    pub events: Vec<Event>,
    /// Mission-level demand models, evaluated once per run.
    pub demand_models: Vec<DemandModel>,
    pub origin: Option<NodeId>,
    pub destination: Option<NodeId>,
    pub return_origin: Option<NodeId>,
    pub return_destination: Option<NodeId>,
    /// Items that may be repaired rather than resupplied during this mission.
    pub repair_items: Vec<RepairItem>,
}

impl Mission {
    pub fn new(name: impl Into<String>, start: f64) -> Self {
        Self {
            name: name.into(),
            start,
            events: Vec::new(),
            demand_models: Vec::new(),
            origin: None,
            destination: None,
            return_origin: None,
            return_destination: None,
            repair_items: Vec::new(),
        }
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_model(mut self, model: DemandModel) -> Self {
        self.demand_models.push(model);
        self
    }

    pub fn with_route(mut self, origin: NodeId, destination: NodeId) -> Self {
        self.origin = Some(origin);
        self.destination = Some(destination);
        self
    }

    pub fn with_return(mut self, origin: NodeId, destination: NodeId) -> Self {
        self.return_origin = Some(origin);
        self.return_destination = Some(destination);
        self
    }

    /// Evaluate the mission-level models.
    pub fn generate_demands(
        &mut self,
        duration: f64,
        profile: &MissionProfile,
    ) -> Result<DemandSet, ModelError> {
        let mut demands = DemandSet::new();
        for model in &mut self.demand_models {
            demands.add_all(model.generate(duration, ModelContext::Mission(profile))?);
        }
        Ok(demands)
    }

    /// Templates in execution order.
    fn sorted_events(&self) -> Vec<&Event> {
        let mut events: Vec<_> = self.events.iter().collect();
        events.sort_by(|a, b| {
            a.time
                .total_cmp(&b.time)
                .then(a.priority.cmp(&b.priority))
        });
        events
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Derived timing and crew quantities of a mission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionTiming {
    pub crew_size: u32,
    pub eva_count: u32,
    pub eva_crew_time: f64,
    pub duration: f64,
    pub transit_duration: f64,
    pub destination_duration: f64,
    pub return_transit_duration: f64,
    pub crewed: bool,
}

impl MissionTiming {
    pub fn dormant_duration(&self) -> f64 {
        self.duration
            - self.transit_duration
            - self.destination_duration
            - self.return_transit_duration
    }

    pub fn profile(&self) -> MissionProfile {
        MissionProfile {
            crew_size: self.crew_size,
            eva_crew_time: self.eva_crew_time,
            exploration_duration: self.destination_duration,
            transit_duration: self.transit_duration,
            return_transit_duration: self.return_transit_duration,
        }
    }
}

/// A mission's active interval on the scenario clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissionWindow {
    pub mission: MissionId,
    pub start: f64,
    pub end: f64,
    pub crewed: bool,
}

/// Number of EVAs an exploration process performs.
pub fn exploration_eva_count(duration: f64, eva_per_week: f64) -> u32 {
    (duration * eva_per_week / 7.0).floor().max(0.0) as u32
}

struct TransportLeg {
    time: f64,
    origin: NodeId,
    destination: NodeId,
    duration: f64,
}

impl Scenario {
    /// Missions ascending by start, ties by name, then by definition order.
    pub fn mission_order(&self) -> Vec<MissionId> {
        let mut order: Vec<_> = self.missions.keys().collect();
        order.sort_by(|a, b| {
            let (ma, mb) = (&self.missions[*a], &self.missions[*b]);
            ma.start
                .total_cmp(&mb.start)
                .then_with(|| ma.name.cmp(&mb.name))
        });
        order
    }

    /// Days a surface vehicle needs for an edge, infinite when it cannot move.
    pub fn surface_duration(&self, edge: EdgeId, speed: f64, duty_cycle: f64) -> f64 {
        let distance = match self.network.edge(edge).map(|e| &e.kind) {
            Some(EdgeKind::Surface { distance }) => *distance,
            _ => return 0.0,
        };
        if speed <= 0.0 || duty_cycle <= 0.0 {
            f64::INFINITY
        } else {
            self.config
                .round_time(distance / (speed * duty_cycle * 24.0))
        }
    }

    /// Days an event keeps running after it starts: transit time for
    /// transports and activity time for explorations. EVAs and every other
    /// instantaneous event take zero.
    pub fn event_duration(&self, event: &Event) -> f64 {
        match &event.kind {
            EventKind::SpaceTransport { edge, .. } | EventKind::FlightTransport { edge, .. } => self
                .network
                .edge(*edge)
                .and_then(|e| e.duration())
                .unwrap_or(0.0),
            EventKind::SurfaceTransport {
                edge,
                speed,
                duty_cycle,
                ..
            } => self.surface_duration(*edge, *speed, *duty_cycle),
            EventKind::Exploration { duration, .. } => *duration,
            _ => 0.0,
        }
    }

    /// Origin and destination of a transport, honoring reversed surface
    /// traverses.
    pub fn transport_endpoints(&self, event: &Event) -> Option<(NodeId, NodeId)> {
        let edge = self.network.edge(event.kind.transport_edge()?)?;
        let reversed = matches!(event.kind, EventKind::SurfaceTransport { .. })
            && event.location == Some(Location::Node(edge.destination));
        if reversed {
            Some((edge.destination, edge.origin))
        } else {
            Some((edge.origin, edge.destination))
        }
    }

    fn transport_legs(&self, mission: &Mission) -> Vec<TransportLeg> {
        mission
            .sorted_events()
            .into_iter()
            .filter_map(|event| {
                let (origin, destination) = self.transport_endpoints(event)?;
                Some(TransportLeg {
                    time: event.time,
                    origin,
                    destination,
                    duration: self.event_duration(event),
                })
            })
            .collect()
    }

    /// Crew created by the mission, including crew created aboard carriers.
    pub fn mission_crew_size(&self, mission: &Mission) -> u32 {
        let mut crew = 0;
        for event in &mission.events {
            let EventKind::Create { elements, .. } = &event.kind else {
                continue;
            };
            for element in elements.iter().filter_map(|id| self.elements.get(*id)) {
                if element.is_crew_member() {
                    crew += 1;
                } else if let Some(carrier) = element.carrier() {
                    crew += carrier
                        .contents
                        .iter()
                        .filter(|id| self.elements.get(**id).is_some_and(|e| e.is_crew_member()))
                        .count() as u32;
                }
            }
        }
        crew
    }

    fn mission_duration(&self, id: MissionId, order: &[MissionId]) -> f64 {
        let Some(mission) = self.missions.get(id) else {
            return 0.0;
        };
        let position = order.iter().position(|m| *m == id);
        let next = position.and_then(|i| order.get(i + 1));
        let end = match next.and_then(|next| self.missions.get(*next)) {
            Some(next) => next.start,
            None => mission
                .events
                .iter()
                .map(|e| mission.start + e.time + self.event_duration(e))
                .fold(mission.start, f64::max),
        };
        self.config.round_time(end - mission.start)
    }

    /// Derived timing of a mission.
    pub fn mission_timing(&self, id: MissionId) -> MissionTiming {
        self.mission_timing_in(id, &self.mission_order())
    }

    pub(crate) fn mission_timing_in(&self, id: MissionId, order: &[MissionId]) -> MissionTiming {
        let Some(mission) = self.missions.get(id) else {
            return MissionTiming::default();
        };
        let round = |t: f64| self.config.round_time(t);
        let duration = self.mission_duration(id, order);
        let legs = self.transport_legs(mission);

        let mut eva_count = 0;
        let mut eva_crew_time = 0.0;
        for event in &mission.events {
            match &event.kind {
                EventKind::Eva {
                    eva_hours,
                    crew_states,
                    ..
                } => {
                    eva_count += 1;
                    eva_crew_time += eva_hours * crew_states.len() as f64;
                }
                EventKind::Exploration {
                    duration,
                    eva_per_week,
                    eva_hours,
                    crew_states,
                    ..
                } => {
                    let n = exploration_eva_count(*duration, *eva_per_week);
                    eva_count += n;
                    eva_crew_time += f64::from(n) * eva_hours * crew_states.len() as f64;
                }
                _ => {}
            }
        }

        let mut arrival = None;
        let mut departure = None;
        if let Some(destination) = mission.destination {
            for leg in &legs {
                if leg.destination == destination && arrival.is_none() {
                    arrival = Some(leg.time + leg.duration);
                } else if leg.origin == destination {
                    departure = Some(leg.time);
                }
            }
        }
        let destination_duration = match (arrival, departure) {
            (None, _) => 0.0,
            (Some(arrival), None) => round(duration - arrival),
            (Some(arrival), Some(departure)) => round(departure - arrival),
        };
        let transit_duration = round(arrival.unwrap_or(duration));

        let mut transit_start = None;
        let mut transit_end = None;
        for leg in &legs {
            if Some(leg.destination) == mission.return_destination {
                transit_end = Some(leg.time + leg.duration);
            }
            if Some(leg.origin) == mission.return_origin {
                transit_start = Some(leg.time);
            }
        }
        let return_transit_duration = match (transit_start, transit_end) {
            (Some(start), Some(end)) => round(end - start),
            _ => 0.0,
        };

        let crewed = mission.events.iter().any(|event| match &event.kind {
            EventKind::Create { elements, .. } => elements.iter().any(|id| {
                self.elements
                    .get(*id)
                    .is_some_and(|e| matches!(e.kind, ElementKind::CrewMember { .. }))
            }),
            _ => false,
        });

        MissionTiming {
            crew_size: self.mission_crew_size(mission),
            eva_count,
            eva_crew_time,
            duration,
            transit_duration,
            destination_duration,
            return_transit_duration,
            crewed,
        }
    }

    /// Active interval of every mission, in mission order.
    pub fn mission_windows(&self) -> Vec<MissionWindow> {
        let order = self.mission_order();
        order
            .iter()
            .map(|id| {
                let timing = self.mission_timing_in(*id, &order);
                let start = self.missions[*id].start;
                MissionWindow {
                    mission: *id,
                    start,
                    end: start + timing.duration,
                    crewed: timing.crewed,
                }
            })
            .collect()
    }
}
