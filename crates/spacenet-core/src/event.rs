//! Simulation events.
//!
//! An [`Event`] is a time- and priority-stamped unit of change. Its
//! [`EventKind`] is a closed set of variants executed by exhaustive matching
//! in the simulator. [`EventType`] is the data-only discriminant.
//!
//! Events stored on a mission are templates: their `time` is relative to the
//! mission start and is shifted when the mission event executes.

use crate::demand::DemandSet;
use crate::element::StateType;
use crate::id::{EdgeId, ElementId, MissionId};
use crate::network::{BurnType, Container, Location};
use serde::{Deserialize, Serialize};

/// Discriminant of [`EventKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventType {
    Mission,
    Demand,
    Add,
    Remove,
    Move,
    Create,
    Reconfigure,
    ReconfigureGroup,
    Transfer,
    SpaceTransport,
    FlightTransport,
    SurfaceTransport,
    Eva,
    Exploration,
    Burn,
}

/// What a burn-sequence entry does to its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BurnAction {
    /// Fire the element's engines.
    Burn,
    /// Jettison the element from the stack.
    Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BurnStageItem {
    pub element: ElementId,
    pub action: BurnAction,
}

impl BurnStageItem {
    pub fn burn(element: ElementId) -> Self {
        Self {
            element,
            action: BurnAction::Burn,
        }
    }

    pub fn stage(element: ElementId) -> Self {
        Self {
            element,
            action: BurnAction::Stage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Start a mission: schedule its event templates.
    Mission(MissionId),
    /// Apply demands against inventory at the event location.
    Demand {
        /// Element generating the demand, or `None` for location-level demand.
        element: Option<ElementId>,
        demands: DemandSet,
    },
    /// Add resources to a resource container.
    Add {
        container: ElementId,
        demands: DemandSet,
    },
    /// Remove elements and their contents from the simulation.
    Remove { elements: Vec<ElementId> },
    /// Move elements to a container; `None` means the event location.
    Move {
        container: Option<Container>,
        elements: Vec<ElementId>,
    },
    /// Place new elements into the simulation.
    Create {
        container: Option<Container>,
        elements: Vec<ElementId>,
    },
    /// Switch one element to a state index.
    Reconfigure {
        element: Option<ElementId>,
        state: usize,
    },
    /// Switch elements to their first state of a type.
    ReconfigureGroup {
        elements: Vec<ElementId>,
        state_type: StateType,
    },
    /// Move resources between two co-located containers.
    Transfer {
        origin: ElementId,
        destination: ElementId,
        demands: DemandSet,
    },
    /// Propulsive transport along a space edge. One burn sequence per edge
    /// burn, in order.
    SpaceTransport {
        edge: EdgeId,
        elements: Vec<ElementId>,
        burn_sequences: Vec<Vec<BurnStageItem>>,
    },
    /// Transport along a flight edge with fixed capacity.
    FlightTransport {
        edge: EdgeId,
        elements: Vec<ElementId>,
    },
    /// Drive a surface vehicle along a surface edge.
    SurfaceTransport {
        edge: EdgeId,
        vehicle: ElementId,
        /// Kilometers per hour.
        speed: f64,
        duty_cycle: f64,
        /// State the vehicle switches to while driving.
        transport_state: Option<usize>,
    },
    /// Extra-vehicular activity from a habitat.
    Eva {
        vehicle: ElementId,
        eva_hours: f64,
        /// Crew members and the state each switches to during the EVA.
        crew_states: Vec<(ElementId, Option<usize>)>,
        /// Demands applied to the habitat when the EVA ends.
        demands: DemandSet,
    },
    /// A surface stay with periodic EVAs.
    Exploration {
        vehicle: ElementId,
        /// Days.
        duration: f64,
        eva_per_week: f64,
        eva_hours: f64,
        crew_states: Vec<(ElementId, Option<usize>)>,
        demands: DemandSet,
    },
    /// One burn of a space transport.
    Burn {
        elements: Vec<ElementId>,
        delta_v: f64,
        burn_type: BurnType,
        sequence: Vec<BurnStageItem>,
    },
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::Mission(_) => EventType::Mission,
            EventKind::Demand { .. } => EventType::Demand,
            EventKind::Add { .. } => EventType::Add,
            EventKind::Remove { .. } => EventType::Remove,
            EventKind::Move { .. } => EventType::Move,
            EventKind::Create { .. } => EventType::Create,
            EventKind::Reconfigure { .. } => EventType::Reconfigure,
            EventKind::ReconfigureGroup { .. } => EventType::ReconfigureGroup,
            EventKind::Transfer { .. } => EventType::Transfer,
            EventKind::SpaceTransport { .. } => EventType::SpaceTransport,
            EventKind::FlightTransport { .. } => EventType::FlightTransport,
            EventKind::SurfaceTransport { .. } => EventType::SurfaceTransport,
            EventKind::Eva { .. } => EventType::Eva,
            EventKind::Exploration { .. } => EventType::Exploration,
            EventKind::Burn { .. } => EventType::Burn,
        }
    }

    /// Edge traversed by a transport.
    pub fn transport_edge(&self) -> Option<EdgeId> {
        match self {
            EventKind::SpaceTransport { edge, .. }
            | EventKind::FlightTransport { edge, .. }
            | EventKind::SurfaceTransport { edge, .. } => Some(*edge),
            _ => None,
        }
    }
}

/// A scheduled unit of simulated change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Days from scenario start (or mission start for templates).
    pub time: f64,
    /// Lower runs first among events at the same time.
    pub priority: i32,
    pub location: Option<Location>,
    pub name: String,
    pub kind: EventKind,
}

impl Event {
    pub fn new(name: impl Into<String>, time: f64, kind: EventKind) -> Self {
        Self {
            time,
            priority: 0,
            location: None,
            name: name.into(),
            kind,
        }
    }

    pub fn at(mut self, location: impl Into<Location>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    /// A derived event inheriting this event's name and location.
    pub(crate) fn child(&self, time: f64, priority: i32, kind: EventKind) -> Self {
        Self {
            time,
            priority,
            location: self.location,
            name: self.name.clone(),
            kind,
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?} @ {:.3})", self.name, self.event_type(), self.time)
    }
}
