//! Transportation network: nodes, edges, and the places elements can be.

use crate::id::{EdgeId, ElementId, NodeId};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Bodies and nodes
// ---------------------------------------------------------------------------

/// A celestial body nodes are attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Body {
    Sun,
    Mercury,
    Venus,
    Earth,
    Moon,
    Mars,
    Phobos,
    Deimos,
    Jupiter,
    Saturn,
}

/// Geometry of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Surface { latitude: f64, longitude: f64 },
    Orbital { apoapsis: f64, periapsis: f64, inclination: f64 },
    Lagrange { minor_body: Body, number: u8 },
}

/// A point in the network where elements can reside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub body: Body,
    pub kind: NodeKind,
    /// Top-level elements at this node.
    pub contents: Vec<ElementId>,
}

impl Node {
    pub fn surface(name: impl Into<String>, body: Body) -> Self {
        Self {
            name: name.into(),
            body,
            kind: NodeKind::Surface {
                latitude: 0.0,
                longitude: 0.0,
            },
            contents: Vec::new(),
        }
    }

    pub fn orbital(name: impl Into<String>, body: Body, apoapsis: f64, periapsis: f64) -> Self {
        Self {
            name: name.into(),
            body,
            kind: NodeKind::Orbital {
                apoapsis,
                periapsis,
                inclination: 0.0,
            },
            contents: Vec::new(),
        }
    }

    pub fn lagrange(name: impl Into<String>, body: Body, minor_body: Body, number: u8) -> Self {
        Self {
            name: name.into(),
            body,
            kind: NodeKind::Lagrange { minor_body, number },
            contents: Vec::new(),
        }
    }

    pub fn is_surface(&self) -> bool {
        matches!(self.kind, NodeKind::Surface { .. })
    }

    pub fn is_orbital(&self) -> bool {
        matches!(self.kind, NodeKind::Orbital { .. })
    }

    /// A surface node on Earth, the launch and recovery sites.
    pub fn is_earth_surface(&self) -> bool {
        self.is_surface() && self.body == Body::Earth
    }

    /// A node where crew time counts as exploration: a surface away from
    /// Earth, or a heliocentric orbit.
    pub fn is_exploration_site(&self) -> bool {
        (self.is_surface() && self.body != Body::Earth)
            || (self.is_orbital() && self.body == Body::Sun)
    }
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// Propulsion system used by a burn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BurnType {
    /// Orbital maneuvering system.
    Oms,
    /// Reaction control system.
    Rcs,
}

/// A propulsive maneuver along a space edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Burn {
    /// Days after departure.
    pub time: f64,
    pub burn_type: BurnType,
    /// Required change in velocity (m/s).
    pub delta_v: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EdgeKind {
    Space {
        duration: f64,
        burns: Vec<Burn>,
    },
    Flight {
        duration: f64,
        max_crew: u32,
        max_cargo_mass: f64,
    },
    Surface {
        /// Kilometers.
        distance: f64,
    },
}

/// A route between two nodes. Elements in transit reside on the edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub name: String,
    pub origin: NodeId,
    pub destination: NodeId,
    pub kind: EdgeKind,
    /// Top-level elements in transit on this edge.
    pub contents: Vec<ElementId>,
}

impl Edge {
    pub fn new(name: impl Into<String>, origin: NodeId, destination: NodeId, kind: EdgeKind) -> Self {
        Self {
            name: name.into(),
            origin,
            destination,
            kind,
            contents: Vec::new(),
        }
    }

    /// Travel time in days. Surface edges depend on the vehicle and report
    /// `None`.
    pub fn duration(&self) -> Option<f64> {
        match &self.kind {
            EdgeKind::Space { duration, .. } | EdgeKind::Flight { duration, .. } => {
                Some(*duration)
            }
            EdgeKind::Surface { .. } => None,
        }
    }

    pub fn is_surface(&self) -> bool {
        matches!(self.kind, EdgeKind::Surface { .. })
    }
}

// ---------------------------------------------------------------------------
// Locations and containers
// ---------------------------------------------------------------------------

/// A place in the network: a node or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Location {
    Node(NodeId),
    Edge(EdgeId),
}

/// What directly holds an element: a location or a carrier element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Container {
    Location(Location),
    Element(ElementId),
}

impl From<Location> for Container {
    fn from(location: Location) -> Self {
        Container::Location(location)
    }
}

impl From<NodeId> for Location {
    fn from(node: NodeId) -> Self {
        Location::Node(node)
    }
}

impl From<EdgeId> for Location {
    fn from(edge: EdgeId) -> Self {
        Location::Edge(edge)
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Arena of nodes and edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Network {
    pub nodes: SlotMap<NodeId, Node>,
    pub edges: SlotMap<EdgeId, Edge>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }

    pub fn add_edge(&mut self, edge: Edge) -> EdgeId {
        self.edges.insert(edge)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn contains(&self, location: Location) -> bool {
        match location {
            Location::Node(n) => self.nodes.contains_key(n),
            Location::Edge(e) => self.edges.contains_key(e),
        }
    }

    /// Elements directly at a location.
    pub fn contents(&self, location: Location) -> &[ElementId] {
        let contents = match location {
            Location::Node(n) => self.nodes.get(n).map(|node| node.contents.as_slice()),
            Location::Edge(e) => self.edges.get(e).map(|edge| edge.contents.as_slice()),
        };
        contents.unwrap_or_default()
    }

    pub(crate) fn contents_mut(&mut self, location: Location) -> Option<&mut Vec<ElementId>> {
        match location {
            Location::Node(n) => self.nodes.get_mut(n).map(|node| &mut node.contents),
            Location::Edge(e) => self.edges.get_mut(e).map(|edge| &mut edge.contents),
        }
    }

    pub fn location_name(&self, location: Location) -> String {
        match location {
            Location::Node(n) => self
                .nodes
                .get(n)
                .map_or_else(|| "unknown node".to_string(), |node| node.name.clone()),
            Location::Edge(e) => self
                .edges
                .get(e)
                .map_or_else(|| "unknown edge".to_string(), |edge| edge.name.clone()),
        }
    }

    /// Whether crew at `location` are on an exploration site: an exploration
    /// node, or a surface edge leaving a body other than Earth.
    pub fn is_exploration_location(&self, location: Location) -> bool {
        match location {
            Location::Node(n) => self.nodes.get(n).is_some_and(Node::is_exploration_site),
            Location::Edge(e) => self.edges.get(e).is_some_and(|edge| {
                edge.is_surface()
                    && self
                        .nodes
                        .get(edge.origin)
                        .is_some_and(|origin| origin.body != Body::Earth)
            }),
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn earth_moon() -> (Network, NodeId, NodeId, EdgeId) {
        let mut network = Network::new();
        let ksc = network.add_node(Node::surface("KSC", Body::Earth));
        let pole = network.add_node(Node::surface("Lunar South Pole", Body::Moon));
        let edge = network.add_edge(Edge::new(
            "Rover traverse",
            pole,
            ksc,
            EdgeKind::Surface { distance: 10.0 },
        ));
        (network, ksc, pole, edge)
    }

    #[test]
    fn exploration_sites() {
        let (mut network, ksc, pole, edge) = earth_moon();
        assert!(!network.is_exploration_location(ksc.into()));
        assert!(network.is_exploration_location(pole.into()));
        assert!(network.is_exploration_location(edge.into()));
        let helio = network.add_node(Node::orbital("Helio", Body::Sun, 1.0, 1.0));
        assert!(network.is_exploration_location(helio.into()));
        let leo = network.add_node(Node::orbital("LEO", Body::Earth, 400.0, 400.0));
        assert!(!network.is_exploration_location(leo.into()));
    }

    #[test]
    fn earth_surface_detection() {
        let (network, ksc, pole, _) = earth_moon();
        assert!(network.node(ksc).unwrap().is_earth_surface());
        assert!(!network.node(pole).unwrap().is_earth_surface());
    }

    #[test]
    fn surface_edge_has_no_fixed_duration() {
        let (network, _, _, edge) = earth_moon();
        assert_eq!(network.edge(edge).unwrap().duration(), None);
    }

    #[test]
    fn contents_of_missing_location_is_empty() {
        let (mut network, ksc, _, _) = earth_moon();
        network.nodes.remove(ksc);
        assert!(network.contents(ksc.into()).is_empty());
        assert!(!network.contains(ksc.into()));
    }
}
