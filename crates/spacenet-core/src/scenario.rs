//! The scenario arena.
//!
//! A [`Scenario`] owns the network, every element ever defined, and the
//! missions. Elements reference each other by [`ElementId`]; an element is
//! *live* once a create event has placed and registered it, and stops being
//! live when a remove event unregisters it.
//!
//! Cloning a scenario is the deep copy each simulator run works on. The
//! caller's scenario is never mutated by a run.

use crate::config::{ConfigError, SimConfig};
use crate::cos::ClassOfSupply;
use crate::demand::DemandSet;
use crate::element::Element;
use crate::event::{BurnStageItem, EventKind};
use crate::id::{EdgeId, ElementId, MissionId, NodeId};
use crate::mission::Mission;
use crate::model::ModelError;
use crate::network::{Container, Location, Network};
use crate::resource::{Environment, Resource};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A malformed scenario. These are setup defects, reported before a run
/// starts rather than logged during it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScenarioError {
    #[error("unknown element {0:?}")]
    UnknownElement(ElementId),
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("unknown edge {0:?}")]
    UnknownEdge(EdgeId),
    #[error("{element} is not a carrier")]
    NotACarrier { element: String },
    #[error("{element} has no state {index}")]
    InvalidState { element: String, index: usize },
    #[error("containment cycle through {element}")]
    ContainmentCycle { element: String },
    #[error("demand model on {owner}: {source}")]
    Model { owner: String, source: ModelError },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub config: SimConfig,
    pub network: Network,
    pub elements: SlotMap<ElementId, Element>,
    pub missions: SlotMap<MissionId, Mission>,
    /// Live elements.
    #[serde(default)]
    registrar: BTreeSet<ElementId>,
    /// Elements removed during a run.
    #[serde(default)]
    removed: BTreeSet<ElementId>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, config: SimConfig) -> Self {
        Self {
            name: name.into(),
            config,
            network: Network::new(),
            elements: SlotMap::with_key(),
            missions: SlotMap::with_key(),
            registrar: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    pub fn add_element(&mut self, element: Element) -> ElementId {
        self.elements.insert(element)
    }

    pub fn add_mission(&mut self, mission: Mission) -> MissionId {
        self.missions.insert(mission)
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    pub fn element_name(&self, id: ElementId) -> String {
        self.elements
            .get(id)
            .map_or_else(|| format!("{id:?}"), |e| e.name.clone())
    }

    pub fn container_name(&self, container: Container) -> String {
        match container {
            Container::Location(location) => self.network.location_name(location),
            Container::Element(id) => self.element_name(id),
        }
    }

    /// Load `element` into `carrier` while defining a scenario, before any
    /// run. Capacity is not checked.
    pub fn pack(&mut self, carrier: ElementId, element: ElementId) -> Result<(), ScenarioError> {
        if !self.elements.contains_key(element) {
            return Err(ScenarioError::UnknownElement(element));
        }
        let holder = self
            .elements
            .get_mut(carrier)
            .ok_or(ScenarioError::UnknownElement(carrier))?;
        let name = holder.name.clone();
        let contents = &mut holder
            .carrier_mut()
            .ok_or(ScenarioError::NotACarrier { element: name })?
            .contents;
        if !contents.contains(&element) {
            contents.push(element);
        }
        self.detach_from_others(element, Container::Element(carrier));
        if let Some(e) = self.elements.get_mut(element) {
            e.container = Some(Container::Element(carrier));
        }
        Ok(())
    }

    // -- Registrar -----------------------------------------------------------

    pub fn is_live(&self, id: ElementId) -> bool {
        self.registrar.contains(&id)
    }

    /// Live elements in key order.
    pub fn live_elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.registrar.iter().copied()
    }

    pub fn removed_elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.removed.iter().copied()
    }

    pub(crate) fn register_tree(&mut self, id: ElementId) {
        for element in self.descendants(id) {
            self.removed.remove(&element);
            self.registrar.insert(element);
        }
    }

    pub(crate) fn unregister_tree(&mut self, id: ElementId) {
        for element in self.descendants(id) {
            self.registrar.remove(&element);
            self.removed.insert(element);
        }
    }

    // -- Containment ---------------------------------------------------------

    /// `id` followed by everything it carries, depth first.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if out.contains(&current) || !self.elements.contains_key(current) {
                continue;
            }
            out.push(current);
            if let Some(carrier) = self.elements[current].carrier() {
                stack.extend(carrier.contents.iter().rev());
            }
        }
        out
    }

    /// The node or edge reached by walking up an element's containers.
    pub fn location_of(&self, id: ElementId) -> Option<Location> {
        let mut current = id;
        for _ in 0..=self.elements.len() {
            match self.elements.get(current)?.container? {
                Container::Location(location) => return Some(location),
                Container::Element(parent) => current = parent,
            }
        }
        None
    }

    /// Every element at a location, nested contents included.
    pub fn elements_at(&self, location: Location) -> Vec<ElementId> {
        self.network
            .contents(location)
            .iter()
            .flat_map(|id| self.descendants(*id))
            .collect()
    }

    pub fn crew_count(&self, carrier: ElementId) -> u32 {
        self.elements
            .get(carrier)
            .and_then(Element::carrier)
            .map_or(0, |c| {
                c.contents
                    .iter()
                    .filter(|id| self.elements.get(**id).is_some_and(Element::is_crew_member))
                    .count() as u32
            })
    }

    /// Mass of non-crew cargo carried directly by `carrier`.
    pub fn cargo_mass(&self, carrier: ElementId) -> f64 {
        let Some(c) = self.elements.get(carrier).and_then(Element::carrier) else {
            return 0.0;
        };
        let mass = c
            .contents
            .iter()
            .filter(|id| self.elements.get(**id).is_some_and(|e| !e.is_crew_member()))
            .map(|id| self.total_mass(*id))
            .sum();
        self.config.round_mass(mass)
    }

    pub fn cargo_volume(&self, carrier: ElementId) -> f64 {
        let Some(c) = self.elements.get(carrier).and_then(Element::carrier) else {
            return 0.0;
        };
        let volume = c
            .contents
            .iter()
            .filter_map(|id| self.elements.get(*id))
            .filter(|e| !e.is_crew_member())
            .map(|e| e.volume)
            .sum();
        self.config.round_volume(volume)
    }

    /// Mass of an element with everything it holds.
    pub fn total_mass(&self, id: ElementId) -> f64 {
        let mass: f64 = self
            .descendants(id)
            .into_iter()
            .filter_map(|e| self.elements.get(e))
            .map(|e| e.own_mass(&self.config))
            .sum();
        self.config.round_mass(mass)
    }

    /// Mass of class `cos` in an element and everything it holds.
    pub fn total_mass_of(&self, id: ElementId, cos: ClassOfSupply) -> f64 {
        let mass: f64 = self
            .descendants(id)
            .into_iter()
            .filter_map(|e| self.elements.get(e))
            .map(|e| e.own_mass_of(cos, &self.config))
            .sum();
        self.config.round_mass(mass)
    }

    fn carrier_accepts_mass(&self, carrier: ElementId, mass: f64) -> bool {
        self.elements
            .get(carrier)
            .and_then(Element::carrier)
            .is_none_or(|c| {
                self.cargo_mass(carrier) + mass - c.max_cargo_mass
                    <= self.config.mass_precision / 2.0
            })
    }

    /// Whether `container` admits `id`: crew against crew capacity, cargo
    /// against mass, volume and environment limits, and the enclosing
    /// carrier against the added mass.
    pub fn can_add(&self, container: Container, id: ElementId) -> bool {
        let Some(element) = self.elements.get(id) else {
            return false;
        };
        let carrier_id = match container {
            Container::Location(location) => return self.network.contains(location),
            Container::Element(carrier_id) => carrier_id,
        };
        let Some(holder) = self.elements.get(carrier_id) else {
            return false;
        };
        let Some(carrier) = holder.carrier() else {
            return false;
        };
        if carrier.contents.contains(&id) {
            return true;
        }
        if self.descendants(id).contains(&carrier_id) {
            return false;
        }
        if element.is_crew_member() {
            return self.crew_count(carrier_id) < carrier.max_crew_size;
        }
        let config = &self.config;
        let mass = self.total_mass(id);
        if self.cargo_mass(carrier_id) + mass - carrier.max_cargo_mass > config.mass_precision / 2.0 {
            false
        } else if config.volume_constrained
            && self.cargo_volume(carrier_id) + element.volume - carrier.max_cargo_volume
                > config.volume_precision / 2.0
        {
            false
        } else if config.environment_constrained
            && element.environment == Environment::Pressurized
            && carrier.cargo_environment == Environment::Unpressurized
        {
            false
        } else {
            match holder.container {
                Some(Container::Element(parent)) => self.carrier_accepts_mass(parent, mass),
                _ => true,
            }
        }
    }

    /// Move `id` into `container` if admitted. Returns whether it is there.
    pub fn add_to(&mut self, container: Container, id: ElementId) -> bool {
        if self.elements.get(id).is_some_and(|e| e.container == Some(container)) {
            return true;
        }
        if !self.can_add(container, id) {
            return false;
        }
        self.detach(id);
        match container {
            Container::Location(location) => match self.network.contents_mut(location) {
                Some(contents) => contents.push(id),
                None => return false,
            },
            Container::Element(carrier) => {
                match self.elements.get_mut(carrier).and_then(Element::carrier_mut) {
                    Some(c) => c.contents.push(id),
                    None => return false,
                }
            }
        }
        if let Some(element) = self.elements.get_mut(id) {
            element.container = Some(container);
        }
        true
    }

    /// Take `id` out of its container.
    pub fn detach(&mut self, id: ElementId) {
        let Some(container) = self.elements.get_mut(id).and_then(|e| e.container.take()) else {
            return;
        };
        self.remove_from_contents(container, id);
    }

    fn remove_from_contents(&mut self, container: Container, id: ElementId) {
        let contents = match container {
            Container::Location(location) => self.network.contents_mut(location),
            Container::Element(carrier) => self
                .elements
                .get_mut(carrier)
                .and_then(Element::carrier_mut)
                .map(|c| &mut c.contents),
        };
        if let Some(contents) = contents {
            contents.retain(|e| *e != id);
        }
    }

    fn detach_from_others(&mut self, id: ElementId, keep: Container) {
        if let Some(previous) = self.elements.get(id).and_then(|e| e.container) {
            if previous != keep {
                self.remove_from_contents(previous, id);
            }
        }
    }

    // -- Demand --------------------------------------------------------------

    /// Satisfy demands from an element and, for carriers, everything it
    /// carries. Scavenged parts are appended as `(element, part, amount)`.
    pub fn satisfy_demands(
        &mut self,
        id: ElementId,
        demands: &mut DemandSet,
        scavenged: &mut Vec<(ElementId, Resource, f64)>,
    ) {
        let children = {
            let Some(element) = self.elements.get_mut(id) else {
                return;
            };
            for (part, amount) in element.satisfy_own(demands, &self.config) {
                scavenged.push((id, part, amount));
            }
            element
                .carrier()
                .map(|c| c.contents.clone())
                .unwrap_or_default()
        };
        for child in children {
            if demands.is_empty() {
                break;
            }
            self.satisfy_demands(child, demands, scavenged);
        }
    }

    // -- Validation ----------------------------------------------------------

    /// Check configuration, state indices, model wiring, containment, and
    /// the ids referenced by mission events.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.config.clone().validate()?;
        for (id, element) in &self.elements {
            if let Some(index) = element.current_state {
                if index >= element.states.len() {
                    return Err(ScenarioError::InvalidState {
                        element: element.name.clone(),
                        index,
                    });
                }
            }
            for model in element.states.iter().flat_map(|s| &s.demand_models) {
                model.check_context(false).map_err(|source| ScenarioError::Model {
                    owner: element.name.clone(),
                    source,
                })?;
            }
            if element.container.is_some() && self.location_of(id).is_none() && self.in_cycle(id) {
                return Err(ScenarioError::ContainmentCycle {
                    element: element.name.clone(),
                });
            }
        }
        for mission in self.missions.values() {
            for model in &mission.demand_models {
                model.check_context(true).map_err(|source| ScenarioError::Model {
                    owner: mission.name.clone(),
                    source,
                })?;
            }
            for node in [
                mission.origin,
                mission.destination,
                mission.return_origin,
                mission.return_destination,
            ]
            .into_iter()
            .flatten()
            {
                if !self.network.nodes.contains_key(node) {
                    return Err(ScenarioError::UnknownNode(node));
                }
            }
            for event in &mission.events {
                for element in referenced_elements(&event.kind) {
                    if !self.elements.contains_key(element) {
                        return Err(ScenarioError::UnknownElement(element));
                    }
                }
                if let Some(edge) = event.kind.transport_edge() {
                    if !self.network.edges.contains_key(edge) {
                        return Err(ScenarioError::UnknownEdge(edge));
                    }
                }
            }
        }
        Ok(())
    }

    fn in_cycle(&self, id: ElementId) -> bool {
        let mut seen = BTreeSet::new();
        let mut current = id;
        while let Some(Container::Element(parent)) =
            self.elements.get(current).and_then(|e| e.container)
        {
            if !seen.insert(parent) {
                return true;
            }
            current = parent;
        }
        false
    }
}

fn referenced_elements(kind: &EventKind) -> Vec<ElementId> {
    let stage_items = |sequences: &[Vec<BurnStageItem>]| {
        sequences
            .iter()
            .flatten()
            .map(|item| item.element)
            .collect::<Vec<_>>()
    };
    match kind {
        EventKind::Mission(_) => Vec::new(),
        EventKind::Demand { element, .. } | EventKind::Reconfigure { element, .. } => {
            element.iter().copied().collect()
        }
        EventKind::Add { container, .. } => vec![*container],
        EventKind::Remove { elements }
        | EventKind::FlightTransport { elements, .. }
        | EventKind::ReconfigureGroup { elements, .. } => elements.clone(),
        EventKind::Move {
            container,
            elements,
        }
        | EventKind::Create {
            container,
            elements,
        } => {
            let mut ids = elements.clone();
            if let Some(Container::Element(carrier)) = container {
                ids.push(*carrier);
            }
            ids
        }
        EventKind::Transfer {
            origin,
            destination,
            ..
        } => vec![*origin, *destination],
        EventKind::SpaceTransport {
            elements,
            burn_sequences,
            ..
        } => {
            let mut ids = elements.clone();
            ids.extend(stage_items(burn_sequences));
            ids
        }
        EventKind::SurfaceTransport { vehicle, .. } => vec![*vehicle],
        EventKind::Eva {
            vehicle,
            crew_states,
            ..
        }
        | EventKind::Exploration {
            vehicle,
            crew_states,
            ..
        } => std::iter::once(*vehicle)
            .chain(crew_states.iter().map(|(crew, _)| *crew))
            .collect(),
        EventKind::Burn {
            elements, sequence, ..
        } => elements
            .iter()
            .copied()
            .chain(sequence.iter().map(|item| item.element))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::Demand;
    use crate::element::{Carrier, ElementKind, ResourceContainer, State, StateType};
    use crate::model::{CrewConsumablesDemandModel, DemandModel};
    use crate::network::{Body, Node};

    fn scenario() -> (Scenario, NodeId) {
        let mut scenario = Scenario::new("Arena", SimConfig::default());
        let node = scenario.network.add_node(Node::surface("Base", Body::Moon));
        (scenario, node)
    }

    fn lander(max_cargo: f64) -> Element {
        Element::new(
            "Lander",
            ElementKind::Carrier(Carrier::new(max_cargo, Environment::Pressurized, 2)),
        )
        .with_mass(1000.0)
    }

    #[test]
    fn location_walks_up_carriers() {
        let (mut scenario, base) = scenario();
        let lander = scenario.add_element(lander(500.0));
        let crate_ = scenario.add_element(Element::new("Crate", ElementKind::Basic).with_mass(50.0));
        assert!(scenario.add_to(Location::Node(base).into(), lander));
        assert!(scenario.add_to(Container::Element(lander), crate_));
        assert_eq!(scenario.location_of(crate_), Some(Location::Node(base)));
        assert_eq!(scenario.total_mass(lander), 1050.0);
        assert_eq!(scenario.cargo_mass(lander), 50.0);
    }

    #[test]
    fn carrier_rejects_overweight_cargo() {
        let (mut scenario, _) = scenario();
        let lander = scenario.add_element(lander(40.0));
        let crate_ = scenario.add_element(Element::new("Crate", ElementKind::Basic).with_mass(50.0));
        assert!(!scenario.can_add(Container::Element(lander), crate_));
        assert!(!scenario.add_to(Container::Element(lander), crate_));
        assert_eq!(scenario.element(crate_).unwrap().container, None);
    }

    #[test]
    fn crew_counts_against_crew_capacity_only() {
        let (mut scenario, _) = scenario();
        let lander = scenario.add_element(lander(0.0));
        let crew: Vec<_> = (0..3)
            .map(|i| scenario.add_element(Element::crew_member(format!("Crew {i}")).with_mass(80.0)))
            .collect();
        assert!(scenario.add_to(Container::Element(lander), crew[0]));
        assert!(scenario.add_to(Container::Element(lander), crew[1]));
        assert!(!scenario.add_to(Container::Element(lander), crew[2]));
        assert_eq!(scenario.crew_count(lander), 2);
        assert_eq!(scenario.cargo_mass(lander), 0.0);
    }

    #[test]
    fn moving_detaches_from_previous_container() {
        let (mut scenario, base) = scenario();
        let a = scenario.add_element(lander(500.0));
        let b = scenario.add_element(lander(500.0));
        let crate_ = scenario.add_element(Element::new("Crate", ElementKind::Basic).with_mass(5.0));
        scenario.add_to(Location::Node(base).into(), a);
        scenario.add_to(Location::Node(base).into(), b);
        scenario.add_to(Container::Element(a), crate_);
        scenario.add_to(Container::Element(b), crate_);
        assert!(scenario.element(a).unwrap().carrier().unwrap().contents.is_empty());
        assert_eq!(scenario.element(b).unwrap().carrier().unwrap().contents, vec![crate_]);
    }

    #[test]
    fn carrier_cannot_contain_itself() {
        let (mut scenario, _) = scenario();
        let outer = scenario.add_element(lander(5000.0));
        let inner = scenario.add_element(lander(5000.0));
        scenario.pack(outer, inner).unwrap();
        assert!(!scenario.can_add(Container::Element(inner), outer));
    }

    #[test]
    fn satisfaction_recurses_into_carried_containers() {
        let (mut scenario, base) = scenario();
        let water = Resource::generic(ClassOfSupply::COS201);
        let lander = scenario.add_element(lander(500.0));
        let tank = scenario.add_element(Element::new(
            "Water bag",
            ElementKind::ResourceContainer(
                ResourceContainer::new(100.0, 1.0, Environment::Pressurized).with_stock(water.clone(), 40.0),
            ),
        ));
        scenario.add_to(Location::Node(base).into(), lander);
        scenario.pack(lander, tank).unwrap();
        let mut demands: DemandSet = vec![Demand::new(water.clone(), 25.0)].into();
        let mut scavenged = Vec::new();
        scenario.satisfy_demands(lander, &mut demands, &mut scavenged);
        assert!(demands.is_empty());
        assert!(scavenged.is_empty());
        let bag = scenario.element(tank).unwrap().resource_container().unwrap();
        assert_eq!(bag.amount_of(&water), 15.0);
    }

    #[test]
    fn registrar_tracks_nested_contents() {
        let (mut scenario, _) = scenario();
        let lander = scenario.add_element(lander(500.0));
        let crate_ = scenario.add_element(Element::new("Crate", ElementKind::Basic));
        scenario.pack(lander, crate_).unwrap();
        scenario.register_tree(lander);
        assert!(scenario.is_live(crate_));
        scenario.unregister_tree(lander);
        assert!(!scenario.is_live(crate_));
        assert_eq!(scenario.removed_elements().count(), 2);
    }

    #[test]
    fn validate_rejects_misplaced_models() {
        let (mut scenario, _) = scenario();
        let crew_model = DemandModel::CrewConsumables(CrewConsumablesDemandModel::default());
        scenario.add_element(
            Element::new("Hab", ElementKind::Basic)
                .with_state(State::new("Active", StateType::Active).with_model(crew_model)),
        );
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::Model { .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_state_index() {
        let (mut scenario, _) = scenario();
        let mut hab = Element::new("Hab", ElementKind::Basic);
        hab.current_state = Some(3);
        scenario.add_element(hab);
        assert_eq!(
            scenario.validate(),
            Err(ScenarioError::InvalidState {
                element: "Hab".into(),
                index: 3
            })
        );
    }

    #[test]
    fn pack_requires_a_carrier() {
        let (mut scenario, _) = scenario();
        let rock = scenario.add_element(Element::new("Rock", ElementKind::Basic));
        let pebble = scenario.add_element(Element::new("Pebble", ElementKind::Basic));
        assert_eq!(
            scenario.pack(rock, pebble),
            Err(ScenarioError::NotACarrier {
                element: "Rock".into()
            })
        );
    }
}
