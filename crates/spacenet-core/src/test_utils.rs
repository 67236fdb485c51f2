//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::config::SimConfig;
use crate::cos::ClassOfSupply;
use crate::demand::Demand;
use crate::element::{Carrier, Element, ElementKind, ResourceContainer, State, StateType};
use crate::event::{Event, EventKind};
use crate::id::{EdgeId, ElementId, MissionId, NodeId};
use crate::mission::Mission;
use crate::model::{CrewConsumablesDemandModel, DemandModel, RatedDemandModel};
use crate::network::{Body, Container, Edge, EdgeKind, Location, Node};
use crate::resource::{Environment, Resource};
use crate::scenario::Scenario;

// ===========================================================================
// Resources
// ===========================================================================

pub fn water() -> Resource {
    Resource::generic(ClassOfSupply::COS201)
}

pub fn food() -> Resource {
    Resource::generic(ClassOfSupply::COS202)
}

pub fn oxygen() -> Resource {
    Resource::generic(ClassOfSupply::COS203)
}

pub fn spares() -> Resource {
    Resource::generic(ClassOfSupply::COS4)
}

// ===========================================================================
// Elements
// ===========================================================================

/// A state consuming `rate` units of `resource` per day.
pub fn consuming(name: &str, resource: Resource, rate: f64) -> State {
    State::new(name, StateType::Active).with_model(DemandModel::Rated(RatedDemandModel::new(
        vec![Demand::new(resource, rate)].into(),
    )))
}

/// A pressurized habitat drinking `water_rate` per day.
pub fn habitat(name: &str, water_rate: f64) -> Element {
    Element::new(
        name,
        ElementKind::Carrier(Carrier::new(5_000.0, Environment::Pressurized, 4)),
    )
    .with_mass(10_000.0)
    .with_environment(Environment::Pressurized)
    .with_state(consuming("Active", water(), water_rate))
}

/// A pressurized container stocked with `amount` of `resource`.
pub fn stocked_container(name: &str, resource: Resource, amount: f64) -> Element {
    Element::new(
        name,
        ElementKind::ResourceContainer(
            ResourceContainer::new(amount.max(1.0) * 2.0, 10.0, Environment::Pressurized)
                .with_stock(resource, amount),
        ),
    )
    .with_mass(50.0)
}

pub fn lander(name: &str) -> Element {
    Element::new(
        name,
        ElementKind::Carrier(Carrier::new(2_000.0, Environment::Pressurized, 4)),
    )
    .with_mass(8_000.0)
}

// ===========================================================================
// Network
// ===========================================================================

/// Earth launch site, a lunar surface site, and zero-duration flight edges
/// between them.
pub struct EarthMoon {
    pub ksc: NodeId,
    pub site: NodeId,
    pub descent: EdgeId,
    pub ascent: EdgeId,
}

pub fn earth_moon(scenario: &mut Scenario) -> EarthMoon {
    let ksc = scenario.network.add_node(Node::surface("KSC", Body::Earth));
    let site = scenario.network.add_node(Node::surface("Shackleton", Body::Moon));
    let flight = || EdgeKind::Flight {
        duration: 0.0,
        max_crew: 4,
        max_cargo_mass: 50_000.0,
    };
    let descent = scenario.network.add_edge(Edge::new("Descent", ksc, site, flight()));
    let ascent = scenario.network.add_edge(Edge::new("Ascent", site, ksc, flight()));
    EarthMoon {
        ksc,
        site,
        descent,
        ascent,
    }
}

// ===========================================================================
// Missions
// ===========================================================================

pub fn create_at(name: &str, time: f64, container: Container, elements: Vec<ElementId>, at: NodeId) -> Event {
    Event::new(
        name,
        time,
        EventKind::Create {
            container: Some(container),
            elements,
        },
    )
    .at(at)
}

/// A crewed round trip: a lander carries `crew_size` crew from KSC to the
/// site, stays `stay_days`, and returns. The mission uses default crew
/// consumables.
pub struct Sortie {
    pub mission: MissionId,
    pub lander: ElementId,
    pub crew: Vec<ElementId>,
}

pub fn add_sortie(
    scenario: &mut Scenario,
    network: &EarthMoon,
    name: &str,
    start: f64,
    crew_size: u32,
    stay_days: f64,
) -> Sortie {
    let lander = scenario.add_element(lander(&format!("{name} Lander")));
    let crew: Vec<ElementId> = (0..crew_size)
        .map(|i| scenario.add_element(Element::crew_member(format!("{name} Crew {}", i + 1))))
        .collect();
    let mission = Mission::new(name, start)
        .with_route(network.ksc, network.site)
        .with_return(network.site, network.ksc)
        .with_model(DemandModel::CrewConsumables(CrewConsumablesDemandModel::default()))
        .with_event(create_at(
            "Stack Lander",
            0.0,
            Location::Node(network.ksc).into(),
            vec![lander],
            network.ksc,
        ))
        .with_event(create_at(
            "Board Crew",
            0.0,
            Container::Element(lander),
            crew.clone(),
            network.ksc,
        ))
        .with_event(
            Event::new(
                "Descent",
                0.0,
                EventKind::FlightTransport {
                    edge: network.descent,
                    elements: vec![lander],
                },
            )
            .at(network.ksc)
            .with_priority(1),
        )
        .with_event(
            Event::new(
                "Ascent",
                stay_days,
                EventKind::FlightTransport {
                    edge: network.ascent,
                    elements: vec![lander],
                },
            )
            .at(network.site),
        );
    let mission = scenario.add_mission(mission);
    Sortie {
        mission,
        lander,
        crew,
    }
}

/// A single crewed sortie with nothing pre-positioned at the site.
pub fn single_sortie(crew_size: u32, stay_days: f64) -> (Scenario, EarthMoon, Sortie) {
    let mut scenario = Scenario::new("Single Sortie", SimConfig::default());
    let network = earth_moon(&mut scenario);
    let sortie = add_sortie(&mut scenario, &network, "Sortie", 0.0, crew_size, stay_days);
    (scenario, network, sortie)
}

/// `missions` sorties thirty days apart to an outpost whose habitat draws
/// water from a depot.
pub fn outpost_campaign(missions: usize) -> Scenario {
    let mut scenario = Scenario::new("Outpost Campaign", SimConfig::default());
    let network = earth_moon(&mut scenario);
    let hab = scenario.add_element(habitat("Outpost Hab", 2.0));
    let depot = scenario.add_element(stocked_container("Water Depot", water(), 1_000.0));
    scenario.add_mission(Mission::new("Outpost Setup", 0.0).with_event(create_at(
        "Deploy Outpost",
        0.0,
        Location::Node(network.site).into(),
        vec![hab, depot],
        network.site,
    )));
    for i in 0..missions {
        add_sortie(
            &mut scenario,
            &network,
            &format!("Sortie {}", i + 1),
            1.0 + 30.0 * i as f64,
            2,
            14.0,
        );
    }
    scenario
}
