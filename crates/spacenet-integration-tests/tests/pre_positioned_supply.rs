//! Integration test: Pre-Positioned Supply
//!
//! A cargo mission lands a water container at the site one day before a
//! crewed sortie. The sortie's mission-level water demand is drawn from the
//! container, so only the classes nobody shipped remain unmet. The supply
//! aggregator then buckets those shortfalls at the sortie's arrival.

use spacenet_core::config::SimConfig;
use spacenet_core::cos::ClassOfSupply;
use spacenet_core::event::{Event, EventKind};
use spacenet_core::id::ElementId;
use spacenet_core::mission::Mission;
use spacenet_core::network::Location;
use spacenet_core::scenario::Scenario;
use spacenet_core::simulator::{Simulator, SupplyAggregator};
use spacenet_core::test_utils::*;

struct Campaign {
    scenario: Scenario,
    network: EarthMoon,
    depot: ElementId,
}

fn cargo_then_crew(water_shipped: f64) -> Campaign {
    let mut scenario = Scenario::new("Cargo Then Crew", SimConfig::default());
    let network = earth_moon(&mut scenario);
    let depot = scenario.add_element(stocked_container("Water Depot", water(), water_shipped));
    scenario.add_mission(
        Mission::new("Cargo Delivery", 0.0)
            .with_route(network.ksc, network.site)
            .with_event(create_at(
                "Stack Cargo",
                0.0,
                Location::Node(network.ksc).into(),
                vec![depot],
                network.ksc,
            ))
            .with_event(
                Event::new(
                    "Cargo Descent",
                    0.0,
                    EventKind::FlightTransport {
                        edge: network.descent,
                        elements: vec![depot],
                    },
                )
                .at(network.ksc)
                .with_priority(1),
            ),
    );
    add_sortie(&mut scenario, &network, "Sortie", 1.0, 4, 10.0);
    Campaign {
        scenario,
        network,
        depot,
    }
}

fn water_left(sim: &Simulator, depot: ElementId) -> f64 {
    sim.scenario()
        .element(depot)
        .and_then(|e| e.resource_container())
        .map_or(0.0, |c| c.amount_of(&water()))
}

#[test]
fn shipped_water_covers_the_sortie() {
    let campaign = cargo_then_crew(200.0);
    let site = Location::Node(campaign.network.site);
    let mut sim = Simulator::new(campaign.scenario);
    sim.simulate().unwrap();
    let log = sim.log();

    assert!(log.spatial_errors.is_empty());
    assert!(log.total_at(site, Some(ClassOfSupply::COS201)).is_empty());
    assert!(!log.total_at(site, Some(ClassOfSupply::COS202)).is_empty());
    assert_eq!(sim.scenario().location_of(campaign.depot), Some(site));
    assert!((water_left(&sim, campaign.depot) - (200.0 - 83.52)).abs() < 1e-6);
}

#[test]
fn short_shipment_leaves_the_remainder_unmet() {
    let campaign = cargo_then_crew(50.0);
    let site = Location::Node(campaign.network.site);
    let mut sim = Simulator::new(campaign.scenario);
    sim.simulate().unwrap();
    let log = sim.log();

    let unmet = log.total_at(site, Some(ClassOfSupply::COS201)).amount_of(&water());
    assert!((unmet - 33.52).abs() < 1e-6);
    assert!(water_left(&sim, campaign.depot).abs() < 1e-9);
}

#[test]
fn supply_point_collects_what_was_not_shipped() {
    let campaign = cargo_then_crew(200.0);
    let site = campaign.network.site;
    let mut supply = SupplyAggregator::new(campaign.scenario);
    supply.simulate().unwrap();

    assert!(supply.gaps().is_empty());
    let at_site: Vec<_> = supply
        .points()
        .iter()
        .filter(|(point, demands)| point.node == site && !demands.is_empty())
        .collect();
    assert_eq!(at_site.len(), 1);
    let (point, demands) = at_site[0];
    assert_eq!(point.time, 1.0);
    assert_eq!(demands.amount_of(&water()), 0.0);
    assert!(demands.amount_of(&food()) > 0.0);
}
