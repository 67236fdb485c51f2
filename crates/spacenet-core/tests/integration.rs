//! End-to-end runs of the simulator and its variants over small campaigns.

use spacenet_core::config::SimConfig;
use spacenet_core::cos::ClassOfSupply;
use spacenet_core::element::{Element, ElementKind, State, StateType};
use spacenet_core::event::{Event, EventKind};
use spacenet_core::mission::Mission;
use spacenet_core::model::{DemandModel, SparingByMassDemandModel};
use spacenet_core::network::{Body, Location, Node};
use spacenet_core::resource::{Environment, Resource};
use spacenet_core::scenario::Scenario;
use spacenet_core::simulator::{
    CrewTimeCategory, FastForward, MoeCollector, Simulator, StateHistory, SupplyAggregator,
};
use spacenet_core::test_utils::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

// ===========================================================================
// Test 1: Crew consumables for a ten-day sortie
// ===========================================================================

/// Four crew spend ten days at a site with nothing pre-positioned. The
/// mission's water demand (3.6 kg/crew/day, 42% recovered) goes unmet at
/// the destination.
#[test]
fn crewed_sortie_water_demand_is_logged_at_site() {
    let (scenario, network, _) = single_sortie(4, 10.0);
    let mut sim = Simulator::new(scenario);
    sim.simulate().unwrap();
    let log = sim.log();

    let site = Location::Node(network.site);
    let water_short = log.total_at(site, Some(ClassOfSupply::COS201));
    assert!(approx(water_short.amount_of(&water()), 83.52));

    // Mission-level demand carries no element.
    assert!(
        log.unsatisfied_demands
            .iter()
            .filter(|d| d.location == Some(site))
            .all(|d| d.element.is_none())
    );
    assert!(log.spatial_errors.is_empty());
}

// ===========================================================================
// Test 2: Sparing by mass over one year
// ===========================================================================

/// A 1000 kg element at 12%/yr pressurized sparing, parts list disabled,
/// runs for 365 days: 120 kg of pressurized spares and none unpressurized.
#[test]
fn sparing_by_mass_for_one_year() {
    let mut scenario = Scenario::new("Sparing", SimConfig::default());
    let base = scenario.network.add_node(Node::surface("Base", Body::Moon));
    let hab = scenario.add_element(
        Element::new("Hab", ElementKind::Basic).with_mass(1_000.0).with_state(
            State::new("Active", StateType::Active).with_model(DemandModel::SparingByMass(
                SparingByMassDemandModel::new(0.0, 0.12, false),
            )),
        ),
    );
    scenario.add_mission(
        Mission::new("Year on the Moon", 0.0)
            .with_event(create_at("Deploy Hab", 0.0, Location::Node(base).into(), vec![hab], base))
            .with_event(Event::new("Retire Hab", 365.0, EventKind::Remove { elements: vec![hab] }).at(base)),
    );

    let mut sim = Simulator::new(scenario);
    sim.simulate().unwrap();
    let log = sim.log();
    let spares = log.total_for_element(hab, Some(ClassOfSupply::COS4));
    let pressurized = Resource::generic_in(ClassOfSupply::COS4, Environment::Pressurized);
    let unpressurized = Resource::generic_in(ClassOfSupply::COS4, Environment::Unpressurized);
    assert!(approx(spares.amount_of(&pressurized), 120.0));
    assert!(approx(spares.amount_of(&unpressurized), 0.0));
}

// ===========================================================================
// Test 3: Determinism
// ===========================================================================

#[test]
fn identical_runs_have_identical_fingerprints() {
    let scenario = outpost_campaign(3);

    let mut first = Simulator::new(scenario.clone());
    first.simulate().unwrap();
    let mut second = Simulator::new(scenario);
    second.simulate().unwrap();

    assert_eq!(first.log(), second.log());
    assert_eq!(
        first.report().fingerprint().unwrap(),
        second.report().fingerprint().unwrap()
    );
}

#[test]
fn rerunning_one_simulator_is_deterministic() {
    let mut sim = Simulator::new(outpost_campaign(2));
    let first = sim.simulate().unwrap().clone();
    let second = sim.simulate().unwrap().clone();
    assert_eq!(first, second);
}

// ===========================================================================
// Test 4: Log ordering
// ===========================================================================

#[test]
fn unmet_demands_are_logged_in_time_order() {
    let mut sim = Simulator::new(outpost_campaign(3));
    sim.simulate().unwrap();
    let log = sim.log();
    assert!(!log.unsatisfied_demands.is_empty());
    assert!(
        log.unsatisfied_demands
            .windows(2)
            .all(|pair| pair[0].time <= pair[1].time)
    );
    assert_eq!(log.demands_by_time(), log.unsatisfied_demands);
}

// ===========================================================================
// Test 5: Outpost campaign
// ===========================================================================

/// The depot covers both the habitat and the sorties' water, so only other
/// classes of supply run short.
#[test]
fn outpost_depot_covers_water() {
    let scenario = outpost_campaign(3);
    let mut sim = Simulator::new(scenario);
    sim.simulate().unwrap();
    let log = sim.log();

    let site = sim
        .scenario()
        .network
        .nodes
        .iter()
        .find(|(_, n)| n.name == "Shackleton")
        .map(|(id, _)| Location::Node(id))
        .unwrap();
    assert!(log.total_at(site, Some(ClassOfSupply::COS201)).is_empty());
    assert!(!log.total_at(site, Some(ClassOfSupply::COS202)).is_empty());
}

#[test]
fn elements_end_where_their_missions_leave_them() {
    let (scenario, network, sortie) = single_sortie(2, 7.0);
    let mut sim = Simulator::new(scenario);
    sim.simulate().unwrap();

    let end = sim.scenario();
    assert_eq!(end.location_of(sortie.lander), Some(Location::Node(network.ksc)));
    for crew in &sortie.crew {
        assert_eq!(end.location_of(*crew), Some(Location::Node(network.ksc)));
    }
}

// ===========================================================================
// Test 6: Variants agree with the full run
// ===========================================================================

#[test]
fn fast_forward_to_the_end_matches_full_run() {
    let scenario = outpost_campaign(2);

    let mut full = Simulator::new(scenario.clone());
    full.simulate().unwrap();

    let mut ff = FastForward::new(scenario);
    ff.run_all().unwrap();
    assert_eq!(ff.simulator().log(), full.log());
}

#[test]
fn fast_forward_stops_before_the_ascent() {
    let (scenario, network, sortie) = single_sortie(2, 10.0);
    let mut ff = FastForward::new(scenario);
    ff.run_to_time(5.0).unwrap();

    let sim = ff.simulator();
    assert!(approx(sim.clock(), 5.0));
    assert_eq!(
        sim.scenario().location_of(sortie.lander),
        Some(Location::Node(network.site))
    );
    assert!(sim.next_event().is_some());
}

#[test]
fn state_history_tracks_the_lander() {
    let (scenario, network, sortie) = single_sortie(2, 10.0);
    let mut history = StateHistory::new(scenario);
    history.simulate().unwrap();

    let on_site = history.at(5.0).unwrap();
    assert_eq!(on_site.location(sortie.lander), Some(Location::Node(network.site)));
    let last = history.records().last().unwrap();
    assert_eq!(last.location(sortie.lander), Some(Location::Node(network.ksc)));
}

#[test]
fn supply_aggregator_charges_the_site() {
    let (scenario, network, _) = single_sortie(4, 10.0);
    let mut supply = SupplyAggregator::new(scenario);
    supply.simulate().unwrap();

    let at_site: f64 = supply
        .points()
        .iter()
        .filter(|(point, _)| point.node == network.site)
        .map(|(_, demands)| demands.amount_of(&water()))
        .sum();
    assert!(approx(at_site, 83.52));
}

#[test]
fn moe_collector_counts_crew_surface_days() {
    let (scenario, _, _) = single_sortie(4, 10.0);
    let mut moe = MoeCollector::new(scenario);
    let report = moe.simulate().unwrap();

    assert!((report.crew_surface_days - 40.0).abs() < 1e-6);
    assert!(report.launch_mass >= 8_000.0);
    assert!(moe.crew_time_in(CrewTimeCategory::Exploration) > 0.0);
}
