//! Elements: the physical objects that move through the network.
//!
//! An [`Element`] is a closed sum over its kinds ([`ElementKind`]). Kinds that
//! hold other elements ([`Carrier`]) store child ids only; containment across
//! elements is resolved by the [`Scenario`](crate::scenario::Scenario) arena.
//! Kinds that hold resources ([`ResourceContainer`], [`ResourceTank`]) own
//! their inventory directly.

use crate::config::SimConfig;
use crate::cos::ClassOfSupply;
use crate::demand::{Demand, DemandSet};
use crate::id::ElementId;
use crate::model::{DemandModel, ElementProfile, ModelContext, ModelError};
use crate::network::{BurnType, Container};
use crate::resource::{Environment, Resource};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Operational category of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateType {
    Active,
    Special,
    Quiescent,
    Dormant,
    Decommissioned,
}

/// An operational state of an element and the demand it generates while
/// the element is in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub name: String,
    pub state_type: StateType,
    pub demand_models: Vec<DemandModel>,
}

impl State {
    pub fn new(name: impl Into<String>, state_type: StateType) -> Self {
        Self {
            name: name.into(),
            state_type,
            demand_models: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: DemandModel) -> Self {
        self.demand_models.push(model);
        self
    }

    /// Sum the demand of every model over `duration` days.
    pub fn generate(
        &mut self,
        duration: f64,
        element: ElementProfile<'_>,
    ) -> Result<DemandSet, ModelError> {
        let mut demands = DemandSet::new();
        for model in &mut self.demand_models {
            demands.add_all(model.generate(duration, ModelContext::Element(element))?);
        }
        Ok(demands)
    }
}

// ---------------------------------------------------------------------------
// Parts
// ---------------------------------------------------------------------------

/// A part installed in an element, with its reliability and repair data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartApplication {
    pub part: Resource,
    /// Mean time to failure in hours.
    pub mean_time_to_failure: f64,
    /// Mean time to repair in crew-hours.
    pub mean_time_to_repair: f64,
    /// Mass of material consumed repairing one unit.
    pub mass_to_repair: f64,
    pub quantity: f64,
    pub duty_cycle: f64,
}

impl PartApplication {
    pub fn new(part: Resource, quantity: f64) -> Self {
        Self {
            part,
            mean_time_to_failure: 0.0,
            mean_time_to_repair: 0.0,
            mass_to_repair: 0.0,
            quantity,
            duty_cycle: 1.0,
        }
    }

    pub fn with_repair(mut self, mean_time_to_repair: f64, mass_to_repair: f64) -> Self {
        self.mean_time_to_repair = mean_time_to_repair;
        self.mass_to_repair = mass_to_repair;
        self
    }

    pub fn with_failure_rate(mut self, mean_time_to_failure: f64, duty_cycle: f64) -> Self {
        self.mean_time_to_failure = mean_time_to_failure;
        self.duty_cycle = duty_cycle;
        self
    }
}

// ---------------------------------------------------------------------------
// Resource containers
// ---------------------------------------------------------------------------

/// A container of loose resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceContainer {
    /// Amounts on hand, one entry per resource.
    pub contents: DemandSet,
    pub max_cargo_mass: f64,
    pub max_cargo_volume: f64,
    pub cargo_environment: Environment,
}

impl ResourceContainer {
    pub fn new(max_cargo_mass: f64, max_cargo_volume: f64, cargo_environment: Environment) -> Self {
        Self {
            contents: DemandSet::new(),
            max_cargo_mass,
            max_cargo_volume,
            cargo_environment,
        }
    }

    /// Builder-style stocking that bypasses capacity checks.
    pub fn with_stock(mut self, resource: Resource, amount: f64) -> Self {
        self.contents.add(Demand::new(resource, amount));
        self
    }

    pub fn cargo_mass(&self, config: &SimConfig) -> f64 {
        self.contents.total_mass(config)
    }

    pub fn cargo_volume(&self, config: &SimConfig) -> f64 {
        self.contents.total_volume(config)
    }

    pub fn amount_of(&self, resource: &Resource) -> f64 {
        self.contents.amount_of(resource)
    }

    /// Whether `amount` of `resource` fits by mass, by volume (when
    /// constrained), and by environment (when constrained).
    pub fn can_add(&self, resource: &Resource, amount: f64, config: &SimConfig) -> bool {
        if self.cargo_mass(config) + resource.unit_mass * amount - self.max_cargo_mass
            > config.mass_precision / 2.0
        {
            false
        } else if config.volume_constrained
            && self.cargo_volume(config) + resource.unit_volume * amount - self.max_cargo_volume
                > config.volume_precision / 2.0
        {
            false
        } else {
            !(config.environment_constrained
                && resource.environment == Environment::Pressurized
                && self.cargo_environment == Environment::Unpressurized)
        }
    }

    /// Add resources if they fit. Returns whether they were added.
    #[must_use = "a refused add leaves the container unchanged"]
    pub fn add(&mut self, resource: Resource, amount: f64, config: &SimConfig) -> bool {
        if self.can_add(&resource, amount, config) {
            self.contents.add(Demand::new(resource, amount));
            true
        } else {
            false
        }
    }

    /// Remove exactly `amount` of `resource`. Fails without change when less
    /// is on hand.
    #[must_use = "a refused remove leaves the container unchanged"]
    pub fn remove(&mut self, resource: &Resource, amount: f64) -> bool {
        let on_hand = self.contents.amount_of(resource);
        if self.contents.get(resource).is_none() || on_hand < amount {
            return false;
        }
        if on_hand == amount {
            self.contents.retain(|d| d.resource != *resource);
        } else {
            let mut taken = Demand::new(resource.clone(), amount);
            self.contents.remove(&mut taken);
        }
        true
    }

    /// Satisfy consumption from stock and absorb production into free
    /// capacity. Exploration demand (class 6) is met without depleting stock.
    pub fn satisfy(&mut self, demands: &mut DemandSet, config: &SimConfig) {
        for demand in demands.iter_mut() {
            if demand.amount > 0.0 {
                let conserved = demand.resource.cos.is_instance_of(ClassOfSupply::COS6);
                for stock in self.contents.iter_mut() {
                    if !stock.resource.is_substitutable_for(&demand.resource) {
                        continue;
                    }
                    if demand.amount >= stock.amount {
                        demand.amount -= stock.amount;
                        if !conserved {
                            stock.amount = 0.0;
                        }
                    } else {
                        if !conserved {
                            stock.amount -= demand.amount;
                        }
                        demand.amount = 0.0;
                        break;
                    }
                }
            } else if demand.amount < 0.0 {
                let room_mass = (self.max_cargo_mass - self.cargo_mass(config)).max(0.0);
                let room = if demand.resource.unit_mass > 0.0 {
                    room_mass / demand.resource.unit_mass
                } else {
                    f64::INFINITY
                };
                let produced = (-demand.amount).min(room);
                if produced > 0.0 {
                    self.contents
                        .add(Demand::new(demand.resource.clone(), produced));
                    demand.amount += produced;
                }
            }
        }
        demands.clean(config);
    }
}

// ---------------------------------------------------------------------------
// Resource tanks
// ---------------------------------------------------------------------------

/// A tank holding a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTank {
    pub resource: Resource,
    pub amount: f64,
    pub max_amount: f64,
}

impl ResourceTank {
    pub fn new(resource: Resource, amount: f64, max_amount: f64) -> Self {
        Self {
            resource,
            amount,
            max_amount,
        }
    }

    pub fn mass(&self) -> f64 {
        self.resource.unit_mass * self.amount
    }

    pub fn can_add(&self, resource: &Resource, amount: f64, config: &SimConfig) -> bool {
        *resource == self.resource
            && self.amount + amount - self.max_amount <= config.demand_precision / 2.0
    }

    #[must_use = "a refused add leaves the tank unchanged"]
    pub fn add(&mut self, resource: &Resource, amount: f64, config: &SimConfig) -> bool {
        if self.can_add(resource, amount, config) {
            self.amount = (self.amount + amount).min(self.max_amount);
            true
        } else {
            false
        }
    }

    #[must_use = "a refused remove leaves the tank unchanged"]
    pub fn remove(&mut self, resource: &Resource, amount: f64) -> bool {
        if *resource == self.resource && self.amount - amount >= 0.0 {
            self.amount -= amount;
            true
        } else {
            false
        }
    }

    pub fn satisfy(&mut self, demands: &mut DemandSet, config: &SimConfig) {
        for demand in demands.iter_mut() {
            if !demand.resource.is_substitutable_for(&self.resource) {
                continue;
            }
            if demand.amount > 0.0 {
                let drawn = demand.amount.min(self.amount);
                self.amount -= drawn;
                demand.amount -= drawn;
            } else {
                let filled = (-demand.amount).min(self.max_amount - self.amount).max(0.0);
                self.amount += filled;
                demand.amount += filled;
            }
        }
        demands.clean(config);
    }
}

// ---------------------------------------------------------------------------
// Carriers and vehicles
// ---------------------------------------------------------------------------

/// Capacity and contents of an element that carries other elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    /// Directly carried elements, in loading order.
    pub contents: Vec<ElementId>,
    pub max_cargo_mass: f64,
    pub max_cargo_volume: f64,
    pub cargo_environment: Environment,
    pub max_crew_size: u32,
}

impl Carrier {
    pub fn new(max_cargo_mass: f64, cargo_environment: Environment, max_crew_size: u32) -> Self {
        Self {
            contents: Vec::new(),
            max_cargo_mass,
            max_cargo_volume: 0.0,
            cargo_environment,
            max_crew_size,
        }
    }

    pub fn with_max_cargo_volume(mut self, volume: f64) -> Self {
        self.max_cargo_volume = volume;
        self
    }
}

/// In-space propulsion of a vehicle. A vehicle without a dedicated RCS tank
/// feeds RCS burns from its OMS tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Propulsion {
    pub oms_isp: f64,
    pub rcs_isp: f64,
    pub oms_tank: Option<ResourceTank>,
    pub rcs_tank: Option<ResourceTank>,
}

impl Propulsion {
    pub fn isp(&self, burn_type: BurnType) -> f64 {
        match burn_type {
            BurnType::Oms => self.oms_isp,
            BurnType::Rcs => self.rcs_isp,
        }
    }

    /// Tank feeding the given burn type.
    pub fn tank_mut(&mut self, burn_type: BurnType) -> Option<&mut ResourceTank> {
        match burn_type {
            BurnType::Oms => self.oms_tank.as_mut(),
            BurnType::Rcs => self.rcs_tank.as_mut().or(self.oms_tank.as_mut()),
        }
    }

    fn tanks(&self) -> impl Iterator<Item = &ResourceTank> {
        self.oms_tank.iter().chain(self.rcs_tank.iter())
    }

    fn tanks_mut(&mut self) -> impl Iterator<Item = &mut ResourceTank> {
        self.oms_tank.iter_mut().chain(self.rcs_tank.iter_mut())
    }
}

/// Surface mobility of a rover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMobility {
    /// Kilometers per hour.
    pub max_speed: f64,
    pub fuel_tank: Option<ResourceTank>,
}

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

pub const DEFAULT_AVAILABLE_TIME_FRACTION: f64 = 0.667;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    Basic,
    ResourceContainer(ResourceContainer),
    ResourceTank(ResourceTank),
    Carrier(Carrier),
    PropulsiveVehicle(Carrier, Propulsion),
    SurfaceVehicle(Carrier, SurfaceMobility),
    CrewMember {
        /// Fraction of each day available for work.
        available_time_fraction: f64,
    },
}

/// A physical object in the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub cos: ClassOfSupply,
    pub environment: Environment,
    /// Dry mass in kilograms.
    pub mass: f64,
    pub volume: f64,
    pub parts: Vec<PartApplication>,
    pub states: Vec<State>,
    /// Index into `states`. No current state means no demand.
    pub current_state: Option<usize>,
    /// Direct container, `None` until the element is created in a scenario.
    pub container: Option<Container>,
    pub kind: ElementKind,
}

impl Element {
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        let cos = match kind {
            ElementKind::ResourceContainer(_) => ClassOfSupply::COS501,
            ElementKind::Carrier(_)
            | ElementKind::PropulsiveVehicle(..)
            | ElementKind::SurfaceVehicle(..) => ClassOfSupply::COS9,
            _ => ClassOfSupply::COS0,
        };
        Self {
            name: name.into(),
            cos,
            environment: Environment::Unpressurized,
            mass: 0.0,
            volume: 0.0,
            parts: Vec::new(),
            states: Vec::new(),
            current_state: None,
            container: None,
            kind,
        }
    }

    pub fn crew_member(name: impl Into<String>) -> Self {
        Self::new(
            name,
            ElementKind::CrewMember {
                available_time_fraction: DEFAULT_AVAILABLE_TIME_FRACTION,
            },
        )
        .with_environment(Environment::Pressurized)
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_cos(mut self, cos: ClassOfSupply) -> Self {
        self.cos = cos;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_part(mut self, part: PartApplication) -> Self {
        self.parts.push(part);
        self
    }

    /// Append a state. The first state added becomes the current state.
    pub fn with_state(mut self, state: State) -> Self {
        self.states.push(state);
        if self.current_state.is_none() {
            self.current_state = Some(0);
        }
        self
    }

    pub fn current_state(&self) -> Option<&State> {
        self.current_state.and_then(|i| self.states.get(i))
    }

    /// Index of the first state of the given type.
    pub fn state_of_type(&self, state_type: StateType) -> Option<usize> {
        self.states.iter().position(|s| s.state_type == state_type)
    }

    pub fn is_decommissioned(&self) -> bool {
        self.current_state()
            .is_some_and(|s| s.state_type == StateType::Decommissioned)
    }

    pub fn is_crew_member(&self) -> bool {
        matches!(self.kind, ElementKind::CrewMember { .. })
    }

    pub fn available_time_fraction(&self) -> Option<f64> {
        match self.kind {
            ElementKind::CrewMember {
                available_time_fraction,
            } => Some(available_time_fraction),
            _ => None,
        }
    }

    pub fn carrier(&self) -> Option<&Carrier> {
        match &self.kind {
            ElementKind::Carrier(c)
            | ElementKind::PropulsiveVehicle(c, _)
            | ElementKind::SurfaceVehicle(c, _) => Some(c),
            _ => None,
        }
    }

    pub fn carrier_mut(&mut self) -> Option<&mut Carrier> {
        match &mut self.kind {
            ElementKind::Carrier(c)
            | ElementKind::PropulsiveVehicle(c, _)
            | ElementKind::SurfaceVehicle(c, _) => Some(c),
            _ => None,
        }
    }

    pub fn resource_container(&self) -> Option<&ResourceContainer> {
        match &self.kind {
            ElementKind::ResourceContainer(c) => Some(c),
            _ => None,
        }
    }

    pub fn resource_container_mut(&mut self) -> Option<&mut ResourceContainer> {
        match &mut self.kind {
            ElementKind::ResourceContainer(c) => Some(c),
            _ => None,
        }
    }

    pub fn propulsion(&self) -> Option<&Propulsion> {
        match &self.kind {
            ElementKind::PropulsiveVehicle(_, p) => Some(p),
            _ => None,
        }
    }

    pub fn propulsion_mut(&mut self) -> Option<&mut Propulsion> {
        match &mut self.kind {
            ElementKind::PropulsiveVehicle(_, p) => Some(p),
            _ => None,
        }
    }

    pub fn max_speed(&self) -> Option<f64> {
        match &self.kind {
            ElementKind::SurfaceVehicle(_, mobility) => Some(mobility.max_speed),
            _ => None,
        }
    }

    // -- Mass --------------------------------------------------------------

    /// Mass of the element with its resources and tanks, excluding carried
    /// elements.
    pub fn own_mass(&self, config: &SimConfig) -> f64 {
        let held = match &self.kind {
            ElementKind::ResourceContainer(c) => c.cargo_mass(config),
            ElementKind::ResourceTank(t) => t.mass(),
            ElementKind::PropulsiveVehicle(_, p) => p.tanks().map(ResourceTank::mass).sum(),
            ElementKind::SurfaceVehicle(_, m) => m.fuel_tank.as_ref().map_or(0.0, ResourceTank::mass),
            _ => 0.0,
        };
        config.round_mass(self.mass + held)
    }

    /// Mass of class `cos` in the element and its resources, excluding
    /// carried elements. The parts of a decommissioned element count by
    /// their own class when spares are scavenged.
    pub fn own_mass_of(&self, cos: ClassOfSupply, config: &SimConfig) -> f64 {
        let mut mass = 0.0;
        if config.scavenge_spares && self.is_decommissioned() {
            let mut parts_mass = 0.0;
            for part in &self.parts {
                let part_mass = part.quantity * part.part.unit_mass;
                parts_mass += part_mass;
                if part.part.cos.is_instance_of(cos) {
                    mass += part_mass;
                }
            }
            if self.cos.is_instance_of(cos) {
                mass += (self.mass - parts_mass).max(0.0);
            }
        } else if self.cos.is_instance_of(cos) {
            mass += self.mass;
        }
        let tank_of = |t: &ResourceTank| {
            if t.resource.cos.is_instance_of(cos) {
                t.mass()
            } else {
                0.0
            }
        };
        mass += match &self.kind {
            ElementKind::ResourceContainer(c) => c
                .contents
                .iter()
                .filter(|d| d.resource.cos.is_instance_of(cos))
                .map(|d| d.mass(config))
                .sum(),
            ElementKind::ResourceTank(t) => tank_of(t),
            ElementKind::PropulsiveVehicle(_, p) => p.tanks().map(tank_of).sum(),
            ElementKind::SurfaceVehicle(_, m) => m.fuel_tank.as_ref().map_or(0.0, tank_of),
            _ => 0.0,
        };
        config.round_mass(mass)
    }

    // -- Demand --------------------------------------------------------------

    /// Demand of the current state over `duration` days.
    pub fn generate_demands(&mut self, duration: f64) -> Result<DemandSet, ModelError> {
        let profile = ElementProfile {
            mass: self.mass,
            parts: &self.parts,
        };
        match self.current_state.and_then(|i| self.states.get_mut(i)) {
            Some(state) => state.generate(duration, profile),
            None => Ok(DemandSet::new()),
        }
    }

    /// Satisfy demands from this element's own holdings: scavenged parts,
    /// tanks, and resource stock. Carried elements are not visited.
    ///
    /// Returns the scavenged `(part, amount)` pairs.
    pub fn satisfy_own(
        &mut self,
        demands: &mut DemandSet,
        config: &SimConfig,
    ) -> Vec<(Resource, f64)> {
        let mut scavenged = Vec::new();
        if config.scavenge_spares && self.is_decommissioned() {
            for part in &mut self.parts {
                for demand in demands.iter_mut() {
                    if part.part != demand.resource || demand.amount <= 0.0 {
                        continue;
                    }
                    if demand.amount > part.quantity {
                        if part.quantity > 0.0 {
                            scavenged.push((part.part.clone(), part.quantity));
                        }
                        demand.amount -= part.quantity;
                        part.quantity = 0.0;
                    } else {
                        scavenged.push((part.part.clone(), demand.amount));
                        part.quantity -= demand.amount;
                        demand.amount = 0.0;
                    }
                }
            }
            demands.clean(config);
        }
        match &mut self.kind {
            ElementKind::ResourceContainer(c) => c.satisfy(demands, config),
            ElementKind::ResourceTank(t) => t.satisfy(demands, config),
            ElementKind::PropulsiveVehicle(_, p) => {
                for tank in p.tanks_mut() {
                    tank.satisfy(demands, config);
                }
            }
            ElementKind::SurfaceVehicle(_, m) => {
                if let Some(tank) = &mut m.fuel_tank {
                    tank.satisfy(demands, config);
                }
            }
            _ => {}
        }
        scavenged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RatedDemandModel;

    fn water() -> Resource {
        Resource::generic(ClassOfSupply::COS201)
    }

    fn config() -> SimConfig {
        SimConfig::default()
    }

    #[test]
    fn container_consumes_substitutable_stock() {
        let mut container = ResourceContainer::new(100.0, 1.0, Environment::Unpressurized)
            .with_stock(water(), 30.0);
        let mut demands: DemandSet =
            vec![Demand::new(Resource::generic(ClassOfSupply::COS2), 20.0)].into();
        container.satisfy(&mut demands, &config());
        assert!(demands.is_empty());
        assert_eq!(container.amount_of(&water()), 10.0);
    }

    #[test]
    fn container_shortfall_leaves_residual() {
        let mut container =
            ResourceContainer::new(100.0, 1.0, Environment::Unpressurized).with_stock(water(), 5.0);
        let mut demands: DemandSet = vec![Demand::new(water(), 8.0)].into();
        container.satisfy(&mut demands, &config());
        assert_eq!(demands.amount_of(&water()), 3.0);
        assert_eq!(container.amount_of(&water()), 0.0);
    }

    #[test]
    fn exploration_demand_does_not_deplete_stock() {
        let science = Resource::generic(ClassOfSupply::COS6);
        let mut container = ResourceContainer::new(100.0, 1.0, Environment::Unpressurized)
            .with_stock(science.clone(), 10.0);
        let mut demands: DemandSet = vec![Demand::new(science.clone(), 4.0)].into();
        container.satisfy(&mut demands, &config());
        assert!(demands.is_empty());
        assert_eq!(container.amount_of(&science), 10.0);
    }

    #[test]
    fn production_is_capped_by_free_capacity() {
        let waste = Resource::generic(ClassOfSupply::COS701);
        let mut container = ResourceContainer::new(10.0, 1.0, Environment::Unpressurized)
            .with_stock(water(), 4.0);
        let mut demands: DemandSet = vec![Demand::new(waste.clone(), -9.0)].into();
        container.satisfy(&mut demands, &config());
        assert_eq!(container.amount_of(&waste), 6.0);
        assert_eq!(demands.amount_of(&waste), -3.0);
    }

    #[test]
    fn environment_constraint_rejects_pressurized_cargo() {
        let container = ResourceContainer::new(100.0, 1.0, Environment::Unpressurized);
        let food = Resource::generic_in(ClassOfSupply::COS202, Environment::Pressurized);
        assert!(!container.can_add(&food, 1.0, &config()));
        let relaxed = SimConfig {
            environment_constrained: false,
            ..config()
        };
        assert!(container.can_add(&food, 1.0, &relaxed));
    }

    #[test]
    fn container_add_and_remove() {
        let cfg = config();
        let mut container = ResourceContainer::new(10.0, 1.0, Environment::Unpressurized);
        assert!(container.add(water(), 6.0, &cfg));
        assert!(!container.add(water(), 6.0, &cfg));
        assert!(!container.remove(&water(), 7.0));
        assert!(container.remove(&water(), 2.0));
        assert!(container.remove(&water(), 4.0));
        assert!(container.contents.is_empty());
    }

    #[test]
    fn tank_satisfies_and_refills() {
        let cfg = config();
        let lox = Resource::continuous(5, "LOX", ClassOfSupply::COS101);
        let mut tank = ResourceTank::new(lox.clone(), 10.0, 20.0);
        let mut demands: DemandSet = vec![Demand::new(lox.clone(), 4.0)].into();
        tank.satisfy(&mut demands, &cfg);
        assert!(demands.is_empty());
        assert_eq!(tank.amount, 6.0);
        let mut production: DemandSet = vec![Demand::new(lox.clone(), -30.0)].into();
        tank.satisfy(&mut production, &cfg);
        assert_eq!(tank.amount, 20.0);
        assert_eq!(production.amount_of(&lox), -16.0);
        assert!(!tank.remove(&lox, 21.0));
        assert!(tank.remove(&lox, 20.0));
    }

    #[test]
    fn rcs_burns_share_the_oms_tank_when_absent() {
        let fuel = Resource::continuous(9, "MMH", ClassOfSupply::COS102);
        let mut propulsion = Propulsion {
            oms_isp: 320.0,
            rcs_isp: 280.0,
            oms_tank: Some(ResourceTank::new(fuel, 100.0, 100.0)),
            rcs_tank: None,
        };
        propulsion.tank_mut(BurnType::Rcs).unwrap().amount = 40.0;
        assert_eq!(propulsion.oms_tank.as_ref().unwrap().amount, 40.0);
        assert_eq!(propulsion.isp(BurnType::Rcs), 280.0);
    }

    #[test]
    fn decommissioned_element_scavenges_parts() {
        let pump = Resource::item(4, "pump", ClassOfSupply::COS4011, 10.0);
        let mut element = Element::new("Old hab", ElementKind::Basic)
            .with_mass(100.0)
            .with_part(PartApplication::new(pump.clone(), 2.0))
            .with_state(State::new("Retired", StateType::Decommissioned));
        let cfg = SimConfig {
            scavenge_spares: true,
            ..config()
        };
        let mut demands: DemandSet = vec![Demand::new(pump.clone(), 3.0)].into();
        let scavenged = element.satisfy_own(&mut demands, &cfg);
        assert_eq!(scavenged, vec![(pump.clone(), 2.0)]);
        assert_eq!(demands.amount_of(&pump), 1.0);
        assert_eq!(element.parts[0].quantity, 0.0);
    }

    #[test]
    fn scavengeable_mass_is_split_by_class() {
        let pump = Resource::item(4, "pump", ClassOfSupply::COS4011, 10.0);
        let element = Element::new("Old hab", ElementKind::Basic)
            .with_cos(ClassOfSupply::COS8)
            .with_mass(100.0)
            .with_part(PartApplication::new(pump, 2.0))
            .with_state(State::new("Retired", StateType::Decommissioned));
        let cfg = SimConfig {
            scavenge_spares: true,
            ..config()
        };
        assert_eq!(element.own_mass_of(ClassOfSupply::COS4, &cfg), 20.0);
        assert_eq!(element.own_mass_of(ClassOfSupply::COS8, &cfg), 80.0);
        assert_eq!(element.own_mass_of(ClassOfSupply::COS8, &config()), 100.0);
    }

    #[test]
    fn element_without_state_generates_nothing() {
        let mut element = Element::new("Inert", ElementKind::Basic);
        assert!(element.generate_demands(10.0).unwrap().is_empty());
    }

    #[test]
    fn element_demand_follows_current_state() {
        let rated = DemandModel::Rated(RatedDemandModel::new(
            vec![Demand::new(water(), 1.0)].into(),
        ));
        let mut element = Element::new("Hab", ElementKind::Basic)
            .with_state(State::new("Active", StateType::Active).with_model(rated))
            .with_state(State::new("Dormant", StateType::Dormant));
        assert_eq!(element.generate_demands(3.0).unwrap().amount_of(&water()), 3.0);
        element.current_state = element.state_of_type(StateType::Dormant);
        assert!(element.generate_demands(3.0).unwrap().is_empty());
    }
}
