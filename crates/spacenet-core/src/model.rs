//! Demand models.
//!
//! A demand model turns an elapsed duration into a [`DemandSet`]. Models are
//! attached either to an element's operational state (evaluated every demand
//! cycle with the elapsed time) or to a mission (evaluated once when the
//! mission starts, with the mission profile as context).
//!
//! [`DemandModelType`] is the data-only discriminant; presentation concerns
//! such as labels live outside the engine.

use crate::cos::ClassOfSupply;
use crate::demand::{Demand, DemandSet};
use crate::element::PartApplication;
use crate::resource::{Environment, Resource};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Mission quantities consumed by mission-level models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionProfile {
    pub crew_size: u32,
    /// Crew-hours spent on EVA over the mission.
    pub eva_crew_time: f64,
    /// Days spent at the destination.
    pub exploration_duration: f64,
    /// Days from mission start to arrival at the destination.
    pub transit_duration: f64,
    /// Days of the return leg.
    pub return_transit_duration: f64,
}

/// Element quantities consumed by element-level models.
#[derive(Debug, Clone, Copy)]
pub struct ElementProfile<'a> {
    /// Dry mass of the element itself, excluding contents.
    pub mass: f64,
    pub parts: &'a [PartApplication],
}

/// What a model is being evaluated for.
#[derive(Debug, Clone, Copy)]
pub enum ModelContext<'a> {
    Element(ElementProfile<'a>),
    Mission(&'a MissionProfile),
}

/// A model attached where it cannot be evaluated. This is a wiring defect,
/// not a simulated condition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("{0:?} demand model requires a mission context")]
    MissionRequired(DemandModelType),
    #[error("{0:?} demand model requires an element context")]
    ElementRequired(DemandModelType),
}

// ---------------------------------------------------------------------------
// DemandModel
// ---------------------------------------------------------------------------

/// Discriminant of [`DemandModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemandModelType {
    Rated,
    TimedImpulse,
    CrewConsumables,
    SparingByMass,
}

/// A demand generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DemandModel {
    Rated(RatedDemandModel),
    TimedImpulse(TimedImpulseDemandModel),
    CrewConsumables(CrewConsumablesDemandModel),
    SparingByMass(SparingByMassDemandModel),
}

impl DemandModel {
    pub fn model_type(&self) -> DemandModelType {
        match self {
            DemandModel::Rated(_) => DemandModelType::Rated,
            DemandModel::TimedImpulse(_) => DemandModelType::TimedImpulse,
            DemandModel::CrewConsumables(_) => DemandModelType::CrewConsumables,
            DemandModel::SparingByMass(_) => DemandModelType::SparingByMass,
        }
    }

    /// Generate demands for `duration` days.
    pub fn generate(
        &mut self,
        duration: f64,
        context: ModelContext<'_>,
    ) -> Result<DemandSet, ModelError> {
        match self {
            DemandModel::Rated(model) => Ok(model.generate(duration)),
            DemandModel::TimedImpulse(model) => Ok(model.generate()),
            DemandModel::CrewConsumables(model) => match context {
                ModelContext::Mission(mission) => Ok(model.generate(mission)),
                ModelContext::Element(_) => {
                    Err(ModelError::MissionRequired(DemandModelType::CrewConsumables))
                }
            },
            DemandModel::SparingByMass(model) => match context {
                ModelContext::Element(element) => Ok(model.generate(duration, element)),
                ModelContext::Mission(_) => {
                    Err(ModelError::ElementRequired(DemandModelType::SparingByMass))
                }
            },
        }
    }

    /// Check that this model can be evaluated in the given kind of context.
    pub fn check_context(&self, mission_level: bool) -> Result<(), ModelError> {
        match (self.model_type(), mission_level) {
            (DemandModelType::CrewConsumables, false) => {
                Err(ModelError::MissionRequired(DemandModelType::CrewConsumables))
            }
            (DemandModelType::SparingByMass, true) => {
                Err(ModelError::ElementRequired(DemandModelType::SparingByMass))
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Rated
// ---------------------------------------------------------------------------

/// Linear demand: each configured amount is a rate per day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatedDemandModel {
    pub rates: DemandSet,
}

impl RatedDemandModel {
    pub fn new(rates: DemandSet) -> Self {
        Self { rates }
    }

    pub fn generate(&self, duration: f64) -> DemandSet {
        self.rates
            .iter()
            .map(|rate| Demand::new(rate.resource.clone(), rate.amount * duration))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Timed impulse
// ---------------------------------------------------------------------------

/// One-shot demand: the configured set is emitted on the first evaluation
/// and never again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimedImpulseDemandModel {
    pub demands: DemandSet,
    fired: bool,
}

impl TimedImpulseDemandModel {
    pub fn new(demands: DemandSet) -> Self {
        Self {
            demands,
            fired: false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn generate(&mut self) -> DemandSet {
        if self.fired {
            DemandSet::new()
        } else {
            self.fired = true;
            self.demands.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Crew consumables
// ---------------------------------------------------------------------------

/// Mission-level consumables estimate driven by crew size, EVA time, and
/// mission durations.
///
/// Per-day rates are kg/crew/day, EVA rates are kg per crew-hour of EVA,
/// and kit/equipment values are kg per crew member or per mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewConsumablesDemandModel {
    pub reserves_duration: f64,
    /// Fraction of water recovered, clamped to [0, 1].
    pub water_recovery_rate: f64,
    /// Days a set of clothing lasts, at least 1.
    pub clothing_lifetime: f64,
    /// Exclude transit legs from the duration-driven terms.
    pub transit_demands_omitted: bool,
    pub water_rate: f64,
    pub eva_water_rate: f64,
    pub food_support_rate: f64,
    pub ambient_food_rate: f64,
    pub rf_food_rate: f64,
    pub oxygen_rate: f64,
    pub eva_oxygen_rate: f64,
    pub nitrogen_rate: f64,
    pub hygiene_rate: f64,
    pub hygiene_kit: f64,
    pub clothing_rate: f64,
    pub personal_items: f64,
    pub office_equipment: f64,
    pub eva_suit: f64,
    pub eva_lithium_hydroxide: f64,
    pub health_equipment: f64,
    pub health_consumables: f64,
    pub safety_equipment: f64,
    pub comm_equipment: f64,
    pub computer_equipment: f64,
    pub trash_bag_rate: f64,
    pub waste_containment_rate: f64,
}

impl Default for CrewConsumablesDemandModel {
    fn default() -> Self {
        Self {
            reserves_duration: 0.0,
            water_recovery_rate: 0.42,
            clothing_lifetime: 4.0,
            transit_demands_omitted: false,
            water_rate: 3.6,
            eva_water_rate: 0.6875,
            food_support_rate: 0.05556,
            ambient_food_rate: 0.76389,
            rf_food_rate: 1.61667,
            oxygen_rate: 3.85714,
            eva_oxygen_rate: 0.07875,
            nitrogen_rate: 2.21429,
            hygiene_rate: 0.27778,
            hygiene_kit: 1.8,
            clothing_rate: 2.3,
            personal_items: 10.0,
            office_equipment: 5.0,
            eva_suit: 107.0,
            eva_lithium_hydroxide: 0.3625,
            health_equipment: 20.0,
            health_consumables: 0.1,
            safety_equipment: 25.0,
            comm_equipment: 20.0,
            computer_equipment: 5.0,
            trash_bag_rate: 0.05,
            waste_containment_rate: 0.05,
        }
    }
}

impl CrewConsumablesDemandModel {
    pub fn with_water_recovery_rate(mut self, rate: f64) -> Self {
        self.water_recovery_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_clothing_lifetime(mut self, days: f64) -> Self {
        self.clothing_lifetime = days.max(1.0);
        self
    }

    pub fn generate(&self, mission: &MissionProfile) -> DemandSet {
        let crew = f64::from(mission.crew_size);
        let eva = mission.eva_crew_time;
        let recovery = self.water_recovery_rate.clamp(0.0, 1.0);
        let lifetime = self.clothing_lifetime.max(1.0);
        let transit = if self.transit_demands_omitted {
            0.0
        } else {
            mission.transit_duration + mission.return_transit_duration
        };
        let active = mission.exploration_duration + transit;
        let total = active + self.reserves_duration;

        let terms = [
            (ClassOfSupply::COS201, total * self.water_rate * crew * (1.0 - recovery)),
            (ClassOfSupply::COS201, eva * self.eva_water_rate),
            (ClassOfSupply::COS202, total * self.food_support_rate * crew),
            (ClassOfSupply::COS202, total * self.ambient_food_rate * crew),
            (ClassOfSupply::COS202, total * self.rf_food_rate * crew),
            (ClassOfSupply::COS203, total * self.oxygen_rate * crew),
            (ClassOfSupply::COS203, eva * self.eva_oxygen_rate),
            (ClassOfSupply::COS203, total * self.nitrogen_rate * crew),
            (ClassOfSupply::COS204, total * self.hygiene_rate * crew),
            (ClassOfSupply::COS204, self.hygiene_kit * crew),
            (ClassOfSupply::COS205, active * self.clothing_rate * crew / lifetime),
            (ClassOfSupply::COS206, self.personal_items * crew),
            (ClassOfSupply::COS301, self.office_equipment * crew),
            (ClassOfSupply::COS302, self.eva_suit * crew),
            (ClassOfSupply::COS302, self.eva_lithium_hydroxide * eva),
            (ClassOfSupply::COS303, self.health_equipment),
            (ClassOfSupply::COS303, self.health_consumables * crew),
            (ClassOfSupply::COS304, self.safety_equipment),
            (ClassOfSupply::COS305, self.comm_equipment),
            (ClassOfSupply::COS306, self.computer_equipment * crew),
            (ClassOfSupply::COS701, active * self.trash_bag_rate * crew),
            (ClassOfSupply::COS702, total * self.waste_containment_rate * crew),
        ];
        terms
            .into_iter()
            .map(|(cos, amount)| Demand::new(Resource::generic(cos), amount))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Sparing by mass
// ---------------------------------------------------------------------------

/// Spares demand proportional to element mass, at an annual fraction per
/// environment.
///
/// With the parts list enabled, catalogued parts are demanded individually
/// and only the uncatalogued remainder of the element mass is demanded as
/// generic spares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparingByMassDemandModel {
    /// Fraction of element mass per year demanded as unpressurized spares.
    pub unpressurized_rate: f64,
    /// Fraction of element mass per year demanded as pressurized spares.
    pub pressurized_rate: f64,
    pub parts_list_enabled: bool,
}

impl Default for SparingByMassDemandModel {
    fn default() -> Self {
        Self {
            unpressurized_rate: 0.0,
            pressurized_rate: 0.0,
            parts_list_enabled: true,
        }
    }
}

impl SparingByMassDemandModel {
    pub fn new(unpressurized_rate: f64, pressurized_rate: f64, parts_list_enabled: bool) -> Self {
        Self {
            unpressurized_rate,
            pressurized_rate,
            parts_list_enabled,
        }
    }

    pub fn generate(&self, duration: f64, element: ElementProfile<'_>) -> DemandSet {
        let mut demands = DemandSet::new();
        let mut press_part_mass = 0.0;
        let mut unpress_part_mass = 0.0;

        let generic_mass = if self.parts_list_enabled {
            for part in element.parts.iter().filter(|p| p.quantity > 0.0) {
                let mass = part.quantity * part.part.unit_mass;
                match part.part.environment {
                    Environment::Pressurized => press_part_mass += mass,
                    Environment::Unpressurized => unpress_part_mass += mass,
                }
            }
            let generic_mass = (element.mass - press_part_mass - unpress_part_mass).max(0.0);
            for part in element.parts.iter().filter(|p| p.quantity > 0.0) {
                let (rate, part_mass) = match part.part.environment {
                    Environment::Pressurized => (self.pressurized_rate, press_part_mass),
                    Environment::Unpressurized => (self.unpressurized_rate, unpress_part_mass),
                };
                let amount = apportion(
                    duration * rate / 365.0 * element.mass * part.quantity,
                    generic_mass + part_mass,
                );
                demands.add(Demand::new(part.part.clone(), amount));
            }
            generic_mass
        } else {
            element.mass
        };

        let spares = |environment, rate: f64, part_mass: f64| {
            Demand::new(
                Resource::generic_in(ClassOfSupply::COS4, environment),
                apportion(
                    duration * rate / 365.0 * element.mass * generic_mass,
                    generic_mass + part_mass,
                ),
            )
        };
        demands.add(spares(
            Environment::Unpressurized,
            self.unpressurized_rate,
            unpress_part_mass,
        ));
        demands.add(spares(
            Environment::Pressurized,
            self.pressurized_rate,
            press_part_mass,
        ));
        demands
    }
}

/// `numerator / denominator`, or zero when the denominator vanishes.
fn apportion(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
