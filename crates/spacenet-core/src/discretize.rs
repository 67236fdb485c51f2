//! Item discretization.
//!
//! Demand models produce fractional item demand (0.3 pumps per month).
//! The [`Discretizer`] accrues those fractions per scope and releases whole
//! units once the accrued amount reaches the aggregation threshold `t`:
//!
//! - `t = 0` releases a unit as soon as any fraction is owed.
//! - `t = 1` withholds until a full unit has accrued.
//!
//! Over any horizon, units released equal the underlying demand minus the
//! accrued remainder, which stays within `(t - 1, t]`.

use crate::config::{ItemDiscretization, SimConfig};
use crate::demand::DemandSet;
use crate::id::ElementId;
use crate::network::Location;
use crate::resource::ResourceKey;
use std::collections::BTreeMap;

const EPSILON: f64 = 1e-9;

/// Accumulation scope of a fractional item demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Scope {
    Element(ElementId),
    Location(Location),
    Scenario,
}

/// Running fractional accumulators per `(scope, item)`.
#[derive(Debug, Clone, Default)]
pub struct Discretizer {
    policy: ItemDiscretization,
    threshold: f64,
    accrued: BTreeMap<(Scope, ResourceKey), f64>,
}

impl Discretizer {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            policy: config.item_discretization,
            threshold: config.item_aggregation.clamp(0.0, 1.0),
            accrued: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> ItemDiscretization {
        self.policy
    }

    /// Fraction accrued but not yet released for an item at a scope.
    pub fn accrued_for_element(&self, element: ElementId, item: ResourceKey) -> f64 {
        self.accrued
            .get(&(Scope::Element(element), item))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn reset(&mut self) {
        self.accrued.clear();
    }

    /// Replace fractional item demand with whole units, then drop entries
    /// that became zero.
    ///
    /// Demand without an element is left fractional under the per-element
    /// policy; demand without a location is left fractional under the
    /// per-location policy.
    pub fn discretize(
        &mut self,
        mut demands: DemandSet,
        element: Option<ElementId>,
        location: Option<Location>,
        config: &SimConfig,
    ) -> DemandSet {
        let scope = match self.policy {
            ItemDiscretization::None => None,
            ItemDiscretization::ByElement => element.map(Scope::Element),
            ItemDiscretization::ByLocation => location.map(Scope::Location),
            ItemDiscretization::ByScenario => Some(Scope::Scenario),
        };
        if let Some(scope) = scope {
            for demand in demands.iter_mut().filter(|d| d.resource.is_item()) {
                let accrued = self
                    .accrued
                    .entry((scope, demand.resource.key()))
                    .or_insert(0.0);
                *accrued += demand.amount;
                demand.amount = 0.0;
                while *accrued > EPSILON && *accrued >= self.threshold - EPSILON {
                    demand.amount += 1.0;
                    *accrued -= 1.0;
                }
            }
        }
        demands.clean(config);
        demands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cos::ClassOfSupply;
    use crate::demand::Demand;
    use crate::resource::Resource;
    use slotmap::SlotMap;

    fn pump() -> Resource {
        Resource::item(11, "pump", ClassOfSupply::COS4011, 8.0)
    }

    fn released(threshold: f64, rate: f64, ticks: usize) -> f64 {
        let config = SimConfig::default().with_discretization(ItemDiscretization::ByScenario, threshold);
        let mut discretizer = Discretizer::new(&config);
        (0..ticks)
            .map(|_| {
                let demands: DemandSet = vec![Demand::new(pump(), rate)].into();
                discretizer
                    .discretize(demands, None, None, &config)
                    .amount_of(&pump())
            })
            .sum()
    }

    #[test]
    fn front_loaded_at_zero_threshold() {
        let config = SimConfig::default().with_discretization(ItemDiscretization::ByScenario, 0.0);
        let mut discretizer = Discretizer::new(&config);
        let first = discretizer.discretize(vec![Demand::new(pump(), 0.1)].into(), None, None, &config);
        assert_eq!(first.amount_of(&pump()), 1.0);
        let second = discretizer.discretize(vec![Demand::new(pump(), 0.1)].into(), None, None, &config);
        assert!(second.is_empty());
    }

    #[test]
    fn back_loaded_at_unit_threshold() {
        assert_eq!(released(1.0, 0.25, 3), 0.0);
        assert_eq!(released(1.0, 0.25, 4), 1.0);
    }

    #[test]
    fn zero_threshold_emits_nothing_without_demand() {
        assert_eq!(released(0.0, 0.0, 5), 0.0);
    }

    #[test]
    fn continuous_resources_pass_through() {
        let config = SimConfig::default().with_discretization(ItemDiscretization::ByScenario, 0.5);
        let mut discretizer = Discretizer::new(&config);
        let water = Resource::generic(ClassOfSupply::COS201);
        let out = discretizer.discretize(vec![Demand::new(water.clone(), 0.3)].into(), None, None, &config);
        assert_eq!(out.amount_of(&water), 0.3);
    }

    #[test]
    fn element_scope_requires_an_element() {
        let config = SimConfig::default().with_discretization(ItemDiscretization::ByElement, 0.5);
        let mut discretizer = Discretizer::new(&config);
        let out = discretizer.discretize(vec![Demand::new(pump(), 0.3)].into(), None, None, &config);
        assert_eq!(out.amount_of(&pump()), 0.3);

        let mut ids: SlotMap<ElementId, ()> = SlotMap::with_key();
        let hab = ids.insert(());
        let out = discretizer.discretize(vec![Demand::new(pump(), 0.3)].into(), Some(hab), None, &config);
        assert!(out.is_empty());
        assert!((discretizer.accrued_for_element(hab, pump().key()) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn scopes_accrue_independently() {
        let config = SimConfig::default().with_discretization(ItemDiscretization::ByElement, 1.0);
        let mut discretizer = Discretizer::new(&config);
        let mut ids: SlotMap<ElementId, ()> = SlotMap::with_key();
        let a = ids.insert(());
        let b = ids.insert(());
        for _ in 0..2 {
            discretizer.discretize(vec![Demand::new(pump(), 0.5)].into(), Some(a), None, &config);
        }
        let out = discretizer.discretize(vec![Demand::new(pump(), 0.5)].into(), Some(b), None, &config);
        assert!(out.is_empty());
        assert!(discretizer.accrued_for_element(a, pump().key()).abs() < 1e-12);
    }
}
