//! Demands and demand sets.
//!
//! A [`DemandSet`] holds at most one [`Demand`] per resource identity.
//! Adding a demand for a resource already present merges the amounts, and
//! removing one consumes as much as is available, leaving the unmet
//! remainder on the caller's demand.

use crate::config::SimConfig;
use crate::resource::{Resource, ResourceKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Demand
// ---------------------------------------------------------------------------

/// A required quantity of a resource. Negative amounts denote production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    pub resource: Resource,
    pub amount: f64,
}

impl Demand {
    pub fn new(resource: Resource, amount: f64) -> Self {
        Self { resource, amount }
    }

    /// Mass of the demanded amount, rounded to the mass precision.
    pub fn mass(&self, config: &SimConfig) -> f64 {
        config.round_mass(self.resource.unit_mass * self.amount)
    }

    /// Volume of the demanded amount, rounded to the volume precision.
    pub fn volume(&self, config: &SimConfig) -> f64 {
        config.round_volume(self.resource.unit_volume * self.amount)
    }
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} {} of {}",
            self.amount, self.resource.units, self.resource.name
        )
    }
}

// ---------------------------------------------------------------------------
// DemandSet
// ---------------------------------------------------------------------------

/// A deduplicated, mergeable collection of demands keyed by resource.
///
/// Iteration order is the resource order: class of supply, then id, then
/// environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Demand>", into = "Vec<Demand>")]
pub struct DemandSet {
    demands: BTreeMap<ResourceKey, Demand>,
}

impl DemandSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.demands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Demand> {
        self.demands.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Demand> {
        self.demands.values_mut()
    }

    pub fn get(&self, resource: &Resource) -> Option<&Demand> {
        self.demands.get(&resource.key())
    }

    pub fn get_mut(&mut self, resource: &Resource) -> Option<&mut Demand> {
        self.demands.get_mut(&resource.key())
    }

    /// Demanded amount of `resource`, zero when absent.
    pub fn amount_of(&self, resource: &Resource) -> f64 {
        self.get(resource).map_or(0.0, |d| d.amount)
    }

    /// Insert a demand, summing with any existing entry for the same resource.
    pub fn add(&mut self, demand: Demand) {
        self.demands
            .entry(demand.resource.key())
            .and_modify(|existing| existing.amount += demand.amount)
            .or_insert(demand);
    }

    pub fn add_all(&mut self, demands: impl IntoIterator<Item = Demand>) {
        for demand in demands {
            self.add(demand);
        }
    }

    /// Consume `demand.amount` from the matching entry.
    ///
    /// Returns `true` when the entry covered the full amount; `demand.amount`
    /// is then zero. On a shortfall the entry is zeroed, the unmet remainder
    /// is left in `demand.amount`, and `false` is returned. A resource with
    /// no entry leaves `demand` untouched and returns `false`.
    pub fn remove(&mut self, demand: &mut Demand) -> bool {
        let Some(entry) = self.demands.get_mut(&demand.resource.key()) else {
            return false;
        };
        if entry.amount >= demand.amount {
            entry.amount -= demand.amount;
            demand.amount = 0.0;
            true
        } else {
            demand.amount -= entry.amount;
            entry.amount = 0.0;
            false
        }
    }

    /// Sum of demand masses, rounded to the mass precision.
    pub fn total_mass(&self, config: &SimConfig) -> f64 {
        config.round_mass(self.iter().map(|d| d.mass(config)).sum())
    }

    /// Sum of demand volumes, rounded to the volume precision.
    pub fn total_volume(&self, config: &SimConfig) -> f64 {
        config.round_volume(self.iter().map(|d| d.volume(config)).sum())
    }

    /// Drop entries whose amount rounds to zero at the demand precision.
    pub fn clean(&mut self, config: &SimConfig) {
        self.demands
            .retain(|_, d| config.round_demand(d.amount) != 0.0);
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Demand) -> bool) {
        self.demands.retain(|_, d| keep(d));
    }

    pub fn clear(&mut self) {
        self.demands.clear();
    }
}

impl FromIterator<Demand> for DemandSet {
    fn from_iter<I: IntoIterator<Item = Demand>>(iter: I) -> Self {
        let mut set = DemandSet::new();
        set.add_all(iter);
        set
    }
}

impl IntoIterator for DemandSet {
    type Item = Demand;
    type IntoIter = std::collections::btree_map::IntoValues<ResourceKey, Demand>;

    fn into_iter(self) -> Self::IntoIter {
        self.demands.into_values()
    }
}

impl<'a> IntoIterator for &'a DemandSet {
    type Item = &'a Demand;
    type IntoIter = std::collections::btree_map::Values<'a, ResourceKey, Demand>;

    fn into_iter(self) -> Self::IntoIter {
        self.demands.values()
    }
}

impl From<Vec<Demand>> for DemandSet {
    fn from(demands: Vec<Demand>) -> Self {
        demands.into_iter().collect()
    }
}

impl From<DemandSet> for Vec<Demand> {
    fn from(set: DemandSet) -> Self {
        set.into_iter().collect()
    }
}

impl fmt::Display for DemandSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, demand) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{demand}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cos::ClassOfSupply;

    fn water() -> Resource {
        Resource::generic(ClassOfSupply::COS201)
    }

    fn food() -> Resource {
        Resource::generic(ClassOfSupply::COS202)
    }

    #[test]
    fn add_merges_same_resource() {
        let mut set = DemandSet::new();
        set.add(Demand::new(water(), 2.5));
        set.add(Demand::new(water(), 4.0));
        assert_eq!(set.len(), 1);
        assert_eq!(set.amount_of(&water()), 6.5);
    }

    #[test]
    fn add_keeps_distinct_resources_apart() {
        let mut set = DemandSet::new();
        set.add(Demand::new(water(), 1.0));
        set.add(Demand::new(food(), 1.0));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_full_amount() {
        let mut set: DemandSet = vec![Demand::new(water(), 10.0)].into();
        let mut request = Demand::new(water(), 4.0);
        assert!(set.remove(&mut request));
        assert_eq!(request.amount, 0.0);
        assert_eq!(set.amount_of(&water()), 6.0);
    }

    #[test]
    fn remove_partial_leaves_remainder_on_caller() {
        let mut set: DemandSet = vec![Demand::new(water(), 3.0)].into();
        let mut request = Demand::new(water(), 5.0);
        assert!(!set.remove(&mut request));
        assert_eq!(request.amount, 2.0);
        assert_eq!(set.amount_of(&water()), 0.0);
    }

    #[test]
    fn remove_absent_resource_is_noop() {
        let mut set: DemandSet = vec![Demand::new(water(), 3.0)].into();
        let mut request = Demand::new(food(), 5.0);
        assert!(!set.remove(&mut request));
        assert_eq!(request.amount, 5.0);
    }

    #[test]
    fn clean_drops_only_zero_entries() {
        let config = SimConfig::default();
        let mut set = DemandSet::new();
        set.add(Demand::new(water(), 0.0));
        set.add(Demand::new(food(), 1.0));
        set.add(Demand::new(Resource::generic(ClassOfSupply::COS4), -2.0));
        set.clean(&config);
        assert_eq!(set.len(), 2);
        assert!(set.get(&water()).is_none());
        let snapshot = set.clone();
        set.clean(&config);
        assert_eq!(set, snapshot);
    }

    #[test]
    fn total_mass_uses_unit_mass() {
        let config = SimConfig::default();
        let pump = Resource::item(3, "pump", ClassOfSupply::COS4011, 12.5);
        let set: DemandSet = vec![Demand::new(pump, 2.0), Demand::new(water(), 1.25)].into();
        assert!((set.total_mass(&config) - 26.25).abs() < 1e-9);
    }

    #[test]
    fn serde_round_trips_as_list() {
        let set: DemandSet = vec![Demand::new(water(), 1.0), Demand::new(food(), 2.0)].into();
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.starts_with('['));
        let back: DemandSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
