//! Resource value types: continuous resources, discrete items, and
//! generic class-of-supply wildcards.

use crate::cos::ClassOfSupply;
use crate::id::ResourceId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Storage environment a resource or element requires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Environment {
    #[default]
    Unpressurized,
    Pressurized,
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// How quantities of a resource are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Continuous quantity (kilograms of water, liters of fuel).
    #[default]
    Continuous,
    /// Whole units (spare parts). Subject to item discretization.
    Discrete,
    /// Wildcard for "any resource of this class of supply".
    Generic,
}

/// A supply resource.
///
/// Identity is `(id, environment)`: two resources with the same catalogue id
/// stored in different environments are different resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub cos: ClassOfSupply,
    pub environment: Environment,
    pub unit_mass: f64,
    pub unit_volume: f64,
    pub units: String,
    pub packing_factor: f64,
    pub kind: ResourceKind,
}

/// Ordered identity key of a resource, used to key demand sets and
/// container contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub cos: ClassOfSupply,
    pub id: ResourceId,
    pub environment: Environment,
}

impl Resource {
    /// A continuous resource with unit mass 1 kg and no volume.
    pub fn continuous(id: i32, name: impl Into<String>, cos: ClassOfSupply) -> Self {
        Self {
            id: ResourceId(id),
            name: name.into(),
            cos,
            environment: Environment::Unpressurized,
            unit_mass: 1.0,
            unit_volume: 0.0,
            units: "kg".to_string(),
            packing_factor: 0.0,
            kind: ResourceKind::Continuous,
        }
    }

    /// A discrete item with the given unit mass.
    pub fn item(id: i32, name: impl Into<String>, cos: ClassOfSupply, unit_mass: f64) -> Self {
        Self {
            unit_mass,
            units: "units".to_string(),
            kind: ResourceKind::Discrete,
            ..Self::continuous(id, name, cos)
        }
    }

    /// The generic wildcard for `cos` in the unpressurized environment.
    pub fn generic(cos: ClassOfSupply) -> Self {
        Self::generic_in(cos, Environment::Unpressurized)
    }

    /// The generic wildcard for `cos` stored in `environment`.
    pub fn generic_in(cos: ClassOfSupply, environment: Environment) -> Self {
        Self {
            id: ResourceId(-(cos.id() as i32)),
            name: format!("Generic COS {} ({})", cos.id(), cos.name()),
            cos,
            environment,
            unit_mass: 1.0,
            unit_volume: generic_unit_volume(cos),
            units: "kg".to_string(),
            packing_factor: generic_packing_factor(cos, environment),
            kind: ResourceKind::Generic,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        if self.kind == ResourceKind::Generic {
            self.packing_factor = generic_packing_factor(self.cos, environment);
        }
        self
    }

    pub fn with_unit_volume(mut self, unit_volume: f64) -> Self {
        self.unit_volume = unit_volume;
        self
    }

    pub fn with_packing_factor(mut self, packing_factor: f64) -> Self {
        self.packing_factor = packing_factor;
        self
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            cos: self.cos,
            id: self.id,
            environment: self.environment,
        }
    }

    pub fn is_item(&self) -> bool {
        self.kind == ResourceKind::Discrete
    }

    /// Whether stock of `self` can satisfy demand for `target`.
    ///
    /// Generic stock satisfies demand of its own class or of any broader
    /// class. Catalogued stock satisfies only demand for the same id.
    /// Uncatalogued stock (id 0) never substitutes.
    pub fn is_substitutable_for(&self, target: &Resource) -> bool {
        if self.id.is_generic() {
            self.cos.is_instance_of(target.cos)
        } else if self.id.is_catalogued() {
            self.id == target.id
        } else {
            false
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.environment == other.environment
    }
}

impl Eq for Resource {}

impl PartialOrd for Resource {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Resource {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn generic_unit_volume(cos: ClassOfSupply) -> f64 {
    // m^3 per kg, checked most-specific first
    const TABLE: [(ClassOfSupply, f64); 11] = [
        (ClassOfSupply::COS1, 1.9e-3),
        (ClassOfSupply::COS201, 1.0e-3),
        (ClassOfSupply::COS2, 7.0e-3),
        (ClassOfSupply::COS3, 5.0e-3),
        (ClassOfSupply::COS4, 3.0e-3),
        (ClassOfSupply::COS5, 7.0e-3),
        (ClassOfSupply::COS6, 5.0e-3),
        (ClassOfSupply::COS7, 5.0e-3),
        (ClassOfSupply::COS8, 3.5e-3),
        (ClassOfSupply::COS9, 3.5e-3),
        (ClassOfSupply::COS10, 7.0e-3),
    ];
    TABLE
        .iter()
        .find(|(base, _)| cos.is_instance_of(*base))
        .map_or(0.0, |(_, volume)| *volume)
}

fn generic_packing_factor(cos: ClassOfSupply, environment: Environment) -> f64 {
    if cos == ClassOfSupply::COS203 {
        1.0
    } else if cos == ClassOfSupply::COS201 {
        0.5
    } else if cos == ClassOfSupply::COS6 {
        0.0
    } else {
        match environment {
            Environment::Unpressurized => 0.6,
            Environment::Pressurized => 1.2,
        }
    }
}
