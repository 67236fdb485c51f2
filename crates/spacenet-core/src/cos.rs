//! Class-of-supply catalogue.
//!
//! Classes form a decimal hierarchy: `201` (water) refines `2` (crew
//! provisions), `4011` (spares) refines `401` which refines `4`. The
//! hierarchy is expressed purely through the digits of the id, so the
//! subclass test is a string-prefix test.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A logistics class of supply. Only ids in [`ClassOfSupply::ALL`] are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ClassOfSupply(u32);

/// Error returned when converting an unknown class-of-supply id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown class of supply: {0}")]
pub struct UnknownClassOfSupply(pub u32);

macro_rules! classes {
    ($($name:ident = $id:literal, $label:literal;)*) => {
        impl ClassOfSupply {
            $(pub const $name: ClassOfSupply = ClassOfSupply($id);)*

            /// Every catalogued class, in ascending id order.
            pub const ALL: &'static [ClassOfSupply] = &[$(ClassOfSupply::$name),*];

            /// Human-readable catalogue name.
            pub fn name(self) -> &'static str {
                match self.0 {
                    $($id => $label,)*
                    _ => "Unknown",
                }
            }
        }
    };
}

classes! {
    COS0 = 0, "None";
    COS1 = 1, "Propellants and Fuels";
    COS2 = 2, "Crew Provisions";
    COS3 = 3, "Crew Operations";
    COS4 = 4, "Maintenance and Upkeep";
    COS5 = 5, "Stowage and Restraint";
    COS6 = 6, "Exploration and Research";
    COS7 = 7, "Waste and Disposal";
    COS8 = 8, "Habitation and Infrastructure";
    COS9 = 9, "Transportation and Carriers";
    COS10 = 10, "Miscellaneous";
    COS101 = 101, "Cryogens";
    COS102 = 102, "Hypergols";
    COS103 = 103, "Nuclear Fuel";
    COS104 = 104, "Petroleum Fuels";
    COS105 = 105, "Other Fuels";
    COS106 = 106, "Green Propellant";
    COS201 = 201, "Water and Support Equipment";
    COS202 = 202, "Food and Support Equipment";
    COS203 = 203, "Gases";
    COS204 = 204, "Hygiene Items";
    COS205 = 205, "Clothing";
    COS206 = 206, "Personal Items";
    COS301 = 301, "Office Equipment and Supplies";
    COS302 = 302, "EVA Equipment and Consumables";
    COS303 = 303, "Health Equipment and Consumables";
    COS304 = 304, "Safety Equipment";
    COS305 = 305, "Communications Equipment";
    COS306 = 306, "Computers and Support Equipment";
    COS401 = 401, "Spares and Repair Parts";
    COS402 = 402, "Maintenance Tools";
    COS403 = 403, "Lubricants and Bulk Chemicals";
    COS404 = 404, "Batteries";
    COS405 = 405, "Cleaning Equipment and Consumables";
    COS501 = 501, "Cargo Containers and Restraints";
    COS502 = 502, "Inventory Management Equipment";
    COS601 = 601, "Science Payloads and Instruments";
    COS602 = 602, "Field Equipment";
    COS603 = 603, "Samples";
    COS701 = 701, "Waste";
    COS702 = 702, "Waste Management Equipment";
    COS703 = 703, "Failed Parts";
    COS801 = 801, "Habitation Facilities";
    COS802 = 802, "Surface Mobility Systems";
    COS803 = 803, "Power Systems";
    COS804 = 804, "Robotic Systems";
    COS805 = 805, "Resource Utilization Systems";
    COS806 = 806, "Orbiting Service Systems";
    COS901 = 901, "Carriers, Non-propulsive Elements";
    COS902 = 902, "Propulsive Elements";
    COS4011 = 4011, "Spares";
    COS4012 = 4012, "Repair Parts";
    COS8041 = 8041, "Science Robotics";
    COS8042 = 8042, "Construction/Maintenance Robotics";
    COS9021 = 9021, "Launch Vehicles";
    COS9022 = 9022, "Upper Stages/In-Space Propulsion Systems";
    COS9023 = 9023, "Descent Stages";
    COS9024 = 9024, "Ascent Stages";
}

impl ClassOfSupply {
    /// Look up a catalogued class by id.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.0 == id)
    }

    pub fn id(self) -> u32 {
        self.0
    }

    /// Whether this class is strictly more specific than `sup`.
    ///
    /// Class 10 sits outside the hierarchy: `10` would otherwise look like a
    /// parent of nothing and a child of `1`.
    pub fn is_subclass_of(self, sup: ClassOfSupply) -> bool {
        if self.0 == 10 || sup.0 == 10 {
            return false;
        }
        let sub_digits = self.0.to_string();
        let sup_digits = sup.0.to_string();
        sup_digits.len() < sub_digits.len() && sub_digits.starts_with(&sup_digits)
    }

    /// Equal to `cos` or one of its subclasses.
    pub fn is_instance_of(self, cos: ClassOfSupply) -> bool {
        self == cos || self.is_subclass_of(cos)
    }

    /// The top-level class (0 through 10) this class belongs to.
    pub fn base_class(self) -> ClassOfSupply {
        (0..=10)
            .map(ClassOfSupply)
            .find(|base| self.is_instance_of(*base))
            .unwrap_or(ClassOfSupply::COS0)
    }
}

impl TryFrom<u32> for ClassOfSupply {
    type Error = UnknownClassOfSupply;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Self::from_id(id).ok_or(UnknownClassOfSupply(id))
    }
}

impl From<ClassOfSupply> for u32 {
    fn from(cos: ClassOfSupply) -> u32 {
        cos.0
    }
}

impl fmt::Display for ClassOfSupply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "COS {}: {}", self.0, self.name())
    }
}
