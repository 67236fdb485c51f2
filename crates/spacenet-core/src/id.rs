use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies an element (vehicle, habitat, container, crew member) in the scenario arena.
    pub struct ElementId;

    /// Identifies a node (surface site, orbit, Lagrange point) in the network.
    pub struct NodeId;

    /// Identifies an edge (space, flight, or surface route) in the network.
    pub struct EdgeId;

    /// Identifies a mission in the scenario.
    pub struct MissionId;
}

/// Catalogue identifier of a resource.
///
/// Positive ids are catalogued resources, negative ids are generic
/// class-of-supply wildcards (`-cos`), and zero marks a resource that has
/// not been catalogued yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub i32);

impl ResourceId {
    pub fn is_generic(self) -> bool {
        self.0 < 0
    }

    pub fn is_catalogued(self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_sign_classifies() {
        assert!(ResourceId(-201).is_generic());
        assert!(!ResourceId(-201).is_catalogued());
        assert!(ResourceId(12).is_catalogued());
        assert!(!ResourceId(0).is_generic());
        assert!(!ResourceId(0).is_catalogued());
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ResourceId(1), "water");
        map.insert(ResourceId(2), "oxygen");
        assert_eq!(map[&ResourceId(1)], "water");
    }

    #[test]
    fn element_keys_order_by_insertion() {
        let mut arena = slotmap::SlotMap::<ElementId, ()>::with_key();
        let a = arena.insert(());
        let b = arena.insert(());
        assert!(a < b);
    }
}
