use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a transfer in the transfer arena. Stable for the transfer's
    /// lifetime; never reused while the transfer exists.
    pub struct TransferId;
}

/// Identifies an orbital zone. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub u32);

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies a probe type within a zone's probe population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProbeTypeId(pub u32);

impl ProbeTypeId {
    /// The single general-purpose probe every zone starts with.
    pub const DEFAULT: ProbeTypeId = ProbeTypeId(0);
}

/// Identifies a queued user command. Re-submitting a command with an id that
/// has already been applied is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommandId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_ids_order_by_value() {
        let mut ids = vec![ZoneId(3), ZoneId(1), ZoneId(2)];
        ids.sort();
        assert_eq!(ids, vec![ZoneId(1), ZoneId(2), ZoneId(3)]);
    }

    #[test]
    fn transfer_ids_are_distinct() {
        let mut sm = slotmap::SlotMap::<TransferId, ()>::with_key();
        let a = sm.insert(());
        let b = sm.insert(());
        assert_ne!(a, b);
        sm.remove(a);
        assert!(!sm.contains_key(a));
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ZoneId(0), "earth");
        map.insert(ZoneId(1), "mars");
        assert_eq!(map[&ZoneId(1)], "mars");
    }
}
