//! The mutable world the transfer subsystem operates on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::id::{TransferId, ZoneId};
use crate::sim::{SimClock, StateHash};
use crate::transfer::{Transfer, TransferKind};
use crate::zone::{Resource, Zone};

/// Zones, transfers and the clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogisticsState {
    pub clock: SimClock,
    pub zones: BTreeMap<ZoneId, Zone>,
    pub transfers: SlotMap<TransferId, Transfer>,
    pub next_sequence: u64,
}

impl LogisticsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(&id)
    }

    /// Zone lookup for the tick path.
    ///
    /// # Panics
    ///
    /// Panics if the zone is missing: a live transfer pointing at a removed
    /// zone means the owning engine corrupted the state.
    pub fn zone_mut_or_panic(&mut self, id: ZoneId) -> &mut Zone {
        match self.zones.get_mut(&id) {
            Some(zone) => zone,
            None => panic!("transfer state references missing zone {id}"),
        }
    }

    /// # Panics
    ///
    /// See [`zone_mut_or_panic`](Self::zone_mut_or_panic).
    pub fn zone_or_panic(&self, id: ZoneId) -> &Zone {
        match self.zones.get(&id) {
            Some(zone) => zone,
            None => panic!("transfer state references missing zone {id}"),
        }
    }

    /// Insert a transfer built by `make`, assigning its id and sequence.
    pub fn insert_transfer(&mut self, make: impl FnOnce(TransferId, u64) -> Transfer) -> TransferId {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.transfers.insert_with_key(|id| make(id, sequence))
    }

    /// Transfer ids in creation order.
    pub fn ids_by_sequence(&self) -> Vec<TransferId> {
        let mut ids: Vec<(u64, TransferId)> =
            self.transfers.iter().map(|(id, t)| (t.sequence, id)).collect();
        ids.sort_unstable_by_key(|(seq, _)| *seq);
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Transfer ids in capacity order: creation order, except that reversed
    /// streams sit at the back of the queue.
    pub fn ids_by_capacity_rank(&self) -> Vec<TransferId> {
        let mut ids: Vec<(u64, u64, TransferId)> = self
            .transfers
            .iter()
            .map(|(id, t)| (t.capacity_rank(), t.sequence, id))
            .collect();
        ids.sort_unstable_by_key(|(rank, seq, _)| (*rank, *seq));
        ids.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Issue the next capacity rank. Shares the counter with creation
    /// sequences so a rank is never reused.
    pub fn next_rank(&mut self) -> u64 {
        let rank = self.next_sequence;
        self.next_sequence += 1;
        rank
    }

    /// Total amount of `resource` sitting in zones.
    pub fn stock_total(&self, resource: Resource) -> f64 {
        self.zones.values().map(|z| z.available(resource)).sum()
    }

    /// Total amount of `resource` between zones.
    pub fn in_flight_total(&self, resource: Resource) -> f64 {
        self.transfers
            .values()
            .filter(|t| t.resource == resource)
            .map(Transfer::in_flight_amount)
            .sum()
    }

    /// Deterministic hash of the full state.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.clock.tick);
        h.write_f64(self.clock.time);
        h.write_u64(self.next_sequence);

        for zone in self.zones.values() {
            h.write_u32(zone.id.0);
            h.write_f64(zone.mass_remaining);
            h.write_f64(zone.stored_metal);
            h.write_f64(zone.methalox);
            h.write_f64(zone.probe_mass);
            h.write_f64(zone.structure_mass);
            h.write_bool(zone.depleted);
            h.write_u32(zone.mass_drivers);
            for (ty, count) in &zone.probes {
                h.write_u32(ty.0);
                h.write_f64(*count);
            }
        }

        for id in self.ids_by_sequence() {
            let t = &self.transfers[id];
            h.write_u64(t.sequence);
            h.write_u32(t.from.0);
            h.write_u32(t.to.0);
            match t.resource {
                Resource::Probes(ty) => h.write_u32(ty.0),
                Resource::Metal => h.write_u32(u32::MAX),
            }
            match &t.kind {
                TransferKind::OneTime(s) => {
                    h.write_f64(s.amount);
                    h.write_f64(s.departure_time);
                    h.write_f64(s.arrival_time);
                    h.write_f64(s.paused_at.unwrap_or(-1.0));
                    h.write_f64(s.paused_duration);
                    h.write_bool(s.completed);
                }
                TransferKind::Continuous(c) => {
                    h.write_f64(c.rate_percentage);
                    h.write_f64(c.accumulator);
                    h.write_bool(c.energy_blocked);
                    h.write_bool(c.paused);
                    h.write_bool(c.stopping);
                    h.write_f64(c.transfer_time);
                    h.write_f64(c.effective_rate);
                    h.write_u64(c.capacity_rank.unwrap_or(u64::MAX));
                    for b in &c.in_transit {
                        h.write_f64(b.amount);
                        h.write_f64(b.departure_time);
                        h.write_f64(b.arrival_time);
                        h.write_u32(b.from.0);
                        h.write_u32(b.to.0);
                    }
                }
            }
        }
        h.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{ContinuousStream, OneTimeShipment};

    fn with_transfers() -> LogisticsState {
        let mut state = LogisticsState::new();
        state.zones.insert(ZoneId(0), Zone::new(ZoneId(0), "a").with_metal(1000.0));
        state.zones.insert(ZoneId(1), Zone::new(ZoneId(1), "b"));
        for _ in 0..3 {
            state.insert_transfer(|id, sequence| Transfer {
                id,
                sequence,
                from: ZoneId(0),
                to: ZoneId(1),
                resource: Resource::Metal,
                kind: TransferKind::OneTime(OneTimeShipment::new(10.0, 0.0, 5.0)),
            });
        }
        state
    }

    #[test]
    fn sequences_are_assigned_in_order() {
        let state = with_transfers();
        let seqs: Vec<u64> = state
            .ids_by_sequence()
            .into_iter()
            .map(|id| state.transfers[id].sequence)
            .collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(state.next_sequence, 3);
    }

    #[test]
    fn totals_split_stock_and_flight() {
        let state = with_transfers();
        assert_eq!(state.stock_total(Resource::Metal), 1000.0);
        assert_eq!(state.in_flight_total(Resource::Metal), 30.0);
    }

    #[test]
    fn hash_changes_with_transfer_state() {
        let mut state = with_transfers();
        let before = state.state_hash();
        let id = state.insert_transfer(|id, sequence| Transfer {
            id,
            sequence,
            from: ZoneId(1),
            to: ZoneId(0),
            resource: Resource::Metal,
            kind: TransferKind::Continuous(ContinuousStream::new(5.0, 2.0)),
        });
        let with_stream = state.state_hash();
        assert_ne!(before, with_stream);
        state.transfers[id].continuous_mut().unwrap().accumulator = 1.0;
        assert_ne!(with_stream, state.state_hash());
    }

    #[test]
    fn identical_states_hash_identically() {
        assert_eq!(with_transfers().state_hash(), with_transfers().state_hash());
    }

    #[test]
    #[should_panic(expected = "missing zone #9")]
    fn missing_zone_panics_on_tick_path() {
        let mut state = with_transfers();
        state.zone_mut_or_panic(ZoneId(9));
    }
}
