//! Crediting arrived batches and shipments to their destinations.
//!
//! Everything due within a tick is collected first and then applied in
//! arrival-time order, ties broken by transfer creation sequence, so the
//! event log is identical across replays regardless of arena layout.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::event::{EventBus, TransferEvent};
use crate::id::TransferId;
use crate::scheduler::TickClock;
use crate::sim::SimTime;
use crate::state::LogisticsState;
use crate::transfer::{Batch, TransferKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrivalStats {
    pub batches_arrived: usize,
    pub shipments_completed: usize,
    pub transfers_removed: usize,
}

enum Due {
    Batch(Batch),
    Shipment,
}

struct DueItem {
    arrival: SimTime,
    sequence: u64,
    transfer: TransferId,
    what: Due,
}

fn arrival_order(a: &DueItem, b: &DueItem) -> Ordering {
    a.arrival
        .total_cmp(&b.arrival)
        .then_with(|| a.sequence.cmp(&b.sequence))
}

/// Resolve every arrival due at `clock.now`, then drop drained stopping
/// transfers.
pub fn resolve_arrivals(
    state: &mut LogisticsState,
    events: &mut EventBus,
    probe_mass_kg: f64,
    clock: TickClock,
) -> ArrivalStats {
    let mut stats = ArrivalStats::default();
    let now = clock.now;

    let mut due = Vec::new();
    for (id, transfer) in state.transfers.iter_mut() {
        let sequence = transfer.sequence;
        match &mut transfer.kind {
            TransferKind::Continuous(stream) => {
                due.extend(stream.take_due(now).into_iter().map(|batch| DueItem {
                    arrival: batch.arrival_time,
                    sequence,
                    transfer: id,
                    what: Due::Batch(batch),
                }));
            }
            TransferKind::OneTime(shipment) if shipment.is_due(now) => due.push(DueItem {
                arrival: shipment.effective_arrival(),
                sequence,
                transfer: id,
                what: Due::Shipment,
            }),
            TransferKind::OneTime(_) => {}
        }
    }
    due.sort_by(arrival_order);

    for item in due {
        match item.what {
            Due::Batch(batch) => {
                state
                    .zone_mut_or_panic(batch.to)
                    .deposit(batch.resource, batch.amount, probe_mass_kg);
                stats.batches_arrived += 1;
                debug!(transfer = ?item.transfer, to = ?batch.to, amount = batch.amount, "batch arrived");
                events.emit(TransferEvent::BatchArrived {
                    transfer: item.transfer,
                    to: batch.to,
                    amount: batch.amount,
                    tick: clock.tick,
                    time: now,
                });
            }
            Due::Shipment => {
                let Some(mut transfer) = state.transfers.remove(item.transfer) else {
                    continue;
                };
                let TransferKind::OneTime(shipment) = &mut transfer.kind else {
                    continue;
                };
                shipment.completed = true;
                let amount = shipment.amount;
                state
                    .zone_mut_or_panic(transfer.to)
                    .deposit(transfer.resource, amount, probe_mass_kg);
                stats.shipments_completed += 1;
                stats.transfers_removed += 1;
                info!(transfer = ?item.transfer, to = ?transfer.to, amount, "shipment arrived");
                events.emit(TransferEvent::ShipmentArrived {
                    transfer: item.transfer,
                    to: transfer.to,
                    amount,
                    tick: clock.tick,
                    time: now,
                });
                events.emit(TransferEvent::Removed {
                    transfer: item.transfer,
                    tick: clock.tick,
                    time: now,
                });
            }
        }
    }

    for id in state.ids_by_sequence() {
        let drained = state.transfers[id]
            .continuous()
            .is_some_and(|s| s.stopping && s.in_transit.is_empty());
        if drained {
            state.transfers.remove(id);
            stats.transfers_removed += 1;
            info!(transfer = ?id, "stopped transfer drained");
            events.emit(TransferEvent::Removed {
                transfer: id,
                tick: clock.tick,
                time: now,
            });
        }
    }
    stats
}
