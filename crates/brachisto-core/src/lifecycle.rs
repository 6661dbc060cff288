//! Pause, resume, reverse, stop and delete.
//!
//! Commands addressing a transfer that no longer exists are a no-op: the
//! presentation layer may race with arrivals that remove finished transfers.
//! Every other rejection is reported as a [`TransferError`].

use tracing::info;

use crate::event::{EventBus, TransferEvent};
use crate::id::TransferId;
use crate::physics::Physics;
use crate::reachability;
use crate::scheduler::TickClock;
use crate::state::LogisticsState;
use crate::transfer::{TransferError, TransferKind};

/// Whether a command changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Unchanged,
}

/// Pause (`paused = true`) or resume a transfer.
///
/// A paused one-time shipment freezes in place: its arrival moves back by
/// the length of the pause. A paused stream stops accruing and dispatching
/// while its batches already in flight keep travelling.
pub fn set_paused(
    state: &mut LogisticsState,
    events: &mut EventBus,
    id: TransferId,
    paused: bool,
    clock: TickClock,
) -> CommandOutcome {
    let Some(transfer) = state.transfers.get_mut(id) else {
        return CommandOutcome::Unchanged;
    };
    let now = clock.now;
    let changed = match &mut transfer.kind {
        TransferKind::OneTime(s) if s.completed => false,
        TransferKind::OneTime(s) => match (paused, s.paused_at) {
            (true, None) => {
                s.paused_at = Some(now);
                true
            }
            (false, Some(start)) => {
                s.paused_duration += (now - start).max(0.0);
                s.paused_at = None;
                true
            }
            _ => false,
        },
        TransferKind::Continuous(c) if c.stopping || c.paused == paused => false,
        TransferKind::Continuous(c) => {
            c.paused = paused;
            if paused {
                c.effective_rate = 0.0;
            }
            true
        }
    };
    if !changed {
        return CommandOutcome::Unchanged;
    }

    if paused {
        info!(transfer = ?id, "transfer paused");
        events.emit(TransferEvent::Paused {
            transfer: id,
            tick: clock.tick,
            time: now,
        });
    } else {
        info!(transfer = ?id, "transfer resumed");
        events.emit(TransferEvent::Resumed {
            transfer: id,
            tick: clock.tick,
            time: now,
        });
    }
    CommandOutcome::Applied
}

/// Stop a continuous transfer: no further batches are dispatched and the
/// transfer is removed once its last batch lands. The undispatched
/// remainder is forgiven.
pub fn stop(
    state: &mut LogisticsState,
    events: &mut EventBus,
    id: TransferId,
    clock: TickClock,
) -> Result<CommandOutcome, TransferError> {
    let Some(transfer) = state.transfers.get_mut(id) else {
        return Ok(CommandOutcome::Unchanged);
    };
    let stream = transfer
        .continuous_mut()
        .ok_or(TransferError::NotContinuous(id))?;
    if stream.stopping {
        return Ok(CommandOutcome::Unchanged);
    }
    stream.stopping = true;
    stream.accumulator = 0.0;
    stream.effective_rate = 0.0;

    info!(transfer = ?id, in_flight = stream.in_transit.len(), "transfer stopping");
    events.emit(TransferEvent::Stopping {
        transfer: id,
        tick: clock.tick,
        time: clock.now,
    });
    Ok(CommandOutcome::Applied)
}

/// Remove a transfer immediately, returning everything in flight to the
/// zone it left. Fuel already burned is not refunded.
///
/// A stopping transfer is already on its way out and is left to drain.
pub fn delete(
    state: &mut LogisticsState,
    events: &mut EventBus,
    id: TransferId,
    probe_mass_kg: f64,
    clock: TickClock,
) -> CommandOutcome {
    let stopping = match state.transfers.get(id) {
        None => return CommandOutcome::Unchanged,
        Some(t) => t.continuous().is_some_and(|c| c.stopping),
    };
    if stopping {
        return CommandOutcome::Unchanged;
    }
    let Some(transfer) = state.transfers.remove(id) else {
        return CommandOutcome::Unchanged;
    };

    let mut refunded = 0.0;
    match transfer.kind {
        TransferKind::OneTime(s) if s.completed => {}
        TransferKind::OneTime(s) => {
            state
                .zone_mut_or_panic(transfer.from)
                .deposit(transfer.resource, s.amount, probe_mass_kg);
            refunded = s.amount;
        }
        TransferKind::Continuous(c) => {
            for batch in c.in_transit {
                state
                    .zone_mut_or_panic(batch.from)
                    .deposit(batch.resource, batch.amount, probe_mass_kg);
                refunded += batch.amount;
            }
        }
    }

    info!(transfer = ?id, refunded, "transfer cancelled");
    events.emit(TransferEvent::Cancelled {
        transfer: id,
        refunded,
        tick: clock.tick,
        time: clock.now,
    });
    events.emit(TransferEvent::Removed {
        transfer: id,
        tick: clock.tick,
        time: clock.now,
    });
    CommandOutcome::Applied
}

/// Swap source and destination of a continuous transfer.
///
/// The reversed route must pass the same reachability gate a new transfer
/// would. Rate, accumulator and batches already in flight are kept; those
/// batches still land where they were aimed. On its new source the stream
/// queues for mass-driver capacity behind every stream already there.
pub fn reverse(
    state: &mut LogisticsState,
    phys: &Physics<'_>,
    events: &mut EventBus,
    id: TransferId,
    clock: TickClock,
) -> Result<CommandOutcome, TransferError> {
    let Some(transfer) = state.transfers.get(id) else {
        return Ok(CommandOutcome::Unchanged);
    };
    if !transfer.is_continuous() {
        return Err(TransferError::NotContinuous(id));
    }
    let (new_from, new_to, resource) = (transfer.to, transfer.from, transfer.resource);
    let source = state.zone(new_from).ok_or(TransferError::UnknownZone(new_from))?;
    if state.zone(new_to).is_none() {
        return Err(TransferError::UnknownZone(new_to));
    }
    reachability::check(phys, source, new_to, resource)?;
    let travel = phys.travel_time(source, new_to, resource);

    let rank = state.next_rank();
    let transfer = &mut state.transfers[id];
    transfer.from = new_from;
    transfer.to = new_to;
    if let Some(stream) = transfer.continuous_mut() {
        stream.capacity_rank = Some(rank);
        if let Some(days) = travel {
            stream.transfer_time = days;
        }
    }

    info!(transfer = ?id, from = ?new_from, to = ?new_to, "transfer reversed");
    events.emit(TransferEvent::Reversed {
        transfer: id,
        from: new_from,
        to: new_to,
        tick: clock.tick,
        time: clock.now,
    });
    Ok(CommandOutcome::Applied)
}
