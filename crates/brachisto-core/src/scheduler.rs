//! Transfer creation and continuous batching.
//!
//! One-time transfers pay everything up front: fuel and payload leave the
//! source when the transfer is created. Continuous transfers accrue an
//! amount owed each tick and dispatch it in whole batches once the owed
//! amount reaches the minimum batch size. Fractions carry over to the next
//! tick on the transfer's own accumulator.

use tracing::{debug, info, warn};

use crate::capacity;
use crate::event::{EventBus, StallReason, TransferEvent};
use crate::id::TransferId;
use crate::physics::Physics;
use crate::propellant;
use crate::reachability;
use crate::sim::{SimTime, Ticks};
use crate::state::LogisticsState;
use crate::transfer::{
    Batch, ContinuousStream, CreateRequest, OneTimeShipment, Transfer, TransferError,
    TransferKind, TransferMode,
};
use crate::zone::Resource;

/// Slack for floating-point noise when comparing against batch thresholds.
const BATCH_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

fn validate_mode(mode: TransferMode) -> Result<(), TransferError> {
    match mode {
        TransferMode::OneTime { amount } => {
            if !(amount.is_finite() && amount > 0.0) {
                return Err(TransferError::InvalidAmount(amount));
            }
        }
        TransferMode::Continuous { rate_percentage } => {
            if !(rate_percentage.is_finite() && rate_percentage > 0.0 && rate_percentage <= 100.0) {
                return Err(TransferError::InvalidRate(rate_percentage));
            }
        }
    }
    Ok(())
}

/// Validate and create a transfer at the current clock time.
///
/// Nothing is debited unless the whole creation succeeds.
pub fn create_transfer(
    state: &mut LogisticsState,
    phys: &Physics<'_>,
    events: &mut EventBus,
    request: &CreateRequest,
) -> Result<TransferId, TransferError> {
    let CreateRequest {
        from,
        to,
        resource,
        mode,
    } = *request;

    if from == to {
        return Err(TransferError::SameZone(from));
    }
    let source = state.zone(from).ok_or(TransferError::UnknownZone(from))?;
    if state.zone(to).is_none() {
        return Err(TransferError::UnknownZone(to));
    }
    validate_mode(mode)?;

    let report = reachability::check(phys, source, to, resource)?;
    let travel = phys
        .travel_time(source, to, resource)
        .ok_or(TransferError::DegenerateRoute { from, to })?;
    let now = state.clock.time;
    let tick = state.clock.tick;

    let kind = match mode {
        TransferMode::OneTime { amount } => {
            let available = source.available(resource);
            if available < amount {
                return Err(TransferError::InsufficientResource {
                    requested: amount,
                    available,
                });
            }
            let fuel = propellant::fuel_required(phys, source, to, phys.payload_mass(resource, amount));
            if source.methalox < fuel {
                return Err(TransferError::InsufficientFuel {
                    required: fuel,
                    available: source.methalox,
                });
            }

            // Stock and fuel were both checked above; debit only now.
            let zone = state.zone_mut_or_panic(from);
            zone.burn_fuel(fuel);
            zone.withdraw(resource, amount, phys.config.probe_mass_kg);
            debug!(?from, ?to, amount, fuel_kg = fuel, "one-time shipment launched");
            TransferKind::OneTime(OneTimeShipment::new(amount, now, now + travel))
        }
        TransferMode::Continuous { rate_percentage } => {
            let mut stream = ContinuousStream::new(rate_percentage, travel);
            match resource {
                Resource::Metal => {
                    let cap = capacity::rate_cap(state, phys, from, to, state.next_sequence);
                    if cap <= 0.0 {
                        return Err(TransferError::NoCapacity(from));
                    }
                    let stored = source.stored_metal;
                    let nominal = stored * rate_percentage / 100.0;
                    if nominal > cap {
                        stream.rate_percentage = cap / stored * 100.0;
                        info!(
                            ?from,
                            ?to,
                            requested = rate_percentage,
                            granted = stream.rate_percentage,
                            "metal rate capped to remaining launch capacity"
                        );
                    }
                    stream.effective_rate = nominal.min(cap);
                }
                Resource::Probes(_) => {
                    stream.effective_rate = source.probe_production_rate * rate_percentage / 100.0;
                }
            }
            TransferKind::Continuous(stream)
        }
    };

    let id = state.insert_transfer(|id, sequence| Transfer {
        id,
        sequence,
        from,
        to,
        resource,
        kind,
    });
    info!(
        transfer = ?id,
        ?from,
        ?to,
        ?resource,
        required_dv = report.required_delta_v,
        travel_days = travel,
        "transfer created"
    );
    events.emit(TransferEvent::Created {
        transfer: id,
        from,
        to,
        resource,
        tick,
        time: now,
    });
    Ok(id)
}

// ---------------------------------------------------------------------------
// Continuous operation
// ---------------------------------------------------------------------------

/// Per-tick inputs to [`run_continuous`].
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    pub tick: Ticks,
    /// Simulation time at the end of this tick.
    pub now: SimTime,
    /// Days covered by this tick.
    pub dt: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleStats {
    pub batches_dispatched: usize,
    pub stalls: usize,
}

/// Advance every continuous transfer by one tick, in capacity order so each
/// metal stream sees this tick's rates of the streams ranked ahead of it.
pub fn run_continuous(
    state: &mut LogisticsState,
    phys: &Physics<'_>,
    events: &mut EventBus,
    clock: TickClock,
    net_energy_watts: f64,
) -> ScheduleStats {
    let mut stats = ScheduleStats::default();
    let blocked = net_energy_watts < 0.0;

    for id in state.ids_by_capacity_rank() {
        let transfer = &state.transfers[id];
        let Some(stream) = transfer.continuous() else {
            continue;
        };
        let (from, to, resource, rank) = (transfer.from, transfer.to, transfer.resource, transfer.capacity_rank());
        let previous_time = stream.transfer_time;

        // Energy gate: drivers are fully offline while the balance is negative.
        if resource.is_metal() {
            set_energy_blocked(state, events, id, blocked, clock);
            if blocked {
                if let Some(stream) = state.transfers[id].continuous_mut() {
                    stream.effective_rate = 0.0;
                }
                continue;
            }
        }

        let source = state.zone_or_panic(from);
        state.zone_or_panic(to);
        let travel = phys.travel_time(source, to, resource).unwrap_or(previous_time);

        let Some((sending, pct)) = state.transfers[id]
            .continuous()
            .map(|s| (s.is_sending(), s.rate_percentage))
        else {
            continue;
        };
        let rate = if sending {
            let nominal = match resource {
                Resource::Probes(_) => source.probe_production_rate * pct / 100.0,
                Resource::Metal => source.stored_metal * pct / 100.0,
            };
            match resource {
                Resource::Metal => nominal.min(capacity::rate_cap(state, phys, from, to, rank)),
                Resource::Probes(_) => nominal,
            }
        } else {
            0.0
        };

        if let Some(stream) = state.transfers[id].continuous_mut() {
            stream.transfer_time = travel;
            stream.effective_rate = rate;
            if sending {
                stream.accumulator += rate * clock.dt;
            }
        }
        if sending {
            dispatch_batches(state, phys, events, id, clock, &mut stats);
        }
    }
    stats
}

fn set_energy_blocked(
    state: &mut LogisticsState,
    events: &mut EventBus,
    id: TransferId,
    blocked: bool,
    clock: TickClock,
) {
    let Some(stream) = state.transfers[id].continuous_mut() else {
        return;
    };
    if stream.energy_blocked == blocked {
        return;
    }
    stream.energy_blocked = blocked;
    if blocked {
        warn!(transfer = ?id, "metal transfer blocked by negative energy balance");
        events.emit(TransferEvent::EnergyBlocked {
            transfer: id,
            tick: clock.tick,
            time: clock.now,
        });
    } else {
        info!(transfer = ?id, "metal transfer energy restored");
        events.emit(TransferEvent::EnergyRestored {
            transfer: id,
            tick: clock.tick,
            time: clock.now,
        });
    }
}

/// Turn the accumulator into whole batches while stock and fuel allow.
fn dispatch_batches(
    state: &mut LogisticsState,
    phys: &Physics<'_>,
    events: &mut EventBus,
    id: TransferId,
    clock: TickClock,
    stats: &mut ScheduleStats,
) {
    let LogisticsState {
        zones, transfers, ..
    } = state;
    let transfer = &mut transfers[id];
    let (from, to, resource) = (transfer.from, transfer.to, transfer.resource);
    let Some(stream) = transfer.continuous_mut() else {
        return;
    };
    let min_batch = phys.config.min_batch(resource.is_metal());
    let probe_mass_kg = phys.config.probe_mass_kg;

    while stream.accumulator + BATCH_EPSILON >= min_batch {
        let Some(source) = zones.get_mut(&from) else {
            panic!("transfer state references missing zone {from}");
        };
        let available = source.available(resource);
        if available + BATCH_EPSILON < min_batch {
            stall(events, id, StallReason::SourceEmpty, stream.accumulator, clock);
            stats.stalls += 1;
            break;
        }

        let amount = (stream.accumulator.min(available) + BATCH_EPSILON)
            .floor()
            .min(available);
        if amount <= 0.0 {
            break;
        }
        let fuel = match resource {
            Resource::Probes(_) => {
                propellant::fuel_required(phys, source, to, phys.payload_mass(resource, amount))
            }
            Resource::Metal => 0.0,
        };
        if source.methalox < fuel {
            stall(events, id, StallReason::InsufficientFuel, stream.accumulator, clock);
            stats.stalls += 1;
            break;
        }

        source.burn_fuel(fuel);
        source.withdraw(resource, amount, probe_mass_kg);
        stream.accumulator = (stream.accumulator - amount).max(0.0);
        let arrival_time = clock.now + stream.transfer_time;
        stream.push_batch(Batch {
            amount,
            departure_time: clock.now,
            arrival_time,
            resource,
            from,
            to,
        });
        stats.batches_dispatched += 1;

        debug!(transfer = ?id, amount, fuel_kg = fuel, arrival_time, "batch departed");
        events.emit(TransferEvent::BatchDeparted {
            transfer: id,
            amount,
            fuel_kg: fuel,
            arrival_time,
            tick: clock.tick,
            time: clock.now,
        });
    }
}

fn stall(events: &mut EventBus, id: TransferId, reason: StallReason, accumulated: f64, clock: TickClock) {
    warn!(transfer = ?id, ?reason, accumulated, "batch stalled");
    events.emit(TransferEvent::BatchStalled {
        transfer: id,
        reason,
        accumulated,
        tick: clock.tick,
        time: clock.now,
    });
}
