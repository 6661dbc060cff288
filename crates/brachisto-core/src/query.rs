//! Read-only views of transfer state for the presentation layer.
//!
//! All types are owned copies; nothing borrows into the transfer arena.

use serde::{Deserialize, Serialize};

use crate::id::{TransferId, ZoneId};
use crate::oracle::OrbitalOracle;
use crate::sim::SimTime;
use crate::state::LogisticsState;
use crate::transfer::{Transfer, TransferKind, TransferStatus};
use crate::zone::Resource;

// ---------------------------------------------------------------------------
// Transfer view
// ---------------------------------------------------------------------------

/// Summary of one transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferView {
    pub id: TransferId,
    pub sequence: u64,
    pub from: ZoneId,
    pub to: ZoneId,
    pub resource: Resource,
    pub status: TransferStatus,
    /// Amount between zones right now.
    pub in_flight: f64,
    /// `None` for one-time shipments.
    pub rate_percentage: Option<f64>,
    /// Send rate applied on the last tick, per day. Zero for one-time.
    pub effective_rate: f64,
    /// Owed but not yet dispatched. Zero for one-time.
    pub accumulator: f64,
    pub energy_blocked: bool,
    /// Travel time of new batches (continuous) or of the shipment, days.
    pub transfer_time: f64,
    pub departure_time: Option<SimTime>,
    /// Effective arrival of a one-time shipment, pauses included.
    pub arrival_time: Option<SimTime>,
    pub batches_in_flight: usize,
}

impl TransferView {
    pub fn of(transfer: &Transfer) -> Self {
        let mut view = TransferView {
            id: transfer.id,
            sequence: transfer.sequence,
            from: transfer.from,
            to: transfer.to,
            resource: transfer.resource,
            status: transfer.status(),
            in_flight: transfer.in_flight_amount(),
            rate_percentage: None,
            effective_rate: 0.0,
            accumulator: 0.0,
            energy_blocked: false,
            transfer_time: 0.0,
            departure_time: None,
            arrival_time: None,
            batches_in_flight: 0,
        };
        match &transfer.kind {
            TransferKind::OneTime(s) => {
                view.transfer_time = s.arrival_time - s.departure_time;
                view.departure_time = Some(s.departure_time);
                view.arrival_time = Some(s.effective_arrival());
            }
            TransferKind::Continuous(c) => {
                view.rate_percentage = Some(c.rate_percentage);
                view.effective_rate = c.effective_rate;
                view.accumulator = c.accumulator;
                view.energy_blocked = c.energy_blocked;
                view.transfer_time = c.transfer_time;
                view.batches_in_flight = c.in_transit.len();
            }
        }
        view
    }
}

/// Views of every live transfer, in creation order.
pub fn active_transfers(state: &LogisticsState) -> Vec<TransferView> {
    state
        .ids_by_sequence()
        .into_iter()
        .map(|id| TransferView::of(&state.transfers[id]))
        .collect()
}

// ---------------------------------------------------------------------------
// In-transit positions
// ---------------------------------------------------------------------------

/// Something between zones, for drawing on the system map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InTransitPosition {
    pub transfer: TransferId,
    pub from: ZoneId,
    pub to: ZoneId,
    pub resource: Resource,
    /// Heliocentric distance, interpolated linearly between the endpoints'
    /// orbital radii. Zero when the oracle does not know either zone.
    pub distance_au: f64,
    pub mass_kg: f64,
    /// Fraction of the trip completed, 0..=1.
    pub progress: f64,
    pub arrival_time: SimTime,
}

fn radius(oracle: &dyn OrbitalOracle, zone: ZoneId) -> Option<f64> {
    oracle.zone_info(zone).map(|info| info.radius_au)
}

fn position(
    oracle: &dyn OrbitalOracle,
    transfer: TransferId,
    (from, to): (ZoneId, ZoneId),
    resource: Resource,
    mass_kg: f64,
    progress: f64,
    arrival_time: SimTime,
) -> InTransitPosition {
    let progress = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 1.0 };
    let distance_au = match (radius(oracle, from), radius(oracle, to)) {
        (Some(a), Some(b)) => a + (b - a) * progress,
        _ => 0.0,
    };
    InTransitPosition {
        transfer,
        from,
        to,
        resource,
        distance_au,
        mass_kg,
        progress,
        arrival_time,
    }
}

/// Every shipment and batch in flight at `now`, ordered by arrival time.
pub fn in_transit_positions(
    state: &LogisticsState,
    oracle: &dyn OrbitalOracle,
    probe_mass_kg: f64,
    now: SimTime,
) -> Vec<InTransitPosition> {
    let mut out = Vec::new();
    for id in state.ids_by_sequence() {
        let t = &state.transfers[id];
        match &t.kind {
            TransferKind::OneTime(s) if s.completed => {}
            TransferKind::OneTime(s) => {
                let duration = s.arrival_time - s.departure_time;
                let progress = if duration > 0.0 { s.elapsed_travel(now) / duration } else { 1.0 };
                out.push(position(
                    oracle,
                    id,
                    (t.from, t.to),
                    t.resource,
                    t.resource.mass_kg(s.amount, probe_mass_kg),
                    progress,
                    s.effective_arrival(),
                ));
            }
            TransferKind::Continuous(c) => {
                for b in &c.in_transit {
                    let duration = b.arrival_time - b.departure_time;
                    let progress = if duration > 0.0 { (now - b.departure_time) / duration } else { 1.0 };
                    out.push(position(
                        oracle,
                        id,
                        (b.from, b.to),
                        b.resource,
                        b.resource.mass_kg(b.amount, probe_mass_kg),
                        progress,
                        b.arrival_time,
                    ));
                }
            }
        }
    }
    // Stable: ties keep creation order.
    out.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time));
    out
}
