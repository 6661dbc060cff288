//! Transfer records, their lifecycle status and creation requests.
//!
//! A transfer is either a [`OneTimeShipment`] (a single payload debited at
//! creation) or a [`ContinuousStream`] (a rate realized as discrete
//! [`Batch`]es). Both live in the transfer arena keyed by
//! [`TransferId`](crate::id::TransferId); all per-transfer bookkeeping
//! (accumulator, effective rate, batches) is stored on the record itself.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::id::{TransferId, ZoneId};
use crate::reachability::ReachabilityReport;
use crate::sim::SimTime;
use crate::zone::Resource;

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

/// One discrete in-flight shipment of a continuous transfer.
///
/// Endpoints are captured at departure so a later reversal neither
/// redirects the batch nor changes where a cancellation refunds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub amount: f64,
    pub departure_time: SimTime,
    pub arrival_time: SimTime,
    pub resource: Resource,
    pub from: ZoneId,
    pub to: ZoneId,
}

// ---------------------------------------------------------------------------
// One-time shipments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneTimeShipment {
    pub amount: f64,
    pub departure_time: SimTime,
    /// Arrival ignoring pauses.
    pub arrival_time: SimTime,
    /// When the current pause started, if paused.
    pub paused_at: Option<SimTime>,
    /// Total time spent paused in completed pauses.
    pub paused_duration: f64,
    pub completed: bool,
}

impl OneTimeShipment {
    pub fn new(amount: f64, departure_time: SimTime, arrival_time: SimTime) -> Self {
        Self {
            amount,
            departure_time,
            arrival_time,
            paused_at: None,
            paused_duration: 0.0,
            completed: false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Arrival shifted by every completed pause.
    pub fn effective_arrival(&self) -> SimTime {
        self.arrival_time + self.paused_duration
    }

    /// Whether the shipment lands at or before `now`. Paused shipments never do.
    pub fn is_due(&self, now: SimTime) -> bool {
        !self.completed && !self.is_paused() && self.effective_arrival() <= now
    }

    /// Days spent moving, excluding pauses (including an ongoing one).
    pub fn elapsed_travel(&self, now: SimTime) -> f64 {
        let ongoing = self.paused_at.map_or(0.0, |start| (now - start).max(0.0));
        (now - self.departure_time - self.paused_duration - ongoing).max(0.0)
    }
}

// ---------------------------------------------------------------------------
// Continuous streams
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousStream {
    /// Share of the source stock sent per day, 0..=100.
    pub rate_percentage: f64,
    /// Batches in flight, ordered by arrival time.
    pub in_transit: VecDeque<Batch>,
    /// Amount owed but not yet dispatched.
    pub accumulator: f64,
    pub energy_blocked: bool,
    pub paused: bool,
    pub stopping: bool,
    /// Travel time for batches dispatched now, days.
    pub transfer_time: f64,
    /// Send rate actually applied on the last tick, per day.
    pub effective_rate: f64,
    /// Place in the source zone's capacity queue once reversed. `None`
    /// means the stream still queues by its creation sequence.
    #[serde(default)]
    pub capacity_rank: Option<u64>,
}

impl ContinuousStream {
    pub fn new(rate_percentage: f64, transfer_time: f64) -> Self {
        Self {
            rate_percentage,
            in_transit: VecDeque::new(),
            accumulator: 0.0,
            energy_blocked: false,
            paused: false,
            stopping: false,
            transfer_time,
            effective_rate: 0.0,
            capacity_rank: None,
        }
    }

    /// Append a batch, clamping its arrival so the queue stays ordered.
    pub fn push_batch(&mut self, mut batch: Batch) {
        if let Some(last) = self.in_transit.back()
            && batch.arrival_time < last.arrival_time
        {
            batch.arrival_time = last.arrival_time;
        }
        self.in_transit.push_back(batch);
    }

    /// Remove and return every batch due at or before `now`.
    pub fn take_due(&mut self, now: SimTime) -> Vec<Batch> {
        let mut due = Vec::new();
        while self.in_transit.front().is_some_and(|b| b.arrival_time <= now) {
            if let Some(batch) = self.in_transit.pop_front() {
                due.push(batch);
            }
        }
        due
    }

    pub fn in_transit_amount(&self) -> f64 {
        self.in_transit.iter().map(|b| b.amount).sum()
    }

    /// Whether this stream may dispatch new batches.
    pub fn is_sending(&self) -> bool {
        !self.paused && !self.stopping
    }

    /// Whether this stream holds a share of its zone's launch capacity.
    pub fn commits_capacity(&self) -> bool {
        self.is_sending() && !self.energy_blocked
    }
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransferKind {
    OneTime(OneTimeShipment),
    Continuous(ContinuousStream),
}

/// Derived lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferStatus {
    Traveling,
    Paused,
    Completed,
    Active,
    Stopping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    /// Creation order; breaks arrival ties.
    pub sequence: u64,
    pub from: ZoneId,
    pub to: ZoneId,
    pub resource: Resource,
    pub kind: TransferKind,
}

impl Transfer {
    pub fn status(&self) -> TransferStatus {
        match &self.kind {
            TransferKind::OneTime(s) if s.completed => TransferStatus::Completed,
            TransferKind::OneTime(s) if s.is_paused() => TransferStatus::Paused,
            TransferKind::OneTime(_) => TransferStatus::Traveling,
            TransferKind::Continuous(c) if c.stopping => TransferStatus::Stopping,
            TransferKind::Continuous(c) if c.paused => TransferStatus::Paused,
            TransferKind::Continuous(_) => TransferStatus::Active,
        }
    }

    /// Precedence on the source zone's mass drivers: lower ranks are
    /// served first.
    pub fn capacity_rank(&self) -> u64 {
        self.continuous()
            .and_then(|c| c.capacity_rank)
            .unwrap_or(self.sequence)
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self.kind, TransferKind::Continuous(_))
    }

    pub fn continuous(&self) -> Option<&ContinuousStream> {
        match &self.kind {
            TransferKind::Continuous(c) => Some(c),
            TransferKind::OneTime(_) => None,
        }
    }

    pub fn continuous_mut(&mut self) -> Option<&mut ContinuousStream> {
        match &mut self.kind {
            TransferKind::Continuous(c) => Some(c),
            TransferKind::OneTime(_) => None,
        }
    }

    pub fn one_time(&self) -> Option<&OneTimeShipment> {
        match &self.kind {
            TransferKind::OneTime(s) => Some(s),
            TransferKind::Continuous(_) => None,
        }
    }

    /// Amount currently between zones.
    pub fn in_flight_amount(&self) -> f64 {
        match &self.kind {
            TransferKind::OneTime(s) if s.completed => 0.0,
            TransferKind::OneTime(s) => s.amount,
            TransferKind::Continuous(c) => c.in_transit_amount(),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransferMode {
    /// Ship `amount` once (probes in units, metal in kg).
    OneTime { amount: f64 },
    /// Ship a percentage of the source stock per day.
    Continuous { rate_percentage: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub from: ZoneId,
    pub to: ZoneId,
    pub resource: Resource,
    pub mode: TransferMode,
}

impl CreateRequest {
    pub fn one_time(from: ZoneId, to: ZoneId, resource: Resource, amount: f64) -> Self {
        Self {
            from,
            to,
            resource,
            mode: TransferMode::OneTime { amount },
        }
    }

    pub fn continuous(from: ZoneId, to: ZoneId, resource: Resource, rate_percentage: f64) -> Self {
        Self {
            from,
            to,
            resource,
            mode: TransferMode::Continuous { rate_percentage },
        }
    }
}

/// Structured result of a creation attempt. Never panics on user input.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    pub success: bool,
    pub transfer: Option<TransferId>,
    pub error: Option<TransferError>,
}

impl CreateOutcome {
    pub fn created(id: TransferId) -> Self {
        Self {
            success: true,
            transfer: Some(id),
            error: None,
        }
    }

    pub fn rejected(error: TransferError) -> Self {
        Self {
            success: false,
            transfer: None,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<TransferId, TransferError> {
        match (self.transfer, self.error) {
            (Some(id), _) => Ok(id),
            (None, Some(err)) => Err(err),
            (None, None) => Err(TransferError::Internal("creation produced no transfer")),
        }
    }
}

impl From<Result<TransferId, TransferError>> for CreateOutcome {
    fn from(result: Result<TransferId, TransferError>) -> Self {
        match result {
            Ok(id) => CreateOutcome::created(id),
            Err(err) => CreateOutcome::rejected(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a transfer request or lifecycle command is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransferError {
    #[error("source and destination are the same zone ({0})")]
    SameZone(ZoneId),

    #[error("zone {0} does not exist")]
    UnknownZone(ZoneId),

    #[error("amount must be positive and finite, got {0}")]
    InvalidAmount(f64),

    #[error("rate must be in (0, 100], got {0}")]
    InvalidRate(f64),

    #[error("no usable route from zone {from} to zone {to}")]
    DegenerateRoute { from: ZoneId, to: ZoneId },

    #[error("zone {0} has no mass driver")]
    NoMassDriver(ZoneId),

    #[error("{0}")]
    Unreachable(Box<ReachabilityReport>),

    #[error("insufficient fuel: need {required:.1} kg methalox, have {available:.1} kg")]
    InsufficientFuel { required: f64, available: f64 },

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientResource { requested: f64, available: f64 },

    #[error("zone {0} has no launch capacity left")]
    NoCapacity(ZoneId),

    #[error("transfer {0:?} is not continuous")]
    NotContinuous(TransferId),

    #[error("internal error: {0}")]
    Internal(&'static str),
}
