//! Typed transfer events with pre-allocated ring buffers.
//!
//! Events are emitted while a tick runs and delivered in one batch at the
//! end of it, in emission order. Each event kind has its own
//! [`EventBuffer`] ring buffer; when a buffer is full the oldest entries are
//! dropped.
//!
//! Kinds can be suppressed via [`EventBus::suppress`], which prevents any
//! allocation or recording for that kind. Listeners are passive: they see
//! events read-only and cannot mutate the simulation.

use serde::{Deserialize, Serialize};

use crate::id::{TransferId, ZoneId};
use crate::sim::{SimTime, Ticks};
use crate::zone::Resource;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Why a continuous transfer could not dispatch a batch it owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StallReason {
    /// The source holds less than one minimum batch.
    SourceEmpty,
    /// Not enough methalox to launch the batch.
    InsufficientFuel,
}

/// A transfer subsystem event. All events carry the tick and the simulation
/// time at which they occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransferEvent {
    // -- Creation and movement --
    Created {
        transfer: TransferId,
        from: ZoneId,
        to: ZoneId,
        resource: Resource,
        tick: Ticks,
        time: SimTime,
    },
    BatchDeparted {
        transfer: TransferId,
        amount: f64,
        fuel_kg: f64,
        arrival_time: SimTime,
        tick: Ticks,
        time: SimTime,
    },
    BatchArrived {
        transfer: TransferId,
        to: ZoneId,
        amount: f64,
        tick: Ticks,
        time: SimTime,
    },
    ShipmentArrived {
        transfer: TransferId,
        to: ZoneId,
        amount: f64,
        tick: Ticks,
        time: SimTime,
    },
    BatchStalled {
        transfer: TransferId,
        reason: StallReason,
        accumulated: f64,
        tick: Ticks,
        time: SimTime,
    },

    // -- Energy --
    EnergyBlocked {
        transfer: TransferId,
        tick: Ticks,
        time: SimTime,
    },
    EnergyRestored {
        transfer: TransferId,
        tick: Ticks,
        time: SimTime,
    },

    // -- Lifecycle --
    Paused {
        transfer: TransferId,
        tick: Ticks,
        time: SimTime,
    },
    Resumed {
        transfer: TransferId,
        tick: Ticks,
        time: SimTime,
    },
    Reversed {
        transfer: TransferId,
        from: ZoneId,
        to: ZoneId,
        tick: Ticks,
        time: SimTime,
    },
    Stopping {
        transfer: TransferId,
        tick: Ticks,
        time: SimTime,
    },
    Cancelled {
        transfer: TransferId,
        refunded: f64,
        tick: Ticks,
        time: SimTime,
    },
    Removed {
        transfer: TransferId,
        tick: Ticks,
        time: SimTime,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    BatchDeparted,
    BatchArrived,
    ShipmentArrived,
    BatchStalled,
    EnergyBlocked,
    EnergyRestored,
    Paused,
    Resumed,
    Reversed,
    Stopping,
    Cancelled,
    Removed,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 13;

impl TransferEvent {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            TransferEvent::Created { .. } => EventKind::Created,
            TransferEvent::BatchDeparted { .. } => EventKind::BatchDeparted,
            TransferEvent::BatchArrived { .. } => EventKind::BatchArrived,
            TransferEvent::ShipmentArrived { .. } => EventKind::ShipmentArrived,
            TransferEvent::BatchStalled { .. } => EventKind::BatchStalled,
            TransferEvent::EnergyBlocked { .. } => EventKind::EnergyBlocked,
            TransferEvent::EnergyRestored { .. } => EventKind::EnergyRestored,
            TransferEvent::Paused { .. } => EventKind::Paused,
            TransferEvent::Resumed { .. } => EventKind::Resumed,
            TransferEvent::Reversed { .. } => EventKind::Reversed,
            TransferEvent::Stopping { .. } => EventKind::Stopping,
            TransferEvent::Cancelled { .. } => EventKind::Cancelled,
            TransferEvent::Removed { .. } => EventKind::Removed,
        }
    }

    /// The transfer this event is about.
    pub fn transfer(&self) -> TransferId {
        match *self {
            TransferEvent::Created { transfer, .. }
            | TransferEvent::BatchDeparted { transfer, .. }
            | TransferEvent::BatchArrived { transfer, .. }
            | TransferEvent::ShipmentArrived { transfer, .. }
            | TransferEvent::BatchStalled { transfer, .. }
            | TransferEvent::EnergyBlocked { transfer, .. }
            | TransferEvent::EnergyRestored { transfer, .. }
            | TransferEvent::Paused { transfer, .. }
            | TransferEvent::Resumed { transfer, .. }
            | TransferEvent::Reversed { transfer, .. }
            | TransferEvent::Stopping { transfer, .. }
            | TransferEvent::Cancelled { transfer, .. }
            | TransferEvent::Removed { transfer, .. } => transfer,
        }
    }
}

impl EventKind {
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::Created,
        EventKind::BatchDeparted,
        EventKind::BatchArrived,
        EventKind::ShipmentArrived,
        EventKind::BatchStalled,
        EventKind::EnergyBlocked,
        EventKind::EnergyRestored,
        EventKind::Paused,
        EventKind::Resumed,
        EventKind::Reversed,
        EventKind::Stopping,
        EventKind::Cancelled,
        EventKind::Removed,
    ];

    /// Convert to usize index for array lookups.
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// An event stamped with its position in the global emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped {
    pub order: u64,
    pub event: TransferEvent,
}

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    /// Pre-allocated storage.
    events: Vec<Option<Stamped>>,
    /// Write position (wraps around).
    head: usize,
    /// Number of events currently stored (may be less than capacity).
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event into the ring buffer. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Stamped) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total events written since creation (including dropped).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of events that were dropped because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Iterate over events from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        // head points to the next write position, which is the oldest entry once full
        let start = if self.len < self.capacity() { 0 } else { self.head };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over an [`EventBuffer`], from oldest to newest.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Stamped;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&TransferEvent)>;

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One ring buffer per event kind, listener lists and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: Vec<(EventKind, PassiveListener)>,
    default_capacity: usize,
    /// Global emission counter used to interleave kinds on delivery.
    next_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("listeners", &self.listeners.len())
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Vec::new(),
            default_capacity,
            next_order: 0,
        }
    }

    /// Suppress an event kind. Suppressed events are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Record an event. No-op if its kind is suppressed.
    pub fn emit(&mut self, event: TransferEvent) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let order = self.next_order;
        self.next_order += 1;
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(Stamped { order, event });
    }

    /// Register a passive listener for one event kind. Listeners run in
    /// registration order.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.listeners.push((kind, listener));
    }

    /// Deliver every buffered event to its listeners in emission order, clear
    /// the buffers and return the delivered events.
    pub fn deliver(&mut self) -> Vec<TransferEvent> {
        let mut pending: Vec<Stamped> = Vec::new();
        for (idx, slot) in self.buffers.iter_mut().enumerate() {
            if self.suppressed[idx] {
                continue;
            }
            if let Some(buffer) = slot.as_mut() {
                pending.extend(buffer.iter().cloned());
                buffer.clear();
            }
        }
        pending.sort_unstable_by_key(|s| s.order);

        for stamped in &pending {
            let kind = stamped.event.kind();
            for (listen_kind, listener) in &mut self.listeners {
                if *listen_kind == kind {
                    listener(&stamped.event);
                }
            }
        }
        pending.into_iter().map(|s| s.event).collect()
    }

    /// Read-only view of the buffer for one kind.
    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()].as_ref().map_or(0, EventBuffer::len)
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map_or(0, EventBuffer::total_written)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
