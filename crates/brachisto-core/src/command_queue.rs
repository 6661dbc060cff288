//! Queue of user commands applied during the lifecycle phase of a tick.
//!
//! Commands arrive from the presentation layer between ticks and are applied
//! in submission order after arrivals have been resolved. Every command
//! carries a [`CommandId`]; a repeated id is dropped at submission, which is
//! what makes replayed or double-clicked commands harmless.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::id::{CommandId, TransferId};
use crate::sim::Ticks;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A lifecycle operation on an existing transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferCommand {
    /// Pause (`true`) or resume (`false`).
    Pause { transfer: TransferId, paused: bool },
    /// Swap source and destination of a continuous transfer.
    Reverse { transfer: TransferId },
    /// Stop dispatching and remove once drained.
    Stop { transfer: TransferId },
    /// Remove now, refunding anything in flight.
    Delete { transfer: TransferId },
}

impl TransferCommand {
    pub fn transfer(&self) -> TransferId {
        match *self {
            TransferCommand::Pause { transfer, .. }
            | TransferCommand::Reverse { transfer }
            | TransferCommand::Stop { transfer }
            | TransferCommand::Delete { transfer } => transfer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedCommand {
    pub id: CommandId,
    pub command: TransferCommand,
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// Commands waiting for the next tick, plus an optional bounded history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandQueue {
    pending: Vec<QueuedCommand>,
    /// Every id below this has been accepted.
    seen_below: u64,
    /// Accepted ids at or above `seen_below`. Stays empty while ids arrive
    /// in order.
    seen_sparse: BTreeSet<u64>,
    /// Executed commands: (tick, command).
    history: Vec<(Ticks, QueuedCommand)>,
    /// Maximum history entries to retain. 0 = no history.
    max_history: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that retains up to `max_history` executed commands.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    /// Queue a command. Returns `false` if its id was already used.
    pub fn push(&mut self, id: CommandId, command: TransferCommand) -> bool {
        if self.has_seen(id) {
            return false;
        }
        self.seen_sparse.insert(id.0);
        while self.seen_sparse.remove(&self.seen_below) {
            self.seen_below += 1;
        }
        self.pending.push(QueuedCommand { id, command });
        true
    }

    /// Whether `id` has been accepted before.
    pub fn has_seen(&self, id: CommandId) -> bool {
        id.0 < self.seen_below || self.seen_sparse.contains(&id.0)
    }

    /// Drain all pending commands in submission order, recording them in
    /// history under `tick`.
    pub fn drain(&mut self, tick: Ticks) -> Vec<QueuedCommand> {
        let commands: Vec<QueuedCommand> = self.pending.drain(..).collect();

        if self.max_history > 0 {
            self.history.extend(commands.iter().map(|cmd| (tick, *cmd)));
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        commands
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[(Ticks, QueuedCommand)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn make_transfer_id() -> TransferId {
        let mut sm = SlotMap::<TransferId, ()>::with_key();
        sm.insert(())
    }

    fn stop() -> TransferCommand {
        TransferCommand::Stop {
            transfer: make_transfer_id(),
        }
    }

    #[test]
    fn new_queue_is_empty() {
        let queue = CommandQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let mut queue = CommandQueue::new();
        assert!(queue.push(CommandId(1), stop()));
        assert!(!queue.push(CommandId(1), stop()));
        assert_eq!(queue.pending_count(), 1);
        queue.drain(0);
        assert!(!queue.push(CommandId(1), stop()));
        assert!(queue.has_seen(CommandId(1)));
    }

    #[test]
    fn in_order_ids_leave_no_sparse_entries() {
        let mut queue = CommandQueue::new();
        for i in 0..1000 {
            assert!(queue.push(CommandId(i), stop()));
        }
        assert!(queue.seen_sparse.is_empty());
        assert!(queue.has_seen(CommandId(999)));
        assert!(!queue.has_seen(CommandId(1000)));
        assert!(!queue.push(CommandId(500), stop()));
    }

    #[test]
    fn gaps_are_filled_as_ids_arrive() {
        let mut queue = CommandQueue::new();
        queue.push(CommandId(2), stop());
        queue.push(CommandId(0), stop());
        assert!(!queue.has_seen(CommandId(1)));
        assert_eq!(queue.seen_sparse.len(), 1);
        assert!(queue.push(CommandId(1), stop()));
        assert!(queue.seen_sparse.is_empty());
        assert!(!queue.push(CommandId(2), stop()));
        assert_eq!(queue.pending_count(), 3);
    }

    #[test]
    fn drain_preserves_order() {
        let mut queue = CommandQueue::new();
        for i in 0..3 {
            queue.push(CommandId(i), stop());
        }
        let ids: Vec<u64> = queue.drain(7).into_iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn no_history_by_default() {
        let mut queue = CommandQueue::new();
        queue.push(CommandId(0), stop());
        queue.drain(1);
        assert!(queue.history().is_empty());
    }

    #[test]
    fn history_is_bounded() {
        let mut queue = CommandQueue::with_max_history(2);
        for i in 0..3 {
            queue.push(CommandId(i), stop());
            queue.drain(i);
        }
        let ticks: Vec<Ticks> = queue.history().iter().map(|(t, _)| *t).collect();
        assert_eq!(ticks, vec![1, 2]);
        queue.clear_history();
        assert!(queue.history().is_empty());
    }

    #[test]
    fn command_knows_its_transfer() {
        let id = make_transfer_id();
        let cmd = TransferCommand::Pause {
            transfer: id,
            paused: true,
        };
        assert_eq!(cmd.transfer(), id);
    }
}
