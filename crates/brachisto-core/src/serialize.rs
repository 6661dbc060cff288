//! Versioned binary snapshots of the transfer subsystem.
//!
//! Snapshots are `bitcode` blobs with a header carrying a magic number and
//! format version. The oracle and the event bus are not part of a snapshot:
//! the oracle is supplied again on restore and the bus starts empty, so
//! listeners must be re-registered.

use serde::{Deserialize, Serialize};

use crate::command_queue::CommandQueue;
use crate::config::TransferConfig;
use crate::engine::TransferSystem;
use crate::event::EventBus;
use crate::oracle::OrbitalOracle;
use crate::skills::{EconomicRules, SkillSnapshot};
use crate::state::LogisticsState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a transfer subsystem snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xB7AC_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("data too short for snapshot header")]
    TooShort,
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick count at the time the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Read the header of a snapshot without restoring it.
///
/// bitcode has no partial decoding, so this decodes the whole blob.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    Ok(decode(data)?.header)
}

fn decode(data: &[u8]) -> Result<TransferSnapshot, DeserializeError> {
    if data.is_empty() {
        return Err(DeserializeError::TooShort);
    }
    bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Snapshot payload
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct TransferSnapshot {
    header: SnapshotHeader,
    state: LogisticsState,
    config: TransferConfig,
    rules: EconomicRules,
    skills: SkillSnapshot,
    commands: CommandQueue,
    last_state_hash: u64,
}

impl TransferSystem {
    /// Encode the full subsystem state.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = TransferSnapshot {
            header: SnapshotHeader::new(self.state.clock.tick),
            state: self.state.clone(),
            config: self.config.clone(),
            rules: self.rules.clone(),
            skills: self.skills.clone(),
            commands: self.commands.clone(),
            last_state_hash: self.last_state_hash,
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Restore a subsystem from [`serialize`](Self::serialize) output.
    ///
    /// Returns an error, never panics, on corrupt or mismatched data.
    pub fn deserialize(data: &[u8], oracle: Box<dyn OrbitalOracle>) -> Result<Self, DeserializeError> {
        let snapshot = decode(data)?;
        snapshot.header.validate()?;
        Ok(TransferSystem {
            state: snapshot.state,
            oracle,
            rules: snapshot.rules,
            config: snapshot.config,
            skills: snapshot.skills,
            events: EventBus::default(),
            commands: snapshot.commands,
            last_state_hash: snapshot.last_state_hash,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_queue::TransferCommand;
    use crate::engine::TickContext;
    use crate::id::CommandId;
    use crate::test_utils::{self, EARTH, MARS, probes};
    use crate::transfer::CreateRequest;
    use crate::zone::Resource;

    fn busy_system() -> TransferSystem {
        let mut sys = test_utils::three_zone_system();
        let skills = SkillSnapshot::new();
        sys.create_transfer(&CreateRequest::continuous(EARTH, MARS, Resource::Metal, 10.0), &skills);
        let id = sys
            .create_transfer(&CreateRequest::one_time(EARTH, MARS, probes(), 3.0), &skills)
            .into_result()
            .unwrap();
        for _ in 0..3 {
            sys.advance(0.7, &TickContext::default());
        }
        sys.queue_command(CommandId(1), TransferCommand::Pause { transfer: id, paused: true });
        sys
    }

    #[test]
    fn round_trip_preserves_state_hash() {
        let sys = busy_system();
        let data = sys.serialize().unwrap();
        let restored = TransferSystem::deserialize(&data, Box::new(test_utils::three_zone_oracle())).unwrap();
        assert_eq!(restored.state_hash(), sys.state_hash());
        assert_eq!(restored.last_state_hash(), sys.last_state_hash());
        assert_eq!(restored.tick(), 3);
        assert_eq!(restored.pending_commands(), 1);
    }

    #[test]
    fn restored_system_continues_identically() {
        let mut original = busy_system();
        let data = original.serialize().unwrap();
        let mut restored = TransferSystem::deserialize(&data, Box::new(test_utils::three_zone_oracle())).unwrap();
        for _ in 0..5 {
            let a = original.advance(1.3, &TickContext::default());
            let b = restored.advance(1.3, &TickContext::default());
            assert_eq!(a.state_hash, b.state_hash);
            assert_eq!(a.events, b.events);
        }
    }

    #[test]
    fn header_is_readable() {
        let data = busy_system().serialize().unwrap();
        let header = read_snapshot_header(&data).unwrap();
        assert_eq!(header, SnapshotHeader::new(3));
    }

    #[test]
    fn header_validation() {
        let mut header = SnapshotHeader::new(0);
        assert!(header.validate().is_ok());
        header.version = FORMAT_VERSION + 1;
        assert!(matches!(header.validate(), Err(DeserializeError::FutureVersion(_))));
        header.version = FORMAT_VERSION;
        header.magic = 0xDEAD_BEEF;
        assert!(matches!(header.validate(), Err(DeserializeError::InvalidMagic(0xDEAD_BEEF))));
    }

    #[test]
    fn garbage_is_an_error_not_a_panic() {
        let oracle = || Box::new(test_utils::three_zone_oracle());
        assert!(matches!(
            TransferSystem::deserialize(&[], oracle()),
            Err(DeserializeError::TooShort)
        ));
        assert!(matches!(
            TransferSystem::deserialize(&[0u8; 10], oracle()),
            Err(DeserializeError::Decode(_))
        ));
    }
}
