//! Brachisto Core -- the transfer subsystem of the Brachisto logistics
//! simulation.
//!
//! Moves probes and refined metal between orbital zones under delta-v, fuel
//! and power constraints. Routes are priced by an [`oracle::OrbitalOracle`];
//! research enters only as the scalar multipliers of a
//! [`skills::SkillSnapshot`].
//!
//! # Four-Phase Tick
//!
//! Each call to [`engine::TransferSystem::advance`] runs:
//!
//! 1. **Schedule** -- Continuous transfers accrue their rate, metal rates
//!    are capped by the zone's shared mass-driver capacity, and whole
//!    batches are dispatched. Negative net energy blocks every metal stream.
//! 2. **Arrive** -- Due batches and shipments credit their destinations in
//!    arrival-time order.
//! 3. **Commands** -- Queued pause / reverse / stop / delete commands apply.
//! 4. **Bookkeeping** -- Clock, state hash and event delivery.
//!
//! # Creating a transfer
//!
//! ```rust,ignore
//! let outcome = system.create_transfer(
//!     &CreateRequest::continuous(earth, mars, Resource::Metal, 10.0),
//!     &skills,
//! );
//! let id = outcome.into_result()?;
//! system.advance(1.0, &TickContext::new(skills).with_net_energy(watts));
//! ```
//!
//! # Key Types
//!
//! - [`engine::TransferSystem`] -- Owns the state and runs the tick.
//! - [`transfer::Transfer`] -- One-time shipment or continuous stream.
//! - [`reachability::ReachabilityReport`] -- Delta-v budget of a route.
//! - [`oracle::HohmannOracle`] -- Reference two-burn orbital oracle.
//! - [`event::EventBus`] -- Per-kind ring buffers delivered each tick.
//! - [`serialize`] -- Versioned bitcode snapshots.

pub mod arrival;
pub mod capacity;
pub mod command_queue;
pub mod config;
pub mod engine;
pub mod event;
pub mod id;
pub mod lifecycle;
pub mod oracle;
pub mod physics;
pub mod propellant;
pub mod query;
pub mod reachability;
pub mod scheduler;
pub mod serialize;
pub mod sim;
pub mod skills;
pub mod state;
pub mod transfer;
pub mod zone;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
