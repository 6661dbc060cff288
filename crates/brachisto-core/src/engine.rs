//! The transfer subsystem as seen by the owning simulation engine.
//!
//! # Architecture
//!
//! [`TransferSystem`] owns:
//! - A [`LogisticsState`] (zones, the transfer arena, the clock)
//! - The [`OrbitalOracle`] used to price routes
//! - [`EconomicRules`] and [`TransferConfig`]
//! - An [`EventBus`] and a [`CommandQueue`]
//!
//! # Four-Phase Tick
//!
//! Each [`advance`](TransferSystem::advance) runs:
//! 1. **Schedule** -- continuous transfers accrue, are capacity-limited and
//!    dispatch batches; metal transfers are energy gated
//! 2. **Arrive** -- due batches and shipments credit their destinations
//! 3. **Commands** -- queued lifecycle commands are applied in order
//! 4. **Bookkeeping** -- clock, state hash, event delivery

use tracing::{debug, warn};

use crate::arrival;
use crate::command_queue::{CommandQueue, QueuedCommand, TransferCommand};
use crate::config::{ConfigError, TransferConfig};
use crate::event::{EventBus, EventKind, PassiveListener, TransferEvent};
use crate::id::{CommandId, TransferId, ZoneId};
use crate::lifecycle::{self, CommandOutcome};
use crate::oracle::OrbitalOracle;
use crate::physics::Physics;
use crate::propellant::{self, FuelEstimate};
use crate::query::{self, InTransitPosition, TransferView};
use crate::reachability::{self, ReachabilityReport};
use crate::scheduler::{self, TickClock};
use crate::sim::{SimTime, Ticks};
use crate::skills::{EconomicRules, SkillSnapshot};
use crate::state::LogisticsState;
use crate::transfer::{CreateOutcome, CreateRequest, Transfer, TransferError};
use crate::zone::{Resource, Zone};

// ---------------------------------------------------------------------------
// Tick inputs and outputs
// ---------------------------------------------------------------------------

/// What the owning engine knows at the start of a tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickContext {
    pub skills: SkillSnapshot,
    /// Global net power balance in watts. Negative takes every mass driver
    /// offline.
    pub net_energy_watts: f64,
}

impl TickContext {
    pub fn new(skills: SkillSnapshot) -> Self {
        Self {
            skills,
            net_energy_watts: 0.0,
        }
    }

    pub fn with_net_energy(mut self, watts: f64) -> Self {
        self.net_energy_watts = watts;
        self
    }
}

/// Summary of one [`TransferSystem::advance`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvanceReport {
    /// Index of the tick just run.
    pub tick: Ticks,
    /// Simulation time at the end of the tick.
    pub time: SimTime,
    pub batches_dispatched: usize,
    pub batches_stalled: usize,
    pub batches_arrived: usize,
    pub shipments_completed: usize,
    pub transfers_removed: usize,
    pub commands_applied: usize,
    pub command_errors: Vec<(CommandId, TransferError)>,
    /// Events of this tick in emission order.
    pub events: Vec<TransferEvent>,
    pub state_hash: u64,
}

// ---------------------------------------------------------------------------
// TransferSystem
// ---------------------------------------------------------------------------

pub struct TransferSystem {
    pub(crate) state: LogisticsState,
    pub(crate) oracle: Box<dyn OrbitalOracle>,
    pub(crate) rules: EconomicRules,
    pub(crate) config: TransferConfig,
    /// Skills of the last tick; used by commands issued between ticks.
    pub(crate) skills: SkillSnapshot,
    pub(crate) events: EventBus,
    pub(crate) commands: CommandQueue,
    pub(crate) last_state_hash: u64,
}

impl std::fmt::Debug for TransferSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSystem")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("events", &self.events)
            .field("pending_commands", &self.commands.pending_count())
            .finish_non_exhaustive()
    }
}

impl TransferSystem {
    /// Create an empty system with default configuration and rules.
    pub fn new(oracle: Box<dyn OrbitalOracle>) -> Self {
        Self {
            state: LogisticsState::new(),
            oracle,
            rules: EconomicRules::default(),
            config: TransferConfig::default(),
            skills: SkillSnapshot::new(),
            events: EventBus::default(),
            commands: CommandQueue::new(),
            last_state_hash: 0,
        }
    }

    /// Replace the configuration after validating it.
    pub fn with_config(mut self, config: TransferConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn with_rules(mut self, rules: EconomicRules) -> Self {
        self.rules = rules;
        self
    }

    /// Retain up to `max` executed commands for inspection.
    pub fn with_command_history(mut self, max: usize) -> Self {
        self.commands = CommandQueue::with_max_history(max);
        self
    }

    fn physics<'a>(&'a self, skills: &'a SkillSnapshot) -> Physics<'a> {
        Physics::new(self.oracle.as_ref(), &self.rules, &self.config, skills)
    }

    /// Clock for commands applied between ticks.
    fn idle_clock(&self) -> TickClock {
        TickClock {
            tick: self.state.clock.tick,
            now: self.state.clock.time,
            dt: 0.0,
        }
    }

    // -----------------------------------------------------------------------
    // Zones
    // -----------------------------------------------------------------------

    /// Insert or replace a zone. Returns the previous zone with that id.
    pub fn add_zone(&mut self, zone: Zone) -> Option<Zone> {
        self.state.zones.insert(zone.id, zone)
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.state.zone(id)
    }

    /// Mutable zone access for sibling systems (production, mining).
    pub fn zone_mut(&mut self, id: ZoneId) -> Option<&mut Zone> {
        self.state.zones.get_mut(&id)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.state.zones.values()
    }

    // -----------------------------------------------------------------------
    // Planning
    // -----------------------------------------------------------------------

    /// Delta-v budget of a route without creating anything.
    pub fn assess_route(
        &self,
        from: ZoneId,
        to: ZoneId,
        resource: Resource,
        skills: &SkillSnapshot,
    ) -> Result<ReachabilityReport, TransferError> {
        let source = self.state.zone(from).ok_or(TransferError::UnknownZone(from))?;
        if self.state.zone(to).is_none() {
            return Err(TransferError::UnknownZone(to));
        }
        reachability::assess(&self.physics(skills), source, to, resource)
    }

    /// Fuel needed to launch `amount` of `resource` from `from` to `to`.
    pub fn estimate_fuel(
        &self,
        from: ZoneId,
        to: ZoneId,
        resource: Resource,
        amount: f64,
        skills: &SkillSnapshot,
    ) -> Option<FuelEstimate> {
        let source = self.state.zone(from)?;
        let phys = self.physics(skills);
        Some(propellant::estimate(&phys, source, to, phys.payload_mass(resource, amount)))
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Validate and create a transfer. Never panics on user input.
    pub fn create_transfer(&mut self, request: &CreateRequest, skills: &SkillSnapshot) -> CreateOutcome {
        let phys = Physics::new(self.oracle.as_ref(), &self.rules, &self.config, skills);
        let result = scheduler::create_transfer(&mut self.state, &phys, &mut self.events, request);
        if let Err(err) = &result {
            debug!(from = ?request.from, to = ?request.to, %err, "transfer rejected");
        }
        CreateOutcome::from(result)
    }

    pub fn pause(&mut self, id: TransferId, paused: bool) -> Result<CommandOutcome, TransferError> {
        let clock = self.idle_clock();
        self.apply(TransferCommand::Pause { transfer: id, paused }, clock)
    }

    pub fn reverse(&mut self, id: TransferId) -> Result<CommandOutcome, TransferError> {
        let clock = self.idle_clock();
        self.apply(TransferCommand::Reverse { transfer: id }, clock)
    }

    pub fn stop(&mut self, id: TransferId) -> Result<CommandOutcome, TransferError> {
        let clock = self.idle_clock();
        self.apply(TransferCommand::Stop { transfer: id }, clock)
    }

    pub fn delete(&mut self, id: TransferId) -> Result<CommandOutcome, TransferError> {
        let clock = self.idle_clock();
        self.apply(TransferCommand::Delete { transfer: id }, clock)
    }

    /// Queue a command for the next tick. Returns `false` for a reused id.
    pub fn queue_command(&mut self, id: CommandId, command: TransferCommand) -> bool {
        self.commands.push(id, command)
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.pending_count()
    }

    pub fn command_queue(&self) -> &CommandQueue {
        &self.commands
    }

    fn apply(&mut self, command: TransferCommand, clock: TickClock) -> Result<CommandOutcome, TransferError> {
        let state = &mut self.state;
        let events = &mut self.events;
        match command {
            TransferCommand::Pause { transfer, paused } => {
                Ok(lifecycle::set_paused(state, events, transfer, paused, clock))
            }
            TransferCommand::Stop { transfer } => lifecycle::stop(state, events, transfer, clock),
            TransferCommand::Delete { transfer } => Ok(lifecycle::delete(
                state,
                events,
                transfer,
                self.config.probe_mass_kg,
                clock,
            )),
            TransferCommand::Reverse { transfer } => {
                let phys = Physics::new(self.oracle.as_ref(), &self.rules, &self.config, &self.skills);
                lifecycle::reverse(state, &phys, events, transfer, clock)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the subsystem by `dt` days.
    ///
    /// A negative or non-finite `dt` is treated as zero.
    pub fn advance(&mut self, dt: f64, ctx: &TickContext) -> AdvanceReport {
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            warn!(dt, "ignoring invalid tick length");
            0.0
        };
        self.skills = ctx.skills.clone();
        let clock = TickClock {
            tick: self.state.clock.tick,
            now: self.state.clock.time + dt,
            dt,
        };
        let mut report = AdvanceReport {
            tick: clock.tick,
            time: clock.now,
            ..AdvanceReport::default()
        };

        // Phase 1: schedule.
        {
            let phys = Physics::new(self.oracle.as_ref(), &self.rules, &self.config, &self.skills);
            let stats = scheduler::run_continuous(
                &mut self.state,
                &phys,
                &mut self.events,
                clock,
                ctx.net_energy_watts,
            );
            report.batches_dispatched = stats.batches_dispatched;
            report.batches_stalled = stats.stalls;
        }

        // Phase 2: arrivals.
        let arrivals = arrival::resolve_arrivals(
            &mut self.state,
            &mut self.events,
            self.config.probe_mass_kg,
            clock,
        );
        report.batches_arrived = arrivals.batches_arrived;
        report.shipments_completed = arrivals.shipments_completed;
        report.transfers_removed = arrivals.transfers_removed;

        // Phase 3: commands.
        for QueuedCommand { id, command } in self.commands.drain(clock.tick) {
            match self.apply(command, clock) {
                Ok(CommandOutcome::Applied) => report.commands_applied += 1,
                Ok(CommandOutcome::Unchanged) => {}
                Err(err) => {
                    warn!(command = id.0, %err, "queued command rejected");
                    report.command_errors.push((id, err));
                }
            }
        }

        // Phase 4: bookkeeping.
        self.state.clock.time = clock.now;
        self.state.clock.tick += 1;
        self.last_state_hash = self.state.state_hash();
        report.state_hash = self.last_state_hash;
        report.events = self.events.deliver();

        debug!(
            tick = report.tick,
            dispatched = report.batches_dispatched,
            arrived = report.batches_arrived + report.shipments_completed,
            "transfer tick complete"
        );
        report
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn transfer(&self, id: TransferId) -> Option<&Transfer> {
        self.state.transfers.get(id)
    }

    pub fn view(&self, id: TransferId) -> Option<TransferView> {
        self.state.transfers.get(id).map(TransferView::of)
    }

    /// Views of every live transfer in creation order.
    pub fn active_transfers(&self) -> Vec<TransferView> {
        query::active_transfers(&self.state)
    }

    pub fn transfer_count(&self) -> usize {
        self.state.transfers.len()
    }

    /// Everything in flight, ordered by arrival time.
    pub fn in_transit_positions(&self) -> Vec<InTransitPosition> {
        query::in_transit_positions(
            &self.state,
            self.oracle.as_ref(),
            self.config.probe_mass_kg,
            self.state.clock.time,
        )
    }

    pub fn state(&self) -> &LogisticsState {
        &self.state
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub fn rules(&self) -> &EconomicRules {
        &self.rules
    }

    pub fn oracle(&self) -> &dyn OrbitalOracle {
        self.oracle.as_ref()
    }

    pub fn time(&self) -> SimTime {
        self.state.clock.time
    }

    pub fn tick(&self) -> Ticks {
        self.state.clock.tick
    }

    /// Hash of the current state.
    pub fn state_hash(&self) -> u64 {
        self.state.state_hash()
    }

    /// Hash recorded at the end of the last tick.
    pub fn last_state_hash(&self) -> u64 {
        self.last_state_hash
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.events.suppress(kind);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.events.on_passive(kind, listener);
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }
}
