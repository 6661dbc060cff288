//! Physical feasibility of a proposed route.
//!
//! Probes combine mass-driver assist, research bonus and their own base
//! delta-v; metal has no engine and must be thrown by a mass driver fast
//! enough for the whole trip. Propulsion research never enters the gate: it
//! makes trips cheaper, not possible.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::ZoneId;
use crate::physics::Physics;
use crate::transfer::TransferError;
use crate::zone::{Resource, Zone};

/// Delta-v budget of a route, all values km/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReachabilityReport {
    pub from: ZoneId,
    pub to: ZoneId,
    pub resource: Resource,
    pub reachable: bool,
    pub escape_delta_v: f64,
    pub hohmann_delta_v: f64,
    /// `escape + hohmann`.
    pub required_delta_v: f64,
    /// What the launch can deliver.
    pub capacity: f64,
    /// `max(0, required − capacity)`.
    pub shortfall: f64,
    /// `capacity − escape`: what is left for the Hohmann leg.
    pub net_margin: f64,
}

impl ReachabilityReport {
    /// Human-readable summary, phrased around the net margin.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ReachabilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = if self.resource.is_metal() { "metal" } else { "probes" };
        if self.reachable {
            write!(
                f,
                "{what} route {} -> {} reachable: net margin {:.2} km/s covers the {:.2} km/s Hohmann leg",
                self.from, self.to, self.net_margin, self.hohmann_delta_v
            )
        } else {
            write!(
                f,
                "{what} route {} -> {} unreachable: net margin {:.2} km/s ({:.2} capacity - {:.2} escape) \
                 is {:.2} km/s short of the {:.2} km/s Hohmann requirement",
                self.from,
                self.to,
                self.net_margin,
                self.capacity,
                self.escape_delta_v,
                self.shortfall,
                self.hohmann_delta_v
            )
        }
    }
}

/// Delta-v a launch of `resource` from `from` can deliver.
pub fn launch_capacity(phys: &Physics<'_>, from: &Zone, resource: Resource) -> f64 {
    match resource {
        Resource::Probes(_) => phys.launch_assist(from) + phys.probe_delta_v(),
        Resource::Metal => phys.launch_assist(from),
    }
}

/// Compute the delta-v budget of a route without deciding anything.
///
/// Fails only when the oracle cannot price the route at all.
pub fn assess(
    phys: &Physics<'_>,
    from: &Zone,
    to: ZoneId,
    resource: Resource,
) -> Result<ReachabilityReport, TransferError> {
    let hohmann = phys
        .oracle
        .hohmann_delta_v(from.id, to)
        .ok_or(TransferError::DegenerateRoute { from: from.id, to })?;
    if hohmann.is_nan() || hohmann <= 0.0 {
        return Err(TransferError::DegenerateRoute { from: from.id, to });
    }
    let escape = phys.oracle.escape_delta_v(from.id, from.mass_remaining).max(0.0);
    let required = escape + hohmann;
    let capacity = launch_capacity(phys, from, resource);
    let mut reachable = capacity >= required;
    if resource.is_metal() {
        reachable &= from.has_mass_driver();
    }

    Ok(ReachabilityReport {
        from: from.id,
        to,
        resource,
        reachable,
        escape_delta_v: escape,
        hohmann_delta_v: hohmann,
        required_delta_v: required,
        capacity,
        shortfall: (required - capacity).max(0.0),
        net_margin: capacity - escape,
    })
}

/// Gate a route: `Ok` with the report when it can be flown, otherwise the
/// most specific rejection.
pub fn check(
    phys: &Physics<'_>,
    from: &Zone,
    to: ZoneId,
    resource: Resource,
) -> Result<ReachabilityReport, TransferError> {
    if resource.is_metal() && !from.has_mass_driver() {
        return Err(TransferError::NoMassDriver(from.id));
    }
    let report = assess(phys, from, to, resource)?;
    if report.reachable {
        Ok(report)
    } else {
        Err(TransferError::Unreachable(Box::new(report)))
    }
}
