//! Sharing a zone's mass-driver throughput among its metal streams.
//!
//! A zone's drivers can launch a fixed amount of energy per day; how many
//! kilograms that buys depends on how fast each kilogram must leave, so the
//! capacity is computed per destination. A stream's commitment is its
//! effective rate expressed as a fraction of the capacity toward its own
//! destination. Streams are served first-come by capacity rank: each one
//! sees only the commitments of siblings ranked ahead of it. The rank is the
//! creation sequence until a reversal sends the stream to the back of its
//! new source's queue.

use crate::id::ZoneId;
use crate::physics::Physics;
use crate::state::LogisticsState;
use crate::zone::Zone;

/// Kilograms per day `from` can launch toward `to`.
///
/// Uses `v = min(required delta-v, muzzle velocity)`; routes the oracle
/// cannot price are charged at full muzzle velocity.
pub fn zone_capacity(phys: &Physics<'_>, from: &Zone, to: ZoneId) -> f64 {
    let muzzle = phys.launch_assist(from);
    let speed = match phys.oracle.total_delta_v(from.id, to, from.mass_remaining) {
        Some(required) if required > 0.0 => required.min(muzzle),
        _ => muzzle,
    };
    phys.driver_throughput(from, speed)
}

/// Fraction of `zone`'s capacity held by metal streams ranked ahead of
/// `before_rank`. Paused, stopping and energy-blocked streams hold none.
pub fn committed_share(
    state: &LogisticsState,
    phys: &Physics<'_>,
    zone: ZoneId,
    before_rank: u64,
) -> f64 {
    let Some(source) = state.zone(zone) else {
        return 0.0;
    };
    state
        .transfers
        .values()
        .filter(|t| t.resource.is_metal() && t.from == zone && t.capacity_rank() < before_rank)
        .filter_map(|t| {
            let stream = t.continuous()?;
            stream.commits_capacity().then_some((t.to, stream.effective_rate))
        })
        .map(|(to, rate)| {
            let capacity = zone_capacity(phys, source, to);
            if capacity > 0.0 { rate / capacity } else { 0.0 }
        })
        .sum()
}

/// Unclaimed fraction of `zone`'s capacity as seen by `rank`.
pub fn available_share(
    state: &LogisticsState,
    phys: &Physics<'_>,
    zone: ZoneId,
    rank: u64,
) -> f64 {
    (1.0 - committed_share(state, phys, zone, rank)).clamp(0.0, 1.0)
}

/// Largest metal send rate, kg/day, a stream with `rank` may use.
pub fn rate_cap(
    state: &LogisticsState,
    phys: &Physics<'_>,
    from: ZoneId,
    to: ZoneId,
    rank: u64,
) -> f64 {
    let Some(source) = state.zone(from) else {
        return 0.0;
    };
    available_share(state, phys, from, rank) * zone_capacity(phys, source, to)
}
