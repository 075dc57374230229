//! Allocation metrics.
//!
//! Recorded through the `metrics` facade; the embedding host installs whichever recorder
//! or exporter it uses. Without one installed every call is a no-op.
//!
//! | Metric | Kind | Labels |
//! |--------|------|--------|
//! | `venue_allocations_total` | counter | `transition` |
//! | `venue_exhaustions_total` | counter | `tier` |
//! | `venue_releases_total` | counter | |
//! | `provider_errors_total` | counter | `operation` |
//! | `venues_available` | gauge | `tier` |

use metrics::{counter, describe_counter, describe_gauge, gauge};
use venue_ladder_core::{Tier, TournamentAllocationState, Transition, VenuePool};

/// Register metric descriptions with the installed recorder.
///
/// Call once after installing the recorder.
pub fn describe_metrics() {
    describe_counter!(
        "venue_allocations_total",
        "Allocation outcomes, labelled by how the venue was reached"
    );
    describe_counter!(
        "venue_exhaustions_total",
        "Open matches left without a venue because their tier's pool was empty"
    );
    describe_counter!(
        "venue_releases_total",
        "Venues returned to their pool"
    );
    describe_counter!(
        "provider_errors_total",
        "Bracket provider or venue directory calls that failed"
    );
    describe_gauge!(
        "venues_available",
        "Free venues per tier"
    );
}

pub(crate) fn record_allocation(transition: Transition) {
    counter!("venue_allocations_total", "transition" => transition.as_str()).increment(1);
}

/// Counted once per match, when exhaustion is first noticed.
pub(crate) fn record_exhaustion(tier: &Tier) {
    counter!("venue_exhaustions_total", "tier" => tier.name.clone()).increment(1);
}

pub(crate) fn record_releases(count: usize) {
    if count > 0 {
        counter!("venue_releases_total").increment(u64::try_from(count).unwrap_or(u64::MAX));
    }
}

pub(crate) fn record_provider_error(operation: &'static str) {
    counter!("provider_errors_total", "operation" => operation).increment(1);
}

pub(crate) fn record_available(state: &TournamentAllocationState) {
    for tier in state.ladder().tiers() {
        let available = state.pool(tier.index).map_or(0, VenuePool::available_len);
        let available = u32::try_from(available).unwrap_or(u32::MAX);
        gauge!("venues_available", "tier" => tier.name.clone()).set(f64::from(available));
    }
}
