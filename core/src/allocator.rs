//! Venue allocation for a match about to be played.
//!
//! [`VenueAllocator::allocate`] decides which venue the two opponents of a match share,
//! preferring to leave existing assignments alone:
//!
//! ```text
//! both hold the same venue of this tier ─────────────► Reused (no change)
//! either holds a venue of another tier ──────────────► release it (stale)
//! neither holds anything now ────────────────────────► Fresh from the pool, or Exhausted
//! one holds a venue of this tier ────────────────────► Shared with the other
//! both hold different venues of this tier ───────────► Consolidated on the first one's
//! ```
//!
//! The allocator is a pure function over [`TournamentAllocationState`]; callers provide
//! mutual exclusion. Running it twice with the same arguments and no other change in
//! between yields the same venue and leaves the state untouched the second time.

use crate::ladder::Tier;
use crate::state::TournamentAllocationState;
use crate::types::{ParticipantId, VenueId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Outcome of an allocation request
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationResult {
    /// The match plays in this venue
    Assigned(VenueId),
    /// The tier's pool has no free venue
    Exhausted,
}

impl AllocationResult {
    /// Venue assigned, if any
    #[must_use]
    pub const fn venue(&self) -> Option<&VenueId> {
        match self {
            Self::Assigned(venue) => Some(venue),
            Self::Exhausted => None,
        }
    }
}

/// Which path produced the result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Both opponents already shared a venue of this tier
    Reused,
    /// A new venue was taken from the pool
    Fresh,
    /// One opponent's venue was extended to the other
    Shared,
    /// Both held different venues of this tier; the second one's was released
    Consolidated,
    /// Nothing free in the pool
    Exhausted,
}

impl Transition {
    /// Stable label for logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reused => "reused",
            Self::Fresh => "fresh",
            Self::Shared => "shared",
            Self::Consolidated => "consolidated",
            Self::Exhausted => "exhausted",
        }
    }

    /// Whether the ledger or a pool may have changed
    #[must_use]
    pub const fn is_churn(self) -> bool {
        matches!(self, Self::Fresh | Self::Shared | Self::Consolidated)
    }
}

/// Full record of one allocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    /// What the caller asked for
    pub result: AllocationResult,
    /// How it was reached
    pub transition: Transition,
    /// Venues returned to their pools along the way
    pub released: SmallVec<[VenueId; 2]>,
    /// Participants whose entries were dropped because they no longer play in the venue
    pub evicted: SmallVec<[ParticipantId; 2]>,
}

impl Allocation {
    fn new(result: AllocationResult, transition: Transition) -> Self {
        Self {
            result,
            transition,
            released: SmallVec::new(),
            evicted: SmallVec::new(),
        }
    }
}

/// Stateless allocation policy
#[derive(Clone, Copy, Debug, Default)]
pub struct VenueAllocator;

impl VenueAllocator {
    /// Creates a new `VenueAllocator`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Assign a venue of `tier` to the match between `a` and `b`.
    pub fn allocate(
        &self,
        state: &mut TournamentAllocationState,
        tier: &Tier,
        a: &ParticipantId,
        b: &ParticipantId,
    ) -> Allocation {
        let va = state.holder_of(a).cloned();
        let vb = state.holder_of(b).cloned();

        if let (Some(va), Some(vb)) = (&va, &vb) {
            if va == vb && Self::serves(state, va, tier) {
                return Allocation::new(AllocationResult::Assigned(va.clone()), Transition::Reused);
            }
        }

        let mut released: SmallVec<[VenueId; 2]> = SmallVec::new();
        let mut evicted: SmallVec<[ParticipantId; 2]> = SmallVec::new();

        let va = Self::drop_if_stale(state, tier, va, &mut released, &mut evicted);
        let vb = Self::drop_if_stale(state, tier, vb, &mut released, &mut evicted);

        let (venue, transition) = match (va, vb) {
            (None, None) => {
                let Some(venue) = state.pool_mut(tier.index).and_then(|pool| pool.acquire()) else {
                    let mut allocation = Allocation::new(AllocationResult::Exhausted, Transition::Exhausted);
                    allocation.released = released;
                    allocation.evicted = evicted;
                    return allocation;
                };
                let ledger = state.ledger_mut();
                ledger.set(a.clone(), venue.clone());
                ledger.set(b.clone(), venue.clone());
                (venue, Transition::Fresh)
            }
            (Some(venue), None) => {
                Self::evict_others(state, &venue, a, b, &mut evicted);
                state.ledger_mut().set(b.clone(), venue.clone());
                (venue, Transition::Shared)
            }
            (None, Some(venue)) => {
                Self::evict_others(state, &venue, a, b, &mut evicted);
                state.ledger_mut().set(a.clone(), venue.clone());
                (venue, Transition::Shared)
            }
            (Some(venue), Some(other)) => {
                if venue == other {
                    (venue, Transition::Reused)
                } else {
                    for holder in state.release_venue(&other) {
                        if &holder != b {
                            evicted.push(holder);
                        }
                    }
                    released.push(other);
                    Self::evict_others(state, &venue, a, b, &mut evicted);
                    state.ledger_mut().set(b.clone(), venue.clone());
                    (venue, Transition::Consolidated)
                }
            }
        };

        Allocation {
            result: AllocationResult::Assigned(venue),
            transition,
            released,
            evicted,
        }
    }

    fn serves(state: &TournamentAllocationState, venue: &VenueId, tier: &Tier) -> bool {
        state
            .tier_of_venue(venue)
            .is_some_and(|owner| owner.venue_category == tier.venue_category)
    }

    /// Release `held` if it belongs to another tier; keep it otherwise.
    fn drop_if_stale(
        state: &mut TournamentAllocationState,
        tier: &Tier,
        held: Option<VenueId>,
        released: &mut SmallVec<[VenueId; 2]>,
        evicted: &mut SmallVec<[ParticipantId; 2]>,
    ) -> Option<VenueId> {
        let venue = held?;
        if Self::serves(state, &venue, tier) {
            return Some(venue);
        }
        let was_free = state
            .tier_of_venue(&venue)
            .and_then(|owner| state.pool(owner.index))
            .is_some_and(|pool| pool.is_free(&venue));
        let holders = state.release_venue(&venue);
        if !holders.is_empty() && !was_free && !released.contains(&venue) {
            released.push(venue);
        }
        evicted.extend(holders);
        None
    }

    /// Clear holders of `venue` other than `a` and `b`; their match is over.
    fn evict_others(
        state: &mut TournamentAllocationState,
        venue: &VenueId,
        a: &ParticipantId,
        b: &ParticipantId,
        evicted: &mut SmallVec<[ParticipantId; 2]>,
    ) {
        for holder in state.ledger().participants_of(venue) {
            if &holder != a && &holder != b {
                state.ledger_mut().clear(&holder);
                evicted.push(holder);
            }
        }
    }
}
