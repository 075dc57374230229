//! # Venue Ladder Core
//!
//! Core types and the venue allocation algorithm for tournaments whose bracket is run by
//! an external provider.
//!
//! As matches resolve, winners climb a ladder of tiers. Each tier has a small, fixed pool
//! of shared venues (meeting rooms, lobbies, voice channels) and every open match must hold
//! exactly one venue, shared by its two participants, for as long as it is played.
//!
//! ## Core Concepts
//!
//! - **Tier ladder**: maps bracket rounds to tiers, each with its own venue category
//! - **Venue pool**: the venues of one tier and which of them are free
//! - **Assignment ledger**: which participant holds which venue
//! - **Allocator**: decides the venue of a match, reusing existing assignments when it can
//! - **Environment**: collaborators injected via traits (bracket provider, venue
//!   directory, notification sink, clock)
//!
//! ## Architecture Principles
//!
//! - Functional core, imperative shell: everything here is synchronous and I/O free; the
//!   runtime crate owns locking, timeouts and logging
//! - One explicit state value per tournament, never ambient globals
//! - Running out of venues is an outcome, not an error
//!
//! ## Example
//!
//! ```
//! use venue_ladder_core::allocator::{AllocationResult, VenueAllocator};
//! use venue_ladder_core::ladder::{LadderConfig, TierLadder};
//! use venue_ladder_core::state::TournamentAllocationState;
//! use venue_ladder_core::types::{ParticipantId, VenueId};
//!
//! let config = LadderConfig::from_json(r#"{"tiers": [
//!     {"name": "Bronze", "badge_id": "b", "venue_category": "bronze", "rounds": 1}
//! ]}"#).unwrap();
//! let ladder = TierLadder::new(config, 1).unwrap();
//!
//! let mut state = TournamentAllocationState::new(ladder);
//! state.register_venues(&"bronze".into(), [VenueId::new("V1")]).unwrap();
//!
//! let tier = state.ladder().tier_for(0).clone();
//! let allocation = VenueAllocator::new().allocate(
//!     &mut state,
//!     &tier,
//!     &ParticipantId::new("TeamA"),
//!     &ParticipantId::new("TeamB"),
//! );
//! assert_eq!(allocation.result, AllocationResult::Assigned(VenueId::new("V1")));
//! ```

pub mod allocator;
pub mod bracket;
pub mod directory;
pub mod error;
pub mod ladder;
pub mod ledger;
pub mod notification;
pub mod pool;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use allocator::{Allocation, AllocationResult, Transition, VenueAllocator};
pub use bracket::{BracketProvider, ProviderFuture};
pub use chrono::{DateTime, Utc};
pub use directory::VenueDirectory;
pub use error::{ConfigurationError, InvariantViolation, ProviderError};
pub use ladder::{LadderConfig, Tier, TierLadder, TierSpec};
pub use ledger::AssignmentLedger;
pub use notification::{ExhaustionNotice, MatchAnnouncement, NotificationSink};
pub use pool::VenuePool;
pub use state::{AllocationSnapshot, PoolSnapshot, TournamentAllocationState};
pub use types::{
    Match, MatchId, MatchState, ParticipantId, TournamentId, TournamentState, Venue,
    VenueCategory, VenueId,
};

/// Environment module - time abstraction shared by the runtime and tests
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
