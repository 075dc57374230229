//! # Venue Ladder Testing
//!
//! Testing utilities for venue ladder tournaments.
//!
//! This crate provides:
//! - In-memory collaborators: [`InMemoryBracket`], [`StaticVenueDirectory`],
//!   [`RecordingSink`] and a [`FixedClock`]
//! - Ladder and team builders for common test setups
//! - proptest strategies for domain types
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```ignore
//! use venue_ladder_testing::{helpers, test_clock, InMemoryBracket, RecordingSink};
//!
//! #[tokio::test]
//! async fn test_first_round_is_announced() {
//!     let bracket = InMemoryBracket::single_elimination(helpers::teams(4));
//!     let sink = RecordingSink::new();
//!     let tracker = ProgressionTracker::new(tournament, state, environment, config);
//!
//!     tracker.sync().await.unwrap();
//!     assert_eq!(sink.announcements().len(), 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use venue_ladder_core::environment::Clock;

pub mod bracket;
pub mod collaborators;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making announcement timestamps reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use venue_ladder_testing::mocks::FixedClock;
    /// use venue_ladder_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Builders for common test setups.
pub mod helpers {
    use venue_ladder_core::{LadderConfig, ParticipantId, TierLadder, TierSpec};

    /// `Team1`, `Team2`, ... `Team{count}`
    #[must_use]
    pub fn teams(count: usize) -> Vec<ParticipantId> {
        (1..=count).map(|i| ParticipantId::new(format!("Team{i}"))).collect()
    }

    /// Ladder config with one tier per `(name, rounds)` entry.
    ///
    /// Each tier's venue category is its lowercased name and its badge is `badge-{name}`.
    #[must_use]
    pub fn ladder_config(tiers: &[(&str, u32)]) -> LadderConfig {
        LadderConfig {
            tiers: tiers
                .iter()
                .map(|(name, rounds)| TierSpec {
                    name: (*name).to_string(),
                    badge_id: format!("badge-{}", name.to_lowercase()),
                    venue_category: name.to_lowercase().into(),
                    rounds: *rounds,
                    min_venues: None,
                })
                .collect(),
        }
    }

    /// Validated ladder covering `max_rounds`.
    ///
    /// # Panics
    ///
    /// Panics if the tiers do not cover `max_rounds`.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn ladder(tiers: &[(&str, u32)], max_rounds: u32) -> TierLadder {
        TierLadder::new(ladder_config(tiers), max_rounds).expect("test ladder should be valid")
    }
}

/// proptest strategies for domain types.
pub mod properties {
    use proptest::prelude::*;
    use venue_ladder_core::{ParticipantId, VenueId};

    /// Arbitrary participant name
    pub fn participant_id() -> impl Strategy<Value = ParticipantId> {
        "[A-Z][a-z]{2,8}".prop_map(ParticipantId::new)
    }

    /// Between 1 and `max` distinct venue ids
    pub fn venue_ids(max: usize) -> impl Strategy<Value = Vec<VenueId>> {
        prop::collection::btree_set("[A-Z][0-9]{1,3}", 1..=max.max(1))
            .prop_map(|ids| ids.into_iter().map(VenueId::new).collect())
    }

    /// One outcome per match of a `rounds`-round single-elimination bracket, in match id
    /// order. `true` means side `a` wins.
    pub fn bracket_outcomes(rounds: u32) -> impl Strategy<Value = Vec<bool>> {
        let matches = (1usize << rounds) - 1;
        prop::collection::vec(any::<bool>(), matches)
    }
}

/// Install a fmt subscriber for tests, filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

// Re-export commonly used items
pub use bracket::InMemoryBracket;
pub use collaborators::{RecordingSink, StaticVenueDirectory};
pub use mocks::{FixedClock, test_clock};
