//! Error taxonomy.
//!
//! Three kinds of failure, kept apart so callers can match instead of guessing:
//!
//! - [`ConfigurationError`]: fatal, raised before the tournament starts. Fix the ladder or
//!   the venue directory and try again.
//! - [`ProviderError`]: a collaborator (bracket provider, venue directory) failed. No
//!   allocation state is touched before the failure surfaces, so the operation can be retried.
//! - [`InvariantViolation`]: ledger or pool corruption. Never expected in correct operation.
//!
//! Running out of venues is not an error at all; see
//! [`AllocationResult::Exhausted`](crate::allocator::AllocationResult::Exhausted).

use crate::types::{MatchId, ParticipantId, VenueCategory, VenueId};
use thiserror::Error;

/// The ladder or venue supply cannot support the tournament.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No tiers were configured
    #[error("Tier ladder has no tiers")]
    EmptyLadder,

    /// A tier spans zero rounds
    #[error("Tier '{name}' must span at least one round")]
    ZeroRoundTier {
        /// Tier name
        name: String,
    },

    /// The bracket has more rounds than the ladder covers
    #[error("Tier ladder covers {configured} rounds but the bracket needs {required}")]
    InsufficientRounds {
        /// Rounds covered by the configured tiers
        configured: u32,
        /// Rounds the bracket will have
        required: u32,
    },

    /// Two tiers share a venue category
    #[error("Venue category '{category}' is used by more than one tier")]
    DuplicateCategory {
        /// The repeated category
        category: VenueCategory,
    },

    /// The directory listed the same venue under two categories
    #[error("Venue '{venue}' is listed under both '{first}' and '{second}'")]
    DuplicateVenue {
        /// The venue
        venue: VenueId,
        /// Category it was first registered under
        first: VenueCategory,
        /// Category it was listed under again
        second: VenueCategory,
    },

    /// A category is not served by any tier
    #[error("Venue category '{category}' does not belong to any tier")]
    UnknownCategory {
        /// The category
        category: VenueCategory,
    },

    /// A tier's venue pool is smaller than its configured minimum
    #[error("Tier '{tier}' requires {required} venues but only {available} were listed")]
    InsufficientVenues {
        /// Tier name
        tier: String,
        /// Configured minimum
        required: usize,
        /// Venues the directory returned
        available: usize,
    },

    /// The ladder document could not be parsed
    #[error("Invalid ladder configuration: {0}")]
    Parse(String),
}

/// A collaborator call failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network or service failure
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish within its deadline
    #[error("Provider call '{operation}' timed out")]
    Timeout {
        /// The operation that timed out
        operation: &'static str,
    },

    /// The provider refused the request (e.g. a conflicting result)
    #[error("Provider rejected the request: {reason}")]
    Rejected {
        /// Reason given by the provider
        reason: String,
    },

    /// The match does not exist
    #[error("Match {match_id} not found")]
    MatchNotFound {
        /// The missing match
        match_id: MatchId,
    },
}

impl ProviderError {
    /// Whether retrying the same call may succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// Allocation state no longer satisfies its invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A pool marks a venue available that it does not own
    #[error("Venue '{venue}' is available but not part of its pool")]
    AvailableNotOwned {
        /// The venue
        venue: VenueId,
    },

    /// A venue is both held and available
    #[error("Venue '{venue}' is held by {holders:?} but also marked available")]
    HeldAndAvailable {
        /// The venue
        venue: VenueId,
        /// Current holders
        holders: Vec<ParticipantId>,
    },

    /// More than two participants hold one venue
    #[error("Venue '{venue}' is held by {holders:?}")]
    TooManyHolders {
        /// The venue
        venue: VenueId,
        /// Current holders
        holders: Vec<ParticipantId>,
    },

    /// A venue belongs to no pool, or to a pool other than the one indexed for it
    #[error("Venue '{venue}' is not registered in exactly one pool")]
    UnregisteredVenue {
        /// The venue
        venue: VenueId,
    },

    /// Two participants share a venue without being opponents in an open match
    #[error("Venue '{venue}' is shared by {holders:?} outside of an open match")]
    UnpairedSharing {
        /// The venue
        venue: VenueId,
        /// Current holders
        holders: Vec<ParticipantId>,
    },

    /// The ledger's forward and reverse indexes disagree
    #[error("Ledger indexes disagree about participant '{participant}'")]
    LedgerIndexMismatch {
        /// The participant
        participant: ParticipantId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Unavailable("503".into()).is_transient());
        assert!(ProviderError::Timeout { operation: "list_open_matches" }.is_transient());
        assert!(!ProviderError::Rejected { reason: "conflict".into() }.is_transient());
        assert!(!ProviderError::MatchNotFound { match_id: MatchId::new(1) }.is_transient());
    }

    #[test]
    fn test_configuration_error_messages() {
        let err = ConfigurationError::InsufficientRounds {
            configured: 3,
            required: 5,
        };
        assert_eq!(
            err.to_string(),
            "Tier ladder covers 3 rounds but the bracket needs 5"
        );
    }
}
