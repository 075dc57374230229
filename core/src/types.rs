//! Identifiers and bracket data model.
//!
//! Participants, venues, categories and tournaments are opaque strings handed to us by
//! external services. Each gets its own newtype so a venue id can never be passed where a
//! participant or a category is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier from any string-like value
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw identifier
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// A team or player, unique within a tournament
    ParticipantId
);

string_id!(
    /// An addressable venue (meeting room, lobby, voice channel) from the venue directory
    VenueId
);

string_id!(
    /// The directory category a venue belongs to; one category per tier
    VenueCategory
);

string_id!(
    /// Tournament identifier as known by the bracket provider
    TournamentId
);

/// Match identifier as assigned by the bracket provider
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(u64);

impl MatchId {
    /// Creates a `MatchId` from the provider's numeric id
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the inner value
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Matches and tournaments
// ============================================================================

/// Lifecycle of a match inside the bracket provider
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    /// Waiting on feeder matches
    Pending,
    /// Both participants known, being played
    Open,
    /// Result recorded
    Complete,
}

/// A single bracket contest between two participants
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Provider-assigned id
    pub id: MatchId,
    /// Zero-based round index; later rounds have higher indices
    pub round_index: u32,
    /// First participant
    pub participant_a: ParticipantId,
    /// Second participant
    pub participant_b: ParticipantId,
    /// Current state
    pub state: MatchState,
}

impl Match {
    /// Whether `participant` plays in this match
    #[must_use]
    pub fn involves(&self, participant: &ParticipantId) -> bool {
        &self.participant_a == participant || &self.participant_b == participant
    }

    /// The other side of the match, if `participant` plays in it
    #[must_use]
    pub fn opponent_of(&self, participant: &ParticipantId) -> Option<&ParticipantId> {
        if &self.participant_a == participant {
            Some(&self.participant_b)
        } else if &self.participant_b == participant {
            Some(&self.participant_a)
        } else {
            None
        }
    }
}

/// Overall tournament progress as reported by the bracket provider
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentState {
    /// Registration still open, no matches playable
    NotStarted,
    /// Matches are being played
    Running,
    /// Final result recorded
    Finished,
}

/// A venue together with the category it was listed under
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Venue {
    /// Venue id
    pub id: VenueId,
    /// Owning category
    pub category: VenueCategory,
}
