//! Errors surfaced by the progression tracker.

use thiserror::Error;
use venue_ladder_core::{ConfigurationError, MatchId, ProviderError, TournamentId};

/// Failure of a tracker operation.
///
/// Allocation state is never mutated before a provider failure surfaces, so any operation
/// that returns [`EngineError::Provider`] can be retried as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The ladder or venue supply cannot support the tournament
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A collaborator call failed
    #[error("{operation} failed for tournament '{tournament_id}': {source}")]
    Provider {
        /// Tournament being driven
        tournament_id: TournamentId,
        /// Match involved, if the call concerned one
        match_id: Option<MatchId>,
        /// Collaborator operation that failed
        operation: &'static str,
        /// Underlying error
        #[source]
        source: ProviderError,
    },
}

impl EngineError {
    /// Whether retrying the same call may succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Configuration(_) => false,
            Self::Provider { source, .. } => source.is_transient(),
        }
    }

    /// The match the failed call concerned
    #[must_use]
    pub const fn match_id(&self) -> Option<MatchId> {
        match self {
            Self::Configuration(_) => None,
            Self::Provider { match_id, .. } => *match_id,
        }
    }
}
