//! Bracket provider abstraction.
//!
//! The bracket provider (Challonge, start.gg, an in-house service) owns seeding, match
//! state and result recording. This crate only reads which matches are open and writes
//! results back.
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so a provider can be
//! held as `Arc<dyn BracketProvider>`.

use crate::error::ProviderError;
use crate::types::{Match, MatchId, ParticipantId, TournamentId, TournamentState};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by collaborator traits
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// External tournament-bracket service.
///
/// Implementations are expected to be idempotent for repeated identical result reports:
/// reporting the winner a match already has must succeed without side effects.
pub trait BracketProvider: Send + Sync {
    /// All matches currently in the `open` state.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the provider cannot be reached.
    fn list_open_matches<'a>(&'a self, tournament: &'a TournamentId) -> ProviderFuture<'a, Vec<Match>>;

    /// Record `winner` as the winner of `match_id`.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::MatchNotFound`] if the match does not exist
    /// - [`ProviderError::Rejected`] if the match already has a different winner or
    ///   `winner` does not play in it
    /// - [`ProviderError::Unavailable`] on transport failure
    fn report_result<'a>(
        &'a self,
        tournament: &'a TournamentId,
        match_id: MatchId,
        winner: &'a ParticipantId,
    ) -> ProviderFuture<'a, ()>;

    /// Overall tournament progress.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the provider cannot be reached.
    fn get_tournament_state<'a>(&'a self, tournament: &'a TournamentId) -> ProviderFuture<'a, TournamentState>;

    /// A single match, whatever its state.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MatchNotFound`] if the match does not exist.
    fn get_match<'a>(&'a self, tournament: &'a TournamentId, match_id: MatchId) -> ProviderFuture<'a, Match>;
}
