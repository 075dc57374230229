//! Notification sink abstraction and payloads.
//!
//! Notifications are fire-and-forget: the sink cannot fail the caller, and a slow sink is
//! bounded by the runtime's notification timeout.

use crate::ladder::Tier;
use crate::types::{Match, TournamentId, VenueCategory, VenueId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// A match got its venue and can start
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAnnouncement {
    /// Tournament
    pub tournament_id: TournamentId,
    /// The match being announced
    pub matchup: Match,
    /// Where it is played
    pub venue: VenueId,
    /// Tier name, for display
    pub tier_name: String,
    /// Badge for reaching the tier
    pub badge_id: String,
    /// When the venue was assigned
    pub announced_at: DateTime<Utc>,
}

impl MatchAnnouncement {
    /// Build an announcement for `matchup` at `venue`
    #[must_use]
    pub fn new(
        tournament_id: TournamentId,
        matchup: Match,
        venue: VenueId,
        tier: &Tier,
        announced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tournament_id,
            matchup,
            venue,
            tier_name: tier.name.clone(),
            badge_id: tier.badge_id.clone(),
            announced_at,
        }
    }
}

/// A match is open but its tier has no free venue
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExhaustionNotice {
    /// Tournament
    pub tournament_id: TournamentId,
    /// The match left without a venue
    pub matchup: Match,
    /// Tier name
    pub tier_name: String,
    /// Category an operator should add venues to
    pub venue_category: VenueCategory,
    /// When exhaustion was detected
    pub noticed_at: DateTime<Utc>,
}

impl ExhaustionNotice {
    /// Build a notice for `matchup` at `tier`
    #[must_use]
    pub fn new(tournament_id: TournamentId, matchup: Match, tier: &Tier, noticed_at: DateTime<Utc>) -> Self {
        Self {
            tournament_id,
            matchup,
            tier_name: tier.name.clone(),
            venue_category: tier.venue_category.clone(),
            noticed_at,
        }
    }

    /// Human-readable degraded message
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "No venue available for tier {} (match {}: {} vs {})",
            self.tier_name, self.matchup.id, self.matchup.participant_a, self.matchup.participant_b
        )
    }
}

/// Channel announcing newly opened matches.
pub trait NotificationSink: Send + Sync {
    /// Announce that a match is ready in `announcement.venue`
    fn announce_match<'a>(&'a self, announcement: &'a MatchAnnouncement) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

    /// Announce that a match could not get a venue
    fn announce_exhaustion<'a>(&'a self, notice: &'a ExhaustionNotice) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}
