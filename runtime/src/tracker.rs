//! Bracket progression driver.
//!
//! [`ProgressionTracker`] owns one tournament's allocation state behind a single async
//! mutex. Every entry point follows the same shape:
//!
//! 1. Talk to the bracket provider with no lock held (timeouts, retries of reads).
//! 2. Lock, apply the in-memory allocation step, verify integrity, unlock.
//! 3. Deliver notifications, bounded by the notification timeout.
//!
//! A provider failure in step 1 returns before step 2, so nothing is mutated and the call
//! can simply be repeated.

use crate::config::TrackerConfig;
use crate::error::EngineError;
use crate::metrics;
use crate::retry::retry_transient;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use venue_ladder_core::environment::Clock;
use venue_ladder_core::{
    AllocationResult, AllocationSnapshot, BracketProvider, ExhaustionNotice, InvariantViolation, Match,
    MatchAnnouncement, MatchId, MatchState, NotificationSink, ParticipantId, ProviderError, ProviderFuture, TierLadder,
    TournamentAllocationState, TournamentId, TournamentState, VenueAllocator, VenueCategory, VenueDirectory,
    VenueId,
};

/// Collaborators a tracker talks to.
#[derive(Clone)]
pub struct TrackerEnvironment {
    /// Source of truth for matches and results
    pub bracket: Arc<dyn BracketProvider>,
    /// Where announcements go
    pub sink: Arc<dyn NotificationSink>,
    /// Timestamps for announcements
    pub clock: Arc<dyn Clock>,
}

/// What one tracker call changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Matches announced with a venue during this call
    pub announced: Vec<(MatchId, VenueId)>,
    /// Matches newly found without a venue
    pub exhausted: Vec<MatchId>,
    /// Venues returned to their pools
    pub released: Vec<VenueId>,
}

impl ProgressReport {
    /// Nothing observable happened
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.announced.is_empty() && self.exhausted.is_empty() && self.released.is_empty()
    }
}

/// Open matches as returned by one provider call.
///
/// `started` and `finished` are tickets drawn from the tracker's listing counter before and
/// after the call. A match seen open by a listing that finished before another listing
/// started, and missing from that later listing, has completed.
struct Listing {
    started: u64,
    finished: u64,
    matches: Vec<Match>,
}

struct Announced {
    venue: VenueId,
    /// `finished` ticket of the last listing that saw the match open
    seen: u64,
}

struct TrackerState {
    allocation: TournamentAllocationState,
    /// Venue each open match was last announced with
    announced: HashMap<MatchId, Announced>,
    /// Open matches already announced as lacking a venue, with the ticket that last saw them
    exhausted: HashMap<MatchId, u64>,
    /// Matches whose result went through this tracker; never allocated again
    settled: HashSet<MatchId>,
}

impl TrackerState {
    fn settle(&mut self, match_id: MatchId) {
        self.announced.remove(&match_id);
        self.exhausted.remove(&match_id);
        self.settled.insert(match_id);
    }

    /// Release venues no open match needs.
    ///
    /// Bookkeeping for matches that have left the open list since they were last seen is
    /// dropped first. A holder is then cleared if it plays in none of the listed matches
    /// and its venue is not announced for any match. The listing may be older than one a
    /// concurrent caller already applied, so announced venues are never touched here.
    fn reconcile(&mut self, listing: &Listing, report: &mut ProgressReport) {
        let listed: HashSet<MatchId> = listing.matches.iter().map(|matchup| matchup.id).collect();
        let completed = |match_id: &MatchId, seen: u64| seen < listing.started && !listed.contains(match_id);

        self.announced.retain(|match_id, announced| {
            if completed(match_id, announced.seen) {
                tracing::debug!(match_id = %match_id, venue = %announced.venue, "Match no longer open");
                return false;
            }
            true
        });
        self.exhausted.retain(|match_id, seen| !completed(match_id, *seen));

        let idle: Vec<ParticipantId> = {
            let announced: HashSet<&VenueId> = self.announced.values().map(|announced| &announced.venue).collect();
            let playing: HashSet<&ParticipantId> = listing
                .matches
                .iter()
                .filter(|matchup| !self.settled.contains(&matchup.id))
                .flat_map(|matchup| [&matchup.participant_a, &matchup.participant_b])
                .collect();
            self.allocation
                .ledger()
                .iter()
                .filter(|(participant, venue)| !announced.contains(venue) && !playing.contains(participant))
                .map(|(participant, _)| participant.clone())
                .collect()
        };

        let mut released = 0;
        for participant in idle {
            if let Some(venue) = self.allocation.release_participant(&participant) {
                tracing::info!(venue = %venue, participant = %participant, "Idle venue released");
                report.released.push(venue);
                released += 1;
            }
        }
        metrics::record_releases(released);
    }
}

#[derive(Default)]
struct Outbox {
    announcements: Vec<MatchAnnouncement>,
    notices: Vec<ExhaustionNotice>,
}

/// Drives venue allocation for one tournament as its bracket progresses.
///
/// Cloning is cheap and every clone drives the same tournament, so a tracker can be handed
/// to several concurrent callers (chat commands, a polling task).
#[derive(Clone)]
pub struct ProgressionTracker {
    tournament_id: TournamentId,
    bracket: Arc<dyn BracketProvider>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<TrackerState>>,
    listings: Arc<AtomicU64>,
    config: Arc<TrackerConfig>,
    allocator: VenueAllocator,
}

impl fmt::Debug for ProgressionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressionTracker")
            .field("tournament_id", &self.tournament_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn with_timeout<T>(
    limit: Duration,
    operation: &'static str,
    call: ProviderFuture<'_, T>,
) -> Result<T, ProviderError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(ProviderError::Timeout { operation }))
}

impl ProgressionTracker {
    /// Tracker over an already populated allocation state.
    #[must_use]
    pub fn new(
        tournament_id: TournamentId,
        allocation: TournamentAllocationState,
        environment: TrackerEnvironment,
        config: TrackerConfig,
    ) -> Self {
        metrics::record_available(&allocation);
        Self {
            tournament_id,
            bracket: environment.bracket,
            sink: environment.sink,
            clock: environment.clock,
            state: Arc::new(Mutex::new(TrackerState {
                allocation,
                announced: HashMap::new(),
                exhausted: HashMap::new(),
                settled: HashSet::new(),
            })),
            listings: Arc::new(AtomicU64::new(0)),
            config: Arc::new(config),
            allocator: VenueAllocator::new(),
        }
    }

    /// Load every tier's venues from `directory` and build a tracker.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Provider`] if the directory cannot be listed
    /// - [`EngineError::Configuration`] if a venue is listed under two categories or a
    ///   tier has fewer venues than its `min_venues`
    #[tracing::instrument(skip_all, fields(tournament_id = %tournament_id), name = "bootstrap")]
    pub async fn bootstrap(
        tournament_id: TournamentId,
        ladder: TierLadder,
        directory: &dyn VenueDirectory,
        environment: TrackerEnvironment,
        config: TrackerConfig,
    ) -> Result<Self, EngineError> {
        let mut allocation = TournamentAllocationState::new(ladder);
        let categories: Vec<VenueCategory> = allocation
            .ladder()
            .tiers()
            .iter()
            .map(|tier| tier.venue_category.clone())
            .collect();

        for category in &categories {
            let limit = config.provider_timeout;
            let venues = retry_transient(&config.retry, "list_venues", move || {
                with_timeout(limit, "list_venues", directory.list_venues(category))
            })
            .await
            .map_err(|source| {
                metrics::record_provider_error("list_venues");
                tracing::error!(category = %category, error = %source, "Venue directory unavailable");
                EngineError::Provider {
                    tournament_id: tournament_id.clone(),
                    match_id: None,
                    operation: "list_venues",
                    source,
                }
            })?;

            let listed = venues.len();
            let added = allocation.register_venues(category, venues)?;
            tracing::info!(category = %category, listed, added, "Registered venues");
        }
        allocation.validate_capacity()?;

        Ok(Self::new(tournament_id, allocation, environment, config))
    }

    /// Tournament this tracker drives
    #[must_use]
    pub const fn tournament_id(&self) -> &TournamentId {
        &self.tournament_id
    }

    /// Record a result, then allocate venues for whatever it opened.
    ///
    /// The loser's venue is released. The winner keeps its venue only while it plays in
    /// an open match, so a winner still waiting for its next opponent frees it too. The
    /// winner's newly opened matches are allocated first; every other open match still
    /// lacking a venue is retried after that. Reporting the same result again announces
    /// nothing new.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Provider`] if the match cannot be read, the provider refuses
    /// the result, or open matches cannot be listed. Allocation state is untouched in
    /// every case.
    ///
    /// # Panics
    ///
    /// Panics if the allocation state fails its integrity check afterwards.
    #[tracing::instrument(skip(self), fields(tournament_id = %self.tournament_id), name = "report_result")]
    pub async fn report_result(
        &self,
        match_id: MatchId,
        winner: &ParticipantId,
    ) -> Result<ProgressReport, EngineError> {
        let finished = self
            .read("get_match", Some(match_id), move || {
                self.bracket.get_match(&self.tournament_id, match_id)
            })
            .await?;

        with_timeout(
            self.config.provider_timeout,
            "report_result",
            self.bracket.report_result(&self.tournament_id, match_id, winner),
        )
        .await
        .map_err(|source| self.provider_error("report_result", Some(match_id), source))?;
        tracing::info!(match_id = %match_id, winner = %winner, "Result reported");

        let mut listing = self.list_open(Some(match_id)).await?;
        listing.matches.retain(|matchup| matchup.id != match_id);
        listing.matches.sort_by_key(|matchup| !matchup.involves(winner));

        let (report, outbox) = {
            let mut state = self.state.lock().await;
            let mut report = ProgressReport::default();
            if let Some(venue) = state.allocation.settle_match(&finished, winner) {
                tracing::info!(venue = %venue, match_id = %match_id, "Venue freed by settlement");
                metrics::record_releases(1);
                report.released.push(venue);
            }
            state.settle(match_id);
            state.reconcile(&listing, &mut report);
            let outbox = self.allocate_open(&mut state, &listing, &mut report);
            self.check(&state);
            (report, outbox)
        };

        self.deliver(outbox).await;
        Ok(report)
    }

    /// Poll the provider and bring allocation in line with the bracket.
    ///
    /// - `not_started`: nothing happens
    /// - `running`: venues of matches that completed, including ones whose result never
    ///   went through this tracker, are released; then every open match is allocated
    /// - `finished`: every venue is reclaimed
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Provider`] if the provider cannot be read.
    ///
    /// # Panics
    ///
    /// Panics if the allocation state fails its integrity check afterwards.
    #[tracing::instrument(skip(self), fields(tournament_id = %self.tournament_id), name = "sync")]
    pub async fn sync(&self) -> Result<ProgressReport, EngineError> {
        let status = self
            .read("get_tournament_state", None, move || {
                self.bracket.get_tournament_state(&self.tournament_id)
            })
            .await?;

        match status {
            TournamentState::NotStarted => {
                tracing::debug!("Tournament not started");
                Ok(ProgressReport::default())
            }
            TournamentState::Finished => Ok(self.reclaim().await),
            TournamentState::Running => {
                let listing = self.list_open(None).await?;
                let (report, outbox) = {
                    let mut state = self.state.lock().await;
                    let mut report = ProgressReport::default();
                    state.reconcile(&listing, &mut report);
                    let outbox = self.allocate_open(&mut state, &listing, &mut report);
                    self.check(&state);
                    (report, outbox)
                };
                self.deliver(outbox).await;
                Ok(report)
            }
        }
    }

    /// Operator remediation: free `venue`, clearing everyone who held it.
    ///
    /// The match that was using it is re-announced once the next [`sync`](Self::sync) or
    /// result report allocates it again. Returns the cleared holders.
    ///
    /// # Panics
    ///
    /// Panics if the allocation state fails its integrity check afterwards.
    #[tracing::instrument(skip(self), fields(tournament_id = %self.tournament_id), name = "release_venue")]
    pub async fn release_venue(&self, venue: &VenueId) -> Vec<ParticipantId> {
        let mut state = self.state.lock().await;
        let holders = state.allocation.release_venue(venue);
        state.announced.retain(|_, announced| announced.venue != *venue);

        if holders.is_empty() {
            tracing::debug!(venue = %venue, "Venue already free");
        } else {
            tracing::info!(venue = %venue, holders = ?holders, "Venue released by operator");
            metrics::record_releases(1);
        }
        metrics::record_available(&state.allocation);
        self.check(&state);
        holders.into_vec()
    }

    /// Operator remediation: add `venue` to the tier serving `category`.
    ///
    /// Returns `false` if the venue was already registered there.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if no tier serves `category` or the venue
    /// belongs to another tier.
    ///
    /// # Panics
    ///
    /// Panics if the allocation state fails its integrity check afterwards.
    #[tracing::instrument(skip(self), fields(tournament_id = %self.tournament_id), name = "add_venue")]
    pub async fn add_venue(&self, category: &VenueCategory, venue: VenueId) -> Result<bool, EngineError> {
        let mut state = self.state.lock().await;
        let added = state.allocation.register_venues(category, [venue.clone()])? > 0;
        if added {
            tracing::info!(venue = %venue, category = %category, "Venue added");
            metrics::record_available(&state.allocation);
        }
        self.check(&state);
        Ok(added)
    }

    /// Current ledger and pools
    pub async fn snapshot(&self) -> AllocationSnapshot {
        self.state.lock().await.allocation.snapshot()
    }

    /// Venue currently held by `participant`
    pub async fn holder_of(&self, participant: &ParticipantId) -> Option<VenueId> {
        self.state.lock().await.allocation.holder_of(participant).cloned()
    }

    /// Venue `match_id` was last announced with
    pub async fn announced_venue(&self, match_id: MatchId) -> Option<VenueId> {
        self.state
            .lock()
            .await
            .announced
            .get(&match_id)
            .map(|announced| announced.venue.clone())
    }

    /// Check that every shared venue is shared by the two opponents of one of `open`.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::UnpairedSharing`] for the first offending venue.
    pub async fn verify_pairings(&self, open: &[Match]) -> Result<(), InvariantViolation> {
        self.state.lock().await.allocation.verify_pairings(open)
    }

    async fn read<'a, T>(
        &'a self,
        operation: &'static str,
        match_id: Option<MatchId>,
        mut call: impl FnMut() -> ProviderFuture<'a, T>,
    ) -> Result<T, EngineError> {
        let limit = self.config.provider_timeout;
        retry_transient(&self.config.retry, operation, || with_timeout(limit, operation, call()))
            .await
            .map_err(|source| self.provider_error(operation, match_id, source))
    }

    async fn list_open(&self, match_id: Option<MatchId>) -> Result<Listing, EngineError> {
        let started = self.listings.fetch_add(1, Ordering::SeqCst);
        let mut matches = self
            .read("list_open_matches", match_id, move || {
                self.bracket.list_open_matches(&self.tournament_id)
            })
            .await?;
        matches.retain(|matchup| matchup.state == MatchState::Open);
        let finished = self.listings.fetch_add(1, Ordering::SeqCst);
        Ok(Listing {
            started,
            finished,
            matches,
        })
    }

    fn provider_error(
        &self,
        operation: &'static str,
        match_id: Option<MatchId>,
        source: ProviderError,
    ) -> EngineError {
        metrics::record_provider_error(operation);
        tracing::error!(operation, match_id = ?match_id, error = %source, "Provider call failed");
        EngineError::Provider {
            tournament_id: self.tournament_id.clone(),
            match_id,
            operation,
            source,
        }
    }

    /// Allocate each listed match in order. Called with the lock held.
    ///
    /// The listing may be stale by the time the lock is taken: a concurrent report can have
    /// settled one of its matches in between, so settled matches are skipped.
    fn allocate_open(&self, state: &mut TrackerState, listing: &Listing, report: &mut ProgressReport) -> Outbox {
        let now = self.clock.now();
        let mut outbox = Outbox::default();

        for matchup in &listing.matches {
            if state.settled.contains(&matchup.id) {
                continue;
            }
            let tier = state.allocation.ladder().tier_for(matchup.round_index).clone();
            let allocation = self.allocator.allocate(
                &mut state.allocation,
                &tier,
                &matchup.participant_a,
                &matchup.participant_b,
            );
            metrics::record_allocation(allocation.transition);
            metrics::record_releases(allocation.released.len());
            for venue in &allocation.released {
                tracing::info!(venue = %venue, match_id = %matchup.id, "Stale venue released");
            }
            report.released.extend(allocation.released.iter().cloned());
            if !allocation.evicted.is_empty() {
                tracing::debug!(evicted = ?allocation.evicted, match_id = %matchup.id, "Dropped stale holders");
            }

            match allocation.result {
                AllocationResult::Assigned(venue) => {
                    state.exhausted.remove(&matchup.id);
                    if let Some(announced) = state.announced.get_mut(&matchup.id) {
                        if announced.venue == venue {
                            announced.seen = listing.finished;
                            tracing::debug!(match_id = %matchup.id, venue = %venue, "Venue unchanged");
                            continue;
                        }
                    }
                    tracing::info!(
                        match_id = %matchup.id,
                        venue = %venue,
                        tier = %tier.name,
                        transition = allocation.transition.as_str(),
                        "Venue assigned"
                    );
                    state.announced.insert(
                        matchup.id,
                        Announced {
                            venue: venue.clone(),
                            seen: listing.finished,
                        },
                    );
                    report.announced.push((matchup.id, venue.clone()));
                    outbox.announcements.push(MatchAnnouncement::new(
                        self.tournament_id.clone(),
                        matchup.clone(),
                        venue,
                        &tier,
                        now,
                    ));
                }
                AllocationResult::Exhausted => {
                    state.announced.remove(&matchup.id);
                    if state.exhausted.insert(matchup.id, listing.finished).is_some() {
                        tracing::debug!(match_id = %matchup.id, "Still waiting for a venue");
                        continue;
                    }
                    tracing::warn!(
                        match_id = %matchup.id,
                        tier = %tier.name,
                        category = %tier.venue_category,
                        "No venue available"
                    );
                    metrics::record_exhaustion(&tier);
                    report.exhausted.push(matchup.id);
                    outbox
                        .notices
                        .push(ExhaustionNotice::new(self.tournament_id.clone(), matchup.clone(), &tier, now));
                }
            }
        }

        metrics::record_available(&state.allocation);
        outbox
    }

    async fn reclaim(&self) -> ProgressReport {
        let mut state = self.state.lock().await;
        let released: Vec<VenueId> = state
            .allocation
            .ledger()
            .venues()
            .map(|(venue, _)| venue.clone())
            .collect();
        state.allocation.reclaim_all();
        state.announced.clear();
        state.exhausted.clear();

        if !released.is_empty() {
            tracing::info!(venues = released.len(), "Tournament finished, venues reclaimed");
        }
        metrics::record_releases(released.len());
        metrics::record_available(&state.allocation);
        self.check(&state);

        ProgressReport {
            released,
            ..ProgressReport::default()
        }
    }

    #[allow(clippy::panic)] // Ledger corruption is fatal
    fn check(&self, state: &TrackerState) {
        if let Err(violation) = state.allocation.verify() {
            tracing::error!(tournament_id = %self.tournament_id, %violation, "Allocation state corrupted");
            panic!("allocation state of tournament '{}' is corrupted: {violation}", self.tournament_id);
        }
    }

    /// Send queued notifications concurrently. Called with the lock released.
    async fn deliver(&self, outbox: Outbox) {
        let limit = self.config.notify_timeout;
        let announcements = outbox.announcements.iter().map(|announcement| async move {
            if tokio::time::timeout(limit, self.sink.announce_match(announcement))
                .await
                .is_err()
            {
                tracing::warn!(
                    match_id = %announcement.matchup.id,
                    venue = %announcement.venue,
                    "Match announcement timed out, dropped"
                );
            }
        });
        let notices = outbox.notices.iter().map(|notice| async move {
            if tokio::time::timeout(limit, self.sink.announce_exhaustion(notice))
                .await
                .is_err()
            {
                tracing::warn!(match_id = %notice.matchup.id, "Exhaustion notice timed out, dropped");
            }
        });
        futures::future::join(join_all(announcements), join_all(notices)).await;
    }
}
