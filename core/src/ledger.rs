//! Assignment ledger: who holds which venue.
//!
//! The ledger is the single source of truth for venue ownership. It keeps a reverse index
//! from venue to holders so [`AssignmentLedger::participants_of`] does not scan every entry.
//!
//! A venue normally has zero or one holder, and exactly two while the match it was
//! assigned to is open (both opponents point at the match's venue). The ledger itself does
//! not enforce that; [`crate::state::TournamentAllocationState::verify`] does.

use crate::types::{ParticipantId, VenueId};
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Holders of a single venue
pub type Holders = SmallVec<[ParticipantId; 2]>;

/// Mapping from participant to the venue it currently holds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentLedger {
    holders: BTreeMap<ParticipantId, VenueId>,
    #[serde(skip)]
    by_venue: BTreeMap<VenueId, Holders>,
}

impl AssignmentLedger {
    /// Creates an empty ledger
    #[must_use]
    pub const fn new() -> Self {
        Self {
            holders: BTreeMap::new(),
            by_venue: BTreeMap::new(),
        }
    }

    /// Venue held by `participant`
    #[must_use]
    pub fn holder_of(&self, participant: &ParticipantId) -> Option<&VenueId> {
        self.holders.get(participant)
    }

    /// Participants holding `venue`
    #[must_use]
    pub fn participants_of(&self, venue: &VenueId) -> Holders {
        self.by_venue.get(venue).cloned().unwrap_or_default()
    }

    /// Point `participant` at `venue`, replacing any previous entry.
    pub fn set(&mut self, participant: ParticipantId, venue: VenueId) {
        if self.holders.get(&participant) == Some(&venue) {
            return;
        }
        self.detach(&participant);
        self.by_venue
            .entry(venue.clone())
            .or_default()
            .push(participant.clone());
        self.holders.insert(participant, venue);
    }

    /// Remove `participant`'s entry. Returns the venue it held, if any.
    ///
    /// Clearing an already clear entry is a no-op.
    pub fn clear(&mut self, participant: &ParticipantId) -> Option<VenueId> {
        let venue = self.holders.remove(participant)?;
        self.remove_reverse(&venue, participant);
        Some(venue)
    }

    /// Remove every holder of `venue`, returning who held it
    pub fn clear_venue(&mut self, venue: &VenueId) -> Holders {
        let holders = self.by_venue.remove(venue).unwrap_or_default();
        for participant in &holders {
            self.holders.remove(participant);
        }
        holders
    }

    /// Drop every entry
    pub fn clear_all(&mut self) {
        self.holders.clear();
        self.by_venue.clear();
    }

    /// All `(participant, venue)` entries, ordered by participant
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &VenueId)> {
        self.holders.iter()
    }

    /// All held venues with their holders, ordered by venue
    pub fn venues(&self) -> impl Iterator<Item = (&VenueId, &Holders)> {
        self.by_venue.iter()
    }

    /// Number of participants holding a venue
    #[must_use]
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    /// Whether nobody holds anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    fn detach(&mut self, participant: &ParticipantId) {
        if let Some(previous) = self.holders.remove(participant) {
            self.remove_reverse(&previous, participant);
        }
    }

    fn remove_reverse(&mut self, venue: &VenueId, participant: &ParticipantId) {
        if let Some(holders) = self.by_venue.get_mut(venue) {
            holders.retain(|holder| holder != participant);
            if holders.is_empty() {
                self.by_venue.remove(venue);
            }
        }
    }
}
