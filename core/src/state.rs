//! Per-tournament allocation state.
//!
//! [`TournamentAllocationState`] owns the tier ladder, one [`VenuePool`] per tier and the
//! [`AssignmentLedger`]. One instance exists per running tournament and is injected into
//! whatever drives it; nothing here is global. Callers serialize access (the runtime holds
//! it behind a single mutex).

use crate::error::{ConfigurationError, InvariantViolation};
use crate::ladder::{Tier, TierLadder};
use crate::ledger::{AssignmentLedger, Holders};
use crate::pool::VenuePool;
use crate::types::{Match, ParticipantId, Venue, VenueCategory, VenueId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Mutable allocation state for one tournament.
#[derive(Clone, Debug)]
pub struct TournamentAllocationState {
    ladder: TierLadder,
    pools: Vec<VenuePool>,
    venue_tiers: HashMap<VenueId, usize>,
    ledger: AssignmentLedger,
}

impl TournamentAllocationState {
    /// Creates state for `ladder` with one empty pool per tier
    #[must_use]
    pub fn new(ladder: TierLadder) -> Self {
        let pools = vec![VenuePool::new(); ladder.tiers().len()];
        Self {
            ladder,
            pools,
            venue_tiers: HashMap::new(),
            ledger: AssignmentLedger::new(),
        }
    }

    /// Register venues listed under `category`. Returns how many were new.
    ///
    /// Registering a venue twice under the same category is harmless. Nothing is
    /// registered if any venue fails validation.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::UnknownCategory`] if no tier uses `category`
    /// - [`ConfigurationError::DuplicateVenue`] if a venue is already registered under
    ///   another category
    pub fn register_venues(
        &mut self,
        category: &VenueCategory,
        venues: impl IntoIterator<Item = VenueId>,
    ) -> Result<usize, ConfigurationError> {
        let tier_index = self
            .ladder
            .tier_for_category(category)
            .map(|tier| tier.index)
            .ok_or_else(|| ConfigurationError::UnknownCategory {
                category: category.clone(),
            })?;

        let venues: Vec<VenueId> = venues.into_iter().collect();
        for venue in &venues {
            if let Some(&existing) = self.venue_tiers.get(venue) {
                if existing != tier_index {
                    return Err(ConfigurationError::DuplicateVenue {
                        venue: venue.clone(),
                        first: self.category_of_tier(existing),
                        second: category.clone(),
                    });
                }
            }
        }

        let mut added = 0;
        for venue in venues {
            if self.pools[tier_index].insert(venue.clone()) {
                self.venue_tiers.insert(venue, tier_index);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Check every tier's configured minimum venue count.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InsufficientVenues`] for the first tier short of venues.
    pub fn validate_capacity(&self) -> Result<(), ConfigurationError> {
        for tier in self.ladder.tiers() {
            let Some(required) = tier.min_venues else {
                continue;
            };
            let available = self.pools[tier.index].len();
            if available < required {
                return Err(ConfigurationError::InsufficientVenues {
                    tier: tier.name.clone(),
                    required,
                    available,
                });
            }
        }
        Ok(())
    }

    /// The ladder this state was built for
    #[must_use]
    pub const fn ladder(&self) -> &TierLadder {
        &self.ladder
    }

    /// The assignment ledger
    #[must_use]
    pub const fn ledger(&self) -> &AssignmentLedger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut AssignmentLedger {
        &mut self.ledger
    }

    /// Pool serving the tier at `tier_index`
    #[must_use]
    pub fn pool(&self, tier_index: usize) -> Option<&VenuePool> {
        self.pools.get(tier_index)
    }

    pub(crate) fn pool_mut(&mut self, tier_index: usize) -> Option<&mut VenuePool> {
        self.pools.get_mut(tier_index)
    }

    /// Venue held by `participant`
    #[must_use]
    pub fn holder_of(&self, participant: &ParticipantId) -> Option<&VenueId> {
        self.ledger.holder_of(participant)
    }

    /// Tier whose pool owns `venue`
    #[must_use]
    pub fn tier_of_venue(&self, venue: &VenueId) -> Option<&Tier> {
        self.venue_tiers
            .get(venue)
            .and_then(|&index| self.ladder.tier(index))
    }

    /// `venue` together with its category, if registered
    #[must_use]
    pub fn venue(&self, venue: &VenueId) -> Option<Venue> {
        self.tier_of_venue(venue).map(|tier| Venue {
            id: venue.clone(),
            category: tier.venue_category.clone(),
        })
    }

    /// Return `venue` to its pool, clearing everyone who held it.
    ///
    /// Idempotent: releasing a free venue changes nothing. Returns the participants whose
    /// entries were cleared.
    pub fn release_venue(&mut self, venue: &VenueId) -> Holders {
        let holders = self.ledger.clear_venue(venue);
        if let Some(&index) = self.venue_tiers.get(venue) {
            self.pools[index].release(venue);
        }
        holders
    }

    /// Record that `winner` won `finished`.
    ///
    /// The loser's entry is cleared. The winner's entry is left alone: whether it still
    /// needs its venue depends on which matches are open next, which only the caller
    /// knows. If nobody holds the loser's venue afterwards it goes back to its pool and is
    /// returned. Settling the same match twice is a no-op.
    pub fn settle_match(&mut self, finished: &Match, winner: &ParticipantId) -> Option<VenueId> {
        let loser = finished.opponent_of(winner)?;
        self.release_participant(loser)
    }

    /// Clear `participant`'s entry.
    ///
    /// If nobody holds the venue afterwards it goes back to its pool and is returned.
    pub fn release_participant(&mut self, participant: &ParticipantId) -> Option<VenueId> {
        let venue = self.ledger.clear(participant)?;
        if self.ledger.participants_of(&venue).is_empty() {
            self.release_venue(&venue);
            Some(venue)
        } else {
            None
        }
    }

    /// Clear the ledger and return every venue to its pool.
    ///
    /// Returns the number of venues that became free.
    pub fn reclaim_all(&mut self) -> usize {
        let held = self.ledger.venues().count();
        self.ledger.clear_all();
        for pool in &mut self.pools {
            pool.reset();
        }
        held
    }

    /// Comparable, serializable view of the whole state
    #[must_use]
    pub fn snapshot(&self) -> AllocationSnapshot {
        let assignments = self
            .ledger
            .iter()
            .map(|(participant, venue)| (participant.clone(), venue.clone()))
            .collect();

        let pools = self
            .ladder
            .tiers()
            .iter()
            .zip(&self.pools)
            .map(|(tier, pool)| PoolSnapshot {
                tier: tier.name.clone(),
                category: tier.venue_category.clone(),
                available: pool.available().cloned().collect(),
                all: pool.venues().cloned().collect(),
            })
            .collect();

        AllocationSnapshot { assignments, pools }
    }

    /// Check structural invariants of pools and ledger.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let mut owned = 0;
        for (index, pool) in self.pools.iter().enumerate() {
            if let Some(venue) = pool.available().find(|venue| !pool.contains(venue)) {
                return Err(InvariantViolation::AvailableNotOwned {
                    venue: venue.clone(),
                });
            }
            for venue in pool.venues() {
                if self.venue_tiers.get(venue) != Some(&index) {
                    return Err(InvariantViolation::UnregisteredVenue {
                        venue: venue.clone(),
                    });
                }
                owned += 1;
            }
        }
        if owned != self.venue_tiers.len() {
            let stray = self
                .venue_tiers
                .iter()
                .find(|(venue, index)| {
                    self.pools
                        .get(**index)
                        .is_none_or(|pool| !pool.contains(venue))
                })
                .map(|(venue, _)| venue.clone());
            if let Some(venue) = stray {
                return Err(InvariantViolation::UnregisteredVenue { venue });
            }
        }

        for (venue, holders) in self.ledger.venues() {
            if holders.len() > 2 {
                return Err(InvariantViolation::TooManyHolders {
                    venue: venue.clone(),
                    holders: holders.to_vec(),
                });
            }
            let Some(&index) = self.venue_tiers.get(venue) else {
                return Err(InvariantViolation::UnregisteredVenue {
                    venue: venue.clone(),
                });
            };
            if self.pools[index].is_free(venue) {
                return Err(InvariantViolation::HeldAndAvailable {
                    venue: venue.clone(),
                    holders: holders.to_vec(),
                });
            }
        }

        let mut indexed = 0;
        for (venue, holders) in self.ledger.venues() {
            for participant in holders {
                if self.ledger.holder_of(participant) != Some(venue) {
                    return Err(InvariantViolation::LedgerIndexMismatch {
                        participant: participant.clone(),
                    });
                }
                indexed += 1;
            }
        }
        if indexed != self.ledger.len() {
            if let Some((participant, _)) = self
                .ledger
                .iter()
                .find(|(participant, venue)| !self.ledger.participants_of(venue).contains(participant))
            {
                return Err(InvariantViolation::LedgerIndexMismatch {
                    participant: participant.clone(),
                });
            }
        }

        Ok(())
    }

    /// Check that every shared venue is shared by the two opponents of one open match.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::UnpairedSharing`] for the first offending venue.
    pub fn verify_pairings(&self, open_matches: &[Match]) -> Result<(), InvariantViolation> {
        for (venue, holders) in self.ledger.venues() {
            if holders.len() != 2 {
                continue;
            }
            let paired = open_matches
                .iter()
                .any(|m| m.involves(&holders[0]) && m.involves(&holders[1]));
            if !paired {
                return Err(InvariantViolation::UnpairedSharing {
                    venue: venue.clone(),
                    holders: holders.to_vec(),
                });
            }
        }
        Ok(())
    }

    fn category_of_tier(&self, index: usize) -> VenueCategory {
        self.ladder
            .tier(index)
            .map(|tier| tier.venue_category.clone())
            .unwrap_or_else(|| VenueCategory::new(""))
    }
}

/// Point-in-time view of one pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Tier name
    pub tier: String,
    /// Tier's venue category
    pub category: VenueCategory,
    /// Free venues, ordered
    pub available: Vec<VenueId>,
    /// Owned venues, ordered
    pub all: Vec<VenueId>,
}

/// Point-in-time view of a tournament's allocation state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSnapshot {
    /// Who holds what
    pub assignments: BTreeMap<ParticipantId, VenueId>,
    /// Pools in ladder order
    pub pools: Vec<PoolSnapshot>,
}

impl AllocationSnapshot {
    /// Pool view for the tier named `tier`
    #[must_use]
    pub fn pool(&self, tier: &str) -> Option<&PoolSnapshot> {
        self.pools.iter().find(|pool| pool.tier == tier)
    }
}
