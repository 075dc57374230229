//! Per-tier venue pool.
//!
//! Venues are never created or destroyed here, only handed out and taken back.
//! Sets are ordered so that acquisition is deterministic (lowest id first).

use crate::types::VenueId;
use serde::Serialize;
use std::collections::BTreeSet;

/// Bounded set of venues serving one tier.
///
/// Invariant: `available ⊆ all`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VenuePool {
    all: BTreeSet<VenueId>,
    available: BTreeSet<VenueId>,
}

impl VenuePool {
    /// Creates an empty pool
    #[must_use]
    pub const fn new() -> Self {
        Self {
            all: BTreeSet::new(),
            available: BTreeSet::new(),
        }
    }

    /// Creates a pool where every venue starts available
    #[must_use]
    pub fn with_venues(venues: impl IntoIterator<Item = VenueId>) -> Self {
        let all: BTreeSet<VenueId> = venues.into_iter().collect();
        Self {
            available: all.clone(),
            all,
        }
    }

    /// Add a venue to the pool as available. Returns `false` if it was already owned.
    pub fn insert(&mut self, venue: VenueId) -> bool {
        if self.all.insert(venue.clone()) {
            self.available.insert(venue);
            true
        } else {
            false
        }
    }

    /// Take any available venue, or `None` when the pool is exhausted.
    pub fn acquire(&mut self) -> Option<VenueId> {
        self.available.pop_first()
    }

    /// Return `venue` to the pool.
    ///
    /// Releasing an already available venue is a no-op, as is releasing a venue the pool
    /// does not own. Returns `true` only if the venue actually became available.
    pub fn release(&mut self, venue: &VenueId) -> bool {
        if self.all.contains(venue) {
            self.available.insert(venue.clone())
        } else {
            false
        }
    }

    /// Whether `venue` is currently unassigned
    #[must_use]
    pub fn is_free(&self, venue: &VenueId) -> bool {
        self.available.contains(venue)
    }

    /// Whether `venue` belongs to this pool
    #[must_use]
    pub fn contains(&self, venue: &VenueId) -> bool {
        self.all.contains(venue)
    }

    /// Mark every venue available again
    pub fn reset(&mut self) {
        self.available.clone_from(&self.all);
    }

    /// Number of venues owned
    #[must_use]
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Whether the pool owns no venues at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Number of venues currently free
    #[must_use]
    pub fn available_len(&self) -> usize {
        self.available.len()
    }

    /// Free venues, in id order
    pub fn available(&self) -> impl Iterator<Item = &VenueId> {
        self.available.iter()
    }

    /// Owned venues, in id order
    pub fn venues(&self) -> impl Iterator<Item = &VenueId> {
        self.all.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> VenuePool {
        VenuePool::with_venues(["V1", "V2"].map(VenueId::new))
    }

    #[test]
    fn test_acquire_until_exhausted() {
        let mut pool = pool();

        assert_eq!(pool.acquire(), Some(VenueId::new("V1")));
        assert_eq!(pool.acquire(), Some(VenueId::new("V2")));
        assert_eq!(pool.acquire(), None);
        assert_eq!(pool.available_len(), 0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_double_release_is_noop() {
        let mut pool = pool();
        let venue = pool.acquire();
        assert_eq!(venue, Some(VenueId::new("V1")));
        let venue = VenueId::new("V1");

        assert!(pool.release(&venue));
        let after_first = pool.clone();
        assert!(!pool.release(&venue));

        assert_eq!(pool, after_first);
        assert!(pool.is_free(&venue));
    }

    #[test]
    fn test_release_of_foreign_venue_is_ignored() {
        let mut pool = pool();
        assert!(!pool.release(&VenueId::new("V9")));
        assert!(!pool.contains(&VenueId::new("V9")));
        assert_eq!(pool.available_len(), 2);
    }

    #[test]
    fn test_insert_and_reset() {
        let mut pool = VenuePool::new();
        assert!(pool.is_empty());
        assert!(pool.insert(VenueId::new("V3")));
        assert!(!pool.insert(VenueId::new("V3")));

        let _ = pool.acquire();
        assert_eq!(pool.available_len(), 0);
        pool.reset();
        assert!(pool.is_free(&VenueId::new("V3")));
    }
}
