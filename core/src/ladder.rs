//! Tier ladder: which venue category governs which bracket round.
//!
//! A ladder is a list of tiers in play order. Each tier spans a contiguous block of rounds,
//! so the first tier covers rounds `0..rounds`, the next one the following block, and so on.
//! [`TierLadder::tier_for`] is the single place round numbers are turned into tiers.
//!
//! # Example
//!
//! ```
//! use venue_ladder_core::ladder::{LadderConfig, TierLadder};
//!
//! let config = LadderConfig::from_json(r#"{
//!     "tiers": [
//!         { "name": "Bronze", "badge_id": "badge-bronze", "venue_category": "bronze-rooms", "rounds": 2 },
//!         { "name": "Silver", "badge_id": "badge-silver", "venue_category": "silver-rooms", "rounds": 2 }
//!     ]
//! }"#).unwrap();
//!
//! let ladder = TierLadder::new(config, 4).unwrap();
//! assert_eq!(ladder.tier_for(1).name, "Bronze");
//! assert_eq!(ladder.tier_for(2).name, "Silver");
//! ```

use crate::error::ConfigurationError;
use crate::types::VenueCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One rung of the ladder as written in configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    /// Display name ("Bronze", "Quarterfinals", ...)
    pub name: String,
    /// Badge or reward handed out to participants reaching this tier
    pub badge_id: String,
    /// Venue directory category whose venues serve this tier
    pub venue_category: VenueCategory,
    /// Number of consecutive rounds played at this tier
    pub rounds: u32,
    /// Minimum number of venues the directory must provide for this tier
    #[serde(default)]
    pub min_venues: Option<usize>,
}

/// Ladder configuration document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Tiers in play order
    pub tiers: Vec<TierSpec>,
}

impl LadderConfig {
    /// Parse a ladder from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Parse`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }
}

/// A resolved tier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tier {
    /// Position in the ladder (0 = first tier)
    pub index: usize,
    /// Display name
    pub name: String,
    /// Badge or reward identifier
    pub badge_id: String,
    /// Venue category serving this tier
    pub venue_category: VenueCategory,
    /// Minimum venue count, if configured
    pub min_venues: Option<usize>,
    /// First round index played at this tier
    pub first_round: u32,
    /// Last round index played at this tier (inclusive)
    pub last_round: u32,
}

impl Tier {
    /// Whether `round_index` falls inside this tier's block
    #[must_use]
    pub const fn covers(&self, round_index: u32) -> bool {
        round_index >= self.first_round && round_index <= self.last_round
    }
}

/// Validated, immutable ladder for one tournament
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierLadder {
    tiers: Vec<Tier>,
    max_rounds: u32,
}

impl TierLadder {
    /// Build a ladder for a bracket with `max_rounds` rounds.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::EmptyLadder`] if no tiers are configured
    /// - [`ConfigurationError::ZeroRoundTier`] if a tier spans no rounds
    /// - [`ConfigurationError::DuplicateCategory`] if two tiers share a venue category
    /// - [`ConfigurationError::InsufficientRounds`] if the tiers cover fewer than `max_rounds` rounds
    pub fn new(config: LadderConfig, max_rounds: u32) -> Result<Self, ConfigurationError> {
        if config.tiers.is_empty() {
            return Err(ConfigurationError::EmptyLadder);
        }

        let mut seen = HashSet::new();
        let mut tiers = Vec::with_capacity(config.tiers.len());
        let mut next_round: u32 = 0;

        for (index, spec) in config.tiers.into_iter().enumerate() {
            if spec.rounds == 0 {
                return Err(ConfigurationError::ZeroRoundTier { name: spec.name });
            }
            if !seen.insert(spec.venue_category.clone()) {
                return Err(ConfigurationError::DuplicateCategory {
                    category: spec.venue_category,
                });
            }

            let first_round = next_round;
            let last_round = first_round.saturating_add(spec.rounds - 1);
            next_round = last_round.saturating_add(1);

            tiers.push(Tier {
                index,
                name: spec.name,
                badge_id: spec.badge_id,
                venue_category: spec.venue_category,
                min_venues: spec.min_venues,
                first_round,
                last_round,
            });
        }

        if next_round < max_rounds {
            return Err(ConfigurationError::InsufficientRounds {
                configured: next_round,
                required: max_rounds,
            });
        }

        Ok(Self { tiers, max_rounds })
    }

    /// Number of rounds in a single-elimination bracket of `participants` entrants.
    ///
    /// Always at least one, so a two-entrant bracket (or a degenerate smaller one)
    /// still has a final.
    #[must_use]
    pub const fn rounds_for(participants: usize) -> u32 {
        if participants <= 2 {
            return 1;
        }
        usize::BITS - (participants - 1).leading_zeros()
    }

    /// The tier governing `round_index`.
    ///
    /// Total and monotonic: rounds past the configured coverage map to the last tier.
    #[must_use]
    pub fn tier_for(&self, round_index: u32) -> &Tier {
        let position = self
            .tiers
            .partition_point(|tier| tier.last_round < round_index)
            .min(self.tiers.len() - 1);
        &self.tiers[position]
    }

    /// All tiers in play order
    #[must_use]
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Tier at ladder position `index`
    #[must_use]
    pub fn tier(&self, index: usize) -> Option<&Tier> {
        self.tiers.get(index)
    }

    /// Tier served by `category`
    #[must_use]
    pub fn tier_for_category(&self, category: &VenueCategory) -> Option<&Tier> {
        self.tiers.iter().find(|tier| &tier.venue_category == category)
    }

    /// Rounds the ladder was validated against
    #[must_use]
    pub const fn max_rounds(&self) -> u32 {
        self.max_rounds
    }
}
