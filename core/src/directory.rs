//! Venue directory abstraction.

use crate::bracket::ProviderFuture;
use crate::types::{VenueCategory, VenueId};

/// External directory of addressable venues, grouped by category.
pub trait VenueDirectory: Send + Sync {
    /// Every venue listed under `category`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`](crate::error::ProviderError) if the directory cannot be reached.
    fn list_venues<'a>(&'a self, category: &'a VenueCategory) -> ProviderFuture<'a, Vec<VenueId>>;
}
