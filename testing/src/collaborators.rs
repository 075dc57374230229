//! In-memory venue directory and notification sink.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use venue_ladder_core::{
    ExhaustionNotice, MatchAnnouncement, NotificationSink, ProviderError, ProviderFuture, VenueCategory,
    VenueDirectory, VenueId,
};

/// Venue directory with a fixed listing per category.
///
/// Unknown categories list no venues.
#[derive(Clone, Debug, Default)]
pub struct StaticVenueDirectory {
    venues: HashMap<VenueCategory, Vec<VenueId>>,
    failures: Arc<Mutex<VecDeque<ProviderError>>>,
}

impl StaticVenueDirectory {
    /// Empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// List `venues` under `category`
    #[must_use]
    pub fn with_category<I, V>(mut self, category: impl Into<VenueCategory>, venues: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<VenueId>,
    {
        self.venues
            .entry(category.into())
            .or_default()
            .extend(venues.into_iter().map(Into::into));
        self
    }

    /// Make the next listing fail with `error`
    pub fn fail_next(&self, error: ProviderError) {
        self.failures.lock().unwrap().push_back(error);
    }
}

impl VenueDirectory for StaticVenueDirectory {
    fn list_venues<'a>(&'a self, category: &'a VenueCategory) -> ProviderFuture<'a, Vec<VenueId>> {
        Box::pin(async move {
            if let Some(error) = self.failures.lock().unwrap().pop_front() {
                return Err(error);
            }
            Ok(self.venues.get(category).cloned().unwrap_or_default())
        })
    }
}

#[derive(Debug, Default)]
struct Recorded {
    announcements: Vec<MatchAnnouncement>,
    notices: Vec<ExhaustionNotice>,
}

/// Notification sink that records everything it is sent.
///
/// An optional delay makes every notification slow, for exercising notification
/// timeouts. A notification that times out is not recorded.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    recorded: Arc<Mutex<Recorded>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl RecordingSink {
    /// Empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every notification by `delay`
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Match announcements received so far, in order
    #[must_use]
    pub fn announcements(&self) -> Vec<MatchAnnouncement> {
        self.recorded.lock().unwrap().announcements.clone()
    }

    /// Exhaustion notices received so far, in order
    #[must_use]
    pub fn notices(&self) -> Vec<ExhaustionNotice> {
        self.recorded.lock().unwrap().notices.clone()
    }

    /// Total notifications of either kind
    #[must_use]
    pub fn len(&self) -> usize {
        let recorded = self.recorded.lock().unwrap();
        recorded.announcements.len() + recorded.notices.len()
    }

    /// Nothing received yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl NotificationSink for RecordingSink {
    fn announce_match<'a>(&'a self, announcement: &'a MatchAnnouncement) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.pause().await;
            self.recorded.lock().unwrap().announcements.push(announcement.clone());
        })
    }

    fn announce_exhaustion<'a>(&'a self, notice: &'a ExhaustionNotice) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.pause().await;
            self.recorded.lock().unwrap().notices.push(notice.clone());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directory_lists_by_category() {
        let directory = StaticVenueDirectory::new()
            .with_category("bronze", ["V1", "V2"])
            .with_category("silver", ["V3"]);

        let bronze = directory.list_venues(&"bronze".into()).await.unwrap();
        let gold = directory.list_venues(&"gold".into()).await.unwrap();

        assert_eq!(bronze, vec![VenueId::new("V1"), VenueId::new("V2")]);
        assert!(gold.is_empty());
    }

    #[tokio::test]
    async fn test_directory_failure_is_injected_once() {
        let directory = StaticVenueDirectory::new().with_category("bronze", ["V1"]);
        directory.fail_next(ProviderError::Unavailable("dns".into()));

        assert!(directory.list_venues(&"bronze".into()).await.is_err());
        assert!(directory.list_venues(&"bronze".into()).await.is_ok());
    }
}
