//! Integration tests for the progression tracker against in-memory collaborators.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use venue_ladder_core::environment::Clock;
use venue_ladder_core::{
    ConfigurationError, MatchId, ParticipantId, ProviderError, TierLadder, TournamentId,
    TournamentState, VenueId,
};
use venue_ladder_runtime::{
    EngineError, ProgressReport, ProgressionTracker, RetryPolicy, TrackerConfig, TrackerEnvironment,
};
use venue_ladder_testing::{
    InMemoryBracket, RecordingSink, StaticVenueDirectory, helpers, init_test_tracing, test_clock,
};

struct Harness {
    bracket: InMemoryBracket,
    sink: RecordingSink,
    tracker: ProgressionTracker,
}

fn config() -> TrackerConfig {
    TrackerConfig::default()
        .with_provider_timeout(Duration::from_millis(200))
        .with_notify_timeout(Duration::from_millis(100))
        .with_retry(RetryPolicy::new().with_initial_delay(Duration::from_millis(1)))
}

fn environment(bracket: &InMemoryBracket, sink: &RecordingSink) -> TrackerEnvironment {
    TrackerEnvironment {
        bracket: Arc::new(bracket.clone()),
        sink: Arc::new(sink.clone()),
        clock: Arc::new(test_clock()),
    }
}

fn directory(venues: &[(&str, &[&str])]) -> StaticVenueDirectory {
    venues
        .iter()
        .fold(StaticVenueDirectory::new(), |directory, (category, ids)| {
            directory.with_category(*category, ids.iter().copied())
        })
}

async fn harness_with(
    teams: usize,
    tiers: &[(&str, u32)],
    venues: &[(&str, &[&str])],
    config: TrackerConfig,
) -> Harness {
    init_test_tracing();
    let bracket = InMemoryBracket::single_elimination(helpers::teams(teams));
    let sink = RecordingSink::new();
    let ladder = helpers::ladder(tiers, bracket.rounds());
    let tracker = ProgressionTracker::bootstrap(
        TournamentId::new("spring-cup"),
        ladder,
        &directory(venues),
        environment(&bracket, &sink),
        config,
    )
    .await
    .unwrap();
    Harness {
        bracket,
        sink,
        tracker,
    }
}

async fn harness(teams: usize, tiers: &[(&str, u32)], venues: &[(&str, &[&str])]) -> Harness {
    harness_with(teams, tiers, venues, config()).await
}

fn id(value: u64) -> MatchId {
    MatchId::new(value)
}

fn v(name: &str) -> VenueId {
    VenueId::new(name)
}

fn team(index: usize) -> ParticipantId {
    ParticipantId::new(format!("Team{index}"))
}

const BRONZE_SILVER: &[(&str, u32)] = &[("Bronze", 1), ("Silver", 1)];

#[tokio::test]
async fn test_sync_announces_first_round_once() {
    let h = harness(4, BRONZE_SILVER, &[("bronze", &["V1", "V2"]), ("silver", &["V3"])]).await;

    let first = h.tracker.sync().await.unwrap();
    assert_eq!(first.announced, vec![(id(1), v("V1")), (id(2), v("V2"))]);
    assert_eq!(h.sink.announcements().len(), 2);

    let second = h.tracker.sync().await.unwrap();
    assert!(second.is_quiet());
    assert_eq!(h.sink.announcements().len(), 2);

    let announcement = &h.sink.announcements()[0];
    assert_eq!(announcement.tier_name, "Bronze");
    assert_eq!(announcement.badge_id, "badge-bronze");
    assert_eq!(announcement.announced_at, test_clock().now());
}

#[tokio::test]
async fn test_reporting_same_result_twice_notifies_once() {
    let h = harness(4, BRONZE_SILVER, &[("bronze", &["V1", "V2"]), ("silver", &["V3"])]).await;
    h.tracker.sync().await.unwrap();

    // The final is not open yet, so the winner has no use for its venue either
    let first = h.tracker.report_result(id(1), &team(1)).await.unwrap();
    assert!(first.announced.is_empty());
    assert_eq!(first.released, vec![v("V1")]);
    assert_eq!(h.tracker.holder_of(&team(1)).await, None);
    assert_eq!(h.tracker.holder_of(&team(2)).await, None);

    let opened = h.tracker.report_result(id(2), &team(3)).await.unwrap();
    assert_eq!(opened.announced, vec![(id(3), v("V3"))]);
    assert_eq!(opened.released, vec![v("V2")]);
    assert_eq!(h.sink.announcements().len(), 3);

    let before = h.tracker.snapshot().await;
    let repeated = h.tracker.report_result(id(2), &team(3)).await.unwrap();

    assert_eq!(repeated, ProgressReport::default());
    assert_eq!(h.tracker.snapshot().await, before);
    assert_eq!(h.sink.announcements().len(), 3);
}

#[tokio::test]
async fn test_exhausted_match_is_announced_once_a_venue_frees_up() {
    let h = harness(
        8,
        &[("Bronze", 1), ("Silver", 2)],
        &[("bronze", &["V1", "V2", "V3"]), ("silver", &["S1"])],
    )
    .await;

    let first = h.tracker.sync().await.unwrap();
    assert_eq!(first.exhausted, vec![id(4)]);
    assert_eq!(h.sink.notices().len(), 1);
    assert_eq!(h.sink.notices()[0].venue_category.as_str(), "bronze");
    assert!(h.tracker.sync().await.unwrap().is_quiet());
    assert_eq!(h.sink.notices().len(), 1);

    let freed = h.tracker.report_result(id(1), &team(1)).await.unwrap();
    assert_eq!(freed.released, vec![v("V1")]);
    assert_eq!(freed.announced, vec![(id(4), v("V1"))]);
    assert_eq!(h.tracker.announced_venue(id(4)).await, Some(v("V1")));

    let report = h.tracker.report_result(id(2), &team(3)).await.unwrap();
    assert_eq!(report.announced, vec![(id(5), v("S1"))]);
    assert_eq!(report.released, vec![v("V2")]);
    assert_eq!(h.sink.notices().len(), 1);
    assert_eq!(h.sink.announcements().len(), 5);
}

#[tokio::test]
async fn test_idle_winners_do_not_starve_a_multi_round_tier() {
    let h = harness(
        8,
        &[("Bronze", 2), ("Silver", 1)],
        &[("bronze", &["V1", "V2"]), ("silver", &["S1"])],
    )
    .await;
    let first = h.tracker.sync().await.unwrap();
    assert_eq!(first.exhausted, vec![id(3), id(4)]);

    let report = h.tracker.report_result(id(1), &team(1)).await.unwrap();
    assert_eq!(report.released, vec![v("V1")]);
    assert_eq!(report.announced, vec![(id(3), v("V1"))]);

    // Team3 moves into match 5 and takes its venue along
    let report = h.tracker.report_result(id(2), &team(3)).await.unwrap();
    assert_eq!(report.announced, vec![(id(5), v("V2"))]);
    assert!(report.released.is_empty());

    let report = h.tracker.report_result(id(3), &team(5)).await.unwrap();
    assert_eq!(report.announced, vec![(id(4), v("V1"))]);

    let report = h.tracker.report_result(id(5), &team(1)).await.unwrap();
    assert_eq!(report.released, vec![v("V2")]);
    assert!(h.tracker.sync().await.unwrap().is_quiet());

    let snapshot = h.tracker.snapshot().await;
    assert_eq!(snapshot.pool("Bronze").unwrap().available, vec![v("V2")]);
    assert_eq!(
        snapshot.assignments.into_iter().collect::<Vec<_>>(),
        vec![(team(7), v("V1")), (team(8), v("V1"))]
    );
    assert_eq!(h.tracker.announced_venue(id(4)).await, Some(v("V1")));
    h.tracker.verify_pairings(&h.bracket.open_matches()).await.unwrap();

    let report = h.tracker.report_result(id(4), &team(7)).await.unwrap();
    assert_eq!(report.announced, vec![(id(6), v("V1"))]);
    h.tracker.verify_pairings(&h.bracket.open_matches()).await.unwrap();
}

#[tokio::test]
async fn test_sync_releases_venues_of_matches_completed_elsewhere() {
    use venue_ladder_core::BracketProvider;

    let h = harness(
        8,
        &[("Bronze", 1), ("Silver", 1), ("Gold", 1)],
        &[("bronze", &["V1", "V2", "V3", "V4"]), ("silver", &["S1"]), ("gold", &["G1"])],
    )
    .await;
    h.tracker.sync().await.unwrap();
    let tournament = TournamentId::new("spring-cup");

    h.bracket.report_result(&tournament, id(1), &team(1)).await.unwrap();
    let report = h.tracker.sync().await.unwrap();

    assert_eq!(report.released, vec![v("V1")]);
    assert_eq!(h.tracker.holder_of(&team(1)).await, None);
    assert_eq!(h.tracker.holder_of(&team(2)).await, None);
    assert_eq!(h.tracker.announced_venue(id(1)).await, None);
    h.tracker.verify_pairings(&h.bracket.open_matches()).await.unwrap();

    // Team3 plays on, so only its opponent is cleared before match 5 is allocated
    h.bracket.report_result(&tournament, id(2), &team(3)).await.unwrap();
    let report = h.tracker.sync().await.unwrap();

    assert_eq!(report.announced, vec![(id(5), v("S1"))]);
    assert_eq!(report.released, vec![v("V2")]);
    assert_eq!(h.tracker.holder_of(&team(4)).await, None);
    assert_eq!(h.tracker.announced_venue(id(2)).await, None);
    h.tracker.verify_pairings(&h.bracket.open_matches()).await.unwrap();
    assert!(h.tracker.sync().await.unwrap().is_quiet());
}

#[tokio::test]
async fn test_operator_can_add_and_release_venues() {
    let h = harness(4, BRONZE_SILVER, &[("bronze", &["V1"]), ("silver", &["S1"])]).await;
    let first = h.tracker.sync().await.unwrap();
    assert_eq!(first.exhausted, vec![id(2)]);

    assert!(h.tracker.add_venue(&"bronze".into(), v("V2")).await.unwrap());
    assert!(!h.tracker.add_venue(&"bronze".into(), v("V2")).await.unwrap());
    let after_add = h.tracker.sync().await.unwrap();
    assert_eq!(after_add.announced, vec![(id(2), v("V2"))]);

    let holders = h.tracker.release_venue(&v("V1")).await;
    assert_eq!(holders, vec![team(1), team(2)]);
    assert_eq!(h.tracker.holder_of(&team(1)).await, None);
    assert!(h.tracker.release_venue(&v("V1")).await.is_empty());

    let after_release = h.tracker.sync().await.unwrap();
    assert_eq!(after_release.announced, vec![(id(1), v("V1"))]);
}

#[tokio::test]
async fn test_adding_venues_to_the_wrong_tier_is_a_configuration_error() {
    let h = harness(4, BRONZE_SILVER, &[("bronze", &["V1"]), ("silver", &["S1"])]).await;

    let duplicate = h.tracker.add_venue(&"silver".into(), v("V1")).await;
    assert!(matches!(
        duplicate,
        Err(EngineError::Configuration(ConfigurationError::DuplicateVenue { .. }))
    ));

    let unknown = h.tracker.add_venue(&"gold".into(), v("G1")).await;
    assert!(matches!(
        unknown,
        Err(EngineError::Configuration(ConfigurationError::UnknownCategory { .. }))
    ));
}

#[tokio::test]
async fn test_rejected_report_leaves_state_untouched() {
    let h = harness(4, BRONZE_SILVER, &[("bronze", &["V1", "V2"]), ("silver", &["V3"])]).await;
    h.tracker.sync().await.unwrap();
    let before = h.tracker.snapshot().await;

    h.bracket
        .fail_next("report_result", ProviderError::Unavailable("503".into()));
    let error = h.tracker.report_result(id(1), &team(1)).await.unwrap_err();

    assert!(matches!(
        &error,
        EngineError::Provider { tournament_id, operation: "report_result", .. }
            if tournament_id.as_str() == "spring-cup"
    ));
    assert_eq!(error.match_id(), Some(id(1)));
    assert!(error.is_transient());
    assert_eq!(h.bracket.calls("report_result"), 1);
    assert_eq!(h.bracket.winner_of(id(1)), None);
    assert_eq!(h.tracker.snapshot().await, before);

    h.tracker.report_result(id(1), &team(1)).await.unwrap();
    assert_eq!(h.tracker.holder_of(&team(2)).await, None);
}

#[tokio::test]
async fn test_listing_failure_after_report_is_safe_to_retry() {
    let h = harness(4, BRONZE_SILVER, &[("bronze", &["V1", "V2"]), ("silver", &["V3"])]).await;
    h.tracker.sync().await.unwrap();
    let before = h.tracker.snapshot().await;

    h.bracket.fail_next(
        "list_open_matches",
        ProviderError::Rejected {
            reason: "maintenance".into(),
        },
    );
    let error = h.tracker.report_result(id(1), &team(1)).await.unwrap_err();

    assert!(!error.is_transient());
    assert_eq!(h.bracket.winner_of(id(1)), Some(team(1)));
    assert_eq!(h.tracker.snapshot().await, before);

    h.tracker.report_result(id(1), &team(1)).await.unwrap();
    assert_eq!(h.tracker.holder_of(&team(2)).await, None);
}

#[tokio::test]
async fn test_conflicting_result_is_rejected() {
    let h = harness(4, BRONZE_SILVER, &[("bronze", &["V1", "V2"]), ("silver", &["V3"])]).await;
    h.tracker.sync().await.unwrap();
    h.tracker.report_result(id(1), &team(1)).await.unwrap();
    let before = h.tracker.snapshot().await;

    let conflict = h.tracker.report_result(id(1), &team(2)).await.unwrap_err();
    assert!(matches!(
        conflict,
        EngineError::Provider {
            source: ProviderError::Rejected { .. },
            ..
        }
    ));
    assert_eq!(h.tracker.snapshot().await, before);
}

#[tokio::test]
async fn test_unknown_match_is_reported_as_not_found() {
    let h = harness(4, BRONZE_SILVER, &[("bronze", &["V1", "V2"]), ("silver", &["V3"])]).await;

    let error = h.tracker.report_result(id(42), &team(1)).await.unwrap_err();
    assert!(matches!(
        error,
        EngineError::Provider {
            source: ProviderError::MatchNotFound { .. },
            operation: "get_match",
            ..
        }
    ));
}

#[tokio::test]
async fn test_transient_read_failures_are_retried() {
    let h = harness(4, BRONZE_SILVER, &[("bronze", &["V1", "V2"]), ("silver", &["V3"])]).await;
    h.bracket
        .fail_next("list_open_matches", ProviderError::Unavailable("reset".into()));
    h.bracket
        .fail_next("list_open_matches", ProviderError::Timeout { operation: "list_open_matches" });

    let report = h.tracker.sync().await.unwrap();

    assert_eq!(report.announced.len(), 2);
    assert_eq!(h.bracket.calls("list_open_matches"), 3);
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let config = config()
        .with_provider_timeout(Duration::from_millis(20))
        .with_retry(RetryPolicy::none());
    let h = harness_with(4, BRONZE_SILVER, &[("bronze", &["V1", "V2"]), ("silver", &["V3"])], config).await;
    h.bracket.set_delay(Some(Duration::from_millis(300)));

    let error = h.tracker.sync().await.unwrap_err();

    assert!(matches!(
        error,
        EngineError::Provider {
            source: ProviderError::Timeout {
                operation: "get_tournament_state"
            },
            ..
        }
    ));
    assert!(error.is_transient());
    assert!(h.tracker.snapshot().await.assignments.is_empty());
}

#[tokio::test]
async fn test_slow_sink_does_not_block_allocation() {
    let config = config().with_notify_timeout(Duration::from_millis(10));
    let h = harness_with(4, BRONZE_SILVER, &[("bronze", &["V1", "V2"]), ("silver", &["V3"])], config).await;
    h.sink.set_delay(Some(Duration::from_millis(300)));

    let report = h.tracker.sync().await.unwrap();

    assert_eq!(report.announced.len(), 2);
    assert!(h.sink.is_empty());
    assert_eq!(h.tracker.announced_venue(id(1)).await, Some(v("V1")));
}

#[tokio::test]
async fn test_sync_follows_tournament_lifecycle() {
    let h = harness(4, BRONZE_SILVER, &[("bronze", &["V1", "V2"]), ("silver", &["V3"])]).await;

    h.bracket.set_status(TournamentState::NotStarted);
    assert!(h.tracker.sync().await.unwrap().is_quiet());
    assert!(h.tracker.snapshot().await.assignments.is_empty());

    h.bracket.set_status(TournamentState::Running);
    assert_eq!(h.tracker.sync().await.unwrap().announced.len(), 2);

    h.bracket.set_status(TournamentState::Finished);
    let finished = h.tracker.sync().await.unwrap();
    assert_eq!(finished.released, vec![v("V1"), v("V2")]);

    let snapshot = h.tracker.snapshot().await;
    assert!(snapshot.assignments.is_empty());
    assert_eq!(snapshot.pool("Bronze").unwrap().available, vec![v("V1"), v("V2")]);
    assert_eq!(snapshot.pool("Silver").unwrap().available, vec![v("V3")]);
}

#[tokio::test]
async fn test_full_tournament_climbs_the_ladder() {
    let h = harness(
        8,
        &[("Bronze", 1), ("Silver", 1), ("Gold", 1)],
        &[
            ("bronze", &["B1", "B2", "B3", "B4"]),
            ("silver", &["S1", "S2"]),
            ("gold", &["G1"]),
        ],
    )
    .await;
    h.tracker.sync().await.unwrap();

    for match_id in 1..=7 {
        let matchup = h.bracket.open_matches().into_iter().find(|m| m.id == id(match_id)).unwrap();
        let report = h
            .tracker
            .report_result(matchup.id, &matchup.participant_a)
            .await
            .unwrap();
        assert!(report.exhausted.is_empty(), "match {match_id}: {report:?}");
    }

    let by_match: HashMap<MatchId, VenueId> = h
        .sink
        .announcements()
        .into_iter()
        .map(|announcement| (announcement.matchup.id, announcement.venue))
        .collect();
    assert_eq!(by_match.len(), 7);
    assert_eq!(by_match[&id(5)], v("S1"));
    assert_eq!(by_match[&id(6)], v("S2"));
    assert_eq!(by_match[&id(7)], v("G1"));

    // Every venue is back once the final is reported
    let snapshot = h.tracker.snapshot().await;
    assert!(snapshot.assignments.is_empty());
    for pool in &snapshot.pools {
        assert_eq!(pool.available, pool.all);
    }
    assert!(h.tracker.sync().await.unwrap().is_quiet());
}

#[tokio::test]
async fn test_bootstrap_rejects_venue_listed_under_two_categories() {
    let bracket = InMemoryBracket::single_elimination(helpers::teams(4));
    let sink = RecordingSink::new();

    let result = ProgressionTracker::bootstrap(
        TournamentId::new("spring-cup"),
        helpers::ladder(BRONZE_SILVER, 2),
        &directory(&[("bronze", &["V1", "V2"]), ("silver", &["V2"])]),
        environment(&bracket, &sink),
        config(),
    )
    .await;

    assert_eq!(
        result.unwrap_err(),
        EngineError::Configuration(ConfigurationError::DuplicateVenue {
            venue: v("V2"),
            first: "bronze".into(),
            second: "silver".into(),
        })
    );
}

#[tokio::test]
async fn test_bootstrap_enforces_minimum_venues() {
    let bracket = InMemoryBracket::single_elimination(helpers::teams(4));
    let sink = RecordingSink::new();
    let mut ladder_config = helpers::ladder_config(BRONZE_SILVER);
    ladder_config.tiers[0].min_venues = Some(2);

    let result = ProgressionTracker::bootstrap(
        TournamentId::new("spring-cup"),
        TierLadder::new(ladder_config, 2).unwrap(),
        &directory(&[("bronze", &["V1"]), ("silver", &["V2"])]),
        environment(&bracket, &sink),
        config(),
    )
    .await;

    assert_eq!(
        result.unwrap_err(),
        EngineError::Configuration(ConfigurationError::InsufficientVenues {
            tier: "Bronze".into(),
            required: 2,
            available: 1,
        })
    );
}

#[tokio::test]
async fn test_bootstrap_surfaces_directory_failure() {
    let bracket = InMemoryBracket::single_elimination(helpers::teams(4));
    let sink = RecordingSink::new();
    let directory = directory(&[("bronze", &["V1"]), ("silver", &["V2"])]);
    directory.fail_next(ProviderError::Rejected {
        reason: "forbidden".into(),
    });

    let result = ProgressionTracker::bootstrap(
        TournamentId::new("spring-cup"),
        helpers::ladder(BRONZE_SILVER, 2),
        &directory,
        environment(&bracket, &sink),
        config(),
    )
    .await;

    assert!(matches!(
        result,
        Err(EngineError::Provider {
            operation: "list_venues",
            match_id: None,
            ..
        })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reports_announce_each_match_once() {
    let h = harness(
        16,
        &[("Bronze", 1), ("Silver", 1), ("Gold", 1), ("Platinum", 1)],
        &[
            ("bronze", &["B1", "B2", "B3", "B4", "B5", "B6", "B7", "B8"]),
            ("silver", &["S1", "S2", "S3", "S4"]),
            ("gold", &["G1", "G2"]),
            ("platinum", &["P1"]),
        ],
    )
    .await;
    h.tracker.sync().await.unwrap();

    let tasks: Vec<_> = (1..=8u64)
        .map(|match_id| {
            let tracker = h.tracker.clone();
            let winner = team(usize::try_from(2 * match_id - 1).unwrap());
            tokio::spawn(async move { tracker.report_result(MatchId::new(match_id), &winner).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    // Reports that raced past each other may have seen a stale open list
    h.tracker.sync().await.unwrap();

    let mut per_match: HashMap<MatchId, usize> = HashMap::new();
    for announcement in h.sink.announcements() {
        *per_match.entry(announcement.matchup.id).or_default() += 1;
    }
    assert_eq!(per_match.len(), 12);
    assert!(per_match.values().all(|count| *count == 1), "{per_match:?}");

    let snapshot = h.tracker.snapshot().await;
    assert_eq!(snapshot.pool("Bronze").unwrap().available.len(), 8);
    assert!(snapshot.pool("Silver").unwrap().available.is_empty());
}
