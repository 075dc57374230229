//! In-memory single-elimination bracket.
//!
//! Match ids are assigned round by round starting at 1: an 8-team bracket has matches
//! 1-4 in round 0, 5-6 in round 1 and 7 in round 2. The winner of the `i`-th match of a
//! round plays in match `i / 2` of the next round, on side `a` if `i` is even.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use venue_ladder_core::{
    BracketProvider, Match, MatchId, MatchState, ParticipantId, ProviderError, ProviderFuture,
    TournamentId, TournamentState,
};

#[derive(Clone, Debug)]
struct Slot {
    round: u32,
    a: Option<ParticipantId>,
    b: Option<ParticipantId>,
    winner: Option<ParticipantId>,
}

impl Slot {
    fn state(&self) -> MatchState {
        match (&self.a, &self.b, &self.winner) {
            (_, _, Some(_)) => MatchState::Complete,
            (Some(_), Some(_), None) => MatchState::Open,
            _ => MatchState::Pending,
        }
    }
}

#[derive(Debug)]
struct Inner {
    status: TournamentState,
    slots: Vec<Slot>,
    round_starts: Vec<usize>,
    failures: HashMap<&'static str, VecDeque<ProviderError>>,
    calls: HashMap<&'static str, usize>,
    delay: Option<Duration>,
}

/// Bracket provider backed by an in-memory single-elimination bracket.
///
/// Reports are idempotent: reporting the recorded winner again succeeds, a different
/// winner is rejected. Failures and latency can be injected per operation.
///
/// # Example
///
/// ```
/// use venue_ladder_core::{BracketProvider, MatchId, TournamentId};
/// use venue_ladder_testing::InMemoryBracket;
///
/// # tokio_test::block_on(async {
/// let bracket = InMemoryBracket::single_elimination(["A", "B", "C", "D"]);
/// let tournament = TournamentId::new("cup");
///
/// assert_eq!(bracket.list_open_matches(&tournament).await.unwrap().len(), 2);
/// bracket.report_result(&tournament, MatchId::new(1), &"A".into()).await.unwrap();
/// bracket.report_result(&tournament, MatchId::new(2), &"D".into()).await.unwrap();
///
/// let final_match = bracket.get_match(&tournament, MatchId::new(3)).await.unwrap();
/// assert_eq!(final_match.participant_a.as_str(), "A");
/// assert_eq!(final_match.participant_b.as_str(), "D");
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryBracket {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryBracket {
    /// Running bracket seeded in the given order (1 vs 2, 3 vs 4, ...).
    ///
    /// # Panics
    ///
    /// Panics unless the participant count is a power of two, at least 2.
    #[must_use]
    pub fn single_elimination<I, P>(participants: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ParticipantId>,
    {
        let seeds: Vec<ParticipantId> = participants.into_iter().map(Into::into).collect();
        assert!(
            seeds.len() >= 2 && seeds.len().is_power_of_two(),
            "bracket needs a power-of-two field, got {}",
            seeds.len()
        );

        let mut slots = Vec::new();
        let mut round_starts = Vec::new();
        let mut width = seeds.len() / 2;
        let mut round = 0;
        while width > 0 {
            round_starts.push(slots.len());
            for _ in 0..width {
                slots.push(Slot {
                    round,
                    a: None,
                    b: None,
                    winner: None,
                });
            }
            width /= 2;
            round += 1;
        }
        for (index, pair) in seeds.chunks(2).enumerate() {
            slots[index].a = Some(pair[0].clone());
            slots[index].b = Some(pair[1].clone());
        }

        Self {
            inner: Arc::new(Mutex::new(Inner {
                status: TournamentState::Running,
                slots,
                round_starts,
                failures: HashMap::new(),
                calls: HashMap::new(),
                delay: None,
            })),
        }
    }

    /// Number of rounds
    #[must_use]
    pub fn rounds(&self) -> u32 {
        u32::try_from(self.inner.lock().unwrap().round_starts.len()).unwrap()
    }

    /// Override the tournament state
    pub fn set_status(&self, status: TournamentState) {
        self.inner.lock().unwrap().status = status;
    }

    /// Make the next call to `operation` fail with `error`
    pub fn fail_next(&self, operation: &'static str, error: ProviderError) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Delay every call by `delay`
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.inner.lock().unwrap().delay = delay;
    }

    /// How many times `operation` was called, failed calls included
    #[must_use]
    pub fn calls(&self, operation: &str) -> usize {
        self.inner.lock().unwrap().calls.get(operation).copied().unwrap_or(0)
    }

    /// Recorded winner of `match_id`
    #[must_use]
    pub fn winner_of(&self, match_id: MatchId) -> Option<ParticipantId> {
        let inner = self.inner.lock().unwrap();
        Self::slot_index(match_id).and_then(|index| inner.slots.get(index)?.winner.clone())
    }

    /// Every open match, in id order
    #[must_use]
    pub fn open_matches(&self) -> Vec<Match> {
        let inner = self.inner.lock().unwrap();
        inner
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state() == MatchState::Open)
            .map(|(index, slot)| Self::to_match(index, slot))
            .collect()
    }

    fn slot_index(match_id: MatchId) -> Option<usize> {
        usize::try_from(match_id.value()).ok()?.checked_sub(1)
    }

    fn to_match(index: usize, slot: &Slot) -> Match {
        let tbd = || ParticipantId::new("TBD");
        Match {
            id: MatchId::new(u64::try_from(index).unwrap() + 1),
            round_index: slot.round,
            participant_a: slot.a.clone().unwrap_or_else(tbd),
            participant_b: slot.b.clone().unwrap_or_else(tbd),
            state: slot.state(),
        }
    }

    /// Count the call, then either pop an injected failure or pass.
    fn enter(&self, operation: &'static str) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        *inner.calls.entry(operation).or_default() += 1;
        match inner.failures.get_mut(operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn pause(&self) {
        let delay = self.inner.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn record(&self, match_id: MatchId, winner: &ParticipantId) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        let index = Self::slot_index(match_id)
            .filter(|index| *index < inner.slots.len())
            .ok_or(ProviderError::MatchNotFound { match_id })?;

        let slot = &inner.slots[index];
        if let Some(existing) = &slot.winner {
            return if existing == winner {
                Ok(())
            } else {
                Err(ProviderError::Rejected {
                    reason: format!("match {match_id} already won by {existing}"),
                })
            };
        }
        if slot.state() != MatchState::Open {
            return Err(ProviderError::Rejected {
                reason: format!("match {match_id} is not open"),
            });
        }
        if slot.a.as_ref() != Some(winner) && slot.b.as_ref() != Some(winner) {
            return Err(ProviderError::Rejected {
                reason: format!("{winner} does not play in match {match_id}"),
            });
        }

        let round = usize::try_from(slot.round).unwrap();
        inner.slots[index].winner = Some(winner.clone());

        match inner.round_starts.get(round + 1).copied() {
            Some(next_start) => {
                let position = index - inner.round_starts[round];
                let parent = &mut inner.slots[next_start + position / 2];
                if position % 2 == 0 {
                    parent.a = Some(winner.clone());
                } else {
                    parent.b = Some(winner.clone());
                }
            }
            None => inner.status = TournamentState::Finished,
        }
        Ok(())
    }
}

impl BracketProvider for InMemoryBracket {
    fn list_open_matches<'a>(&'a self, _tournament: &'a TournamentId) -> ProviderFuture<'a, Vec<Match>> {
        Box::pin(async move {
            self.pause().await;
            self.enter("list_open_matches")?;
            Ok(self.open_matches())
        })
    }

    fn report_result<'a>(
        &'a self,
        _tournament: &'a TournamentId,
        match_id: MatchId,
        winner: &'a ParticipantId,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            self.pause().await;
            self.enter("report_result")?;
            self.record(match_id, winner)
        })
    }

    fn get_tournament_state<'a>(&'a self, _tournament: &'a TournamentId) -> ProviderFuture<'a, TournamentState> {
        Box::pin(async move {
            self.pause().await;
            self.enter("get_tournament_state")?;
            Ok(self.inner.lock().unwrap().status)
        })
    }

    fn get_match<'a>(&'a self, _tournament: &'a TournamentId, match_id: MatchId) -> ProviderFuture<'a, Match> {
        Box::pin(async move {
            self.pause().await;
            self.enter("get_match")?;
            let inner = self.inner.lock().unwrap();
            Self::slot_index(match_id)
                .and_then(|index| inner.slots.get(index).map(|slot| Self::to_match(index, slot)))
                .ok_or(ProviderError::MatchNotFound { match_id })
        })
    }
}
