//! Review session controller.
//!
//! A session walks one owner through a bounded batch of due cards. Each card
//! moves `Queued -> Presenting -> Revealed -> Graded -> Done`. Callers only
//! observe `Presenting` and `Revealed`: a queued card becomes current already
//! presented, and a committed grade advances to the next card. Only grading
//! writes to the store, and each grade is written exactly once, conditioned on
//! the version captured when the batch was fetched.
//!
//! The session holds no locks while waiting for the user, so it can sit on a
//! card indefinitely. A stale session simply gets `ConcurrentModification`
//! when it finally writes.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{Result, ReviewError};
use crate::scheduler::{Doubling, SchedulingAlgorithm};
use crate::store::CardStore;
use crate::types::{Card, Grade, OwnerId};

/// Batch size used when the caller does not ask for one.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Where a card is within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardPhase {
    Queued,
    Presenting,
    Revealed,
    Graded,
    Done,
}

impl CardPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Presenting => "presenting",
            Self::Revealed => "revealed",
            Self::Graded => "graded",
            Self::Done => "done",
        }
    }
}

/// Tally of what happened to the cards of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub graded: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub abandoned: usize,
}

/// One review sitting for one owner.
pub struct ReviewSession {
    store: Arc<dyn CardStore>,
    clock: Arc<dyn Clock>,
    algorithm: Box<dyn SchedulingAlgorithm>,
    owner: OwnerId,
    queue: VecDeque<Card>,
    current: Option<Card>,
    phase: CardPhase,
    summary: SessionSummary,
}

impl ReviewSession {
    /// Fetch up to `limit` due cards (0 means `DEFAULT_BATCH_SIZE`) and
    /// present the first one.
    pub async fn start(
        store: Arc<dyn CardStore>,
        clock: Arc<dyn Clock>,
        owner: OwnerId,
        limit: usize,
    ) -> Result<Self> {
        Self::start_with_algorithm(store, clock, Box::new(Doubling), owner, limit).await
    }

    /// Like `start`, scheduling grades with `algorithm`.
    pub async fn start_with_algorithm(
        store: Arc<dyn CardStore>,
        clock: Arc<dyn Clock>,
        algorithm: Box<dyn SchedulingAlgorithm>,
        owner: OwnerId,
        limit: usize,
    ) -> Result<Self> {
        let limit = if limit == 0 { DEFAULT_BATCH_SIZE } else { limit };
        let now = clock.now();
        let cards = store.query_due(owner, now, limit).await?;
        debug!(%owner, queued = cards.len(), limit, "review session started");

        let mut session = Self {
            store,
            clock,
            algorithm,
            owner,
            queue: cards.into(),
            current: None,
            phase: CardPhase::Queued,
            summary: SessionSummary::default(),
        };
        session.advance();
        Ok(session)
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// The card being reviewed, if any.
    pub fn current(&self) -> Option<&Card> {
        self.current.as_ref()
    }

    /// Phase of the current card, or `None` once the queue is exhausted.
    pub fn phase(&self) -> Option<CardPhase> {
        self.current.as_ref().map(|_| self.phase)
    }

    /// Cards not yet graded or skipped, including the current one.
    pub fn remaining(&self) -> usize {
        self.queue.len() + usize::from(self.current.is_some())
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_none()
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary.clone()
    }

    /// Show the back of the current card.
    pub fn reveal(&mut self) -> Result<&Card> {
        self.require("reveal", &[CardPhase::Presenting])?;
        self.phase = CardPhase::Revealed;
        self.current_card("reveal")
    }

    /// Grade the revealed card, write it back and move on.
    ///
    /// On failure the card stays revealed so the caller can retry, refresh or
    /// skip it. Nothing is retried here.
    pub async fn grade_current(&mut self, success: bool) -> Result<Card> {
        self.require("grade", &[CardPhase::Revealed])?;
        let card = self.current_card("grade")?.clone();

        let now = self.clock.now();
        let next = self
            .algorithm
            .schedule(&card, Grade::from_success(success), now)?;

        let stored = match self.store.compare_and_swap(card.id, card.version, next).await {
            Ok(stored) => stored,
            Err(err) => {
                let err = ReviewError::from(err);
                warn!(
                    card_id = %card.id,
                    version = card.version,
                    error = %err,
                    "grade not written"
                );
                return Err(err);
            }
        };

        self.summary.graded += 1;
        if success {
            self.summary.succeeded += 1;
        }
        debug!(
            card_id = %stored.id,
            success,
            difficulty = stored.difficulty,
            version = stored.version,
            "grade committed"
        );

        self.advance();
        Ok(stored)
    }

    /// Drop the current card without writing anything.
    pub fn skip_current(&mut self) -> Result<()> {
        self.require("skip", &[CardPhase::Presenting, CardPhase::Revealed])?;
        if let Some(card) = &self.current {
            debug!(card_id = %card.id, "card skipped");
        }
        self.summary.skipped += 1;
        self.advance();
        Ok(())
    }

    /// Re-read the current card from the store, typically after a
    /// `ConcurrentModification`, and present it again.
    pub async fn refresh_current(&mut self) -> Result<&Card> {
        self.require("refresh", &[CardPhase::Presenting, CardPhase::Revealed])?;
        let id = self.current_card("refresh")?.id;
        let fresh = self.store.get(self.owner, id).await?;
        self.current = Some(fresh);
        self.phase = CardPhase::Presenting;
        self.current_card("refresh")
    }

    /// End the session. Ungraded cards are discarded; committed grades stay.
    pub fn abandon(&mut self) -> SessionSummary {
        self.summary.abandoned += self.remaining();
        debug!(owner = %self.owner, abandoned = self.summary.abandoned, "review session abandoned");
        self.queue.clear();
        self.current = None;
        self.phase = CardPhase::Done;
        self.summary()
    }

    fn advance(&mut self) {
        self.current = self.queue.pop_front();
        self.phase = match self.current {
            Some(_) => CardPhase::Presenting,
            None => CardPhase::Done,
        };
    }

    fn require(&self, operation: &'static str, allowed: &[CardPhase]) -> Result<()> {
        match self.phase() {
            Some(phase) if allowed.contains(&phase) => Ok(()),
            Some(phase) => Err(ReviewError::InvalidTransition {
                operation,
                phase: phase.as_str(),
            }),
            None => Err(ReviewError::InvalidTransition {
                operation,
                phase: "finished",
            }),
        }
    }

    fn current_card(&self, operation: &'static str) -> Result<&Card> {
        self.current.as_ref().ok_or(ReviewError::InvalidTransition {
            operation,
            phase: "finished",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{MemoryCardStore, StoreResult};
    use crate::types::{CardId, NewCard};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Memory store that counts writes.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryCardStore,
        writes: AtomicUsize,
    }

    impl CountingStore {
        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CardStore for CountingStore {
        async fn create(&self, new: NewCard) -> StoreResult<Card> {
            self.inner.create(new).await
        }

        async fn get(&self, owner: OwnerId, id: CardId) -> StoreResult<Card> {
            self.inner.get(owner, id).await
        }

        async fn query_due(
            &self,
            owner: OwnerId,
            now: DateTime<Utc>,
            limit: usize,
        ) -> StoreResult<Vec<Card>> {
            self.inner.query_due(owner, now, limit).await
        }

        async fn count_due(&self, owner: OwnerId, now: DateTime<Utc>) -> StoreResult<usize> {
            self.inner.count_due(owner, now).await
        }

        async fn compare_and_swap(
            &self,
            id: CardId,
            expected_version: u64,
            card: Card,
        ) -> StoreResult<Card> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.compare_and_swap(id, expected_version, card).await
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    struct Fixture {
        store: Arc<CountingStore>,
        clock: Arc<ManualClock>,
        owner: OwnerId,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(CountingStore::default()),
                clock: Arc::new(ManualClock::new(t0())),
                owner: Uuid::new_v4(),
            }
        }

        async fn add_cards(&self, n: usize) -> Vec<Card> {
            let mut cards = Vec::with_capacity(n);
            for i in 0..n {
                let card = self
                    .store
                    .create(NewCard {
                        owner: self.owner,
                        front: format!("question {i}"),
                        back: format!("answer {i}"),
                        path_id: None,
                        tags: Vec::new(),
                    })
                    .await
                    .unwrap();
                cards.push(card);
            }
            cards
        }

        async fn session(&self, limit: usize) -> ReviewSession {
            ReviewSession::start(self.store.clone(), self.clock.clone(), self.owner, limit)
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn empty_queue_finishes_immediately() {
        let fx = Fixture::new();
        let session = fx.session(10).await;
        assert!(session.is_finished());
        assert_eq!(session.phase(), None);
        assert_eq!(session.remaining(), 0);
    }

    #[tokio::test]
    async fn first_card_is_presented() {
        let fx = Fixture::new();
        fx.add_cards(3).await;
        let session = fx.session(10).await;
        assert_eq!(session.phase(), Some(CardPhase::Presenting));
        assert_eq!(session.remaining(), 3);
        assert!(session.current().is_some());
    }

    #[tokio::test]
    async fn committed_grade_presents_next_card() {
        let fx = Fixture::new();
        fx.add_cards(2).await;
        let mut session = fx.session(10).await;

        let mut seen = vec![session.phase()];
        session.reveal().unwrap();
        seen.push(session.phase());
        session.grade_current(true).await.unwrap();
        seen.push(session.phase());
        session.reveal().unwrap();
        session.grade_current(false).await.unwrap();
        seen.push(session.phase());

        assert_eq!(
            seen,
            vec![
                Some(CardPhase::Presenting),
                Some(CardPhase::Revealed),
                Some(CardPhase::Presenting),
                None,
            ]
        );
    }

    #[tokio::test]
    async fn batch_is_bounded_by_limit() {
        let fx = Fixture::new();
        fx.add_cards(30).await;
        assert_eq!(fx.session(5).await.remaining(), 5);
        assert_eq!(fx.session(0).await.remaining(), DEFAULT_BATCH_SIZE);
    }

    #[tokio::test]
    async fn grading_before_reveal_is_rejected() {
        let fx = Fixture::new();
        fx.add_cards(1).await;
        let mut session = fx.session(10).await;

        let err = session.grade_current(true).await.unwrap_err();
        assert_eq!(
            err,
            ReviewError::InvalidTransition {
                operation: "grade",
                phase: "presenting"
            }
        );
        assert_eq!(fx.store.writes(), 0);
    }

    #[tokio::test]
    async fn reveal_twice_is_rejected() {
        let fx = Fixture::new();
        fx.add_cards(1).await;
        let mut session = fx.session(10).await;
        session.reveal().unwrap();
        assert!(matches!(
            session.reveal(),
            Err(ReviewError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn operations_after_finish_are_rejected() {
        let fx = Fixture::new();
        let mut session = fx.session(10).await;
        assert_eq!(
            session.reveal().unwrap_err(),
            ReviewError::InvalidTransition {
                operation: "reveal",
                phase: "finished"
            }
        );
        assert!(session.grade_current(true).await.is_err());
        assert!(session.skip_current().is_err());
    }

    #[tokio::test]
    async fn each_grade_writes_once_and_advances() {
        let fx = Fixture::new();
        fx.add_cards(3).await;
        let mut session = fx.session(10).await;

        for expected_writes in 1..=3 {
            session.reveal().unwrap();
            let stored = session.grade_current(expected_writes != 2).await.unwrap();
            assert_eq!(stored.version, 2);
            assert_eq!(fx.store.writes(), expected_writes);
        }

        assert!(session.is_finished());
        assert_eq!(
            session.summary(),
            SessionSummary {
                graded: 3,
                succeeded: 2,
                skipped: 0,
                abandoned: 0
            }
        );
    }

    #[tokio::test]
    async fn graded_card_is_rescheduled() {
        let fx = Fixture::new();
        let cards = fx.add_cards(1).await;
        let mut session = fx.session(10).await;
        session.reveal().unwrap();
        session.grade_current(false).await.unwrap();

        let stored = fx.store.get(fx.owner, cards[0].id).await.unwrap();
        assert_eq!(stored.difficulty, 2);
        assert_eq!(stored.next_due, Some(t0() + Duration::days(4)));
        assert_eq!(stored.last_reviewed, Some(t0()));
        assert_eq!(fx.store.count_due(fx.owner, t0()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn fail_fail_success_across_sessions() {
        let fx = Fixture::new();
        let cards = fx.add_cards(1).await;
        let id = cards[0].id;

        let mut session = fx.session(10).await;
        session.reveal().unwrap();
        session.grade_current(false).await.unwrap();

        let t1 = t0() + Duration::days(4);
        fx.clock.set(t1);
        let mut session = fx.session(10).await;
        session.reveal().unwrap();
        let second = session.grade_current(false).await.unwrap();
        assert_eq!(second.difficulty, 3);
        assert_eq!(second.next_due, Some(t1 + Duration::days(8)));

        let t2 = t1 + Duration::days(8);
        fx.clock.set(t2);
        let mut session = fx.session(10).await;
        assert_eq!(session.current().map(|c| c.id), Some(id));
        session.reveal().unwrap();
        let third = session.grade_current(true).await.unwrap();
        assert_eq!(third.difficulty, 2);
        assert_eq!(third.next_due, Some(t2 + Duration::days(4)));
        assert_eq!(third.review_count, 3);
        assert_eq!(third.success_count, 1);
    }

    #[tokio::test]
    async fn concurrent_sessions_conflict() {
        let fx = Fixture::new();
        let cards = fx.add_cards(1).await;
        let mut one = fx.session(10).await;
        let mut two = fx.session(10).await;

        one.reveal().unwrap();
        two.reveal().unwrap();
        let committed = one.grade_current(true).await.unwrap();
        assert_eq!(committed.version, 2);

        let err = two.grade_current(false).await.unwrap_err();
        assert_eq!(
            err,
            ReviewError::ConcurrentModification {
                id: cards[0].id,
                expected: 1
            }
        );
        assert_eq!(two.phase(), Some(CardPhase::Revealed));
        assert_eq!(fx.store.get(fx.owner, cards[0].id).await.unwrap(), committed);
    }

    #[tokio::test]
    async fn refresh_after_conflict_allows_regrade() {
        let fx = Fixture::new();
        fx.add_cards(1).await;
        let mut one = fx.session(10).await;
        let mut two = fx.session(10).await;

        one.reveal().unwrap();
        one.grade_current(true).await.unwrap();

        two.reveal().unwrap();
        assert!(two.grade_current(false).await.is_err());

        let fresh = two.refresh_current().await.unwrap();
        assert_eq!(fresh.version, 2);
        assert_eq!(two.phase(), Some(CardPhase::Presenting));

        two.reveal().unwrap();
        let stored = two.grade_current(false).await.unwrap();
        assert_eq!(stored.version, 3);
        assert_eq!(stored.review_count, 2);
    }

    #[tokio::test]
    async fn skip_moves_on_without_writing() {
        let fx = Fixture::new();
        fx.add_cards(2).await;
        let mut session = fx.session(10).await;

        let first = session.current().unwrap().id;
        session.skip_current().unwrap();
        assert_ne!(session.current().map(|c| c.id), Some(first));
        assert_eq!(session.remaining(), 1);
        assert_eq!(fx.store.writes(), 0);
        assert_eq!(session.summary().skipped, 1);
    }

    #[tokio::test]
    async fn abandon_discards_in_flight_cards() {
        let fx = Fixture::new();
        fx.add_cards(3).await;
        let mut session = fx.session(10).await;

        session.reveal().unwrap();
        session.grade_current(true).await.unwrap();
        session.reveal().unwrap();

        let summary = session.abandon();
        assert_eq!(summary.graded, 1);
        assert_eq!(summary.abandoned, 2);
        assert_eq!(fx.store.writes(), 1);
        assert!(session.is_finished());
        assert!(session.grade_current(true).await.is_err());

        let untouched: Vec<_> = fx
            .store
            .query_due(fx.owner, t0(), 10)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.version)
            .collect();
        assert_eq!(untouched, vec![1, 1]);
    }

    #[tokio::test]
    async fn invalid_card_surfaces_invalid_state() {
        let fx = Fixture::new();
        let mut card = fx.add_cards(1).await.remove(0);
        card.success_count = 4;
        fx.store.inner.insert(card);

        let mut session = fx.session(10).await;
        session.reveal().unwrap();
        let err = session.grade_current(true).await.unwrap_err();
        assert!(matches!(err, ReviewError::InvalidState(_)));
        assert_eq!(fx.store.writes(), 0);
    }

    #[tokio::test]
    async fn missing_card_on_refresh_is_not_found() {
        let fx = Fixture::new();
        let cards = fx.add_cards(1).await;
        let mut session = fx.session(10).await;

        // Another device deleted the card after the batch was fetched.
        session.store = Arc::new(MemoryCardStore::new()) as Arc<dyn CardStore>;

        let err = session.refresh_current().await.unwrap_err();
        assert_eq!(err, ReviewError::NotFound(cards[0].id));
        assert_eq!(session.phase(), Some(CardPhase::Presenting));
    }
}
