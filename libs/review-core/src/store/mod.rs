//! Card persistence contract.
//!
//! Every write is conditioned on the version the writer last read
//! (compare-and-swap), so two devices grading the same card cannot silently
//! overwrite each other.

pub mod memory;

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::types::{Card, CardId, NewCard, OwnerId};

pub use memory::MemoryCardStore;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistent card storage.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Insert a new card in its creation state.
    async fn create(&self, new: NewCard) -> StoreResult<Card>;

    /// Fetch a card. Cards owned by someone else are reported as `NotFound`.
    async fn get(&self, owner: OwnerId, id: CardId) -> StoreResult<Card>;

    /// Up to `limit` cards of `owner` that are due at `now`, in `due_order`.
    async fn query_due(
        &self,
        owner: OwnerId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Card>>;

    /// Number of cards of `owner` due at `now`.
    async fn count_due(&self, owner: OwnerId, now: DateTime<Utc>) -> StoreResult<usize>;

    /// Replace the card if its stored version still equals `expected_version`.
    ///
    /// On success the stored version is `expected_version + 1` and the stored
    /// card is returned. A stale version leaves the stored card untouched.
    async fn compare_and_swap(
        &self,
        id: CardId,
        expected_version: u64,
        card: Card,
    ) -> StoreResult<Card>;
}

/// Queue order for due cards: never-scheduled cards first, then the longest
/// overdue, ties broken by id.
pub fn due_order(a: &Card, b: &Card) -> Ordering {
    let by_due = match (a.next_due, b.next_due) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    };
    by_due.then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn card_due(next_due: Option<DateTime<Utc>>) -> Card {
        let mut card = Card::create(
            Uuid::new_v4(),
            NewCard {
                owner: Uuid::nil(),
                front: "q".to_string(),
                back: "a".to_string(),
                path_id: None,
                tags: Vec::new(),
            },
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
        card.next_due = next_due;
        card
    }

    #[test]
    fn never_scheduled_sorts_first() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let never = card_due(None);
        let overdue = card_due(Some(t0 - Duration::days(2)));
        assert_eq!(due_order(&never, &overdue), Ordering::Less);
        assert_eq!(due_order(&overdue, &never), Ordering::Greater);
    }

    #[test]
    fn ties_broken_by_id() {
        let mut a = card_due(None);
        let mut b = card_due(None);
        a.id = Uuid::from_u128(1);
        b.id = Uuid::from_u128(2);
        assert_eq!(due_order(&a, &b), Ordering::Less);
    }
}
