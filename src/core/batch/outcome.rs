//! Terminal results of batch operations

use super::batch::UnprocessedSet;
use super::item::{ItemRef, Record};
use serde::Serialize;

/// How a retrying operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Nothing left to submit
    Completed,
    /// Attempts ran out with items still unprocessed
    RetryBudgetExceeded,
    /// The caller cancelled or the deadline passed
    Cancelled,
}

/// Terminal result of a retrying write or delete submission
///
/// `remaining` lists exactly the items that are not known to have landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub succeeded: bool,
    pub status: OutcomeStatus,
    pub remaining: UnprocessedSet,
    pub attempts_used: u32,
    pub total_items: usize,
}

impl Outcome {
    pub fn completed(attempts_used: u32, total_items: usize) -> Self {
        Self {
            succeeded: true,
            status: OutcomeStatus::Completed,
            remaining: UnprocessedSet::empty(),
            attempts_used,
            total_items,
        }
    }

    pub fn exhausted(remaining: UnprocessedSet, attempts_used: u32, total_items: usize) -> Self {
        Self {
            succeeded: false,
            status: OutcomeStatus::RetryBudgetExceeded,
            remaining,
            attempts_used,
            total_items,
        }
    }

    /// Cancellation never hides progress: an already empty remainder still
    /// reports success.
    pub fn cancelled(remaining: UnprocessedSet, attempts_used: u32, total_items: usize) -> Self {
        Self {
            succeeded: remaining.is_empty(),
            status: OutcomeStatus::Cancelled,
            remaining,
            attempts_used,
            total_items,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OutcomeStatus::Cancelled
    }

    pub fn is_retry_budget_exceeded(&self) -> bool {
        self.status == OutcomeStatus::RetryBudgetExceeded
    }

    /// Number of items known to have been persisted
    pub fn persisted_count(&self) -> usize {
        self.total_items.saturating_sub(self.remaining.len())
    }
}

/// Result of a batch read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchGetResult {
    pub found: Vec<Record>,
    /// Keys the store reported as absent
    pub missing: Vec<ItemRef>,
    /// Keys the store never answered for within the retry budget
    pub unprocessed: Vec<ItemRef>,
    pub status: OutcomeStatus,
    pub attempts_used: u32,
}

impl BatchGetResult {
    pub fn is_complete(&self) -> bool {
        self.unprocessed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::item::{AttributeMap, AttributeValue, ItemKey, WriteItem};

    #[test]
    fn test_completed_outcome() {
        let outcome = Outcome::completed(2, 10);
        assert!(outcome.succeeded);
        assert!(outcome.remaining.is_empty());
        assert_eq!(outcome.persisted_count(), 10);
        assert!(!outcome.is_cancelled());
    }

    #[test]
    fn test_exhausted_outcome_keeps_remaining() {
        let item = WriteItem::new(
            "products",
            ItemKey::hash("id", AttributeValue::string("p1")),
            AttributeMap::new(),
        );
        let remaining = UnprocessedSet::from_ops(vec![item.into()]);
        let outcome = Outcome::exhausted(remaining, 5, 4);

        assert!(!outcome.succeeded);
        assert!(outcome.is_retry_budget_exceeded());
        assert_eq!(outcome.persisted_count(), 3);
    }

    #[test]
    fn test_cancelled_with_nothing_left_is_success() {
        let outcome = Outcome::cancelled(UnprocessedSet::empty(), 1, 3);
        assert!(outcome.succeeded);
        assert!(outcome.is_cancelled());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&OutcomeStatus::RetryBudgetExceeded).unwrap();
        assert_eq!(json, r#""retry_budget_exceeded""#);
    }
}
