//! Acceptance ledger: the single durable transition a suggestion can make.

use crate::model::PairKey;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Records which lab pairs have an accepted collaboration.
///
/// Acceptance is a durable decision, independent of future score drift: a pair
/// stays accepted even if the labs' focus areas later diverge below the
/// suggestion threshold.
#[derive(Debug, Default)]
pub struct CollaborationLedger {
    accepted: DashMap<PairKey, DateTime<Utc>>,
}

impl CollaborationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a pair. Idempotent: accepting an already-accepted pair is a
    /// no-op, not an error. Returns whether this call changed anything.
    pub fn accept(&self, first: &str, second: &str) -> bool {
        let key = PairKey::new(first, second);
        let mut newly_accepted = false;
        self.accepted.entry(key).or_insert_with(|| {
            newly_accepted = true;
            Utc::now()
        });
        if newly_accepted {
            tracing::debug!(lab_a = first, lab_b = second, "Collaboration accepted");
        }
        newly_accepted
    }

    pub fn is_accepted(&self, key: &PairKey) -> bool {
        self.accepted.contains_key(key)
    }

    pub fn accepted_at(&self, key: &PairKey) -> Option<DateTime<Utc>> {
        self.accepted.get(key).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_is_idempotent() {
        let ledger = CollaborationLedger::new();
        assert!(ledger.accept("lab-a", "lab-b"));
        let first_accept = ledger.accepted_at(&PairKey::new("lab-a", "lab-b")).unwrap();

        // Second accept is a no-op, not an error, and keeps the original time.
        assert!(!ledger.accept("lab-a", "lab-b"));
        assert_eq!(
            ledger.accepted_at(&PairKey::new("lab-a", "lab-b")).unwrap(),
            first_accept
        );
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn accept_is_order_independent() {
        let ledger = CollaborationLedger::new();
        assert!(ledger.accept("lab-b", "lab-a"));
        assert!(!ledger.accept("lab-a", "lab-b"));
        assert!(ledger.is_accepted(&PairKey::new("lab-a", "lab-b")));
        assert_eq!(ledger.len(), 1);
    }
}
