//! Duplicate suppression for webhook events.
//!
//! The ledger is the one shared mutable resource in the pipeline. A reserve is
//! an atomic check-and-insert (DashMap shard lock via the `entry` API), never
//! a read-then-write pair, so two concurrent deliveries of the same
//! `(company_id, event_id)` can never both proceed to a storage write.
//!
//! In-flight duplicates fail fast with [`Reservation::AlreadyReserved`] rather
//! than waiting; callers retry once the first delivery settles.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Outcome of a reservation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// This caller owns the event; exactly one caller per key ever sees this.
    Reserved,
    /// A prior delivery completed; retries are idempotent successes.
    AlreadyProcessed { document_id: String },
    /// A prior delivery is still in flight.
    AlreadyReserved,
}

/// Lifecycle store for event reservations.
///
/// Kept behind a trait so the backing store (in-memory map, embedded database,
/// external cache) is swappable without touching the pipeline.
pub trait EventLedger: Send + Sync {
    /// Atomically claim `(company_id, event_id)`.
    fn reserve(&self, company_id: i64, event_id: &str) -> Reservation;

    /// Flip a pending reservation to processed, recording the document id
    /// that duplicate deliveries will be answered with.
    fn finalize(&self, company_id: i64, event_id: &str, document_id: &str);

    /// Drop a pending reservation after a mid-pipeline failure so a retry of
    /// the same event id can succeed. Processed events are never released.
    fn release(&self, company_id: i64, event_id: &str);

    /// Clear every event record for a tenant, re-enabling delivery of
    /// previously accepted event ids. Operator-only recovery; not exposed on
    /// the webhook HTTP surface. Returns the number of records removed.
    fn reset_company(&self, company_id: i64) -> usize;
}

#[derive(Debug, Clone)]
enum EventState {
    Pending,
    Processed { document_id: String },
}

/// In-memory [`EventLedger`] backed by a concurrent map.
///
/// The default backend for a single-node deployment; a multi-node setup would
/// swap in a ledger over a shared store with a unique-constrained insert.
#[derive(Debug, Default)]
pub struct MemoryEventLedger {
    events: DashMap<(i64, String), EventState>,
}

impl MemoryEventLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked events across all tenants.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventLedger for MemoryEventLedger {
    fn reserve(&self, company_id: i64, event_id: &str) -> Reservation {
        match self.events.entry((company_id, event_id.to_string())) {
            Entry::Vacant(slot) => {
                slot.insert(EventState::Pending);
                Reservation::Reserved
            }
            Entry::Occupied(entry) => match entry.get() {
                EventState::Pending => Reservation::AlreadyReserved,
                EventState::Processed { document_id } => Reservation::AlreadyProcessed {
                    document_id: document_id.clone(),
                },
            },
        }
    }

    fn finalize(&self, company_id: i64, event_id: &str, document_id: &str) {
        self.events.insert(
            (company_id, event_id.to_string()),
            EventState::Processed {
                document_id: document_id.to_string(),
            },
        );
    }

    fn release(&self, company_id: i64, event_id: &str) {
        self.events
            .remove_if(&(company_id, event_id.to_string()), |_, state| {
                matches!(state, EventState::Pending)
            });
    }

    fn reset_company(&self, company_id: i64) -> usize {
        let before = self.events.len();
        self.events.retain(|(owner, _), _| *owner != company_id);
        before - self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn reserve_then_finalize_then_duplicate() {
        let ledger = MemoryEventLedger::new();
        assert_eq!(ledger.reserve(1, "evt-1"), Reservation::Reserved);
        assert_eq!(ledger.reserve(1, "evt-1"), Reservation::AlreadyReserved);

        ledger.finalize(1, "evt-1", "doc-123");
        assert_eq!(
            ledger.reserve(1, "evt-1"),
            Reservation::AlreadyProcessed {
                document_id: "doc-123".into()
            }
        );
    }

    #[test]
    fn events_are_scoped_per_company() {
        let ledger = MemoryEventLedger::new();
        assert_eq!(ledger.reserve(1, "evt-1"), Reservation::Reserved);
        assert_eq!(ledger.reserve(2, "evt-1"), Reservation::Reserved);
    }

    #[test]
    fn release_reopens_a_pending_event() {
        let ledger = MemoryEventLedger::new();
        assert_eq!(ledger.reserve(1, "evt-1"), Reservation::Reserved);
        ledger.release(1, "evt-1");
        assert_eq!(ledger.reserve(1, "evt-1"), Reservation::Reserved);
    }

    #[test]
    fn release_never_drops_a_processed_event() {
        let ledger = MemoryEventLedger::new();
        assert_eq!(ledger.reserve(1, "evt-1"), Reservation::Reserved);
        ledger.finalize(1, "evt-1", "doc-123");
        ledger.release(1, "evt-1");
        assert!(matches!(
            ledger.reserve(1, "evt-1"),
            Reservation::AlreadyProcessed { .. }
        ));
    }

    #[test]
    fn reset_company_only_touches_that_tenant() {
        let ledger = MemoryEventLedger::new();
        ledger.reserve(1, "evt-1");
        ledger.finalize(1, "evt-1", "doc-1");
        ledger.reserve(1, "evt-2");
        ledger.finalize(1, "evt-2", "doc-2");
        ledger.reserve(2, "evt-1");
        ledger.finalize(2, "evt-1", "doc-3");

        assert_eq!(ledger.reset_company(1), 2);
        assert_eq!(ledger.reserve(1, "evt-1"), Reservation::Reserved);
        assert!(matches!(
            ledger.reserve(2, "evt-1"),
            Reservation::AlreadyProcessed { .. }
        ));
    }

    #[test]
    fn exactly_one_concurrent_caller_wins() {
        let ledger = Arc::new(MemoryEventLedger::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.reserve(1, "evt-race"))
            })
            .collect();

        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = outcomes
            .iter()
            .filter(|o| **o == Reservation::Reserved)
            .count();
        assert_eq!(winners, 1, "exactly one caller must win the reservation");
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, Reservation::Reserved | Reservation::AlreadyReserved)));
    }
}
