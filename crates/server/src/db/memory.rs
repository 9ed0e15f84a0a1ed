//! In-memory leave store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use leavedesk_core::{DateRange, Leave, LeaveId, SourceRef};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LeaveStore, LeaveTransaction, RepositoryError};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: i64,
    leaves: BTreeMap<LeaveId, Leave>,
    sources: HashMap<SourceRef, LeaveId>,
}

/// Leave store kept in process memory.
///
/// A transaction holds the store's lock from `begin` until it commits or is
/// dropped, so transactions run one at a time. Writes are staged on a copy
/// and only replace the shared state on commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryLeaveStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLeaveStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored leaves.
    pub async fn len(&self) -> usize {
        self.state.lock().await.leaves.len()
    }

    /// Returns true when no leave is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All stored leaves, ordered by ID.
    pub async fn all(&self) -> Vec<Leave> {
        self.state.lock().await.leaves.values().cloned().collect()
    }
}

#[async_trait]
impl LeaveStore for MemoryLeaveStore {
    async fn begin(&self) -> Result<Box<dyn LeaveTransaction>, RepositoryError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }

    async fn find_by_id(&self, id: LeaveId) -> Result<Option<Leave>, RepositoryError> {
        Ok(self.state.lock().await.leaves.get(&id).cloned())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl LeaveTransaction for MemoryTransaction {
    async fn lock_user(&mut self, _user_id: &str) -> Result<(), RepositoryError> {
        // The whole store is already held.
        Ok(())
    }

    async fn save(&mut self, mut leave: Leave) -> Result<Leave, RepositoryError> {
        let id = match leave.id {
            Some(id) if self.staged.leaves.contains_key(&id) => id,
            Some(_) => return Err(RepositoryError::NotFound),
            None => {
                self.staged.last_id += 1;
                LeaveId::new(self.staged.last_id)
            }
        };

        for source in &leave.sources {
            if let Some(owner) = self.staged.sources.get(source).filter(|owner| **owner != id) {
                return Err(RepositoryError::Conflict(format!(
                    "source {source} belongs to leave {owner}"
                )));
            }
        }

        leave.id = Some(id);
        self.staged
            .sources
            .retain(|source, owner| *owner != id || leave.sources.contains(source));
        for source in &leave.sources {
            self.staged.sources.insert(source.clone(), id);
        }
        self.staged.leaves.insert(id, leave.clone());
        Ok(leave)
    }

    async fn find_overlapping(
        &mut self,
        user_id: &str,
        range: &DateRange,
        exclude: Option<LeaveId>,
    ) -> Result<Vec<Leave>, RepositoryError> {
        let mut found: Vec<Leave> = self
            .staged
            .leaves
            .values()
            .filter(|leave| leave.user_id == user_id)
            .filter(|leave| leave.id != exclude)
            .filter(|leave| leave.range.overlaps(range))
            .cloned()
            .collect();
        found.sort_by_key(|leave| (leave.range.start, leave.id));
        Ok(found)
    }

    async fn find_by_source_ref(
        &mut self,
        source: &SourceRef,
    ) -> Result<Option<Leave>, RepositoryError> {
        Ok(self
            .staged
            .sources
            .get(source)
            .and_then(|id| self.staged.leaves.get(id))
            .cloned())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use leavedesk_core::{LeaveDuration, LeaveType};

    fn range(start: u32, end: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, start).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, end).unwrap(),
        )
    }

    fn leave(user: &str, dates: DateRange, source: &str) -> Leave {
        Leave::new(
            user,
            dates,
            LeaveType::Vacation,
            LeaveDuration::FullDay,
            SourceRef::api(source),
        )
    }

    #[tokio::test]
    async fn test_save_assigns_ids_and_commits() {
        let store = MemoryLeaveStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = tx.save(leave("U1", range(1, 2), "a")).await.unwrap();
        let second = tx.save(leave("U1", range(5, 6), "b")).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first.id, Some(LeaveId::new(1)));
        assert_eq!(second.id, Some(LeaveId::new(2)));
        assert_eq!(store.len().await, 2);
        assert_eq!(store.find_by_id(LeaveId::new(2)).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_drop_without_commit_rolls_back() {
        let store = MemoryLeaveStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.save(leave("U1", range(1, 2), "a")).await.unwrap();
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_find_overlapping_orders_and_excludes() {
        let store = MemoryLeaveStore::new();
        let mut tx = store.begin().await.unwrap();
        let late = tx.save(leave("U1", range(10, 12), "late")).await.unwrap();
        let early = tx.save(leave("U1", range(3, 4), "early")).await.unwrap();
        tx.save(leave("U2", range(1, 31), "other-user")).await.unwrap();

        let found = tx.find_overlapping("U1", &range(1, 31), None).await.unwrap();
        assert_eq!(found, vec![early.clone(), late.clone()]);

        let found = tx
            .find_overlapping("U1", &range(1, 31), early.id)
            .await
            .unwrap();
        assert_eq!(found, vec![late]);

        let found = tx.find_overlapping("U1", &range(5, 9), None).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_source_ref_lookup_and_update() {
        let store = MemoryLeaveStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut saved = tx.save(leave("U1", range(1, 2), "a")).await.unwrap();

        let found = tx.find_by_source_ref(&SourceRef::api("a")).await.unwrap();
        assert_eq!(found, Some(saved.clone()));

        saved.range = range(3, 4);
        let updated = tx.save(saved.clone()).await.unwrap();
        assert_eq!(updated.id, saved.id);
        tx.commit().await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.all().await.first().map(|l| l.range), Some(range(3, 4)));
    }

    #[tokio::test]
    async fn test_source_ref_owned_by_another_leave() {
        let store = MemoryLeaveStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.save(leave("U1", range(1, 2), "a")).await.unwrap();
        let err = tx.save(leave("U1", range(5, 6), "a")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_of_unknown_id() {
        let store = MemoryLeaveStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut ghost = leave("U1", range(1, 2), "a");
        ghost.id = Some(LeaveId::new(99));
        assert!(matches!(
            tx.save(ghost).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }
}
