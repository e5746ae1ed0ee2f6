use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type SlotKey = (String, NaiveDate);

/// Per-(practitioner, date) async locks for the check-then-write sequence.
///
/// This only serialises writers inside one process; other instances still
/// race, and the storage constraint is what finally rejects a double booking.
#[derive(Default)]
pub struct SlotLocks {
    locks: Mutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, practitioner: &str, date: NaiveDate) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Nobody holds or waits on an entry whose only owner is the map.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((practitioner.to_string(), date))
                .or_default()
                .clone()
        };

        lock.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 10).unwrap()
    }

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(SlotLocks::new());
        let guard = locks.acquire("Dr. Smith", date()).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("Dr. Smith", date()).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender acquires after release")
            .unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = SlotLocks::new();
        let _smith = locks.acquire("Dr. Smith", date()).await;
        let _jones = tokio::time::timeout(Duration::from_secs(1), locks.acquire("Dr. Jones", date()))
            .await
            .expect("independent practitioner is not blocked");
        assert_eq!(locks.tracked(), 2);
    }

    #[tokio::test]
    async fn idle_entries_are_dropped() {
        let locks = SlotLocks::new();
        drop(locks.acquire("Dr. Smith", date()).await);
        let _jones = locks.acquire("Dr. Jones", date()).await;
        assert_eq!(locks.tracked(), 1);
    }
}
