//! One upstream fetch per key at a time.
//!
//! Concurrent callers for the same key share a `OnceCell`: the first runs
//! `init`, the rest await its result. If the running caller is dropped, a
//! waiting caller runs its own `init` instead. The map entry is removed once
//! the cell is initialized.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;

pub struct SingleFlight<T> {
    inflight: Mutex<HashMap<String, Arc<OnceCell<T>>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self { inflight: Mutex::new(HashMap::new()) }
    }
}

impl<T> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight").field("in_flight", &self.in_flight()).finish()
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `init` for `key` unless another caller already is; either way
    /// return the shared result.
    pub async fn run<F, Fut>(&self, key: &str, init: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let cell = Arc::clone(self.lock().entry(key.to_string()).or_insert_with(|| Arc::new(OnceCell::new())));

        let value = cell.get_or_init(init).await.clone();

        let mut map = self.lock();
        if map.get(key).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
            map.remove(key);
        }
        value
    }
}

impl<T> SingleFlight<T> {
    /// Keys with a fetch currently registered.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<OnceCell<T>>>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_init() {
        let flight = Arc::new(SingleFlight::<u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = Arc::clone(&flight);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                flight
                    .run("requirements:fr:tourist:us", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        42
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_sequential_calls_run_again() {
        let flight = SingleFlight::<usize>::new();
        let calls = AtomicUsize::new(0);

        for expected in 1..=2 {
            let value = flight.run("k", || async { calls.fetch_add(1, Ordering::SeqCst) + 1 }).await;
            assert_eq!(value, expected);
        }
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_share() {
        let flight = SingleFlight::<&'static str>::new();
        let a = flight.run("a", || async { "a" }).await;
        let b = flight.run("b", || async { "b" }).await;
        assert_eq!((a, b), ("a", "b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_leader_is_replaced() {
        let flight = Arc::new(SingleFlight::<u32>::new());

        let leader = {
            let flight = Arc::clone(&flight);
            tokio::spawn(async move {
                flight
                    .run("k", || async {
                        tokio::time::sleep(Duration::from_secs(3_600)).await;
                        1
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(flight.in_flight(), 1);

        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());

        let value = flight.run("k", || async { 2 }).await;
        assert_eq!(value, 2);
        assert_eq!(flight.in_flight(), 0);
    }
}
