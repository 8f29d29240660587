//! Rate-limited, bounded admission queue for calls to one external dependency.
//!
//! ### Admission
//!
//! A queued task is admitted when it is at the head of the FIFO queue and:
//!
//! - a token is available in the reservoir (refilled `refill_amount` every
//!   `refill_interval`, capped at `capacity`);
//! - fewer than `max_concurrent` admitted tasks are still running;
//! - at least `min_spacing` has passed since the previous admission.
//!
//! ### Overload
//!
//! When `high_water` tasks are already queued, the **oldest** queued task is
//! dropped and its caller receives [`SchedulerError::Overloaded`]. New
//! arrivals are never rejected.
//!
//! Every wait is bounded by the next refill, the spacing deadline or a permit
//! release. Dropping a pending `acquire` future removes it from the queue.

mod budget;
mod error;

pub use budget::RateBudget;
pub use error::{Retryable, ScheduleError, SchedulerError};

use std::collections::{HashSet, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Counters and current occupancy of one scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub name: String,
    pub admitted: u64,
    pub dropped: u64,
    pub retried: u64,
    pub failed: u64,
    pub queued: usize,
    pub in_flight: usize,
    pub available_tokens: u32,
}

enum Admission {
    Admit,
    WaitUntil(Instant),
    WaitForRelease,
}

struct State {
    tokens: u32,
    last_refill: Instant,
    in_flight: usize,
    last_start: Option<Instant>,
    queue: VecDeque<u64>,
    /// Tickets evicted by the leak policy that have not observed it yet.
    dropped: HashSet<u64>,
    next_ticket: u64,
    admitted: u64,
    dropped_total: u64,
    retried: u64,
    failed: u64,
}

impl State {
    fn refill(&mut self, now: Instant, budget: &RateBudget) {
        if budget.refill_interval.is_zero() {
            self.tokens = budget.capacity;
            self.last_refill = now;
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_refill);
        let periods = elapsed.as_nanos() / budget.refill_interval.as_nanos();
        if periods == 0 {
            return;
        }

        let added = u64::try_from(periods).unwrap_or(u64::MAX).saturating_mul(budget.refill_amount.into());
        let tokens = u64::from(self.tokens).saturating_add(added).min(u64::from(budget.capacity));
        self.tokens = u32::try_from(tokens).unwrap_or(budget.capacity);

        self.last_refill = u32::try_from(periods)
            .ok()
            .and_then(|p| budget.refill_interval.checked_mul(p))
            .and_then(|d| self.last_refill.checked_add(d))
            .unwrap_or(now);
    }

    fn admission(&self, now: Instant, budget: &RateBudget) -> Admission {
        if self.in_flight >= budget.max_concurrent {
            return Admission::WaitForRelease;
        }

        let mut ready_at = now;
        if self.tokens == 0 {
            ready_at = ready_at.max(self.last_refill + budget.refill_interval);
        }
        if let Some(last) = self.last_start {
            ready_at = ready_at.max(last + budget.min_spacing);
        }

        if ready_at > now { Admission::WaitUntil(ready_at) } else { Admission::Admit }
    }
}

struct Inner {
    name: String,
    budget: RateBudget,
    state: Mutex<State>,
    notify: Notify,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-dependency call scheduler. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").field("name", &self.inner.name).field("budget", &self.inner.budget).finish()
    }
}

/// An admitted slot. Releases concurrency headroom on drop.
pub struct Permit {
    inner: Arc<Inner>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        {
            let mut state = self.inner.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.inner.notify.notify_waiters();
    }
}

/// Queue membership for one pending `acquire`. Removes itself if the caller goes away.
struct QueueTicket<'a> {
    inner: &'a Inner,
    id: u64,
    settled: bool,
}

impl Drop for QueueTicket<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        {
            let mut state = self.inner.lock();
            state.queue.retain(|queued| *queued != self.id);
            state.dropped.remove(&self.id);
        }
        self.inner.notify.notify_waiters();
    }
}

impl Scheduler {
    pub fn new(name: impl Into<String>, mut budget: RateBudget) -> Self {
        budget.capacity = budget.capacity.max(1);
        budget.max_concurrent = budget.max_concurrent.max(1);
        budget.high_water = budget.high_water.max(1);
        let now = Instant::now();
        let state = State {
            tokens: budget.initial_tokens.min(budget.capacity),
            last_refill: now,
            in_flight: 0,
            last_start: None,
            queue: VecDeque::new(),
            dropped: HashSet::new(),
            next_ticket: 0,
            admitted: 0,
            dropped_total: 0,
            retried: 0,
            failed: 0,
        };
        Self { inner: Arc::new(Inner { name: name.into(), budget, state: Mutex::new(state), notify: Notify::new() }) }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn budget(&self) -> &RateBudget {
        &self.inner.budget
    }

    /// Wait for admission.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Overloaded` if this task was the oldest in a
    /// full queue when another task arrived.
    pub async fn acquire(&self) -> Result<Permit, SchedulerError> {
        let inner = &*self.inner;
        let budget = &inner.budget;

        let id = {
            let mut state = inner.lock();
            let id = state.next_ticket;
            state.next_ticket += 1;
            if state.queue.len() >= budget.high_water
                && let Some(oldest) = state.queue.pop_front()
            {
                state.dropped.insert(oldest);
                state.dropped_total += 1;
                tracing::warn!(scheduler = %inner.name, queued = state.queue.len(), "queue full; dropping oldest task");
            }
            state.queue.push_back(id);
            id
        };
        inner.notify.notify_waiters();

        let mut ticket = QueueTicket { inner, id, settled: false };

        loop {
            let notified = inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let wait_until = {
                let mut state = inner.lock();
                if state.dropped.remove(&id) {
                    ticket.settled = true;
                    return Err(SchedulerError::Overloaded { scheduler: inner.name.clone() });
                }

                let now = Instant::now();
                state.refill(now, budget);

                if state.queue.front() == Some(&id) {
                    match state.admission(now, budget) {
                        Admission::Admit => {
                            state.queue.pop_front();
                            state.tokens -= 1;
                            state.in_flight += 1;
                            state.last_start = Some(now);
                            state.admitted += 1;
                            ticket.settled = true;
                            tracing::trace!(
                                scheduler = %inner.name,
                                tokens = state.tokens,
                                in_flight = state.in_flight,
                                "task admitted"
                            );
                            drop(state);
                            inner.notify.notify_waiters();
                            return Ok(Permit { inner: Arc::clone(&self.inner) });
                        }
                        Admission::WaitUntil(deadline) => Some(deadline),
                        Admission::WaitForRelease => None,
                    }
                } else {
                    None
                }
            };

            match wait_until {
                Some(deadline) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Run `task` under admission control, retrying retryable failures.
    ///
    /// Each retry goes back through the queue and counts against
    /// `max_attempts`. A retry waits first for the error's `retry_after`,
    /// capped at the budget's `max_retry_wait`. The task receives the 1-based
    /// attempt number.
    ///
    /// A task dropped by the leak policy is not re-queued: the overload is
    /// returned to the caller, which may submit again.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::Scheduler` if the task was dropped from a full
    /// queue, or the task's last error once attempts are exhausted or a
    /// non-retryable error occurs.
    pub async fn schedule<T, E, F, Fut>(&self, max_attempts: u32, mut task: F) -> Result<T, ScheduleError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let permit = match self.acquire().await {
                Ok(permit) => permit,
                Err(err) => {
                    self.inner.lock().failed += 1;
                    return Err(ScheduleError::Scheduler(err));
                }
            };

            let result = task(attempt).await;
            drop(permit);

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let wait = err.retry_after().map(|after| after.min(self.inner.budget.max_retry_wait));
                    tracing::warn!(scheduler = %self.inner.name, attempt, error = %err, ?wait, "attempt failed; retrying");
                    self.inner.lock().retried += 1;
                    attempt += 1;
                    if let Some(wait) = wait {
                        tokio::time::sleep(wait).await;
                    }
                }
                Err(err) => {
                    self.inner.lock().failed += 1;
                    return Err(ScheduleError::Task(err));
                }
            }
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        let mut state = self.inner.lock();
        state.refill(Instant::now(), &self.inner.budget);
        SchedulerStats {
            name: self.inner.name.clone(),
            admitted: state.admitted,
            dropped: state.dropped_total,
            retried: state.retried,
            failed: state.failed,
            queued: state.queue.len(),
            in_flight: state.in_flight,
            available_tokens: state.tokens,
        }
    }
}
