use std::collections::VecDeque;
use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Admission control bounding how many executions may be in flight at once.
///
/// Waiters are granted strictly in arrival order. When a permit is released while waiters are
/// queued it is handed directly to the longest waiting one, so the number of outstanding grants
/// stays unchanged and never exceeds `max_concurrency`.
///
/// The internal lock is only held for the counter and queue updates, never across an await.
#[derive(Debug)]
pub struct Semaphore {
    max_concurrency: usize,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    current_count: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl Semaphore {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency,
            state: Mutex::new(State::default()),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Number of grants currently outstanding.
    pub fn current_count(&self) -> usize {
        self.state.lock().current_count
    }

    /// Number of callers queued in [Semaphore::acquire].
    pub fn waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Wait for a slot. The returned permit releases the slot when dropped.
    ///
    /// Dropping the future while it is queued gives up its place in the queue. If the slot had
    /// already been handed over it is passed on to the next waiter.
    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        let receiver = {
            let mut state = self.state.lock();
            if state.current_count < self.max_concurrency {
                state.current_count += 1;
                return SemaphorePermit { semaphore: self };
            }

            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);
            receiver
        };

        let mut waiter = Waiter {
            semaphore: self,
            receiver: Some(receiver),
        };
        waiter.granted().await;

        SemaphorePermit { semaphore: self }
    }

    /// Give back one grant.
    ///
    /// Only call this to pair with a permit that was given up with [SemaphorePermit::forget].
    pub fn release(&self) {
        let mut state = self.state.lock();
        while let Some(waiter) = state.waiters.pop_front() {
            // A failed send means the waiter gave up, try the next one.
            if waiter.send(()).is_ok() {
                return;
            }
        }

        state.current_count = state.current_count.saturating_sub(1);
    }

    /// Run `f` while holding a permit. The permit is released on every exit path, including a
    /// panic inside `f` or the returned future being dropped.
    pub async fn with_semaphore<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self.acquire().await;
        f().await
    }
}

/// A granted slot of a [Semaphore].
#[must_use = "the slot is released as soon as the permit is dropped"]
#[derive(Debug)]
pub struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
}

impl SemaphorePermit<'_> {
    /// Keep the slot occupied after this permit goes away. It must later be handed back with
    /// [Semaphore::release].
    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

struct Waiter<'a> {
    semaphore: &'a Semaphore,
    receiver: Option<oneshot::Receiver<()>>,
}

impl Waiter<'_> {
    async fn granted(&mut self) {
        if let Some(receiver) = self.receiver.as_mut() {
            // The sender lives in the queue of a semaphore that is borrowed here, it can only be
            // consumed by a grant.
            let _ = receiver.await;
        }
        self.receiver = None;
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close();
            if receiver.try_recv().is_ok() {
                self.semaphore.release();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    async fn wait_for_waiters(semaphore: &Semaphore, expected: usize) {
        while semaphore.waiting() < expected {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn grants_immediately_below_the_limit() {
        let semaphore = Semaphore::new(2);

        let first = semaphore.acquire().await;
        let second = semaphore.acquire().await;
        assert_eq!(semaphore.current_count(), 2);

        drop(first);
        drop(second);
        assert_eq!(semaphore.current_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_admits_more_than_max_concurrency() {
        let semaphore = Arc::new(Semaphore::new(3));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles = (0..12)
            .map(|_| {
                let semaphore = semaphore.clone();
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    semaphore
                        .with_semaphore(|| async {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                        })
                        .await
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(semaphore.current_count(), 0);
    }

    #[tokio::test]
    async fn waiters_are_granted_in_arrival_order() {
        let semaphore = Arc::new(Semaphore::new(1));
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let held = semaphore.acquire().await;
        held.forget();

        let mut handles = Vec::new();
        for id in 0..4 {
            let task_semaphore = semaphore.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let permit = task_semaphore.acquire().await;
                order.lock().push(id);
                permit.forget();
            }));
            wait_for_waiters(&semaphore, id + 1).await;
        }

        for granted in 1..=4 {
            semaphore.release();
            while order.lock().len() < granted {
                tokio::task::yield_now().await;
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
        assert_eq!(semaphore.current_count(), 1);

        semaphore.release();
        assert_eq!(semaphore.current_count(), 0);
    }

    #[tokio::test]
    async fn release_hands_over_without_changing_the_count() {
        let semaphore = Arc::new(Semaphore::new(1));
        semaphore.acquire().await.forget();

        let waiter = {
            let semaphore = semaphore.clone();
            tokio::spawn(async move { semaphore.acquire().await.forget() })
        };
        wait_for_waiters(&semaphore, 1).await;

        semaphore.release();
        waiter.await.unwrap();

        assert_eq!(semaphore.current_count(), 1);
        assert_eq!(semaphore.waiting(), 0);
    }

    #[tokio::test]
    async fn with_semaphore_releases_after_an_error() {
        let semaphore = Semaphore::new(1);

        let result: Result<(), &str> = semaphore.with_semaphore(|| async { Err("boom") }).await;

        assert!(result.is_err());
        assert_eq!(semaphore.current_count(), 0);
    }

    #[tokio::test]
    async fn with_semaphore_releases_after_a_panic() {
        let semaphore = Arc::new(Semaphore::new(1));

        let failing = {
            let semaphore = semaphore.clone();
            tokio::spawn(async move {
                semaphore
                    .with_semaphore(|| async { panic!("task failed") })
                    .await
            })
        };
        let joined: Result<(), _> = failing.await;

        assert!(joined.unwrap_err().is_panic());
        assert_eq!(semaphore.current_count(), 0);
        let _permit = tokio::time::timeout(Duration::from_secs(1), semaphore.acquire())
            .await
            .expect("permit leaked by a panicking task");
    }

    #[tokio::test]
    async fn cancelled_waiter_does_not_leak_a_permit() {
        let semaphore = Semaphore::new(1);
        let held = semaphore.acquire().await;

        let abandoned = tokio::time::timeout(Duration::from_millis(10), semaphore.acquire()).await;
        assert!(abandoned.is_err());

        drop(held);
        assert_eq!(semaphore.current_count(), 0);
        assert_eq!(semaphore.waiting(), 0);
    }
}
