use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

/// Bounded admission for uploads with a strict FIFO wait queue.
///
/// Admission is decided synchronously at submission time so that queue order is submission
/// order. A released permit is handed straight to the oldest waiter.
#[derive(Debug)]
pub struct UploadLimiter {
    capacity: usize,
    state: Mutex<LimiterState>,
}

#[derive(Debug, Default)]
struct LimiterState {
    active: usize,
    waiting: VecDeque<oneshot::Sender<UploadPermit>>,
}

/// Held for the whole active life of one upload.
#[derive(Debug)]
pub struct UploadPermit {
    limiter: Option<Arc<UploadLimiter>>,
}

#[derive(Debug)]
pub enum Admission {
    Granted(UploadPermit),
    Queued(oneshot::Receiver<UploadPermit>),
}

impl UploadLimiter {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity: capacity.max(1),
            state: Mutex::new(LimiterState::default()),
        })
    }

    pub fn admit(self: &Arc<Self>) -> Admission {
        let mut state = self.lock();
        if state.active < self.capacity {
            state.active += 1;
            return Admission::Granted(UploadPermit {
                limiter: Some(Arc::clone(self)),
            });
        }

        let (sender, receiver) = oneshot::channel();
        state.waiting.push_back(sender);
        Admission::Queued(receiver)
    }

    pub fn active(&self) -> usize {
        self.lock().active
    }

    pub fn queued(&self) -> usize {
        self.lock().waiting.len()
    }

    fn release(self: &Arc<Self>) {
        let mut state = self.lock();
        while let Some(waiter) = state.waiting.pop_front() {
            let permit = UploadPermit {
                limiter: Some(Arc::clone(self)),
            };
            match waiter.send(permit) {
                Ok(()) => return,
                // Waiter went away; disarm the bounced permit and try the next one.
                Err(mut bounced) => {
                    bounced.limiter = None;
                }
            }
        }
        state.active = state.active.saturating_sub(1);
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for UploadPermit {
    fn drop(&mut self) {
        if let Some(limiter) = self.limiter.take() {
            limiter.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn released_permits_go_to_the_oldest_waiter() {
        let limiter = UploadLimiter::new(1);
        let Admission::Granted(first) = limiter.admit() else {
            panic!("first upload is admitted");
        };
        let Admission::Queued(second) = limiter.admit() else {
            panic!("second upload waits");
        };
        let Admission::Queued(third) = limiter.admit() else {
            panic!("third upload waits");
        };
        assert_eq!((limiter.active(), limiter.queued()), (1, 2));

        drop(first);
        let second = second.await.expect("second admitted");
        assert_eq!((limiter.active(), limiter.queued()), (1, 1));

        drop(second);
        let third = third.await.expect("third admitted");
        drop(third);
        assert_eq!((limiter.active(), limiter.queued()), (0, 0));
    }

    #[tokio::test]
    async fn abandoned_waiters_are_skipped() {
        let limiter = UploadLimiter::new(1);
        let Admission::Granted(first) = limiter.admit() else {
            panic!("first upload is admitted");
        };
        let Admission::Queued(abandoned) = limiter.admit() else {
            panic!("second upload waits");
        };
        let Admission::Queued(waiting) = limiter.admit() else {
            panic!("third upload waits");
        };
        drop(abandoned);

        drop(first);
        let permit = waiting.await.expect("live waiter admitted");
        assert_eq!(limiter.active(), 1);
        drop(permit);
        assert_eq!(limiter.active(), 0);
    }
}
