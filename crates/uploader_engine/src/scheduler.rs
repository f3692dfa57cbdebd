use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use uploader_logging::upl_trace;

struct Timer {
    id: u64,
    token: CancellationToken,
}

type Timers<K> = Arc<Mutex<HashMap<K, Timer>>>;

/// One pending timer per key. Scheduling again for a key replaces (and
/// cancels) the previous timer; a fired timer removes itself.
pub struct PollScheduler<K> {
    runtime: Handle,
    timers: Timers<K>,
    next_id: AtomicU64,
}

impl<K> PollScheduler<K>
where
    K: Eq + Hash + Copy + Send + std::fmt::Debug + 'static,
{
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn schedule<F>(&self, key: K, delay: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = lock(&self.timers).insert(
            key,
            Timer {
                id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            upl_trace!("replacing timer for {key:?}");
            previous.token.cancel();
        }

        let timers = self.timers.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let current = {
                        let mut timers = lock(&timers);
                        match timers.get(&key) {
                            Some(timer) if timer.id == id => {
                                timers.remove(&key);
                                true
                            }
                            _ => false,
                        }
                    };
                    if current {
                        on_fire();
                    }
                }
            }
        });
    }

    /// Returns whether a timer was pending for `key`.
    pub fn cancel(&self, key: K) -> bool {
        match lock(&self.timers).remove(&key) {
            Some(timer) => {
                timer.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, key: K) -> bool {
        lock(&self.timers).contains_key(&key)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.timers).len()
    }
}

impl<K> Drop for PollScheduler<K> {
    fn drop(&mut self) {
        for (_, timer) in lock(&self.timers).drain() {
            timer.token.cancel();
        }
    }
}

fn lock<K>(timers: &Mutex<HashMap<K, Timer>>) -> MutexGuard<'_, HashMap<K, Timer>> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}
