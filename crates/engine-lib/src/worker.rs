//! Per-key worker runtime
//!
//! Every pipeline partitions its input by key: (service, metric) for
//! anomaly scoring, service for log mining. All events for a key are
//! routed to the same worker task, so per-key state is mutated by exactly
//! one owner and never needs locking. Distinct keys run fully in parallel.
//!
//! Each worker has a bounded inbox. On overflow the oldest unprocessed
//! item is dropped and counted; the producer is never blocked.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Notify};
use tracing::{debug, warn};

pub use async_trait::async_trait;

/// Default inbox capacity per key
pub const DEFAULT_INBOX_CAPACITY: usize = 1024;

/// Bounded single-consumer queue with a drop-oldest overflow policy
pub struct Inbox<T> {
    queue: Mutex<VecDeque<T>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl<T> Inbox<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(256))),
            notify: Notify::new(),
            capacity,
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Push an item, evicting the oldest queued item when full.
    /// Returns true if an item was dropped to make room.
    pub fn push(&self, item: T) -> bool {
        let mut dropped = false;
        {
            let mut queue = self.queue.lock().unwrap();
            if queue.len() >= self.capacity {
                queue.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                dropped = true;
            }
            queue.push_back(item);
        }
        self.notify.notify_one();
        dropped
    }

    /// Wait for the next item; returns None once closed and drained
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            {
                let mut queue = self.queue.lock().unwrap();
                if let Some(item) = queue.pop_front() {
                    return Some(item);
                }
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// Close the inbox; pending items are still delivered
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items dropped due to overflow since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Single-owner processor for one key's event stream
#[async_trait]
pub trait KeyWorker: Send + 'static {
    type Item: Send + 'static;

    async fn process(&mut self, item: Self::Item);
}

/// Lazily spawns one worker task per key and routes items to it
pub struct WorkerPool<K, W>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    W: KeyWorker,
{
    inboxes: DashMap<K, Arc<Inbox<W::Item>>>,
    factory: Arc<dyn Fn(&K) -> W + Send + Sync>,
    capacity: usize,
    shutdown: broadcast::Sender<()>,
}

impl<K, W> WorkerPool<K, W>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    W: KeyWorker,
{
    pub fn new(
        capacity: usize,
        shutdown: broadcast::Sender<()>,
        factory: impl Fn(&K) -> W + Send + Sync + 'static,
    ) -> Self {
        Self {
            inboxes: DashMap::new(),
            factory: Arc::new(factory),
            capacity,
            shutdown,
        }
    }

    /// Route one item to its key's worker, spawning the worker on first use.
    /// Returns true if the key's inbox dropped an older item to make room.
    pub fn dispatch(&self, key: K, item: W::Item) -> bool {
        let inbox = self
            .inboxes
            .entry(key.clone())
            .or_insert_with(|| self.spawn_worker(&key))
            .clone();

        let dropped = inbox.push(item);
        if dropped {
            warn!(key = ?key, "Worker inbox full, dropped oldest item");
        }
        dropped
    }

    fn spawn_worker(&self, key: &K) -> Arc<Inbox<W::Item>> {
        let inbox = Arc::new(Inbox::new(self.capacity));
        let mut worker = (self.factory)(key);
        let worker_inbox = inbox.clone();
        let mut shutdown = self.shutdown.subscribe();
        let worker_key = key.clone();

        tokio::spawn(async move {
            debug!(key = ?worker_key, "Worker started");
            loop {
                tokio::select! {
                    item = worker_inbox.pop() => match item {
                        Some(item) => worker.process(item).await,
                        None => break,
                    },
                    _ = shutdown.recv() => break,
                }
            }
            debug!(key = ?worker_key, "Worker stopped");
        });

        inbox
    }

    /// Number of keys with a live worker
    pub fn worker_count(&self) -> usize {
        self.inboxes.len()
    }

    /// Total items dropped across all inboxes
    pub fn total_dropped(&self) -> u64 {
        self.inboxes.iter().map(|entry| entry.value().dropped()).sum()
    }

    /// Total items queued across all inboxes
    pub fn total_queued(&self) -> usize {
        self.inboxes.iter().map(|entry| entry.value().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_inbox_fifo_order() {
        let inbox = Inbox::new(10);
        inbox.push(1);
        inbox.push(2);
        inbox.push(3);

        assert_eq!(inbox.pop().await, Some(1));
        assert_eq!(inbox.pop().await, Some(2));
        assert_eq!(inbox.pop().await, Some(3));
    }

    #[tokio::test]
    async fn test_inbox_drops_oldest_on_overflow() {
        let inbox = Inbox::new(2);
        assert!(!inbox.push(1));
        assert!(!inbox.push(2));
        assert!(inbox.push(3));

        assert_eq!(inbox.dropped(), 1);
        assert_eq!(inbox.pop().await, Some(2));
        assert_eq!(inbox.pop().await, Some(3));
    }

    #[tokio::test]
    async fn test_inbox_close_drains_pending() {
        let inbox = Inbox::new(10);
        inbox.push(1);
        inbox.close();

        assert_eq!(inbox.pop().await, Some(1));
        assert_eq!(inbox.pop().await, None);
    }

    struct CountingWorker {
        counter: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl KeyWorker for CountingWorker {
        type Item = u64;

        async fn process(&mut self, _item: u64) {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_pool_spawns_one_worker_per_key() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let counter = Arc::new(AtomicUsize::new(0));
        let worker_counter = counter.clone();
        let pool: WorkerPool<String, CountingWorker> =
            WorkerPool::new(16, shutdown_tx.clone(), move |_key| CountingWorker {
                counter: worker_counter.clone(),
            });

        for i in 0..4 {
            pool.dispatch("api".to_string(), i);
            pool.dispatch("db".to_string(), i);
        }

        assert_eq!(pool.worker_count(), 2);

        // Give the workers a chance to drain
        for _ in 0..50 {
            if counter.load(Ordering::SeqCst) == 8 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(counter.load(Ordering::SeqCst), 8);
        let _ = shutdown_tx.send(());
    }
}
