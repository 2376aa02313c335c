//! In-memory queue storage.
//!
//! Holds encoded payloads only; decoding happens on the way out, in the
//! engine. Every method takes the lock for its own duration and releases it
//! before returning, so callers may re-enter storage from inside a job.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::model::QueueName;

type Queues = BTreeMap<QueueName, VecDeque<String>>;

/// Storage backend. Owns every queue.
#[derive(Default)]
pub struct Storage {
    queues: Mutex<Queues>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -----------------------------------------------------------------------
    // Reset and size
    // -----------------------------------------------------------------------

    /// Drop every queue.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Empty one queue.
    pub fn reset_queue(&self, queue: &str) {
        if let Some(items) = self.lock().get_mut(queue) {
            items.clear();
        }
    }

    pub fn size(&self, queue: &str) -> usize {
        self.lock().get(queue).map_or(0, VecDeque::len)
    }

    pub fn total_size(&self) -> usize {
        self.lock().values().map(VecDeque::len).sum()
    }

    /// Names of every queue that has been touched since the last reset.
    pub fn queue_names(&self) -> Vec<QueueName> {
        self.lock().keys().cloned().collect()
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Add an encoded payload. Returns the new length of the queue.
    pub fn push(&self, queue: &QueueName, encoded: String, front: bool) -> usize {
        let mut queues = self.lock();
        let items = queues.entry(queue.clone()).or_default();
        if front {
            items.push_front(encoded);
        } else {
            items.push_back(encoded);
        }
        items.len()
    }

    /// Remove every payload for which `remove` returns true. Returns the
    /// number removed.
    pub fn remove_where(&self, queue: &str, mut remove: impl FnMut(&str) -> bool) -> usize {
        let mut queues = self.lock();
        let Some(items) = queues.get_mut(queue) else {
            return 0;
        };
        let before = items.len();
        items.retain(|encoded| !remove(encoded));
        before - items.len()
    }

    /// Run `f` against the live queue, creating it if needed.
    pub fn with_queue<T>(&self, queue: &QueueName, f: impl FnOnce(&mut VecDeque<String>) -> T) -> T {
        let mut queues = self.lock();
        f(queues.entry(queue.clone()).or_default())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Encoded payloads in `[start, start + count)`, clipped to the queue.
    pub fn range(&self, queue: &str, start: usize, count: usize) -> Vec<String> {
        self.lock()
            .get(queue)
            .map(|items| items.iter().skip(start).take(count).cloned().collect())
            .unwrap_or_default()
    }

    pub fn all(&self, queue: &str) -> Vec<String> {
        self.lock()
            .get(queue)
            .map(|items| items.iter().cloned().collect())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Draining
    // -----------------------------------------------------------------------

    /// Detach every payload from every queue, leaving empty storage behind.
    pub fn drain_all(&self) -> Vec<(QueueName, String)> {
        let queues = std::mem::take(&mut *self.lock());
        queues
            .into_iter()
            .flat_map(|(name, items)| items.into_iter().map(move |p| (name.clone(), p)))
            .collect()
    }

    /// Detach up to `limit` payloads from the front of one queue.
    pub fn drain_front(&self, queue: &str, limit: Option<usize>) -> Vec<String> {
        let mut queues = self.lock();
        let Some(items) = queues.get_mut(queue) else {
            return Vec::new();
        };
        let n = limit.map_or(items.len(), |limit| limit.min(items.len()));
        items.drain(..n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(name: &str) -> QueueName {
        QueueName::from(name)
    }

    #[test]
    fn push_appends_or_prepends() {
        let storage = Storage::new();
        assert_eq!(storage.push(&q("low"), "a".into(), false), 1);
        assert_eq!(storage.push(&q("low"), "b".into(), false), 2);
        assert_eq!(storage.push(&q("low"), "c".into(), true), 3);
        assert_eq!(storage.all("low"), vec!["c", "a", "b"]);
    }

    #[test]
    fn sizes_and_resets() {
        let storage = Storage::new();
        storage.push(&q("low"), "a".into(), false);
        storage.push(&q("high"), "b".into(), false);
        storage.push(&q("high"), "c".into(), false);

        assert_eq!(storage.size("low"), 1);
        assert_eq!(storage.size("missing"), 0);
        assert_eq!(storage.total_size(), 3);

        storage.reset_queue("high");
        assert_eq!(storage.total_size(), 1);
        storage.reset_queue("missing");

        storage.reset();
        storage.reset();
        assert_eq!(storage.total_size(), 0);
        assert!(storage.queue_names().is_empty());
    }

    #[test]
    fn range_clips_to_bounds() {
        let storage = Storage::new();
        for p in ["1", "2", "3"] {
            storage.push(&q("medium"), p.into(), false);
        }
        assert_eq!(storage.range("medium", 1, 2), vec!["2", "3"]);
        assert_eq!(storage.range("medium", 2, 10), vec!["3"]);
        assert!(storage.range("medium", 4, 2).is_empty());
        assert!(storage.range("medium", 0, 0).is_empty());
    }

    #[test]
    fn drain_all_leaves_fresh_storage() {
        let storage = Storage::new();
        storage.push(&q("a"), "1".into(), false);
        storage.push(&q("b"), "2".into(), false);

        let drained = storage.drain_all();
        assert_eq!(drained.len(), 2);
        assert_eq!(storage.total_size(), 0);

        storage.push(&q("a"), "3".into(), false);
        assert_eq!(storage.size("a"), 1);
    }

    #[test]
    fn drain_front_honours_limit() {
        let storage = Storage::new();
        for p in ["1", "2", "3"] {
            storage.push(&q("low"), p.into(), false);
        }
        assert_eq!(storage.drain_front("low", Some(2)), vec!["1", "2"]);
        assert_eq!(storage.all("low"), vec!["3"]);
        assert_eq!(storage.drain_front("low", Some(5)), vec!["3"]);
        assert!(storage.drain_front("missing", None).is_empty());
    }

    #[test]
    fn remove_where_counts_removed() {
        let storage = Storage::new();
        for p in ["keep", "drop", "drop"] {
            storage.push(&q("low"), p.into(), false);
        }
        assert_eq!(storage.remove_where("low", |p| p == "drop"), 2);
        assert_eq!(storage.all("low"), vec!["keep"]);
        assert_eq!(storage.remove_where("missing", |_| true), 0);
    }
}
