//! Bounded blocking FIFO shared by the accept loop and the worker threads.
//!
//! The accept loop is the single producer; every worker is a consumer. A full
//! queue blocks the producer, which is the server's only form of backpressure.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Default number of accepted connections waiting for a worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 5;

/// A fixed-capacity queue whose operations block instead of failing.
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> WorkQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero: such a queue could never accept an item.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "work queue capacity must be positive");
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    // every mutation happens entirely under the lock, so a panicking holder cannot leave it torn
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `item` at the tail, blocking while the queue is full.
    pub fn enqueue(&self, item: T) {
        let mut items = self.lock();
        while items.len() >= self.capacity {
            items = self.not_full.wait(items).unwrap_or_else(PoisonError::into_inner);
        }
        items.push_back(item);
        drop(items);
        self.not_empty.notify_one();
    }

    /// Removes the head item, blocking while the queue is empty.
    pub fn dequeue(&self) -> T {
        let mut items = self.lock();
        let item = loop {
            match items.pop_front() {
                Some(item) => break item,
                None => items = self.not_empty.wait(items).unwrap_or_else(PoisonError::into_inner),
            }
        };
        drop(items);
        self.not_full.notify_one();
        item
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fills_to_capacity_without_blocking() {
        let queue = WorkQueue::with_capacity(3);
        for i in 0..3 {
            queue.enqueue(i);
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.capacity(), 3);

        assert_eq!(queue.dequeue(), 0);
        assert_eq!(queue.dequeue(), 1);
        assert_eq!(queue.dequeue(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_blocks_producer_until_dequeue() {
        let queue = Arc::new(WorkQueue::with_capacity(1));
        queue.enqueue(1);

        let done = Arc::new(AtomicBool::new(false));
        let producer = {
            let queue = Arc::clone(&queue);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                queue.enqueue(2);
                done.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(100));
        assert!(!done.load(Ordering::SeqCst));

        assert_eq!(queue.dequeue(), 1);
        producer.join().unwrap();
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(queue.dequeue(), 2);
    }

    #[test]
    fn empty_queue_blocks_consumer_until_enqueue() {
        let queue = Arc::new(WorkQueue::with_capacity(2));
        let (tx, rx) = mpsc::channel();
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || tx.send(queue.dequeue()).unwrap())
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        queue.enqueue("conn");
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "conn");
        consumer.join().unwrap();
    }

    #[test]
    fn concurrent_consumers_lose_nothing() {
        const ITEMS: usize = 1000;
        const CONSUMERS: usize = 4;

        let queue = Arc::new(WorkQueue::with_capacity(DEFAULT_QUEUE_CAPACITY));
        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    loop {
                        match queue.dequeue() {
                            Some(item) => seen.push(item),
                            None => return seen,
                        }
                    }
                })
            })
            .collect();

        for i in 0..ITEMS {
            queue.enqueue(Some(i));
        }
        for _ in 0..CONSUMERS {
            queue.enqueue(None);
        }

        let mut all = Vec::with_capacity(ITEMS);
        for consumer in consumers {
            let seen = consumer.join().unwrap();
            // each consumer observes items in the order they were enqueued
            assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
            all.extend(seen);
        }
        all.sort_unstable();
        assert_eq!(all, (0..ITEMS).collect::<Vec<_>>());
    }

    #[test]
    fn concurrent_producers_keep_their_order() {
        const PRODUCERS: usize = 4;
        const ITEMS: usize = 500;

        let queue = Arc::new(WorkQueue::with_capacity(3));
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for item in 0..ITEMS {
                        queue.enqueue((producer, item));
                    }
                })
            })
            .collect();

        let mut next = [0; PRODUCERS];
        for _ in 0..PRODUCERS * ITEMS {
            let (producer, item) = queue.dequeue();
            assert_eq!(item, next[producer], "producer {producer} out of order");
            next[producer] += 1;
        }

        for producer in producers {
            producer.join().unwrap();
        }
        assert_eq!(next, [ITEMS; PRODUCERS]);
        assert!(queue.is_empty());
    }
}
