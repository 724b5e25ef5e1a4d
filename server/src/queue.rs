use std::sync::{Mutex, MutexGuard};

/// Hand-off point between per-connection receive threads and the tick thread.
///
/// Producers push under the lock; the consumer performs a single
/// pending/current swap per tick and then drains its vector without further
/// locking. The critical section is limited to the enqueue and to the swap
/// itself.
pub struct SwapQueue<T> {
    pending: Mutex<Vec<T>>,
}

impl<T> SwapQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, item: T) {
        self.lock().push(item);
    }

    /// Exchanges the pending queue with the consumer-owned `current` vector.
    /// `current` is expected to be drained from the previous tick; its
    /// (empty) storage becomes the new pending buffer, keeping allocations
    /// stable across ticks.
    pub fn swap(&self, current: &mut Vec<T>) {
        debug_assert!(current.is_empty(), "consumer must drain before swapping");
        std::mem::swap(&mut *self.lock(), current);
    }

    pub fn pending_len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        // a panicked producer cannot leave the queue in a torn state; the
        // vector is always valid, so poisoning is safe to bypass
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Default for SwapQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn swap_takes_everything_pending() {
        let queue = SwapQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);

        let mut current = Vec::new();
        queue.swap(&mut current);
        assert_eq!(current, vec![1, 2, 3]);
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn items_pushed_after_swap_wait_for_the_next_one() {
        let queue = SwapQueue::new();
        queue.push(1);

        let mut current = Vec::new();
        queue.swap(&mut current);
        queue.push(2);

        assert_eq!(current, vec![1]);
        current.clear();
        queue.swap(&mut current);
        assert_eq!(current, vec![2]);
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        const PRODUCERS: u64 = 8;
        const PER_PRODUCER: u64 = 1000;

        let queue = Arc::new(SwapQueue::new());
        let mut handles = Vec::new();
        for producer in 0..PRODUCERS {
            let queue = queue.clone();
            handles.push(thread::spawn(move || {
                for item in 0..PER_PRODUCER {
                    queue.push(producer * PER_PRODUCER + item);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let mut current = Vec::new();
        queue.swap(&mut current);
        assert_eq!(current.len(), (PRODUCERS * PER_PRODUCER) as usize);

        current.sort_unstable();
        current.dedup();
        assert_eq!(current.len(), (PRODUCERS * PER_PRODUCER) as usize);
    }
}
