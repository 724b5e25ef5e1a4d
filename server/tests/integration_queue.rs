/// Property tests for the pending/current swap queue under randomized
/// producer interleavings.
use std::sync::{Arc, Barrier};
use std::thread;

use riftgate_server::SwapQueue;

const PRODUCERS: usize = 8;
const PER_PRODUCER: usize = 500;

#[test]
fn randomized_interleavings_lose_and_duplicate_nothing() {
    for seed in 0..20 {
        let queue = Arc::new(SwapQueue::new());
        let barrier = Arc::new(Barrier::new(PRODUCERS + 1));

        let mut handles = Vec::new();
        for producer in 0..PRODUCERS {
            let queue = queue.clone();
            let barrier = barrier.clone();
            handles.push(thread::spawn(move || {
                let rng = fastrand::Rng::with_seed(seed * 1000 + producer as u64);
                barrier.wait();
                for item in 0..PER_PRODUCER {
                    queue.push((producer, item));
                    if rng.u8(0..4) == 0 {
                        thread::yield_now();
                    }
                }
            }));
        }

        barrier.wait();

        // drain concurrently with production, in many small swaps
        let mut collected: Vec<(usize, usize)> = Vec::new();
        let mut current = Vec::new();
        while collected.len() < PRODUCERS * PER_PRODUCER {
            queue.swap(&mut current);
            collected.append(&mut current);
            thread::yield_now();
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collected.len(), PRODUCERS * PER_PRODUCER, "seed {}", seed);

        // no duplicates or losses
        let mut sorted = collected.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), PRODUCERS * PER_PRODUCER, "seed {}", seed);

        // each producer's items arrive in its push order
        for producer in 0..PRODUCERS {
            let items: Vec<usize> = collected
                .iter()
                .filter(|(from, _)| *from == producer)
                .map(|(_, item)| *item)
                .collect();
            assert!(
                items.windows(2).all(|pair| pair[0] < pair[1]),
                "producer {} reordered (seed {})",
                producer,
                seed
            );
        }
    }
}

#[test]
fn everything_enqueued_before_the_swap_is_visible_after_it() {
    let queue = Arc::new(SwapQueue::new());

    let mut handles = Vec::new();
    for producer in 0..PRODUCERS {
        let queue = queue.clone();
        handles.push(thread::spawn(move || {
            queue.push(producer);
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // all producers finished before this single swap: every item must be in it
    let mut current = Vec::new();
    queue.swap(&mut current);
    current.sort_unstable();
    assert_eq!(current, (0..PRODUCERS).collect::<Vec<_>>());

    // and nothing is left behind for the next tick
    let mut next = Vec::new();
    queue.swap(&mut next);
    assert!(next.is_empty());
}
