use std::sync::atomic::{AtomicI32, Ordering};

use crate::domain::cart::{MAX_ORDER_ID, MIN_ORDER_ID};

/// Hands out order ids from the closed range `[MIN_ORDER_ID, MAX_ORDER_ID]`,
/// wrapping back to the start once the range is exhausted.
///
/// Successive calls never return the same value within one wraparound cycle,
/// but the range is small and global, so a returned id may still collide
/// with an id already persisted for some user. Resolving that is the
/// caller's job; this type only guarantees the counter itself never races.
#[derive(Debug)]
pub struct OrderIdAllocator {
    next: AtomicI32,
}

impl OrderIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicI32::new(MIN_ORDER_ID),
        }
    }

    /// Return the current counter value and advance it, wrapping past
    /// [`MAX_ORDER_ID`]. Never fails.
    pub fn next(&self) -> i32 {
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(if current >= MAX_ORDER_ID {
                    MIN_ORDER_ID
                } else {
                    current + 1
                })
            })
            // The closure above always returns Some, so fetch_update cannot
            // actually land in the Err arm.
            .unwrap_or_else(|current| current)
    }
}

impl Default for OrderIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use super::OrderIdAllocator;
    use crate::domain::cart::{MAX_ORDER_ID, MIN_ORDER_ID};

    #[test]
    fn fresh_allocator_starts_at_one() {
        let ids = OrderIdAllocator::new();
        assert_eq!(ids.next(), MIN_ORDER_ID);
        assert_eq!(ids.next(), MIN_ORDER_ID + 1);
    }

    #[test]
    fn full_cycle_wraps_back_to_one() {
        let ids = OrderIdAllocator::new();
        for expected in MIN_ORDER_ID..=MAX_ORDER_ID {
            assert_eq!(ids.next(), expected);
        }
        assert_eq!(ids.next(), MIN_ORDER_ID, "10000th id should wrap to 1");
        assert_eq!(ids.next(), MIN_ORDER_ID + 1);
    }

    #[test]
    fn concurrent_callers_never_share_an_id_within_a_cycle() {
        let ids = Arc::new(OrderIdAllocator::new());
        let seen = Arc::new(Mutex::new(HashSet::new()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                let seen = Arc::clone(&seen);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let id = ids.next();
                        seen.lock().expect("lock poisoned").insert(id);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("allocator thread panicked");
        }

        // 800 draws fit inside one cycle, so all must be distinct.
        assert_eq!(seen.lock().expect("lock poisoned").len(), 800);
    }
}
