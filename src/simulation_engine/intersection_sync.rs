use crate::simulation_engine::directions::Direction;
use log::{debug, trace};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};

/// Shared state of the intersection. Only ever touched with the lock held.
#[derive(Debug, Default)]
struct ControllerState {
    /// Origin currently allowed inside, `None` while the intersection is idle.
    owner: Option<Direction>,
    /// Vehicles inside right now, all from `owner`.
    active_count: usize,
    /// Origins with blocked vehicles, in the order their first vehicle blocked.
    wait_queue: VecDeque<Direction>,
    /// `queued[o]` is true iff `o` is in `wait_queue`.
    queued: [bool; 4],
    /// Vehicles blocked per origin.
    waiting: [usize; 4],
    /// Bumped each time an origin is handed the intersection.
    released: [u64; 4],
}

/// Point-in-time view of the controller, captured under its lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub owner: Option<Direction>,
    pub active_count: usize,
    pub wait_queue: Vec<Direction>,
    pub waiting: [usize; 4],
}

impl ControllerSnapshot {
    pub fn waiting_from(&self, origin: Direction) -> usize {
        self.waiting[origin.index()]
    }

    pub fn is_idle(&self) -> bool {
        self.owner.is_none() && self.active_count == 0 && self.wait_queue.is_empty()
    }
}

/// Admission controller for a four-way intersection.
///
/// Only vehicles from a single origin may be inside at once; the destination plays no
/// part in the decision. When the intersection empties, the origin that has been
/// waiting longest is handed ownership and all of its blocked vehicles are let in
/// together. Vehicles from the current owner's origin enter without waiting, so a
/// steady stream from one origin can hold the intersection indefinitely.
pub struct IntersectionSync {
    state: Mutex<ControllerState>,
    signals: [Condvar; 4],
}

impl IntersectionSync {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ControllerState::default()),
            signals: std::array::from_fn(|_| Condvar::new()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().expect("intersection lock poisoned")
    }

    /// Blocks until a vehicle from `origin` may enter, then counts it as inside.
    pub fn before_entry(&self, origin: Direction, destination: Direction) {
        let mut state = self.lock_state();
        match state.owner {
            None => {
                state.owner = Some(origin);
                state.active_count += 1;
                trace!(
                    "{} -> {}: intersection idle, {} takes ownership",
                    origin,
                    destination,
                    origin
                );
            }
            Some(owner) if owner == origin => {
                state.active_count += 1;
                trace!(
                    "{} -> {}: joins {} vehicle(s) inside",
                    origin,
                    destination,
                    state.active_count - 1
                );
            }
            Some(owner) => {
                let slot = origin.index();
                if !state.queued[slot] {
                    state.wait_queue.push_back(origin);
                    state.queued[slot] = true;
                }
                state.waiting[slot] += 1;
                let generation = state.released[slot];
                trace!(
                    "{} -> {}: blocked behind {}, queue {:?}",
                    origin,
                    destination,
                    owner,
                    state.wait_queue
                );

                // The hand-off in `after_exit` already counted this vehicle as inside.
                let _state = self.signals[slot]
                    .wait_while(state, |s| s.released[slot] == generation)
                    .expect("intersection lock poisoned");
                trace!("{} -> {}: admitted after wait", origin, destination);
            }
        }
    }

    /// Counts a vehicle as gone. The last one out hands the intersection to the
    /// origin at the head of the wait queue, or leaves it idle.
    pub fn after_exit(&self, origin: Direction, destination: Direction) {
        let mut state = self.lock_state();
        debug_assert!(
            state.active_count > 0,
            "after_exit({}, {}) without a matching before_entry",
            origin,
            destination
        );
        state.active_count = state.active_count.saturating_sub(1);
        if state.active_count > 0 {
            return;
        }

        match state.wait_queue.pop_front() {
            None => {
                state.owner = None;
                debug!("intersection idle");
            }
            Some(next) => {
                let slot = next.index();
                debug_assert!(state.waiting[slot] > 0, "{} queued with no vehicles", next);
                state.queued[slot] = false;
                state.owner = Some(next);
                // Admit every blocked vehicle of `next` in this critical section, so nobody
                // can slip in between the wake-up and the waiters reacquiring the lock.
                state.active_count = state.waiting[slot];
                state.waiting[slot] = 0;
                state.released[slot] = state.released[slot].wrapping_add(1);
                debug!(
                    "intersection handed to {} ({} vehicle(s)), queue {:?}",
                    next, state.active_count, state.wait_queue
                );
                self.signals[slot].notify_all();
            }
        }
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let state = self.lock_state();
        ControllerSnapshot {
            owner: state.owner,
            active_count: state.active_count,
            wait_queue: state.wait_queue.iter().copied().collect(),
            waiting: state.waiting,
        }
    }

    /// Tears the controller down. Panics if any vehicle is still inside or blocked.
    pub fn cleanup(self) {
        let state = self
            .state
            .into_inner()
            .expect("intersection lock poisoned");
        assert_eq!(
            state.active_count, 0,
            "cleanup with {} vehicle(s) inside",
            state.active_count
        );
        assert!(
            state.wait_queue.is_empty(),
            "cleanup with origins still queued: {:?}",
            state.wait_queue
        );
        assert!(
            state.waiting.iter().all(|&n| n == 0),
            "cleanup with blocked vehicles: {:?}",
            state.waiting
        );
    }
}

impl Default for IntersectionSync {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::simulation_engine::directions::Direction::{East, North, South, West};

    fn wait_until(
        sync: &IntersectionSync,
        what: &str,
        cond: impl Fn(&ControllerSnapshot) -> bool,
    ) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let snapshot = sync.snapshot();
            if cond(&snapshot) {
                return;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {}: {:?}",
                what,
                snapshot
            );
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn spawn_entry(
        sync: &Arc<IntersectionSync>,
        origin: Direction,
        destination: Direction,
    ) -> thread::JoinHandle<()> {
        let sync = Arc::clone(sync);
        thread::spawn(move || sync.before_entry(origin, destination))
    }

    #[test]
    fn blocked_origin_takes_over_when_owner_drains() {
        let sync = Arc::new(IntersectionSync::new());

        sync.before_entry(North, South);
        let s = sync.snapshot();
        assert_eq!(s.owner, Some(North));
        assert_eq!(s.active_count, 1);

        let s1 = spawn_entry(&sync, South, North);
        wait_until(&sync, "S1 to block", |s| s.waiting_from(South) == 1);
        assert_eq!(sync.snapshot().wait_queue, vec![South]);

        // N2 joins the current epoch even though South is waiting.
        sync.before_entry(North, East);
        let s = sync.snapshot();
        assert_eq!(s.active_count, 2);
        assert_eq!(s.wait_queue, vec![South]);

        sync.after_exit(North, South);
        let s = sync.snapshot();
        assert_eq!(s.active_count, 1);
        assert_eq!(s.owner, Some(North));
        assert_eq!(s.waiting_from(South), 1);
        assert!(!s1.is_finished());

        sync.after_exit(North, East);
        s1.join().unwrap();
        let s = sync.snapshot();
        assert_eq!(s.owner, Some(South));
        assert_eq!(s.active_count, 1);
        assert!(s.wait_queue.is_empty());

        sync.after_exit(South, North);
        assert!(sync.snapshot().is_idle());
        Arc::try_unwrap(sync).ok().unwrap().cleanup();
    }

    #[test]
    fn idle_intersection_admits_any_origin_immediately() {
        let sync = IntersectionSync::new();

        sync.before_entry(East, West);
        assert_eq!(sync.snapshot().active_count, 1);
        sync.after_exit(East, West);
        let s = sync.snapshot();
        assert_eq!(s.owner, None);
        assert_eq!(s.active_count, 0);

        sync.before_entry(West, South);
        let s = sync.snapshot();
        assert_eq!(s.owner, Some(West));
        assert_eq!(s.active_count, 1);
        sync.after_exit(West, South);
        sync.cleanup();
    }

    #[test]
    fn same_origin_waiters_share_one_queue_entry_and_enter_together() {
        let sync = Arc::new(IntersectionSync::new());
        sync.before_entry(North, South);

        let waiters: Vec<_> = (0..4).map(|_| spawn_entry(&sync, East, West)).collect();
        wait_until(&sync, "east vehicles to block", |s| s.waiting_from(East) == 4);
        assert_eq!(sync.snapshot().wait_queue, vec![East]);

        sync.after_exit(North, South);
        for w in waiters {
            w.join().unwrap();
        }
        let s = sync.snapshot();
        assert_eq!(s.owner, Some(East));
        assert_eq!(s.active_count, 4);
        assert!(s.wait_queue.is_empty());

        for _ in 0..4 {
            sync.after_exit(East, West);
        }
        assert!(sync.snapshot().is_idle());
    }

    #[test]
    fn origins_are_served_in_the_order_they_first_blocked() {
        let sync = Arc::new(IntersectionSync::new());
        sync.before_entry(North, South);

        let east = spawn_entry(&sync, East, West);
        wait_until(&sync, "east to queue", |s| s.wait_queue == vec![East]);
        let west = spawn_entry(&sync, West, East);
        wait_until(&sync, "west to queue", |s| s.wait_queue == vec![East, West]);
        let south = spawn_entry(&sync, South, North);
        wait_until(&sync, "south to queue", |s| s.wait_queue == vec![East, West, South]);
        // A second east vehicle piggybacks on the existing registration.
        let east2 = spawn_entry(&sync, East, North);
        wait_until(&sync, "second east to block", |s| s.waiting_from(East) == 2);
        assert_eq!(sync.snapshot().wait_queue, vec![East, West, South]);

        sync.after_exit(North, South);
        east.join().unwrap();
        east2.join().unwrap();
        let s = sync.snapshot();
        assert_eq!(s.owner, Some(East));
        assert_eq!(s.active_count, 2);
        assert_eq!(s.wait_queue, vec![West, South]);

        sync.after_exit(East, West);
        sync.after_exit(East, North);
        west.join().unwrap();
        assert_eq!(sync.snapshot().owner, Some(West));

        sync.after_exit(West, East);
        south.join().unwrap();
        assert_eq!(sync.snapshot().owner, Some(South));

        sync.after_exit(South, North);
        assert!(sync.snapshot().is_idle());
    }

    #[test]
    fn released_waiters_hold_the_intersection_against_other_origins() {
        let sync = Arc::new(IntersectionSync::new());
        sync.before_entry(North, South);
        let south = spawn_entry(&sync, South, North);
        wait_until(&sync, "south to block", |s| s.waiting_from(South) == 1);

        sync.after_exit(North, South);
        // Whether or not the south thread has resumed yet, it already counts as inside.
        let s = sync.snapshot();
        assert_eq!(s.owner, Some(South));
        assert_eq!(s.active_count, 1);

        let west = spawn_entry(&sync, West, East);
        wait_until(&sync, "west to block", |s| s.waiting_from(West) == 1);
        south.join().unwrap();
        assert_eq!(sync.snapshot().owner, Some(South));

        sync.after_exit(South, North);
        west.join().unwrap();
        assert_eq!(sync.snapshot().owner, Some(West));
        sync.after_exit(West, East);
    }

    #[test]
    fn same_origin_newcomer_leaving_does_not_end_the_handed_over_epoch() {
        for _ in 0..50 {
            let sync = Arc::new(IntersectionSync::new());
            sync.before_entry(North, South);
            let south = spawn_entry(&sync, South, North);
            wait_until(&sync, "south to block", |s| s.waiting_from(South) == 1);
            let east = spawn_entry(&sync, East, West);
            wait_until(&sync, "east to block", |s| s.waiting_from(East) == 1);

            sync.after_exit(North, South);
            // A South newcomer passes through before the woken waiter may have resumed.
            sync.before_entry(South, West);
            sync.after_exit(South, West);
            let s = sync.snapshot();
            assert_eq!(s.owner, Some(South));
            assert_eq!(s.active_count, 1);
            assert_eq!(s.wait_queue, vec![East]);

            south.join().unwrap();
            assert_eq!(sync.snapshot().owner, Some(South));
            sync.after_exit(South, North);
            east.join().unwrap();
            let s = sync.snapshot();
            assert_eq!(s.owner, Some(East));
            assert_eq!(s.active_count, 1);

            sync.after_exit(East, West);
            Arc::try_unwrap(sync).ok().unwrap().cleanup();
        }
    }

    #[test]
    fn only_one_origin_is_ever_inside_under_contention() {
        let sync = Arc::new(IntersectionSync::new());
        let inside: Arc<[AtomicUsize; 4]> = Arc::new(std::array::from_fn(|_| AtomicUsize::new(0)));
        let violation = Arc::new(AtomicBool::new(false));
        let contenders = 16;
        let barrier = Arc::new(Barrier::new(contenders));

        let handles: Vec<_> = (0..contenders)
            .map(|i| {
                let sync = Arc::clone(&sync);
                let inside = Arc::clone(&inside);
                let violation = Arc::clone(&violation);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let origin = Direction::ALL[i % 4];
                    let destination = Direction::ALL[(i + 1) % 4];
                    barrier.wait();
                    for _ in 0..50 {
                        sync.before_entry(origin, destination);
                        inside[origin.index()].fetch_add(1, Ordering::SeqCst);
                        for other in Direction::ALL.iter().filter(|d| **d != origin) {
                            if inside[other.index()].load(Ordering::SeqCst) > 0 {
                                violation.store(true, Ordering::SeqCst);
                            }
                        }
                        thread::sleep(Duration::from_micros(50));
                        inside[origin.index()].fetch_sub(1, Ordering::SeqCst);
                        sync.after_exit(origin, destination);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("vehicle thread panicked");
        }

        assert!(!violation.load(Ordering::SeqCst));
        assert!(sync.snapshot().is_idle());
        Arc::try_unwrap(sync).ok().unwrap().cleanup();
    }

    #[test]
    #[should_panic(expected = "cleanup with 1 vehicle(s) inside")]
    fn cleanup_with_vehicle_inside_panics() {
        let sync = IntersectionSync::new();
        sync.before_entry(South, East);
        sync.cleanup();
    }
}
