//! Counting gate bounding how many resources can be out at once

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Counting semaphore with blocking, timed and non-blocking acquire.
///
/// Waiters are parked on a condition variable and woken one per release.
/// A caller arriving while a woken waiter is being rescheduled may take the
/// permit first, so strict FIFO fairness is not guaranteed.
///
/// # Examples
///
/// ```
/// use esox_gatedpool::CountingGate;
/// use std::time::Duration;
///
/// let gate = CountingGate::new(1);
/// assert!(gate.acquire(None));
/// assert!(!gate.acquire(Some(Duration::from_millis(10))));
///
/// gate.release();
/// assert!(gate.try_acquire());
/// ```
#[derive(Debug)]
pub struct CountingGate {
    permits: Mutex<usize>,
    released: Condvar,
    max_permits: usize,
}

impl CountingGate {
    /// Create a gate with every permit available
    pub fn new(max_permits: usize) -> Self {
        Self {
            permits: Mutex::new(max_permits),
            released: Condvar::new(),
            max_permits,
        }
    }

    /// Wait for a permit; `None` waits forever.
    ///
    /// Returns `false` if the timeout elapsed first, in which case no permit
    /// was taken.
    pub fn acquire(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut permits = self.permits.lock();

        while *permits == 0 {
            match deadline {
                Some(deadline) => {
                    if self.released.wait_until(&mut permits, deadline).timed_out() {
                        if *permits == 0 {
                            return false;
                        }
                        break;
                    }
                }
                None => self.released.wait(&mut permits),
            }
        }

        *permits -= 1;
        true
    }

    /// Take a permit only if one is free right now
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Hand a permit back and wake one waiter
    pub fn release(&self) {
        {
            let mut permits = self.permits.lock();
            debug_assert!(*permits < self.max_permits, "gate released above its capacity");
            *permits += 1;
        }
        self.released.notify_one();
    }

    /// Permits currently free
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }

    pub fn max_permits(&self) -> usize {
        self.max_permits
    }

    pub(crate) fn acquire_permit(&self, timeout: Option<Duration>) -> Option<Permit<'_>> {
        self.acquire(timeout).then(|| Permit::held(self))
    }

    pub(crate) fn try_acquire_permit(&self) -> Option<Permit<'_>> {
        self.try_acquire().then(|| Permit::held(self))
    }

    /// Take charge of a permit acquired earlier, e.g. by a resource on its way back
    pub(crate) fn adopt_permit(&self) -> Permit<'_> {
        Permit::held(self)
    }
}

/// A permit that goes back to its gate on drop unless it is kept.
///
/// Releases on unwind too, so a panicking factory or hook cannot strand it.
pub(crate) struct Permit<'a> {
    gate: &'a CountingGate,
    held: bool,
}

impl<'a> Permit<'a> {
    fn held(gate: &'a CountingGate) -> Self {
        Self { gate, held: true }
    }

    /// Leave the permit taken; it now travels with a checked-out resource
    pub fn keep(mut self) {
        self.held = false;
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.held {
            self.gate.release();
        }
    }
}
