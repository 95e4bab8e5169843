//! Waker slot shared between a future and an interrupt handler, guarded by a critical section.

use core::cell::RefCell;
use core::task::Waker;

use critical_section::Mutex;

/// Holds the waker of the last task that polled a readiness future.
pub(crate) struct AtomicWaker {
    waker: Mutex<RefCell<Option<Waker>>>,
}

impl AtomicWaker {
    pub(crate) const fn new() -> Self {
        Self {
            waker: Mutex::new(RefCell::new(None)),
        }
    }

    /// Stores `new_waker`, replacing the previous one unless it would wake the same task.
    pub(crate) fn register(&self, new_waker: &Waker) {
        critical_section::with(|cs| {
            let mut slot = self.waker.borrow_ref_mut(cs);
            match slot.as_ref() {
                Some(w) if w.will_wake(new_waker) => {}
                _ => *slot = Some(new_waker.clone()),
            }
        });
    }

    /// Wakes and removes the stored waker, if any.
    pub(crate) fn wake(&self) {
        // Wake outside the critical section, the waker may run arbitrary code.
        if let Some(w) = critical_section::with(|cs| self.waker.borrow_ref_mut(cs).take()) {
            w.wake();
        }
    }
}
