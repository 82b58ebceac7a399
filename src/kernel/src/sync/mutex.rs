//! Spin lock that keeps interrupts off while held.
//!
//! Interrupt handlers take the same lock as system calls, so a holder must
//! never be interrupted on its own CPU. The guard records whether interrupts
//! were on at acquisition and restores exactly that on drop.

use core::{
    cell::UnsafeCell,
    hint,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// A mutual exclusion lock for state shared with interrupt handlers.
pub struct IrqMutex<T> {
    /// The protected data.
    data: UnsafeCell<T>,
    /// Lock state: false = unlocked, true = locked.
    locked: AtomicBool,
}

// Safety: access to `data` only happens through a guard, and at most one
// guard exists at a time.
unsafe impl<T: Send> Send for IrqMutex<T> {}
unsafe impl<T: Send> Sync for IrqMutex<T> {}

impl<T> IrqMutex<T> {
    /// Create a new unlocked mutex protecting the given data.
    pub const fn new(data: T) -> Self {
        Self {
            data: UnsafeCell::new(data),
            locked: AtomicBool::new(false),
        }
    }

    /// Disables interrupts and acquires the lock, spinning while it is held.
    pub fn lock(&self) -> IrqMutexGuard<'_, T> {
        loop {
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
    }

    /// Acquires the lock if it is free. Interrupts are left as they were
    /// when it is not.
    pub fn try_lock(&self) -> Option<IrqMutexGuard<'_, T>> {
        let restore = irq::save_and_disable();
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(IrqMutexGuard {
                mutex: self,
                restore,
            })
        } else {
            irq::restore(restore);
            None
        }
    }

}

/// RAII guard that releases the mutex and restores interrupts when dropped.
pub struct IrqMutexGuard<'a, T> {
    mutex: &'a IrqMutex<T>,
    restore: bool,
}

impl<T> Deref for IrqMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // Safety: We hold the lock, so we have exclusive access.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for IrqMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // Safety: We hold the lock, so we have exclusive access.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> Drop for IrqMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.locked.store(false, Ordering::Release);
        irq::restore(self.restore);
    }
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
mod irq {
    use x86_64::instructions::interrupts;

    pub fn save_and_disable() -> bool {
        let enabled = interrupts::are_enabled();
        interrupts::disable();
        enabled
    }

    pub fn restore(enabled: bool) {
        if enabled {
            interrupts::enable();
        }
    }
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
mod irq {
    pub fn save_and_disable() -> bool {
        false
    }

    pub fn restore(_enabled: bool) {}
}
