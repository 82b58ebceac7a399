//! Synchronization primitives.
//!
//! The kernel runs on one CPU, so the only concurrency is interrupts. The
//! single shared state lives behind an [`IrqMutex`], which masks interrupts
//! for as long as it is held.
//!
//! # Example
//!
//! ```ignore
//! use triptych_kernel::sync::IrqMutex;
//!
//! let counter = IrqMutex::new(0u32);
//! {
//!     let mut guard = counter.lock();
//!     *guard += 1;
//! } // interrupts are back to what they were here
//! ```

mod mutex;

pub use mutex::{IrqMutex, IrqMutexGuard};
