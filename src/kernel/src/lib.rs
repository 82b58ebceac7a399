//! triptych kernel
//!
//! A single-CPU teaching kernel: three virtual terminals, each running its own
//! shell, time-shared by a round-robin timer scheduler. Programs are loaded
//! from a read-only file system image into one fixed user window and talk to
//! the kernel through ten system calls.
//!
//! # Architecture
//!
//! The kernel is structured into the following modules:
//! - `mm`: User window and video window bindings
//! - `task`: Task ids, descriptors and open-file tables
//! - `process`: Launching and terminating programs
//! - `terminal`: Sessions, keyboard line discipline and console output
//! - `sched`: Timer-driven terminal rotation
//! - `syscall`: The trap interface
//! - `fs`: The read-only file system image
//! - `rtc`: Per-terminal virtual clocks
//! - `arch`: Platform-specific code (bare metal only)
//!
//! Everything outside `arch` talks to hardware only through the
//! `triptych_hal` traits and runs unchanged in host tests.
//!
//! # Safety
//!
//! All unsafe code is documented with safety invariants explaining why the
//! usage is correct.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(
    all(target_arch = "x86_64", target_os = "none"),
    feature(abi_x86_interrupt)
)]
#![warn(missing_docs)]

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
extern crate alloc;

pub mod fault;
pub mod fs;
pub mod logger;
pub mod mm;
pub mod process;
pub mod rtc;
pub mod sched;
pub mod state;
pub mod sync;
pub mod syscall;
pub mod task;
pub mod terminal;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod allocator;
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod arch;
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod boot;
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod selftest;

#[cfg(test)]
mod testutil;

/// Maximum level the logger lets through.
pub const LOG_LEVEL: log::LevelFilter = if cfg!(feature = "verbose") {
    log::LevelFilter::Trace
} else {
    log::LevelFilter::Info
};
