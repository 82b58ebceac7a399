//! Architecture-specific implementations.
//!
//! Only bare-metal x86_64 is supported. The portable modules never reach in
//! here; they see the machine through the `triptych_hal` traits.

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

#[cfg(target_arch = "x86_64")]
pub use x86_64::*;
