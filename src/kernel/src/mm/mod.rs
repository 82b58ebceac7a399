//! Address space management.
//!
//! The kernel keeps a single set of page tables. User programs see exactly
//! two windows into it, and both are remapped in place when ownership moves.

pub mod layout;
pub mod window;

pub use window::{AddressSpace, VideoBinding};
