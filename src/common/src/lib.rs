//! Definitions shared between the triptych kernel and the programs it runs.
//!
//! Everything in here is part of the user/kernel contract: syscall numbers,
//! status codes, file types, and the fixed capacity limits.

#![no_std]
#![warn(missing_docs)]

pub mod abi;
pub mod capability;
pub mod error;
pub mod limits;

pub use abi::{ExitStatus, Syscall};
pub use capability::{Access, FileType};
pub use error::SysError;
