//! System-wide error types for triptych.

use crate::abi::SYSCALL_FAILURE;
use core::fmt;

/// Reasons a kernel operation can fail.
///
/// Every variant crosses the trap boundary as the same value,
/// [`SYSCALL_FAILURE`]; the variant itself only reaches the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SysError {
    /// No file with that name
    NotFound,
    /// File is not a loadable program
    NotExecutable,
    /// Name longer than the file system allows
    NameTooLong,
    /// Argument tail does not fit
    ArgumentsTooLong,
    /// Every task id is taken
    NoFreeTask,
    /// Every descriptor slot is taken
    NoFreeDescriptor,
    /// Descriptor slot closed or out of range
    BadDescriptor,
    /// Pointer outside the caller's window
    BadAddress,
    /// Argument value rejected
    InvalidArgument,
    /// Write to the read-only file system
    ReadOnly,
    /// Operation not implemented
    NotSupported,
    /// File system read failed
    Io,
    /// No task owns the active terminal
    NoProcess,
}

impl SysError {
    /// The value returned to user space.
    pub fn code(self) -> i64 {
        SYSCALL_FAILURE
    }
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SysError::NotFound => write!(f, "file not found"),
            SysError::NotExecutable => write!(f, "not an executable"),
            SysError::NameTooLong => write!(f, "file name too long"),
            SysError::ArgumentsTooLong => write!(f, "arguments too long"),
            SysError::NoFreeTask => write!(f, "no free task slot"),
            SysError::NoFreeDescriptor => write!(f, "no free file descriptor"),
            SysError::BadDescriptor => write!(f, "bad file descriptor"),
            SysError::BadAddress => write!(f, "bad user address"),
            SysError::InvalidArgument => write!(f, "invalid argument"),
            SysError::ReadOnly => write!(f, "read-only file system"),
            SysError::NotSupported => write!(f, "operation not supported"),
            SysError::Io => write!(f, "I/O error"),
            SysError::NoProcess => write!(f, "no current process"),
        }
    }
}
