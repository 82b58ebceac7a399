//! Trap interface.
//!
//! Programs enter the kernel with `int 0x80`, the call number in `rax` and up
//! to three arguments in `rbx`, `rcx` and `rdx`. The result comes back in
//! `rax`.

use core::fmt;

/// Interrupt vector of the syscall gate.
pub const SYSCALL_VECTOR: u8 = 0x80;

/// Value returned by every failing syscall.
pub const SYSCALL_FAILURE: i64 = -1;

/// Status a parent observes when its child was killed by a CPU exception.
/// Outside the range of voluntary statuses.
pub const FAULT_EXIT_STATUS: i64 = 256;

/// Signature every executable image starts with.
pub const EXECUTABLE_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Offset of the little-endian 32-bit entry address inside an image.
pub const ENTRY_POINT_OFFSET: usize = 24;

/// Syscall numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum Syscall {
    /// `halt(status)`: end the calling program.
    Halt = 1,
    /// `execute(command)`: run a program and wait for it.
    Execute = 2,
    /// `read(fd, buf, n)`
    Read = 3,
    /// `write(fd, buf, n)`
    Write = 4,
    /// `open(name)`
    Open = 5,
    /// `close(fd)`
    Close = 6,
    /// `getargs(buf, n)`
    GetArgs = 7,
    /// `vidmap(out)`: map the video window.
    Vidmap = 8,
    /// Signal handler registration. Not supported.
    SetHandler = 9,
    /// Signal return. Not supported.
    SigReturn = 10,
}

impl TryFrom<u64> for Syscall {
    type Error = u64;

    fn try_from(number: u64) -> Result<Self, Self::Error> {
        Ok(match number {
            1 => Syscall::Halt,
            2 => Syscall::Execute,
            3 => Syscall::Read,
            4 => Syscall::Write,
            5 => Syscall::Open,
            6 => Syscall::Close,
            7 => Syscall::GetArgs,
            8 => Syscall::Vidmap,
            9 => Syscall::SetHandler,
            10 => Syscall::SigReturn,
            other => return Err(other),
        })
    }
}

/// How a program ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitStatus {
    /// Voluntary `halt` with the low byte of its argument.
    Exited(u8),
    /// Killed by an unrecoverable CPU exception.
    Faulted,
}

impl ExitStatus {
    /// Value handed back to the parent as the result of `execute`.
    pub fn code(self) -> i64 {
        match self {
            ExitStatus::Exited(status) => i64::from(status),
            ExitStatus::Faulted => FAULT_EXIT_STATUS,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(status) => write!(f, "exited with {}", status),
            ExitStatus::Faulted => write!(f, "killed by exception"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syscall_numbers() {
        assert_eq!(Syscall::try_from(1), Ok(Syscall::Halt));
        assert_eq!(Syscall::try_from(10), Ok(Syscall::SigReturn));
        assert_eq!(Syscall::try_from(0), Err(0));
        assert_eq!(Syscall::try_from(11), Err(11));
    }

    #[test]
    fn test_fault_status_outside_byte_range() {
        assert_eq!(ExitStatus::Exited(255).code(), 255);
        assert_eq!(ExitStatus::Faulted.code(), 256);
        assert!(ExitStatus::Faulted.code() > i64::from(u8::MAX));
    }
}
