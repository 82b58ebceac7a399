//! The per-process record.

use super::{ExecutionContext, FileTable, TaskId};
use triptych_common::limits::MAX_ARGUMENT_LEN;
use triptych_common::SysError;

/// Argument tail of a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arguments {
    bytes: [u8; MAX_ARGUMENT_LEN],
    len: usize,
}

impl Arguments {
    /// No arguments.
    pub const EMPTY: Self = Self {
        bytes: [0; MAX_ARGUMENT_LEN],
        len: 0,
    };

    /// Copies `tail`, which must fit in [`MAX_ARGUMENT_LEN`] bytes.
    pub fn new(tail: &[u8]) -> Result<Self, SysError> {
        if tail.len() > MAX_ARGUMENT_LEN {
            return Err(SysError::ArgumentsTooLong);
        }
        let mut args = Self::EMPTY;
        args.bytes[..tail.len()].copy_from_slice(tail);
        args.len = tail.len();
        Ok(args)
    }

    /// The stored bytes, without terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// True when the program was started without arguments.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Everything the kernel tracks about one live program.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    /// Own id.
    pub id: TaskId,
    /// Caller of `execute`. `None` for bootstrap shells.
    pub parent: Option<TaskId>,
    /// Where the parent's `execute` call is suspended.
    pub parent_context: ExecutionContext,
    /// Privileged stack pointer to restore when this task ends.
    pub parent_kernel_stack: usize,
    /// Descriptor slots.
    pub files: FileTable,
    /// Set once the program asked for the video window.
    pub uses_video: bool,
    /// Argument tail given at launch.
    pub arguments: Arguments,
}

impl TaskDescriptor {
    /// A descriptor with the console pair open and no video mapping.
    pub fn new(id: TaskId, parent: Option<TaskId>, parent_kernel_stack: usize, arguments: Arguments) -> Self {
        Self {
            id,
            parent,
            parent_context: ExecutionContext::EMPTY,
            parent_kernel_stack,
            files: FileTable::with_stdio(),
            uses_video: false,
            arguments,
        }
    }
}
