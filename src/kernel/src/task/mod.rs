//! Task descriptors and their per-task resources.

use core::fmt;
use triptych_common::limits::{MAX_TASKS, MAX_TERMINALS};

pub mod descriptor;
pub mod fd;
pub mod table;

pub use descriptor::{Arguments, TaskDescriptor};
pub use fd::{FileDescriptor, FileOps, FileTable, OpenFiles};
pub use table::TaskTable;

/// Identifier of a task.
///
/// Doubles as the selector of the task's physical frame and of its kernel
/// stack, so it is always below [`MAX_TASKS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u8);

impl TaskId {
    /// Returns `None` when `raw` is out of range.
    pub const fn new(raw: usize) -> Option<Self> {
        if raw < MAX_TASKS {
            Some(TaskId(raw as u8))
        } else {
            None
        }
    }

    /// The id reserved for the bootstrap shell of `terminal`.
    pub const fn bootstrap(terminal: usize) -> Self {
        assert!(terminal < MAX_TERMINALS);
        TaskId(terminal as u8)
    }

    /// Index into per-task arrays.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Bootstrap shells are respawned instead of returning to a parent.
    pub const fn is_bootstrap_shell(self) -> bool {
        self.index() < MAX_TERMINALS
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A suspended kernel call chain.
///
/// The value is the kernel stack pointer saved by the context switch
/// primitives. Only those primitives give it meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct ExecutionContext(usize);

impl ExecutionContext {
    /// No saved context.
    pub const EMPTY: Self = ExecutionContext(0);

    /// Wraps a raw saved stack pointer.
    pub const fn from_raw(sp: usize) -> Self {
        ExecutionContext(sp)
    }

    /// The raw saved stack pointer.
    pub const fn as_raw(self) -> usize {
        self.0
    }

    /// True until something has been saved here.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_range() {
        assert!(TaskId::new(MAX_TASKS - 1).is_some());
        assert!(TaskId::new(MAX_TASKS).is_none());
    }

    #[test]
    fn test_bootstrap_ids() {
        for terminal in 0..MAX_TERMINALS {
            assert!(TaskId::bootstrap(terminal).is_bootstrap_shell());
        }
        assert!(!TaskId::new(MAX_TERMINALS).unwrap().is_bootstrap_shell());
    }
}
