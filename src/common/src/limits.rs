//! Fixed capacities of the kernel.

/// Number of task descriptors, and therefore of physical user frames.
pub const MAX_TASKS: usize = 8;

/// Number of virtual terminals. Task ids below this value belong to the
/// bootstrap shell of the terminal with the same index.
pub const MAX_TERMINALS: usize = 3;

/// Descriptor slots per task.
pub const MAX_OPEN_FILES: usize = 8;

/// First descriptor slot that `open` may hand out. Slots below it are the
/// console pair seeded at launch.
pub const FIRST_ASSIGNABLE_FD: usize = 2;

/// Longest argument tail stored for a task.
pub const MAX_ARGUMENT_LEN: usize = 128;

/// Longest file name in the file system.
pub const MAX_FILE_NAME_LEN: usize = 32;

/// Longest command line accepted by `execute`, including the terminator.
pub const MAX_COMMAND_LEN: usize = 256;

/// Size of a terminal's line-input buffer, newline included.
pub const LINE_BUFFER_LEN: usize = 128;

/// Scheduler quantum source.
pub const TIMER_FREQUENCY_HZ: u32 = 100;
