//! Process lifecycle.
//!
//! [`launch`] and [`terminate`] are the two halves of `execute`: launch
//! prepares a child and publishes it as the terminal's owner, terminate undoes
//! exactly that and tells the caller where the parent is waiting. The raw
//! transfers into and out of user mode are left to the architecture code.

pub mod command;
pub mod loader;

pub use command::Command;

use crate::fs::{Dentry, FileSystem};
use crate::mm::layout::USER_STACK_TOP;
use crate::state::SchedulerState;
use crate::task::{Arguments, ExecutionContext, FileTable, TaskDescriptor, TaskId};
use crate::terminal::rebind_video;
use log::{info, warn};
use triptych_common::{ExitStatus, SysError};
use triptych_hal::Platform;

/// Name of the program every terminal starts with.
pub const SHELL: &[u8] = b"shell";

/// Where and how to enter a freshly loaded program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserEntry {
    /// The task that will run.
    pub task: TaskId,
    /// First instruction.
    pub entry: usize,
    /// Initial user stack pointer.
    pub stack: usize,
}

/// What the caller of [`terminate`] has to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Unwind to the parent's suspended `execute`, which returns `status`.
    Resume {
        /// The parent's suspended call chain.
        context: ExecutionContext,
        /// Value `execute` returns in the parent.
        status: i64,
    },
    /// A bootstrap shell ended and was reloaded in place.
    Respawn(UserEntry),
}

/// Starts `command_line` as a child of the active terminal's owner.
///
/// On success the child is the terminal's owner and the privileged stack
/// pointer selects the child's kernel stack; the caller still has to capture
/// the parent's context and enter user mode. On failure nothing changes.
pub fn launch(
    state: &mut SchedulerState,
    hw: &mut impl Platform,
    fs: &impl FileSystem,
    command_line: &[u8],
) -> Result<UserEntry, SysError> {
    let command = Command::parse(command_line)?;
    let arguments = Arguments::new(command.arguments)?;
    let dentry = fs.lookup_by_name(command.name)?;
    loader::check_executable(fs, &dentry)?;
    let parent = state.current()?.id;
    let id = state.tasks.find_free()?;

    let entry = load_into(state, hw, fs, id, &dentry)?;
    let descriptor = TaskDescriptor::new(id, Some(parent), hw.kernel_stack_top(), arguments);
    if let Err(err) = state.tasks.insert(descriptor) {
        state.space.bind_user_window(hw, parent);
        return Err(err);
    }
    publish(state, hw, id);

    info!(
        "task {} started by {}: {}",
        id,
        parent,
        core::str::from_utf8(command.name).unwrap_or("?")
    );
    Ok(UserEntry {
        task: id,
        entry,
        stack: USER_STACK_TOP,
    })
}

/// Starts the shell of `terminal` under its reserved id. The terminal must
/// already be active.
pub fn launch_bootstrap_shell(
    state: &mut SchedulerState,
    hw: &mut impl Platform,
    fs: &impl FileSystem,
    terminal: usize,
) -> Result<UserEntry, SysError> {
    debug_assert_eq!(state.terminals.active(), terminal);
    let id = TaskId::bootstrap(terminal);
    let dentry = fs.lookup_by_name(SHELL)?;
    loader::check_executable(fs, &dentry)?;

    let entry = load_into(state, hw, fs, id, &dentry)?;
    let top = hw.task_stack_top(id.index());
    state
        .tasks
        .insert(TaskDescriptor::new(id, None, top, Arguments::EMPTY))?;
    publish(state, hw, id);

    info!("terminal {}: shell started as task {}", terminal, id);
    Ok(UserEntry {
        task: id,
        entry,
        stack: USER_STACK_TOP,
    })
}

/// Ends the active terminal's owner.
///
/// Open files are closed. A bootstrap shell is reloaded in place; any other
/// task is freed after its parent has been restored as owner, with the
/// parent's windows and kernel stack back in effect.
pub fn terminate(
    state: &mut SchedulerState,
    hw: &mut impl Platform,
    fs: &impl FileSystem,
    status: ExitStatus,
) -> Result<Termination, SysError> {
    let task = state.current_mut()?;
    let id = task.id;
    task.files.close_all();

    if id.is_bootstrap_shell() {
        info!("shell {} {}, restarting", id, status);
        return respawn_shell(state, hw, fs, id).map(Termination::Respawn);
    }

    let parent = task.parent.ok_or(SysError::NoProcess)?;
    let context = task.parent_context;
    let parent_stack = task.parent_kernel_stack;

    hw.set_kernel_stack_top(parent_stack);
    state.space.bind_user_window(hw, parent);
    state.tasks.free(id);
    let session = state.terminals.active_session_mut();
    session.owner = parent;
    session.kernel_stack_top = parent_stack;
    rebind_video(state, hw);

    info!("task {} {}", id, status);
    Ok(Termination::Resume {
        context,
        status: status.code(),
    })
}

fn respawn_shell(
    state: &mut SchedulerState,
    hw: &mut impl Platform,
    fs: &impl FileSystem,
    id: TaskId,
) -> Result<UserEntry, SysError> {
    let dentry = fs.lookup_by_name(SHELL)?;
    loader::check_executable(fs, &dentry)?;
    let entry = load_into(state, hw, fs, id, &dentry)?;

    let task = state.tasks.get_mut(id).ok_or(SysError::NoProcess)?;
    task.files = FileTable::with_stdio();
    task.uses_video = false;
    task.arguments = Arguments::EMPTY;
    publish(state, hw, id);

    Ok(UserEntry {
        task: id,
        entry,
        stack: USER_STACK_TOP,
    })
}

/// Binds the window to `id` and loads `dentry` into it. On failure the window
/// goes back to its previous owner.
fn load_into(
    state: &mut SchedulerState,
    hw: &mut impl Platform,
    fs: &impl FileSystem,
    id: TaskId,
    dentry: &Dentry,
) -> Result<usize, SysError> {
    let previous = state.space.user_owner();
    state.space.bind_user_window(hw, id);
    match loader::load(fs, hw.user_window(), dentry) {
        Ok(entry) => Ok(entry),
        Err(err) => {
            warn!("loading into task {} failed: {}", id, err);
            if let Some(previous) = previous {
                state.space.bind_user_window(hw, previous);
            }
            Err(err)
        }
    }
}

/// Makes `id` the active terminal's owner, running on its own kernel stack,
/// with the video window absent until it asks for it.
fn publish(state: &mut SchedulerState, hw: &mut impl Platform, id: TaskId) {
    let top = hw.task_stack_top(id.index());
    hw.set_kernel_stack_top(top);
    let session = state.terminals.active_session_mut();
    session.owner = id;
    session.kernel_stack_top = top;
    rebind_video(state, hw);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ImageFs;
    use crate::mm::layout::{self, PROGRAM_LOAD_OFFSET, USER_WINDOW_BASE};
    use crate::task::{FileDescriptor, FileOps};
    use crate::terminal::activate;
    use crate::testutil::{standard_image, MockMachine};
    use triptych_common::limits::{MAX_TASKS, MAX_TERMINALS};
    use triptych_hal::PrivilegeStack;

    fn boot(machine: &mut MockMachine, fs: &ImageFs) -> SchedulerState {
        let mut state = SchedulerState::new(machine);
        activate(&mut state, machine, 0);
        launch_bootstrap_shell(&mut state, machine, fs, 0).unwrap();
        state
    }

    #[test]
    fn test_bootstrap_shell_owns_terminal() {
        let image = standard_image();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let state = boot(&mut machine, &fs);

        let shell = TaskId::bootstrap(0);
        assert_eq!(state.current_task(), shell);
        assert!(state.tasks.get(shell).unwrap().parent.is_none());
        assert_eq!(machine.kernel_stack_top(), machine.task_stack_top(0));
        assert_eq!(machine.cached_user_frame(), Some(layout::user_frame(shell)));
    }

    #[test]
    fn test_launch_publishes_child() {
        let image = standard_image();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let mut state = boot(&mut machine, &fs);

        let entry = launch(&mut state, &mut machine, &fs, b"counter 10 20").unwrap();
        assert_eq!(entry.task.index(), MAX_TERMINALS);
        assert_eq!(entry.entry, 0x0804_8200);
        assert_eq!(entry.stack, USER_STACK_TOP);

        let child = state.current().unwrap();
        assert_eq!(child.id, entry.task);
        assert_eq!(child.parent, Some(TaskId::bootstrap(0)));
        assert_eq!(child.files.open_mask().bits(), 0b11);
        assert_eq!(child.arguments.as_bytes(), b"10 20");
        assert_eq!(child.parent_kernel_stack, machine.task_stack_top(0));
        assert_eq!(machine.kernel_stack_top(), machine.task_stack_top(entry.task.index()));
        assert_eq!(state.terminals.active_session().kernel_stack_top, machine.kernel_stack_top());
        assert_eq!(machine.cached_user_frame(), Some(layout::user_frame(entry.task)));
        assert_eq!(
            machine.peek(USER_WINDOW_BASE + PROGRAM_LOAD_OFFSET, 4),
            b"\x7fELF".to_vec()
        );
    }

    #[test]
    fn test_launch_then_terminate_round_trips() {
        let image = standard_image();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let mut state = boot(&mut machine, &fs);

        // Give the shell an open file so its mask differs from a fresh one.
        let shell = state.current_mut().unwrap();
        shell.files.install(2, FileDescriptor::new(FileOps::Regular, 0)).unwrap();
        let before_owner = state.current_task();
        let before_mask = state.current().unwrap().files.open_mask();
        let before_in_use = state.tasks.in_use_mask();
        let before_stack = machine.kernel_stack_top();
        let before_frame = machine.cached_user_frame();
        machine.poke(USER_WINDOW_BASE + 0x10, b"shell data");

        let entry = launch(&mut state, &mut machine, &fs, b"counter").unwrap();
        let slot = state.tasks.parent_context_slot(entry.task).unwrap();
        // SAFETY: the slot points into `state`, which outlives this write.
        unsafe { *slot = ExecutionContext::from_raw(0xdead_b000) };
        machine.poke(USER_WINDOW_BASE + 0x10, b"child data");

        let termination = terminate(&mut state, &mut machine, &fs, ExitStatus::Exited(7)).unwrap();
        assert_eq!(
            termination,
            Termination::Resume {
                context: ExecutionContext::from_raw(0xdead_b000),
                status: 7,
            }
        );
        assert_eq!(state.current_task(), before_owner);
        assert_eq!(state.current().unwrap().files.open_mask(), before_mask);
        assert_eq!(state.tasks.in_use_mask(), before_in_use);
        assert_eq!(machine.kernel_stack_top(), before_stack);
        assert_eq!(state.terminals.active_session().kernel_stack_top, before_stack);
        assert_eq!(machine.cached_user_frame(), before_frame);
        assert_eq!(machine.peek(USER_WINDOW_BASE + 0x10, 10), b"shell data".to_vec());
    }

    #[test]
    fn test_faulted_child_reports_sentinel() {
        let image = standard_image();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let mut state = boot(&mut machine, &fs);

        launch(&mut state, &mut machine, &fs, b"counter").unwrap();
        match terminate(&mut state, &mut machine, &fs, ExitStatus::Faulted).unwrap() {
            Termination::Resume { status, .. } => assert_eq!(status, 256),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_failed_launch_changes_nothing() {
        let image = standard_image();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let mut state = boot(&mut machine, &fs);
        let owner = state.current_task();
        let frame = machine.cached_user_frame();
        let flushes = machine.flushes();

        for (line, expected) in [
            (&b"nonexistent_file"[..], SysError::NotFound),
            (b"notes", SysError::NotExecutable),
            (b"rtc", SysError::NotExecutable),
            (b"", SysError::NotFound),
        ] {
            assert_eq!(launch(&mut state, &mut machine, &fs, line), Err(expected));
        }
        assert_eq!(state.current_task(), owner);
        assert_eq!(state.tasks.in_use_mask(), 0b1);
        assert_eq!(machine.cached_user_frame(), frame);
        assert_eq!(machine.flushes(), flushes);
    }

    #[test]
    fn test_failed_load_rolls_back_window() {
        let image = crate::testutil::ImageBuilder::new()
            .file("shell", &crate::testutil::program(0x0804_8100, 100))
            .file("broken", &crate::testutil::program(0x10, 100))
            .build();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let mut state = boot(&mut machine, &fs);

        assert_eq!(
            launch(&mut state, &mut machine, &fs, b"broken"),
            Err(SysError::NotExecutable)
        );
        assert_eq!(machine.cached_user_frame(), Some(layout::user_frame(TaskId::bootstrap(0))));
        assert_eq!(state.tasks.in_use_mask(), 0b1);
    }

    #[test]
    fn test_task_ids_run_out() {
        let image = standard_image();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let mut state = boot(&mut machine, &fs);

        for _ in MAX_TERMINALS..MAX_TASKS {
            launch(&mut state, &mut machine, &fs, b"counter").unwrap();
        }
        let owner = state.current_task();
        assert_eq!(
            launch(&mut state, &mut machine, &fs, b"counter"),
            Err(SysError::NoFreeTask)
        );
        assert_eq!(state.current_task(), owner);
    }

    #[test]
    fn test_shell_respawns_in_place() {
        let image = standard_image();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let mut state = boot(&mut machine, &fs);

        let shell = state.current_mut().unwrap();
        shell.parent_context = ExecutionContext::from_raw(0x5000);
        shell.uses_video = true;
        shell.files.install(4, FileDescriptor::new(FileOps::Directory, 0)).unwrap();
        machine.poke(USER_WINDOW_BASE + PROGRAM_LOAD_OFFSET, b"junk");
        machine.set_kernel_stack_top(0x42);

        let termination = terminate(&mut state, &mut machine, &fs, ExitStatus::Exited(0)).unwrap();
        let Termination::Respawn(entry) = termination else {
            panic!("shell returned to a parent");
        };
        assert_eq!(entry.task, TaskId::bootstrap(0));
        assert_eq!(entry.entry, 0x0804_8100);
        assert_eq!(state.current_task(), TaskId::bootstrap(0));

        let shell = state.current().unwrap();
        assert_eq!(shell.files.open_mask().bits(), 0b11);
        assert!(!shell.uses_video);
        assert_eq!(shell.parent_context, ExecutionContext::from_raw(0x5000));
        assert_eq!(machine.kernel_stack_top(), machine.task_stack_top(0));
        assert!(!state.space.video().present);
        assert_eq!(
            machine.peek(USER_WINDOW_BASE + PROGRAM_LOAD_OFFSET, 4),
            b"\x7fELF".to_vec()
        );
    }
}
