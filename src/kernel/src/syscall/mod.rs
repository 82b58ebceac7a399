//! System call interface.
//!
//! User programs trap through vector `0x80` with the call number in the first
//! register and up to three arguments in the next ones. [`dispatch`] decodes
//! the call, validates every user pointer against the user window and either
//! completes it or tells the architecture code what transfer is needed.
//! Every failure reaches the program as `-1`.

pub mod file;
pub mod user;

use crate::fs::FileSystem;
use crate::mm::layout::VIDEO_WINDOW;
use crate::process::{self, Termination, UserEntry};
use crate::state::SchedulerState;
use crate::terminal::rebind_video;
use file::ReadOutcome;
use log::debug;
use triptych_common::abi::SYSCALL_FAILURE;
use triptych_common::limits::MAX_COMMAND_LEN;
use triptych_common::{ExitStatus, SysError, Syscall};
use triptych_hal::Platform;
use user::{read_c_string, user_slice};

/// Something a blocked call is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// A completed line on the active terminal, to be copied to `buf`.
    Line {
        /// User address of the destination.
        buf: usize,
        /// Capacity of the destination.
        len: usize,
    },
    /// The next tick of the active terminal's virtual clock.
    Rtc,
}

/// How a system call continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallAction {
    /// Return this value to the caller.
    Complete(i64),
    /// Enter the newly launched child; the caller's call chain is suspended
    /// until the child halts.
    Launch(UserEntry),
    /// The calling task is gone.
    Exit(Termination),
    /// Poll [`poll_wait`] with interrupts enabled until it yields a value.
    Wait(Wait),
}

/// Runs system call `number` for the active terminal's owner.
pub fn dispatch(
    state: &mut SchedulerState,
    hw: &mut impl Platform,
    fs: &impl FileSystem,
    number: u64,
    args: [u64; 3],
) -> SyscallAction {
    let Ok(call) = Syscall::try_from(number) else {
        debug!("unknown system call {}", number);
        return SyscallAction::Complete(SYSCALL_FAILURE);
    };
    let [a, b, c] = args.map(|arg| arg as usize);

    let result = match call {
        Syscall::Halt => process::terminate(state, hw, fs, ExitStatus::Exited(a as u8))
            .map(SyscallAction::Exit),
        Syscall::Execute => execute(state, hw, fs, a).map(SyscallAction::Launch),
        Syscall::Read => file::read(state, hw, fs, a, b, c).map(|outcome| match outcome {
            ReadOutcome::Done(count) => SyscallAction::Complete(count as i64),
            ReadOutcome::Blocked(wait) => SyscallAction::Wait(wait),
        }),
        Syscall::Write => file::write(state, hw, a, b, c).map(complete),
        Syscall::Open => file::open(state, hw, fs, a).map(complete),
        Syscall::Close => file::close(state, a).map(|()| SyscallAction::Complete(0)),
        Syscall::GetArgs => get_arguments(state, hw, a, b).map(|()| SyscallAction::Complete(0)),
        Syscall::Vidmap => map_video(state, hw, a).map(complete),
        Syscall::SetHandler | Syscall::SigReturn => Err(SysError::NotSupported),
    };

    result.unwrap_or_else(|err| {
        debug!("{:?} failed: {}", call, err);
        SyscallAction::Complete(err.code())
    })
}

/// Checks whether a blocked call can finish. Called with the kernel state
/// locked, between spells of waiting with interrupts enabled.
pub fn poll_wait(state: &mut SchedulerState, hw: &mut impl Platform, wait: Wait) -> Option<i64> {
    match wait {
        Wait::Line { buf, len } => match file::take_line(state, hw, buf, len) {
            Ok(line) => line.map(|count| count as i64),
            Err(err) => Some(err.code()),
        },
        Wait::Rtc => state.terminals.active_session().rtc_fired.then_some(0),
    }
}

fn complete(value: usize) -> SyscallAction {
    SyscallAction::Complete(value as i64)
}

/// The command has to be copied out before the child's load replaces the
/// caller's window.
fn execute(
    state: &mut SchedulerState,
    hw: &mut impl Platform,
    fs: &impl FileSystem,
    command: usize,
) -> Result<UserEntry, SysError> {
    let mut line = [0u8; MAX_COMMAND_LEN];
    let len = read_c_string(hw, command, &mut line)?;
    process::launch(state, hw, fs, &line[..len])
}

fn get_arguments(
    state: &mut SchedulerState,
    hw: &mut impl Platform,
    buf: usize,
    len: usize,
) -> Result<(), SysError> {
    let arguments = state.current()?.arguments;
    let bytes = arguments.as_bytes();
    if bytes.is_empty() || bytes.len() + 1 > len {
        return Err(SysError::ArgumentsTooLong);
    }
    let out = user_slice(hw, buf, bytes.len() + 1)?;
    out[..bytes.len()].copy_from_slice(bytes);
    out[bytes.len()] = 0;
    Ok(())
}

/// Gives the caller the video window. When `out` is not null the window's
/// address is also stored there.
fn map_video(state: &mut SchedulerState, hw: &mut impl Platform, out: usize) -> Result<usize, SysError> {
    const ADDRESS_LEN: usize = core::mem::size_of::<u64>();
    if out != 0 {
        user_slice(hw, out, ADDRESS_LEN)?;
    }
    state.current_mut()?.uses_video = true;
    rebind_video(state, hw);
    if out != 0 {
        user_slice(hw, out, ADDRESS_LEN)?.copy_from_slice(&(VIDEO_WINDOW as u64).to_le_bytes());
    }
    Ok(VIDEO_WINDOW)
}
