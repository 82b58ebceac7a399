//! Terminal subsystem for triptych.
//!
//! Each terminal is a session with its own owner task, suspended call chain,
//! cursor, line buffer and virtual clock. Two indices select among them:
//! the *active* terminal owns the CPU, the *shown* terminal owns the display.
//!
//! # Architecture
//!
//! - `line`: Line-input buffer
//! - `keyboard`: Scancode decoding and echo

pub mod keyboard;
pub mod line;

pub use keyboard::{handle_input, Input, KeyboardDecoder};
pub use line::LineBuffer;

use crate::rtc::RtcRate;
use crate::state::SchedulerState;
use crate::task::{ExecutionContext, TaskId};
use log::{debug, info};
use triptych_common::limits::MAX_TERMINALS;
use triptych_hal::{Cursor, FrameBuffer, Mmu, Platform, PrivilegeStack, TextScreen};

/// State of one virtual terminal.
#[derive(Debug, Clone)]
pub struct TerminalSession {
    /// Where this terminal's call chain was suspended when it lost the CPU.
    pub context: ExecutionContext,
    /// Privileged stack pointer to load when the terminal gets the CPU back.
    pub kernel_stack_top: usize,
    /// Task currently running on this terminal.
    pub owner: TaskId,
    /// Output position.
    pub cursor: Cursor,
    /// Keyboard input not yet read.
    pub line: LineBuffer,
    /// Rate of this terminal's virtual clock.
    pub rtc_rate: RtcRate,
    /// Set by the clock interrupt, cleared by `read` on the clock.
    pub rtc_fired: bool,
}

/// The fixed set of terminals.
#[derive(Debug)]
pub struct Terminals {
    sessions: [TerminalSession; MAX_TERMINALS],
    active: usize,
    shown: usize,
}

impl Terminals {
    /// Terminal `i` starts out owned by bootstrap task `i` on that task's stack.
    pub fn new(stacks: &impl PrivilegeStack) -> Self {
        Self {
            sessions: core::array::from_fn(|i| TerminalSession {
                context: ExecutionContext::EMPTY,
                kernel_stack_top: stacks.task_stack_top(i),
                owner: TaskId::bootstrap(i),
                cursor: Cursor::default(),
                line: LineBuffer::new(),
                rtc_rate: RtcRate::DEFAULT,
                rtc_fired: false,
            }),
            active: 0,
            shown: 0,
        }
    }

    /// Index of the terminal that owns the CPU.
    pub fn active(&self) -> usize {
        self.active
    }

    /// Index of the terminal on the display.
    pub fn shown(&self) -> usize {
        self.shown
    }

    /// Session `index`.
    pub fn session(&self, index: usize) -> &TerminalSession {
        &self.sessions[index]
    }

    /// Mutable session `index`.
    pub fn session_mut(&mut self, index: usize) -> &mut TerminalSession {
        &mut self.sessions[index]
    }

    /// All sessions.
    pub fn sessions_mut(&mut self) -> impl Iterator<Item = &mut TerminalSession> {
        self.sessions.iter_mut()
    }

    /// The session that owns the CPU.
    pub fn active_session(&self) -> &TerminalSession {
        &self.sessions[self.active]
    }

    /// Mutable session that owns the CPU.
    pub fn active_session_mut(&mut self) -> &mut TerminalSession {
        &mut self.sessions[self.active]
    }

    /// Mutable session on the display.
    pub fn shown_session_mut(&mut self) -> &mut TerminalSession {
        &mut self.sessions[self.shown]
    }

    /// Page the active terminal's output goes to.
    pub fn active_target(&self) -> FrameBuffer {
        if self.active == self.shown {
            FrameBuffer::Primary
        } else {
            FrameBuffer::Shadow(self.active)
        }
    }

    /// Address of session `index`'s saved context, for the context switch
    /// primitives.
    pub fn context_slot(&mut self, index: usize) -> *mut ExecutionContext {
        &mut self.sessions[index].context
    }
}

/// Hands the CPU to terminal `next`, first recording where the outgoing
/// terminal's kernel stack stands.
pub fn set_active(state: &mut SchedulerState, hw: &mut impl Platform, next: usize) {
    // The outgoing owner is already current in its session: launch and
    // terminate publish it.
    state.terminals.active_session_mut().kernel_stack_top = hw.kernel_stack_top();
    activate(state, hw, next);
}

/// Makes `next` the active terminal without snapshotting the outgoing one.
///
/// Restores the incoming terminal's privileged stack pointer and remaps both
/// windows for its owner.
pub fn activate(state: &mut SchedulerState, hw: &mut impl Platform, next: usize) {
    state.terminals.active = next;
    let session = &state.terminals.sessions[next];
    hw.set_kernel_stack_top(session.kernel_stack_top);
    let owner = session.owner;
    state.space.bind_user_window(hw, owner);
    rebind_video(state, hw);
    debug!("terminal {} active, owner {}", next, owner);
}

/// Puts terminal `next` on the display.
///
/// The outgoing terminal's screen is saved to its shadow page before the
/// incoming one's shadow is copied in.
pub fn set_shown(state: &mut SchedulerState, hw: &mut impl Platform, next: usize) {
    let previous = state.terminals.shown;
    if next >= MAX_TERMINALS || next == previous {
        return;
    }
    hw.copy(FrameBuffer::Primary, FrameBuffer::Shadow(previous));
    hw.copy(FrameBuffer::Shadow(next), FrameBuffer::Primary);
    state.terminals.shown = next;
    hw.place_cursor(state.terminals.sessions[next].cursor);
    rebind_video(state, hw);
    info!("terminal {} shown", next);
}

/// Remaps the video window for the active owner's current needs.
pub fn rebind_video(state: &mut SchedulerState, hw: &mut impl Mmu) {
    let owner = state.terminals.active_session().owner;
    let present = state.tasks.get(owner).is_some_and(|task| task.uses_video);
    let (active, shown) = (state.terminals.active, state.terminals.shown);
    state.space.bind_video_window(hw, present, active, shown);
}

/// Prints program output on the active terminal. NUL bytes are skipped.
pub fn console_write(state: &mut SchedulerState, hw: &mut impl TextScreen, bytes: &[u8]) {
    let target = state.terminals.active_target();
    let session = state.terminals.active_session_mut();
    for run in bytes.split(|&b| b == 0).filter(|run| !run.is_empty()) {
        hw.write_bytes(target, &mut session.cursor, run);
    }
    if target == FrameBuffer::Primary {
        hw.place_cursor(session.cursor);
    }
}
