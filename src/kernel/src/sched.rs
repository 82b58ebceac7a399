//! Round-robin scheduling across terminals.
//!
//! Each timer tick hands the CPU to the next terminal. The first
//! [`MAX_TERMINALS`] ticks instead start the bootstrap shells, one per tick,
//! in terminal order. Switching terminals means switching kernel stacks, so
//! the core only computes a [`TickPlan`]; the architecture code carries out
//! the save and restore.

use crate::fs::FileSystem;
use crate::process::{self, UserEntry};
use crate::state::SchedulerState;
use crate::task::ExecutionContext;
use crate::terminal::{activate, set_active};
use log::trace;
use triptych_common::limits::MAX_TERMINALS;
use triptych_common::SysError;
use triptych_hal::Platform;

/// Interrupt line of the scheduling timer.
pub const TIMER_IRQ: u8 = 0;

/// Progress through the bootstrap ticks.
#[derive(Debug, Default)]
pub struct RoundRobin {
    booted: usize,
}

impl RoundRobin {
    /// No shells started yet.
    pub const fn new() -> Self {
        Self { booted: 0 }
    }

    /// Whether every terminal has its shell.
    pub fn is_steady(&self) -> bool {
        self.booted == MAX_TERMINALS
    }
}

/// Where the interrupted call chain has to be saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspend {
    /// The boot thread; it is never resumed.
    Boot,
    /// Terminal `n`'s session.
    Terminal(usize),
}

/// What runs after the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Enter a newly started bootstrap shell.
    Bootstrap(UserEntry),
    /// Continue the terminal's suspended call chain.
    Switch(ExecutionContext),
}

/// The context switch a tick requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    /// Where to save the interrupted context.
    pub suspend: Suspend,
    /// Where to go next.
    pub resume: Resume,
}

/// Timer interrupt.
///
/// Acknowledges the interrupt first so later ticks keep arriving whatever
/// happens next. Leaves the incoming terminal active, with its kernel stack
/// pointer loaded and both windows mapped for its owner.
pub fn on_timer_tick(
    state: &mut SchedulerState,
    hw: &mut impl Platform,
    fs: &impl FileSystem,
) -> Result<TickPlan, SysError> {
    hw.end_of_interrupt(TIMER_IRQ);

    let outgoing = state.terminals.active();
    let booted = state.scheduler.booted;
    let suspend = if booted == 0 {
        Suspend::Boot
    } else {
        Suspend::Terminal(outgoing)
    };

    if booted < MAX_TERMINALS {
        if booted == 0 {
            activate(state, hw, booted);
        } else {
            set_active(state, hw, booted);
        }
        let entry = process::launch_bootstrap_shell(state, hw, fs, booted)?;
        state.scheduler.booted += 1;
        return Ok(TickPlan {
            suspend,
            resume: Resume::Bootstrap(entry),
        });
    }

    let next = (outgoing + 1) % MAX_TERMINALS;
    set_active(state, hw, next);
    trace!("tick: terminal {} -> {}", outgoing, next);
    Ok(TickPlan {
        suspend,
        resume: Resume::Switch(state.terminals.session(next).context),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ImageFs;
    use crate::mm::layout;
    use crate::process::{launch, terminate, Termination};
    use crate::task::TaskId;
    use crate::testutil::{program, standard_image, ImageBuilder, MockMachine};
    use triptych_common::ExitStatus;
    use triptych_hal::PrivilegeStack;

    /// Runs a tick and fakes the context save the hardware code would do.
    fn tick(state: &mut SchedulerState, machine: &mut MockMachine, fs: &ImageFs, n: usize) -> TickPlan {
        let plan = on_timer_tick(state, machine, fs).unwrap();
        if let Suspend::Terminal(terminal) = plan.suspend {
            state.terminals.session_mut(terminal).context = ExecutionContext::from_raw(0x1000 + n);
        }
        plan
    }

    #[test]
    fn test_bootstrap_ticks_start_shells_in_order() {
        let image = standard_image();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let mut state = SchedulerState::new(&machine);

        for n in 0..MAX_TERMINALS {
            let plan = tick(&mut state, &mut machine, &fs, n);
            let shell = TaskId::bootstrap(n);
            assert_eq!(state.terminals.active(), n);
            assert_eq!(state.current_task(), shell);
            assert!(state.tasks.in_use(shell));
            assert_eq!(plan.resume, Resume::Bootstrap(UserEntry {
                task: shell,
                entry: 0x0804_8100,
                stack: layout::USER_STACK_TOP,
            }));
            let expected = if n == 0 { Suspend::Boot } else { Suspend::Terminal(n - 1) };
            assert_eq!(plan.suspend, expected);
        }
        assert!(state.scheduler.is_steady());
        assert_eq!(state.tasks.in_use_mask(), 0b111);
        assert_eq!(machine.acknowledged(), &[TIMER_IRQ; MAX_TERMINALS]);
    }

    #[test]
    fn test_steady_state_is_strict_round_robin() {
        let image = standard_image();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let mut state = SchedulerState::new(&machine);

        const K: usize = 20;
        let mut activations = [0usize; MAX_TERMINALS];
        let mut order = Vec::new();
        for n in 0..MAX_TERMINALS * K {
            tick(&mut state, &mut machine, &fs, n);
            activations[state.terminals.active()] += 1;
            order.push(state.terminals.active());
        }
        assert_eq!(activations, [K; MAX_TERMINALS]);
        for (n, &terminal) in order.iter().enumerate() {
            assert_eq!(terminal, n % MAX_TERMINALS);
        }
    }

    #[test]
    fn test_switch_resumes_saved_context_and_restores_owner() {
        let image = standard_image();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let mut state = SchedulerState::new(&machine);
        for n in 0..MAX_TERMINALS {
            tick(&mut state, &mut machine, &fs, n);
        }

        // Terminal 2 runs a child, then the CPU moves on.
        let child = launch(&mut state, &mut machine, &fs, b"counter").unwrap();
        let child_stack = machine.kernel_stack_top();
        let plan = tick(&mut state, &mut machine, &fs, 3);
        assert_eq!(plan.suspend, Suspend::Terminal(2));
        assert_eq!(plan.resume, Resume::Switch(ExecutionContext::from_raw(0x1000 + 1)));
        assert_eq!(state.terminals.session(2).kernel_stack_top, child_stack);
        assert_eq!(state.current_task(), TaskId::bootstrap(0));
        assert_eq!(machine.cached_user_frame(), Some(layout::user_frame(TaskId::bootstrap(0))));

        tick(&mut state, &mut machine, &fs, 4);
        let plan = tick(&mut state, &mut machine, &fs, 5);
        assert_eq!(plan.resume, Resume::Switch(ExecutionContext::from_raw(0x1000 + 3)));
        assert_eq!(state.current_task(), child.task);
        assert_eq!(machine.kernel_stack_top(), child_stack);
        assert_eq!(machine.cached_user_frame(), Some(layout::user_frame(child.task)));

        let Termination::Resume { .. } =
            terminate(&mut state, &mut machine, &fs, ExitStatus::Exited(0)).unwrap()
        else {
            panic!("child did not return to its parent");
        };
        assert_eq!(state.current_task(), TaskId::bootstrap(2));
    }

    #[test]
    fn test_oversubscription_across_terminals() {
        let image = standard_image();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let mut state = SchedulerState::new(&machine);
        for n in 0..MAX_TERMINALS {
            tick(&mut state, &mut machine, &fs, n);
        }

        // Terminal 2 takes every free id; terminal 0 then gets none.
        while launch(&mut state, &mut machine, &fs, b"counter").is_ok() {}
        tick(&mut state, &mut machine, &fs, 3);
        assert_eq!(state.terminals.active(), 0);
        assert_eq!(
            launch(&mut state, &mut machine, &fs, b"counter"),
            Err(SysError::NoFreeTask)
        );
    }

    #[test]
    fn test_missing_shell_is_reported() {
        let image = ImageBuilder::new()
            .file("counter", &program(0x0804_8100, 64))
            .build();
        let fs = ImageFs::new(&image).unwrap();
        let mut machine = MockMachine::new();
        let mut state = SchedulerState::new(&machine);
        assert_eq!(on_timer_tick(&mut state, &mut machine, &fs), Err(SysError::NotFound));
        assert_eq!(machine.acknowledged(), &[TIMER_IRQ]);
        assert_eq!(state.scheduler.booted, 0);
        assert!(!state.tasks.in_use(TaskId::bootstrap(0)));
    }
}
