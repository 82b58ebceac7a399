//! Glue between the interrupt entry points and the portable kernel.
//!
//! Every entry takes the kernel lock, lets the core decide, and drops the
//! lock before any transfer that does not come back to the caller.

use super::context::{enter_user, jump_to_user, resume_parent, switch_context};
use super::machine::Machine;
use super::{cmos, pic::InterruptIndex};
use crate::fault::Exception;
use crate::fs::ImageFs;
use crate::process::{self, Termination};
use crate::rtc::on_rtc_tick;
use crate::sched::{self, Resume, Suspend};
use crate::state::SchedulerState;
use crate::sync::IrqMutex;
use crate::syscall::{self, SyscallAction};
use crate::task::ExecutionContext;
use crate::terminal::{handle_input, KeyboardDecoder};
use core::ptr::addr_of_mut;
use log::info;
use spin::Once;
use triptych_common::ExitStatus;
use triptych_hal::InterruptController;
use x86_64::instructions::interrupts;

/// Everything the interrupt paths share.
pub struct Kernel {
    state: SchedulerState,
    machine: Machine,
    fs: ImageFs<'static>,
    keyboard: KeyboardDecoder,
}

static KERNEL: Once<IrqMutex<Kernel>> = Once::new();

/// Where the boot call chain goes when the first tick leaves it for good.
static mut BOOT_CONTEXT: ExecutionContext = ExecutionContext::EMPTY;

/// Hands the machine and the file system to the interrupt paths.
pub fn install(machine: Machine, fs: ImageFs<'static>) {
    KERNEL.call_once(|| {
        let state = SchedulerState::new(&machine);
        IrqMutex::new(Kernel {
            state,
            machine,
            fs,
            keyboard: KeyboardDecoder::new(),
        })
    });
}

fn kernel() -> &'static IrqMutex<Kernel> {
    match KERNEL.get() {
        Some(kernel) => kernel,
        None => panic!("interrupt before the kernel state was installed"),
    }
}

/// Enables interrupts and idles. The first timer tick starts the shells and
/// never comes back here.
pub fn start() -> ! {
    info!("starting terminals");
    loop {
        interrupts::enable_and_hlt();
    }
}

/// Timer tick: start the next bootstrap shell or rotate terminals.
pub fn on_timer() {
    let (slot, resume) = {
        let mut kernel = kernel().lock();
        let Kernel {
            state, machine, fs, ..
        } = &mut *kernel;
        let plan = match sched::on_timer_tick(state, machine, fs) {
            Ok(plan) => plan,
            Err(err) => panic!("cannot start a shell: {}", err),
        };
        let slot = match plan.suspend {
            Suspend::Boot => addr_of_mut!(BOOT_CONTEXT),
            Suspend::Terminal(terminal) => state.terminals.context_slot(terminal),
        };
        (slot, plan.resume)
    };

    // SAFETY: the slots live in static storage, the lock is released, and
    // the tick already moved the privileged stack to the incoming side.
    unsafe {
        match resume {
            Resume::Switch(context) => switch_context(slot, context),
            Resume::Bootstrap(entry) => {
                enter_user(slot, &entry);
            }
        }
    }
}

/// Keyboard interrupt.
pub fn on_keyboard(scancode: u8) {
    let mut kernel = kernel().lock();
    let Kernel {
        state,
        machine,
        keyboard,
        ..
    } = &mut *kernel;
    if let Some(input) = keyboard.decode(scancode) {
        handle_input(state, machine, input);
    }
    machine.end_of_interrupt(InterruptIndex::Keyboard.irq());
}

/// Real-time clock interrupt.
pub fn on_rtc() {
    let mut kernel = kernel().lock();
    let Kernel { state, machine, .. } = &mut *kernel;
    on_rtc_tick(state);
    cmos::acknowledge();
    machine.end_of_interrupt(InterruptIndex::Rtc.irq());
}

/// A user program raised `exception`; it ends with the fault status.
pub fn on_user_fault(exception: Exception) -> ! {
    let termination = {
        let mut kernel = kernel().lock();
        let Kernel {
            state, machine, fs, ..
        } = &mut *kernel;
        match process::terminate(state, machine, fs, ExitStatus::Faulted) {
            Ok(termination) => termination,
            Err(err) => panic!("cannot end the task after {}: {}", exception, err),
        }
    };
    finish(termination)
}

fn finish(termination: Termination) -> ! {
    // SAFETY: `terminate` restored the parent's windows and kernel stack, or
    // reloaded the shell in place.
    unsafe {
        match termination {
            Termination::Resume { context, status } => resume_parent(context, status),
            Termination::Respawn(entry) => jump_to_user(&entry),
        }
    }
}

/// Called from the `int 0x80` stub with interrupts off.
#[no_mangle]
extern "C" fn triptych_syscall_dispatch(number: u64, a: u64, b: u64, c: u64) -> i64 {
    let action = {
        let mut kernel = kernel().lock();
        let Kernel {
            state, machine, fs, ..
        } = &mut *kernel;
        syscall::dispatch(state, machine, fs, number, [a, b, c])
    };

    match action {
        SyscallAction::Complete(value) => value,
        SyscallAction::Launch(entry) => {
            let slot = kernel().lock().state.tasks.parent_context_slot(entry.task);
            let Some(slot) = slot else {
                panic!("launched task {} has no descriptor", entry.task);
            };
            // SAFETY: `launch` moved the privileged stack to the child's, and
            // the slot lives in the task table until the child terminates.
            unsafe { enter_user(slot, &entry) }
        }
        SyscallAction::Exit(termination) => finish(termination),
        SyscallAction::Wait(wait) => loop {
            {
                let mut kernel = kernel().lock();
                let Kernel { state, machine, .. } = &mut *kernel;
                if let Some(value) = syscall::poll_wait(state, machine, wait) {
                    return value;
                }
            }
            interrupts::enable_and_hlt();
            interrupts::disable();
        },
    }
}

