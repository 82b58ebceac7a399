//! Interrupt Descriptor Table (IDT) and exception handlers for x86_64.

use super::context::triptych_syscall_entry;
use super::gdt;
use super::pic::InterruptIndex;
use super::trap;
use crate::fault::{Exception, FaultAction};
use lazy_static::lazy_static;
use log::{error, info};
use triptych_common::abi::SYSCALL_VECTOR;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame, PageFaultErrorCode};
use x86_64::{PrivilegeLevel, VirtAddr};

lazy_static! {
    /// The Interrupt Descriptor Table (IDT).
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();
        idt.divide_error.set_handler_fn(divide_error_handler);
        idt.debug.set_handler_fn(debug_handler);
        idt.non_maskable_interrupt.set_handler_fn(nmi_handler);
        idt.breakpoint.set_handler_fn(breakpoint_handler);
        idt.overflow.set_handler_fn(overflow_handler);
        idt.bound_range_exceeded.set_handler_fn(bound_range_handler);
        idt.invalid_opcode.set_handler_fn(invalid_opcode_handler);
        idt.device_not_available.set_handler_fn(device_not_available_handler);
        unsafe {
            idt.double_fault.set_handler_fn(double_fault_handler)
                .set_stack_index(gdt::DOUBLE_FAULT_IST_INDEX);
        }
        idt.invalid_tss.set_handler_fn(invalid_tss_handler);
        idt.segment_not_present.set_handler_fn(segment_not_present_handler);
        idt.stack_segment_fault.set_handler_fn(stack_segment_handler);
        idt.general_protection_fault.set_handler_fn(general_protection_fault_handler);
        idt.page_fault.set_handler_fn(page_fault_handler);
        idt.x87_floating_point.set_handler_fn(x87_floating_point_handler);
        idt.alignment_check.set_handler_fn(alignment_check_handler);
        idt.machine_check.set_handler_fn(machine_check_handler);
        idt.simd_floating_point.set_handler_fn(simd_floating_point_handler);

        // Hardware interrupts
        idt[InterruptIndex::Timer.as_usize()]
            .set_handler_fn(timer_interrupt_handler);
        idt[InterruptIndex::Keyboard.as_usize()]
            .set_handler_fn(keyboard_interrupt_handler);
        idt[InterruptIndex::Rtc.as_usize()]
            .set_handler_fn(rtc_interrupt_handler);

        // SAFETY: the entry stub follows the interrupt calling convention
        // and ends in `iretq`.
        unsafe {
            idt[usize::from(SYSCALL_VECTOR)]
                .set_handler_addr(VirtAddr::new(triptych_syscall_entry as usize as u64))
                .set_privilege_level(PrivilegeLevel::Ring3);
        }

        idt
    };
}

/// Loads the IDT. Interrupts stay disabled.
pub fn init_idt() {
    IDT.load();
}

fn from_user(stack_frame: &InterruptStackFrame) -> bool {
    stack_frame.code_segment & 0b11 == PrivilegeLevel::Ring3 as u64
}

/// Common path of every exception except breakpoint.
fn fault(stack_frame: InterruptStackFrame, exception: Exception, error_code: Option<u64>) {
    match exception.action(from_user(&stack_frame)) {
        FaultAction::TerminateProcess => {
            error!(
                "{} in user mode at {:#x}, error code {:?}",
                exception,
                stack_frame.instruction_pointer.as_u64(),
                error_code
            );
            trap::on_user_fault(exception)
        }
        FaultAction::HaltSystem => panic!(
            "EXCEPTION: {}, error code {:?}\n{:#?}",
            exception, error_code, stack_frame
        ),
    }
}

macro_rules! exception_handler {
    ($name:ident, $exception:expr) => {
        extern "x86-interrupt" fn $name(stack_frame: InterruptStackFrame) {
            fault(stack_frame, $exception, None);
        }
    };
    ($name:ident, $exception:expr, error_code) => {
        extern "x86-interrupt" fn $name(stack_frame: InterruptStackFrame, error_code: u64) {
            fault(stack_frame, $exception, Some(error_code));
        }
    };
}

exception_handler!(divide_error_handler, Exception::DivideError);
exception_handler!(debug_handler, Exception::Debug);
exception_handler!(nmi_handler, Exception::NonMaskableInterrupt);
exception_handler!(overflow_handler, Exception::Overflow);
exception_handler!(bound_range_handler, Exception::BoundRangeExceeded);
exception_handler!(invalid_opcode_handler, Exception::InvalidOpcode);
exception_handler!(device_not_available_handler, Exception::DeviceNotAvailable);
exception_handler!(invalid_tss_handler, Exception::InvalidTss, error_code);
exception_handler!(segment_not_present_handler, Exception::SegmentNotPresent, error_code);
exception_handler!(stack_segment_handler, Exception::StackSegmentFault, error_code);
exception_handler!(general_protection_fault_handler, Exception::GeneralProtection, error_code);
exception_handler!(x87_floating_point_handler, Exception::X87FloatingPoint);
exception_handler!(alignment_check_handler, Exception::AlignmentCheck, error_code);
exception_handler!(simd_floating_point_handler, Exception::SimdFloatingPoint);

/// Handler for the breakpoint exception (INT3). Kernel breakpoints only log.
extern "x86-interrupt" fn breakpoint_handler(stack_frame: InterruptStackFrame) {
    if from_user(&stack_frame) {
        fault(stack_frame, Exception::Breakpoint, None);
    } else {
        info!("breakpoint at {:#x}", stack_frame.instruction_pointer.as_u64());
    }
}

/// Handler for the page fault exception.
extern "x86-interrupt" fn page_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: PageFaultErrorCode,
) {
    use x86_64::registers::control::Cr2;

    error!("page fault accessing {:?} ({:?})", Cr2::read(), error_code);
    fault(stack_frame, Exception::PageFault, Some(error_code.bits()));
}

/// Handler for the double fault exception.
extern "x86-interrupt" fn double_fault_handler(
    stack_frame: InterruptStackFrame,
    _error_code: u64,
) -> ! {
    panic!("EXCEPTION: {}\n{:#?}", Exception::DoubleFault, stack_frame);
}

/// Handler for the machine check exception.
extern "x86-interrupt" fn machine_check_handler(stack_frame: InterruptStackFrame) -> ! {
    panic!("EXCEPTION: {}\n{:#?}", Exception::MachineCheck, stack_frame);
}

/// Handler for the timer interrupt.
extern "x86-interrupt" fn timer_interrupt_handler(_stack_frame: InterruptStackFrame) {
    trap::on_timer();
}

/// Handler for the keyboard interrupt.
extern "x86-interrupt" fn keyboard_interrupt_handler(_stack_frame: InterruptStackFrame) {
    use x86_64::instructions::port::Port;

    let mut port = Port::new(0x60);
    let scancode: u8 = unsafe { port.read() };
    trap::on_keyboard(scancode);
}

/// Handler for the real-time clock interrupt.
extern "x86-interrupt" fn rtc_interrupt_handler(_stack_frame: InterruptStackFrame) {
    trap::on_rtc();
}
