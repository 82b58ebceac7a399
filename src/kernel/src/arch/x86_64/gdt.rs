//! Global Descriptor Table, Task State Segment and the kernel stacks.
//!
//! The TSS carries the privileged stack pointer (RSP0) the CPU switches to on
//! every trap from user mode. The scheduler and the process code move it
//! between the per-task stacks below.

use core::ptr::{addr_of, addr_of_mut};
use lazy_static::lazy_static;
use triptych_common::limits::MAX_TASKS;
use x86_64::structures::gdt::{Descriptor, GlobalDescriptorTable, SegmentSelector};
use x86_64::structures::tss::TaskStateSegment;
use x86_64::VirtAddr;

/// IST index for the double fault handler.
pub const DOUBLE_FAULT_IST_INDEX: u16 = 0;

/// Size of every kernel stack.
pub const KERNEL_STACK_SIZE: usize = 4096 * 4;

#[repr(C, align(16))]
struct Stack([u8; KERNEL_STACK_SIZE]);

const EMPTY_STACK: Stack = Stack([0; KERNEL_STACK_SIZE]);

static mut DOUBLE_FAULT_STACK: Stack = EMPTY_STACK;

/// One kernel stack per task id, used for every trap while that task runs.
static mut TASK_STACKS: [Stack; MAX_TASKS] = [EMPTY_STACK; MAX_TASKS];

static mut TSS: TaskStateSegment = TaskStateSegment::new();

lazy_static! {
    static ref GDT: (GlobalDescriptorTable, Selectors) = {
        let mut gdt = GlobalDescriptorTable::new();
        let kernel_code = gdt.add_entry(Descriptor::kernel_code_segment());
        let kernel_data = gdt.add_entry(Descriptor::kernel_data_segment());
        let user_data = gdt.add_entry(Descriptor::user_data_segment());
        let user_code = gdt.add_entry(Descriptor::user_code_segment());
        // SAFETY: the TSS is a static; the descriptor only records its address.
        let tss = gdt.add_entry(Descriptor::tss_segment(unsafe { &*addr_of!(TSS) }));
        (
            gdt,
            Selectors {
                kernel_code,
                kernel_data,
                user_code,
                user_data,
                tss,
            },
        )
    };
}

/// Segment selectors installed by [`init`].
#[derive(Debug, Clone, Copy)]
struct Selectors {
    kernel_code: SegmentSelector,
    kernel_data: SegmentSelector,
    /// RPL 3.
    user_code: SegmentSelector,
    /// RPL 3.
    user_data: SegmentSelector,
    tss: SegmentSelector,
}

/// Loads the GDT and TSS and reloads the segment registers.
pub fn init() {
    use x86_64::instructions::segmentation::{Segment, CS, DS, ES, SS};
    use x86_64::instructions::tables::load_tss;

    // SAFETY: runs once during boot before anything reads the TSS.
    unsafe {
        let stack = VirtAddr::from_ptr(addr_of!(DOUBLE_FAULT_STACK)) + KERNEL_STACK_SIZE as u64;
        (*addr_of_mut!(TSS)).interrupt_stack_table[DOUBLE_FAULT_IST_INDEX as usize] = stack;
        (*addr_of_mut!(TSS)).privilege_stack_table[0] = VirtAddr::new(task_stack_top(0) as u64);
    }

    GDT.0.load();
    // SAFETY: the selectors come from the GDT that was just loaded.
    unsafe {
        CS::set_reg(GDT.1.kernel_code);
        SS::set_reg(GDT.1.kernel_data);
        DS::set_reg(GDT.1.kernel_data);
        ES::set_reg(GDT.1.kernel_data);
        load_tss(GDT.1.tss);
    }
}

/// Code and stack selectors for `iretq` into ring 3.
pub fn user_selectors() -> (u64, u64) {
    (
        u64::from(GDT.1.user_code.0),
        u64::from(GDT.1.user_data.0),
    )
}

/// Current RSP0.
pub fn privilege_stack_top() -> usize {
    // SAFETY: callers hold the kernel lock with interrupts off.
    unsafe { (*addr_of!(TSS)).privilege_stack_table[0].as_u64() as usize }
}

/// Replaces RSP0. Takes effect on the next trap from user mode.
pub fn set_privilege_stack_top(top: usize) {
    // SAFETY: callers hold the kernel lock with interrupts off.
    unsafe { (*addr_of_mut!(TSS)).privilege_stack_table[0] = VirtAddr::new(top as u64) };
}

/// Top of the kernel stack reserved for `task`.
pub fn task_stack_top(task: usize) -> usize {
    assert!(task < MAX_TASKS, "no kernel stack for task {}", task);
    addr_of!(TASK_STACKS) as usize + (task + 1) * KERNEL_STACK_SIZE
}
