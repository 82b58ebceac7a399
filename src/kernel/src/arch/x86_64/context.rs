//! Raw control transfers between kernel call chains and user mode.
//!
//! Every saved context is a kernel stack pointer with the callee-saved
//! registers and a return address on top, so a context captured by any
//! primitive here can be resumed by any other.

use super::gdt;
use crate::process::UserEntry;
use crate::task::ExecutionContext;
use core::arch::global_asm;

/// RFLAGS for fresh user code: interrupts on, reserved bit 1 set.
const USER_RFLAGS: u64 = 0x202;

global_asm!(
    r#"
.global triptych_enter_user
triptych_enter_user:
    push rbp
    push rbx
    push r12
    push r13
    push r14
    push r15
    mov [rdi], rsp
    push r8
    push rdx
    push {rflags}
    push rcx
    push rsi
    iretq

.global triptych_resume_parent
triptych_resume_parent:
    mov rsp, rdi
    mov rax, rsi
    pop r15
    pop r14
    pop r13
    pop r12
    pop rbx
    pop rbp
    ret

.global triptych_switch_context
triptych_switch_context:
    push rbp
    push rbx
    push r12
    push r13
    push r14
    push r15
    mov [rdi], rsp
    mov rsp, rsi
    pop r15
    pop r14
    pop r13
    pop r12
    pop rbx
    pop rbp
    ret

.global triptych_jump_to_user
triptych_jump_to_user:
    push rcx
    push rsi
    push {rflags}
    push rdx
    push rdi
    iretq

.global triptych_syscall_entry
triptych_syscall_entry:
    push rbx
    push rcx
    push rdx
    push rsi
    push rdi
    push rbp
    push r8
    push r9
    push r10
    push r11
    push r12
    push r13
    push r14
    push r15
    sub rsp, 8
    mov rdi, rax
    mov rsi, rbx
    mov r8, rdx
    mov rdx, rcx
    mov rcx, r8
    call triptych_syscall_dispatch
    add rsp, 8
    pop r15
    pop r14
    pop r13
    pop r12
    pop r11
    pop r10
    pop r9
    pop r8
    pop rbp
    pop rdi
    pop rsi
    pop rdx
    pop rcx
    pop rbx
    iretq
"#,
    rflags = const USER_RFLAGS,
);

extern "C" {
    fn triptych_enter_user(slot: *mut ExecutionContext, entry: u64, stack: u64, cs: u64, ss: u64) -> i64;
    fn triptych_resume_parent(context: usize, status: i64) -> !;
    fn triptych_switch_context(save: *mut ExecutionContext, load: usize);
    fn triptych_jump_to_user(entry: u64, stack: u64, cs: u64, ss: u64) -> !;
    /// The `int 0x80` gate: `rax` is the call number, `rbx`, `rcx` and `rdx`
    /// the arguments, the result comes back in `rax`.
    pub fn triptych_syscall_entry();
}

/// Saves the current call chain into `slot` and enters `entry` in ring 3.
/// Returns the status passed to [`resume_parent`] for that slot.
///
/// # Safety
///
/// `slot` must stay valid until the context is resumed, and the privileged
/// stack pointer must already select a stack other than the current one.
pub unsafe fn enter_user(slot: *mut ExecutionContext, entry: &UserEntry) -> i64 {
    let (cs, ss) = gdt::user_selectors();
    triptych_enter_user(slot, entry.entry as u64, entry.stack as u64, cs, ss)
}

/// Unwinds to `context`, making its `enter_user` return `status`.
///
/// # Safety
///
/// `context` must have been captured by [`enter_user`] and never resumed.
pub unsafe fn resume_parent(context: ExecutionContext, status: i64) -> ! {
    triptych_resume_parent(context.as_raw(), status)
}

/// Saves the current call chain into `save` and resumes `load`.
///
/// # Safety
///
/// `load` must be a live context captured on a different stack.
pub unsafe fn switch_context(save: *mut ExecutionContext, load: ExecutionContext) {
    triptych_switch_context(save, load.as_raw())
}

/// Enters `entry` in ring 3 without keeping anything of the current call
/// chain.
///
/// # Safety
///
/// The user window must hold the program described by `entry`.
pub unsafe fn jump_to_user(entry: &UserEntry) -> ! {
    let (cs, ss) = gdt::user_selectors();
    triptych_jump_to_user(entry.entry as u64, entry.stack as u64, cs, ss)
}
