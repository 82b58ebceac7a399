//! The kernel's single piece of shared mutable state.

use crate::mm::AddressSpace;
use crate::sched::RoundRobin;
use crate::task::{TaskDescriptor, TaskId, TaskTable};
use crate::terminal::Terminals;
use triptych_common::SysError;
use triptych_hal::PrivilegeStack;

/// Task table, terminals, window bindings and scheduler progress.
///
/// Lives from boot to shutdown. Every access happens with interrupts
/// disabled.
#[derive(Debug)]
pub struct SchedulerState {
    /// Live task descriptors.
    pub tasks: TaskTable,
    /// Terminal sessions with the active and shown indices.
    pub terminals: Terminals,
    /// What the user and video windows map.
    pub space: AddressSpace,
    /// Round-robin progress.
    pub scheduler: RoundRobin,
    /// Hardware clock ticks seen so far.
    pub rtc_counter: u32,
}

impl SchedulerState {
    /// Boot-time state: no tasks, terminal 0 active and shown.
    pub fn new(stacks: &impl PrivilegeStack) -> Self {
        Self {
            tasks: TaskTable::new(),
            terminals: Terminals::new(stacks),
            space: AddressSpace::new(),
            scheduler: RoundRobin::new(),
            rtc_counter: 0,
        }
    }

    /// Owner of the active terminal.
    pub fn current_task(&self) -> TaskId {
        self.terminals.active_session().owner
    }

    /// Descriptor of the owner of the active terminal.
    pub fn current(&self) -> Result<&TaskDescriptor, SysError> {
        self.tasks.get(self.current_task()).ok_or(SysError::NoProcess)
    }

    /// Mutable descriptor of the owner of the active terminal.
    pub fn current_mut(&mut self) -> Result<&mut TaskDescriptor, SysError> {
        let id = self.current_task();
        self.tasks.get_mut(id).ok_or(SysError::NoProcess)
    }
}
