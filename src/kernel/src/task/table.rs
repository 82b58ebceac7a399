//! Fixed-capacity arena of task descriptors.

use super::{ExecutionContext, TaskDescriptor, TaskId};
use triptych_common::limits::{MAX_TASKS, MAX_TERMINALS};
use triptych_common::SysError;

/// All live task descriptors, indexed by id.
///
/// Ids below [`MAX_TERMINALS`] are reserved for the bootstrap shells. The
/// remaining ids form one pool shared by every terminal; no terminal is
/// guaranteed a share of it.
#[derive(Debug)]
pub struct TaskTable {
    slots: [Option<TaskDescriptor>; MAX_TASKS],
}

impl TaskTable {
    /// Empty table.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// Lowest id available to an ordinary launch.
    pub fn find_free(&self) -> Result<TaskId, SysError> {
        (MAX_TERMINALS..MAX_TASKS)
            .find(|&i| self.slots[i].is_none())
            .and_then(TaskId::new)
            .ok_or(SysError::NoFreeTask)
    }

    /// Stores `descriptor` under its id. The id must be free.
    pub fn insert(&mut self, descriptor: TaskDescriptor) -> Result<&mut TaskDescriptor, SysError> {
        let slot = &mut self.slots[descriptor.id.index()];
        if slot.is_some() {
            return Err(SysError::NoFreeTask);
        }
        Ok(slot.insert(descriptor))
    }

    /// Releases `id`.
    pub fn free(&mut self, id: TaskId) -> Option<TaskDescriptor> {
        self.slots[id.index()].take()
    }

    /// The live descriptor for `id`.
    pub fn get(&self, id: TaskId) -> Option<&TaskDescriptor> {
        self.slots[id.index()].as_ref()
    }

    /// Mutable access to the live descriptor for `id`.
    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskDescriptor> {
        self.slots[id.index()].as_mut()
    }

    /// Whether `id` is allocated.
    #[cfg(test)]
    pub fn in_use(&self, id: TaskId) -> bool {
        self.slots[id.index()].is_some()
    }

    /// Bitmask of allocated ids.
    #[cfg(test)]
    pub fn in_use_mask(&self) -> u8 {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .fold(0, |mask, (i, _)| mask | 1 << i)
    }

    /// Address of `id`'s parent context field, for the primitive that fills
    /// it in while entering the task.
    pub fn parent_context_slot(&mut self, id: TaskId) -> Option<*mut ExecutionContext> {
        self.get_mut(id).map(|task| &mut task.parent_context as *mut _)
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}
