//! Page table access and physical frame allocation.

use crate::mm::layout::{USER_FRAME_BASE, USER_FRAME_END};
use bootloader::bootinfo::{MemoryMap, MemoryRegionType};
use x86_64::registers::control::Cr3;
use x86_64::structures::paging::{FrameAllocator, OffsetPageTable, PageTable, PhysFrame, Size4KiB};
use x86_64::{PhysAddr, VirtAddr};

/// Wraps the active level 4 table in a mapper.
///
/// # Safety
///
/// All physical memory must be mapped at `physical_memory_offset`, and this
/// must be called only once.
pub unsafe fn init_mapper(physical_memory_offset: VirtAddr) -> OffsetPageTable<'static> {
    let (level_4_frame, _) = Cr3::read();
    let virt = physical_memory_offset + level_4_frame.start_address().as_u64();
    let level_4_table: &'static mut PageTable = &mut *virt.as_mut_ptr();
    OffsetPageTable::new(level_4_table, physical_memory_offset)
}

/// Hands out usable frames from the bootloader's memory map, never one of
/// the frames reserved for user programs.
pub struct BootInfoFrameAllocator {
    memory_map: &'static MemoryMap,
    next: usize,
}

impl BootInfoFrameAllocator {
    /// Creates an allocator over `memory_map`.
    ///
    /// # Safety
    ///
    /// Every region marked usable in the map must really be unused.
    pub unsafe fn init(memory_map: &'static MemoryMap) -> Self {
        BootInfoFrameAllocator {
            memory_map,
            next: 0,
        }
    }

    fn usable_frames(&self) -> impl Iterator<Item = PhysFrame> + '_ {
        let reserved = USER_FRAME_BASE as u64..USER_FRAME_END as u64;
        self.memory_map
            .iter()
            .filter(|region| region.region_type == MemoryRegionType::Usable)
            .flat_map(|region| (region.range.start_addr()..region.range.end_addr()).step_by(4096))
            .filter(move |addr| !reserved.contains(addr))
            .map(|addr| PhysFrame::containing_address(PhysAddr::new(addr)))
    }
}

unsafe impl FrameAllocator<Size4KiB> for BootInfoFrameAllocator {
    fn allocate_frame(&mut self) -> Option<PhysFrame> {
        let frame = self.usable_frames().nth(self.next);
        self.next += 1;
        frame
    }
}
