//! The HAL traits on real hardware.

use super::memory::BootInfoFrameAllocator;
use super::{gdt, pic, vga};
use crate::mm::layout::{USER_WINDOW_BASE, USER_WINDOW_SIZE};
use core::slice;
use triptych_hal::{Cursor, FrameBuffer, InterruptController, Mmu, PrivilegeStack, TextScreen};
use x86_64::instructions::tlb;
use x86_64::structures::paging::{
    Mapper, OffsetPageTable, Page, PageSize, PageTableFlags, PhysFrame, Size2MiB, Size4KiB,
};
use x86_64::{PhysAddr, VirtAddr};

const USER_FLAGS: PageTableFlags = PageTableFlags::PRESENT
    .union(PageTableFlags::WRITABLE)
    .union(PageTableFlags::USER_ACCESSIBLE);

/// Page tables, the TSS, the PICs and VGA memory.
pub struct Machine {
    mapper: OffsetPageTable<'static>,
    frames: BootInfoFrameAllocator,
    user_window_mapped: bool,
}

impl Machine {
    /// Takes over the page tables and frame allocator set up at boot.
    pub fn new(mapper: OffsetPageTable<'static>, frames: BootInfoFrameAllocator) -> Self {
        Self {
            mapper,
            frames,
            user_window_mapped: false,
        }
    }

    /// Points `page` at `frame`, or unmaps it. The TLB is left alone.
    fn remap<S: PageSize>(&mut self, page: Page<S>, frame: Option<PhysFrame<S>>)
    where
        OffsetPageTable<'static>: Mapper<S>,
    {
        if let Ok((_, flush)) = self.mapper.unmap(page) {
            flush.ignore();
        }
        let Some(frame) = frame else {
            return;
        };
        // SAFETY: the user and video windows are reserved for these
        // mappings; nothing in the kernel holds references into them.
        match unsafe { self.mapper.map_to(page, frame, USER_FLAGS, &mut self.frames) } {
            Ok(flush) => flush.ignore(),
            Err(err) => panic!("cannot map {:?}: {:?}", page, err),
        }
    }
}

impl Mmu for Machine {
    fn map_user_frame(&mut self, virt: usize, phys: usize) {
        for offset in (0..USER_WINDOW_SIZE as u64).step_by(Size2MiB::SIZE as usize) {
            let page = Page::<Size2MiB>::containing_address(VirtAddr::new(virt as u64 + offset));
            let frame = PhysFrame::<Size2MiB>::containing_address(PhysAddr::new(phys as u64 + offset));
            self.remap(page, Some(frame));
        }
        self.user_window_mapped = true;
    }

    fn map_video_page(&mut self, virt: usize, phys: usize, present: bool) {
        let page = Page::<Size4KiB>::containing_address(VirtAddr::new(virt as u64));
        let frame = PhysFrame::<Size4KiB>::containing_address(PhysAddr::new(phys as u64));
        self.remap(page, present.then_some(frame));
    }

    fn flush_tlb(&mut self) {
        tlb::flush_all();
    }

    fn user_window(&mut self) -> &mut [u8] {
        if !self.user_window_mapped {
            return &mut [];
        }
        // SAFETY: the window is mapped writable, and the returned borrow is
        // tied to `self`, which every remap goes through.
        unsafe { slice::from_raw_parts_mut(USER_WINDOW_BASE as *mut u8, USER_WINDOW_SIZE) }
    }
}

impl PrivilegeStack for Machine {
    fn kernel_stack_top(&self) -> usize {
        gdt::privilege_stack_top()
    }

    fn set_kernel_stack_top(&mut self, top: usize) {
        gdt::set_privilege_stack_top(top);
    }

    fn task_stack_top(&self, task: usize) -> usize {
        gdt::task_stack_top(task)
    }
}

impl InterruptController for Machine {
    fn end_of_interrupt(&mut self, irq: u8) {
        pic::end_of_interrupt(irq);
    }
}

impl TextScreen for Machine {
    fn write_bytes(&mut self, target: FrameBuffer, cursor: &mut Cursor, bytes: &[u8]) {
        vga::write_bytes(target, cursor, bytes);
    }

    fn erase(&mut self, target: FrameBuffer, cursor: &mut Cursor, cells: usize) {
        vga::erase(target, cursor, cells);
    }

    fn clear(&mut self, target: FrameBuffer) {
        vga::clear(target);
    }

    fn copy(&mut self, from: FrameBuffer, to: FrameBuffer) {
        vga::copy(from, to);
    }

    fn place_cursor(&mut self, cursor: Cursor) {
        vga::place_cursor(cursor);
    }
}
