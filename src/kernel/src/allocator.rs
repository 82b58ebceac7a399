//! Kernel heap.
//!
//! The scheduler and the task table live in static storage, so the heap only
//! backs boot-time formatting and the self-test.

use linked_list_allocator::LockedHeap;
use log::debug;
use x86_64::{
    structures::paging::{
        mapper::MapToError, FrameAllocator, Mapper, Page, PageTableFlags, Size4KiB,
    },
    VirtAddr,
};

/// The start address of the kernel heap.
pub const HEAP_START: usize = 0x_4444_4444_0000;
/// The size of the kernel heap.
pub const HEAP_SIZE: usize = 64 * 1024;

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Maps the heap pages and hands them to the allocator.
pub fn init_heap(
    mapper: &mut impl Mapper<Size4KiB>,
    frame_allocator: &mut impl FrameAllocator<Size4KiB>,
) -> Result<(), MapToError<Size4KiB>> {
    let page_range = {
        let heap_start = VirtAddr::new(HEAP_START as u64);
        let heap_end = heap_start + HEAP_SIZE - 1u64;
        Page::range_inclusive(
            Page::containing_address(heap_start),
            Page::containing_address(heap_end),
        )
    };

    let flags = PageTableFlags::PRESENT | PageTableFlags::WRITABLE;
    for page in page_range {
        let frame = frame_allocator
            .allocate_frame()
            .ok_or(MapToError::FrameAllocationFailed)?;
        // SAFETY: the frame is fresh and the heap range is used for nothing
        // else. Kernel-only flags keep it out of user reach.
        unsafe {
            mapper.map_to(page, frame, flags, frame_allocator)?.flush();
        }
    }

    // SAFETY: the range was just mapped writable, and this runs once.
    unsafe {
        ALLOCATOR.lock().init(HEAP_START as *mut u8, HEAP_SIZE);
    }
    debug!("heap at {:#x}, {} KiB", HEAP_START, HEAP_SIZE / 1024);

    Ok(())
}

/// Bytes currently handed out by the heap.
pub fn used() -> usize {
    ALLOCATOR.lock().used()
}
