//! triptych Hardware Abstraction Layer (HAL) traits.
//!
//! This crate defines the narrow interfaces the portable kernel core consumes.
//! The bare-metal backend implements them on x86_64; the host tests implement
//! them with a simulated machine.

#![no_std]

/// Trait for a serial port or similar character-based communication channel.
pub trait Serial {
    /// Writes a single byte to the serial port.
    fn write_byte(&mut self, byte: u8);
    /// Reads a single byte from the serial port, if available.
    fn read_byte(&mut self) -> Option<u8>;
}

/// Trait for acknowledging interrupts.
pub trait InterruptController {
    /// Signals the end of an interrupt to the controller.
    fn end_of_interrupt(&mut self, irq: u8);
}

/// Page-table control over the two windows user programs can see.
///
/// Mapping calls only edit the tables. Nothing is guaranteed to be visible
/// through the windows until [`Mmu::flush_tlb`] has run.
pub trait Mmu {
    /// Maps the user window starting at `virt` onto the physical frame at `phys`.
    fn map_user_frame(&mut self, virt: usize, phys: usize);
    /// Maps the 4 KiB video page at `virt` onto `phys`, or removes it when
    /// `present` is false.
    fn map_video_page(&mut self, virt: usize, phys: usize, present: bool);
    /// Invalidates every cached translation.
    fn flush_tlb(&mut self);
    /// The user window as the kernel currently sees it.
    fn user_window(&mut self) -> &mut [u8];
}

/// The register that selects the kernel stack used on entry from user mode.
pub trait PrivilegeStack {
    /// Current value of the privileged stack pointer.
    fn kernel_stack_top(&self) -> usize;
    /// Loads a new privileged stack pointer.
    fn set_kernel_stack_top(&mut self, top: usize);
    /// Top of the kernel stack reserved for task `task`.
    fn task_stack_top(&self, task: usize) -> usize;
}

/// One page of text-mode video memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameBuffer {
    /// The buffer the display controller scans out.
    Primary,
    /// Off-screen copy belonging to terminal `n`.
    Shadow(usize),
}

/// Character cell position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Cursor {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
}

/// Cells a tab occupies on screen.
pub const TAB_WIDTH: usize = 4;

/// Text output into any framebuffer page.
pub trait TextScreen {
    /// Writes `bytes` at `cursor`, handling newlines, wrapping and scrolling,
    /// and leaves `cursor` after the last byte.
    fn write_bytes(&mut self, target: FrameBuffer, cursor: &mut Cursor, bytes: &[u8]);
    /// Blanks `cells` character cells before `cursor` and moves it back.
    fn erase(&mut self, target: FrameBuffer, cursor: &mut Cursor, cells: usize);
    /// Blanks a whole page.
    fn clear(&mut self, target: FrameBuffer);
    /// Copies page `from` over page `to`.
    fn copy(&mut self, from: FrameBuffer, to: FrameBuffer);
    /// Moves the blinking hardware cursor.
    fn place_cursor(&mut self, cursor: Cursor);
}

/// Everything the kernel core needs from a machine.
pub trait Platform: Mmu + PrivilegeStack + InterruptController + TextScreen {}

impl<T: Mmu + PrivilegeStack + InterruptController + TextScreen> Platform for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_buffers_order_primary_first() {
        let mut pages = [
            FrameBuffer::Shadow(2),
            FrameBuffer::Primary,
            FrameBuffer::Shadow(0),
        ];
        pages.sort_unstable();
        assert_eq!(
            pages,
            [FrameBuffer::Primary, FrameBuffer::Shadow(0), FrameBuffer::Shadow(2)]
        );
    }
}
