//! Fixed memory layout.
//!
//! Physical memory below [`USER_FRAME_BASE`] belongs to the kernel and the
//! bootloader. Task `i` owns the 4 MiB frame at
//! `USER_FRAME_BASE + i * USER_FRAME_SIZE`.

use crate::task::TaskId;
use triptych_common::limits::MAX_TASKS;
use triptych_hal::FrameBuffer;

/// Physical address of the first user frame.
pub const USER_FRAME_BASE: usize = 0x80_0000;

/// Size of one user frame.
pub const USER_FRAME_SIZE: usize = 0x40_0000;

/// End of the physical range reserved for user frames.
pub const USER_FRAME_END: usize = USER_FRAME_BASE + MAX_TASKS * USER_FRAME_SIZE;

/// Virtual address of the user window.
pub const USER_WINDOW_BASE: usize = 0x0800_0000;

/// Size of the user window.
pub const USER_WINDOW_SIZE: usize = USER_FRAME_SIZE;

/// Offset inside the window where program images are copied.
pub const PROGRAM_LOAD_OFFSET: usize = 0x4_8000;

/// Initial user stack pointer. `rsp + 8` is 16-byte aligned, as after a call.
pub const USER_STACK_TOP: usize = USER_WINDOW_BASE + USER_WINDOW_SIZE - 8;

/// Virtual address of the video window handed out by `vidmap`.
pub const VIDEO_WINDOW: usize = USER_WINDOW_BASE + USER_WINDOW_SIZE + VIDEO_PAGE_SIZE;

/// Physical address of the text buffer the display scans out.
pub const VIDEO_MEMORY: usize = 0xB_8000;

/// Size of one text-mode page.
pub const VIDEO_PAGE_SIZE: usize = 0x1000;

/// Physical frame backing the user window for `owner`.
pub fn user_frame(owner: TaskId) -> usize {
    USER_FRAME_BASE + owner.index() * USER_FRAME_SIZE
}

/// Physical page backing a framebuffer. Shadow pages follow the primary one.
pub fn video_frame(target: FrameBuffer) -> usize {
    match target {
        FrameBuffer::Primary => VIDEO_MEMORY,
        FrameBuffer::Shadow(terminal) => VIDEO_MEMORY + (terminal + 1) * VIDEO_PAGE_SIZE,
    }
}

/// Translates a user virtual address range into an offset inside the window.
pub fn window_offset(addr: usize, len: usize) -> Option<usize> {
    let offset = addr.checked_sub(USER_WINDOW_BASE)?;
    let end = offset.checked_add(len)?;
    (end <= USER_WINDOW_SIZE).then_some(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_do_not_overlap() {
        let first = user_frame(TaskId::new(0).unwrap());
        let last = user_frame(TaskId::new(MAX_TASKS - 1).unwrap());
        assert_eq!(first, USER_FRAME_BASE);
        assert_eq!(last + USER_FRAME_SIZE, USER_FRAME_END);
    }

    #[test]
    fn test_video_window_outside_user_window() {
        assert!(VIDEO_WINDOW >= USER_WINDOW_BASE + USER_WINDOW_SIZE);
        assert_eq!(VIDEO_WINDOW, 0x0840_1000);
        assert_eq!(video_frame(FrameBuffer::Shadow(2)), 0xB_B000);
    }

    #[test]
    fn test_window_offset_bounds() {
        assert_eq!(window_offset(USER_WINDOW_BASE, 4), Some(0));
        assert_eq!(window_offset(USER_WINDOW_BASE + USER_WINDOW_SIZE - 4, 4), Some(USER_WINDOW_SIZE - 4));
        assert_eq!(window_offset(USER_WINDOW_BASE + USER_WINDOW_SIZE - 3, 4), None);
        assert_eq!(window_offset(USER_WINDOW_BASE - 1, 1), None);
        assert_eq!(window_offset(usize::MAX, 2), None);
    }
}
