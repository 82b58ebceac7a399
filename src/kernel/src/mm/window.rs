//! Binding of the user and video windows.

use super::layout::{self, USER_WINDOW_BASE, VIDEO_WINDOW};
use crate::task::TaskId;
use log::trace;
use triptych_hal::{FrameBuffer, Mmu};

/// Where the video window currently points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoBinding {
    /// Whether user code can touch the window at all.
    pub present: bool,
    /// Page the window targets.
    pub target: FrameBuffer,
}

/// Global record of what the two user-visible windows map.
///
/// Always describes the owner of the *active* terminal.
#[derive(Debug)]
pub struct AddressSpace {
    user_owner: Option<TaskId>,
    video: VideoBinding,
}

impl AddressSpace {
    /// Nothing mapped yet.
    pub const fn new() -> Self {
        Self {
            user_owner: None,
            video: VideoBinding {
                present: false,
                target: FrameBuffer::Primary,
            },
        }
    }

    /// Task whose frame backs the user window.
    pub fn user_owner(&self) -> Option<TaskId> {
        self.user_owner
    }

    /// Current video window binding.
    pub fn video(&self) -> VideoBinding {
        self.video
    }

    /// Maps the user window onto `owner`'s frame.
    pub fn bind_user_window(&mut self, mmu: &mut impl Mmu, owner: TaskId) {
        mmu.map_user_frame(USER_WINDOW_BASE, layout::user_frame(owner));
        mmu.flush_tlb();
        self.user_owner = Some(owner);
        trace!("user window -> task {}", owner);
    }

    /// Points the video window at the primary buffer when the active terminal
    /// is on screen, and at the active terminal's shadow page otherwise.
    pub fn bind_video_window(&mut self, mmu: &mut impl Mmu, present: bool, active: usize, shown: usize) {
        let target = if active == shown {
            FrameBuffer::Primary
        } else {
            FrameBuffer::Shadow(active)
        };
        mmu.map_video_page(VIDEO_WINDOW, layout::video_frame(target), present);
        mmu.flush_tlb();
        self.video = VideoBinding { present, target };
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockMachine;

    fn task(raw: usize) -> TaskId {
        TaskId::new(raw).unwrap()
    }

    #[test]
    fn test_rebinding_isolates_owners() {
        let mut machine = MockMachine::new();
        let mut space = AddressSpace::new();

        for i in 0..4 {
            space.bind_user_window(&mut machine, task(i));
            machine.user_window()[0x100..0x104].copy_from_slice(&[i as u8; 4]);
        }
        for i in 0..4 {
            space.bind_user_window(&mut machine, task(i));
            assert_eq!(&machine.user_window()[0x100..0x104], &[i as u8; 4]);
        }
        assert_eq!(space.user_owner(), Some(task(3)));
    }

    #[test]
    fn test_fresh_owner_sees_none_of_previous_bytes() {
        let mut machine = MockMachine::new();
        let mut space = AddressSpace::new();

        space.bind_user_window(&mut machine, task(1));
        machine.user_window().fill(0xAA);
        space.bind_user_window(&mut machine, task(2));
        assert!(machine.user_window().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_every_rebind_flushes() {
        let mut machine = MockMachine::new();
        let mut space = AddressSpace::new();

        space.bind_user_window(&mut machine, task(5));
        space.bind_video_window(&mut machine, true, 0, 0);
        assert_eq!(machine.flushes(), 2);
        assert_eq!(machine.cached_user_frame(), Some(layout::user_frame(task(5))));
    }

    #[test]
    fn test_video_targets_shadow_when_not_shown() {
        let mut machine = MockMachine::new();
        let mut space = AddressSpace::new();

        space.bind_video_window(&mut machine, true, 1, 1);
        assert_eq!(machine.cached_video_page(), Some(layout::VIDEO_MEMORY));

        space.bind_video_window(&mut machine, true, 2, 0);
        assert_eq!(space.video().target, FrameBuffer::Shadow(2));
        assert_eq!(machine.cached_video_page(), Some(layout::video_frame(FrameBuffer::Shadow(2))));

        space.bind_video_window(&mut machine, false, 2, 0);
        assert!(!space.video().present);
        assert_eq!(machine.cached_video_page(), None);
    }
}
