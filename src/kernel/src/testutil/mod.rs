//! Host-side test fixtures.
//!
//! [`MockMachine`] stands in for the hardware behind the HAL traits and
//! [`ImageBuilder`] produces file system images in the boot image format.

use crate::fs::image::{BLOCK_SIZE, DENTRY_SIZE};
use crate::mm::layout::{USER_WINDOW_BASE, USER_WINDOW_SIZE};
use std::collections::BTreeMap;
use std::vec::Vec;
use triptych_common::abi::{ENTRY_POINT_OFFSET, EXECUTABLE_MAGIC};
use triptych_common::FileType;
use triptych_hal::{
    Cursor, FrameBuffer, InterruptController, Mmu, PrivilegeStack, TextScreen, TAB_WIDTH,
};

/// Base of the simulated per-task kernel stacks.
pub const KERNEL_STACKS_BASE: usize = 0xffff_8000_0010_0000;
/// Size of each simulated kernel stack.
pub const KERNEL_STACK_SIZE: usize = 0x4000;

/// Simulated machine.
///
/// Physical frames are allocated lazily. Mappings go into a page table and
/// only become visible through the windows after `flush_tlb`, so a missing
/// flush shows up as a read of the wrong frame.
pub struct MockMachine {
    frames: BTreeMap<usize, Vec<u8>>,
    user_mapping: Option<usize>,
    user_cached: Option<usize>,
    video_mapping: Option<usize>,
    video_cached: Option<usize>,
    flushes: usize,
    kernel_stack: usize,
    acknowledged: Vec<u8>,
    screens: BTreeMap<FrameBuffer, Vec<u8>>,
    hardware_cursor: Cursor,
}

impl MockMachine {
    pub fn new() -> Self {
        Self {
            frames: BTreeMap::new(),
            user_mapping: None,
            user_cached: None,
            video_mapping: None,
            video_cached: None,
            flushes: 0,
            kernel_stack: 0,
            acknowledged: Vec::new(),
            screens: BTreeMap::new(),
            hardware_cursor: Cursor::default(),
        }
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Physical frame user accesses currently reach.
    pub fn cached_user_frame(&self) -> Option<usize> {
        self.user_cached
    }

    /// Physical page the video window currently reaches, if present.
    pub fn cached_video_page(&self) -> Option<usize> {
        self.video_cached
    }

    pub fn acknowledged(&self) -> &[u8] {
        &self.acknowledged
    }

    /// Everything printed to `target` since it was last cleared.
    pub fn screen(&self, target: FrameBuffer) -> &[u8] {
        self.screens.get(&target).map_or(&[][..], Vec::as_slice)
    }

    pub fn hardware_cursor(&self) -> Cursor {
        self.hardware_cursor
    }

    /// Writes `bytes` at user virtual address `addr` through the window.
    pub fn poke(&mut self, addr: usize, bytes: &[u8]) {
        let offset = addr - USER_WINDOW_BASE;
        self.user_window()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Reads `len` bytes at user virtual address `addr` through the window.
    pub fn peek(&mut self, addr: usize, len: usize) -> Vec<u8> {
        let offset = addr - USER_WINDOW_BASE;
        self.user_window()[offset..offset + len].to_vec()
    }
}

impl Mmu for MockMachine {
    fn map_user_frame(&mut self, virt: usize, phys: usize) {
        assert_eq!(virt, USER_WINDOW_BASE);
        self.user_mapping = Some(phys);
    }

    fn map_video_page(&mut self, _virt: usize, phys: usize, present: bool) {
        self.video_mapping = present.then_some(phys);
    }

    fn flush_tlb(&mut self) {
        self.user_cached = self.user_mapping;
        self.video_cached = self.video_mapping;
        self.flushes += 1;
    }

    fn user_window(&mut self) -> &mut [u8] {
        let phys = self.user_cached.expect("user window used before a TLB flush");
        self.frames
            .entry(phys)
            .or_insert_with(|| vec![0; USER_WINDOW_SIZE])
    }
}

impl PrivilegeStack for MockMachine {
    fn kernel_stack_top(&self) -> usize {
        self.kernel_stack
    }

    fn set_kernel_stack_top(&mut self, top: usize) {
        self.kernel_stack = top;
    }

    fn task_stack_top(&self, task: usize) -> usize {
        KERNEL_STACKS_BASE + (task + 1) * KERNEL_STACK_SIZE
    }
}

impl InterruptController for MockMachine {
    fn end_of_interrupt(&mut self, irq: u8) {
        self.acknowledged.push(irq);
    }
}

impl TextScreen for MockMachine {
    fn write_bytes(&mut self, target: FrameBuffer, cursor: &mut Cursor, bytes: &[u8]) {
        let screen = self.screens.entry(target).or_default();
        for &byte in bytes {
            match byte {
                b'\n' => {
                    screen.push(byte);
                    cursor.x = 0;
                    cursor.y += 1;
                }
                b'\t' => {
                    screen.extend_from_slice(&[b' '; TAB_WIDTH]);
                    cursor.x += TAB_WIDTH;
                }
                _ => {
                    screen.push(byte);
                    cursor.x += 1;
                }
            }
        }
    }

    fn erase(&mut self, target: FrameBuffer, cursor: &mut Cursor, cells: usize) {
        let screen = self.screens.entry(target).or_default();
        let keep = screen.len().saturating_sub(cells);
        screen.truncate(keep);
        cursor.x = cursor.x.saturating_sub(cells);
    }

    fn clear(&mut self, target: FrameBuffer) {
        self.screens.remove(&target);
    }

    fn copy(&mut self, from: FrameBuffer, to: FrameBuffer) {
        let contents = self.screens.get(&from).cloned().unwrap_or_default();
        self.screens.insert(to, contents);
    }

    fn place_cursor(&mut self, cursor: Cursor) {
        self.hardware_cursor = cursor;
    }
}

/// Bytes of a minimal executable whose entry point is `entry`.
pub fn program(entry: u32, len: usize) -> Vec<u8> {
    let mut image = vec![0u8; len.max(ENTRY_POINT_OFFSET + 4)];
    image[..4].copy_from_slice(&EXECUTABLE_MAGIC);
    image[ENTRY_POINT_OFFSET..ENTRY_POINT_OFFSET + 4].copy_from_slice(&entry.to_le_bytes());
    image
}

/// Assembles boot-format file system images. Entry 0 is always `.`.
pub struct ImageBuilder {
    entries: Vec<(String, FileType, Vec<u8>)>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self {
            entries: vec![(".".into(), FileType::Directory, Vec::new())],
        }
    }

    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push((name.into(), FileType::Regular, data.to_vec()));
        self
    }

    pub fn rtc(mut self, name: &str) -> Self {
        self.entries.push((name.into(), FileType::Rtc, Vec::new()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let files: Vec<&Vec<u8>> = self
            .entries
            .iter()
            .filter(|(_, kind, _)| *kind == FileType::Regular)
            .map(|(_, _, data)| data)
            .collect();
        let inode_count = files.len();
        let block_count: usize = files.iter().map(|data| data.len().div_ceil(BLOCK_SIZE)).sum();

        let mut image = vec![0u8; (1 + inode_count + block_count) * BLOCK_SIZE];
        let put = |image: &mut Vec<u8>, offset: usize, value: usize| {
            image[offset..offset + 4].copy_from_slice(&(value as u32).to_le_bytes());
        };
        put(&mut image, 0, self.entries.len());
        put(&mut image, 4, inode_count);
        put(&mut image, 8, block_count);

        let mut inode = 0;
        let mut next_block = 0;
        for (i, (name, kind, data)) in self.entries.iter().enumerate() {
            let base = DENTRY_SIZE * (1 + i);
            image[base..base + name.len()].copy_from_slice(name.as_bytes());
            put(&mut image, base + 32, *kind as usize);
            if *kind != FileType::Regular {
                continue;
            }
            put(&mut image, base + 36, inode);

            let inode_base = (1 + inode) * BLOCK_SIZE;
            put(&mut image, inode_base, data.len());
            for (n, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
                put(&mut image, inode_base + 4 + n * 4, next_block);
                let start = (1 + inode_count + next_block) * BLOCK_SIZE;
                image[start..start + chunk.len()].copy_from_slice(chunk);
                next_block += 1;
            }
            inode += 1;
        }
        image
    }
}

/// Image with a shell, a second program, a text file and the clock.
pub fn standard_image() -> Vec<u8> {
    ImageBuilder::new()
        .rtc("rtc")
        .file("shell", &program(0x0804_8100, 6000))
        .file("counter", &program(0x0804_8200, 300))
        .file("frame0.txt", b"a fish\n")
        .file("notes", b"not a program")
        .build()
}
