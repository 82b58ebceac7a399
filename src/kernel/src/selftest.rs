//! Boot-time checks that need the real machine.
//!
//! The portable logic is covered by host tests; these only confirm that the
//! heap, the page tables and the file system image behave on hardware.

use crate::arch::x86_64::machine::Machine;
use crate::fs::{FileSystem, ImageFs};
use crate::mm::window::AddressSpace;
use crate::process::{loader, SHELL};
use crate::serial_println;
use crate::task::TaskId;
use alloc::boxed::Box;
use alloc::vec::Vec;
use triptych_hal::Mmu;

/// Runs all kernel self-tests. Panics on the first failure.
pub fn run_all(machine: &mut Machine, fs: &ImageFs) {
    serial_println!("Running kernel self-tests...");

    test_allocation();
    test_shell_is_executable(fs);
    test_user_frames_are_separate(machine);

    serial_println!("All kernel self-tests passed!");
}

fn test_allocation() {
    serial_println!("test_allocation... ");
    let x = Box::new(42);
    assert_eq!(*x, 42);

    let mut v = Vec::new();
    for i in 0..100 {
        v.push(i);
    }
    assert_eq!(v.len(), 100);
    assert_eq!(v[50], 50);
    serial_println!("[ok]");
}

fn test_shell_is_executable(fs: &ImageFs) {
    serial_println!("test_shell_is_executable... ");
    let dentry = match fs.lookup_by_name(SHELL) {
        Ok(dentry) => dentry,
        Err(err) => panic!("no shell in the image: {}", err),
    };
    assert_eq!(loader::check_executable(fs, &dentry), Ok(()));
    serial_println!("[ok]");
}

fn test_user_frames_are_separate(machine: &mut Machine) {
    serial_println!("test_user_frames_are_separate... ");
    let mut space = AddressSpace::new();
    let (first, second) = (TaskId::bootstrap(0), TaskId::bootstrap(1));

    space.bind_user_window(machine, first);
    machine.user_window()[0] = 0xA5;
    space.bind_user_window(machine, second);
    machine.user_window()[0] = 0x5A;
    space.bind_user_window(machine, first);
    assert_eq!(machine.user_window()[0], 0xA5);
    assert_eq!(space.user_owner(), Some(first));
    serial_println!("[ok]");
}
