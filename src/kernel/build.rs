//! Embeds the file system image.
//!
//! `TRIPTYCH_FSYS_IMAGE` names the image to boot with. Without it the kernel
//! gets an image holding only the `.` directory entry.

use std::env;
use std::fs;
use std::path::PathBuf;

const BLOCK_SIZE: usize = 4096;
const DIRECTORY_TYPE: u32 = 1;
const DENTRY_OFFSET: usize = 64;
const DENTRY_TYPE_OFFSET: usize = 32;

fn main() {
    println!("cargo:rerun-if-env-changed=TRIPTYCH_FSYS_IMAGE");

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let target = out_dir.join("fsys.img");

    match env::var_os("TRIPTYCH_FSYS_IMAGE") {
        Some(path) => {
            println!("cargo:rerun-if-changed={}", PathBuf::from(&path).display());
            fs::copy(&path, &target).expect("copy the file system image");
        }
        None => {
            println!("cargo:warning=TRIPTYCH_FSYS_IMAGE is unset; embedding an image without programs");
            fs::write(&target, directory_only_image()).expect("write the file system image");
        }
    }
}

fn directory_only_image() -> Vec<u8> {
    let mut image = vec![0u8; BLOCK_SIZE];
    image[0..4].copy_from_slice(&1u32.to_le_bytes());
    image[DENTRY_OFFSET] = b'.';
    image[DENTRY_OFFSET + DENTRY_TYPE_OFFSET..DENTRY_OFFSET + DENTRY_TYPE_OFFSET + 4]
        .copy_from_slice(&DIRECTORY_TYPE.to_le_bytes());
    image
}
