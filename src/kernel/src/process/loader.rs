//! Program image loading.

use crate::fs::{Dentry, FileSystem};
use crate::mm::layout::{self, PROGRAM_LOAD_OFFSET};
use triptych_common::abi::{ENTRY_POINT_OFFSET, EXECUTABLE_MAGIC};
use triptych_common::{FileType, SysError};

/// Checks that `dentry` names a regular file starting with the executable magic.
pub fn check_executable(fs: &impl FileSystem, dentry: &Dentry) -> Result<(), SysError> {
    if dentry.file_type != FileType::Regular {
        return Err(SysError::NotExecutable);
    }
    let mut magic = [0u8; EXECUTABLE_MAGIC.len()];
    fs.read_bytes(dentry.inode, 0, &mut magic)
        .map_err(|_| SysError::NotExecutable)?;
    if magic != EXECUTABLE_MAGIC {
        return Err(SysError::NotExecutable);
    }
    Ok(())
}

/// Copies the whole image into `window` at the load offset and returns the
/// entry address it declares.
pub fn load(fs: &impl FileSystem, window: &mut [u8], dentry: &Dentry) -> Result<usize, SysError> {
    let length = fs.inode_length(dentry.inode)?;
    let image = window
        .get_mut(PROGRAM_LOAD_OFFSET..PROGRAM_LOAD_OFFSET + length)
        .ok_or(SysError::NotExecutable)?;
    fs.read_bytes(dentry.inode, 0, image)?;

    let entry = image
        .get(ENTRY_POINT_OFFSET..ENTRY_POINT_OFFSET + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(SysError::NotExecutable)? as usize;
    if layout::window_offset(entry, 1).is_none() {
        return Err(SysError::NotExecutable);
    }
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ImageFs;
    use crate::testutil::{program, ImageBuilder};

    #[test]
    fn test_load_copies_image_and_reads_entry() {
        let image = ImageBuilder::new().file("prog", &program(0x0804_8123, 5000)).build();
        let fs = ImageFs::new(&image).unwrap();
        let dentry = fs.lookup_by_name(b"prog").unwrap();
        let mut window = vec![0u8; layout::USER_WINDOW_SIZE];

        check_executable(&fs, &dentry).unwrap();
        assert_eq!(load(&fs, &mut window, &dentry), Ok(0x0804_8123));
        assert_eq!(&window[PROGRAM_LOAD_OFFSET..PROGRAM_LOAD_OFFSET + 4], &EXECUTABLE_MAGIC);
    }

    #[test]
    fn test_non_executables_rejected() {
        let image = ImageBuilder::new()
            .rtc("rtc")
            .file("text", b"plain text here")
            .file("tiny", b"\x7fE")
            .build();
        let fs = ImageFs::new(&image).unwrap();
        for name in [&b"."[..], b"rtc", b"text", b"tiny"] {
            let dentry = fs.lookup_by_name(name).unwrap();
            assert_eq!(check_executable(&fs, &dentry), Err(SysError::NotExecutable));
        }
    }

    #[test]
    fn test_entry_outside_window_rejected() {
        let image = ImageBuilder::new().file("bad", &program(0x1000, 64)).build();
        let fs = ImageFs::new(&image).unwrap();
        let dentry = fs.lookup_by_name(b"bad").unwrap();
        let mut window = vec![0u8; layout::USER_WINDOW_SIZE];
        assert_eq!(load(&fs, &mut window, &dentry), Err(SysError::NotExecutable));
    }
}
