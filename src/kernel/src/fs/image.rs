//! Block-structured boot image.
//!
//! Layout, in 4 KiB blocks: the boot block (entry counts followed by up to 63
//! directory entries), then one block per inode, then the data blocks. All
//! integers are little-endian `u32`.

use super::{Dentry, FileSystem, FsError, ReadStatus};
use core::ops::Range;
use log::debug;
use triptych_common::limits::MAX_FILE_NAME_LEN;
use triptych_common::FileType;

/// Size of every block in the image.
pub const BLOCK_SIZE: usize = 4096;
/// Size of one directory entry.
pub const DENTRY_SIZE: usize = 64;
/// Directory entries that fit in the boot block after its header.
pub const MAX_DENTRIES: usize = BLOCK_SIZE / DENTRY_SIZE - 1;

const DENTRY_TYPE_OFFSET: usize = MAX_FILE_NAME_LEN;
const DENTRY_INODE_OFFSET: usize = MAX_FILE_NAME_LEN + 4;
const MAX_BLOCKS_PER_INODE: usize = BLOCK_SIZE / 4 - 1;

/// A file system image held in memory.
#[derive(Debug, Clone, Copy)]
pub struct ImageFs<'a> {
    image: &'a [u8],
    dir_count: usize,
    inode_count: usize,
    data_block_count: usize,
}

impl<'a> ImageFs<'a> {
    /// Validates the boot block of `image`.
    pub fn new(image: &'a [u8]) -> Result<Self, FsError> {
        let header = |index: usize| -> Result<usize, FsError> {
            read_u32(image, index * 4).map(|v| v as usize)
        };
        let dir_count = header(0)?;
        let inode_count = header(1)?;
        let data_block_count = header(2)?;

        if dir_count > MAX_DENTRIES {
            return Err(FsError::Corrupt);
        }
        let blocks = 1 + inode_count + data_block_count;
        if blocks.checked_mul(BLOCK_SIZE).map_or(true, |len| len > image.len()) {
            return Err(FsError::Corrupt);
        }

        debug!(
            "fs image: {} entries, {} inodes, {} data blocks",
            dir_count, inode_count, data_block_count
        );
        Ok(Self {
            image,
            dir_count,
            inode_count,
            data_block_count,
        })
    }

    /// Number of directory entries.
    pub fn len(&self) -> usize {
        self.dir_count
    }

    /// True when the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.dir_count == 0
    }

    fn inode_block(&self, inode: u32) -> Result<usize, FsError> {
        let inode = inode as usize;
        if inode >= self.inode_count {
            return Err(FsError::NotFound);
        }
        Ok((1 + inode) * BLOCK_SIZE)
    }

    fn data_block(&self, inode_block: usize, index: usize) -> Result<Range<usize>, FsError> {
        if index >= MAX_BLOCKS_PER_INODE {
            return Err(FsError::Corrupt);
        }
        let block = read_u32(self.image, inode_block + 4 + index * 4)? as usize;
        if block >= self.data_block_count {
            return Err(FsError::Corrupt);
        }
        let start = (1 + self.inode_count + block) * BLOCK_SIZE;
        Ok(start..start + BLOCK_SIZE)
    }
}

fn read_u32(image: &[u8], offset: usize) -> Result<u32, FsError> {
    image
        .get(offset..offset + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(FsError::Corrupt)
}

impl FileSystem for ImageFs<'_> {
    fn lookup_by_name(&self, name: &[u8]) -> Result<Dentry, FsError> {
        if name.is_empty() || name.len() > MAX_FILE_NAME_LEN {
            return Err(FsError::NotFound);
        }
        (0..self.dir_count)
            .map(|i| self.lookup_by_index(i))
            .find(|entry| entry.as_ref().map_or(true, |dentry| dentry.name() == name))
            .unwrap_or(Err(FsError::NotFound))
    }

    fn lookup_by_index(&self, index: usize) -> Result<Dentry, FsError> {
        if index >= self.dir_count {
            return Err(FsError::OutOfRange);
        }
        let base = DENTRY_SIZE * (1 + index);
        let mut name = [0u8; MAX_FILE_NAME_LEN];
        name.copy_from_slice(&self.image[base..base + MAX_FILE_NAME_LEN]);
        let file_type = FileType::try_from(read_u32(self.image, base + DENTRY_TYPE_OFFSET)?)
            .map_err(|_| FsError::Corrupt)?;
        let inode = read_u32(self.image, base + DENTRY_INODE_OFFSET)?;
        Ok(Dentry::new(name, file_type, inode))
    }

    fn read_bytes(&self, inode: u32, offset: usize, buf: &mut [u8]) -> Result<ReadStatus, FsError> {
        let length = self.inode_length(inode)?;
        let end = offset.checked_add(buf.len()).ok_or(FsError::OutOfRange)?;
        if offset >= length || end > length {
            return Err(FsError::OutOfRange);
        }

        let inode_block = self.inode_block(inode)?;
        let mut copied = 0;
        while copied < buf.len() {
            let position = offset + copied;
            let block = self.data_block(inode_block, position / BLOCK_SIZE)?;
            let within = position % BLOCK_SIZE;
            let chunk = (BLOCK_SIZE - within).min(buf.len() - copied);
            let source = &self.image[block.start + within..block.start + within + chunk];
            buf[copied..copied + chunk].copy_from_slice(source);
            copied += chunk;
        }

        if end == length {
            Ok(ReadStatus::EndOfFile)
        } else {
            Ok(ReadStatus::Read(copied))
        }
    }

    fn inode_length(&self, inode: u32) -> Result<usize, FsError> {
        let block = self.inode_block(inode)?;
        read_u32(self.image, block).map(|len| len as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ImageBuilder;

    #[test]
    fn test_lookup_by_name_and_index() {
        let image = ImageBuilder::new()
            .rtc("rtc")
            .file("frame0.txt", b"fish")
            .build();
        let fs = ImageFs::new(&image).unwrap();

        assert_eq!(fs.len(), 3);
        assert_eq!(fs.lookup_by_index(0).unwrap().name(), b".");
        assert_eq!(fs.lookup_by_name(b"rtc").unwrap().file_type, FileType::Rtc);
        let frame = fs.lookup_by_name(b"frame0.txt").unwrap();
        assert_eq!(frame.file_type, FileType::Regular);
        assert_eq!(fs.length_of(b"frame0.txt"), Ok(4));
        assert_eq!(fs.lookup_by_name(b"frame0"), Err(FsError::NotFound));
        assert_eq!(fs.lookup_by_index(3), Err(FsError::OutOfRange));
    }

    #[test]
    fn test_full_width_name() {
        let name = "verylargetextwithverylongname.tx";
        assert_eq!(name.len(), MAX_FILE_NAME_LEN);
        let image = ImageBuilder::new().file(name, b"x").build();
        let fs = ImageFs::new(&image).unwrap();

        assert_eq!(fs.lookup_by_name(name.as_bytes()).unwrap().name(), name.as_bytes());
        assert_eq!(
            fs.lookup_by_name(b"verylargetextwithverylongname.txt"),
            Err(FsError::NotFound)
        );
    }

    #[test]
    fn test_read_spanning_blocks() {
        let data: Vec<u8> = (0..3 * BLOCK_SIZE + 10).map(|i| (i % 251) as u8).collect();
        let image = ImageBuilder::new().file("big", &data).build();
        let fs = ImageFs::new(&image).unwrap();
        let inode = fs.lookup_by_name(b"big").unwrap().inode;

        let mut buf = vec![0u8; BLOCK_SIZE + 20];
        let status = fs.read_bytes(inode, BLOCK_SIZE - 10, &mut buf).unwrap();
        assert_eq!(status, ReadStatus::Read(buf.len()));
        assert_eq!(&buf[..], &data[BLOCK_SIZE - 10..2 * BLOCK_SIZE + 10]);
    }

    #[test]
    fn test_read_bounds() {
        let image = ImageBuilder::new().file("small", b"0123456789").build();
        let fs = ImageFs::new(&image).unwrap();
        let inode = fs.lookup_by_name(b"small").unwrap().inode;

        let mut buf = [0u8; 4];
        assert_eq!(fs.read_bytes(inode, 6, &mut buf), Ok(ReadStatus::EndOfFile));
        assert_eq!(&buf, b"6789");
        assert_eq!(fs.read_bytes(inode, 7, &mut buf), Err(FsError::OutOfRange));
        assert_eq!(fs.read_bytes(inode, 10, &mut buf[..0]), Err(FsError::OutOfRange));
        assert_eq!(fs.read_bytes(99, 0, &mut buf), Err(FsError::NotFound));
    }

    #[test]
    fn test_rejects_truncated_image() {
        let image = ImageBuilder::new().file("a", b"abc").build();
        assert_eq!(ImageFs::new(&image[..BLOCK_SIZE]).unwrap_err(), FsError::Corrupt);
        assert_eq!(ImageFs::new(&[]).unwrap_err(), FsError::Corrupt);
    }
}
