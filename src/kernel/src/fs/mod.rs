//! Filesystem Traits and Types.
//!
//! The kernel only ever reads from its file system. Everything it needs is
//! behind [`FileSystem`]; [`image::ImageFs`] implements it over the boot image.

pub mod image;

pub use image::ImageFs;

use core::fmt;
use triptych_common::limits::MAX_FILE_NAME_LEN;
use triptych_common::{FileType, SysError};

/// Error type for filesystem operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// No such name or inode.
    NotFound,
    /// Index or byte range past the end.
    OutOfRange,
    /// The image contradicts itself.
    Corrupt,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound => write!(f, "not found"),
            FsError::OutOfRange => write!(f, "out of range"),
            FsError::Corrupt => write!(f, "corrupt image"),
        }
    }
}

impl From<FsError> for SysError {
    fn from(err: FsError) -> Self {
        match err {
            FsError::NotFound => SysError::NotFound,
            FsError::OutOfRange | FsError::Corrupt => SysError::Io,
        }
    }
}

/// A directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dentry {
    name: [u8; MAX_FILE_NAME_LEN],
    /// Object kind.
    pub file_type: FileType,
    /// Inode number; meaningful for regular files only.
    pub inode: u32,
}

impl Dentry {
    /// Builds an entry from a raw, NUL-padded name field.
    pub fn new(name: [u8; MAX_FILE_NAME_LEN], file_type: FileType, inode: u32) -> Self {
        Self { name, file_type, inode }
    }

    /// The name without padding. A full-width name has no terminator.
    pub fn name(&self) -> &[u8] {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(MAX_FILE_NAME_LEN);
        &self.name[..len]
    }
}

/// Successful outcome of [`FileSystem::read_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The buffer was filled and bytes remain after it.
    Read(usize),
    /// The buffer was filled and its last byte is the last byte of the file.
    EndOfFile,
}

/// Trait for a read-only filesystem.
pub trait FileSystem {
    /// Finds the entry called `name`.
    fn lookup_by_name(&self, name: &[u8]) -> Result<Dentry, FsError>;

    /// The `index`-th entry in directory order.
    fn lookup_by_index(&self, index: usize) -> Result<Dentry, FsError>;

    /// Fills `buf` from `inode` starting at `offset`.
    ///
    /// Fails when `offset` is at or past the end of the file or when `buf`
    /// would extend past it; never reads short.
    fn read_bytes(&self, inode: u32, offset: usize, buf: &mut [u8]) -> Result<ReadStatus, FsError>;

    /// Length in bytes of `inode`.
    fn inode_length(&self, inode: u32) -> Result<usize, FsError>;

    /// Length in bytes of the file called `name`.
    fn length_of(&self, name: &[u8]) -> Result<usize, FsError> {
        let dentry = self.lookup_by_name(name)?;
        self.inode_length(dentry.inode)
    }
}
