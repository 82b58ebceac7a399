//! Rights and object kinds behind a file descriptor.

use bitflags::bitflags;

bitflags! {
    /// Operations a descriptor permits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Access: u8 {
        /// `read` is allowed.
        const READ  = 1 << 0;
        /// `write` is allowed.
        const WRITE = 1 << 1;
    }
}

/// Kind of object a directory entry names. The discriminants are the
/// on-disk encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FileType {
    /// The real-time clock device.
    Rtc = 0,
    /// The (single, flat) directory.
    Directory = 1,
    /// A regular data file.
    Regular = 2,
}

impl TryFrom<u32> for FileType {
    type Error = u32;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(FileType::Rtc),
            1 => Ok(FileType::Directory),
            2 => Ok(FileType::Regular),
            other => Err(other),
        }
    }
}
