//! Per-task file descriptor table.

use bitflags::bitflags;
use triptych_common::limits::{FIRST_ASSIGNABLE_FD, MAX_OPEN_FILES};
use triptych_common::{Access, FileType, SysError};

bitflags! {
    /// Which descriptor slots are live. Bit `n` is slot `n`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFiles: u8 {
        /// Console input, slot 0.
        const STDIN  = 1 << 0;
        /// Console output, slot 1.
        const STDOUT = 1 << 1;
    }
}

impl OpenFiles {
    /// The bit for slot `fd`.
    pub fn slot(fd: usize) -> Self {
        OpenFiles::from_bits_retain(1 << fd)
    }
}

/// Which set of operations a descriptor dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileOps {
    /// Line input from the active terminal.
    ConsoleIn,
    /// Output to the active terminal.
    ConsoleOut,
    /// The virtual real-time clock.
    Rtc,
    /// Directory listing.
    Directory,
    /// Regular file contents.
    Regular,
}

impl FileOps {
    /// Operations for a file system object of type `file_type`.
    pub fn for_file_type(file_type: FileType) -> Self {
        match file_type {
            FileType::Rtc => FileOps::Rtc,
            FileType::Directory => FileOps::Directory,
            FileType::Regular => FileOps::Regular,
        }
    }

    /// Operations a descriptor of this kind accepts at all.
    pub fn access(self) -> Access {
        match self {
            FileOps::ConsoleIn => Access::READ,
            FileOps::ConsoleOut => Access::WRITE,
            FileOps::Rtc | FileOps::Directory | FileOps::Regular => Access::READ | Access::WRITE,
        }
    }
}

/// One descriptor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Operations backing this descriptor.
    pub ops: FileOps,
    /// Inode of the backing file; zero for devices.
    pub inode: u32,
    /// Byte offset for files, entry index for the directory.
    pub position: usize,
    /// Permitted operations.
    pub flags: Access,
}

impl FileDescriptor {
    /// A fresh descriptor at position zero.
    pub fn new(ops: FileOps, inode: u32) -> Self {
        Self {
            ops,
            inode,
            position: 0,
            flags: ops.access(),
        }
    }
}

/// The fixed array of descriptor slots of one task.
///
/// A slot holds a descriptor exactly when its bit is set in the open mask;
/// both only change together through [`FileTable::install`] and
/// [`FileTable::remove`].
#[derive(Debug, Clone)]
pub struct FileTable {
    slots: [Option<FileDescriptor>; MAX_OPEN_FILES],
    open: OpenFiles,
}

impl FileTable {
    /// Table with console input and output in slots 0 and 1.
    pub fn with_stdio() -> Self {
        let mut slots = [None; MAX_OPEN_FILES];
        slots[0] = Some(FileDescriptor::new(FileOps::ConsoleIn, 0));
        slots[1] = Some(FileDescriptor::new(FileOps::ConsoleOut, 0));
        Self {
            slots,
            open: OpenFiles::STDIN | OpenFiles::STDOUT,
        }
    }

    /// Bitmask of live slots.
    pub fn open_mask(&self) -> OpenFiles {
        self.open
    }

    /// The descriptor in slot `fd`.
    pub fn get(&self, fd: usize) -> Result<&FileDescriptor, SysError> {
        self.slots
            .get(fd)
            .and_then(Option::as_ref)
            .ok_or(SysError::BadDescriptor)
    }

    /// Mutable access to the descriptor in slot `fd`.
    pub fn get_mut(&mut self, fd: usize) -> Result<&mut FileDescriptor, SysError> {
        self.slots
            .get_mut(fd)
            .and_then(Option::as_mut)
            .ok_or(SysError::BadDescriptor)
    }

    /// Lowest unused assignable slot.
    pub fn free_slot(&self) -> Result<usize, SysError> {
        (FIRST_ASSIGNABLE_FD..MAX_OPEN_FILES)
            .find(|&fd| !self.open.contains(OpenFiles::slot(fd)))
            .ok_or(SysError::NoFreeDescriptor)
    }

    /// Puts `descriptor` into the free slot `fd`.
    pub fn install(&mut self, fd: usize, descriptor: FileDescriptor) -> Result<(), SysError> {
        if !(FIRST_ASSIGNABLE_FD..MAX_OPEN_FILES).contains(&fd) || self.slots[fd].is_some() {
            return Err(SysError::BadDescriptor);
        }
        self.slots[fd] = Some(descriptor);
        self.open.insert(OpenFiles::slot(fd));
        Ok(())
    }

    /// Takes the descriptor out of slot `fd`. The console pair cannot be removed.
    pub fn remove(&mut self, fd: usize) -> Result<FileDescriptor, SysError> {
        if !(FIRST_ASSIGNABLE_FD..MAX_OPEN_FILES).contains(&fd) {
            return Err(SysError::BadDescriptor);
        }
        let descriptor = self.slots[fd].take().ok_or(SysError::BadDescriptor)?;
        self.open.remove(OpenFiles::slot(fd));
        Ok(descriptor)
    }

    /// Removes every assignable descriptor, returning how many were open.
    pub fn close_all(&mut self) -> usize {
        (FIRST_ASSIGNABLE_FD..MAX_OPEN_FILES)
            .filter(|&fd| self.remove(fd).is_ok())
            .count()
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::with_stdio()
    }
}
