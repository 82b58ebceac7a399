//! `open`, `read`, `write` and `close` for every kind of descriptor.

use super::user::{read_c_string, user_slice};
use super::Wait;
use crate::fs::{FileSystem, FsError};
use crate::rtc::RtcRate;
use crate::state::SchedulerState;
use crate::task::{FileDescriptor, FileOps};
use crate::terminal::console_write;
use log::trace;
use triptych_common::limits::{LINE_BUFFER_LEN, MAX_FILE_NAME_LEN};
use triptych_common::{Access, SysError};
use triptych_hal::{Mmu, Platform};

/// What a `read` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes copied to the caller.
    Done(usize),
    /// Nothing yet; the caller has to wait.
    Blocked(Wait),
}

fn open_descriptor(state: &SchedulerState, fd: usize, needs: Access) -> Result<FileDescriptor, SysError> {
    let descriptor = *state.current()?.files.get(fd)?;
    if !descriptor.flags.contains(needs) {
        return Err(SysError::BadDescriptor);
    }
    Ok(descriptor)
}

fn advance(state: &mut SchedulerState, fd: usize, by: usize) -> Result<(), SysError> {
    state.current_mut()?.files.get_mut(fd)?.position += by;
    Ok(())
}

/// Opens the file named by the string at `name` in the caller's first free
/// slot.
pub fn open(
    state: &mut SchedulerState,
    hw: &mut impl Mmu,
    fs: &impl FileSystem,
    name: usize,
) -> Result<usize, SysError> {
    let mut buf = [0u8; MAX_FILE_NAME_LEN + 1];
    let len = read_c_string(hw, name, &mut buf).map_err(|err| match err {
        SysError::InvalidArgument => SysError::NameTooLong,
        other => other,
    })?;
    let fd = state.current()?.files.free_slot()?;
    let dentry = fs.lookup_by_name(&buf[..len])?;
    let ops = FileOps::for_file_type(dentry.file_type);
    if ops == FileOps::Rtc {
        state.terminals.active_session_mut().rtc_rate = RtcRate::DEFAULT;
    }
    state
        .current_mut()?
        .files
        .install(fd, FileDescriptor::new(ops, dentry.inode))?;
    trace!("opened inode {} as fd {}", dentry.inode, fd);
    Ok(fd)
}

/// Closes `fd`. The standard streams cannot be closed.
pub fn close(state: &mut SchedulerState, fd: usize) -> Result<(), SysError> {
    state.current_mut()?.files.remove(fd)?;
    Ok(())
}

/// Reads up to `len` bytes from `fd` into the caller's buffer at `buf`.
pub fn read(
    state: &mut SchedulerState,
    hw: &mut impl Mmu,
    fs: &impl FileSystem,
    fd: usize,
    buf: usize,
    len: usize,
) -> Result<ReadOutcome, SysError> {
    let descriptor = open_descriptor(state, fd, Access::READ)?;
    user_slice(hw, buf, len)?;

    match descriptor.ops {
        FileOps::ConsoleIn => Ok(match take_line(state, hw, buf, len)? {
            Some(count) => ReadOutcome::Done(count),
            None => ReadOutcome::Blocked(Wait::Line { buf, len }),
        }),
        FileOps::Rtc => {
            state.terminals.active_session_mut().rtc_fired = false;
            Ok(ReadOutcome::Blocked(Wait::Rtc))
        }
        FileOps::Directory => {
            let dentry = match fs.lookup_by_index(descriptor.position) {
                Ok(dentry) => dentry,
                Err(FsError::OutOfRange) => return Ok(ReadOutcome::Done(0)),
                Err(err) => return Err(err.into()),
            };
            let name = dentry.name();
            let count = name.len().min(len);
            user_slice(hw, buf, count)?.copy_from_slice(&name[..count]);
            advance(state, fd, 1)?;
            Ok(ReadOutcome::Done(count))
        }
        FileOps::Regular => {
            let remaining = fs
                .inode_length(descriptor.inode)?
                .saturating_sub(descriptor.position);
            let count = remaining.min(len);
            if count == 0 {
                return Ok(ReadOutcome::Done(0));
            }
            fs.read_bytes(descriptor.inode, descriptor.position, user_slice(hw, buf, count)?)?;
            advance(state, fd, count)?;
            Ok(ReadOutcome::Done(count))
        }
        FileOps::ConsoleOut => Err(SysError::BadDescriptor),
    }
}

/// Writes `len` bytes from the caller's buffer at `buf` to `fd`.
pub fn write(
    state: &mut SchedulerState,
    hw: &mut impl Platform,
    fd: usize,
    buf: usize,
    len: usize,
) -> Result<usize, SysError> {
    let descriptor = open_descriptor(state, fd, Access::WRITE)?;
    user_slice(hw, buf, len)?;

    match descriptor.ops {
        FileOps::ConsoleOut => {
            let mut chunk = [0u8; LINE_BUFFER_LEN];
            let mut done = 0;
            while done < len {
                let count = (len - done).min(chunk.len());
                chunk[..count].copy_from_slice(user_slice(hw, buf + done, count)?);
                console_write(state, hw, &chunk[..count]);
                done += count;
            }
            Ok(len)
        }
        FileOps::Rtc => {
            let bytes: [u8; 4] = user_slice(hw, buf, len)?
                .try_into()
                .map_err(|_| SysError::InvalidArgument)?;
            let rate = RtcRate::from_hz(u32::from_le_bytes(bytes))?;
            state.terminals.active_session_mut().rtc_rate = rate;
            Ok(0)
        }
        FileOps::Directory | FileOps::Regular => Err(SysError::ReadOnly),
        FileOps::ConsoleIn => Err(SysError::BadDescriptor),
    }
}

/// Moves a completed line of the active terminal into the caller's buffer.
pub fn take_line(
    state: &mut SchedulerState,
    hw: &mut impl Mmu,
    buf: usize,
    len: usize,
) -> Result<Option<usize>, SysError> {
    let out = user_slice(hw, buf, len)?;
    Ok(state.terminals.active_session_mut().line.take_line(out))
}
