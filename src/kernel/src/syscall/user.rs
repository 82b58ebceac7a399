//! Access to the calling program's memory.

use crate::mm::layout;
use triptych_common::SysError;
use triptych_hal::Mmu;

/// The `len` bytes at user address `addr`, which must lie inside the window.
pub fn user_slice(mmu: &mut impl Mmu, addr: usize, len: usize) -> Result<&mut [u8], SysError> {
    let offset = layout::window_offset(addr, len).ok_or(SysError::BadAddress)?;
    Ok(&mut mmu.user_window()[offset..offset + len])
}

/// Copies the NUL-terminated string at `addr` into `out` and returns its
/// length. The terminator has to fit in `out` too.
pub fn read_c_string(mmu: &mut impl Mmu, addr: usize, out: &mut [u8]) -> Result<usize, SysError> {
    let offset = layout::window_offset(addr, 1).ok_or(SysError::BadAddress)?;
    let available = &mmu.user_window()[offset..];
    let limit = available.len().min(out.len());
    let len = available[..limit]
        .iter()
        .position(|&b| b == 0)
        .ok_or(SysError::InvalidArgument)?;
    out[..len].copy_from_slice(&available[..len]);
    Ok(len)
}
