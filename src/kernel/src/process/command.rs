//! Command line splitting.

use triptych_common::limits::{MAX_ARGUMENT_LEN, MAX_FILE_NAME_LEN};
use triptych_common::SysError;

/// A command line split into program name and argument tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    /// Program to run.
    pub name: &'a [u8],
    /// Everything after the single space that ends the name.
    pub arguments: &'a [u8],
}

impl<'a> Command<'a> {
    /// The name starts at the first byte and runs to the next space, so a
    /// line with a leading space has an empty name.
    pub fn parse(line: &'a [u8]) -> Result<Self, SysError> {
        let end = line.iter().position(|&b| b == b' ').unwrap_or(line.len());
        let (name, rest) = line.split_at(end);

        if name.is_empty() {
            return Err(SysError::NotFound);
        }
        if name.len() > MAX_FILE_NAME_LEN {
            return Err(SysError::NameTooLong);
        }
        let arguments = rest.get(1..).unwrap_or_default();
        if arguments.len() > MAX_ARGUMENT_LEN {
            return Err(SysError::ArgumentsTooLong);
        }
        Ok(Self { name, arguments })
    }
}
