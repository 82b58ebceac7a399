//! Line-input buffer.

use triptych_common::limits::LINE_BUFFER_LEN;

/// Characters typed into one terminal since its last completed read.
///
/// Holds at most `LINE_BUFFER_LEN - 1` characters plus the newline that
/// completes the line. Once complete it accepts nothing until the line is
/// taken.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    bytes: [u8; LINE_BUFFER_LEN],
    len: usize,
}

impl LineBuffer {
    /// Empty buffer.
    pub const fn new() -> Self {
        Self {
            bytes: [0; LINE_BUFFER_LEN],
            len: 0,
        }
    }

    /// Whether a complete line is waiting.
    pub fn is_ready(&self) -> bool {
        self.len > 0 && self.bytes[self.len - 1] == b'\n'
    }

    /// Pending characters.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Appends `byte`; returns whether it was accepted and should be echoed.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_ready() || (self.len == LINE_BUFFER_LEN - 1 && byte != b'\n') {
            return false;
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        true
    }

    /// Removes the last character of an incomplete line.
    pub fn pop(&mut self) -> Option<u8> {
        if self.len == 0 || self.is_ready() {
            return None;
        }
        self.len -= 1;
        Some(self.bytes[self.len])
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Copies a completed line into `out`, at most `out.len()` bytes, and
    /// empties the buffer. `None` while the line is still being typed.
    pub fn take_line(&mut self, out: &mut [u8]) -> Option<usize> {
        if !self.is_ready() {
            return None;
        }
        let count = self.len.min(out.len());
        out[..count].copy_from_slice(&self.bytes[..count]);
        self.clear();
        Some(count)
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_completes_on_newline() {
        let mut line = LineBuffer::new();
        for &b in b"ls" {
            assert!(line.push(b));
        }
        assert!(!line.is_ready());
        assert!(line.push(b'\n'));
        assert!(line.is_ready());
        assert!(!line.push(b'x'));

        let mut out = [0u8; 16];
        assert_eq!(line.take_line(&mut out), Some(3));
        assert_eq!(&out[..3], b"ls\n");
        assert!(line.as_bytes().is_empty());
    }

    #[test]
    fn test_full_buffer_only_takes_newline() {
        let mut line = LineBuffer::new();
        for _ in 0..LINE_BUFFER_LEN - 1 {
            assert!(line.push(b'a'));
        }
        assert!(!line.push(b'a'));
        assert!(line.push(b'\n'));
        assert_eq!(line.as_bytes().len(), LINE_BUFFER_LEN);
    }

    #[test]
    fn test_short_read_consumes_line() {
        let mut line = LineBuffer::new();
        for &b in b"hello\n" {
            line.push(b);
        }
        let mut out = [0u8; 2];
        assert_eq!(line.take_line(&mut out), Some(2));
        assert_eq!(&out, b"he");
        assert!(!line.is_ready());
    }

    #[test]
    fn test_backspace() {
        let mut line = LineBuffer::new();
        assert_eq!(line.pop(), None);
        line.push(b'a');
        line.push(b'\t');
        assert_eq!(line.pop(), Some(b'\t'));
        assert_eq!(line.as_bytes(), b"a");
        line.push(b'\n');
        assert_eq!(line.pop(), None);
    }
}
