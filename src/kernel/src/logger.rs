//! Log record formatting for a byte-oriented serial line.

use core::fmt::{self, Write};
use log::Record;
use triptych_hal::Serial;

/// `fmt::Write` over a serial port, with CRLF line endings.
pub struct SerialSink<'a, S: Serial>(pub &'a mut S);

impl<S: Serial> Write for SerialSink<'_, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.0.write_byte(b'\r');
            }
            self.0.write_byte(byte);
        }
        Ok(())
    }
}

/// Writes `record` as one `[LEVEL] target: message` line.
pub fn write_record<W: Write>(out: &mut W, record: &Record<'_>) -> fmt::Result {
    writeln!(out, "[{:<5}] {}: {}", record.level(), record.target(), record.args())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[derive(Default)]
    struct Capture(Vec<u8>);

    impl Serial for Capture {
        fn write_byte(&mut self, byte: u8) {
            self.0.push(byte);
        }

        fn read_byte(&mut self) -> Option<u8> {
            None
        }
    }

    #[test]
    fn test_record_line() {
        let mut port = Capture::default();
        write_record(
            &mut SerialSink(&mut port),
            &Record::builder()
                .level(Level::Warn)
                .target("triptych_kernel::process")
                .args(format_args!("task {} faulted", 3))
                .build(),
        )
        .unwrap();
        assert_eq!(
            port.0,
            b"[WARN ] triptych_kernel::process: task 3 faulted\r\n".to_vec()
        );
    }
}
