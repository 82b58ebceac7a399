//! x86_64 architecture support.
//!
//! Descriptor tables, interrupt controllers, the timer chips, paging, VGA
//! text mode and the serial port, plus the glue that feeds their events into
//! the portable kernel.

pub mod cmos;
pub mod context;
pub mod gdt;
pub mod interrupts;
pub mod machine;
pub mod memory;
pub mod pic;
pub mod pit;
pub mod serial;
pub mod trap;
pub mod vga;

pub use serial::SERIAL;
pub use vga::{Color, Writer, WRITER};

use crate::logger::{write_record, SerialSink};
use log::{Log, Metadata, Record};
use serial::SerialWrapper;

/// Sends `log` records to COM1.
struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= crate::LOG_LEVEL
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = write_record(&mut SerialSink(&mut SerialWrapper), record);
        }
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

/// Brings up the serial port and the logger, then the descriptor tables.
///
/// Interrupts stay disabled; the interrupt controllers and timers are
/// programmed later by [`start_devices`].
pub fn init() {
    serial::init();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(crate::LOG_LEVEL);
    }
    gdt::init();
    interrupts::init_idt();
}

/// Remaps and unmasks the PICs, then starts the PIT and the RTC.
pub fn start_devices() {
    pic::init();
    pit::init();
    cmos::init();
}

/// Halts the CPU until the next interrupt.
#[inline]
pub fn hlt() {
    x86_64::instructions::hlt();
}

/// Halts the CPU in an infinite loop.
///
/// Used after unrecoverable errors (panics).
pub fn halt_loop() -> ! {
    x86_64::instructions::interrupts::disable();
    loop {
        hlt();
    }
}
