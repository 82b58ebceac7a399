//! Programmable Interval Timer (8253/8254), the scheduler's clock.

use log::debug;
use triptych_common::limits::TIMER_FREQUENCY_HZ;
use x86_64::instructions::port::Port;

/// Input clock of the PIT in Hz.
const PIT_FREQUENCY: u32 = 1_193_180;

const PIT_CHANNEL0: u16 = 0x40;
const PIT_COMMAND: u16 = 0x43;

/// Channel 0, lobyte/hibyte, square wave.
const MODE_SQUARE_WAVE: u8 = 0x36;

/// Starts channel 0 at the scheduler rate.
pub fn init() {
    let divisor = PIT_FREQUENCY / TIMER_FREQUENCY_HZ;
    let mut command = Port::<u8>::new(PIT_COMMAND);
    let mut channel0 = Port::<u8>::new(PIT_CHANNEL0);

    // SAFETY: the PIT ports are owned by this module.
    unsafe {
        command.write(MODE_SQUARE_WAVE);
        channel0.write((divisor & 0xFF) as u8);
        channel0.write(((divisor >> 8) & 0xFF) as u8);
    }

    debug!("PIT initialized at {} Hz", TIMER_FREQUENCY_HZ);
}
