//! CMOS real-time clock in periodic interrupt mode.

use crate::rtc::HARDWARE_RATE_HZ;
use log::debug;
use x86_64::instructions::port::Port;

const CMOS_INDEX: u16 = 0x70;
const CMOS_DATA: u16 = 0x71;

/// Register selectors with NMI disabled.
const REGISTER_A: u8 = 0x8A;
const REGISTER_B: u8 = 0x8B;
const REGISTER_C: u8 = 0x0C;

/// Periodic interrupt enable bit in register B.
const PERIODIC_INTERRUPT: u8 = 0x40;

/// Rate selector for 512 Hz: 32768 >> (7 - 1).
const RATE_512_HZ: u8 = 7;

fn read(register: u8) -> u8 {
    let mut index = Port::<u8>::new(CMOS_INDEX);
    let mut data = Port::<u8>::new(CMOS_DATA);
    // SAFETY: the CMOS ports are owned by this module.
    unsafe {
        index.write(register);
        data.read()
    }
}

fn write(register: u8, value: u8) {
    let mut index = Port::<u8>::new(CMOS_INDEX);
    let mut data = Port::<u8>::new(CMOS_DATA);
    // SAFETY: the CMOS ports are owned by this module.
    unsafe {
        index.write(register);
        data.write(value);
    }
}

/// Turns on the periodic interrupt at the hardware rate.
pub fn init() {
    let b = read(REGISTER_B);
    write(REGISTER_B, b | PERIODIC_INTERRUPT);
    let a = read(REGISTER_A);
    write(REGISTER_A, (a & 0xF0) | RATE_512_HZ);
    acknowledge();
    debug!("RTC initialized at {} Hz", HARDWARE_RATE_HZ);
}

/// Reads register C so the chip raises the next interrupt.
pub fn acknowledge() {
    read(REGISTER_C);
}
