//! Virtual real-time clock.
//!
//! The hardware clock interrupts at [`HARDWARE_RATE_HZ`]. Every terminal sees
//! its own, slower clock derived from a shared tick counter: a terminal running
//! at `2^k` Hz fires whenever bit `9 - k` of the counter changes.

use crate::state::SchedulerState;
use triptych_common::SysError;

/// Interrupt rate programmed into the clock chip.
pub const HARDWARE_RATE_HZ: u32 = 512;

const SLOWEST_HZ: u32 = 2;

/// A per-terminal clock rate, stored as the counter bit that drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcRate(u8);

impl RtcRate {
    /// Rate after `open`: 2 Hz.
    pub const DEFAULT: Self = RtcRate(8);

    /// Accepts powers of two from 2 to 512 Hz.
    pub fn from_hz(hz: u32) -> Result<Self, SysError> {
        if !hz.is_power_of_two() || !(SLOWEST_HZ..=HARDWARE_RATE_HZ).contains(&hz) {
            return Err(SysError::InvalidArgument);
        }
        Ok(RtcRate((HARDWARE_RATE_HZ / hz).trailing_zeros() as u8))
    }

    /// The rate in Hz.
    pub fn hz(self) -> u32 {
        HARDWARE_RATE_HZ >> self.0
    }

    /// Whether the clock fires on the tick that advances `counter`.
    pub fn fires_at(self, counter: u32) -> bool {
        (counter ^ counter.wrapping_add(1)) >> self.0 & 1 == 1
    }
}

impl Default for RtcRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Hardware clock interrupt: raises the fired flag of every terminal whose
/// virtual clock ticks now.
pub fn on_rtc_tick(state: &mut SchedulerState) {
    let counter = state.rtc_counter;
    for session in state.terminals.sessions_mut() {
        if session.rtc_rate.fires_at(counter) {
            session.rtc_fired = true;
        }
    }
    state.rtc_counter = counter.wrapping_add(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockMachine;

    #[test]
    fn test_rate_encoding() {
        assert_eq!(RtcRate::from_hz(2), Ok(RtcRate::DEFAULT));
        assert_eq!(RtcRate::from_hz(512).unwrap().hz(), 512);
        assert_eq!(RtcRate::from_hz(64).unwrap().hz(), 64);
        assert_eq!(RtcRate::from_hz(1024), Err(SysError::InvalidArgument));
        assert_eq!(RtcRate::from_hz(1), Err(SysError::InvalidArgument));
        assert_eq!(RtcRate::from_hz(48), Err(SysError::InvalidArgument));
        assert_eq!(RtcRate::from_hz(0), Err(SysError::InvalidArgument));
    }

    #[test]
    fn test_fire_counts_match_rate() {
        for hz in [2, 8, 128, 512] {
            let rate = RtcRate::from_hz(hz).unwrap();
            let fired = (0..HARDWARE_RATE_HZ).filter(|&c| rate.fires_at(c)).count();
            assert_eq!(fired as u32, hz, "{} Hz", hz);
        }
    }

    #[test]
    fn test_terminals_have_independent_clocks() {
        let machine = MockMachine::new();
        let mut state = SchedulerState::new(&machine);
        state.terminals.session_mut(1).rtc_rate = RtcRate::from_hz(512).unwrap();

        on_rtc_tick(&mut state);
        assert!(!state.terminals.session(0).rtc_fired);
        assert!(state.terminals.session(1).rtc_fired);
        assert!(!state.terminals.session(2).rtc_fired);

        while state.rtc_counter < 255 {
            on_rtc_tick(&mut state);
        }
        assert!(!state.terminals.session(0).rtc_fired);
        on_rtc_tick(&mut state);
        assert!(state.terminals.session(0).rtc_fired);
        assert!(state.terminals.session(2).rtc_fired);
    }
}
