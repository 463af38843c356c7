//! Software bus recovery
//!
//! A slave interrupted mid-byte keeps SDA low while it waits for clocks that never come. Clocking
//! SCL by hand lets it finish the byte and release the line; nine pulses cover any byte plus its
//! acknowledge bit. A restart followed by a stop then returns the bus to a known idle state.
//!
//! On backends that only emit a start together with an address byte (see `usci`), the closing
//! restart leaves no mark on the wire and only the stop is actually driven.
//!
//! Recovery is best effort and reports nothing. The transaction layer's retry is what actually
//! guards against a bus that stays stuck.

use crate::bus::{Twi, Wait, MAX_RECOVERY_PULSES};
use crate::hw_traits::twi::{TwiLines, TwiPeriph};
use embedded_hal::delay::DelayNs;

impl<P: TwiPeriph + TwiLines, D: DelayNs> Twi<P, D> {
    /// Reset the peripheral and clock SCL until the slave lets go of SDA. Returns the number of
    /// clock pulses issued, never more than [`MAX_RECOVERY_PULSES`].
    pub(crate) fn recover(&mut self) -> u8 {
        self.recoveries = self.recoveries.wrapping_add(1);
        debug!("bus recovery #{}", self.recoveries);

        self.periph.disable();
        self.init();

        self.periph.lines_to_gpio();

        let limit = self.config.recovery_pulses.min(MAX_RECOVERY_PULSES);
        let mut pulses = 0;
        while !self.periph.sda_rd() && pulses < limit {
            self.pulse_scl();
            pulses += 1;
        }

        self.periph.lines_to_periph();
        debug!("recovery issued {} clock pulses", pulses);

        // Conditions issued here must not recurse into another recovery
        self.periph.restart_set();
        let _ = self.wait_bounded(Wait::Restart);
        self.periph.stop_set();
        let _ = self.wait_bounded(Wait::Stop);

        pulses
    }

    // High, low, high again, holding each level for a half period
    fn pulse_scl(&mut self) {
        let half = self.config.pulse_half_period_us;
        self.periph.scl_wr(true);
        self.delay.delay_us(half);
        self.periph.scl_wr(false);
        self.delay.delay_us(half);
        self.periph.scl_wr(true);
    }
}
