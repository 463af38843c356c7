//! Two-wire bus primitives
//!
//! Each primitive requests a bus condition or a byte transfer and then polls the matching
//! hardware flag for at most [`BusConfig::timeout`] iterations. A wait that runs out puts the bus
//! through software recovery and the primitive reports [`BusStatus::BUS_RESET`] instead of its
//! normal result.
//!
//! A fault means the slave's register pointer is gone. Callers must abandon the whole transaction
//! and start again from [`Twi::start`], never repeat the failed primitive in place.

use crate::hw_traits::twi::{TwiLines, TwiPeriph};
use crate::status::BusStatus;
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;

/// Default number of flag polls before a wait is declared stuck.
pub const DEFAULT_TIMEOUT: u16 = 1300;
/// Default bit-rate divisor. About 100kHz on the original board.
pub const DEFAULT_DIVISOR: u16 = 0x0012;
/// Default number of clock pulses used to free a stuck slave.
pub const DEFAULT_RECOVERY_PULSES: u8 = 9;
/// Recovery never pulses the clock more than this, whatever the configuration says.
pub const MAX_RECOVERY_PULSES: u8 = 20;

/// Hardware flag a primitive waits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wait {
    /// Start condition to finish
    Start,
    /// Repeated start to finish
    Restart,
    /// Stop condition to finish
    Stop,
    /// ACK/NACK sequence to finish
    Ack,
    /// Bus to go idle
    Idle,
    /// Transmit buffer to empty
    TxBuf,
    /// Receive buffer to fill
    RxBuf,
}

/// Struct used to configure the bus master
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusConfig {
    pub(crate) timeout: u16,
    pub(crate) divisor: u16,
    pub(crate) recovery_pulses: u8,
    pub(crate) pulse_half_period_us: u32,
}

impl BusConfig {
    /// Configuration matching the original board: 1300 polls per wait, divisor 0x12, nine
    /// recovery pulses with a 10us half period.
    pub const fn new() -> Self {
        BusConfig {
            timeout: DEFAULT_TIMEOUT,
            divisor: DEFAULT_DIVISOR,
            recovery_pulses: DEFAULT_RECOVERY_PULSES,
            pulse_half_period_us: 10,
        }
    }

    /// Number of flag polls before a wait is declared stuck. Must cover the slowest slave
    /// response, but stay short enough that the watchdog keeps being serviced.
    #[inline]
    pub const fn timeout(mut self, polls: u16) -> Self {
        self.timeout = polls;
        self
    }

    /// Bit-rate divisor programmed by [`Twi::init`].
    #[inline]
    pub const fn divisor(mut self, divisor: u16) -> Self {
        self.divisor = divisor;
        self
    }

    /// Clock pulses issued by recovery while SDA stays low. Clamped to [`MAX_RECOVERY_PULSES`].
    #[inline]
    pub const fn recovery_pulses(mut self, pulses: u8) -> Self {
        self.recovery_pulses = if pulses > MAX_RECOVERY_PULSES {
            MAX_RECOVERY_PULSES
        } else {
            pulses
        };
        self
    }

    /// Time SCL spends in each half of a recovery pulse.
    #[inline]
    pub const fn pulse_half_period_us(mut self, us: u32) -> Self {
        self.pulse_half_period_us = us;
        self
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Single owner of the bus master peripheral and its pins.
pub struct Twi<P, D> {
    pub(crate) periph: P,
    pub(crate) delay: D,
    pub(crate) config: BusConfig,
    pub(crate) recoveries: u32,
}

impl<P: TwiPeriph + TwiLines, D: DelayNs> Twi<P, D> {
    /// Wrap the peripheral. Call [`init`](Twi::init) before the first transfer.
    pub fn new(periph: P, delay: D, config: BusConfig) -> Self {
        Twi {
            periph,
            delay,
            config,
            recoveries: 0,
        }
    }

    /// Program bus timing and mode, then enable the master.
    pub fn init(&mut self) {
        self.periph.configure(self.config.divisor);
        self.periph.enable();
    }

    /// Active configuration
    #[inline]
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Number of software recoveries performed since construction.
    #[inline]
    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    /// Release the peripheral and delay provider.
    pub fn free(self) -> (P, D) {
        (self.periph, self.delay)
    }

    /// Check a flag once without blocking. `WouldBlock` while the condition or transfer is still
    /// in progress. Nothing times out or recovers here.
    #[inline]
    pub fn poll(&self, wait: Wait) -> nb::Result<(), Infallible> {
        let pending = match wait {
            Wait::Start => self.periph.start_rd(),
            Wait::Restart => self.periph.restart_rd(),
            Wait::Stop => self.periph.stop_rd(),
            Wait::Ack => self.periph.ack_rd(),
            Wait::Idle => self.periph.busy_rd(),
            Wait::TxBuf => self.periph.txbuf_full_rd(),
            Wait::RxBuf => !self.periph.rxbuf_full_rd(),
        };
        if pending {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    /// Poll without recovering on timeout. Only recovery itself uses this directly.
    pub(crate) fn wait_bounded(&self, wait: Wait) -> BusStatus {
        for _ in 0..self.config.timeout {
            match self.poll(wait) {
                Ok(()) => return BusStatus::Success,
                Err(nb::Error::WouldBlock) => core::hint::spin_loop(),
                Err(nb::Error::Other(e)) => match e {},
            }
        }
        BusStatus::BUS_RESET
    }

    fn wait(&mut self, wait: Wait) -> BusStatus {
        let stat = self.wait_bounded(wait);
        if !stat.is_success() {
            warn!("bus stuck waiting for {}", wait);
            self.recover();
        }
        stat
    }

    /// Assert a start condition.
    pub fn start(&mut self) -> BusStatus {
        self.periph.rx_discard();
        self.periph.start_set();
        self.wait(Wait::Start)
    }

    /// Assert a stop condition.
    pub fn stop(&mut self) -> BusStatus {
        self.periph.stop_set();
        self.wait(Wait::Stop)
    }

    /// Assert a repeated start condition.
    pub fn restart(&mut self) -> BusStatus {
        self.periph.rx_discard();
        self.periph.restart_set();
        self.wait(Wait::Restart)
    }

    /// Wait for the current transfer to finish.
    pub fn wait_idle(&mut self) -> BusStatus {
        self.wait(Wait::Idle)
    }

    /// Acknowledge the byte just received.
    pub fn ack(&mut self) -> BusStatus {
        self.periph.ack_set(false);
        self.wait(Wait::Ack)
    }

    /// Refuse the byte just received, ending a read.
    pub fn nack(&mut self) -> BusStatus {
        self.periph.ack_set(true);
        self.wait(Wait::Ack)
    }

    /// Transmit one byte, address or data. Any stage timing out ends the write early.
    pub fn write(&mut self, byte: u8) -> BusStatus {
        let stat = self.wait(Wait::Idle);
        if !stat.is_success() {
            return stat;
        }

        self.periph.tx_wr(byte);

        let stat = self.wait(Wait::TxBuf);
        if !stat.is_success() {
            return stat;
        }

        // Always idle the bus after a send
        self.wait(Wait::Idle)
    }

    /// Receive one byte into `byte`, then ACK it, or NACK it when `last` is set.
    ///
    /// `byte` is only updated on success.
    pub fn read(&mut self, byte: &mut u8, last: bool) -> BusStatus {
        self.periph.receive_set();

        let stat = self.wait(Wait::RxBuf);
        if !stat.is_success() {
            return stat;
        }

        let stat = if last { self.nack() } else { self.ack() };
        if stat.is_success() {
            *byte = self.periph.rx_rd();
        }
        stat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Event, SimTwi};
    use embedded_hal_mock::eh1::delay::NoopDelay;

    fn setup(sim: SimTwi) -> Twi<SimTwi, NoopDelay> {
        let mut twi = Twi::new(sim, NoopDelay::new(), BusConfig::new());
        twi.init();
        twi
    }

    #[test]
    fn init_programs_divisor_then_enables() {
        let twi = setup(SimTwi::new());
        assert_eq!(twi.periph.divisor(), Some(DEFAULT_DIVISOR));
        assert!(twi.periph.enabled());
        assert_eq!(twi.periph.events(), vec![Event::Configure, Event::Enable]);
    }

    #[test]
    fn conditions_succeed_on_responsive_bus() {
        let mut twi = setup(SimTwi::new());
        twi.periph.clear_events();
        assert_eq!(twi.start(), BusStatus::Success);
        assert_eq!(twi.restart(), BusStatus::Success);
        assert_eq!(twi.wait_idle(), BusStatus::Success);
        assert_eq!(twi.stop(), BusStatus::Success);
        assert_eq!(
            twi.periph.events(),
            vec![Event::Start, Event::Restart, Event::Stop]
        );
        assert_eq!(twi.recoveries(), 0);
    }

    #[test]
    fn stuck_flag_times_out_after_exact_budget() {
        for wait in [Wait::Start, Wait::Restart, Wait::Stop] {
            let mut sim = SimTwi::new();
            sim.stick(wait, 1);
            let mut twi = setup(sim);
            let stat = match wait {
                Wait::Start => twi.start(),
                Wait::Restart => twi.restart(),
                _ => twi.stop(),
            };
            assert_eq!(stat, BusStatus::BUS_RESET);
            assert_eq!(twi.periph.stuck_polls(), DEFAULT_TIMEOUT as u32);
            assert_eq!(twi.recoveries(), 1);
        }
    }

    #[test]
    fn custom_timeout_is_honoured() {
        let mut sim = SimTwi::new();
        sim.stick(Wait::Idle, 1);
        let mut twi = Twi::new(sim, NoopDelay::new(), BusConfig::new().timeout(25));
        twi.init();
        assert_eq!(twi.wait_idle(), BusStatus::BUS_RESET);
        assert_eq!(twi.periph.stuck_polls(), 25);
    }

    #[test]
    fn write_waits_idle_loads_buffer_and_idles_again() {
        let mut twi = setup(SimTwi::new());
        twi.periph.clear_events();
        assert_eq!(twi.write(0xA5), BusStatus::Success);
        assert_eq!(twi.periph.events(), vec![Event::Tx(0xA5)]);
        assert_eq!(twi.periph.polls(Wait::Idle), 2);
        assert_eq!(twi.periph.polls(Wait::TxBuf), 1);
    }

    #[test]
    fn write_short_circuits_on_first_timeout() {
        let mut sim = SimTwi::new();
        sim.stick(Wait::Idle, 1);
        let mut twi = setup(sim);
        twi.periph.clear_events();
        assert_eq!(twi.write(0x42), BusStatus::BUS_RESET);
        // Nothing loaded into the buffer after the failed idle wait
        assert!(!twi.periph.events().contains(&Event::Tx(0x42)));
        assert_eq!(twi.periph.polls(Wait::TxBuf), 0);

        let mut sim = SimTwi::new();
        sim.stick(Wait::TxBuf, 1);
        let mut twi = setup(sim);
        assert_eq!(twi.write(0x42), BusStatus::BUS_RESET);
        assert_eq!(twi.periph.polls(Wait::Idle), 1);
        assert_eq!(twi.recoveries(), 1);
    }

    #[test]
    fn read_acks_all_but_the_last_byte() {
        let mut twi = setup(SimTwi::new());
        twi.periph.load_registers([0x11, 0x22, 0, 0, 0, 0, 0]);
        twi.periph.clear_events();

        let mut first = 0;
        let mut second = 0;
        assert_eq!(twi.read(&mut first, false), BusStatus::Success);
        assert_eq!(twi.read(&mut second, true), BusStatus::Success);
        assert_eq!((first, second), (0x11, 0x22));
        assert_eq!(
            twi.periph.events(),
            vec![Event::Receive, Event::Ack, Event::Receive, Event::Nack]
        );
    }

    #[test]
    fn failed_read_leaves_byte_untouched() {
        let mut sim = SimTwi::new();
        sim.stick(Wait::RxBuf, 1);
        let mut twi = setup(sim);
        let mut byte = 0xEE;
        assert_eq!(twi.read(&mut byte, true), BusStatus::BUS_RESET);
        assert_eq!(byte, 0xEE);
        assert_eq!(twi.periph.polls(Wait::Ack), 0);

        let mut sim = SimTwi::new();
        sim.stick(Wait::Ack, 1);
        let mut twi = setup(sim);
        assert_eq!(twi.read(&mut byte, false), BusStatus::BUS_RESET);
        assert_eq!(byte, 0xEE);
    }

    #[test]
    fn ack_and_nack_drive_the_ack_bit() {
        let mut twi = setup(SimTwi::new());
        twi.periph.clear_events();
        assert!(twi.ack().is_success());
        assert!(twi.nack().is_success());
        assert_eq!(twi.periph.events(), vec![Event::Ack, Event::Nack]);
    }

    #[test]
    fn poll_reports_would_block_without_recovering() {
        let mut sim = SimTwi::new();
        sim.stick(Wait::Idle, 1);
        let twi = setup(sim);
        assert_eq!(twi.poll(Wait::Idle), Err(nb::Error::WouldBlock));
        assert_eq!(twi.poll(Wait::Idle), Err(nb::Error::WouldBlock));
        assert_eq!(twi.poll(Wait::TxBuf), Ok(()));
        assert_eq!(twi.recoveries(), 0);
    }

    #[test]
    fn conditions_drop_leftover_received_byte() {
        let mut sim = SimTwi::new();
        sim.read_ahead(true);
        let mut twi = setup(sim);
        twi.periph.load_registers([0x11, 0x22, 0x33, 0, 0, 0, 0]);

        let mut byte = 0;
        assert!(twi.read(&mut byte, true).is_success());
        assert_eq!(byte, 0x11);
        // The peripheral clocked in one more byte after the NACK
        assert_eq!(twi.poll(Wait::RxBuf), Ok(()));
        assert!(twi.stop().is_success());

        assert!(twi.start().is_success());
        assert_eq!(twi.poll(Wait::RxBuf), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn pulse_count_is_clamped() {
        assert_eq!(BusConfig::new().recovery_pulses(200).recovery_pulses, MAX_RECOVERY_PULSES);
        assert_eq!(BusConfig::new().recovery_pulses(4).recovery_pulses, 4);
        assert_eq!(BusConfig::default(), BusConfig::new());
    }
}
