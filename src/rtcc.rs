//! MCP7940-style real-time clock/calendar
//!
//! Reads and writes the seven timekeeping registers over the [`Twi`] bus. Each transaction is a
//! fixed sequence of primitives whose statuses are folded together; if any step faulted, the
//! whole sequence is discarded and issued again from the start condition.
//!
//! [`Rtcc::get_time`] and [`Rtcc::set_time`] retry until they succeed and cannot fail. A bus that
//! never recovers stalls the caller inside them. The `try_` variants follow the configured
//! [`RetryPolicy`] and give up with [`Error::RetriesExhausted`] instead.

use crate::bcd::{bcd_from_decimal, decimal_from_bcd};
use crate::bus::Twi;
use crate::hw_traits::twi::{TwiLines, TwiPeriph};
use crate::status::{BusStatus, Fault};
use core::num::NonZeroU32;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as I2cError, ErrorKind};

/// Device address with the write direction bit
pub const ADDR_WRITE: u8 = 0xDE;
/// Device address with the read direction bit
pub const ADDR_READ: u8 = 0xDF;

/// Timekeeping register offsets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// Seconds, oscillator start bit
    Seconds = 0x00,
    /// Minutes
    Minutes = 0x01,
    /// Hours, 12/24 select
    Hours = 0x02,
    /// Weekday, oscillator running / power fail / battery enable
    Weekday = 0x03,
    /// Day of month
    Date = 0x04,
    /// Month, leap year
    Month = 0x05,
    /// Year within century
    Year = 0x06,
}

/// Seconds: oscillator start
const ST: u8 = 0x80;
/// Hours: 12-hour mode when set
const HOUR_12: u8 = 0x40;
/// Weekday: battery backup enable
const VBATEN: u8 = 0x08;
/// Month: leap year
const LPYR: u8 = 0x20;

const SECONDS_MASK: u8 = 0x7F;
const MINUTES_MASK: u8 = 0x7F;
const HOURS_MASK: u8 = 0x3F;
const WEEKDAY_MASK: u8 = 0x07;
const DATE_MASK: u8 = 0x3F;
const MONTH_MASK: u8 = 0x1F;

/// Wall-clock time, every field in plain decimal.
///
/// Fields must be in their conventional ranges (second 0-59, hour 0-23, year 0-99 within the
/// century, ...). Out of range values are not clamped and produce unspecified register contents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    /// 0-59
    pub second: u8,
    /// 0-59
    pub minute: u8,
    /// 0-23
    pub hour: u8,
    /// 0-7
    pub weekday: u8,
    /// 1-31
    pub day: u8,
    /// 1-12
    pub month: u8,
    /// 0-99
    pub year: u8,
}

impl DateTime {
    /// Encode into register contents, seconds first, with the control bits a running clock needs:
    /// oscillator started, 24-hour mode, battery backup on, leap year when `year % 4 == 0`.
    ///
    /// Battery backup is the single VBATEN bit (0x08) of the weekday register. The weekday itself
    /// lives in the low three bits, so the whole 0x07 field is never OR'd in.
    pub fn to_registers(&self) -> [u8; 7] {
        let month = bcd_from_decimal(self.month);
        let month = if self.year % 4 == 0 {
            month | LPYR
        } else {
            month & !LPYR
        };

        [
            bcd_from_decimal(self.second) | ST,
            bcd_from_decimal(self.minute),
            bcd_from_decimal(self.hour) & !HOUR_12,
            bcd_from_decimal(self.weekday) | VBATEN,
            bcd_from_decimal(self.day),
            month,
            bcd_from_decimal(self.year),
        ]
    }

    /// Decode register contents, seconds first, discarding the control bits.
    pub fn from_registers(regs: &[u8; 7]) -> Self {
        DateTime {
            second: decimal_from_bcd(regs[0] & SECONDS_MASK),
            minute: decimal_from_bcd(regs[1] & MINUTES_MASK),
            hour: decimal_from_bcd(regs[2] & HOURS_MASK),
            weekday: decimal_from_bcd(regs[3] & WEEKDAY_MASK),
            day: decimal_from_bcd(regs[4] & DATE_MASK),
            month: decimal_from_bcd(regs[5] & MONTH_MASK),
            year: decimal_from_bcd(regs[6]),
        }
    }
}

/// How many times a transaction is attempted before giving up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RetryPolicy {
    /// Never give up
    #[default]
    Forever,
    /// Give up after this many failed attempts
    Attempts(NonZeroU32),
}

impl RetryPolicy {
    #[inline]
    fn exhausted(self, attempts: u32) -> bool {
        match self {
            RetryPolicy::Forever => false,
            RetryPolicy::Attempts(max) => attempts >= max.get(),
        }
    }
}

/// Transaction kinds, named in logs and errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Op {
    /// Burst read of all timekeeping registers
    ReadTime,
    /// Zero the seconds register, stopping the oscillator
    StopOscillator,
    /// Write minutes through year. Giving up here may leave some fields written.
    WriteFields,
    /// Write seconds and restart the oscillator
    WriteSeconds,
}

/// RTCC transaction errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The retry policy ran out before an attempt fully succeeded
    RetriesExhausted {
        /// Transaction that gave up
        op: Op,
        /// Faults seen on the last attempt
        fault: Fault,
        /// Attempts made, including the last
        attempts: u32,
    },
}

impl I2cError for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::RetriesExhausted { fault, .. } => fault.kind(),
        }
    }
}

/// RTCC driver. Owns the bus; construct it once and pass it by reference.
pub struct Rtcc<P, D> {
    bus: Twi<P, D>,
    policy: RetryPolicy,
}

impl<P: TwiPeriph + TwiLines, D: DelayNs> Rtcc<P, D> {
    /// Take ownership of the bus. The `try_` methods retry forever until a policy is set with
    /// [`with_retry_policy`](Rtcc::with_retry_policy).
    pub fn new(bus: Twi<P, D>) -> Self {
        Rtcc {
            bus,
            policy: RetryPolicy::Forever,
        }
    }

    /// Set the policy used by [`try_get_time`](Rtcc::try_get_time) and
    /// [`try_set_time`](Rtcc::try_set_time).
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Configured retry policy
    #[inline]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// One-time bus setup. Call at system start before any transaction.
    pub fn initialize_bus(&mut self) {
        self.bus.init();
    }

    /// The underlying bus, for diagnostics such as [`Twi::recoveries`].
    #[inline]
    pub fn bus(&self) -> &Twi<P, D> {
        &self.bus
    }

    /// Give the bus back.
    pub fn release(self) -> Twi<P, D> {
        self.bus
    }

    /// Read the current time, retrying until the bus cooperates.
    pub fn get_time(&mut self) -> DateTime {
        loop {
            // Forever never yields Err, so this runs once
            if let Ok(time) = self.read_time(RetryPolicy::Forever) {
                return time;
            }
        }
    }

    /// Read the current time under the configured retry policy.
    pub fn try_get_time(&mut self) -> Result<DateTime, Error> {
        self.read_time(self.policy)
    }

    /// Set the clock, retrying each phase until it succeeds.
    pub fn set_time(&mut self, time: &DateTime) {
        loop {
            if self.write_time(time, RetryPolicy::Forever).is_ok() {
                return;
            }
        }
    }

    /// Set the clock under the configured retry policy. Each phase has its own attempt budget.
    ///
    /// If the policy runs out after the oscillator was stopped, one more attempt writes the new
    /// seconds with the start bit to get the clock running again. The other fields may then hold
    /// a mix of old and new values, so a failed set should be repeated.
    pub fn try_set_time(&mut self, time: &DateTime) -> Result<(), Error> {
        self.write_time(time, self.policy)
    }

    fn read_time(&mut self, policy: RetryPolicy) -> Result<DateTime, Error> {
        let regs = self.transact(policy, Op::ReadTime, |bus| {
            let mut regs = [0u8; 7];
            let mut stat = BusStatus::NoTry;
            stat |= bus.start();
            stat |= bus.write(ADDR_WRITE);
            stat |= bus.write(Register::Seconds as u8);
            stat |= bus.restart();
            stat |= bus.wait_idle();
            stat |= bus.write(ADDR_READ);
            let last = regs.len() - 1;
            for (i, reg) in regs.iter_mut().enumerate() {
                stat |= bus.read(reg, i == last);
            }
            stat |= bus.stop();
            (stat, regs)
        })?;

        let time = DateTime::from_registers(&regs);
        trace!("read time {}", time);
        Ok(time)
    }

    fn write_time(&mut self, time: &DateTime, policy: RetryPolicy) -> Result<(), Error> {
        let regs = time.to_registers();

        self.bus.init();
        // The clock must not tick while its fields are rewritten out of order
        self.stop_oscillator(policy)?;
        let written = match self.transact(policy, Op::WriteFields, |bus| {
            (write_registers(bus, Register::Minutes, &regs[1..]), ())
        }) {
            // Seconds last, restarting the oscillator
            Ok(()) => self.transact(policy, Op::WriteSeconds, |bus| {
                (write_registers(bus, Register::Seconds, &regs[..1]), ())
            }),
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            // Don't leave the clock halted
            let once = RetryPolicy::Attempts(NonZeroU32::MIN);
            let restarted = self.transact(once, Op::WriteSeconds, |bus| {
                (write_registers(bus, Register::Seconds, &regs[..1]), ())
            });
            if restarted.is_err() {
                warn!("oscillator left stopped");
            }
            return Err(e);
        }

        trace!("set time {}", time);
        Ok(())
    }

    /// Clear the seconds register, which also clears the oscillator start bit.
    fn stop_oscillator(&mut self, policy: RetryPolicy) -> Result<(), Error> {
        self.transact(policy, Op::StopOscillator, |bus| {
            (write_registers(bus, Register::Seconds, &[0x00]), ())
        })
    }

    fn transact<T>(
        &mut self,
        policy: RetryPolicy,
        op: Op,
        mut attempt: impl FnMut(&mut Twi<P, D>) -> (BusStatus, T),
    ) -> Result<T, Error> {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            let (stat, out) = attempt(&mut self.bus);
            if stat.is_success() {
                return Ok(out);
            }

            let fault = stat.fault().unwrap_or(Fault::empty());
            if policy.exhausted(attempts) {
                warn!("{} gave up after {} attempts", op, attempts);
                return Err(Error::RetriesExhausted {
                    op,
                    fault,
                    attempts,
                });
            }
            debug!("{} attempt {} failed: {}", op, attempts, fault);
        }
    }
}

/// Write `data` to consecutive registers starting at `reg`, as one framed transfer.
fn write_registers<P, D>(bus: &mut Twi<P, D>, reg: Register, data: &[u8]) -> BusStatus
where
    P: TwiPeriph + TwiLines,
    D: DelayNs,
{
    let mut stat = BusStatus::NoTry;
    stat |= bus.start();
    stat |= bus.write(ADDR_WRITE);
    stat |= bus.write(reg as u8);
    for &byte in data {
        stat |= bus.write(byte);
    }
    stat |= bus.stop();
    stat
}
