//! Two-wire bus master and real-time clock/calendar driver for the hand-pump monitor.
//!
//! The board talks to an MCP7940-style RTCC over a single-slave, fixed-speed two-wire bus. The bus
//! can hang, with a slave holding SDA low or SCL never released, so every wait in this crate is
//! bounded, a timed-out wait triggers a software bus recovery, and every transaction is retried
//! from its first step until it completes without a single fault.
//!
//! Layers, bottom up:
//!
//! * [`bcd`]: packed decimal conversion for the RTCC's register format.
//! * [`bus`]: start/stop/restart/idle/ack/nack/byte primitives, each a bounded poll of a
//!   hardware flag, reporting a [`BusStatus`].
//! * `recovery`: manual SCL clocking to free a stuck slave, run automatically by [`bus`].
//! * [`rtcc`]: read and set the time with retry-the-whole-transaction semantics.
//!
//! The hardware is reached only through the [`TwiPeriph`] and [`TwiLines`] traits. Enabling one of
//! the device features (`msp430fr2355`, `msp430fr2353`, `msp430fr2155`, `msp430fr2153`) adds an
//! implementation for the MSP430FR2x5x eUSCI_B in `usci`, along with a `delay` provider.
//!
//! # Usage
//!
//! ```ignore
//! let twi = Twi::new(UsciTwi::new(periph.E_USCI_B0, periph.P1), Delay::new(8_000_000),
//!     BusConfig::new().divisor(80)); // 8MHz / 80 = 100kHz
//! let mut rtcc = Rtcc::new(twi);
//! rtcc.initialize_bus();
//! let now = rtcc.get_time();
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

#[macro_use]
mod fmt;

pub mod bcd;
pub mod bus;
pub mod hw_traits;
mod recovery;
pub mod rtcc;
pub mod status;

#[cfg(feature = "2x5x")]
pub mod delay;
#[cfg(feature = "2x5x")]
pub mod usci;

#[cfg(test)]
mod sim;

pub use bus::{BusConfig, Twi, Wait};
pub use hw_traits::twi::{TwiLines, TwiPeriph};
pub use rtcc::{DateTime, Error, RetryPolicy, Rtcc};
pub use status::{BusStatus, Fault};

#[cfg(feature = "2x5x")]
pub use msp430fr2355 as pac;
