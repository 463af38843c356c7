//! eUSCI_B bus master backend
//!
//! Drives eUSCI_B0 or eUSCI_B1 in I2C master mode behind the [`TwiPeriph`] and [`TwiLines`]
//! traits.
//!
//! Pins used:
//!
//! eUSCI_B0: {SCL:P1.3, SDA:P1.2}
//!
//! eUSCI_B1: {SCL:P4.7, SDA:P4.6}
//!
//! The eUSCI sends the slave address together with the start condition, so a requested start or
//! restart is held back until the address byte is written, then both go out at once. A restart
//! that is followed straight by a stop, as at the end of bus recovery, never reaches the wire;
//! only the stop does.
//!
//! The eUSCI also acknowledges received bytes by itself; only a NACK needs an explicit request. A
//! NACK requested after the last wanted byte lands on the byte already being clocked in. That
//! extra byte stays in RXBUF with UCRXIFG0 set after the stop, so every start and restart empties
//! RXBUF first.

use crate::hw_traits::eusci::{EUsciB, UcbCtlw0, UcbIfg};
use crate::hw_traits::gpio::GpioPeriph;
use crate::hw_traits::twi::{TwiLines, TwiPeriph};
use crate::pac;
use core::cell::Cell;

/// Marks a eUSCI_B capable of bus master operation, and where its pins live.
pub trait TwiUsci: EUsciB {
    /// Port holding SCL and SDA
    type Port: GpioPeriph;
    /// SCL pin mask
    const SCL: u8;
    /// SDA pin mask
    const SDA: u8;
}

impl TwiUsci for pac::E_USCI_B0 {
    type Port = pac::P1;
    const SCL: u8 = 1 << 3;
    const SDA: u8 = 1 << 2;
}

impl TwiUsci for pac::E_USCI_B1 {
    type Port = pac::P4;
    const SCL: u8 = 1 << 7;
    const SDA: u8 = 1 << 6;
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    // Start or restart requested, waiting for the address byte
    AwaitAddress,
    // Start and address on the wire
    Address,
    Transmit,
    Receive,
}

/// eUSCI_B bus master with manual access to its pins
pub struct UsciTwi<USCI: TwiUsci> {
    usci: USCI,
    port: USCI::Port,
    phase: Cell<Phase>,
    transmit: Cell<bool>,
}

impl<USCI: TwiUsci> UsciTwi<USCI> {
    /// Take the eUSCI and the port its pins live on, and route SCL and SDA to the eUSCI. Recovery
    /// borrows them back as GPIO when needed.
    pub fn new(usci: USCI, port: USCI::Port) -> Self {
        let mut twi = UsciTwi {
            usci,
            port,
            phase: Cell::new(Phase::Idle),
            transmit: Cell::new(true),
        };
        twi.lines_to_periph();
        twi
    }

    /// Release the peripherals.
    pub fn free(self) -> (USCI, USCI::Port) {
        (self.usci, self.port)
    }

    #[inline(always)]
    fn start_pending(&self) -> bool {
        self.usci.ctlw0_rd().contains(UcbCtlw0::UCTXSTT)
    }

    // Once the start and address are through, move on to the data phase
    #[inline]
    fn address_done(&self) -> bool {
        if self.phase.get() != Phase::Address {
            return true;
        }
        if self.start_pending() {
            return false;
        }
        self.phase.set(if self.transmit.get() {
            Phase::Transmit
        } else {
            Phase::Receive
        });
        true
    }

    #[inline]
    fn condition(&mut self) {
        self.phase.set(Phase::AwaitAddress);
    }
}

impl<USCI: TwiUsci> TwiPeriph for UsciTwi<USCI> {
    fn configure(&mut self, divisor: u16) {
        self.usci.ctlw0_set(UcbCtlw0::UCSWRST);
        self.usci.ctlw0_wr(
            UcbCtlw0::UCSWRST
                | UcbCtlw0::UCMST
                | UcbCtlw0::UCMODE_I2C
                | UcbCtlw0::UCSYNC
                | UcbCtlw0::UCSSEL_SMCLK,
        );
        // Manual stop, 50ns deglitch, no clock low timeout
        self.usci.ctlw1_wr(0);
        self.usci.brw_wr(divisor);
        self.phase.set(Phase::Idle);
    }

    fn enable(&mut self) {
        self.usci.ctlw0_clear(UcbCtlw0::UCSWRST);
    }

    fn disable(&mut self) {
        self.usci.ctlw0_set(UcbCtlw0::UCSWRST);
        self.phase.set(Phase::Idle);
    }

    fn start_set(&mut self) {
        self.condition();
    }

    fn start_rd(&self) -> bool {
        self.start_pending()
    }

    fn restart_set(&mut self) {
        self.condition();
    }

    fn restart_rd(&self) -> bool {
        self.start_pending()
    }

    fn stop_set(&mut self) {
        self.usci.ctlw0_set(UcbCtlw0::UCTXSTP);
        self.phase.set(Phase::Idle);
    }

    fn stop_rd(&self) -> bool {
        self.usci.ctlw0_rd().contains(UcbCtlw0::UCTXSTP)
    }

    fn ack_set(&mut self, nack: bool) {
        if nack {
            self.usci.ctlw0_set(UcbCtlw0::UCTXNACK);
        }
    }

    fn ack_rd(&self) -> bool {
        self.usci.ctlw0_rd().contains(UcbCtlw0::UCTXNACK)
    }

    fn busy_rd(&self) -> bool {
        match self.phase.get() {
            Phase::Address => !self.address_done(),
            Phase::Transmit => !self.usci.ifg_rd().contains(UcbIfg::UCTXIFG0),
            _ => false,
        }
    }

    fn tx_wr(&mut self, byte: u8) {
        if self.phase.get() == Phase::AwaitAddress {
            let transmit = byte & 1 == 0;
            self.usci.i2csa_wr((byte >> 1) as u16);
            if transmit {
                self.usci.ctlw0_set(UcbCtlw0::UCTR | UcbCtlw0::UCTXSTT);
            } else {
                self.usci.ctlw0_clear(UcbCtlw0::UCTR);
                self.usci.ctlw0_set(UcbCtlw0::UCTXSTT);
            }
            self.transmit.set(transmit);
            self.phase.set(Phase::Address);
        } else {
            self.usci.txbuf_wr(byte);
        }
    }

    fn txbuf_full_rd(&self) -> bool {
        match self.phase.get() {
            Phase::Address => !self.address_done(),
            _ => !self.usci.ifg_rd().contains(UcbIfg::UCTXIFG0),
        }
    }

    fn receive_set(&mut self) {
        // The eUSCI clocks in the next byte as soon as RXBUF is free
        if self.address_done() {
            self.phase.set(Phase::Receive);
        }
    }

    fn rxbuf_full_rd(&self) -> bool {
        self.usci.ifg_rd().contains(UcbIfg::UCRXIFG0)
    }

    fn rx_rd(&mut self) -> u8 {
        self.usci.rxbuf_rd()
    }

    fn rx_discard(&mut self) {
        // Reading RXBUF clears UCRXIFG0
        let _ = self.usci.rxbuf_rd();
    }
}

impl<USCI: TwiUsci> TwiLines for UsciTwi<USCI> {
    fn lines_to_gpio(&mut self) {
        self.port.pxout_set(USCI::SCL);
        self.port.pxdir_clear(USCI::SDA);
        self.port.pxdir_set(USCI::SCL);
        self.port.pxsel0_clear(USCI::SCL | USCI::SDA);
    }

    fn scl_wr(&mut self, high: bool) {
        if high {
            self.port.pxout_set(USCI::SCL);
        } else {
            self.port.pxout_clear(USCI::SCL);
        }
    }

    fn sda_rd(&self) -> bool {
        self.port.pxin_rd() & USCI::SDA != 0
    }

    fn lines_to_periph(&mut self) {
        self.port.pxdir_clear(USCI::SCL);
        self.port.pxsel0_set(USCI::SCL | USCI::SDA);
    }
}
