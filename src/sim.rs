//! Simulated bus master with an MCP7940-style slave, for host tests.
//!
//! Every flag clears on its first poll unless a stall has been injected with [`SimTwi::stick`]
//! or [`SimTwi::stick_forever`]. With [`SimTwi::read_ahead`] the receiver behaves like an eUSCI
//! and clocks in one more byte after a NACK.

use crate::bus::Wait;
use crate::hw_traits::twi::{TwiLines, TwiPeriph};
use std::cell::{Cell, RefCell};
use std::vec::Vec;

const WAITS: [Wait; 7] = [
    Wait::Start,
    Wait::Restart,
    Wait::Stop,
    Wait::Ack,
    Wait::Idle,
    Wait::TxBuf,
    Wait::RxBuf,
];

const OSCRUN: u8 = 0x20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Configure,
    Enable,
    Disable,
    Start,
    Restart,
    Stop,
    Ack,
    Nack,
    Tx(u8),
    Receive,
    LinesToGpio,
    LinesToPeriph,
    SclLow,
    SclHigh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitAddress,
    Pointer,
    Writing,
    Reading,
}

#[derive(Default)]
struct Stall {
    // Fresh poll number that starts the stall, 0 when none is pending
    at: u32,
    active: bool,
    forever: bool,
}

pub struct SimTwi {
    divisor: Option<u16>,
    enabled: bool,
    events: Vec<Event>,
    phase: Phase,
    pointer: usize,
    regs: [u8; 7],
    rx: u8,
    rx_full: bool,
    read_ahead: bool,
    clock_one_more: bool,
    fresh: [Cell<u32>; 7],
    polls: [Cell<u32>; 7],
    stalls: [RefCell<Stall>; 7],
    stuck_polls: Cell<u32>,
    scl: bool,
    sda_low_pulses: u32,
    scl_pulses: u32,
}

fn index(wait: Wait) -> usize {
    WAITS.iter().position(|w| *w == wait).unwrap_or(0)
}

impl SimTwi {
    pub fn new() -> Self {
        SimTwi {
            divisor: None,
            enabled: false,
            events: Vec::new(),
            phase: Phase::Idle,
            pointer: 0,
            regs: [0; 7],
            rx: 0,
            rx_full: false,
            read_ahead: false,
            clock_one_more: false,
            fresh: Default::default(),
            polls: Default::default(),
            stalls: Default::default(),
            stuck_polls: Cell::new(0),
            scl: true,
            sda_low_pulses: 0,
            scl_pulses: 0,
        }
    }

    /// The `nth` wait on `wait` (counting from 1) never completes until the peripheral is next
    /// disabled, which is the first thing recovery does.
    pub fn stick(&mut self, wait: Wait, nth: u32) {
        let mut stall = self.stalls[index(wait)].borrow_mut();
        stall.at = nth;
    }

    /// Every wait on `wait` stalls, recovery or not.
    pub fn stick_forever(&mut self, wait: Wait) {
        self.stalls[index(wait)].borrow_mut().forever = true;
    }

    /// SDA stays low for this many SCL pulses once lines are under manual control.
    pub fn hold_sda_low(&mut self, pulses: u32) {
        self.sda_low_pulses = pulses;
    }

    /// Keep receiving after a NACK, leaving one extra byte in the receive buffer.
    pub fn read_ahead(&mut self, on: bool) {
        self.read_ahead = on;
    }

    pub fn load_registers(&mut self, regs: [u8; 7]) {
        self.regs = regs;
    }

    pub fn registers(&self) -> [u8; 7] {
        self.regs
    }

    pub fn divisor(&self) -> Option<u16> {
        self.divisor
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.clone()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Total polls of one flag
    pub fn polls(&self, wait: Wait) -> u32 {
        self.polls[index(wait)].get()
    }

    /// Polls that found a stalled flag
    pub fn stuck_polls(&self) -> u32 {
        self.stuck_polls.get()
    }

    pub fn scl_pulses(&self) -> u32 {
        self.scl_pulses
    }

    // Returns true while the flag reports "still in progress"
    fn blocked(&self, wait: Wait) -> bool {
        let i = index(wait);
        self.polls[i].set(self.polls[i].get() + 1);

        let mut stall = self.stalls[i].borrow_mut();
        if !stall.active && !stall.forever {
            self.fresh[i].set(self.fresh[i].get() + 1);
            if stall.at != 0 && self.fresh[i].get() == stall.at {
                stall.active = true;
                stall.at = 0;
            }
        }

        let blocked = stall.active || stall.forever;
        if blocked {
            self.stuck_polls.set(self.stuck_polls.get() + 1);
        }
        blocked
    }

    fn receive_next(&mut self) {
        self.rx = self.read_register(self.pointer);
        self.pointer += 1;
        self.rx_full = true;
    }

    fn flush_rx(&mut self) {
        self.rx_full = false;
        self.clock_one_more = false;
    }

    fn read_register(&self, reg: usize) -> u8 {
        let reg = reg % self.regs.len();
        let value = self.regs[reg];
        if reg == 3 && self.regs[0] & 0x80 != 0 {
            value | OSCRUN
        } else {
            value
        }
    }
}

impl TwiPeriph for SimTwi {
    fn configure(&mut self, divisor: u16) {
        self.events.push(Event::Configure);
        self.divisor = Some(divisor);
        self.enabled = false;
        self.phase = Phase::Idle;
        self.flush_rx();
    }

    fn enable(&mut self) {
        self.events.push(Event::Enable);
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.events.push(Event::Disable);
        self.enabled = false;
        self.flush_rx();
        for stall in &self.stalls {
            stall.borrow_mut().active = false;
        }
    }

    fn start_set(&mut self) {
        self.events.push(Event::Start);
        self.phase = Phase::AwaitAddress;
    }

    fn start_rd(&self) -> bool {
        self.blocked(Wait::Start)
    }

    fn restart_set(&mut self) {
        self.events.push(Event::Restart);
        self.phase = Phase::AwaitAddress;
    }

    fn restart_rd(&self) -> bool {
        self.blocked(Wait::Restart)
    }

    fn stop_set(&mut self) {
        self.events.push(Event::Stop);
        self.phase = Phase::Idle;
    }

    fn stop_rd(&self) -> bool {
        self.blocked(Wait::Stop)
    }

    fn ack_set(&mut self, nack: bool) {
        self.events.push(if nack { Event::Nack } else { Event::Ack });
        if nack && self.read_ahead {
            self.clock_one_more = true;
        }
    }

    fn ack_rd(&self) -> bool {
        self.blocked(Wait::Ack)
    }

    fn busy_rd(&self) -> bool {
        self.blocked(Wait::Idle)
    }

    fn tx_wr(&mut self, byte: u8) {
        self.events.push(Event::Tx(byte));
        match self.phase {
            Phase::AwaitAddress if byte == crate::rtcc::ADDR_WRITE => self.phase = Phase::Pointer,
            Phase::AwaitAddress if byte == crate::rtcc::ADDR_READ => self.phase = Phase::Reading,
            Phase::Pointer => {
                self.pointer = byte as usize;
                self.phase = Phase::Writing;
            }
            Phase::Writing => {
                let len = self.regs.len();
                self.regs[self.pointer % len] = byte;
                self.pointer += 1;
            }
            _ => {}
        }
    }

    fn txbuf_full_rd(&self) -> bool {
        self.blocked(Wait::TxBuf)
    }

    fn receive_set(&mut self) {
        self.events.push(Event::Receive);
        if !self.rx_full {
            self.receive_next();
        }
    }

    fn rxbuf_full_rd(&self) -> bool {
        let blocked = self.blocked(Wait::RxBuf);
        !blocked && self.rx_full
    }

    fn rx_rd(&mut self) -> u8 {
        let byte = self.rx;
        self.rx_full = false;
        if self.clock_one_more {
            self.clock_one_more = false;
            self.receive_next();
        }
        byte
    }

    fn rx_discard(&mut self) {
        self.flush_rx();
    }
}

impl TwiLines for SimTwi {
    fn lines_to_gpio(&mut self) {
        self.events.push(Event::LinesToGpio);
        self.scl = true;
    }

    fn scl_wr(&mut self, high: bool) {
        self.events.push(if high { Event::SclHigh } else { Event::SclLow });
        if high && !self.scl {
            self.scl_pulses += 1;
            self.sda_low_pulses = self.sda_low_pulses.saturating_sub(1);
        }
        self.scl = high;
    }

    fn sda_rd(&self) -> bool {
        self.sda_low_pulses == 0
    }

    fn lines_to_periph(&mut self) {
        self.events.push(Event::LinesToPeriph);
    }
}
