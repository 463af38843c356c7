//! Embedded hal delay implementation
//!
//! Busy-waits on `nop`s, so it needs no timer. Accuracy depends on MCLK being the frequency given
//! at construction and on interrupts staying short.
use embedded_hal::delay::DelayNs;
use msp430::asm;

// Cycles per iteration of the nop loop, counting the loop overhead
const CYCLES_PER_LOOP: u64 = 4;

/// Delay provider struct
pub struct Delay {
    freq: u32,
}

impl Delay {
    /// Delay provider for an MCLK running at `mclk_hz`.
    pub fn new(mclk_hz: u32) -> Self {
        Delay { freq: mclk_hz }
    }
}

impl DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = self.freq as u64 * ns as u64 / 1_000_000_000;
        for _ in 0..cycles / CYCLES_PER_LOOP {
            asm::nop();
        }
    }

    fn delay_us(&mut self, us: u32) {
        let cycles = self.freq as u64 * us as u64 / 1_000_000;
        for _ in 0..cycles / CYCLES_PER_LOOP {
            asm::nop();
        }
    }
}
