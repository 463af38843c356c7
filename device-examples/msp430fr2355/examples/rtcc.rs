#![no_main]
#![no_std]

use embedded_hal::delay::DelayNs;
use msp430_rt::entry;
use pumpmon_rtcc::{delay::Delay, usci::UsciTwi, BusConfig, DateTime, Rtcc, Twi};
use panic_msp430 as _;

// Power-on default, DCO via FLL
const MCLK_HZ: u32 = 1_000_000;

#[entry]
fn main() -> ! {
    let periph = msp430fr2355::Peripherals::take().unwrap();

    // Hold the watchdog
    periph.WDT_A.wdtctl().write(|w| unsafe { w.bits(0x5A80) });
    // Release the pins from their power-on high impedance state
    periph.PMM.pm5ctl0().modify(|r, w| unsafe { w.bits(r.bits() & !1) });

    let twi = Twi::new(
        UsciTwi::new(periph.E_USCI_B0, periph.P1),
        Delay::new(MCLK_HZ),
        BusConfig::new().divisor(10), // 1MHz / 10 = 100kHz
    );
    let mut rtcc = Rtcc::new(twi);
    rtcc.initialize_bus();

    rtcc.set_time(&DateTime {
        second: 0,
        minute: 0,
        hour: 12,
        weekday: 1,
        day: 1,
        month: 1,
        year: 24,
    });

    let mut delay = Delay::new(MCLK_HZ);
    loop {
        // Blocks until the bus cooperates, recovering it as needed
        let _now = rtcc.get_time();
        delay.delay_ms(1000);
    }
}

// The compiler will emit calls to the abort() compiler intrinsic if debug assertions are
// enabled (default for dev profile). MSP430 does not actually have meaningful abort() support
// so for now, we create our own in each application where debug assertions are present.
#[no_mangle]
extern "C" fn abort() -> ! {
    panic!();
}
