use bitflags::bitflags;
use msp430fr2355 as pac;

bitflags! {
    /// UCBxCTLW0 in I2C mode
    #[derive(Clone, Copy)]
    pub struct UcbCtlw0: u16 {
        const UCSWRST = 1 << 0;
        const UCTXSTT = 1 << 1;
        const UCTXSTP = 1 << 2;
        const UCTXNACK = 1 << 3;
        const UCTR = 1 << 4;
        const UCTXACK = 1 << 5;
        const UCSSEL_SMCLK = 0b11 << 6;
        const UCSYNC = 1 << 8;
        const UCMODE_I2C = 0b11 << 9;
        const UCMST = 1 << 11;
        const UCMM = 1 << 13;
        const UCSLA10 = 1 << 14;
        const UCA10 = 1 << 15;
    }
}

bitflags! {
    /// UCBxIFG
    #[derive(Clone, Copy)]
    pub struct UcbIfg: u16 {
        const UCRXIFG0 = 1 << 0;
        const UCTXIFG0 = 1 << 1;
        const UCSTTIFG = 1 << 2;
        const UCSTPIFG = 1 << 3;
        const UCALIFG = 1 << 4;
        const UCNACKIFG = 1 << 5;
    }
}

pub trait EUsciB {
    fn ctlw0_rd(&self) -> UcbCtlw0;
    fn ctlw0_wr(&self, reg: UcbCtlw0);
    fn ctlw0_set(&self, bits: UcbCtlw0);
    fn ctlw0_clear(&self, bits: UcbCtlw0);

    // only call while in reset state
    fn ctlw1_wr(&self, bits: u16);
    // only call while in reset state
    fn brw_wr(&self, ucbr: u16);

    fn i2csa_wr(&self, addr: u16);

    fn ifg_rd(&self) -> UcbIfg;

    fn txbuf_wr(&self, byte: u8);
    fn rxbuf_rd(&self) -> u8;
}

macro_rules! eusci_b_impl {
    ($EUsci:ty, $ucbxctlw0:ident, $ucbxctlw1:ident, $ucbxbrw:ident, $ucbxi2csa:ident,
     $ucbxifg:ident, $ucbxtxbuf:ident, $ucbxrxbuf:ident) => {
        impl EUsciB for $EUsci {
            #[inline(always)]
            fn ctlw0_rd(&self) -> UcbCtlw0 {
                UcbCtlw0::from_bits_retain(self.$ucbxctlw0().read().bits())
            }

            #[inline(always)]
            fn ctlw0_wr(&self, reg: UcbCtlw0) {
                self.$ucbxctlw0().write(|w| unsafe { w.bits(reg.bits()) });
            }

            #[inline(always)]
            fn ctlw0_set(&self, bits: UcbCtlw0) {
                self.$ucbxctlw0()
                    .modify(|r, w| unsafe { w.bits(r.bits() | bits.bits()) });
            }

            #[inline(always)]
            fn ctlw0_clear(&self, bits: UcbCtlw0) {
                self.$ucbxctlw0()
                    .modify(|r, w| unsafe { w.bits(r.bits() & !bits.bits()) });
            }

            #[inline(always)]
            fn ctlw1_wr(&self, bits: u16) {
                self.$ucbxctlw1().write(|w| unsafe { w.bits(bits) });
            }

            #[inline(always)]
            fn brw_wr(&self, ucbr: u16) {
                self.$ucbxbrw().write(|w| unsafe { w.bits(ucbr) });
            }

            #[inline(always)]
            fn i2csa_wr(&self, addr: u16) {
                self.$ucbxi2csa().write(|w| unsafe { w.bits(addr) });
            }

            #[inline(always)]
            fn ifg_rd(&self) -> UcbIfg {
                UcbIfg::from_bits_retain(self.$ucbxifg().read().bits())
            }

            #[inline(always)]
            fn txbuf_wr(&self, byte: u8) {
                self.$ucbxtxbuf().write(|w| unsafe { w.bits(byte as u16) });
            }

            #[inline(always)]
            fn rxbuf_rd(&self) -> u8 {
                self.$ucbxrxbuf().read().bits() as u8
            }
        }
    };
}

eusci_b_impl!(
    pac::E_USCI_B0,
    ucb0ctlw0,
    ucb0ctlw1,
    ucb0brw,
    ucb0i2csa,
    ucb0ifg,
    ucb0txbuf,
    ucb0rxbuf
);

eusci_b_impl!(
    pac::E_USCI_B1,
    ucb1ctlw0,
    ucb1ctlw1,
    ucb1brw,
    ucb1i2csa,
    ucb1ifg,
    ucb1txbuf,
    ucb1rxbuf
);
