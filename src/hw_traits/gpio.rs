use msp430fr2355 as pac;

pub trait GpioPeriph {
    fn pxin_rd(&self) -> u8;

    fn pxout_set(&self, bits: u8);
    fn pxout_clear(&self, bits: u8);

    fn pxdir_set(&self, bits: u8);
    fn pxdir_clear(&self, bits: u8);

    fn pxsel0_set(&self, bits: u8);
    fn pxsel0_clear(&self, bits: u8);
}

macro_rules! reg_methods {
    ($reg:ident, $set:ident, $clear:ident) => {
        #[inline(always)]
        fn $set(&self, bits: u8) {
            self.$reg().modify(|r, w| unsafe { w.bits(r.bits() | bits) });
        }

        #[inline(always)]
        fn $clear(&self, bits: u8) {
            self.$reg().modify(|r, w| unsafe { w.bits(r.bits() & !bits) });
        }
    };
}

macro_rules! gpio_impl {
    ($Px:ident => $pxin:ident, $pxout:ident, $pxdir:ident, $pxsel0:ident) => {
        impl GpioPeriph for pac::$Px {
            #[inline(always)]
            fn pxin_rd(&self) -> u8 {
                self.$pxin().read().bits()
            }

            reg_methods!($pxout, pxout_set, pxout_clear);
            reg_methods!($pxdir, pxdir_set, pxdir_clear);
            reg_methods!($pxsel0, pxsel0_set, pxsel0_clear);
        }
    };
}

gpio_impl!(P1 => p1in, p1out, p1dir, p1sel0);
gpio_impl!(P4 => p4in, p4out, p4dir, p4sel0);
