//! Binary-coded decimal
//!
//! The RTCC stores every time field as two packed decimal digits: tens in the upper nibble, units
//! in the lower nibble.

/// Decode a packed BCD byte into its decimal value.
///
/// `bcd` must hold two valid decimal digits (each nibble 0-9), giving a result in `0..=99`. Other
/// inputs produce an unspecified value.
#[inline]
pub const fn decimal_from_bcd(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

/// Encode a decimal value in `0..=99` as a packed BCD byte.
///
/// Values above 99 violate the precondition and produce an unspecified byte. They are caught by
/// a debug assertion, never clamped.
#[inline]
pub fn bcd_from_decimal(dec: u8) -> u8 {
    debug_assert!(dec <= 99, "BCD input out of range");
    ((dec / 10) << 4) | (dec % 10)
}
