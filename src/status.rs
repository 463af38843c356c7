//! Bus operation status
//!
//! Every primitive reports a [`BusStatus`]. A transaction folds the statuses of all its steps
//! together with [`BusStatus::combine`] (also available as `|` and `|=`) and only counts as done
//! when the folded result is [`BusStatus::Success`].

use bitflags::bitflags;
use core::ops::{BitOr, BitOrAssign};
use embedded_hal::i2c::{Error as I2cError, ErrorKind};

bitflags! {
    /// Fault categories a primitive can report.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Fault: u8 {
        /// A bounded wait expired and the bus was put through software recovery.
        const BUS_RESET = 1 << 1;
        /// Bus collision. Reserved, none of the current backends detect it.
        const COLLISION = 1 << 2;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Fault {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Fault({=u8:#04x})", self.bits())
    }
}

impl I2cError for Fault {
    fn kind(&self) -> ErrorKind {
        if self.contains(Fault::COLLISION) {
            ErrorKind::ArbitrationLoss
        } else {
            ErrorKind::Bus
        }
    }
}

/// Outcome of one primitive, or of a whole transaction attempt once combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusStatus {
    /// Nothing attempted yet. Identity of [`combine`](BusStatus::combine).
    #[default]
    NoTry,
    /// Every step so far completed in time.
    Success,
    /// At least one step faulted.
    Fault(Fault),
}

impl BusStatus {
    /// Status reported by a primitive whose wait timed out.
    pub const BUS_RESET: BusStatus = BusStatus::Fault(Fault::BUS_RESET);

    /// Worst-wins combination. Commutative and associative, with `NoTry` as the identity. Any
    /// fault in either operand yields a fault carrying the union of both fault sets.
    pub const fn combine(self, other: BusStatus) -> BusStatus {
        match (self, other) {
            (BusStatus::NoTry, s) | (s, BusStatus::NoTry) => s,
            (BusStatus::Success, BusStatus::Success) => BusStatus::Success,
            (BusStatus::Fault(a), BusStatus::Fault(b)) => BusStatus::Fault(a.union(b)),
            (BusStatus::Fault(a), BusStatus::Success) | (BusStatus::Success, BusStatus::Fault(a)) => {
                BusStatus::Fault(a)
            }
        }
    }

    /// True only for `Success`. An attempt that never ran is not a success.
    #[inline]
    pub const fn is_success(self) -> bool {
        matches!(self, BusStatus::Success)
    }

    /// The accumulated fault set, if any.
    #[inline]
    pub const fn fault(self) -> Option<Fault> {
        match self {
            BusStatus::Fault(f) => Some(f),
            _ => None,
        }
    }
}

impl BitOr for BusStatus {
    type Output = BusStatus;

    #[inline]
    fn bitor(self, rhs: BusStatus) -> BusStatus {
        self.combine(rhs)
    }
}

impl BitOrAssign for BusStatus {
    #[inline]
    fn bitor_assign(&mut self, rhs: BusStatus) {
        *self = self.combine(rhs);
    }
}
