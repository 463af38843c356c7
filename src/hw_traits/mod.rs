//! Register-level boundary between the bus driver and the silicon.

pub mod twi;

#[cfg(feature = "2x5x")]
pub(crate) mod eusci;
#[cfg(feature = "2x5x")]
pub(crate) mod gpio;
