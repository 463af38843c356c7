//! Hardware boundary of the two-wire bus master.
//!
//! Only the handful of register operations the primitive layer and the recovery procedure
//! actually use. A `*_set` method requests a bus condition, the matching `*_rd` method reports
//! whether it is still in progress.

/// Two-wire master peripheral.
pub trait TwiPeriph {
    /// Program bit-rate divisor and master mode. Leaves the module disabled.
    fn configure(&mut self, divisor: u16);
    /// Take the module out of reset.
    fn enable(&mut self);
    /// Hold the module in reset.
    fn disable(&mut self);

    /// Request a start condition.
    fn start_set(&mut self);
    /// Start condition in progress.
    fn start_rd(&self) -> bool;

    /// Request a repeated start condition.
    fn restart_set(&mut self);
    /// Repeated start in progress.
    fn restart_rd(&self) -> bool;

    /// Request a stop condition.
    fn stop_set(&mut self);
    /// Stop condition in progress.
    fn stop_rd(&self) -> bool;

    /// Load the acknowledge data bit (`true` sends NACK) and start an acknowledge sequence.
    fn ack_set(&mut self, nack: bool);
    /// Acknowledge sequence in progress.
    fn ack_rd(&self) -> bool;

    /// Master transfer in progress.
    fn busy_rd(&self) -> bool;

    /// Load the transmit buffer.
    fn tx_wr(&mut self, byte: u8);
    /// Transmit buffer still full.
    fn txbuf_full_rd(&self) -> bool;

    /// Hand the clock to the slave for one received byte.
    fn receive_set(&mut self);
    /// Receive buffer holds a byte.
    fn rxbuf_full_rd(&self) -> bool;
    /// Read the receive buffer.
    fn rx_rd(&mut self) -> u8;
    /// Drop whatever the receive buffer holds and clear its full flag.
    fn rx_discard(&mut self);
}

/// Direct control of the SCL and SDA pins, bypassing the peripheral.
pub trait TwiLines {
    /// Switch both pins to GPIO: SDA as input, SCL as output driven high.
    fn lines_to_gpio(&mut self);
    /// Drive SCL.
    fn scl_wr(&mut self, high: bool);
    /// Sample SDA.
    fn sda_rd(&self) -> bool;
    /// Give both pins back to the peripheral.
    fn lines_to_periph(&mut self);
}
