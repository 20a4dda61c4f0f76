//! Transport layer
//!
//! The controller core only needs two primitives from the hardware:
//!
//! - a line-oriented stream of positioning sentences ([`LineSource`])
//! - addressed request/response transactions on the peripheral bus
//!   (`embedded_hal_async::i2c::I2c`)
//!
//! Opening the serial device and the I2C character device happens here;
//! failures are fatal and abort start-up before any task is spawned.

use crate::error::Result;

mod i2c;
mod serial;

pub use i2c::BlockingI2c;
pub use serial::SerialLineSource;

/// Source of text lines, one sentence per line
#[allow(async_fn_in_trait)]
pub trait LineSource {
    /// Next line without its terminator, `None` at end of stream
    async fn read_line(&mut self) -> Result<Option<String>>;
}
