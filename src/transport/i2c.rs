//! Linux I2C device exposed through the async I2C trait
//!
//! The Linux driver is blocking. Transactions on the peripheral are a few
//! bytes at 100 kHz, so running them inline on the executor thread costs well
//! under a millisecond per poll.

use embedded_hal::i2c::{ErrorType, I2c as BlockingBus, Operation, SevenBitAddress};
use linux_embedded_hal::I2cdev;

use crate::error::{Error, Result};

/// Wraps a blocking `embedded-hal` bus so it satisfies `embedded-hal-async`
pub struct BlockingI2c<T> {
    bus: T,
}

impl<T> BlockingI2c<T> {
    pub fn new(bus: T) -> Self {
        Self { bus }
    }
}

impl BlockingI2c<I2cdev> {
    /// Opens an I2C character device such as `/dev/i2c-1`
    pub fn open(path: &str) -> Result<Self> {
        let dev = I2cdev::new(path).map_err(|e| Error::I2c(format!("{path}: {e}")))?;
        log::info!("Opened I2C bus: {}", path);
        Ok(Self::new(dev))
    }
}

impl<T: ErrorType> ErrorType for BlockingI2c<T> {
    type Error = T::Error;
}

impl<T: BlockingBus<SevenBitAddress>> embedded_hal_async::i2c::I2c<SevenBitAddress>
    for BlockingI2c<T>
{
    async fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> core::result::Result<(), Self::Error> {
        self.bus.transaction(address, operations)
    }
}
