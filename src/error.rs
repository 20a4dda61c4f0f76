//! Error types for the navigation controller
//!
//! Parser and codec errors are local: the task that hits one reports it to the
//! error sink and moves on to the next input. Only transport bring-up and
//! configuration errors are fatal, and those happen before any task runs.

use embedded_hal::i2c::ErrorKind;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single transaction on the shared bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// The device or the bus driver rejected the transaction
    #[error("device error: {0:?}")]
    Device(ErrorKind),

    /// The transaction did not complete within the configured limit
    #[error("transaction timed out")]
    Timeout,
}

/// Controller error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Sentence has the wrong shape or a field that does not parse
    #[error("malformed sentence: {0}")]
    MalformedSentence(String),

    /// Sentence checksum does not match its payload
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch {
        /// Checksum carried by the sentence
        expected: u8,
        /// Checksum computed over the payload
        actual: u8,
    },

    /// Sentence belongs to a class this controller does not decode
    #[error("unsupported sentence: {0}")]
    UnsupportedSentence(String),

    /// Status response shorter than the fixed layout
    #[error("status payload too short: expected {expected} bytes, got {actual}")]
    DecodeLength {
        /// Minimum payload length
        expected: usize,
        /// Received payload length
        actual: usize,
    },

    /// Read or write on the shared bus failed
    #[error("bus transaction to {register:#04x} failed: {source}")]
    BusTransaction {
        /// Endpoint register the transaction targeted
        register: u8,
        /// Underlying failure
        source: BusError,
    },

    /// The serial line source stopped delivering lines
    #[error("line source closed: {0}")]
    LineSourceClosed(String),

    /// Serial port error
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I2C device could not be opened
    #[error("i2c error: {0}")]
    I2c(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration values violate an invariant
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Process setup failed before the controller started
    #[error("startup failed: {0}")]
    Startup(String),
}

impl Error {
    /// Creates a bus transaction error for the given endpoint register.
    pub fn bus(register: u8, source: BusError) -> Self {
        Error::BusTransaction { register, source }
    }

    /// True for errors raised by the sentence parser.
    pub fn is_sentence_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedSentence(_)
                | Error::ChecksumMismatch { .. }
                | Error::UnsupportedSentence(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_error_names_register() {
        let err = Error::bus(0x10, BusError::Timeout);
        assert_eq!(
            err.to_string(),
            "bus transaction to 0x10 failed: transaction timed out"
        );
    }

    #[test]
    fn sentence_errors_are_classified() {
        assert!(Error::UnsupportedSentence("GPGGA".into()).is_sentence_error());
        assert!(Error::ChecksumMismatch { expected: 1, actual: 2 }.is_sentence_error());
        assert!(!Error::DecodeLength { expected: 3, actual: 1 }.is_sentence_error());
    }
}
