//! Error types for qspimon-core

use core::fmt;

/// Core error type for flash operations
///
/// Every failure of the flash engine maps onto one of these; none of them is
/// retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The bus or the chip cannot perform the requested mode or operation
    Unsupported,
    /// The JEDEC ID read from the bus matches no known chip
    NotFound,
    /// A program, erase or status-register write did not take effect
    WriteError,
    /// The bus failed to return data
    ReadError,
    /// The chip stayed busy past the polling deadline
    Timeout,
    /// The requested range lies outside the flash
    OutOfBound,
    /// Read-back after programming differs from what was written
    VerifyMismatch {
        /// Absolute flash address of the first differing byte
        addr: u32,
        /// Byte that was programmed
        expected: u8,
        /// Byte that was read back
        found: u8,
    },
    /// The operation is not legal in the current flash mode
    InvalidState,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unsupported => write!(f, "operation not supported"),
            Error::NotFound => write!(f, "flash chip not found"),
            Error::WriteError => write!(f, "write error"),
            Error::ReadError => write!(f, "read error"),
            Error::Timeout => write!(f, "operation timed out"),
            Error::OutOfBound => write!(f, "address out of bounds"),
            Error::VerifyMismatch {
                addr,
                expected,
                found,
            } => write!(
                f,
                "verify mismatch at 0x{:08X}: expected 0x{:02X}, found 0x{:02X}",
                addr, expected, found
            ),
            Error::InvalidState => write!(f, "not allowed in current flash mode"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias for qspimon-core operations
pub type Result<T> = core::result::Result<T, Error>;
