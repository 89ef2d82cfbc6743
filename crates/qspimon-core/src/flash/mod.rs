//! Flash device state machine
//!
//! [`QspiFlash`] owns the QSPI bus and tracks everything the firmware knows
//! about the attached chip: which chip it is, which read instruction was
//! negotiated, how fast the bus runs and whether the controller is in
//! command mode or memory-mapped mode.

mod config;
mod device;

pub use config::FlashConfig;
pub use device::{FlashMode, QspiFlash};

/// Value of an erased flash byte
pub const ERASED_VALUE: u8 = 0xFF;
