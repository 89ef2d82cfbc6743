//! QSPI command model and bus abstraction
//!
//! A flash transaction is described by a [`QspiCommand`] and handed to a
//! [`QspiBus`], the single seam between the flash engine and the QUADSPI
//! peripheral (or the emulator standing in for it).

mod bus;
mod command;
mod io_mode;
pub mod opcodes;

pub use bus::{BusFeatures, MemoryMappedConfig, QspiBus};
pub use command::{AddressWidth, QspiCommand};
pub use io_mode::{check_io_mode_supported, IoMode, LineWidth};
