//! qspimon-core - QSPI flash engine for the qspimon firmware
//!
//! This crate holds the hardware-independent half of the firmware: the
//! byte queue between the UART interrupt and the console, the QSPI command
//! model and JEDEC command sequences, the [`QspiFlash`](flash::QspiFlash)
//! state machine that moves the flash between command mode and
//! memory-mapped (execute-in-place) mode, and the image loader.
//!
//! Everything that touches registers sits behind the traits in [`qspi`],
//! [`clock`] and [`loader`], so the same code runs on the board and against
//! the `qspimon-sim` emulator.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable heap allocation, required by [`ring::RingBuffer`]
//!
//! # Example
//!
//! ```ignore
//! use qspimon_core::flash::{FlashConfig, QspiFlash};
//!
//! fn selftest<B: qspimon_core::qspi::QspiBus>(bus: B) -> qspimon_core::Result<()> {
//!     let mut flash = QspiFlash::new(bus, FlashConfig::default());
//!     flash.erase_write_verify(0, &[0xde, 0xad, 0xbe, 0xef])?;
//!     flash.enter_memory_mapped()?;
//!     let mut word = [0u8; 4];
//!     flash.read_mapped(0, &mut word)
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod chip;
pub mod clock;
pub mod error;
pub mod flash;
pub mod loader;
pub mod protocol;
pub mod qspi;
#[cfg(feature = "alloc")]
pub mod ring;

pub use error::{Error, Result};
