//! qspimon-console - Debug console for the qspimon firmware
//!
//! Bytes arrive one at a time from the UART interrupt and are queued in a
//! [`RingBuffer`](qspimon_core::ring::RingBuffer). The main loop drains
//! them into a [`Console`], which echoes, edits and collects a line, then
//! hands complete lines to the [`Shell`].
//!
//! The shell splits a line into whitespace-separated tokens, looks the first
//! token up in the static [`COMMANDS`] table and runs the matching command.
//! Each command returns 0 or -1; the last value is kept and printed by `$?`.
//!
//! Flash commands go to a [`QspiFlash`](qspimon_core::flash::QspiFlash);
//! everything else on the board is reached through [`Peripherals`].

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

mod args;
pub mod commands;
mod console;
mod dispatch;
mod error;
mod peripherals;

pub use args::{parse_int, Args, MAX_ARGS};
pub use console::{Console, LINE_CAPACITY, PROMPT};
pub use dispatch::{find_command, Command, CommandEntry, Shell, COMMANDS};
pub use error::CommandError;
pub use peripherals::{GpioMode, GpioPin, MemWidth, PeripheralError, Peripherals, SdCardInfo};
