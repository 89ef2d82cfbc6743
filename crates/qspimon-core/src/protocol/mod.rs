//! Protocol implementations
//!
//! Serial NOR command sequences shared by every chip in the
//! [chip table](crate::chip).

mod spi25;

pub use spi25::*;
