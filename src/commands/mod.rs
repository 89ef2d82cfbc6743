//! CLI command implementations
//!
//! Both commands run against the simulated board from `qspimon-sim`; the
//! flash contents can be carried between runs with `--flash-file`.

pub mod console;
pub mod load;
