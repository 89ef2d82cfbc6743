//! CLI argument parsing

use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use qspimon_core::loader;
use std::path::PathBuf;

/// Parse a number the way the console does (decimal, 0x hex, 0 octal)
fn parse_u32(s: &str) -> Result<u32, String> {
    let value = qspimon_console::parse_int(s).ok_or_else(|| format!("Invalid number: {}", s))?;
    u32::try_from(value).map_err(|_| format!("Out of range: {}", s))
}

/// Parse a load offset; it must fall on a loader chunk boundary
fn parse_start(s: &str) -> Result<u32, String> {
    let start = parse_u32(s)?;
    if loader::is_chunk_aligned(start) {
        Ok(start)
    } else {
        Err(format!(
            "0x{:X} is not a multiple of 0x{:X}",
            start,
            loader::CHUNK_SIZE
        ))
    }
}

#[derive(Parser)]
#[command(name = "qspimon")]
#[command(author, version, about = "QSPI flash monitor and loader", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub flash: FlashArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options describing the simulated flash
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FlashArgs {
    /// Raw flash contents, loaded at start and saved on exit
    #[arg(long, global = true)]
    pub flash_file: Option<PathBuf>,

    /// QSPI bus clock in MHz, applied before the first access
    #[arg(long, global = true, value_parser = parse_u32)]
    pub freq: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the debug console on stdin/stdout
    Console {
        /// Receive queue size in bytes
        #[arg(long, default_value_t = 256, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        rx_capacity: usize,
    },

    /// Program an image, or boot the one already in flash
    Load {
        /// Raw binary image; boots the flash contents when omitted
        image: Option<PathBuf>,

        /// Flash offset to program at, a multiple of 4 KiB (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_start, default_value = "0")]
        start: u32,

        /// Print the first N words of the mapped image instead of booting
        #[arg(long, conflicts_with = "image")]
        dump: Option<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_must_be_chunk_aligned() {
        assert_eq!(parse_start("0x10000"), Ok(0x10000));
        assert_eq!(parse_start("0"), Ok(0));
        assert!(parse_start("0x800").is_err());
        assert!(parse_start("-4096").is_err());

        assert!(Cli::try_parse_from(["qspimon", "load", "img.bin", "--start", "0x1000"]).is_ok());
        assert!(Cli::try_parse_from(["qspimon", "load", "img.bin", "--start", "0x1800"]).is_err());
    }

    #[test]
    fn test_rx_capacity_must_be_positive() {
        assert!(Cli::try_parse_from(["qspimon", "console", "--rx-capacity", "0"]).is_err());
        let cli = Cli::try_parse_from(["qspimon", "console", "--rx-capacity", "1"]).unwrap_or_else(|e| panic!("{}", e));
        assert!(matches!(cli.command, Commands::Console { rx_capacity: 1 }));
    }
}
