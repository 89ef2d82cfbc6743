//! qspimon - QSPI flash monitor and loader
//!
//! Host front-end for the qspimon firmware core. The same console and loader
//! code that runs on the board is driven here against a simulated W25Q32JV:
//!
//! - `qspimon console` feeds stdin through the console receive queue into
//!   the command shell, as the UART interrupt does on the board.
//! - `qspimon load IMAGE` programs a raw image chunk by chunk, verifying each
//!   one; `qspimon load` without an image maps the flash and boots it.

mod cli;
mod commands;
mod device;
mod error;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG still wins over -v
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match cli.command {
        Commands::Console { rx_capacity } => commands::console::run(&cli.flash, rx_capacity),
        Commands::Load {
            image: Some(image),
            start,
            dump: _,
        } => commands::load::run_program(&cli.flash, &image, start),
        Commands::Load {
            image: None,
            dump: Some(count),
            ..
        } => commands::load::run_dump(&cli.flash, count),
        Commands::Load { image: None, .. } => commands::load::run_boot(&cli.flash),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
    Ok(())
}
