//! Command table and dispatcher

use crate::args::Args;
use crate::commands::{io, memory, qspi, system};
use crate::error::CommandError;
use crate::peripherals::Peripherals;
use core::fmt::Write;
use qspimon_core::clock::ClockTree;
use qspimon_core::flash::QspiFlash;
use qspimon_core::qspi::QspiBus;

/// Console commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `$?`
    LastStatus,
    /// `help`
    Help,
    /// `mrd`
    MemRead,
    /// `mwr`
    MemWrite,
    /// `gpio`
    Gpio,
    /// `sdinfo`
    SdInfo,
    /// `sdls`
    SdList,
    /// `qspi`
    Qspi,
    /// `usb`
    Usb,
    /// `eth`
    Eth,
    /// `485`
    Rs485,
    /// `reset`
    Reset,
}

/// One row of the command table
#[derive(Debug)]
pub struct CommandEntry {
    /// Name typed on the console
    pub name: &'static str,
    /// Handler tag
    pub command: Command,
    /// One-line description for `help`
    pub help: &'static str,
    /// Usage text printed on argument errors
    pub usage: &'static str,
}

/// All available commands, in `help` order
pub static COMMANDS: &[CommandEntry] = &[
    CommandEntry {
        name: "$?",
        command: Command::LastStatus,
        help: "print return code of last executed command",
        usage: "",
    },
    CommandEntry {
        name: "help",
        command: Command::Help,
        help: "print this help",
        usage: "",
    },
    CommandEntry {
        name: "mrd",
        command: Command::MemRead,
        help: "memory read",
        usage: memory::MRD_USAGE,
    },
    CommandEntry {
        name: "mwr",
        command: Command::MemWrite,
        help: "memory write",
        usage: memory::MWR_USAGE,
    },
    CommandEntry {
        name: "gpio",
        command: Command::Gpio,
        help: "read or write a GPIO pin",
        usage: system::GPIO_USAGE,
    },
    CommandEntry {
        name: "sdinfo",
        command: Command::SdInfo,
        help: "show sd information",
        usage: "",
    },
    CommandEntry {
        name: "sdls",
        command: Command::SdList,
        help: "list sd root directory",
        usage: "",
    },
    CommandEntry {
        name: "qspi",
        command: Command::Qspi,
        help: "QSPI flash access",
        usage: qspi::USAGE,
    },
    CommandEntry {
        name: "usb",
        command: Command::Usb,
        help: "USB CDC echo and send",
        usage: io::USB_USAGE,
    },
    CommandEntry {
        name: "eth",
        command: Command::Eth,
        help: "Ethernet PHY access",
        usage: io::ETH_USAGE,
    },
    CommandEntry {
        name: "485",
        command: Command::Rs485,
        help: "RS-485 send and receive",
        usage: io::RS485_USAGE,
    },
    CommandEntry {
        name: "reset",
        command: Command::Reset,
        help: "reset the system",
        usage: "",
    },
];

/// Find the first entry named exactly `name`
pub fn find_command(name: &str) -> Option<&'static CommandEntry> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// Command interpreter bound to the board
///
/// Owns the flash device, the clock tree and the remaining peripherals, and
/// remembers the return code of the last command.
pub struct Shell<B: QspiBus, C: ClockTree, P: Peripherals> {
    flash: QspiFlash<B>,
    clocks: C,
    board: P,
    last_code: i32,
}

impl<B: QspiBus, C: ClockTree, P: Peripherals> Shell<B, C, P> {
    /// Create a shell; the last return code starts at 0
    pub fn new(flash: QspiFlash<B>, clocks: C, board: P) -> Self {
        Self {
            flash,
            clocks,
            board,
            last_code: 0,
        }
    }

    /// Return code of the last command
    pub fn last_code(&self) -> i32 {
        self.last_code
    }

    /// The flash device
    pub fn flash(&self) -> &QspiFlash<B> {
        &self.flash
    }

    /// The flash device, mutably
    pub fn flash_mut(&mut self) -> &mut QspiFlash<B> {
        &mut self.flash
    }

    /// The clock tree
    pub fn clocks(&self) -> &C {
        &self.clocks
    }

    /// The board peripherals
    pub fn board(&self) -> &P {
        &self.board
    }

    /// The board peripherals, mutably
    pub fn board_mut(&mut self) -> &mut P {
        &mut self.board
    }

    /// Take the shell apart
    pub fn into_parts(self) -> (QspiFlash<B>, C, P) {
        (self.flash, self.clocks, self.board)
    }

    /// Tokenize and run one line, printing to `out`
    ///
    /// Returns the code of this line. Only a matched command updates the
    /// last return code; a line that fails to tokenize or names no command
    /// returns -1 and leaves it alone, and a blank line returns it unchanged.
    pub fn execute(&mut self, line: &str, out: &mut dyn Write) -> i32 {
        let args = match Args::tokenize(line) {
            Ok(args) => args,
            Err(e) => {
                let _ = write!(out, "{}\r\n", e);
                return e.code();
            }
        };
        let Some(name) = args.name() else {
            return self.last_code;
        };

        let Some(entry) = find_command(name) else {
            return report(CommandError::UnknownCommand, None, &args, out).code();
        };

        log::debug!("run {:?} argc={}", entry.command, args.len());
        self.last_code = match self.run(entry.command, &args, out) {
            Ok(()) => 0,
            Err(e) => report(e, Some(entry), &args, out).code(),
        };
        self.last_code
    }

    fn run(&mut self, command: Command, args: &Args<'_>, out: &mut dyn Write) -> Result<(), CommandError> {
        match command {
            Command::LastStatus => system::last_status(self.last_code, out),
            Command::Help => system::help(&self.board, out),
            Command::MemRead => memory::mrd(&mut self.board, args, out),
            Command::MemWrite => memory::mwr(&mut self.board, args, out),
            Command::Gpio => system::gpio(&mut self.board, args, out),
            Command::SdInfo => io::sdinfo(&mut self.board, out),
            Command::SdList => io::sdls(&mut self.board, out),
            Command::Qspi => qspi::run(&mut self.flash, &mut self.clocks, args, out),
            Command::Usb => io::usb(&mut self.board, args, out),
            Command::Eth => io::eth(&mut self.board, args, out),
            Command::Rs485 => io::rs485(&mut self.board, args, out),
            Command::Reset => system::reset(&mut self.board, out),
        }
    }
}

/// Print what went wrong; usage errors print the entry's usage text
fn report(
    error: CommandError,
    entry: Option<&CommandEntry>,
    args: &Args<'_>,
    out: &mut dyn Write,
) -> CommandError {
    let usage = entry.map(|e| e.usage).unwrap_or("");
    match error {
        CommandError::Status(_) => {}
        CommandError::UnknownCommand => {
            let _ = write!(out, "Unknown command: \"{}\"\r\n", args.name().unwrap_or(""));
        }
        CommandError::Usage => {
            let _ = out.write_str(usage);
        }
        CommandError::Parse { index } => {
            let _ = write!(out, "cannot decode {}\r\n", args.get(index).unwrap_or(""));
            let _ = out.write_str(usage);
        }
        other => {
            let _ = write!(out, "{}\r\n", other);
        }
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_and_lookup() {
        let names: heapless::Vec<&str, 16> = COMMANDS.iter().map(|c| c.name).collect();
        assert_eq!(
            names.as_slice(),
            &["$?", "help", "mrd", "mwr", "gpio", "sdinfo", "sdls", "qspi", "usb", "eth", "485", "reset"]
        );
        assert_eq!(find_command("qspi").map(|c| c.command), Some(Command::Qspi));
        assert!(find_command("QSPI").is_none());
        assert!(find_command("qsp").is_none());
    }

    #[test]
    fn test_usage_texts_end_with_newline() {
        for entry in COMMANDS {
            assert!(entry.usage.is_empty() || entry.usage.ends_with("\r\n"), "{}", entry.name);
        }
    }
}
