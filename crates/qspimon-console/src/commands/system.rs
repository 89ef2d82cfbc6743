//! `$?`, `help`, `gpio` and `reset`

use crate::args::{parse_int, Args};
use crate::dispatch::COMMANDS;
use crate::error::CommandError;
use crate::peripherals::{GpioMode, GpioPin, Peripherals};
use core::fmt::Write;

/// Usage text for `gpio`
pub const GPIO_USAGE: &str = "usage: gpio P[A..K][0..15] (0|1|<mode>)\r\n\
Where mode is one of:\r\n\
\x20 out             Output push pull\r\n\
\x20 in              Input\r\n\
\x20 outod           Output open drain\r\n\
\x20 alt             Alternate push pull\r\n\
\x20 altod           Alternate open drain\r\n\
\x20 analog          Analog\r\n";

/// `$?`: print the last return code and return it again
pub fn last_status(code: i32, out: &mut dyn Write) -> Result<(), CommandError> {
    let _ = write!(out, "{}\r\n", code);
    match code {
        0 => Ok(()),
        code => Err(CommandError::Status(code)),
    }
}

/// `help`: banner and command list
pub fn help<P: Peripherals + ?Sized>(board: &P, out: &mut dyn Write) -> Result<(), CommandError> {
    let hz = board.system_clock_hz();
    let _ = write!(out, "qspimon {}\r\n", env!("CARGO_PKG_VERSION"));
    let _ = write!(
        out,
        "CPU running at {}.{:02} MHz\r\n\r\nAvailable commands:\r\n",
        hz / 1_000_000,
        hz % 1_000_000 / 10_000
    );
    for c in COMMANDS {
        let _ = write!(out, "  {:<30} {}\r\n", c.name, c.help);
    }
    Ok(())
}

/// `gpio <pin> [0|1|<mode>]`
pub fn gpio<P: Peripherals + ?Sized>(board: &mut P, args: &Args<'_>, out: &mut dyn Write) -> Result<(), CommandError> {
    let pin = args.get(1).and_then(GpioPin::parse).ok_or(CommandError::Usage)?;

    let Some(arg) = args.get(2) else {
        let level = board.gpio_read(pin);
        let mode = board.gpio_mode(pin);
        let _ = write!(out, "{} = {} ({})\r\n", pin, u8::from(level), mode.description());
        return Ok(());
    };

    if let Some(value) = parse_int(arg) {
        let _ = write!(out, "Writing {} to {}\r\n", value, pin);
        board.gpio_write(pin, value != 0);
    } else if let Some(mode) = GpioMode::from_name(arg) {
        let _ = write!(out, "Setting {} to {}\r\n", pin, mode.name());
        board.gpio_set_mode(pin, mode);
    } else {
        return Err(CommandError::Usage);
    }
    Ok(())
}

/// `reset`
pub fn reset<P: Peripherals + ?Sized>(board: &mut P, out: &mut dyn Write) -> Result<(), CommandError> {
    let _ = out.write_str("Resetting\r\n");
    board.system_reset();
    Ok(())
}
