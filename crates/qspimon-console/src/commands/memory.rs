//! `mrd` and `mwr`: raw access to the CPU address space

use crate::args::Args;
use crate::error::CommandError;
use crate::peripherals::{MemWidth, Peripherals};
use core::fmt::Write;

/// Usage text for `mrd`
pub const MRD_USAGE: &str = "Usage: mrd <addr> <count> [size:8|16|32|64]\r\n";

/// Usage text for `mwr`
pub const MWR_USAGE: &str = "usage: mwr <addr> <data> [size:8|16|32|64]\r\n";

/// A new line is started once a line grows past this many columns
const LINE_COLUMNS: usize = 60;
/// Address prefix plus its separator
const ADDRESS_COLUMNS: usize = 8 + 1;

fn width_arg(args: &Args<'_>, index: usize) -> Result<MemWidth, CommandError> {
    match args.get(index) {
        Some(_) => Ok(MemWidth::from_bits(args.int(index)?)),
        None => Ok(MemWidth::Byte),
    }
}

/// `mrd <addr> <count> [size]`: dump `count` cells of `size` bits
pub fn mrd<P: Peripherals + ?Sized>(board: &mut P, args: &Args<'_>, out: &mut dyn Write) -> Result<(), CommandError> {
    if args.len() < 3 {
        return Err(CommandError::Usage);
    }
    let mut addr = args.u32(1)?;
    let count = args.u32(2)?;
    let width = width_arg(args, 3)?;
    let digits = width.bytes() as usize * 2;

    let _ = write!(out, "\r\n{:08X} ", addr);
    let mut columns = ADDRESS_COLUMNS;
    for _ in 0..count {
        let value = board.mem_read(addr, width).map_err(CommandError::peripheral("mrd"))?;
        let _ = write!(out, "{:0digits$X} ", value & width.mask(), digits = digits);
        columns += digits + 1;
        addr = addr.wrapping_add(width.bytes());
        if columns > LINE_COLUMNS {
            let _ = write!(out, "\r\n{:08X} ", addr);
            columns = ADDRESS_COLUMNS;
        }
    }
    let _ = out.write_str("\r\n");
    Ok(())
}

/// `mwr <addr> <data> [size]`: store `data`, truncated to `size` bits
pub fn mwr<P: Peripherals + ?Sized>(board: &mut P, args: &Args<'_>, out: &mut dyn Write) -> Result<(), CommandError> {
    if args.len() < 3 {
        return Err(CommandError::Usage);
    }
    let addr = args.u32(1)?;
    let data = args.int(2)?;
    let width = width_arg(args, 3)?;

    board
        .mem_write(addr, width, data as u64 & width.mask())
        .map_err(CommandError::peripheral("mwr"))?;
    let _ = out.write_str("Write done\r\n");
    Ok(())
}
