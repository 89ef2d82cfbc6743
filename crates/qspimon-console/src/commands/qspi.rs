//! `qspi` command family

use super::{hexdump, HEXDUMP_HEADER};
use crate::args::{Args, MAX_ARGS};
use crate::error::CommandError;
use core::fmt::Write;
use qspimon_core::clock::ClockTree;
use qspimon_core::flash::{FlashMode, QspiFlash};
use qspimon_core::qspi::QspiBus;
use qspimon_core::Error;

/// Usage text for `qspi`
pub const USAGE: &str = "Usage: qspi <command>\r\n\
The <command> must be:\r\n\
\x20 freq <MHz>                         Set the QSPI frequency\r\n\
\x20 read <offset> <size>               Hexdump from offset, size bytes\r\n\
\x20 write <offset> <byte0> ... <byteN> Write bytes from offset\r\n\
\x20 erase <offset> [size]              Erase sectors covering the range (default 4K)\r\n\
\x20 demo                               Start demo on first 1024 bytes\r\n\
\x20 mmap on|off|test                   Memory-mapped mode control\r\n";

/// Bytes exercised by `qspi demo`
pub const DEMO_SIZE: usize = 1024;

/// Bytes dumped by `qspi mmap test`
pub const MMAP_TEST_SIZE: usize = 32;

const DEFAULT_ERASE_SIZE: u32 = 4096;
const READ_CHUNK: usize = 256;

/// Payload of `qspi write`, one byte per argument
pub type WritePayload = heapless::Vec<u8, MAX_ARGS>;

/// Dispatch a `qspi` sub-command
pub fn run<B, C>(flash: &mut QspiFlash<B>, clocks: &mut C, args: &Args<'_>, out: &mut dyn Write) -> Result<(), CommandError>
where
    B: QspiBus,
    C: ClockTree + ?Sized,
{
    match args.get(1).ok_or(CommandError::Usage)? {
        "mmap" => mmap(flash, args, out),
        "freq" => freq(flash, clocks, args, out),
        "read" => {
            let offset = args.u32(2)?;
            let size = args.u32(3)?;
            ensure_init(flash, out)?;
            read(flash, offset, size, out)
        }
        "write" => {
            let (offset, data) = parse_write_args(args)?;
            ensure_init(flash, out)?;
            flash.write(offset, &data).map_err(CommandError::flash("write"))?;
            let _ = write!(out, "Wrote {} bytes at 0x{:08X}\r\n", data.len(), offset);
            Ok(())
        }
        "erase" => {
            let offset = args.u32(2)?;
            let size = match args.get(3) {
                Some(_) => args.u32(3)?,
                None => DEFAULT_ERASE_SIZE,
            };
            ensure_init(flash, out)?;
            flash.erase(offset, size).map_err(CommandError::flash("erase"))?;
            let _ = write!(out, "Erased 0x{:08X}, size {}\r\n", offset, size);
            Ok(())
        }
        "demo" => {
            ensure_init(flash, out)?;
            demo(flash, out)
        }
        _ => Err(CommandError::Usage),
    }
}

/// Parse `qspi write <offset> <b0> ... <bN>`
///
/// Every byte is validated before anything is returned.
pub fn parse_write_args(args: &Args<'_>) -> Result<(u32, WritePayload), CommandError> {
    let offset = args.u32(2)?;
    if args.len() < 4 {
        return Err(CommandError::Usage);
    }
    let mut data = WritePayload::new();
    for index in 3..args.len() {
        data.push(args.u8(index)?).map_err(|_| CommandError::TooManyArgs)?;
    }
    Ok((offset, data))
}

/// Identify the chip on first use and report what was negotiated
fn ensure_init<B: QspiBus>(flash: &mut QspiFlash<B>, out: &mut dyn Write) -> Result<(), CommandError> {
    if flash.mode() != FlashMode::Command || flash.is_ready() {
        return Ok(());
    }
    let chip = flash.initialize().map_err(CommandError::flash("qspi init"))?;
    let _ = write!(
        out,
        "qspi init OK: {} {}, {} KiB\r\n",
        chip.vendor,
        chip.name,
        chip.total_size / 1024
    );
    let _ = write!(
        out,
        "fast read: {}-line\r\n",
        flash.read_mode().io_mode.data_lines()
    );
    Ok(())
}

fn freq<B, C>(flash: &mut QspiFlash<B>, clocks: &mut C, args: &Args<'_>, out: &mut dyn Write) -> Result<(), CommandError>
where
    B: QspiBus,
    C: ClockTree + ?Sized,
{
    if args.len() != 3 {
        return Err(CommandError::Usage);
    }
    let mhz = args.u32(2)?;
    let pll = flash.set_frequency(clocks, mhz).map_err(CommandError::flash("freq"))?;
    let _ = write!(
        out,
        "QSPI clock set to {} MHz (PLL2 M={} N={} R={})\r\n",
        mhz, pll.m, pll.n, pll.r
    );
    Ok(())
}

fn read<B: QspiBus>(flash: &mut QspiFlash<B>, offset: u32, size: u32, out: &mut dyn Write) -> Result<(), CommandError> {
    let end = u64::from(offset) + u64::from(size);
    if flash.size().is_some_and(|total| end > u64::from(total)) {
        return Err(CommandError::Flash {
            op: "read",
            error: Error::OutOfBound,
        });
    }

    let _ = out.write_str(HEXDUMP_HEADER);
    let mut buf = [0u8; READ_CHUNK];
    let mut addr = offset;
    let mut remaining = size as usize;
    while remaining > 0 {
        let len = remaining.min(READ_CHUNK);
        flash.read(addr, &mut buf[..len]).map_err(CommandError::flash("read"))?;
        hexdump(out, addr, &buf[..len]);
        addr += len as u32;
        remaining -= len;
    }
    Ok(())
}

/// Erase, write, read back and check the first 1 KiB
fn demo<B: QspiBus>(flash: &mut QspiFlash<B>, out: &mut dyn Write) -> Result<(), CommandError> {
    let name = flash.chip().map(|c| c.name).unwrap_or("QSPI");
    let mut data = [0u8; DEMO_SIZE];
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = i as u8;
    }

    flash.erase(0, DEMO_SIZE as u32).map_err(CommandError::flash("demo erase"))?;
    let _ = write!(
        out,
        "Erase the {} flash data finish. Start from 0x00000000, size is {}.\r\n",
        name, DEMO_SIZE
    );

    flash.write(0, &data).map_err(CommandError::flash("demo write"))?;
    let _ = write!(
        out,
        "Write the {} flash data finish. Start from 0x00000000, size is {}.\r\n",
        name, DEMO_SIZE
    );

    let mut back = [0u8; DEMO_SIZE];
    flash.read(0, &mut back).map_err(CommandError::flash("demo read"))?;
    let _ = write!(
        out,
        "Read the {} flash data success. Start from 0x00000000, size is {}. The data is:\r\n",
        name, DEMO_SIZE
    );
    let _ = out.write_str(HEXDUMP_HEADER);
    hexdump(out, 0, &back);

    if let Some(i) = data.iter().zip(back.iter()).position(|(w, h)| w != h) {
        return Err(CommandError::Flash {
            op: "demo check",
            error: Error::VerifyMismatch {
                addr: i as u32,
                expected: data[i],
                found: back[i],
            },
        });
    }
    let _ = write!(out, "The {} flash test is success.\r\n", name);
    Ok(())
}

fn mmap<B: QspiBus>(flash: &mut QspiFlash<B>, args: &Args<'_>, out: &mut dyn Write) -> Result<(), CommandError> {
    match args.get(2).ok_or(CommandError::Usage)? {
        "on" => {
            flash.enter_memory_mapped().map_err(CommandError::flash("mmap on"))?;
            let _ = out.write_str("Enter in mmap mode\r\n");
        }
        "off" => {
            flash.reinitialize().map_err(CommandError::flash("mmap off"))?;
            let _ = out.write_str("QSPI reinitialized in command mode\r\n");
        }
        "test" => {
            let mut buf = [0u8; MMAP_TEST_SIZE];
            flash.read_mapped(0, &mut buf).map_err(CommandError::flash("mmap test"))?;
            let _ = out.write_str(HEXDUMP_HEADER);
            hexdump(out, 0, &buf);
        }
        other => {
            let _ = write!(out, "Unknown action: {}\r\n", other);
            return Err(CommandError::Usage);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write_args() {
        let args = Args::tokenize("qspi write 0 10 20 30").unwrap();
        assert_eq!(args.len(), 6);
        let (offset, data) = parse_write_args(&args).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(data.as_slice(), &[10, 20, 30]);
    }

    #[test]
    fn test_parse_write_args_mixed_bases() {
        let args = Args::tokenize("qspi write 0x100 0xff 010 7").unwrap();
        let (offset, data) = parse_write_args(&args).unwrap();
        assert_eq!(offset, 0x100);
        assert_eq!(data.as_slice(), &[0xFF, 8, 7]);
    }

    #[test]
    fn test_parse_write_args_rejects_before_any_write() {
        let args = Args::tokenize("qspi write 0 1 256 3").unwrap();
        assert_eq!(parse_write_args(&args), Err(CommandError::Parse { index: 4 }));
        let args = Args::tokenize("qspi write 0").unwrap();
        assert_eq!(parse_write_args(&args), Err(CommandError::Usage));
        let args = Args::tokenize("qspi write zero 1").unwrap();
        assert_eq!(parse_write_args(&args), Err(CommandError::Parse { index: 2 }));
    }
}
