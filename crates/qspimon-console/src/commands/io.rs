//! SD card, USB CDC, Ethernet PHY and RS-485 pass-through commands

use super::printable;
use crate::args::{parse_int, Args, MAX_ARGS};
use crate::error::CommandError;
use crate::peripherals::Peripherals;
use core::fmt::Write;

/// Usage text for `usb`
pub const USB_USAGE: &str = "usage: usb recv|send [data0 data1 ...]\r\n";

/// Usage text for `eth`
pub const ETH_USAGE: &str = "usage: eth <command>\r\n\
\x20where <command> is one of:\r\n\
\x20  phyrd  <reg>        Read PHY register\r\n\
\x20  phywr  <reg> <val>  Write PHY register\r\n\
\x20  rawrx               Wait for a received frame\r\n";

/// Usage text for `485`
pub const RS485_USAGE: &str = "USAGE: 485 recv|send [data0 data1 data2...]\r\n";

/// `sdinfo`
pub fn sdinfo<P: Peripherals + ?Sized>(board: &mut P, out: &mut dyn Write) -> Result<(), CommandError> {
    let info = board.sd_info().map_err(CommandError::peripheral("sd init"))?;
    let _ = write!(out, "CardType:     {}\r\n", info.card_type);
    let _ = write!(out, "CardVersion:  {}\r\n", info.version);
    let _ = write!(out, "Class:        {}\r\n", info.class);
    let _ = write!(out, "RelCardAdd:   {}\r\n", info.relative_address);
    let _ = write!(out, "BlockNbr:     {}\r\n", info.block_count);
    let _ = write!(out, "BlockSize:    {}\r\n", info.block_size);
    let _ = write!(out, "LogBlockNbr:  {}\r\n", info.logical_block_count);
    let _ = write!(out, "LogBlockSize: {}\r\n", info.logical_block_size);
    let _ = write!(out, "CardSpeed:    {}\r\n", info.speed);
    Ok(())
}

/// `sdls`
pub fn sdls<P: Peripherals + ?Sized>(board: &mut P, out: &mut dyn Write) -> Result<(), CommandError> {
    board
        .sd_list(&mut |name: &str| {
            let _ = write!(out, "  {}\r\n", name);
        })
        .map_err(CommandError::peripheral("sd list"))
}

/// `usb recv` echoes bytes until a key is pressed; `usb send` transmits
/// numbers as single bytes and anything else as text
pub fn usb<P: Peripherals + ?Sized>(board: &mut P, args: &Args<'_>, out: &mut dyn Write) -> Result<(), CommandError> {
    match args.get(1).ok_or(CommandError::Usage)? {
        "recv" => {
            while board.read_key().is_none() {
                if let Some(c) = board.usb_recv() {
                    let _ = write!(out, "RECV 0x{:02X} [{}]\r\n", c, printable(c));
                }
            }
            Ok(())
        }
        "send" => {
            for (index, token) in args.rest(2).iter().enumerate() {
                if parse_int(token).is_some() {
                    args.u8(index + 2)?;
                }
            }
            for (index, token) in args.rest(2).iter().enumerate() {
                match parse_int(token) {
                    Some(_) => {
                        let byte = args.u8(index + 2)?;
                        board.usb_send(&[byte]).map_err(CommandError::peripheral("usb send"))?;
                    }
                    None => board
                        .usb_send(token.as_bytes())
                        .map_err(CommandError::peripheral("usb send"))?,
                }
            }
            Ok(())
        }
        _ => Err(CommandError::Usage),
    }
}

/// `eth phyrd|phywr|rawrx`
pub fn eth<P: Peripherals + ?Sized>(board: &mut P, args: &Args<'_>, out: &mut dyn Write) -> Result<(), CommandError> {
    match args.get(1).ok_or(CommandError::Usage)? {
        "phyrd" => {
            let reg = phy_register(args, 2)?;
            let value = board.eth_phy_read(reg).map_err(CommandError::peripheral("phy read"))?;
            let _ = write!(out, "reg[{:02X}] = 0x{:08X}\r\n", reg, value);
            for bit in 0..16 {
                let _ = write!(out, "   bit[{}] = {}\r\n", bit, (value >> bit) & 1);
            }
            Ok(())
        }
        "phywr" => {
            let reg = phy_register(args, 2)?;
            let value = args.u32(3)?;
            board
                .eth_phy_write(reg, value)
                .map_err(CommandError::peripheral("phy write"))
        }
        "rawrx" => {
            let len = loop {
                if let Some(len) = board.eth_rx_ready() {
                    break len;
                }
                if board.read_key().is_some() {
                    return Err(CommandError::Aborted);
                }
            };
            let _ = out.write_str("Data arrived\r\n");
            if len == 0 {
                let _ = out.write_str("Data length is zero\r\n");
                return Err(CommandError::Status(-1));
            }
            let _ = write!(out, "Frame of {} bytes\r\n", len);
            Ok(())
        }
        _ => Err(CommandError::Usage),
    }
}

fn phy_register(args: &Args<'_>, index: usize) -> Result<u8, CommandError> {
    match args.int(index)? {
        reg @ 0..=31 => Ok(reg as u8),
        _ => Err(CommandError::Parse { index }),
    }
}

/// `485 send <bytes>` / `485 recv`
pub fn rs485<P: Peripherals + ?Sized>(board: &mut P, args: &Args<'_>, out: &mut dyn Write) -> Result<(), CommandError> {
    match args.get(1).ok_or(CommandError::Usage)? {
        "send" => {
            let mut data = heapless::Vec::<u8, MAX_ARGS>::new();
            for index in 2..args.len() {
                data.push(args.u8(index)?).map_err(|_| CommandError::TooManyArgs)?;
            }
            board.rs485_send(&data).map_err(CommandError::peripheral("485 send"))
        }
        "recv" => {
            while board.read_key().is_none() {
                if let Some(c) = board.rs485_recv() {
                    let _ = write!(out, "RECV: {} [{}, 0x{:02X}]\r\n", printable(c), c, c);
                }
            }
            Ok(())
        }
        _ => Err(CommandError::Usage),
    }
}
