//! Command handlers
//!
//! Each handler validates all of its arguments before touching hardware and
//! prints its own progress; errors are printed by the dispatcher.

pub mod io;
pub mod memory;
pub mod qspi;
pub mod system;

use core::fmt::Write;

/// Column header matching [`hexdump`] lines
pub const HEXDUMP_HEADER: &str = "Offset (h) 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F\r\n";

/// Print `data` 16 bytes per line, each line prefixed with its address
pub fn hexdump(out: &mut dyn Write, base: u32, data: &[u8]) {
    for (i, line) in data.chunks(16).enumerate() {
        let _ = write!(out, "[{:08X}]", base.wrapping_add((i * 16) as u32));
        for byte in line {
            let _ = write!(out, " {:02X}", byte);
        }
        let _ = out.write_str("\r\n");
    }
}

/// Printable form of a received byte
fn printable(byte: u8) -> char {
    if byte.is_ascii_graphic() || byte == b' ' {
        byte as char
    } else {
        '.'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hexdump_layout() {
        let mut out = heapless::String::<256>::new();
        let data: [u8; 18] = core::array::from_fn(|i| i as u8);
        hexdump(&mut out, 0x100, &data);
        assert_eq!(
            out.as_str(),
            "[00000100] 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F\r\n[00000110] 10 11\r\n"
        );
        assert_eq!(HEXDUMP_HEADER.find("00"), out.find("00 01"));
    }

    #[test]
    fn test_printable() {
        assert_eq!(printable(b'a'), 'a');
        assert_eq!(printable(b' '), ' ');
        assert_eq!(printable(0x07), '.');
    }
}
