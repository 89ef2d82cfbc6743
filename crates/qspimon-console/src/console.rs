//! Line discipline between the UART and the shell

use crate::dispatch::Shell;
use crate::peripherals::Peripherals;
use core::fmt::Write;
use qspimon_core::clock::ClockTree;
use qspimon_core::qspi::QspiBus;
use qspimon_core::ring::{RingBuffer, RingError};

/// Prompt printed before every line
pub const PROMPT: &str = "> ";

/// Longest line the console accepts; further characters are not echoed
pub const LINE_CAPACITY: usize = 128;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;
const CTRL_C: u8 = 0x03;

/// Receive queue plus the line being edited
#[derive(Debug)]
pub struct Console {
    rx: RingBuffer<u8>,
    line: heapless::String<LINE_CAPACITY>,
    dropped: usize,
    after_cr: bool,
}

impl Console {
    /// Create a console whose receive queue holds `rx_capacity` bytes
    pub fn new(rx_capacity: usize) -> Result<Self, RingError> {
        Ok(Self {
            rx: RingBuffer::with_capacity(rx_capacity)?,
            line: heapless::String::new(),
            dropped: 0,
            after_cr: false,
        })
    }

    /// Queue one received byte
    ///
    /// This is the interrupt side. A full queue drops the byte and counts it.
    pub fn receive(&mut self, byte: u8) -> Result<(), RingError> {
        self.rx.add(byte).inspect_err(|_| self.dropped += 1)
    }

    /// Bytes lost to a full receive queue
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Bytes waiting to be processed
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// The line edited so far
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Print the greeting and the first prompt
    pub fn banner(&self, out: &mut dyn Write) {
        let _ = write!(
            out,
            "\r\nqspimon {}, type \"help\" for commands\r\n",
            env!("CARGO_PKG_VERSION")
        );
        print_prompt(out);
    }

    /// Drain the receive queue, running every completed line
    ///
    /// Returns the code of the last line run, or `None` if no line completed.
    pub fn poll<B, C, P>(&mut self, shell: &mut Shell<B, C, P>, out: &mut dyn Write) -> Option<i32>
    where
        B: QspiBus,
        C: ClockTree,
        P: Peripherals,
    {
        let mut code = None;
        while let Ok(byte) = self.rx.get() {
            if self.edit(byte, out) {
                code = Some(shell.execute(&self.line, out));
                self.line.clear();
                print_prompt(out);
            }
        }
        code
    }

    /// Apply one byte to the line; true when the line is complete
    fn edit(&mut self, byte: u8, out: &mut dyn Write) -> bool {
        let after_cr = core::mem::replace(&mut self.after_cr, byte == b'\r');
        match byte {
            b'\n' if after_cr => false,
            b'\r' | b'\n' => {
                let _ = out.write_str("\r\n");
                true
            }
            BACKSPACE | DELETE => {
                if self.line.pop().is_some() {
                    let _ = out.write_str("\x08 \x08");
                }
                false
            }
            CTRL_C => {
                let _ = out.write_str("^C\r\n");
                self.line.clear();
                print_prompt(out);
                false
            }
            b' '..=b'~' => {
                if self.line.push(byte as char).is_ok() {
                    let _ = out.write_char(byte as char);
                }
                false
            }
            _ => false,
        }
    }
}

fn print_prompt(out: &mut dyn Write) {
    let _ = out.write_str(PROMPT);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(console: &mut Console, bytes: &[u8], out: &mut dyn Write) -> usize {
        bytes.iter().filter(|b| console.edit(**b, out)).count()
    }

    #[test]
    fn test_echo_and_complete() {
        let mut console = Console::new(16).unwrap();
        let mut out = heapless::String::<64>::new();
        assert_eq!(feed(&mut console, b"help\r\n", &mut out), 1);
        assert_eq!(console.line(), "help");
        assert_eq!(out.as_str(), "help\r\n");
    }

    #[test]
    fn test_backspace() {
        let mut console = Console::new(16).unwrap();
        let mut out = heapless::String::<64>::new();
        feed(&mut console, b"hx\x08\x7f\x08elp", &mut out);
        assert_eq!(console.line(), "elp");
        assert_eq!(out.as_str(), "hx\x08 \x08\x08 \x08elp");
    }

    #[test]
    fn test_ctrl_c_discards_line() {
        let mut console = Console::new(16).unwrap();
        let mut out = heapless::String::<64>::new();
        assert_eq!(feed(&mut console, b"reset\x03", &mut out), 0);
        assert_eq!(console.line(), "");
        assert!(out.ends_with("^C\r\n> "));
    }

    #[test]
    fn test_line_capacity() {
        let mut console = Console::new(16).unwrap();
        let mut out = heapless::String::<256>::new();
        for _ in 0..LINE_CAPACITY + 10 {
            console.edit(b'a', &mut out);
        }
        assert_eq!(console.line().len(), LINE_CAPACITY);
        assert_eq!(out.len(), LINE_CAPACITY);
    }

    #[test]
    fn test_receive_drops_when_full() {
        let mut console = Console::new(2).unwrap();
        console.receive(b'a').unwrap();
        console.receive(b'b').unwrap();
        assert_eq!(console.receive(b'c'), Err(RingError::Full));
        assert_eq!(console.dropped(), 1);
        assert_eq!(console.pending(), 2);
    }
}
