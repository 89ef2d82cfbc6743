//! Console command implementation

use crate::cli::FlashArgs;
use crate::device;
use crate::error::{AppError, Result};
use qspimon_console::{Console, Shell};
use qspimon_sim::SimBoard;
use std::fmt;
use std::io::{self, Read, Write};

/// `core::fmt::Write` on top of stdout
struct StdoutWriter<W: Write> {
    inner: W,
    error: Option<io::Error>,
}

impl<W: Write> fmt::Write for StdoutWriter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.inner.write_all(s.as_bytes()).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }
}

impl<W: Write> StdoutWriter<W> {
    fn flush(&mut self) -> Result<()> {
        if let Some(e) = self.error.take() {
            return Err(AppError::Output(e));
        }
        self.inner.flush().map_err(AppError::Output)
    }
}

/// Run the console until stdin closes or `reset` is issued
pub fn run(args: &FlashArgs, rx_capacity: usize) -> Result<()> {
    let (flash, clocks) = device::open(args)?;
    let mut shell = Shell::new(flash, clocks, SimBoard::new());
    let mut console = Console::new(rx_capacity)?;
    let mut out = StdoutWriter {
        inner: io::stdout().lock(),
        error: None,
    };

    console.banner(&mut out);
    out.flush()?;

    // Never read more than the queue can take before draining it
    let mut buf = vec![0u8; rx_capacity.max(1)];
    let mut stdin = io::stdin().lock();
    loop {
        let n = match stdin.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(AppError::Output(e)),
        };
        for &byte in &buf[..n] {
            // a full queue drops the byte; reported below
            let _ = console.receive(byte);
        }
        if let Some(code) = console.poll(&mut shell, &mut out) {
            log::debug!("last return code {}", code);
        }
        out.flush()?;

        if shell.board().resets > 0 {
            log::info!("Reset requested, leaving console");
            break;
        }
    }

    if console.dropped() > 0 {
        log::warn!("{} input bytes dropped", console.dropped());
    }
    let (flash, _, _) = shell.into_parts();
    device::save(args, flash.bus())
}
