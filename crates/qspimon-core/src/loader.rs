//! Image loader
//!
//! Two flows share the flash engine:
//!
//! - [`program`] streams an image from any [`embedded_io::Read`] source into
//!   the flash, one 4 KiB chunk at a time, erasing, programming and reading
//!   back each chunk before moving on.
//! - [`boot`] maps the flash and hands control to the image found at its
//!   start: word 0 is the initial stack pointer, word 1 the reset vector.

use crate::error::Error;
use crate::flash::{FlashMode, QspiFlash};
use crate::qspi::QspiBus;
use core::convert::Infallible;
use core::fmt;
use embedded_io::{ErrorKind, Read};

/// Bytes erased, programmed and verified per step
pub const CHUNK_SIZE: usize = 4096;

/// Errors that abort a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// The flash rejected a chunk
    Flash(Error),
    /// The image source failed
    Source(ErrorKind),
}

impl LoadError {
    /// Process exit code for the host loader
    ///
    /// 3 for a failed read-back, 4 for a mismatch, 2 for any other flash
    /// failure, 1 when the image itself could not be read.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::Flash(Error::ReadError) => 3,
            LoadError::Flash(Error::VerifyMismatch { .. }) => 4,
            LoadError::Flash(_) => 2,
            LoadError::Source(_) => 1,
        }
    }
}

impl From<Error> for LoadError {
    fn from(e: Error) -> Self {
        LoadError::Flash(e)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Flash(e) => write!(f, "flash: {}", e),
            LoadError::Source(kind) => write!(f, "image source: {:?}", kind),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LoadError {}

/// Totals for a finished transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Image bytes written
    pub bytes: usize,
    /// Chunks erased, written and verified
    pub chunks: usize,
}

/// Callback for progress reporting during [`program`]
pub trait LoadProgress {
    /// Called after each chunk has been verified
    fn chunk_done(&mut self, addr: u32, len: usize);

    /// Called once the source is exhausted
    fn complete(&mut self, stats: &LoadStats);
}

/// A no-op progress reporter
pub struct NoProgress;

impl LoadProgress for NoProgress {
    fn chunk_done(&mut self, _addr: u32, _len: usize) {}
    fn complete(&mut self, _stats: &LoadStats) {}
}

/// Transfer control to an image
///
/// Implemented by the board: load MSP with `stack_pointer` and branch to
/// `reset_vector`.
pub trait Handoff {
    /// Jump into the image; never returns
    fn jump(&mut self, stack_pointer: u32, reset_vector: u32) -> !;
}

/// Returns true if `addr` is a valid [`program`] start address
pub const fn is_chunk_aligned(addr: u32) -> bool {
    addr as usize % CHUNK_SIZE == 0
}

/// Fill `buf` from `source`, looping over short reads
///
/// Returns fewer than `buf.len()` bytes only at end of input.
fn fill_chunk<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> Result<usize, LoadError> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) => return Err(LoadError::Source(embedded_io::Error::kind(&e))),
        }
    }
    Ok(filled)
}

/// Program an image from `source` starting at flash address `start`
///
/// `start` must be a multiple of [`CHUNK_SIZE`] so that no chunk shares a
/// sector with the one before it; any other `start` fails with
/// [`Error::OutOfBound`] before anything is read or erased.
///
/// Stops at the first failure. Chunks already written stay in flash.
pub fn program<B, R, P>(
    flash: &mut QspiFlash<B>,
    source: &mut R,
    start: u32,
    progress: &mut P,
) -> Result<LoadStats, LoadError>
where
    B: QspiBus,
    R: Read + ?Sized,
    P: LoadProgress + ?Sized,
{
    if !is_chunk_aligned(start) {
        log::error!("start {:#08x} is not a multiple of {} bytes", start, CHUNK_SIZE);
        return Err(LoadError::Flash(Error::OutOfBound));
    }

    let mut buf = [0u8; CHUNK_SIZE];
    let mut stats = LoadStats::default();
    let mut addr = start;

    loop {
        let len = fill_chunk(source, &mut buf)?;
        if len == 0 {
            break;
        }

        flash.erase_write_verify(addr, &buf[..len]).map_err(|e| {
            log::error!("chunk at {:#08x} failed: {}", addr, e);
            LoadError::Flash(e)
        })?;
        progress.chunk_done(addr, len);

        stats.bytes += len;
        stats.chunks += 1;
        addr += len as u32;

        if len < CHUNK_SIZE {
            break;
        }
    }

    log::info!("programmed {} bytes in {} chunks", stats.bytes, stats.chunks);
    progress.complete(&stats);
    Ok(stats)
}

/// Read the first `words.len()` little-endian words of the mapped image
///
/// Enters memory-mapped mode if the flash is still in command mode.
pub fn dump_mapped<B: QspiBus>(flash: &mut QspiFlash<B>, words: &mut [u32]) -> Result<(), Error> {
    if flash.mode() == FlashMode::Command {
        flash.enter_memory_mapped()?;
    }
    let mut raw = [0u8; 4];
    for (i, word) in words.iter_mut().enumerate() {
        flash.read_mapped((i * 4) as u32, &mut raw)?;
        *word = u32::from_le_bytes(raw);
    }
    Ok(())
}

/// Map the flash and jump to the image at its start
///
/// Only returns if the flash could not be mapped or read.
pub fn boot<B, H>(flash: &mut QspiFlash<B>, handoff: &mut H) -> Result<Infallible, Error>
where
    B: QspiBus,
    H: Handoff + ?Sized,
{
    let mut vectors = [0u32; 2];
    dump_mapped(flash, &mut vectors)?;
    let [stack_pointer, reset_vector] = vectors;
    log::info!("booting: sp={:#010x} pc={:#010x}", stack_pointer, reset_vector);
    handoff.jump(stack_pointer, reset_vector)
}
