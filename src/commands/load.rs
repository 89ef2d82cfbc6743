//! Load command implementation

use crate::cli::FlashArgs;
use crate::device;
use crate::error::{AppError, Result};
use embedded_io::{ErrorKind, ErrorType};
use indicatif::{ProgressBar, ProgressStyle};
use qspimon_core::loader::{self, Handoff, LoadProgress, LoadStats};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Progress reporter using an indicatif progress bar
struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) Programming")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl LoadProgress for IndicatifProgress {
    fn chunk_done(&mut self, _addr: u32, len: usize) {
        self.bar.inc(len as u64);
    }

    fn complete(&mut self, stats: &LoadStats) {
        self.bar.finish_with_message("Programming complete");
        println!("Programmed {} bytes in {} chunks", stats.bytes, stats.chunks);
    }
}

/// Image file as an `embedded_io` source
struct FileSource(File);

impl ErrorType for FileSource {
    type Error = ErrorKind;
}

impl embedded_io::Read for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, Self::Error> {
        loop {
            match self.0.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("image read failed: {}", e);
                    return Err(match e.kind() {
                        io::ErrorKind::NotFound => ErrorKind::NotFound,
                        io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
                        io::ErrorKind::InvalidData => ErrorKind::InvalidData,
                        io::ErrorKind::TimedOut => ErrorKind::TimedOut,
                        _ => ErrorKind::Other,
                    });
                }
            }
        }
    }
}

/// There is no core to jump into on the host; report and exit
struct HostHandoff;

impl Handoff for HostHandoff {
    fn jump(&mut self, stack_pointer: u32, reset_vector: u32) -> ! {
        println!(
            "Jumping to image: SP=0x{:08X}, reset vector=0x{:08X}",
            stack_pointer, reset_vector
        );
        std::process::exit(0)
    }
}

/// Program `image` at `start`
pub fn run_program(args: &FlashArgs, image: &Path, start: u32) -> Result<()> {
    let (mut flash, _clocks) = device::open(args)?;
    let chip = flash.initialize().map_err(AppError::flash("flash init"))?;
    println!(
        "Found: {} {} ({} bytes)",
        chip.vendor, chip.name, chip.total_size
    );

    let file = File::open(image).map_err(|source| AppError::Io {
        path: image.to_path_buf(),
        source,
    })?;
    let size = file
        .metadata()
        .map_err(|source| AppError::Io {
            path: image.to_path_buf(),
            source,
        })?
        .len();
    if u64::from(start) + size > u64::from(chip.total_size) {
        return Err(AppError::ImageTooLarge {
            size,
            start,
            capacity: chip.total_size,
        });
    }
    println!("Programming {} bytes from {:?} at 0x{:08X}", size, image, start);

    let mut progress = IndicatifProgress::new(size);
    let result = loader::program(&mut flash, &mut FileSource(file), start, &mut progress);
    if result.is_err() {
        progress.bar.abandon_with_message("Programming failed!");
    }

    // Chunks already written stay in flash, so persist either way
    device::save(args, flash.bus())?;
    result?;
    Ok(())
}

/// Map the flash and jump to the image it holds
pub fn run_boot(args: &FlashArgs) -> Result<()> {
    let (mut flash, _clocks) = device::open(args)?;
    let result = loader::boot(&mut flash, &mut HostHandoff);
    result.map(|never| match never {}).map_err(AppError::flash("boot"))
}

/// Print the first `count` words of the mapped image
pub fn run_dump(args: &FlashArgs, count: usize) -> Result<()> {
    let (mut flash, _clocks) = device::open(args)?;
    let mut words = vec![0u32; count];
    loader::dump_mapped(&mut flash, &mut words).map_err(AppError::flash("dump"))?;
    for (i, word) in words.iter().enumerate() {
        println!("[{:08X}] {:08X}", i * 4, word);
    }
    Ok(())
}
