//! Program and boot flows against the simulated chip

use embedded_io::{ErrorKind, ErrorType, Read};
use qspimon_core::flash::FlashMode;
use qspimon_core::loader::{self, Handoff, LoadError, LoadProgress, LoadStats, NoProgress, CHUNK_SIZE};
use qspimon_core::qspi::opcodes;
use qspimon_core::Error;
use qspimon_sim::{Fault, SimConfig, SimFlash};

#[derive(Default)]
struct Recorder {
    chunks: Vec<(u32, usize)>,
    completed: Option<LoadStats>,
}

impl LoadProgress for Recorder {
    fn chunk_done(&mut self, addr: u32, len: usize) {
        self.chunks.push((addr, len));
    }

    fn complete(&mut self, stats: &LoadStats) {
        self.completed = Some(*stats);
    }
}

/// Yields `good` bytes of 0x5A, then fails
struct Failing {
    good: usize,
}

impl ErrorType for Failing {
    type Error = ErrorKind;
}

impl Read for Failing {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.good == 0 {
            return Err(ErrorKind::BrokenPipe);
        }
        let n = self.good.min(buf.len());
        buf[..n].fill(0x5A);
        self.good -= n;
        Ok(n)
    }
}

struct Jump;

impl Handoff for Jump {
    fn jump(&mut self, stack_pointer: u32, reset_vector: u32) -> ! {
        panic!("jump sp={:#010x} pc={:#010x}", stack_pointer, reset_vector)
    }
}

fn image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn test_program_streams_chunks() {
    let mut flash = qspimon_sim::flash(SimFlash::new_default());
    let data = image(10_000);
    let mut progress = Recorder::default();

    let stats = loader::program(&mut flash, &mut &data[..], 0, &mut progress).unwrap();

    assert_eq!(stats, LoadStats { bytes: 10_000, chunks: 3 });
    assert_eq!(progress.chunks, vec![(0, CHUNK_SIZE), (0x1000, CHUNK_SIZE), (0x2000, 1808)]);
    assert_eq!(progress.completed, Some(stats));
    assert_eq!(&flash.bus().data()[..10_000], &data[..]);
    assert_eq!(flash.bus().data()[10_000], 0xFF);
}

#[test]
fn test_program_at_offset_with_exact_chunks() {
    let mut flash = qspimon_sim::flash(SimFlash::new_default());
    let data = image(2 * CHUNK_SIZE);

    let stats = loader::program(&mut flash, &mut &data[..], 0x10000, &mut NoProgress).unwrap();

    assert_eq!(stats.chunks, 2);
    assert_eq!(&flash.bus().data()[0x10000..0x12000], &data[..]);
    assert!(flash.bus().data()[..0x10000].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_program_rejects_unaligned_start() {
    let mut flash = qspimon_sim::flash(SimFlash::new_default());
    let data = image(2 * CHUNK_SIZE);
    let mut source = &data[..];

    let err = loader::program(&mut flash, &mut source, 0x800, &mut NoProgress).unwrap_err();

    assert_eq!(err, LoadError::Flash(Error::OutOfBound));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(source.len(), data.len());
    assert_eq!(flash.bus().count(opcodes::SE_20), 0);
    assert!(flash.bus().data()[..0x3000].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_program_keeps_every_chunk_readable() {
    let mut flash = qspimon_sim::flash(SimFlash::new_default());
    let data = image(2 * CHUNK_SIZE + 100);

    loader::program(&mut flash, &mut &data[..], 0x3000, &mut NoProgress).unwrap();

    let mut back = vec![0u8; data.len()];
    flash.read(0x3000, &mut back).unwrap();
    assert_eq!(back, data);
}

#[test]
fn test_program_empty_image() {
    let mut flash = qspimon_sim::flash(SimFlash::new_default());
    let mut progress = Recorder::default();
    let stats = loader::program(&mut flash, &mut &[0u8; 0][..], 0, &mut progress).unwrap();
    assert_eq!(stats, LoadStats::default());
    assert!(progress.chunks.is_empty());
    assert_eq!(progress.completed, Some(LoadStats::default()));
}

#[test]
fn test_program_stops_at_first_mismatch() {
    let mut sim = SimFlash::new_default();
    sim.inject(Fault::CorruptProgram { addr: 0x1005 });
    let mut flash = qspimon_sim::flash(sim);
    let data = image(3 * CHUNK_SIZE);
    let mut progress = Recorder::default();

    let err = loader::program(&mut flash, &mut &data[..], 0, &mut progress).unwrap_err();

    assert_eq!(
        err,
        LoadError::Flash(Error::VerifyMismatch {
            addr: 0x1005,
            expected: data[0x1005],
            found: data[0x1005] ^ 0x01,
        })
    );
    assert_eq!(err.exit_code(), 4);
    assert_eq!(progress.chunks, vec![(0, CHUNK_SIZE)]);
    assert!(progress.completed.is_none());
    assert_eq!(&flash.bus().data()[..CHUNK_SIZE], &data[..CHUNK_SIZE]);
    assert!(flash.bus().data()[0x2000..0x3000].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_program_source_failure() {
    let mut flash = qspimon_sim::flash(SimFlash::new_default());
    let mut source = Failing { good: CHUNK_SIZE + 10 };

    let err = loader::program(&mut flash, &mut source, 0, &mut NoProgress).unwrap_err();

    assert_eq!(err, LoadError::Source(ErrorKind::BrokenPipe));
    assert_eq!(err.exit_code(), 1);
    assert!(flash.bus().data()[..CHUNK_SIZE].iter().all(|&b| b == 0x5A));
    assert_eq!(flash.bus().data()[CHUNK_SIZE], 0xFF);
}

#[test]
fn test_program_on_missing_chip() {
    let sim = SimFlash::new(SimConfig {
        manufacturer_id: 0xFF,
        device_id: 0xFFFF,
        ..SimConfig::default()
    });
    let mut flash = qspimon_sim::flash(sim);
    let data = image(100);
    let err = loader::program(&mut flash, &mut &data[..], 0, &mut NoProgress).unwrap_err();
    assert_eq!(err, LoadError::Flash(Error::NotFound));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_dump_mapped_reads_vector_table() {
    let mut vectors = Vec::new();
    for word in [0x2408_0000u32, 0x9000_0199, 0x9000_01A1, 0x9000_01A3] {
        vectors.extend_from_slice(&word.to_le_bytes());
    }
    let mut flash = qspimon_sim::flash(SimFlash::with_data(SimConfig::default(), &vectors));

    let mut words = [0u32; 4];
    loader::dump_mapped(&mut flash, &mut words).unwrap();

    assert_eq!(words, [0x2408_0000, 0x9000_0199, 0x9000_01A1, 0x9000_01A3]);
    assert_eq!(flash.mode(), FlashMode::MemoryMapped);

    // already mapped: reads again without re-entering
    loader::dump_mapped(&mut flash, &mut words[..1]).unwrap();
    assert_eq!(words[0], 0x2408_0000);
}

#[test]
#[should_panic(expected = "jump sp=0x24080000 pc=0x90000199")]
fn test_boot_jumps_to_reset_vector() {
    let mut vectors = Vec::new();
    for word in [0x2408_0000u32, 0x9000_0199] {
        vectors.extend_from_slice(&word.to_le_bytes());
    }
    let mut flash = qspimon_sim::flash(SimFlash::with_data(SimConfig::default(), &vectors));
    let _ = loader::boot(&mut flash, &mut Jump);
}

#[test]
fn test_boot_fails_without_chip() {
    let sim = SimFlash::new(SimConfig {
        manufacturer_id: 0x00,
        device_id: 0x0000,
        ..SimConfig::default()
    });
    let mut flash = qspimon_sim::flash(sim);
    let err = loader::boot(&mut flash, &mut Jump).unwrap_err();
    assert_eq!(err, Error::NotFound);
    assert_eq!(flash.mode(), FlashMode::Command);
}
