//! Flash engine behaviour against the simulated chip

use qspimon_core::flash::{FlashConfig, FlashMode, QspiFlash};
use qspimon_core::protocol::ReadMode;
use qspimon_core::qspi::{opcodes, BusFeatures, LineWidth};
use qspimon_core::Error;
use qspimon_sim::{Fault, SimClock, SimConfig, SimFlash};

const SIZE: u32 = 4 * 1024 * 1024;

fn new_flash() -> QspiFlash<SimFlash> {
    qspimon_sim::flash(SimFlash::new_default())
}

#[test]
fn test_first_access_identifies_and_enables_quad() {
    let mut flash = new_flash();
    assert!(!flash.is_ready());
    assert!(flash.chip().is_none());

    let mut buf = [0u8; 16];
    flash.read(0, &mut buf).unwrap();

    assert!(flash.is_ready());
    assert_eq!(flash.chip().map(|c| c.name), Some("W25Q32JV"));
    assert_eq!(flash.size(), Some(SIZE));
    assert_eq!(flash.read_mode(), ReadMode::QUAD_IO);
    assert!(flash.fast_read_enabled());
    assert!(flash.bus().quad_enabled());
    assert_eq!(flash.bus().count(opcodes::RDID), 1);
    assert_eq!(flash.bus().count(opcodes::RST), 1);
    assert_eq!(buf, [0xFF; 16]);

    flash.read(0, &mut buf).unwrap();
    assert_eq!(flash.bus().count(opcodes::RDID), 1);
}

#[test]
fn test_single_line_config_skips_quad_enable() {
    let config = FlashConfig {
        line_width: LineWidth::Single,
        ..FlashConfig::default()
    };
    let mut flash = QspiFlash::new(SimFlash::new_default(), config);
    flash.initialize().unwrap();
    assert!(!flash.fast_read_enabled());
    assert_eq!(flash.read_mode(), ReadMode::SINGLE);
    assert!(!flash.bus().quad_enabled());
}

#[test]
fn test_quad_config_on_dual_bus_is_unsupported() {
    let sim = SimFlash::new(SimConfig {
        features: BusFeatures::DUAL,
        ..SimConfig::default()
    });
    let mut flash = qspimon_sim::flash(sim);
    assert_eq!(flash.initialize(), Err(Error::Unsupported));
    assert!(!flash.is_ready());

    flash.enable_fast_mode(LineWidth::Dual).unwrap();
    assert_eq!(flash.read_mode(), ReadMode::DUAL_IO);
    assert_eq!(flash.line_width(), LineWidth::Dual);
}

#[test]
fn test_other_quad_enable_methods() {
    // Macronix keeps QE in SR1, GigaDevice writes SR1 and SR2 together
    for (mfr, dev) in [(0xC2, 0x2016), (0xC8, 0x4017)] {
        let sim = SimFlash::new(SimConfig {
            manufacturer_id: mfr,
            device_id: dev,
            ..SimConfig::default()
        });
        let mut flash = qspimon_sim::flash(sim);
        flash.initialize().unwrap();
        assert_eq!(flash.read_mode(), ReadMode::QUAD_IO);
        assert!(flash.bus().quad_enabled());
    }
}

#[test]
fn test_unknown_or_absent_chip() {
    for (mfr, dev) in [(0x12, 0x3456), (0xFF, 0xFFFF), (0x00, 0x0000)] {
        let sim = SimFlash::new(SimConfig {
            manufacturer_id: mfr,
            device_id: dev,
            ..SimConfig::default()
        });
        let mut flash = qspimon_sim::flash(sim);
        let mut buf = [0u8; 4];
        assert_eq!(flash.read(0, &mut buf), Err(Error::NotFound));
        assert!(!flash.is_ready());
        assert_eq!(flash.size(), None);
    }
}

#[test]
fn test_erase_write_verify_then_read() {
    let mut flash = new_flash();
    let data: Vec<u8> = (0..1000u32).map(|i| (i * 7) as u8).collect();

    flash.erase_write_verify(0x2010, &data).unwrap();

    let mut back = vec![0u8; data.len()];
    flash.read(0x2010, &mut back).unwrap();
    assert_eq!(back, data);
    // 1000 bytes from 0x2010 touch pages 0x2000..0x2400
    assert_eq!(flash.bus().count(opcodes::PP), 4);
}

#[test]
fn test_erase_rounds_to_sectors() {
    let mut flash = new_flash();
    flash.bus_mut().data_mut()[..0x3000].fill(0);

    flash.erase(0x1800, 0x100).unwrap();

    let data = flash.bus().data();
    assert!(data[..0x1000].iter().all(|&b| b == 0));
    assert!(data[0x1000..0x2000].iter().all(|&b| b == 0xFF));
    assert!(data[0x2000..0x3000].iter().all(|&b| b == 0));
    assert_eq!(flash.bus().count(opcodes::SE_20), 1);
}

#[test]
fn test_erase_uses_64k_blocks_when_aligned() {
    let mut flash = new_flash();
    flash.erase(0xF000, 0x11000).unwrap();
    // one sector, one block
    assert_eq!(flash.bus().count(opcodes::SE_20), 1);
    assert_eq!(flash.bus().count(opcodes::BE_D8), 1);
}

#[test]
fn test_zero_length_erase_is_a_no_op() {
    let mut flash = new_flash();
    flash.erase(0x1000, 0).unwrap();
    assert_eq!(flash.bus().count(opcodes::SE_20), 0);
    assert_eq!(flash.bus().count(opcodes::BE_D8), 0);
}

#[test]
fn test_out_of_bounds() {
    let mut flash = new_flash();
    let mut buf = [0u8; 2];
    assert_eq!(flash.read(SIZE - 1, &mut buf), Err(Error::OutOfBound));
    assert_eq!(flash.write(SIZE, &[0]), Err(Error::OutOfBound));
    assert_eq!(flash.erase(SIZE - 0x1000, 0x1001), Err(Error::OutOfBound));
    assert_eq!(flash.bus().count(opcodes::PP), 0);
    flash.read(SIZE - 2, &mut buf).unwrap();
}

#[test]
fn test_verify_reports_first_mismatch() {
    let mut flash = new_flash();
    flash.bus_mut().inject(Fault::CorruptProgram { addr: 0x120 });

    let result = flash.erase_write_verify(0x100, &[0xAA; 64]);
    assert_eq!(
        result,
        Err(Error::VerifyMismatch {
            addr: 0x120,
            expected: 0xAA,
            found: 0xAB
        })
    );
}

#[test]
fn test_stuck_busy_times_out() {
    let mut flash = new_flash();
    flash.initialize().unwrap();
    flash.bus_mut().inject(Fault::StuckBusy);
    assert_eq!(flash.write(0, &[0x00]), Err(Error::Timeout));
}

#[test]
fn test_write_enable_not_latched() {
    let mut flash = new_flash();
    flash.initialize().unwrap();
    flash.bus_mut().inject(Fault::IgnoreWriteEnable);
    assert_eq!(flash.erase(0, 0x1000), Err(Error::WriteError));
    assert_eq!(flash.bus().count(opcodes::SE_20), 0);
}

#[test]
fn test_read_failure() {
    let mut flash = new_flash();
    flash.initialize().unwrap();
    flash.bus_mut().inject(Fault::ReadFailure);
    let mut buf = [0u8; 8];
    assert_eq!(flash.read(0, &mut buf), Err(Error::ReadError));
}

#[test]
fn test_set_frequency_forces_renegotiation() {
    let mut flash = new_flash();
    let mut clocks = SimClock::new();
    flash.initialize().unwrap();

    let pll = flash.set_frequency(&mut clocks, 100).unwrap();
    assert_eq!((pll.m, pll.n, pll.r), (4, 100, 2));
    assert_eq!(clocks.last(), Some(&pll));
    assert_eq!(flash.frequency_hz(), 100_000_000);
    assert!(!flash.is_ready());
    assert!(!flash.fast_read_enabled());

    let mut buf = [0u8; 4];
    flash.read(0, &mut buf).unwrap();
    assert!(flash.is_ready());
    assert!(flash.fast_read_enabled());
    assert_eq!(flash.bus().count(opcodes::RDID), 2);
}

#[test]
fn test_rejected_frequency_keeps_state() {
    let mut flash = new_flash();
    let mut clocks = SimClock::new();
    flash.initialize().unwrap();

    assert_eq!(flash.set_frequency(&mut clocks, 251), Err(Error::Unsupported));
    assert_eq!(flash.set_frequency(&mut clocks, 0), Err(Error::Unsupported));
    assert!(clocks.history().is_empty());
    assert!(flash.is_ready());
    assert_eq!(flash.frequency_hz(), 50_000_000);

    clocks.set_lock_fails(true);
    assert_eq!(flash.set_frequency(&mut clocks, 80), Err(Error::Timeout));
    assert!(flash.is_ready());
}

#[test]
fn test_memory_mapped_refuses_commands_until_reinitialized() {
    let mut image = vec![0u8; 64];
    image[..4].copy_from_slice(&0x2408_0000u32.to_le_bytes());
    let mut flash = qspimon_sim::flash(SimFlash::with_data(SimConfig::default(), &image));
    let mut clocks = SimClock::new();

    flash.enter_memory_mapped().unwrap();
    assert_eq!(flash.mode(), FlashMode::MemoryMapped);
    assert!(flash.bus().is_mapped());

    let mut buf = [0u8; 4];
    flash.read_mapped(0, &mut buf).unwrap();
    assert_eq!(u32::from_le_bytes(buf), 0x2408_0000);

    assert_eq!(flash.read(0, &mut buf), Err(Error::InvalidState));
    assert_eq!(flash.write(0, &buf), Err(Error::InvalidState));
    assert_eq!(flash.erase(0, 0x1000), Err(Error::InvalidState));
    assert_eq!(flash.set_frequency(&mut clocks, 100), Err(Error::InvalidState));
    assert_eq!(flash.enter_memory_mapped(), Err(Error::InvalidState));
    assert_eq!(flash.read_mapped(SIZE - 2, &mut buf), Err(Error::OutOfBound));

    flash.reinitialize().unwrap();
    assert_eq!(flash.mode(), FlashMode::Command);
    assert!(!flash.is_ready());
    assert!(flash.chip().is_none());
    assert_eq!(flash.bus().reinit_count(), 1);
    assert_eq!(flash.read_mapped(0, &mut buf), Err(Error::InvalidState));

    flash.read(0, &mut buf).unwrap();
    assert_eq!(u32::from_le_bytes(buf), 0x2408_0000);
    assert_eq!(flash.bus().count(opcodes::RDID), 2);
}

#[test]
fn test_memory_mapped_needs_controller_support() {
    let sim = SimFlash::new(SimConfig {
        features: BusFeatures::DUAL | BusFeatures::QUAD,
        ..SimConfig::default()
    });
    let mut flash = qspimon_sim::flash(sim);
    assert_eq!(flash.enter_memory_mapped(), Err(Error::Unsupported));
    assert_eq!(flash.mode(), FlashMode::Command);
}

#[test]
fn test_memory_mapped_from_single_line_switches_to_quad() {
    let config = FlashConfig {
        line_width: LineWidth::Single,
        ..FlashConfig::default()
    };
    let mut flash = QspiFlash::new(SimFlash::new_default(), config);
    flash.initialize().unwrap();
    assert!(!flash.fast_read_enabled());

    flash.enter_memory_mapped().unwrap();
    assert_eq!(flash.read_mode(), ReadMode::QUAD_IO);
    assert_eq!(flash.bus().mapped_config().map(|c| c.opcode), Some(opcodes::QIOR));
}
