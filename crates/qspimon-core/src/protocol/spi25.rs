//! SPI25 protocol implementation
//!
//! Common JEDEC command sequences, expressed as [`QspiCommand`]s on a
//! [`QspiBus`]. Every write-class command is preceded by WREN and followed by
//! status polling until the chip drops WIP or the deadline passes.

use crate::chip::ChipFeatures;
use crate::error::{Error, Result};
use crate::qspi::{opcodes, BusFeatures, IoMode, LineWidth, QspiBus, QspiCommand};

/// Read the JEDEC ID from a flash chip
///
/// Returns (manufacturer_id, device_id) on success.
pub fn read_jedec_id<B: QspiBus + ?Sized>(bus: &mut B) -> Result<(u8, u16)> {
    let mut buf = [0u8; 3];
    let mut cmd = QspiCommand::read_reg(opcodes::RDID, &mut buf);
    bus.execute(&mut cmd)?;

    let manufacturer = buf[0];
    let device = ((buf[1] as u16) << 8) | (buf[2] as u16);

    Ok((manufacturer, device))
}

/// Read the status register 1
pub fn read_status1<B: QspiBus + ?Sized>(bus: &mut B) -> Result<u8> {
    let mut buf = [0u8; 1];
    let mut cmd = QspiCommand::read_reg(opcodes::RDSR, &mut buf);
    bus.execute(&mut cmd)?;
    Ok(buf[0])
}

/// Read the status register 2
pub fn read_status2<B: QspiBus + ?Sized>(bus: &mut B) -> Result<u8> {
    let mut buf = [0u8; 1];
    let mut cmd = QspiCommand::read_reg(opcodes::RDSR2, &mut buf);
    bus.execute(&mut cmd)?;
    Ok(buf[0])
}

/// Send Write Enable and confirm the chip latched it
///
/// Fails with [`Error::WriteError`] if WEL stays clear.
pub fn write_enable<B: QspiBus + ?Sized>(bus: &mut B) -> Result<()> {
    let mut cmd = QspiCommand::simple(opcodes::WREN);
    bus.execute(&mut cmd)?;
    if check_wel(bus)? {
        Ok(())
    } else {
        log::warn!("WEL not set after WREN");
        Err(Error::WriteError)
    }
}

/// Check if the Write Enable Latch is set
pub fn check_wel<B: QspiBus + ?Sized>(bus: &mut B) -> Result<bool> {
    let status = read_status1(bus)?;
    Ok(status & opcodes::SR1_WEL != 0)
}

/// Wait for the flash chip to become ready (WIP bit cleared)
///
/// # Arguments
/// * `poll_delay_us` - Delay in microseconds between status register polls
/// * `timeout_us` - Maximum time to wait before returning Error::Timeout
///
/// # Typical poll delays
/// * Page program: 10us
/// * 4KB sector erase: 10,000us (10ms)
/// * 32KB/64KB block erase: 100,000us (100ms)
pub fn wait_ready<B: QspiBus + ?Sized>(bus: &mut B, poll_delay_us: u32, timeout_us: u32) -> Result<()> {
    let max_polls = if poll_delay_us > 0 {
        timeout_us / poll_delay_us
    } else {
        timeout_us
    };

    for _ in 0..max_polls {
        let status = read_status1(bus)?;
        if status & opcodes::SR1_WIP == 0 {
            return Ok(());
        }
        if poll_delay_us > 0 {
            bus.delay_us(poll_delay_us);
        }
    }

    log::debug!("chip still busy after {}us", timeout_us);
    Err(Error::Timeout)
}

/// Write the status register 1
pub fn write_status1<B: QspiBus + ?Sized>(bus: &mut B, value: u8) -> Result<()> {
    write_enable(bus)?;
    let data = [value];
    let mut cmd = QspiCommand::write_reg(opcodes::WRSR, &data);
    bus.execute(&mut cmd)?;
    wait_ready(bus, 10_000, 500_000)
}

/// Write status registers 1 and 2 together
///
/// Some chips require writing both registers in a single command.
pub fn write_status12<B: QspiBus + ?Sized>(bus: &mut B, sr1: u8, sr2: u8) -> Result<()> {
    write_enable(bus)?;
    let data = [sr1, sr2];
    let mut cmd = QspiCommand::write_reg(opcodes::WRSR, &data);
    bus.execute(&mut cmd)?;
    wait_ready(bus, 10_000, 500_000)
}

/// Write SR2 directly using opcode 0x31
fn write_status2_direct<B: QspiBus + ?Sized>(bus: &mut B, value: u8) -> Result<()> {
    write_enable(bus)?;
    let data = [value];
    let mut cmd = QspiCommand::write_reg(opcodes::WRSR2, &data);
    bus.execute(&mut cmd)?;
    wait_ready(bus, 10_000, 500_000)
}

/// Read data with 3-byte addressing, split into bus-sized transactions
pub fn read<B: QspiBus + ?Sized>(bus: &mut B, mode: ReadMode, addr: u32, buf: &mut [u8]) -> Result<()> {
    let max_len = bus.max_read_len().max(1);
    let mut offset = 0;

    while offset < buf.len() {
        let chunk_len = core::cmp::min(max_len, buf.len() - offset);
        let chunk = &mut buf[offset..offset + chunk_len];
        let mut cmd = QspiCommand::read_3b(mode.opcode, addr + offset as u32, chunk)
            .with_io_mode(mode.io_mode)
            .with_dummy_cycles(mode.dummy_cycles);
        bus.execute(&mut cmd)?;
        offset += chunk_len;
    }

    Ok(())
}

/// Program a single page using 3-byte addressing
///
/// The data must not cross a page boundary.
/// Page program typically takes 0.7-5ms, we poll every 10us with 10ms timeout.
pub fn program_page<B: QspiBus + ?Sized>(bus: &mut B, addr: u32, data: &[u8]) -> Result<()> {
    write_enable(bus)?;

    let mut cmd = QspiCommand::write_3b(opcodes::PP, addr, data);
    bus.execute(&mut cmd)?;

    wait_ready(bus, 10, 10_000)
}

/// Erase a sector/block at the given address
///
/// Poll delay should match the expected erase time:
/// - 4KB sector: 10ms poll, 1s timeout (typical 45-400ms)
/// - 32KB block: 100ms poll, 4s timeout (typical 120-1600ms)
/// - 64KB block: 100ms poll, 4s timeout (typical 150-2000ms)
pub fn erase_block<B: QspiBus + ?Sized>(
    bus: &mut B,
    opcode: u8,
    addr: u32,
    poll_delay_us: u32,
    timeout_us: u32,
) -> Result<()> {
    write_enable(bus)?;

    let mut cmd = QspiCommand::erase_3b(opcode, addr);
    bus.execute(&mut cmd)?;

    wait_ready(bus, poll_delay_us, timeout_us)
}

/// Send software reset sequence
pub fn software_reset<B: QspiBus + ?Sized>(bus: &mut B) -> Result<()> {
    let mut cmd = QspiCommand::simple(opcodes::RSTEN);
    bus.execute(&mut cmd)?;
    bus.delay_us(50);
    let mut cmd = QspiCommand::simple(opcodes::RST);
    bus.execute(&mut cmd)?;
    bus.delay_us(100);
    Ok(())
}

// ============================================================================
// Quad Enable (QE) Functions
// ============================================================================

/// Quad Enable requirement types
///
/// Different flash chips have different ways to enable quad mode.
/// These correspond to the values defined in SFDP JESD216.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadEnableMethod {
    /// No QE bit required - device does not have a QE bit
    None,
    /// QE is bit 1 of SR2, use WRSR with 2 data bytes to write
    Sr2Bit1WriteSr,
    /// QE is bit 6 of SR1
    Sr1Bit6,
    /// QE is bit 1 of SR2, use dedicated 0x31 command
    Sr2Bit1WriteSr2,
}

/// Enable quad mode using the appropriate method for the chip
pub fn enable_quad_mode<B: QspiBus + ?Sized>(bus: &mut B, method: QuadEnableMethod) -> Result<()> {
    match method {
        QuadEnableMethod::None => Ok(()),
        QuadEnableMethod::Sr2Bit1WriteSr => {
            let sr1 = read_status1(bus)?;
            let sr2 = read_status2(bus)?;
            if sr2 & opcodes::SR2_QE != 0 {
                return Ok(());
            }
            write_status12(bus, sr1, sr2 | opcodes::SR2_QE)
        }
        QuadEnableMethod::Sr1Bit6 => {
            let sr1 = read_status1(bus)?;
            if sr1 & opcodes::SR1_QE_BIT6 != 0 {
                return Ok(());
            }
            write_status1(bus, sr1 | opcodes::SR1_QE_BIT6)
        }
        QuadEnableMethod::Sr2Bit1WriteSr2 => {
            let sr2 = read_status2(bus)?;
            if sr2 & opcodes::SR2_QE != 0 {
                return Ok(());
            }
            write_status2_direct(bus, sr2 | opcodes::SR2_QE)
        }
    }
}

/// Check if quad mode is enabled
pub fn is_quad_enabled<B: QspiBus + ?Sized>(bus: &mut B, method: QuadEnableMethod) -> Result<bool> {
    match method {
        QuadEnableMethod::None => Ok(true),
        QuadEnableMethod::Sr2Bit1WriteSr | QuadEnableMethod::Sr2Bit1WriteSr2 => {
            let sr2 = read_status2(bus)?;
            Ok(sr2 & opcodes::SR2_QE != 0)
        }
        QuadEnableMethod::Sr1Bit6 => {
            let sr1 = read_status1(bus)?;
            Ok(sr1 & opcodes::SR1_QE_BIT6 != 0)
        }
    }
}

// ============================================================================
// Read Mode Selection
// ============================================================================

/// Read instruction together with its line layout and dummy cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadMode {
    /// Line layout
    pub io_mode: IoMode,
    /// Read opcode
    pub opcode: u8,
    /// Dummy cycles between address and data
    pub dummy_cycles: u8,
}

impl ReadMode {
    /// Plain READ (0x03), valid at any bus width
    pub const SINGLE: Self = Self::new(IoMode::Single, opcodes::READ, 0);
    /// Dual Output Read (0x3B)
    pub const DUAL_OUT: Self = Self::new(IoMode::DualOut, opcodes::DOR, 8);
    /// Dual I/O Read (0xBB), mode byte included in the dummy cycles
    pub const DUAL_IO: Self = Self::new(IoMode::DualIo, opcodes::DIOR, 4);
    /// Quad Output Read (0x6B)
    pub const QUAD_OUT: Self = Self::new(IoMode::QuadOut, opcodes::QOR, 8);
    /// Quad I/O Read (0xEB), mode byte included in the dummy cycles
    pub const QUAD_IO: Self = Self::new(IoMode::QuadIo, opcodes::QIOR, 6);

    const fn new(io_mode: IoMode, opcode: u8, dummy_cycles: u8) -> Self {
        Self {
            io_mode,
            opcode,
            dummy_cycles,
        }
    }

    /// Returns true for any multi-line read
    pub const fn is_fast(&self) -> bool {
        !matches!(self.io_mode, IoMode::Single)
    }
}

/// Select the fastest read mode for the requested width
///
/// Prefers the I/O variant over the output-only variant. Fails with
/// [`Error::Unsupported`] when neither the bus nor the chip can run at the
/// requested width.
pub fn select_read_mode(bus: BusFeatures, chip: ChipFeatures, width: LineWidth) -> Result<ReadMode> {
    match width {
        LineWidth::Single => Ok(ReadMode::SINGLE),
        LineWidth::Dual if chip.contains(ChipFeatures::DUAL_IO) => {
            if bus.contains(BusFeatures::DUAL_IO) {
                Ok(ReadMode::DUAL_IO)
            } else if bus.contains(BusFeatures::DUAL_IN) {
                Ok(ReadMode::DUAL_OUT)
            } else {
                Err(Error::Unsupported)
            }
        }
        LineWidth::Quad if chip.contains(ChipFeatures::QUAD_IO) => {
            if bus.contains(BusFeatures::QUAD_IO) {
                Ok(ReadMode::QUAD_IO)
            } else if bus.contains(BusFeatures::QUAD_IN) {
                Ok(ReadMode::QUAD_OUT)
            } else {
                Err(Error::Unsupported)
            }
        }
        _ => Err(Error::Unsupported),
    }
}
