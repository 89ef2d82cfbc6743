//! In-memory serial NOR flash behind a QSPI controller

use std::collections::HashMap;

use qspimon_core::error::{Error, Result};
use qspimon_core::flash::ERASED_VALUE;
use qspimon_core::qspi::{
    check_io_mode_supported, opcodes, BusFeatures, MemoryMappedConfig, QspiBus, QspiCommand,
};

/// Configuration for the simulated flash
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID
    pub device_id: u16,
    /// Flash size in bytes
    pub size: usize,
    /// Page size for programming
    pub page_size: usize,
    /// Sector size for smallest erase
    pub sector_size: usize,
    /// What the controller can drive
    pub features: BusFeatures,
    /// Largest single read transaction
    pub max_read_len: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xEF, // Winbond
            device_id: 0x4016,     // W25Q32JV
            size: 4 * 1024 * 1024,
            page_size: 256,
            sector_size: 4096,
            features: BusFeatures::DUAL | BusFeatures::QUAD | BusFeatures::MEMORY_MAPPED,
            max_read_len: 4096,
        }
    }
}

/// Misbehaviour to inject into the simulated chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Programming the byte at `addr` leaves bit 0 flipped
    CorruptProgram {
        /// Absolute flash address
        addr: u32,
    },
    /// WREN is accepted but WEL never sets
    IgnoreWriteEnable,
    /// WIP never clears
    StuckBusy,
    /// Every data read fails on the bus
    ReadFailure,
}

/// Simulated flash chip and controller
///
/// Follows the chip rules the engine depends on: writes need WEL, programming
/// only clears bits, quad reads need the QE bit, and indirect commands are
/// refused while the controller is memory-mapped.
#[derive(Debug)]
pub struct SimFlash {
    config: SimConfig,
    data: Vec<u8>,
    status_reg1: u8,
    status_reg2: u8,
    faults: Vec<Fault>,
    mapped: Option<MemoryMappedConfig>,
    opcode_counts: HashMap<u8, usize>,
    reinit_count: usize,
    elapsed_us: u64,
}

impl SimFlash {
    /// Create an erased flash with the given configuration
    pub fn new(config: SimConfig) -> Self {
        let data = vec![ERASED_VALUE; config.size];
        Self {
            config,
            data,
            status_reg1: 0,
            status_reg2: 0,
            faults: Vec::new(),
            mapped: None,
            opcode_counts: HashMap::new(),
            reinit_count: 0,
            elapsed_us: 0,
        }
    }

    /// Create a flash with the default configuration (W25Q32JV)
    pub fn new_default() -> Self {
        Self::new(SimConfig::default())
    }

    /// Create a flash with pre-filled data
    pub fn with_data(config: SimConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = initial_data.len().min(flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Flash contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Flash contents, mutably
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Add a fault
    pub fn inject(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    /// Remove every fault
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// How many times `opcode` has been executed
    pub fn count(&self, opcode: u8) -> usize {
        self.opcode_counts.get(&opcode).copied().unwrap_or(0)
    }

    /// How many times the controller was reinitialized
    pub fn reinit_count(&self) -> usize {
        self.reinit_count
    }

    /// Returns true while the controller is memory-mapped
    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    /// Configuration passed to the last successful `enter_memory_mapped`
    pub fn mapped_config(&self) -> Option<&MemoryMappedConfig> {
        self.mapped.as_ref()
    }

    /// Returns true if the chip's quad-enable bit is set
    pub fn quad_enabled(&self) -> bool {
        self.status_reg2 & opcodes::SR2_QE != 0 || self.status_reg1 & opcodes::SR1_QE_BIT6 != 0
    }

    /// Microseconds spent in `delay_us`
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    fn has_fault(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }

    fn write_enabled(&self) -> bool {
        self.status_reg1 & opcodes::SR1_WEL != 0
    }

    fn clear_wel(&mut self) {
        self.status_reg1 &= !opcodes::SR1_WEL;
    }

    fn range(&self, addr: usize, len: usize) -> Result<core::ops::Range<usize>> {
        match addr.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(addr..end),
            _ => Err(Error::OutOfBound),
        }
    }

    fn handle_read(&mut self, cmd: &mut QspiCommand<'_>) -> Result<()> {
        if self.has_fault(Fault::ReadFailure) {
            return Err(Error::ReadError);
        }
        if cmd.io_mode.requires_quad() && !self.quad_enabled() {
            log::debug!("quad read {:02X} with QE clear", cmd.opcode);
            return Err(Error::ReadError);
        }
        if !cmd.has_read_data() {
            return Ok(());
        }
        let addr = cmd.address.unwrap_or(0) as usize;
        let range = self.range(addr, cmd.read_buf.len())?;
        cmd.read_buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn handle_page_program(&mut self, cmd: &QspiCommand<'_>) -> Result<()> {
        if !self.write_enabled() {
            return Err(Error::WriteError);
        }

        let addr = cmd.address.unwrap_or(0) as usize;
        let range = self.range(addr, cmd.write_data.len())?;

        // Programming can only change 1 -> 0
        for (cell, &byte) in self.data[range.clone()].iter_mut().zip(cmd.write_data) {
            *cell &= byte;
        }
        for fault in &self.faults {
            if let Fault::CorruptProgram { addr } = *fault {
                let addr = addr as usize;
                if range.contains(&addr) {
                    self.data[addr] ^= 0x01;
                }
            }
        }

        self.clear_wel();
        Ok(())
    }

    fn handle_erase(&mut self, cmd: &QspiCommand<'_>, erase_size: usize) -> Result<()> {
        if !self.write_enabled() {
            return Err(Error::WriteError);
        }

        let addr = cmd.address.unwrap_or(0) as usize;
        let aligned = addr & !(erase_size - 1);
        let range = self.range(aligned, erase_size)?;
        self.data[range].fill(ERASED_VALUE);

        self.clear_wel();
        Ok(())
    }

    fn handle_write_status(&mut self, cmd: &QspiCommand<'_>) {
        if !self.write_enabled() {
            return;
        }
        match cmd.opcode {
            opcodes::WRSR2 => {
                if let Some(&sr2) = cmd.write_data.first() {
                    self.status_reg2 = sr2;
                }
            }
            _ => {
                if let Some(&sr1) = cmd.write_data.first() {
                    self.status_reg1 = sr1 & !(opcodes::SR1_WIP | opcodes::SR1_WEL);
                }
                if let Some(&sr2) = cmd.write_data.get(1) {
                    self.status_reg2 = sr2;
                }
            }
        }
        self.clear_wel();
    }
}

impl QspiBus for SimFlash {
    fn features(&self) -> BusFeatures {
        self.config.features
    }

    fn max_read_len(&self) -> usize {
        self.config.max_read_len
    }

    fn max_write_len(&self) -> usize {
        self.config.page_size
    }

    fn execute(&mut self, cmd: &mut QspiCommand<'_>) -> Result<()> {
        if self.mapped.is_some() {
            return Err(Error::InvalidState);
        }
        check_io_mode_supported(cmd.io_mode, self.config.features)?;
        *self.opcode_counts.entry(cmd.opcode).or_insert(0) += 1;

        match cmd.opcode {
            opcodes::RDID => {
                if cmd.read_buf.len() >= 3 {
                    cmd.read_buf[0] = self.config.manufacturer_id;
                    cmd.read_buf[1] = (self.config.device_id >> 8) as u8;
                    cmd.read_buf[2] = self.config.device_id as u8;
                }
                Ok(())
            }

            opcodes::RDSR => {
                let busy = if self.has_fault(Fault::StuckBusy) {
                    opcodes::SR1_WIP
                } else {
                    0
                };
                if let Some(b) = cmd.read_buf.first_mut() {
                    *b = self.status_reg1 | busy;
                }
                Ok(())
            }
            opcodes::RDSR2 => {
                if let Some(b) = cmd.read_buf.first_mut() {
                    *b = self.status_reg2;
                }
                Ok(())
            }
            opcodes::WRSR | opcodes::WRSR2 => {
                self.handle_write_status(cmd);
                Ok(())
            }

            opcodes::WREN => {
                if !self.has_fault(Fault::IgnoreWriteEnable) {
                    self.status_reg1 |= opcodes::SR1_WEL;
                }
                Ok(())
            }
            opcodes::WRDI => {
                self.clear_wel();
                Ok(())
            }

            opcodes::READ
            | opcodes::FAST_READ
            | opcodes::DOR
            | opcodes::DIOR
            | opcodes::QOR
            | opcodes::QIOR => self.handle_read(cmd),

            opcodes::PP | opcodes::QPP => self.handle_page_program(cmd),

            opcodes::SE_20 => self.handle_erase(cmd, self.config.sector_size),
            opcodes::BE_52 => self.handle_erase(cmd, 32 * 1024),
            opcodes::BE_D8 => self.handle_erase(cmd, 64 * 1024),
            opcodes::CE_60 | opcodes::CE_C7 => {
                if !self.write_enabled() {
                    return Err(Error::WriteError);
                }
                self.data.fill(ERASED_VALUE);
                self.clear_wel();
                Ok(())
            }

            opcodes::RSTEN => Ok(()),
            opcodes::RST => {
                self.clear_wel();
                Ok(())
            }

            _ => Err(Error::Unsupported),
        }
    }

    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += u64::from(us);
    }

    fn enter_memory_mapped(&mut self, config: &MemoryMappedConfig) -> Result<()> {
        if self.mapped.is_some() {
            return Err(Error::InvalidState);
        }
        if !self.config.features.contains(BusFeatures::MEMORY_MAPPED) {
            return Err(Error::Unsupported);
        }
        check_io_mode_supported(config.io_mode, self.config.features)?;
        if config.io_mode.requires_quad() && !self.quad_enabled() {
            return Err(Error::ReadError);
        }
        log::debug!("mapped with opcode {:02X}", config.opcode);
        self.mapped = Some(*config);
        Ok(())
    }

    fn read_mapped(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        if self.mapped.is_none() {
            return Err(Error::InvalidState);
        }
        if self.has_fault(Fault::ReadFailure) {
            return Err(Error::ReadError);
        }
        let range = self.range(offset as usize, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn reinit(&mut self) -> Result<()> {
        self.mapped = None;
        self.clear_wel();
        self.reinit_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qspimon_core::protocol::{self, QuadEnableMethod, ReadMode};
    use qspimon_core::qspi::IoMode;

    #[test]
    fn test_read_jedec_id() {
        let mut flash = SimFlash::new_default();
        let (mfr, dev) = protocol::read_jedec_id(&mut flash).unwrap();
        assert_eq!(mfr, 0xEF);
        assert_eq!(dev, 0x4016);
        assert_eq!(flash.count(opcodes::RDID), 1);
    }

    #[test]
    fn test_program_only_clears_bits() {
        let mut flash = SimFlash::new_default();
        protocol::program_page(&mut flash, 0x100, &[0xF0, 0x0F]).unwrap();
        protocol::program_page(&mut flash, 0x100, &[0x3C, 0x3C]).unwrap();
        assert_eq!(&flash.data()[0x100..0x102], &[0x30, 0x0C]);
    }

    #[test]
    fn test_program_without_wren_is_refused() {
        let mut flash = SimFlash::new_default();
        let data = [0u8; 4];
        let mut cmd = QspiCommand::write_3b(opcodes::PP, 0, &data);
        assert_eq!(flash.execute(&mut cmd), Err(Error::WriteError));
        assert_eq!(flash.data()[0], 0xFF);
    }

    #[test]
    fn test_erase_sector() {
        let mut flash = SimFlash::new_default();
        flash.data_mut()[0x1000..0x3000].fill(0);
        protocol::erase_block(&mut flash, opcodes::SE_20, 0x1234, 0, 10).unwrap();
        assert!(flash.data()[0x1000..0x2000].iter().all(|&b| b == 0xFF));
        assert!(flash.data()[0x2000..0x3000].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_quad_read_needs_qe() {
        let mut flash = SimFlash::new_default();
        let mut buf = [0u8; 4];
        assert_eq!(
            protocol::read(&mut flash, ReadMode::QUAD_IO, 0, &mut buf),
            Err(Error::ReadError)
        );
        protocol::enable_quad_mode(&mut flash, QuadEnableMethod::Sr2Bit1WriteSr2).unwrap();
        assert!(flash.quad_enabled());
        protocol::read(&mut flash, ReadMode::QUAD_IO, 0, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 4]);
    }

    #[test]
    fn test_io_mode_checked_against_features() {
        let config = SimConfig {
            features: BusFeatures::DUAL,
            ..SimConfig::default()
        };
        let mut flash = SimFlash::new(config);
        let mut buf = [0u8; 4];
        let mut cmd = QspiCommand::read_3b(opcodes::QOR, 0, &mut buf).with_io_mode(IoMode::QuadOut);
        assert_eq!(flash.execute(&mut cmd), Err(Error::Unsupported));
    }

    #[test]
    fn test_mapped_refuses_commands() {
        let mut flash = SimFlash::new_default();
        protocol::enable_quad_mode(&mut flash, QuadEnableMethod::Sr2Bit1WriteSr2).unwrap();
        flash.enter_memory_mapped(&MemoryMappedConfig::QUAD_IO).unwrap();
        assert_eq!(protocol::read_status1(&mut flash), Err(Error::InvalidState));

        let mut buf = [0u8; 2];
        flash.read_mapped(0, &mut buf).unwrap();
        flash.reinit().unwrap();
        assert!(!flash.is_mapped());
        assert_eq!(flash.read_mapped(0, &mut buf), Err(Error::InvalidState));
        assert!(protocol::read_status1(&mut flash).is_ok());
    }

    #[test]
    fn test_stuck_busy_times_out() {
        let mut flash = SimFlash::new_default();
        flash.inject(Fault::StuckBusy);
        assert_eq!(protocol::wait_ready(&mut flash, 10, 100), Err(Error::Timeout));
        assert_eq!(flash.elapsed_us(), 100);
    }
}
