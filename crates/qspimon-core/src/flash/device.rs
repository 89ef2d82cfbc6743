//! The QspiFlash device

use super::FlashConfig;
use crate::chip::{self, ChipFeatures, FlashChip};
use crate::clock::{ClockTree, PllConfig};
use crate::error::{Error, Result};
use crate::protocol::{self, ReadMode};
use crate::qspi::{opcodes, BusFeatures, LineWidth, MemoryMappedConfig, QspiBus};

/// Controller mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashMode {
    /// Indirect mode: every access is an explicit command
    Command,
    /// The flash is mapped into the address space; commands are refused
    MemoryMapped,
}

const VERIFY_CHUNK: usize = 256;
const BLOCK_64K: u32 = 64 * 1024;

/// Serial NOR flash on a QSPI controller
///
/// Starts in [`FlashMode::Command`]. The chip is identified lazily by the
/// first access, which also negotiates the fast-read instruction for the
/// configured line width. [`set_frequency`](Self::set_frequency) and
/// [`reinitialize`](Self::reinitialize) drop that negotiation so the next
/// access redoes it.
///
/// Once [`enter_memory_mapped`](Self::enter_memory_mapped) succeeds only
/// [`read_mapped`](Self::read_mapped) and `reinitialize` are allowed.
#[derive(Debug)]
pub struct QspiFlash<B> {
    bus: B,
    config: FlashConfig,
    chip: Option<&'static FlashChip>,
    mode: FlashMode,
    ready: bool,
    width: LineWidth,
    read_mode: ReadMode,
    bus_hz: u32,
}

impl<B: QspiBus> QspiFlash<B> {
    /// Wrap a bus; nothing is sent until the first access
    pub fn new(bus: B, config: FlashConfig) -> Self {
        Self {
            bus,
            config,
            chip: None,
            mode: FlashMode::Command,
            ready: false,
            width: config.line_width,
            read_mode: ReadMode::SINGLE,
            bus_hz: config.bus_mhz.saturating_mul(1_000_000),
        }
    }

    /// Current controller mode
    pub fn mode(&self) -> FlashMode {
        self.mode
    }

    /// Returns true once the chip has been identified and negotiated
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Returns true if reads use a multi-line instruction
    pub fn fast_read_enabled(&self) -> bool {
        self.read_mode.is_fast()
    }

    /// Line width used at the next negotiation
    pub fn line_width(&self) -> LineWidth {
        self.width
    }

    /// Negotiated read instruction
    pub fn read_mode(&self) -> ReadMode {
        self.read_mode
    }

    /// Bus clock in Hz
    pub fn frequency_hz(&self) -> u32 {
        self.bus_hz
    }

    /// Detected chip, if identified
    pub fn chip(&self) -> Option<&'static FlashChip> {
        self.chip
    }

    /// Address space size, if the chip has been identified
    pub fn size(&self) -> Option<u32> {
        self.chip.map(|c| c.total_size)
    }

    /// Board configuration this device was built with
    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// Borrow the underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutably borrow the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give the bus back
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Identify the chip and negotiate the configured line width
    pub fn initialize(&mut self) -> Result<&'static FlashChip> {
        self.ensure_command_mode()?;
        self.ready = false;
        self.chip = None;
        self.read_mode = ReadMode::SINGLE;

        let chip = self.identify()?;
        self.enable_fast_mode(self.width)?;
        self.ready = true;

        log::info!(
            "{} {} ({} KiB), {}-line reads at {} MHz",
            chip.vendor,
            chip.name,
            chip.total_size / 1024,
            self.read_mode.io_mode.data_lines(),
            self.bus_hz / 1_000_000
        );
        Ok(chip)
    }

    fn identify(&mut self) -> Result<&'static FlashChip> {
        let (manufacturer, device) = protocol::read_jedec_id(&mut self.bus)?;
        log::debug!("JEDEC ID {:02X} {:04X}", manufacturer, device);
        let chip = chip::identify(manufacturer, device).map_err(|e| {
            log::warn!("unknown flash {:02X} {:04X}", manufacturer, device);
            e
        })?;
        protocol::software_reset(&mut self.bus)?;
        self.chip = Some(chip);
        Ok(chip)
    }

    /// Switch reads to `width` data lines
    ///
    /// Sets the chip's quad-enable bit for 4-line reads.
    pub fn enable_fast_mode(&mut self, width: LineWidth) -> Result<()> {
        self.ensure_command_mode()?;
        let chip = match self.chip {
            Some(chip) => chip,
            None => self.identify()?,
        };

        let mode = protocol::select_read_mode(self.bus.features(), chip.features, width)?;
        if mode.io_mode.requires_quad() {
            protocol::enable_quad_mode(&mut self.bus, chip.quad_enable)?;
            if !protocol::is_quad_enabled(&mut self.bus, chip.quad_enable)? {
                log::warn!("QE bit did not stick on {}", chip.name);
                return Err(Error::WriteError);
            }
        }

        log::debug!(
            "read mode {:?} opcode {:02X} dummy {}",
            mode.io_mode,
            mode.opcode,
            mode.dummy_cycles
        );
        self.width = width;
        self.read_mode = mode;
        Ok(())
    }

    /// Reprogram PLL2 for a `mhz` MHz bus clock
    ///
    /// Clears the ready and fast-read state; the next access renegotiates.
    pub fn set_frequency<C: ClockTree + ?Sized>(&mut self, clocks: &mut C, mhz: u32) -> Result<PllConfig> {
        self.ensure_command_mode()?;
        let pll = PllConfig::for_qspi_mhz(self.config.hse_hz, mhz)?;
        clocks.configure_qspi_pll(&pll)?;

        self.bus_hz = pll.r_hz(self.config.hse_hz);
        self.ready = false;
        self.read_mode = ReadMode::SINGLE;
        log::info!("QSPI kernel clock {} Hz (N={})", self.bus_hz, pll.n);
        Ok(pll)
    }

    /// Read `buf.len()` bytes starting at `addr`
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.prepare(addr, buf.len())?;
        log::trace!("read {:#08x} +{}", addr, buf.len());
        protocol::read(&mut self.bus, self.read_mode, addr, buf)
    }

    /// Program `data` at `addr`
    ///
    /// The target must be erased; programming only clears bits.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let chip = self.prepare(addr, data.len())?;
        log::trace!("write {:#08x} +{}", addr, data.len());

        let page_size = chip.page_size as usize;
        let max_write = self.bus.max_write_len().max(1);
        let mut offset = 0usize;
        let mut current_addr = addr;

        while offset < data.len() {
            let page_offset = (current_addr as usize) % page_size;
            let bytes_to_page_end = page_size - page_offset;
            let remaining = data.len() - offset;
            let chunk_size = bytes_to_page_end.min(remaining).min(max_write);

            protocol::program_page(&mut self.bus, current_addr, &data[offset..offset + chunk_size])?;

            offset += chunk_size;
            current_addr += chunk_size as u32;
        }

        Ok(())
    }

    /// Erase every sector touched by `[addr, addr + len)`
    ///
    /// Uses 64 KiB block erase where a whole aligned block is covered.
    pub fn erase(&mut self, addr: u32, len: u32) -> Result<()> {
        let chip = self.prepare(addr, len as usize)?;
        if len == 0 {
            return Ok(());
        }

        let sector = chip.sector_size;
        let mut current = addr - addr % sector;
        let end = (addr + len).div_ceil(sector) * sector;
        log::debug!("erase {:#08x}..{:#08x}", current, end);

        while current < end {
            let use_block = chip.features.contains(ChipFeatures::ERASE_64K)
                && current % BLOCK_64K == 0
                && end - current >= BLOCK_64K;
            if use_block {
                protocol::erase_block(&mut self.bus, opcodes::BE_D8, current, 100_000, 2_000_000)?;
                current += BLOCK_64K;
            } else {
                protocol::erase_block(&mut self.bus, opcodes::SE_20, current, 10_000, 500_000)?;
                current += sector;
            }
        }

        Ok(())
    }

    /// Compare flash contents at `addr` against `expected`
    pub fn verify(&mut self, addr: u32, expected: &[u8]) -> Result<()> {
        self.prepare(addr, expected.len())?;

        let mut buf = [0u8; VERIFY_CHUNK];
        let mut offset = 0usize;
        while offset < expected.len() {
            let len = VERIFY_CHUNK.min(expected.len() - offset);
            let chunk_addr = addr + offset as u32;
            protocol::read(&mut self.bus, self.read_mode, chunk_addr, &mut buf[..len])?;

            let want = &expected[offset..offset + len];
            if let Some(i) = want.iter().zip(&buf[..len]).position(|(w, h)| w != h) {
                return Err(Error::VerifyMismatch {
                    addr: chunk_addr + i as u32,
                    expected: want[i],
                    found: buf[i],
                });
            }
            offset += len;
        }

        Ok(())
    }

    /// Erase, program and read back `data` at `addr`
    ///
    /// Whole sectors are erased, so bytes sharing a sector with the target
    /// range are lost.
    pub fn erase_write_verify(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| Error::OutOfBound)?;
        self.erase(addr, len)?;
        self.write(addr, data)?;
        self.verify(addr, data)
    }

    /// Map the flash into the address space with continuous quad I/O reads
    pub fn enter_memory_mapped(&mut self) -> Result<()> {
        self.ensure_command_mode()?;
        let needed = BusFeatures::MEMORY_MAPPED | BusFeatures::QUAD_IO;
        if !self.bus.features().contains(needed) {
            return Err(Error::Unsupported);
        }

        self.ensure_ready()?;
        if self.read_mode != ReadMode::QUAD_IO {
            self.enable_fast_mode(LineWidth::Quad)?;
        }

        self.bus.enter_memory_mapped(&MemoryMappedConfig::QUAD_IO)?;
        self.mode = FlashMode::MemoryMapped;
        log::info!("flash memory-mapped");
        Ok(())
    }

    /// Read through the memory-mapped window
    pub fn read_mapped(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        if self.mode != FlashMode::MemoryMapped {
            return Err(Error::InvalidState);
        }
        let size = self.size().ok_or(Error::InvalidState)?;
        if !is_valid_range(size, offset, buf.len()) {
            return Err(Error::OutOfBound);
        }
        self.bus.read_mapped(offset, buf)
    }

    /// Tear the controller down and bring it back in command mode
    pub fn reinitialize(&mut self) -> Result<()> {
        self.ready = false;
        self.chip = None;
        self.read_mode = ReadMode::SINGLE;
        self.bus.reinit()?;
        self.mode = FlashMode::Command;
        log::info!("QSPI reinitialized");
        Ok(())
    }

    fn ensure_command_mode(&self) -> Result<()> {
        match self.mode {
            FlashMode::Command => Ok(()),
            FlashMode::MemoryMapped => Err(Error::InvalidState),
        }
    }

    fn ensure_ready(&mut self) -> Result<&'static FlashChip> {
        match self.chip {
            Some(chip) if self.ready => Ok(chip),
            _ => self.initialize(),
        }
    }

    /// Command mode, ready, and `[addr, addr + len)` inside the chip
    fn prepare(&mut self, addr: u32, len: usize) -> Result<&'static FlashChip> {
        self.ensure_command_mode()?;
        let chip = self.ensure_ready()?;
        if !is_valid_range(chip.total_size, addr, len) {
            return Err(Error::OutOfBound);
        }
        Ok(chip)
    }
}

fn is_valid_range(size: u32, addr: u32, len: usize) -> bool {
    (addr as u64).saturating_add(len as u64) <= size as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_check() {
        assert!(is_valid_range(4096, 0, 4096));
        assert!(is_valid_range(4096, 4096, 0));
        assert!(!is_valid_range(4096, 4095, 2));
        assert!(!is_valid_range(4096, u32::MAX, usize::MAX));
    }
}
