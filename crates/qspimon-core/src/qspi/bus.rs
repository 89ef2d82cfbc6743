//! QSPI bus trait definitions

use super::{opcodes, AddressWidth, IoMode, QspiCommand};
use crate::error::Result;
use bitflags::bitflags;

bitflags! {
    /// QSPI controller feature flags
    ///
    /// These flags indicate which line layouts the controller can drive and
    /// whether it has a memory-mapped window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BusFeatures: u32 {
        /// Can read two bits at once (1-1-2 mode)
        const DUAL_IN        = 1 << 0;
        /// Can transfer two bits at once (1-2-2 mode)
        const DUAL_IO        = 1 << 1;
        /// Can read four bits at once (1-1-4 mode)
        const QUAD_IN        = 1 << 2;
        /// Can transfer four bits at once (1-4-4 mode)
        const QUAD_IO        = 1 << 3;
        /// Can map the flash into the CPU address space
        const MEMORY_MAPPED  = 1 << 4;

        /// Shorthand for dual mode (both DUAL_IN and DUAL_IO)
        const DUAL = Self::DUAL_IN.bits() | Self::DUAL_IO.bits();
        /// Shorthand for quad mode (both QUAD_IN and QUAD_IO)
        const QUAD = Self::QUAD_IN.bits() | Self::QUAD_IO.bits();
    }
}

impl Default for BusFeatures {
    fn default() -> Self {
        BusFeatures::empty()
    }
}

/// Read command the controller replays for every access to the mapped window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMappedConfig {
    /// Read instruction, sent on one line
    pub opcode: u8,
    /// Line layout of the address and data phases
    pub io_mode: IoMode,
    /// Address phase width
    pub address_width: AddressWidth,
    /// Alternate byte sent after the address on the address lines
    pub alternate: Option<u8>,
    /// Dummy cycles between alternate byte and data
    pub dummy_cycles: u8,
    /// Cycles of inactivity before the controller releases chip select
    pub timeout_cycles: Option<u16>,
}

impl MemoryMappedConfig {
    /// Continuous 1-4-4 fast read used for execute-in-place
    pub const QUAD_IO: Self = Self {
        opcode: opcodes::QIOR,
        io_mode: IoMode::QuadIo,
        address_width: AddressWidth::ThreeByte,
        alternate: Some(0x01),
        dummy_cycles: 6,
        timeout_cycles: None,
    };
}

/// QSPI controller driving a single serial NOR flash
///
/// Implementations own the peripheral: indirect-mode transactions go through
/// [`execute`](Self::execute); memory-mapped mode is entered with
/// [`enter_memory_mapped`](Self::enter_memory_mapped) and left only through
/// a full [`reinit`](Self::reinit).
///
/// While mapped, implementations must refuse `execute` with
/// [`Error::InvalidState`](crate::Error::InvalidState).
pub trait QspiBus {
    /// Get the features supported by this controller
    fn features(&self) -> BusFeatures;

    /// Get the maximum number of bytes that can be read in a single transaction
    fn max_read_len(&self) -> usize;

    /// Get the maximum number of bytes that can be written in a single transaction
    fn max_write_len(&self) -> usize;

    /// Execute a single indirect-mode command
    ///
    /// The command contains all the information needed for the transaction:
    /// opcode, optional address, line layout, dummy cycles and the data
    /// buffers. A controller that cannot drive `io_mode` returns
    /// [`Error::Unsupported`](crate::Error::Unsupported).
    fn execute(&mut self, cmd: &mut QspiCommand<'_>) -> Result<()>;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);

    /// Switch the controller into memory-mapped mode
    fn enter_memory_mapped(&mut self, config: &MemoryMappedConfig) -> Result<()>;

    /// Copy bytes out of the mapped window
    ///
    /// `offset` is relative to the start of the flash.
    fn read_mapped(&mut self, offset: u32, buf: &mut [u8]) -> Result<()>;

    /// Tear the peripheral down and bring it back up in indirect mode
    fn reinit(&mut self) -> Result<()>;
}

impl<T: QspiBus + ?Sized> QspiBus for &mut T {
    fn features(&self) -> BusFeatures {
        (**self).features()
    }

    fn max_read_len(&self) -> usize {
        (**self).max_read_len()
    }

    fn max_write_len(&self) -> usize {
        (**self).max_write_len()
    }

    fn execute(&mut self, cmd: &mut QspiCommand<'_>) -> Result<()> {
        (**self).execute(cmd)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn enter_memory_mapped(&mut self, config: &MemoryMappedConfig) -> Result<()> {
        (**self).enter_memory_mapped(config)
    }

    fn read_mapped(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read_mapped(offset, buf)
    }

    fn reinit(&mut self) -> Result<()> {
        (**self).reinit()
    }
}
