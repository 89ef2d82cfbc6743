//! JEDEC serial NOR opcodes used by the flash engine

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;
/// Write Disable - clears WEL bit in status register
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register 1
pub const RDSR: u8 = 0x05;
/// Read Status Register 2
pub const RDSR2: u8 = 0x35;
/// Write Status Register 1 (optionally followed by SR2)
pub const WRSR: u8 = 0x01;
/// Write Status Register 2
pub const WRSR2: u8 = 0x31;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer + device ID)
pub const RDID: u8 = 0x9F;

// ============================================================================
// Read commands
// ============================================================================

/// Read Data (single line, no dummy cycles)
pub const READ: u8 = 0x03;
/// Fast Read (single line, 8 dummy cycles)
pub const FAST_READ: u8 = 0x0B;
/// Dual Output Read (1-1-2)
pub const DOR: u8 = 0x3B;
/// Dual I/O Read (1-2-2)
pub const DIOR: u8 = 0xBB;
/// Quad Output Read (1-1-4)
pub const QOR: u8 = 0x6B;
/// Quad I/O Read (1-4-4)
pub const QIOR: u8 = 0xEB;

// ============================================================================
// Program commands
// ============================================================================

/// Page Program (single line)
pub const PP: u8 = 0x02;
/// Quad Page Program (1-1-4)
pub const QPP: u8 = 0x32;

// ============================================================================
// Erase commands
// ============================================================================

/// Sector Erase 4 KiB
pub const SE_20: u8 = 0x20;
/// Block Erase 32 KiB
pub const BE_52: u8 = 0x52;
/// Block Erase 64 KiB
pub const BE_D8: u8 = 0xD8;
/// Chip Erase
pub const CE_60: u8 = 0x60;
/// Chip Erase (alternate)
pub const CE_C7: u8 = 0xC7;

// ============================================================================
// Reset
// ============================================================================

/// Enable Reset
pub const RSTEN: u8 = 0x66;
/// Reset Device
pub const RST: u8 = 0x99;

// ============================================================================
// Status register bits
// ============================================================================

/// SR1: Write In Progress
pub const SR1_WIP: u8 = 0x01;
/// SR1: Write Enable Latch
pub const SR1_WEL: u8 = 0x02;
/// SR1: Quad Enable on Macronix/ISSI parts (bit 6)
pub const SR1_QE_BIT6: u8 = 0x40;
/// SR2: Quad Enable on Winbond/GigaDevice parts (bit 1)
pub const SR2_QE: u8 = 0x02;
