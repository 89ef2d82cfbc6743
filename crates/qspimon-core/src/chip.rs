//! Known serial NOR chips
//!
//! The flash is identified by its JEDEC ID at first use. Only chips listed
//! here are driven; anything else fails with [`Error::NotFound`].

use crate::error::{Error, Result};
use crate::protocol::QuadEnableMethod;
use bitflags::bitflags;

bitflags! {
    /// Capabilities of a flash chip
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChipFeatures: u32 {
        /// Supports the 1-1-2 and 1-2-2 read commands
        const DUAL_IO   = 1 << 0;
        /// Supports the 1-1-4 and 1-4-4 read commands
        const QUAD_IO   = 1 << 1;
        /// Has 32 KiB block erase (0x52)
        const ERASE_32K = 1 << 2;
        /// Has 64 KiB block erase (0xD8)
        const ERASE_64K = 1 << 3;
    }
}

/// Description of a supported chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashChip {
    /// Vendor name
    pub vendor: &'static str,
    /// Part name
    pub name: &'static str,
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID (memory type and capacity bytes)
    pub device_id: u16,
    /// Total size in bytes
    pub total_size: u32,
    /// Page program granularity in bytes
    pub page_size: u32,
    /// Smallest erase unit in bytes
    pub sector_size: u32,
    /// How to set the quad-enable bit
    pub quad_enable: QuadEnableMethod,
    /// Chip capabilities
    pub features: ChipFeatures,
}

const WINBOND: u8 = 0xEF;
const MACRONIX: u8 = 0xC2;
const GIGADEVICE: u8 = 0xC8;
const ISSI: u8 = 0x9D;

const STANDARD: ChipFeatures = ChipFeatures::DUAL_IO
    .union(ChipFeatures::QUAD_IO)
    .union(ChipFeatures::ERASE_32K)
    .union(ChipFeatures::ERASE_64K);

const fn chip(
    vendor: &'static str,
    name: &'static str,
    manufacturer_id: u8,
    device_id: u16,
    total_size: u32,
    quad_enable: QuadEnableMethod,
) -> FlashChip {
    FlashChip {
        vendor,
        name,
        manufacturer_id,
        device_id,
        total_size,
        page_size: 256,
        sector_size: 4096,
        quad_enable,
        features: STANDARD,
    }
}

/// Chips the firmware knows how to drive
pub static CHIPS: &[FlashChip] = &[
    chip("Winbond", "W25Q16JV", WINBOND, 0x4015, 2 << 20, QuadEnableMethod::Sr2Bit1WriteSr2),
    chip("Winbond", "W25Q32JV", WINBOND, 0x4016, 4 << 20, QuadEnableMethod::Sr2Bit1WriteSr2),
    chip("Winbond", "W25Q64JV", WINBOND, 0x4017, 8 << 20, QuadEnableMethod::Sr2Bit1WriteSr2),
    chip("Winbond", "W25Q128JV", WINBOND, 0x4018, 16 << 20, QuadEnableMethod::Sr2Bit1WriteSr2),
    chip("Macronix", "MX25L3233F", MACRONIX, 0x2016, 4 << 20, QuadEnableMethod::Sr1Bit6),
    chip("Macronix", "MX25L6433F", MACRONIX, 0x2017, 8 << 20, QuadEnableMethod::Sr1Bit6),
    chip("GigaDevice", "GD25Q32C", GIGADEVICE, 0x4016, 4 << 20, QuadEnableMethod::Sr2Bit1WriteSr),
    chip("GigaDevice", "GD25Q64C", GIGADEVICE, 0x4017, 8 << 20, QuadEnableMethod::Sr2Bit1WriteSr),
    chip("ISSI", "IS25LP032D", ISSI, 0x6016, 4 << 20, QuadEnableMethod::Sr1Bit6),
];

/// Look up a chip by JEDEC ID
pub fn find_by_jedec_id(manufacturer_id: u8, device_id: u16) -> Option<&'static FlashChip> {
    CHIPS
        .iter()
        .find(|c| c.manufacturer_id == manufacturer_id && c.device_id == device_id)
}

/// Look up a chip by JEDEC ID, treating an idle bus as no chip at all
///
/// A floating or shorted data line reads back as all ones or all zeros.
pub fn identify(manufacturer_id: u8, device_id: u16) -> Result<&'static FlashChip> {
    match (manufacturer_id, device_id) {
        (0x00, 0x0000) | (0xFF, 0xFFFF) => Err(Error::NotFound),
        _ => find_by_jedec_id(manufacturer_id, device_id).ok_or(Error::NotFound),
    }
}
