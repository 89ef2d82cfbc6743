//! Flash configuration

use crate::clock::HSE_HZ;
use crate::qspi::LineWidth;

/// Static board configuration for the flash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashConfig {
    /// Data lines to negotiate at initialization
    pub line_width: LineWidth,
    /// Crystal feeding PLL2
    pub hse_hz: u32,
    /// Bus frequency set up by the boot code, in MHz
    pub bus_mhz: u32,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            line_width: LineWidth::Quad,
            hse_hz: HSE_HZ,
            bus_mhz: 50,
        }
    }
}
