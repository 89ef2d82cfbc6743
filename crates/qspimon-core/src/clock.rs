//! QSPI kernel clock synthesis
//!
//! The QUADSPI kernel clock comes from PLL2's R output, fed by the external
//! crystal. With the board's 8 MHz HSE and a fixed pre-divider of 4 the PLL
//! reference is 2 MHz, and with R = 2 the multiplier equals the requested
//! frequency in MHz.

use crate::error::{Error, Result};

/// External crystal frequency on the board
pub const HSE_HZ: u32 = 8_000_000;

/// Highest kernel clock the QUADSPI block is fed with
pub const MAX_QSPI_KERNEL_HZ: u32 = 250_000_000;

const DIVM: u8 = 4;
const DIVPQR: u8 = 2;
const DIVN_MIN: u32 = 4;
const DIVN_MAX: u32 = 512;

/// PLL2 divider settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PllConfig {
    /// Pre-divider
    pub m: u8,
    /// Multiplier
    pub n: u16,
    /// P output divider
    pub p: u8,
    /// Q output divider
    pub q: u8,
    /// R output divider, drives the QSPI kernel clock
    pub r: u8,
}

impl PllConfig {
    /// Derive dividers that produce `mhz` on the R output
    ///
    /// Fails with [`Error::Unsupported`] when the frequency is zero, above
    /// [`MAX_QSPI_KERNEL_HZ`], or not reachable with an integer multiplier.
    pub fn for_qspi_mhz(hse_hz: u32, mhz: u32) -> Result<Self> {
        let target_hz = u64::from(mhz) * 1_000_000;
        if mhz == 0 || target_hz > u64::from(MAX_QSPI_KERNEL_HZ) {
            return Err(Error::Unsupported);
        }
        let ref_hz = u64::from(hse_hz) / u64::from(DIVM);
        if ref_hz == 0 {
            return Err(Error::Unsupported);
        }
        let vco_hz = target_hz * u64::from(DIVPQR);
        if vco_hz % ref_hz != 0 {
            return Err(Error::Unsupported);
        }
        let n = vco_hz / ref_hz;
        if !(u64::from(DIVN_MIN)..=u64::from(DIVN_MAX)).contains(&n) {
            return Err(Error::Unsupported);
        }
        Ok(Self {
            m: DIVM,
            n: n as u16,
            p: DIVPQR,
            q: DIVPQR,
            r: DIVPQR,
        })
    }

    /// VCO frequency for a given crystal
    pub fn vco_hz(&self, hse_hz: u32) -> u32 {
        (u64::from(hse_hz) / u64::from(self.m) * u64::from(self.n)) as u32
    }

    /// Frequency on the R output for a given crystal
    pub fn r_hz(&self, hse_hz: u32) -> u32 {
        self.vco_hz(hse_hz) / u32::from(self.r)
    }
}

/// Board clock tree
///
/// Implemented by the board support code; the flash engine only asks it to
/// reprogram PLL2 and route it to the QUADSPI kernel clock.
pub trait ClockTree {
    /// Stop PLL2, load new dividers, restart it and wait for lock
    fn configure_qspi_pll(&mut self, pll: &PllConfig) -> Result<()>;
}

impl<T: ClockTree + ?Sized> ClockTree for &mut T {
    fn configure_qspi_pll(&mut self, pll: &PllConfig) -> Result<()> {
        (**self).configure_qspi_pll(pll)
    }
}
