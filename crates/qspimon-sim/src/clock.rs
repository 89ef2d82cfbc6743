//! Clock tree that records every PLL2 reprogramming

use qspimon_core::clock::{ClockTree, PllConfig};
use qspimon_core::error::{Error, Result};

/// Simulated RCC
#[derive(Debug, Default)]
pub struct SimClock {
    history: Vec<PllConfig>,
    lock_fails: bool,
}

impl SimClock {
    /// A clock tree whose PLL always locks
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent reprogramming fail to lock
    pub fn set_lock_fails(&mut self, fails: bool) {
        self.lock_fails = fails;
    }

    /// Every configuration applied, oldest first
    pub fn history(&self) -> &[PllConfig] {
        &self.history
    }

    /// The configuration currently running
    pub fn last(&self) -> Option<&PllConfig> {
        self.history.last()
    }
}

impl ClockTree for SimClock {
    fn configure_qspi_pll(&mut self, pll: &PllConfig) -> Result<()> {
        if self.lock_fails {
            log::warn!("PLL2 did not lock (N={})", pll.n);
            return Err(Error::Timeout);
        }
        log::debug!("PLL2 M={} N={} R={}", pll.m, pll.n, pll.r);
        self.history.push(*pll);
        Ok(())
    }
}
