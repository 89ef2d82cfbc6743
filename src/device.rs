//! Simulated board set up from the command line

use crate::cli::FlashArgs;
use crate::error::{AppError, Result};
use qspimon_core::flash::QspiFlash;
use qspimon_sim::{SimClock, SimConfig, SimFlash};
use std::fs;
use std::path::Path;

/// Build the flash engine and clock tree, applying `--flash-file` and `--freq`
pub fn open(args: &FlashArgs) -> Result<(QspiFlash<SimFlash>, SimClock)> {
    let config = SimConfig::default();
    let sim = match &args.flash_file {
        Some(path) if path.exists() => load(path, config)?,
        Some(path) => {
            log::info!("{} does not exist, starting erased", path.display());
            SimFlash::new(config)
        }
        None => SimFlash::new(config),
    };

    let mut flash = qspimon_sim::flash(sim);
    let mut clocks = SimClock::new();
    if let Some(mhz) = args.freq {
        let pll = flash
            .set_frequency(&mut clocks, mhz)
            .map_err(AppError::flash("set frequency"))?;
        log::debug!("PLL2 N={} for {} MHz", pll.n, mhz);
    }
    Ok((flash, clocks))
}

fn load(path: &Path, config: SimConfig) -> Result<SimFlash> {
    let data = fs::read(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if data.len() > config.size {
        return Err(AppError::FlashFileSize {
            path: path.to_path_buf(),
            len: data.len() as u64,
            capacity: config.size,
        });
    }
    log::info!("Loaded {} bytes of flash contents from {}", data.len(), path.display());
    Ok(SimFlash::with_data(config, &data))
}

/// Write the flash contents back to `--flash-file`, if one was given
pub fn save(args: &FlashArgs, sim: &SimFlash) -> Result<()> {
    let Some(path) = &args.flash_file else {
        return Ok(());
    };
    fs::write(path, sim.data()).map_err(|source| AppError::Io {
        path: path.clone(),
        source,
    })?;
    log::debug!("Saved flash contents to {}", path.display());
    Ok(())
}
