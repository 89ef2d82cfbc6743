//! Error types for the host front-end

use qspimon_core::loader::LoadError;
use qspimon_core::ring::RingError;
use std::path::PathBuf;
use thiserror::Error;

/// Host-side failures
#[derive(Debug, Error)]
pub enum AppError {
    /// Reading or writing a file failed
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Flash contents file does not match the simulated chip
    #[error("Flash file {} is {len} bytes, chip holds {capacity}", .path.display())]
    FlashFileSize {
        path: PathBuf,
        len: u64,
        capacity: usize,
    },

    /// A flash operation failed
    #[error("{op} failed: {source}")]
    Flash {
        op: &'static str,
        #[source]
        source: qspimon_core::Error,
    },

    /// The image does not fit behind the start offset
    #[error("Image ({size} bytes at 0x{start:08X}) exceeds flash size ({capacity} bytes)")]
    ImageTooLarge { size: u64, start: u32, capacity: u32 },

    /// Programming stopped
    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    /// Console receive queue could not be set up
    #[error("Console: {0}")]
    Ring(#[from] RingError),

    /// Writing to stdout failed
    #[error("Console output failed: {0}")]
    Output(#[source] std::io::Error),
}

impl AppError {
    /// Shorthand for mapping flash errors
    pub fn flash(op: &'static str) -> impl Fn(qspimon_core::Error) -> Self {
        move |source| AppError::Flash { op, source }
    }

    /// Process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Load(e) => e.exit_code(),
            _ => 1,
        }
    }
}

/// Result type for host operations
pub type Result<T> = std::result::Result<T, AppError>;
