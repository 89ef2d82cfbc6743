//! QSPI line configurations

use super::BusFeatures;
use crate::error::{Error, Result};

/// Phase layout of a single transaction
///
/// Named after the data phase; the instruction always goes out on one line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IoMode {
    /// 1-1-1: everything on a single line
    #[default]
    Single,
    /// 1-1-2: data phase on 2 lines
    DualOut,
    /// 1-2-2: address and data on 2 lines
    DualIo,
    /// 1-1-4: data phase on 4 lines
    QuadOut,
    /// 1-4-4: address and data on 4 lines
    QuadIo,
}

impl IoMode {
    /// Returns the number of lines used for the address phase
    pub const fn addr_lines(&self) -> u8 {
        match self {
            Self::Single | Self::DualOut | Self::QuadOut => 1,
            Self::DualIo => 2,
            Self::QuadIo => 4,
        }
    }

    /// Returns the number of lines used for the data phase
    pub const fn data_lines(&self) -> u8 {
        match self {
            Self::Single => 1,
            Self::DualOut | Self::DualIo => 2,
            Self::QuadOut | Self::QuadIo => 4,
        }
    }

    /// Returns true if this mode requires the chip's quad-enable bit
    pub const fn requires_quad(&self) -> bool {
        matches!(self, Self::QuadOut | Self::QuadIo)
    }
}

/// Data bus width the flash is configured for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineWidth {
    /// One data line
    Single,
    /// Two data lines
    Dual,
    /// Four data lines
    #[default]
    Quad,
}

impl LineWidth {
    /// Number of data lines
    pub const fn lines(&self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Dual => 2,
            Self::Quad => 4,
        }
    }

    /// Parse a line count (1, 2 or 4)
    pub const fn from_lines(lines: u8) -> Option<Self> {
        match lines {
            1 => Some(Self::Single),
            2 => Some(Self::Dual),
            4 => Some(Self::Quad),
            _ => None,
        }
    }
}

/// Check if a bus supports the requested I/O mode
///
/// Returns `Ok(())` if the mode is supported, or `Err(Unsupported)` if not.
pub fn check_io_mode_supported(mode: IoMode, features: BusFeatures) -> Result<()> {
    let required = match mode {
        IoMode::Single => return Ok(()),
        IoMode::DualOut => BusFeatures::DUAL_IN,
        IoMode::DualIo => BusFeatures::DUAL_IO,
        IoMode::QuadOut => BusFeatures::QUAD_IN,
        IoMode::QuadIo => BusFeatures::QUAD_IO,
    };
    if features.contains(required) {
        Ok(())
    } else {
        Err(Error::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_counts() {
        assert_eq!(IoMode::QuadIo.addr_lines(), 4);
        assert_eq!(IoMode::QuadOut.addr_lines(), 1);
        assert_eq!(IoMode::DualOut.data_lines(), 2);
        assert!(!IoMode::DualIo.requires_quad());
        assert_eq!(LineWidth::from_lines(4), Some(LineWidth::Quad));
        assert_eq!(LineWidth::from_lines(3), None);
    }

    #[test]
    fn test_mode_check_against_features() {
        let dual_only = BusFeatures::DUAL;
        assert!(check_io_mode_supported(IoMode::Single, BusFeatures::empty()).is_ok());
        assert!(check_io_mode_supported(IoMode::DualIo, dual_only).is_ok());
        assert_eq!(
            check_io_mode_supported(IoMode::QuadOut, dual_only),
            Err(Error::Unsupported)
        );
    }
}
