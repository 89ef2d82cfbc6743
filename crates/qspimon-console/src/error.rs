//! Command error types

use crate::peripherals::PeripheralError;
use core::fmt;

/// Why a command did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Wrong number or shape of arguments; the usage text is printed
    Usage,
    /// The argument at `index` is not a valid number
    Parse {
        /// Token index, 0 being the command name
        index: usize,
    },
    /// No table entry has this name
    UnknownCommand,
    /// The line has more tokens than the argument vector holds
    TooManyArgs,
    /// A flash operation failed
    Flash {
        /// Sub-operation that failed
        op: &'static str,
        /// Flash engine error
        error: qspimon_core::Error,
    },
    /// A board peripheral failed
    Peripheral {
        /// Sub-operation that failed
        op: &'static str,
        /// Collaborator error
        error: PeripheralError,
    },
    /// A polling loop was interrupted from the keyboard
    Aborted,
    /// Return this code without printing anything
    Status(i32),
}

impl CommandError {
    /// Return code stored for `$?`
    pub fn code(&self) -> i32 {
        match self {
            Self::Status(code) => *code,
            _ => -1,
        }
    }

    /// Shorthand for mapping flash errors
    pub fn flash(op: &'static str) -> impl Fn(qspimon_core::Error) -> Self {
        move |error| Self::Flash { op, error }
    }

    /// Shorthand for mapping collaborator errors
    pub fn peripheral(op: &'static str) -> impl Fn(PeripheralError) -> Self {
        move |error| Self::Peripheral { op, error }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage => write!(f, "usage error"),
            Self::Parse { index } => write!(f, "cannot decode argument {}", index),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::TooManyArgs => write!(f, "too many arguments"),
            Self::Flash { op, error } => write!(f, "{} failed: {}", op, error),
            Self::Peripheral { op, error } => write!(f, "{} failed: {}", op, error),
            Self::Aborted => write!(f, "aborted"),
            Self::Status(code) => write!(f, "{}", code),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CommandError {}
