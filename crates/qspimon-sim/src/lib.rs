//! qspimon-sim - Host emulation of the qspimon board
//!
//! Provides a [`SimFlash`] implementing [`QspiBus`](qspimon_core::qspi::QspiBus),
//! a [`SimClock`] recording PLL2 settings and a [`SimBoard`] implementing
//! [`Peripherals`](qspimon_console::Peripherals). Together they run the
//! console and the loader on a development machine and in tests.

mod board;
mod clock;
mod flash;

pub use board::{SimBoard, IDLE_POLL_LIMIT};
pub use clock::SimClock;
pub use flash::{Fault, SimConfig, SimFlash};

use qspimon_console::Shell;
use qspimon_core::flash::{FlashConfig, QspiFlash};

/// Shell wired to simulated hardware
pub type SimShell = Shell<SimFlash, SimClock, SimBoard>;

/// Flash engine on a simulated chip, with the board's default configuration
pub fn flash(sim: SimFlash) -> QspiFlash<SimFlash> {
    QspiFlash::new(sim, FlashConfig::default())
}

/// Shell on a simulated chip and an idle board
pub fn shell(sim: SimFlash) -> SimShell {
    shell_with_board(sim, SimBoard::new())
}

/// Shell on a simulated chip and the given board
pub fn shell_with_board(sim: SimFlash, board: SimBoard) -> SimShell {
    Shell::new(flash(sim), SimClock::new(), board)
}
