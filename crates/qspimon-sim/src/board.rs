//! Scriptable stand-in for the board peripherals

use std::collections::{HashMap, VecDeque};

use qspimon_console::{GpioMode, GpioPin, MemWidth, PeripheralError, Peripherals, SdCardInfo};

/// Polls of an idle console after which [`SimBoard::read_key`] fakes Ctrl-C
pub const IDLE_POLL_LIMIT: usize = 10_000;

const CTRL_C: u8 = 0x03;

/// Board peripherals backed by queues
///
/// Tests fill the receive queues and inspect the transmit buffers. A queued
/// key is only delivered once every receive queue is empty, so polling loops
/// see all their input before they are interrupted.
#[derive(Debug)]
pub struct SimBoard {
    /// Pin levels and modes; unset pins read low in input mode
    pub pins: HashMap<GpioPin, (bool, GpioMode)>,
    /// Keys typed on the console
    pub keys: VecDeque<u8>,
    /// Bytes waiting on USB CDC
    pub usb_rx: VecDeque<u8>,
    /// Bytes sent on USB CDC
    pub usb_tx: Vec<u8>,
    /// Ethernet PHY registers
    pub phy: [u32; 32],
    /// Lengths of received Ethernet frames
    pub eth_frames: VecDeque<usize>,
    /// Bytes waiting on RS-485
    pub rs485_rx: VecDeque<u8>,
    /// Bytes sent on RS-485
    pub rs485_tx: Vec<u8>,
    /// Inserted SD card, if any
    pub sd: Option<SdCardInfo>,
    /// Root directory of the SD card
    pub sd_files: Vec<String>,
    /// Sparse CPU address space; unwritten bytes read as zero
    pub memory: HashMap<u32, u8>,
    /// Number of `system_reset` calls
    pub resets: usize,
    /// Reported core clock
    pub clock_hz: u32,
    idle_polls: usize,
}

impl Default for SimBoard {
    fn default() -> Self {
        Self {
            pins: HashMap::new(),
            keys: VecDeque::new(),
            usb_rx: VecDeque::new(),
            usb_tx: Vec::new(),
            phy: [0; 32],
            eth_frames: VecDeque::new(),
            rs485_rx: VecDeque::new(),
            rs485_tx: Vec::new(),
            sd: None,
            sd_files: Vec::new(),
            memory: HashMap::new(),
            resets: 0,
            clock_hz: 400_000_000,
            idle_polls: 0,
        }
    }
}

impl SimBoard {
    /// An idle board with no card inserted
    pub fn new() -> Self {
        Self::default()
    }

    /// A board with a 4 GiB SDHC card holding `files`
    pub fn with_sd_card(files: &[&str]) -> Self {
        Self {
            sd: Some(SdCardInfo {
                card_type: "SDHC/SDXC",
                version: 1,
                class: 0x5B5,
                relative_address: 0xAAAA,
                block_count: 7_744_512,
                block_size: 512,
                logical_block_count: 7_744_512,
                logical_block_size: 512,
                speed: 1,
            }),
            sd_files: files.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }

    fn rx_pending(&self) -> bool {
        !self.usb_rx.is_empty() || !self.rs485_rx.is_empty() || !self.eth_frames.is_empty()
    }
}

impl Peripherals for SimBoard {
    fn gpio_read(&mut self, pin: GpioPin) -> bool {
        self.pins.get(&pin).is_some_and(|(level, _)| *level)
    }

    fn gpio_write(&mut self, pin: GpioPin, high: bool) {
        self.pins.entry(pin).or_insert((false, GpioMode::Input)).0 = high;
    }

    fn gpio_mode(&mut self, pin: GpioPin) -> GpioMode {
        self.pins.get(&pin).map_or(GpioMode::Input, |(_, mode)| *mode)
    }

    fn gpio_set_mode(&mut self, pin: GpioPin, mode: GpioMode) {
        self.pins.entry(pin).or_insert((false, GpioMode::Input)).1 = mode;
    }

    fn read_key(&mut self) -> Option<u8> {
        if self.rx_pending() {
            return None;
        }
        if let Some(key) = self.keys.pop_front() {
            self.idle_polls = 0;
            return Some(key);
        }
        self.idle_polls += 1;
        if self.idle_polls >= IDLE_POLL_LIMIT {
            log::debug!("console idle, injecting Ctrl-C");
            self.idle_polls = 0;
            return Some(CTRL_C);
        }
        None
    }

    fn sd_info(&mut self) -> Result<SdCardInfo, PeripheralError> {
        self.sd.ok_or(PeripheralError::NoCard)
    }

    fn sd_list(&mut self, visit: &mut dyn FnMut(&str)) -> Result<(), PeripheralError> {
        if self.sd.is_none() {
            return Err(PeripheralError::NoCard);
        }
        for name in &self.sd_files {
            visit(name);
        }
        Ok(())
    }

    fn usb_recv(&mut self) -> Option<u8> {
        self.usb_rx.pop_front()
    }

    fn usb_send(&mut self, data: &[u8]) -> Result<(), PeripheralError> {
        self.usb_tx.extend_from_slice(data);
        Ok(())
    }

    fn eth_phy_read(&mut self, reg: u8) -> Result<u32, PeripheralError> {
        self.phy.get(reg as usize).copied().ok_or(PeripheralError::Io)
    }

    fn eth_phy_write(&mut self, reg: u8, value: u32) -> Result<(), PeripheralError> {
        let slot = self.phy.get_mut(reg as usize).ok_or(PeripheralError::Io)?;
        *slot = value;
        Ok(())
    }

    fn eth_rx_ready(&mut self) -> Option<usize> {
        self.eth_frames.pop_front()
    }

    fn rs485_send(&mut self, data: &[u8]) -> Result<(), PeripheralError> {
        self.rs485_tx.extend_from_slice(data);
        Ok(())
    }

    fn rs485_recv(&mut self) -> Option<u8> {
        self.rs485_rx.pop_front()
    }

    fn mem_read(&mut self, addr: u32, width: MemWidth) -> Result<u64, PeripheralError> {
        let mut value = 0u64;
        for i in 0..width.bytes() {
            let byte = self.memory.get(&addr.wrapping_add(i)).copied().unwrap_or(0);
            value |= u64::from(byte) << (8 * i);
        }
        Ok(value)
    }

    fn mem_write(&mut self, addr: u32, width: MemWidth, value: u64) -> Result<(), PeripheralError> {
        for i in 0..width.bytes() {
            self.memory.insert(addr.wrapping_add(i), (value >> (8 * i)) as u8);
        }
        Ok(())
    }

    fn system_reset(&mut self) {
        log::info!("system reset requested");
        self.resets += 1;
    }

    fn system_clock_hz(&self) -> u32 {
        self.clock_hz
    }
}
