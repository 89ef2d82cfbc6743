//! Board collaborators reached from the console

use core::fmt;

/// A GPIO pin, `PA0` through `PK15`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpioPin {
    port: u8,
    pin: u8,
}

impl GpioPin {
    /// Number of ports, A through K
    pub const PORTS: u8 = 11;
    /// Pins per port
    pub const PINS: u8 = 16;

    /// Build a pin from a port index (0 = A) and pin number
    pub fn new(port: u8, pin: u8) -> Option<Self> {
        (port < Self::PORTS && pin < Self::PINS).then_some(Self { port, pin })
    }

    /// Parse `P<port><pin>`, e.g. `PB7`
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix('P')?;
        let letter = *rest.as_bytes().first()?;
        if !letter.is_ascii_uppercase() {
            return None;
        }
        let digits = &rest[1..];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let pin = digits.parse::<u8>().ok()?;
        Self::new(letter - b'A', pin)
    }

    /// Port index, 0 for port A
    pub fn port(&self) -> u8 {
        self.port
    }

    /// Pin number within the port
    pub fn pin(&self) -> u8 {
        self.pin
    }
}

impl fmt::Display for GpioPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}{}", (b'A' + self.port) as char, self.pin)
    }
}

/// Pin mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpioMode {
    /// Output push pull
    Output,
    /// Input
    Input,
    /// Output open drain
    OutputOpenDrain,
    /// Alternate push pull
    Alternate,
    /// Alternate open drain
    AlternateOpenDrain,
    /// Analog
    Analog,
}

impl GpioMode {
    /// Every mode, in the order the usage text lists them
    pub const ALL: [GpioMode; 6] = [
        GpioMode::Output,
        GpioMode::Input,
        GpioMode::OutputOpenDrain,
        GpioMode::Alternate,
        GpioMode::AlternateOpenDrain,
        GpioMode::Analog,
    ];

    /// Console keyword
    pub fn name(&self) -> &'static str {
        match self {
            GpioMode::Output => "out",
            GpioMode::Input => "in",
            GpioMode::OutputOpenDrain => "outod",
            GpioMode::Alternate => "alt",
            GpioMode::AlternateOpenDrain => "altod",
            GpioMode::Analog => "analog",
        }
    }

    /// Human description
    pub fn description(&self) -> &'static str {
        match self {
            GpioMode::Output => "Output push pull",
            GpioMode::Input => "Input",
            GpioMode::OutputOpenDrain => "Output open drain",
            GpioMode::Alternate => "Alternate push pull",
            GpioMode::AlternateOpenDrain => "Alternate open drain",
            GpioMode::Analog => "Analog",
        }
    }

    /// Look a mode up by console keyword
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

/// Access width for `mrd` and `mwr`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemWidth {
    /// 8-bit access
    #[default]
    Byte,
    /// 16-bit access
    Half,
    /// 32-bit access
    Word,
    /// 64-bit access
    Double,
}

impl MemWidth {
    /// Width for a size in bits; anything but 16, 32 or 64 is a byte access
    pub fn from_bits(bits: i64) -> Self {
        match bits {
            16 => MemWidth::Half,
            32 => MemWidth::Word,
            64 => MemWidth::Double,
            _ => MemWidth::Byte,
        }
    }

    /// Bytes per access
    pub const fn bytes(&self) -> u32 {
        match self {
            MemWidth::Byte => 1,
            MemWidth::Half => 2,
            MemWidth::Word => 4,
            MemWidth::Double => 8,
        }
    }

    /// Mask of the bits an access of this width carries
    pub const fn mask(&self) -> u64 {
        match self {
            MemWidth::Double => u64::MAX,
            other => (1u64 << (other.bytes() * 8)) - 1,
        }
    }
}

/// SD card identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SdCardInfo {
    /// Card type, e.g. "SDHC/SDXC"
    pub card_type: &'static str,
    /// Card version
    pub version: u32,
    /// Command classes supported
    pub class: u32,
    /// Relative card address
    pub relative_address: u32,
    /// Physical block count
    pub block_count: u32,
    /// Physical block size in bytes
    pub block_size: u32,
    /// Logical block count
    pub logical_block_count: u32,
    /// Logical block size in bytes
    pub logical_block_size: u32,
    /// Bus speed class
    pub speed: u32,
}

/// Collaborator failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralError {
    /// No SD card, or it did not answer
    NoCard,
    /// The filesystem could not be mounted or read
    Filesystem,
    /// The peripheral did not answer in time
    Timeout,
    /// Transfer failed
    Io,
}

impl fmt::Display for PeripheralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeripheralError::NoCard => write!(f, "no card"),
            PeripheralError::Filesystem => write!(f, "filesystem error"),
            PeripheralError::Timeout => write!(f, "timeout"),
            PeripheralError::Io => write!(f, "I/O error"),
        }
    }
}

/// Everything on the board the console can poke besides the flash
///
/// All receive and key functions are non-blocking: they return `None` when
/// nothing is pending.
pub trait Peripherals {
    /// Input level of a pin
    fn gpio_read(&mut self, pin: GpioPin) -> bool;
    /// Drive a pin
    fn gpio_write(&mut self, pin: GpioPin, high: bool);
    /// Current mode of a pin
    fn gpio_mode(&mut self, pin: GpioPin) -> GpioMode;
    /// Change the mode of a pin
    fn gpio_set_mode(&mut self, pin: GpioPin, mode: GpioMode);

    /// Byte typed on the console UART, if any
    fn read_key(&mut self) -> Option<u8>;

    /// Initialise the SD card and describe it
    fn sd_info(&mut self) -> Result<SdCardInfo, PeripheralError>;
    /// Mount the card, call `visit` for each root entry, unmount
    fn sd_list(&mut self, visit: &mut dyn FnMut(&str)) -> Result<(), PeripheralError>;

    /// Byte received on USB CDC, if any
    fn usb_recv(&mut self) -> Option<u8>;
    /// Send bytes on USB CDC
    fn usb_send(&mut self, data: &[u8]) -> Result<(), PeripheralError>;

    /// Read an Ethernet PHY register
    fn eth_phy_read(&mut self, reg: u8) -> Result<u32, PeripheralError>;
    /// Write an Ethernet PHY register
    fn eth_phy_write(&mut self, reg: u8, value: u32) -> Result<(), PeripheralError>;
    /// Length of a received frame, if one is pending
    fn eth_rx_ready(&mut self) -> Option<usize>;

    /// Transmit bytes on RS-485, driving DE around the transfer
    fn rs485_send(&mut self, data: &[u8]) -> Result<(), PeripheralError>;
    /// Byte received on RS-485, if any
    fn rs485_recv(&mut self) -> Option<u8>;

    /// Load `width` bytes from the CPU address space
    fn mem_read(&mut self, addr: u32, width: MemWidth) -> Result<u64, PeripheralError>;
    /// Store the low `width` bytes of `value` into the CPU address space
    fn mem_write(&mut self, addr: u32, width: MemWidth, value: u64) -> Result<(), PeripheralError>;

    /// Reset the microcontroller
    fn system_reset(&mut self);
    /// Core clock in Hz
    fn system_clock_hz(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_parse() {
        let pin = GpioPin::parse("PB7").unwrap();
        assert_eq!((pin.port(), pin.pin()), (1, 7));
        assert_eq!(GpioPin::parse("PK15"), GpioPin::new(10, 15));
        assert_eq!(GpioPin::parse("PL0"), None);
        assert_eq!(GpioPin::parse("PA16"), None);
        assert_eq!(GpioPin::parse("PA"), None);
        assert_eq!(GpioPin::parse("pa1"), None);
        assert_eq!(GpioPin::parse("PA-1"), None);
    }

    #[test]
    fn test_mem_width() {
        assert_eq!(MemWidth::from_bits(32), MemWidth::Word);
        assert_eq!(MemWidth::from_bits(8), MemWidth::Byte);
        assert_eq!(MemWidth::from_bits(24), MemWidth::Byte);
        assert_eq!(MemWidth::Half.mask(), 0xFFFF);
        assert_eq!(MemWidth::Double.mask(), u64::MAX);
        assert_eq!(MemWidth::Double.bytes(), 8);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(GpioMode::from_name("altod"), Some(GpioMode::AlternateOpenDrain));
        assert_eq!(GpioMode::from_name("push"), None);
        for mode in GpioMode::ALL {
            assert_eq!(GpioMode::from_name(mode.name()), Some(mode));
        }
    }
}
