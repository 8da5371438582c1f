use super::*;
use bit_field::BitField;
use core::ops::Range;
use hal::blocking::delay::DelayUs;
use log::{debug, error, info, warn};

type PinRes<P> = Result<(), Error<P>>;

/// One 23LC1024 on the shared bus.
///
/// A chip only owns the identity of its select line; the bus is passed to every
/// operation that touches the wires. It is usable once `chip_select()` accepted a
/// line and `initialize()` ran, and stops being usable after `terminate()` or a new
/// `chip_select()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chip {
    config: BusConfig,
    select: Option<u8>,
    initialized: bool,
}

impl Chip {
    /// Create a chip on the given bus with no select line assigned
    pub fn new(config: BusConfig) -> Self {
        Chip {
            config,
            select: None,
            initialized: false,
        }
    }

    /// Assign the chip select line.
    ///
    /// The chip always ends up uninitialized. On rejection it also loses any
    /// previously assigned line, and calling again with another line is fine.
    pub fn chip_select(&mut self, pin: u8) -> Result<(), PinError> {
        self.initialized = false;
        match self.config.check_select(pin) {
            Ok(pin) => {
                self.select = Some(pin);
                info!("chip select pin set to {}", pin);
                Ok(())
            }
            Err(err) => {
                self.select = None;
                error!("rejected chip select pin: {}", err);
                Err(err)
            }
        }
    }

    /// The assigned select line, if any
    pub fn select_pin(&self) -> Option<u8> {
        self.select
    }

    /// Return true once `initialize()` succeeded and until `terminate()`
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Return true if the chip may perform transfers
    pub fn is_usable(&self) -> bool {
        self.select.is_some() && self.initialized
    }

    /// The bus layout this chip was created for
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Configure the bus lines and park the chip deselected.
    ///
    /// Clock and data-out become outputs driven low, data-in an input, and the
    /// select line an output driven high. Calling it again re-applies the same setup.
    pub fn initialize<IO: PinIo, D>(&mut self, bus: &mut Bus<IO, D>) -> PinRes<IO::Error> {
        let pin = match self.select {
            Some(pin) => pin,
            None => {
                error!("cannot initialize: no valid chip select pin");
                return Err(Error::NoSelectPin);
            }
        };
        let cfg = self.config;

        bus.set_mode(cfg.clock, PinMode::Output)?;
        bus.set_mode(cfg.data_out, PinMode::Output)?;
        bus.set_mode(cfg.data_in, PinMode::Input)?;
        bus.set_mode(pin, PinMode::Output)?;

        bus.write(cfg.clock, Level::Low)?;
        bus.write(cfg.data_out, Level::Low)?;
        bus.write(pin, Level::High)?;

        self.initialized = true;
        info!("chip initialized with chip select pin {}", pin);
        Ok(())
    }

    /// Deselect the chip and stop driving the shared lines.
    ///
    /// Clock and data-out are driven low and then turned into inputs so other chips
    /// can take the bus. The select line stays an output, high. On an uninitialized
    /// chip this only logs a warning.
    pub fn terminate<IO: PinIo, D>(&mut self, bus: &mut Bus<IO, D>) -> PinRes<IO::Error> {
        if !self.initialized {
            warn!("attempting to terminate uninitialized chip");
            return Ok(());
        }
        let cfg = self.config;

        if let Some(pin) = self.select {
            bus.write(pin, Level::High)?;
        }
        bus.write(cfg.clock, Level::Low)?;
        bus.write(cfg.data_out, Level::Low)?;
        bus.set_mode(cfg.clock, PinMode::Input)?;
        bus.set_mode(cfg.data_out, PinMode::Input)?;

        self.initialized = false;
        info!("chip on pin {:?} terminated", self.select);
        Ok(())
    }

    /// Run one framed transaction: select, instruction, optional 24-bit address,
    /// `payload`, deselect. The select line is released even if the payload fails.
    fn transaction<IO, D, T, F>(
        &self,
        bus: &mut Bus<IO, D>,
        instruction: Instruction,
        address: Option<u32>,
        payload: F,
    ) -> Result<T, Error<IO::Error>>
    where
        IO: PinIo,
        F: FnOnce(&mut Bus<IO, D>, &BusConfig) -> Result<T, Error<IO::Error>>,
    {
        let pin = match self.select {
            Some(pin) if self.initialized => pin,
            _ => {
                error!("cannot {:?}: chip not properly initialized", instruction);
                return Err(Error::NotInitialized);
            }
        };
        let cfg = self.config;

        bus.write(pin, Level::Low)?;
        let result = Self::send_header(bus, &cfg, instruction, address)
            .and_then(|()| payload(bus, &cfg));
        if let Err(Error::Pin(_)) = result {
            error!("{:?} on pin {} aborted by a line failure", instruction, pin);
        }
        bus.write(pin, Level::High)?;
        result
    }

    fn send_header<IO: PinIo, D>(
        bus: &mut Bus<IO, D>,
        cfg: &BusConfig,
        instruction: Instruction,
        address: Option<u32>,
    ) -> PinRes<IO::Error> {
        bus.shift_out(cfg.data_out, cfg.clock, instruction as u8)?;
        if let Some(address) = address {
            // high, middle, low byte of the 24-bit address field
            let fields: [Range<usize>; 3] = [16..24, 8..16, 0..8];
            for field in fields.iter() {
                bus.shift_out(cfg.data_out, cfg.clock, address.get_bits(field.clone()) as u8)?;
            }
        }
        Ok(())
    }

    /// Write a single byte to an address
    pub fn write_byte<IO: PinIo, D>(
        &self,
        bus: &mut Bus<IO, D>,
        address: u32,
        byte: u8,
    ) -> PinRes<IO::Error> {
        debug!("write {:#04x} at {:#08x}", byte, address);
        self.transaction(bus, Instruction::Write, Some(address), |bus, cfg| {
            bus.shift_out(cfg.data_out, cfg.clock, byte)
        })
    }

    /// Read a single byte from an address
    pub fn read_byte<IO: PinIo, D>(
        &self,
        bus: &mut Bus<IO, D>,
        address: u32,
    ) -> Result<u8, Error<IO::Error>> {
        self.transaction(bus, Instruction::Read, Some(address), |bus, cfg| {
            bus.shift_in(cfg.data_in, cfg.clock)
        })
    }

    /// Read a single byte, returning `READ_SENTINEL` if the read failed
    pub fn read_byte_or_sentinel<IO: PinIo, D>(&self, bus: &mut Bus<IO, D>, address: u32) -> u8 {
        self.read_byte(bus, address).unwrap_or(READ_SENTINEL)
    }

    /// Write N bytes sequentially, starting from an address.
    ///
    /// The chip advances the address itself. An empty slice still sends the
    /// instruction and address.
    pub fn write_sequential<IO: PinIo, D>(
        &self,
        bus: &mut Bus<IO, D>,
        address: u32,
        bytes: &[u8],
    ) -> PinRes<IO::Error> {
        debug!("write {} bytes at {:#08x}", bytes.len(), address);
        self.transaction(bus, Instruction::Write, Some(address), |bus, cfg| {
            for &byte in bytes {
                bus.shift_out(cfg.data_out, cfg.clock, byte)?;
            }
            Ok(())
        })
    }

    /// Read N bytes sequentially into `buf`, starting from an address.
    ///
    /// `buf` is left untouched if the chip is not usable.
    pub fn read_sequential<IO: PinIo, D>(
        &self,
        bus: &mut Bus<IO, D>,
        address: u32,
        buf: &mut [u8],
    ) -> PinRes<IO::Error> {
        self.transaction(bus, Instruction::Read, Some(address), |bus, cfg| {
            for byte in buf.iter_mut() {
                *byte = bus.shift_in(cfg.data_in, cfg.clock)?;
            }
            Ok(())
        })
    }

    /// Return the operating mode stored in the mode register
    pub fn read_mode<IO: PinIo, D>(
        &self,
        bus: &mut Bus<IO, D>,
    ) -> Result<OperatingMode, Error<IO::Error>> {
        let bits = self.transaction(bus, Instruction::ReadMode, None, |bus, cfg| {
            bus.shift_in(cfg.data_in, cfg.clock)
        })?;
        match bits.get_bits(6..8) {
            0b00 => Ok(OperatingMode::Byte),
            0b10 => Ok(OperatingMode::Page),
            0b01 => Ok(OperatingMode::Sequential),
            _ => {
                error!("mode register holds reserved pattern {:#04x}", bits);
                Err(Error::UnknownMode(bits))
            }
        }
    }

    /// Set the operating mode register
    pub fn set_mode<IO: PinIo, D>(
        &self,
        bus: &mut Bus<IO, D>,
        mode: OperatingMode,
    ) -> PinRes<IO::Error> {
        self.transaction(bus, Instruction::WriteMode, None, |bus, cfg| {
            bus.shift_out(cfg.data_out, cfg.clock, mode as u8)
        })
    }

    /// Write `TEST_PATTERN` to `TEST_ADDRESS`, read it back and compare.
    ///
    /// Only a smoke test of the wiring; the rest of the memory is not checked.
    pub fn self_test<IO: PinIo, D: DelayUs<u32>>(
        &self,
        bus: &mut Bus<IO, D>,
    ) -> Result<bool, Error<IO::Error>> {
        info!("testing chip at pin {:?}", self.select);
        self.write_byte(bus, TEST_ADDRESS, TEST_PATTERN)?;
        bus.delay_us(TEST_SETTLE_US);
        let read = self.read_byte(bus, TEST_ADDRESS)?;

        let passed = read == TEST_PATTERN;
        if passed {
            info!("wrote {:#04x}, read {:#04x}: test PASSED", TEST_PATTERN, read);
        } else {
            warn!("wrote {:#04x}, read {:#04x}: test FAILED", TEST_PATTERN, read);
        }
        Ok(passed)
    }
}
