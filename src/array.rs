use super::*;
use core::fmt::Debug;
use hal::blocking::delay::DelayUs;
use heapless::Vec;
use log::{debug, error, info, warn};

/// Fewest chips accepted by `ChipArray::init_with_pins()`
pub const MIN_ARRAY_CHIPS: usize = 2;

/// Most chips an array can hold
pub const MAX_ARRAY_CHIPS: usize = 10;

type ArrayRes<P> = Result<(), Error<P>>;

/// Several chips sharing one bus, addressed by index.
///
/// The array owns the bus and its chips. It is ready only when every chip is
/// usable. Dropping the array terminates all chips that are still initialized.
#[derive(Debug)]
pub struct ChipArray<IO: PinIo, D> {
    bus: Bus<IO, D>,
    config: BusConfig,
    chips: Vec<Chip, MAX_ARRAY_CHIPS>,
    ready: bool,
}

impl<IO: PinIo, D> ChipArray<IO, D> {
    /// Create an empty array on `bus`, whose shared lines are described by `config`
    pub fn new(bus: Bus<IO, D>, config: BusConfig) -> Self {
        ChipArray {
            bus,
            config,
            chips: Vec::new(),
            ready: false,
        }
    }

    /// Set up `count` chips (2 to 10) using the first `count` lines of `pins`.
    ///
    /// Validation happens before anything is replaced, so a refused call keeps the
    /// current chips. Otherwise the current chips are terminated and a new set is
    /// built. Chips that fail stay in the array, which is then not ready.
    pub fn init_with_pins(&mut self, count: usize, pins: &[u8]) -> ArrayRes<IO::Error> {
        if count < MIN_ARRAY_CHIPS || count > MAX_ARRAY_CHIPS {
            error!(
                "invalid number of chips: {}, valid range is {}-{}",
                count, MIN_ARRAY_CHIPS, MAX_ARRAY_CHIPS
            );
            return Err(Error::InvalidChipCount(count));
        }
        if pins.len() < count {
            error!("{} chip select pins supplied for {} chips", pins.len(), count);
            return Err(Error::MissingPins);
        }
        self.populate(&pins[..count])
    }

    /// Set up `count` chips (1 to 10) on consecutive lines starting at `start_pin`.
    ///
    /// Unlike `init_with_pins()`, a single chip is accepted here.
    pub fn init_contiguous(&mut self, count: usize, start_pin: u8) -> ArrayRes<IO::Error> {
        if count < 1 || count > MAX_ARRAY_CHIPS {
            error!(
                "invalid number of chips: {}, valid range is 1-{}",
                count, MAX_ARRAY_CHIPS
            );
            return Err(Error::InvalidChipCount(count));
        }
        let pins: Vec<u8, MAX_ARRAY_CHIPS> = (0..count)
            .map(|offset| start_pin.saturating_add(offset as u8))
            .collect();
        self.populate(&pins)
    }

    fn populate(&mut self, pins: &[u8]) -> ArrayRes<IO::Error> {
        self.release_chips();

        let mut failed = 0;
        for (index, &pin) in pins.iter().enumerate() {
            let mut chip = Chip::new(self.config);
            let outcome = if self.chips.iter().any(|c| c.select_pin() == Some(pin)) {
                error!("chip select pin {} is already used by this array", pin);
                Err(Error::Select(PinError::AlreadyInUse(pin)))
            } else {
                match chip.chip_select(pin) {
                    Ok(()) => chip.initialize(&mut self.bus),
                    Err(err) => Err(err.into()),
                }
            };
            if outcome.is_err() || !chip.is_usable() {
                error!("failed to initialize chip {} on pin {}", index, pin);
                failed += 1;
            }
            if self.chips.push(chip).is_err() {
                return Err(Error::InvalidChipCount(pins.len()));
            }
        }

        self.ready = failed == 0;
        if self.ready {
            info!("initialized array with {} chips", self.chips.len());
            Ok(())
        } else {
            Err(Error::ChipsFailed(failed))
        }
    }

    /// Terminate every initialized chip and forget the collection
    fn release_chips(&mut self) {
        for chip in self.chips.iter_mut().filter(|chip| chip.is_initialized()) {
            if chip.terminate(&mut self.bus).is_err() {
                warn!("could not release chip on pin {:?}", chip.select_pin());
            }
        }
        self.chips.clear();
        self.ready = false;
    }

    /// Terminate all chips and empty the array.
    ///
    /// Only logs a warning if the array is not ready.
    pub fn terminate_array(&mut self) -> ArrayRes<IO::Error> {
        if !self.ready || self.chips.is_empty() {
            warn!("array not initialized or already terminated");
            return Ok(());
        }

        let mut result: ArrayRes<IO::Error> = Ok(());
        for chip in self.chips.iter_mut() {
            if let Err(err) = chip.terminate(&mut self.bus) {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        self.chips.clear();
        self.ready = false;
        info!("array terminated");
        result
    }

    /// Return the chip at `index`, copied out so the bus can be borrowed next to it
    fn checked(&self, index: usize) -> Result<Chip, Error<IO::Error>> {
        if !self.ready {
            error!("array not initialized");
            return Err(Error::ArrayNotReady);
        }
        match self.chips.get(index) {
            Some(chip) => Ok(*chip),
            None => {
                error!(
                    "invalid chip index {}, valid range is 0-{}",
                    index,
                    self.chips.len() - 1
                );
                Err(Error::InvalidIndex {
                    index,
                    count: self.chips.len(),
                })
            }
        }
    }

    /// Write a single byte to an address of chip `index`
    pub fn write_byte(&mut self, index: usize, address: u32, byte: u8) -> ArrayRes<IO::Error> {
        self.checked(index)?.write_byte(&mut self.bus, address, byte)
    }

    /// Read a single byte from an address of chip `index`
    pub fn read_byte(&mut self, index: usize, address: u32) -> Result<u8, Error<IO::Error>> {
        self.checked(index)?.read_byte(&mut self.bus, address)
    }

    /// Read a single byte from chip `index`, returning `READ_SENTINEL` on failure
    pub fn read_byte_or_sentinel(&mut self, index: usize, address: u32) -> u8 {
        self.read_byte(index, address).unwrap_or(READ_SENTINEL)
    }

    /// Write N bytes sequentially to chip `index`
    pub fn write_sequential(
        &mut self,
        index: usize,
        address: u32,
        bytes: &[u8],
    ) -> ArrayRes<IO::Error> {
        self.checked(index)?.write_sequential(&mut self.bus, address, bytes)
    }

    /// Read N bytes sequentially from chip `index`
    pub fn read_sequential(
        &mut self,
        index: usize,
        address: u32,
        buf: &mut [u8],
    ) -> ArrayRes<IO::Error> {
        self.checked(index)?.read_sequential(&mut self.bus, address, buf)
    }

    /// Write the same byte to the same address of every chip, in index order.
    ///
    /// A chip whose write fails is skipped; the others are still written.
    pub fn write_byte_to_all(&mut self, address: u32, byte: u8) -> ArrayRes<IO::Error>
    where
        IO::Error: Debug,
    {
        if !self.ready {
            error!("array not initialized");
            return Err(Error::ArrayNotReady);
        }
        let mut written = 0;
        for (index, chip) in self.chips.iter().enumerate() {
            match chip.write_byte(&mut self.bus, address, byte) {
                Ok(()) => written += 1,
                Err(err) => warn!("chip {} write failed: {:?}", index, err),
            }
        }
        info!(
            "wrote {:#04x} to address {:#08x} on {} of {} chips",
            byte,
            address,
            written,
            self.chips.len()
        );
        Ok(())
    }

    /// Write the same bytes starting at the same address of every chip, in index order.
    ///
    /// A chip whose write fails is skipped; the others are still written.
    pub fn write_sequential_to_all(&mut self, address: u32, bytes: &[u8]) -> ArrayRes<IO::Error>
    where
        IO::Error: Debug,
    {
        if !self.ready {
            error!("array not initialized");
            return Err(Error::ArrayNotReady);
        }
        let mut written = 0;
        for (index, chip) in self.chips.iter().enumerate() {
            match chip.write_sequential(&mut self.bus, address, bytes) {
                Ok(()) => written += 1,
                Err(err) => warn!("chip {} write failed: {:?}", index, err),
            }
        }
        info!(
            "wrote {} bytes starting at address {:#08x} to {} of {} chips",
            bytes.len(),
            address,
            written,
            self.chips.len()
        );
        Ok(())
    }

    /// Number of chips allocated by the last successful validation, ready or not
    pub fn chip_count(&self) -> usize {
        self.chips.len()
    }

    /// Borrow chip `index`; `None` if the array is not ready or the index is out of range
    pub fn chip(&self, index: usize) -> Option<&Chip> {
        if self.ready {
            self.chips.get(index)
        } else {
            None
        }
    }

    /// Return true when every chip is usable
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The bus layout handed to every chip
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Borrow the shared bus
    pub fn bus(&self) -> &Bus<IO, D> {
        &self.bus
    }

    /// Mutably borrow the shared bus
    pub fn bus_mut(&mut self) -> &mut Bus<IO, D> {
        &mut self.bus
    }
}

impl<IO: PinIo, D: DelayUs<u32>> ChipArray<IO, D> {
    /// Run `self_test()` on every chip in index order; true only if all pass
    pub fn test_all_chips(&mut self) -> Result<bool, Error<IO::Error>>
    where
        IO::Error: Debug,
    {
        if !self.ready {
            error!("array not initialized");
            return Err(Error::ArrayNotReady);
        }

        info!("testing all chips in array");
        let mut all_passed = true;
        for (index, chip) in self.chips.iter().enumerate() {
            let passed = match chip.self_test(&mut self.bus) {
                Ok(passed) => passed,
                Err(err) => {
                    warn!("chip {} test aborted: {:?}", index, err);
                    false
                }
            };
            info!(
                "chip {} (pin {:?}): {}",
                index,
                chip.select_pin(),
                if passed { "PASSED" } else { "FAILED" }
            );
            all_passed &= passed;
        }
        info!(
            "array test result: {}",
            if all_passed { "ALL PASSED" } else { "SOME FAILED" }
        );
        Ok(all_passed)
    }
}

impl<IO: PinIo, D> Drop for ChipArray<IO, D> {
    fn drop(&mut self) {
        if self.chips.is_empty() {
            debug!("array dropped with no chips");
            return;
        }
        self.release_chips();
        info!("array cleaned up");
    }
}
