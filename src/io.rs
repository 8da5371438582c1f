use crate::error::Error;
use bit_field::BitField;
use hal::blocking::delay::DelayUs;

/// Logic level of a digital line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Logic 0
    Low,
    /// Logic 1
    High,
}

impl Level {
    /// Return true for `Level::High`
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Direction of a digital line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// High impedance, readable
    Input,
    /// Driven by the host
    Output,
}

/// Numbered digital lines of the host board.
///
/// Implementations wrap the platform's GPIO registers. The shift primitives
/// bit-bang one byte on top of `write`/`read` and can be overridden by platforms
/// with a faster native routine, as long as the bit order and clock phase stay the same.
pub trait PinIo {
    /// Error raised by the platform
    type Error;

    /// Configure the direction of `pin`
    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), Self::Error>;

    /// Drive `pin` to `level`
    fn write(&mut self, pin: u8, level: Level) -> Result<(), Self::Error>;

    /// Sample the level of `pin`
    fn read(&mut self, pin: u8) -> Result<Level, Self::Error>;

    /// Clock `byte` out on `data`, most significant bit first.
    ///
    /// The data line is set up while the clock is low; the chip latches it on the rising edge.
    fn shift_out(&mut self, data: u8, clock: u8, byte: u8) -> Result<(), Self::Error> {
        for bit in (0..8).rev() {
            self.write(data, byte.get_bit(bit).into())?;
            self.write(clock, Level::High)?;
            self.write(clock, Level::Low)?;
        }
        Ok(())
    }

    /// Clock one byte in from `data`, most significant bit first.
    fn shift_in(&mut self, data: u8, clock: u8) -> Result<u8, Self::Error> {
        let mut byte = 0u8;
        for bit in (0..8).rev() {
            self.write(clock, Level::High)?;
            let level = self.read(data)?;
            byte.set_bit(bit, level.is_high());
            self.write(clock, Level::Low)?;
        }
        Ok(byte)
    }
}

impl<T: PinIo + ?Sized> PinIo for &mut T {
    type Error = T::Error;

    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), Self::Error> {
        (**self).set_mode(pin, mode)
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<(), Self::Error> {
        (**self).write(pin, level)
    }

    fn read(&mut self, pin: u8) -> Result<Level, Self::Error> {
        (**self).read(pin)
    }

    fn shift_out(&mut self, data: u8, clock: u8, byte: u8) -> Result<(), Self::Error> {
        (**self).shift_out(data, clock, byte)
    }

    fn shift_in(&mut self, data: u8, clock: u8) -> Result<u8, Self::Error> {
        (**self).shift_in(data, clock)
    }
}

/// The shared clock/data bus: pin driver plus delay source.
///
/// Only one transaction can hold `&mut Bus` at a time, which is what keeps two
/// chips from being selected together.
#[derive(Debug)]
pub struct Bus<IO, D> {
    io: IO,
    delay: D,
}

impl<IO, D> Bus<IO, D> {
    /// Wrap a pin driver and a delay source
    pub fn new(io: IO, delay: D) -> Self {
        Bus { io, delay }
    }

    /// Borrow the pin driver
    pub fn io(&self) -> &IO {
        &self.io
    }

    /// Mutably borrow the pin driver
    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    /// Give back the pin driver and delay source
    pub fn release(self) -> (IO, D) {
        (self.io, self.delay)
    }
}

impl<IO: PinIo, D> Bus<IO, D> {
    pub(crate) fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), Error<IO::Error>> {
        self.io.set_mode(pin, mode).map_err(Error::Pin)
    }

    pub(crate) fn write(&mut self, pin: u8, level: Level) -> Result<(), Error<IO::Error>> {
        self.io.write(pin, level).map_err(Error::Pin)
    }

    pub(crate) fn shift_out(
        &mut self,
        data: u8,
        clock: u8,
        byte: u8,
    ) -> Result<(), Error<IO::Error>> {
        self.io.shift_out(data, clock, byte).map_err(Error::Pin)
    }

    pub(crate) fn shift_in(&mut self, data: u8, clock: u8) -> Result<u8, Error<IO::Error>> {
        self.io.shift_in(data, clock).map_err(Error::Pin)
    }
}

impl<IO, D: DelayUs<u32>> Bus<IO, D> {
    pub(crate) fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}
