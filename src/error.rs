use core::fmt::{self, Display};

/// Reasons a chip select line is refused.
///
/// Select validation never touches the hardware, so this type is independent of
/// the pin driver's error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    /// The line number is outside the board's digital line range.
    OutOfRange(u8),

    /// The line is one of the shared clock/data lines.
    SharedLine(u8),

    /// Another chip of the same array already uses this line.
    AlreadyInUse(u8),
}

/// The error type used by this library.
///
/// This can encapsulate a pin driver error, and adds its own configuration and
/// state errors on top of that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<P> {
    /// A pin could not be configured, driven or read.
    Pin(P),

    /// The chip select line was refused.
    Select(PinError),

    /// `initialize()` was called before a valid chip select line was assigned.
    NoSelectPin,

    /// The chip has no valid select line or has not been initialized.
    NotInitialized,

    /// The mode register holds the reserved bit pattern.
    UnknownMode(u8),

    /// The number of chips requested for an array is out of range.
    InvalidChipCount(usize),

    /// Fewer chip select lines than chips were supplied.
    MissingPins,

    /// The array has not been (fully) initialized.
    ArrayNotReady,

    /// The chip index is past the end of the array.
    InvalidIndex {
        /// Requested index
        index: usize,
        /// Number of chips in the array
        count: usize,
    },

    /// Array initialization finished, but this many chips are not usable.
    ChipsFailed(usize),
}

impl<P> From<PinError> for Error<P> {
    fn from(err: PinError) -> Self {
        Error::Select(err)
    }
}

impl Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinError::OutOfRange(pin) => write!(f, "pin {} is outside the valid line range", pin),
            PinError::SharedLine(pin) => write!(f, "pin {} is a shared clock/data line", pin),
            PinError::AlreadyInUse(pin) => write!(f, "pin {} already selects another chip", pin),
        }
    }
}

impl<P: Display> Display for Error<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Pin(pin) => write!(f, "pin error: {}", pin),
            Error::Select(err) => write!(f, "invalid chip select: {}", err),
            Error::NoSelectPin => f.write_str("no valid chip select pin assigned"),
            Error::NotInitialized => f.write_str("chip not properly initialized"),
            Error::UnknownMode(bits) => write!(f, "unknown operating mode {:#04x}", bits),
            Error::InvalidChipCount(count) => write!(f, "invalid number of chips: {}", count),
            Error::MissingPins => f.write_str("not enough chip select pins supplied"),
            Error::ArrayNotReady => f.write_str("array not initialized"),
            Error::InvalidIndex { index, count } => write!(
                f,
                "invalid chip index {}, array holds {} chips",
                index, count
            ),
            Error::ChipsFailed(failed) => write!(f, "{} chips failed to initialize", failed),
        }
    }
}
