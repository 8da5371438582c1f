use crate::error::PinError;

/// Shared bus lines and the range of usable line numbers.
///
/// The clock and data lines are wired to every chip on the bus. A copy of this
/// value is handed to each `Chip` so it knows which lines it must not claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Clock line, driven by the host
    pub clock: u8,
    /// Data line from the chips to the host (chip SO)
    pub data_in: u8,
    /// Data line from the host to the chips (chip SI)
    pub data_out: u8,
    /// Highest valid digital line number
    pub max_pin: u8,
}

impl Default for BusConfig {
    /// Arduino Uno layout: hardware SPI pins 13/12/11, digital 0-13 plus A0-A5 as 14-19.
    fn default() -> Self {
        BusConfig::new(13, 12, 11)
    }
}

impl BusConfig {
    /// Bus on the given lines, with lines 0-19 available
    pub const fn new(clock: u8, data_in: u8, data_out: u8) -> Self {
        BusConfig {
            clock,
            data_in,
            data_out,
            max_pin: 19,
        }
    }

    /// Change the highest valid line number
    pub const fn with_max_pin(mut self, max_pin: u8) -> Self {
        self.max_pin = max_pin;
        self
    }

    /// Return true if `pin` is one of the shared clock/data lines
    pub fn is_shared(&self, pin: u8) -> bool {
        pin == self.clock || pin == self.data_in || pin == self.data_out
    }

    /// Validate `pin` as a chip select line: range first, then shared-line conflicts
    pub fn check_select(&self, pin: u8) -> Result<u8, PinError> {
        if pin > self.max_pin {
            Err(PinError::OutOfRange(pin))
        } else if self.is_shared(pin) {
            Err(PinError::SharedLine(pin))
        } else {
            Ok(pin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_reference_board() {
        let config = BusConfig::default();
        assert_eq!((config.clock, config.data_in, config.data_out), (13, 12, 11));
        assert_eq!(config.max_pin, 19);
    }

    #[test]
    fn range_is_checked_before_conflicts() {
        let config = BusConfig::new(30, 31, 32);
        assert_eq!(config.check_select(30), Err(PinError::OutOfRange(30)));
        assert_eq!(
            config.with_max_pin(40).check_select(30),
            Err(PinError::SharedLine(30))
        );
    }

    #[test]
    fn select_lines() {
        let config = BusConfig::default();
        for pin in 0..=19 {
            let expected = if config.is_shared(pin) {
                Err(PinError::SharedLine(pin))
            } else {
                Ok(pin)
            };
            assert_eq!(config.check_select(pin), expected);
        }
        assert_eq!(config.check_select(20), Err(PinError::OutOfRange(20)));
        assert_eq!(config.check_select(255), Err(PinError::OutOfRange(255)));
    }
}
