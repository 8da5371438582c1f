/*!
This is a platform agnostic Rust driver for the [23LC1024 serial SRAM](https://ww1.microchip.com/downloads/en/DeviceDoc/20005142C.pdf)
driven over a bit-banged three-wire bus, with delays taken from the [`embedded-hal`](https://github.com/rust-embedded/embedded-hal) traits.

Several chips may share the clock, data-in and data-out lines; each one only needs its own
chip select line. The driver allows you to:

- Assign and validate the chip select line of a chip. See: `Chip::chip_select()`.
- Read or write a single byte at a memory address. See: `read_byte()`, `write_byte()`.
- Read or write N bytes starting at a memory address. See: `read_sequential()`, `write_sequential()`.
- Get/Set the operating mode register. See: `read_mode()`, `set_mode()`.
- Run a write/read-back smoke test. See: `self_test()`.
- Manage 1 to 10 chips as one array and write to all of them at once. See: `ChipArray`.

# Wire format

Each transaction pulls the chip select line low, clocks out the instruction and a 24-bit
address (high byte first), then clocks the payload out or in, and releases the select line.
Every byte travels most significant bit first.

# Usage

```ignore
use sram23lc::*;

// `io` implements `PinIo` for the board, `delay` implements `DelayUs<u32>`
let mut bus = Bus::new(io, delay);

let mut chip = Chip::new(BusConfig::default());
chip.chip_select(10)?;
chip.initialize(&mut bus)?;
chip.write_byte(&mut bus, 0x0004, b'a')?;
assert_eq!(chip.read_byte(&mut bus, 0x0004)?, b'a');
chip.terminate(&mut bus)?;

// Four chips on select lines 4, 5, 6 and 7
let mut array = ChipArray::new(bus, BusConfig::default());
array.init_contiguous(4, 4)?;
array.write_byte_to_all(0x0000, 0x42)?;
assert!(array.test_all_chips()?);
```

The bus is borrowed mutably for the length of each transaction, so two chips can never
drive the shared lines at the same time.
*/
#![deny(unsafe_code)]
#![cfg_attr(not(test), no_std)]

extern crate bit_field;
extern crate embedded_hal as hal;

mod array;
mod chip;
mod config;
mod error;
mod io;
#[cfg(test)]
mod sim;

pub use crate::array::{ChipArray, MAX_ARRAY_CHIPS, MIN_ARRAY_CHIPS};
pub use crate::chip::Chip;
pub use crate::config::BusConfig;
pub use crate::error::{Error, PinError};
pub use crate::io::{Bus, Level, PinIo, PinMode};

/// All instructions used by this driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Instruction {
    /// Read data from memory
    Read = 0x03,
    /// Write data to memory
    Write = 0x02,
    /// Read the 8-bit mode register
    ReadMode = 0x05,
    /// Write the 8-bit mode register
    WriteMode = 0x01,
}

/// Modes of operation, stored in bits 7..6 of the mode register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperatingMode {
    /// Read/write operations are limited to one byte
    Byte = 0b00_000000,
    /// Read/write operations wrap within the addressed 32-byte page
    Page = 0b10_000000,
    /// The entire array can be written to and read from (power-up default)
    Sequential = 0b01_000000,
}

/// Value returned by `read_byte_or_sentinel()` when the read could not be performed
pub const READ_SENTINEL: u8 = 0xFF;

/// Byte written and read back by `self_test()`
pub const TEST_PATTERN: u8 = 0b1010_1010;

/// Address used by `self_test()`
pub const TEST_ADDRESS: u32 = 0x00_0000;

/// Settling time between the write and the read of `self_test()`
pub const TEST_SETTLE_US: u32 = 10;

/// Bytes of memory in one chip (17-bit address space). Higher address bits are
/// transmitted but ignored by the chip.
pub const CAPACITY: u32 = 0x2_0000;
