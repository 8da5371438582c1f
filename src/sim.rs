//! Simulated board with 23LC1024 chips hanging off the shared bus.
//!
//! Chips latch the data-out line on rising clock edges and present read data on the
//! data-in line right after the edge, which is what `PinIo::shift_in` samples.

use crate::config::BusConfig;
use crate::io::{Level, PinIo, PinMode};
use crate::Instruction;
use bit_field::BitField;
use std::collections::HashMap;

const LINES: usize = 20;
const ADDRESS_MASK: u32 = 0x1_FFFF;
/// Mode register after power-up: sequential
const POWER_UP_MODE: u8 = 0b0100_0000;

/// Line failure injected by `SimBoard::fail_clock_after` or a broken chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFault;

#[derive(Debug)]
pub struct SimChip {
    pub memory: HashMap<u32, u8>,
    pub mode: u8,
    /// Bytes clocked in during each finished transaction
    pub frames: Vec<Vec<u8>>,
    /// Ignore data writes (simulates a dead chip)
    pub stuck: bool,
    /// Fail clock writes while this chip is selected (simulates a broken line)
    pub broken: bool,
    selected: bool,
    rx: Vec<u8>,
    shift: u8,
    bits: u8,
    address: u32,
    sending: Option<u8>,
}

impl Default for SimChip {
    fn default() -> Self {
        SimChip {
            memory: HashMap::new(),
            mode: POWER_UP_MODE,
            frames: Vec::new(),
            stuck: false,
            broken: false,
            selected: false,
            rx: Vec::new(),
            shift: 0,
            bits: 0,
            address: 0,
            sending: None,
        }
    }
}

impl SimChip {
    fn select(&mut self) {
        self.selected = true;
        self.rx.clear();
        self.shift = 0;
        self.bits = 0;
        self.sending = None;
    }

    fn deselect(&mut self) {
        if self.selected {
            self.frames.push(core::mem::take(&mut self.rx));
        }
        self.selected = false;
        self.sending = None;
    }

    fn load(&self) -> u8 {
        self.memory.get(&self.address).copied().unwrap_or(0)
    }

    /// Handle a rising clock edge; returns the bit driven on the data-in line, if any
    fn rising_edge(&mut self, mosi: bool) -> Option<bool> {
        if let Some(byte) = self.sending {
            let bit = byte.get_bit(7 - self.bits as usize);
            self.bits += 1;
            if self.bits == 8 {
                self.bits = 0;
                if self.rx[0] == Instruction::Read as u8 {
                    self.address = (self.address + 1) & ADDRESS_MASK;
                    self.sending = Some(self.load());
                }
            }
            return Some(bit);
        }

        self.shift = (self.shift << 1) | mosi as u8;
        self.bits += 1;
        if self.bits < 8 {
            return None;
        }
        let byte = self.shift;
        self.shift = 0;
        self.bits = 0;
        self.rx.push(byte);

        let read = Instruction::Read as u8;
        let write = Instruction::Write as u8;
        match (self.rx[0], self.rx.len()) {
            (op, 1) if op == Instruction::ReadMode as u8 => self.sending = Some(self.mode),
            (op, 2) if op == Instruction::WriteMode as u8 => self.mode = byte,
            (op, 4) if op == read || op == write => {
                self.address =
                    u32::from_be_bytes([0, self.rx[1], self.rx[2], self.rx[3]]) & ADDRESS_MASK;
                if op == read {
                    self.sending = Some(self.load());
                }
            }
            (op, n) if op == write && n > 4 => {
                if !self.stuck {
                    self.memory.insert(self.address, byte);
                }
                self.address = (self.address + 1) & ADDRESS_MASK;
            }
            _ => {}
        }
        None
    }
}

#[derive(Debug)]
pub struct SimBoard {
    pub config: BusConfig,
    pub modes: [Option<PinMode>; LINES],
    pub levels: [Level; LINES],
    /// Number of line writes and mode changes seen
    pub ops: usize,
    /// Set when a clock edge arrives with more than one chip selected
    pub contention: bool,
    /// Fail every clock write once this many more have gone through
    pub fail_clock_after: Option<usize>,
    chips: HashMap<u8, SimChip>,
    miso: Level,
}

impl SimBoard {
    /// Board with one chip attached to each of `selects`
    pub fn new(config: BusConfig, selects: &[u8]) -> Self {
        SimBoard {
            config,
            modes: [None; LINES],
            levels: [Level::Low; LINES],
            ops: 0,
            contention: false,
            fail_clock_after: None,
            chips: selects.iter().map(|&pin| (pin, SimChip::default())).collect(),
            miso: Level::High,
        }
    }

    pub fn chip(&self, select: u8) -> &SimChip {
        &self.chips[&select]
    }

    pub fn chip_mut(&mut self, select: u8) -> &mut SimChip {
        self.chips.get_mut(&select).unwrap()
    }

    pub fn peek(&self, select: u8, address: u32) -> u8 {
        self.chip(select)
            .memory
            .get(&(address & ADDRESS_MASK))
            .copied()
            .unwrap_or(0)
    }

    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        self.modes[pin as usize]
    }

    pub fn level(&self, pin: u8) -> Level {
        self.levels[pin as usize]
    }

    fn clock_rising(&mut self) {
        if self.mode(self.config.clock) != Some(PinMode::Output) {
            return;
        }
        let mosi = self.level(self.config.data_out).is_high();
        let mut selected = self.chips.values_mut().filter(|chip| chip.selected);
        let chip = match (selected.next(), selected.next()) {
            (Some(chip), None) => chip,
            (Some(_), Some(_)) => {
                self.contention = true;
                return;
            }
            _ => return,
        };
        if let Some(bit) = chip.rising_edge(mosi) {
            self.miso = bit.into();
        }
    }
}

impl PinIo for SimBoard {
    type Error = LineFault;

    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), LineFault> {
        self.ops += 1;
        self.modes[pin as usize] = Some(mode);
        Ok(())
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<(), LineFault> {
        if pin == self.config.clock {
            match &mut self.fail_clock_after {
                Some(0) => return Err(LineFault),
                Some(left) => *left -= 1,
                None => {}
            }
            if self.chips.values().any(|chip| chip.selected && chip.broken) {
                return Err(LineFault);
            }
        }
        self.ops += 1;
        let previous = self.levels[pin as usize];
        self.levels[pin as usize] = level;

        if let Some(chip) = self.chips.get_mut(&pin) {
            match (previous, level) {
                (Level::High, Level::Low) => chip.select(),
                (Level::Low, Level::High) => {
                    chip.deselect();
                    self.miso = Level::High;
                }
                _ => {}
            }
        }
        if pin == self.config.clock && previous == Level::Low && level == Level::High {
            self.clock_rising();
        }
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<Level, LineFault> {
        if pin == self.config.data_in {
            Ok(self.miso)
        } else {
            Ok(self.levels[pin as usize])
        }
    }
}
