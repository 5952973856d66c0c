use std::{
    fs::File,
    io::{
        self,
        Read,
    },
    path::Path,
};

use log::debug;
use thiserror::Error;

use crate::{
    constants,
    emulator::ProgramCounter,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RamError {
    #[error("program too large: {size} bytes > {available} bytes available from base {base:#05x}")]
    ProgramTooLarge { size: usize, available: usize, base: usize },
}

/// The 4KB address space. Every access wraps at 0xFFF; writes into the font
/// region are dropped.
#[derive(Clone)]
pub struct Ram {
    memory: [u8; constants::TOTAL_RAM],
}

impl Ram {
    pub fn new(font: &[u8]) -> Self {
        let mut memory = [0; constants::TOTAL_RAM];
        memory[constants::FONT_OFFSET..constants::FONT_OFFSET + font.len()].copy_from_slice(font);

        Ram { memory }
    }

    pub fn load(&mut self, data: &[u8], base: usize) -> Result<(), RamError> {
        let available = constants::TOTAL_RAM.saturating_sub(base);
        if data.len() > available || base > constants::TOTAL_RAM {
            return Err(RamError::ProgramTooLarge {
                size: data.len(),
                available,
                base,
            });
        }
        self.memory[base..base + data.len()].copy_from_slice(data);

        Ok(())
    }

    pub fn op_code(&self, pc: &ProgramCounter) -> u16 {
        let pc = pc.inner();
        ((self.get(pc) as u16) << 8) | self.get(pc.wrapping_add(1)) as u16
    }

    pub fn get(&self, address: u16) -> u8 {
        self.memory[(address & constants::ADDRESS_MASK) as usize]
    }

    pub fn set(&mut self, address: u16, val: u8) {
        let idx = (address & constants::ADDRESS_MASK) as usize;
        if (constants::FONT_RANGE.0..constants::FONT_RANGE.1).contains(&idx) {
            debug!("dropped write of {val:#04x} to font address {idx:#05x}");
            return;
        }
        self.memory[idx] = val;
    }

    /// Reads `len` bytes starting at `address`, wrapping past 0xFFF.
    pub fn read_wrapping(&self, address: u16, len: usize) -> Vec<u8> {
        (0..len).map(|i| self.get(address.wrapping_add(i as u16))).collect()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.memory
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Register {
    registers: [u8; constants::REGISTER_COUNT],
}

impl Register {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: u8) -> u8 {
        self.registers[(key & 0xF) as usize]
    }

    pub fn get_mut(&mut self, key: u8) -> &mut u8 {
        &mut self.registers[(key & 0xF) as usize]
    }

    pub fn set(&mut self, key: u8, val: u8) {
        *self.get_mut(key) = val;
    }

    /// VF doubles as carry/borrow/collision output. Callers write it after
    /// the result register so the flag survives when x or y is 0xF.
    pub fn set_flag(&mut self, flag: bool) {
        self.set(constants::FLAG_REGISTER, flag as u8);
    }

    pub fn set_x_y(&mut self, x: u8, y: u8) {
        self.set(x, self.get(y));
    }

    pub fn cmp_registers(&self, x: u8, y: u8) -> bool {
        self.get(x) == self.get(y)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.registers
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("stack is full ({} return addresses)", constants::STACK_DEPTH)]
pub struct StackFullError;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("stack is empty")]
pub struct StackEmptyError;

#[derive(Debug, Default, Clone)]
pub struct AddressStack {
    slots: [u16; constants::STACK_DEPTH],
    pointer: usize,
}

impl AddressStack {
    pub fn pop<T: From<u16>>(&mut self) -> Result<T, StackEmptyError> {
        if self.pointer == 0 {
            return Err(StackEmptyError);
        }
        self.pointer -= 1;
        Ok(T::from(self.slots[self.pointer]))
    }

    pub fn push<T: Into<u16>>(&mut self, val: T) -> Result<(), StackFullError> {
        if self.pointer == constants::STACK_DEPTH {
            return Err(StackFullError);
        }
        self.slots[self.pointer] = val.into();
        self.pointer += 1;
        Ok(())
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn frames(&self) -> &[u16] {
        &self.slots[..self.pointer]
    }
}

#[derive(Error, Debug)]
pub enum RomError {
    #[error("loading rom failed {0}")]
    IoError(#[from] io::Error),

    #[error("out of memory {rom_size:?} > {ram_size:?}")]
    OutOfMemory { rom_size: usize, ram_size: usize },
}

/// A program image destined for 0x200.
#[derive(Debug, Clone)]
pub struct Rom {
    data: Vec<u8>,
}

impl Rom {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        let mut file = File::open(path)?;
        let mut data = vec![];

        file.read_to_end(&mut data)?;

        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, RomError> {
        if data.len() > constants::AVAILABLE_RAM {
            Err(RomError::OutOfMemory {
                rom_size: data.len(),
                ram_size: constants::AVAILABLE_RAM,
            })?
        }

        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
