#![allow(non_snake_case)]
use rand::Rng;
use thiserror::Error;

use crate::{
    constants,
    display::Display,
    emulator::{
        Config,
        Interpreter,
        KeyPad,
        ProgramCounter,
    },
    mem::{
        AddressStack,
        Ram,
        Register,
        StackEmptyError,
        StackFullError,
    },
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProcessingError {
    #[error("subroutine call overflowed the stack: {source}")]
    StackOverflow {
        #[from]
        source: StackFullError,
    },

    #[error("return with no caller: {source}")]
    StackUnderflow {
        #[from]
        source: StackEmptyError,
    },
}

pub fn op_00E0(display: &mut Display) {
    display.clear();
}

pub fn op_00EE(pc: &mut ProgramCounter, stack: &mut AddressStack) -> Result<(), ProcessingError> {
    pc.jump(stack.pop::<u16>()?);
    Ok(())
}

pub fn op_1NNN(pc: &mut ProgramCounter, nnn: u16) {
    pc.jump(nnn);
}

pub fn op_2NNN(stack: &mut AddressStack, pc: &mut ProgramCounter, nnn: u16) -> Result<(), ProcessingError> {
    stack.push(pc.inner())?;
    pc.jump(nnn);
    Ok(())
}

pub fn op_3XKK(register: &Register, x: u8, kk: u8, pc: &mut ProgramCounter) {
    if register.get(x) == kk {
        pc.increment();
    }
}

pub fn op_4XKK(register: &Register, x: u8, kk: u8, pc: &mut ProgramCounter) {
    if register.get(x) != kk {
        pc.increment();
    }
}

pub fn op_5XY0(register: &Register, x: u8, y: u8, pc: &mut ProgramCounter) {
    if register.cmp_registers(x, y) {
        pc.increment();
    }
}

pub fn op_6XKK(register: &mut Register, x: u8, kk: u8) {
    register.set(x, kk);
}

pub fn op_7XKK(register: &mut Register, x: u8, kk: u8) {
    register.set(x, register.get(x).wrapping_add(kk));
}

pub fn op_8XY0(register: &mut Register, x: u8, y: u8) {
    register.set_x_y(x, y);
}

pub fn op_8XY1(register: &mut Register, x: u8, y: u8) {
    *register.get_mut(x) |= register.get(y);
}

pub fn op_8XY2(register: &mut Register, x: u8, y: u8) {
    *register.get_mut(x) &= register.get(y);
}

pub fn op_8XY3(register: &mut Register, x: u8, y: u8) {
    *register.get_mut(x) ^= register.get(y);
}

pub fn op_8XY4(register: &mut Register, x: u8, y: u8) {
    let (val, overflow) = register.get(x).overflowing_add(register.get(y));
    register.set(x, val);
    register.set_flag(overflow);
}

pub fn op_8XY5(register: &mut Register, x: u8, y: u8) {
    let (val, borrow) = register.get(x).overflowing_sub(register.get(y));
    register.set(x, val);
    register.set_flag(!borrow);
}

pub fn op_8XY6(interpreter: &Interpreter, register: &mut Register, x: u8, y: u8) {
    if let Interpreter::CosmacVip = interpreter {
        register.set_x_y(x, y);
    }
    let lsb = register.get(x) & 1;
    *register.get_mut(x) >>= 1;
    register.set_flag(lsb == 1);
}

pub fn op_8XY7(register: &mut Register, x: u8, y: u8) {
    let (val, borrow) = register.get(y).overflowing_sub(register.get(x));
    register.set(x, val);
    register.set_flag(!borrow);
}

pub fn op_8XYE(interpreter: &Interpreter, register: &mut Register, x: u8, y: u8) {
    if let Interpreter::CosmacVip = interpreter {
        register.set_x_y(x, y);
    }
    let msb = (register.get(x) >> 7) & 1;
    *register.get_mut(x) <<= 1;
    register.set_flag(msb == 1);
}

pub fn op_9XY0(register: &Register, x: u8, y: u8, pc: &mut ProgramCounter) {
    if !register.cmp_registers(x, y) {
        pc.increment();
    }
}

pub fn op_ANNN(index_register: &mut u16, nnn: u16) {
    *index_register = nnn;
}

pub fn op_BNNN(interpreter: &Interpreter, register: &Register, pc: &mut ProgramCounter, x: u8, nnn: u16) {
    match interpreter {
        Interpreter::Chip8 | Interpreter::CosmacVip => {
            pc.jump(nnn + register.get(0x0) as u16);
        }
        Interpreter::SuperChip => {
            pc.jump(nnn + register.get(x) as u16);
        }
    }
}

pub fn op_CXKK<R: Rng>(register: &mut Register, rng: &mut R, x: u8, kk: u8) {
    register.set(x, rng.gen::<u8>() & kk);
}

pub fn op_DXYN(
    memory: &Ram,
    register: &mut Register,
    display: &mut Display,
    index_register: u16,
    x: u8,
    y: u8,
    n: u8,
) {
    let sprite = memory.read_wrapping(index_register, n as usize);
    let collision = display.draw(register.get(x), register.get(y), &sprite);
    register.set_flag(collision);
}

pub fn op_EX9E(register: &Register, keypad: &KeyPad, pc: &mut ProgramCounter, x: u8) {
    if keypad.is_key_pressed(register.get(x)) {
        pc.increment();
    }
}

pub fn op_EXA1(register: &Register, keypad: &KeyPad, pc: &mut ProgramCounter, x: u8) {
    if !keypad.is_key_pressed(register.get(x)) {
        pc.increment();
    }
}

pub fn op_FX07(register: &mut Register, x: u8, delay_timer: u8) {
    register.set(x, delay_timer);
}

/// Parks the machine until a key goes down that was not already down here;
/// `Emulator::step` resolves it.
pub fn op_FX0A(awaiting_key: &mut Option<u8>, held: &mut [bool; constants::KEY_COUNT], keypad: &KeyPad, x: u8) {
    *awaiting_key = Some(x);
    *held = keypad.snapshot();
}

pub fn op_FX15(register: &Register, x: u8, delay_timer: &mut u8) {
    *delay_timer = register.get(x);
}

pub fn op_FX18(register: &Register, x: u8, sound_timer: &mut u8) {
    *sound_timer = register.get(x);
}

pub fn op_FX1E(config: &Config, register: &mut Register, x: u8, index_register: &mut u16) {
    let sum = *index_register as u32 + register.get(x) as u32;
    *index_register = sum as u16;
    if config.index_overflow_flag {
        register.set_flag(sum > constants::ADDRESS_MASK as u32);
    }
}

pub fn op_FX29(register: &Register, index_register: &mut u16, x: u8) {
    let font_char = (register.get(x) & 0xF) as usize;
    *index_register = (constants::FONT_OFFSET + font_char * constants::FONT_GLYPH_SIZE) as u16;
}

pub fn op_FX33(register: &Register, memory: &mut Ram, x: u8, index_register: u16) {
    let mut val = register.get(x);

    for i in (0..3).rev() {
        memory.set(index_register.wrapping_add(i), val % 10);
        val /= 10;
    }
}

pub fn op_FX55(interpreter: &Interpreter, register: &Register, memory: &mut Ram, index_register: &mut u16, x: u8) {
    for i in 0..=x {
        memory.set(index_register.wrapping_add(i as u16), register.get(i));
    }
    if let Interpreter::CosmacVip = interpreter {
        *index_register = index_register.wrapping_add(x as u16 + 1);
    }
}

pub fn op_FX65(interpreter: &Interpreter, register: &mut Register, memory: &Ram, index_register: &mut u16, x: u8) {
    for i in 0..=x {
        register.set(i, memory.get(index_register.wrapping_add(i as u16)));
    }
    if let Interpreter::CosmacVip = interpreter {
        *index_register = index_register.wrapping_add(x as u16 + 1);
    }
}
