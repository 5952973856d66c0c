use std::path::Path;

use image::{
    ImageResult,
    Rgb,
    RgbImage,
};
use log::{
    error,
    trace,
    warn,
};
use rand::{
    rngs::StdRng,
    SeedableRng,
};

use crate::{
    constants,
    display::Display,
    mem::{
        AddressStack,
        Ram,
        RamError,
        Register,
        Rom,
    },
    process::{
        self,
        ProcessingError,
    },
};

#[rustfmt::skip]
pub static FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9

    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80  // F
];

pub const PIXEL_ON: Rgb<u8> = Rgb([0, 128, 0]);
pub const PIXEL_OFF: Rgb<u8> = Rgb([0, 0, 0]);

/// Behaviour profile for the handful of opcodes historical interpreters
/// disagree on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Interpreter {
    /// Plain table semantics: shifts act on Vx, load/store leave I alone,
    /// Bnnn jumps relative to V0.
    #[default]
    Chip8,
    /// Shifts copy Vy first; Fx55/Fx65 advance I past the last register.
    CosmacVip,
    /// Bnnn is BxNN and jumps relative to Vx.
    SuperChip,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub interpreter: Interpreter,
    /// Fx1E sets VF when I + Vx leaves the 12-bit address space.
    pub index_overflow_flag: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramCounter(u16);

impl Default for ProgramCounter {
    fn default() -> Self {
        ProgramCounter(constants::MEMORY_OFFSET as u16)
    }
}

impl ProgramCounter {
    pub fn inner(&self) -> u16 {
        self.0
    }

    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(2) & constants::ADDRESS_MASK;
    }

    pub fn jump<T: Into<u16>>(&mut self, address: T) {
        self.0 = address.into() & constants::ADDRESS_MASK;
    }
}

/// Operand fields of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionData {
    pub op_code: u16,
    pub op: u8,
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub kk: u8,
    pub nnn: u16,
}

impl InstructionData {
    pub fn decode(op_code: u16) -> Self {
        Self {
            op_code,
            op: ((op_code & 0xF000) >> 12) as u8,
            x: ((op_code & 0x0F00) >> 8) as u8,
            y: ((op_code & 0x00F0) >> 4) as u8,
            n: (op_code & 0x000F) as u8,
            kk: (op_code & 0x00FF) as u8,
            nnn: op_code & 0x0FFF,
        }
    }
}

/// Key-down state for the 16-key pad, written by the input collaborator.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyPad {
    keys: [bool; constants::KEY_COUNT],
}

impl KeyPad {
    pub fn set_key(&mut self, key: u8, down: bool) {
        self.keys[(key & 0xF) as usize] = down;
    }

    pub fn set_all(&mut self, keys: [bool; constants::KEY_COUNT]) {
        self.keys = keys;
    }

    pub fn release_all(&mut self) {
        self.keys = [false; constants::KEY_COUNT];
    }

    pub fn is_key_pressed(&self, key: u8) -> bool {
        self.keys[(key & 0xF) as usize]
    }

    /// Lowest-numbered key currently down.
    pub fn get_key_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|&down| down).map(|key| key as u8)
    }

    pub fn snapshot(&self) -> [bool; constants::KEY_COUNT] {
        self.keys
    }

    /// Lowest-numbered key that is down now but was not in `held`. Keys
    /// released since are dropped from `held`, so pressing one again counts.
    pub fn fresh_press(&self, held: &mut [bool; constants::KEY_COUNT]) -> Option<u8> {
        for (was_down, &down) in held.iter_mut().zip(self.keys.iter()) {
            *was_down &= down;
        }
        self.keys
            .iter()
            .zip(held.iter())
            .position(|(&down, &was_down)| down && !was_down)
            .map(|key| key as u8)
    }
}

/// What a single call to [`Emulator::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Executed(u16),
    /// Waiting on Fx0A for register `x`; nothing changed.
    AwaitingKey(u8),
    KeyLatched { register: u8, key: u8 },
    /// Ignored; PC still advanced past it.
    UnknownOpcode(u16),
}

pub struct Emulator {
    config: Config,
    memory: Ram,
    pc: ProgramCounter,
    stack: AddressStack,
    register: Register,
    index_register: u16,
    delay_timer: u8,
    sound_timer: u8,
    keypad: KeyPad,
    display: Display,
    awaiting_key: Option<u8>,
    held_at_wait: [bool; constants::KEY_COUNT],
    rng: StdRng,
    cycles: u64,
}

impl Emulator {
    pub fn new(config: Config) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: Config, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: Config, rng: StdRng) -> Self {
        Self {
            config,
            memory: Ram::new(&FONT),
            pc: ProgramCounter::default(),
            stack: AddressStack::default(),
            register: Register::new(),
            index_register: 0,
            delay_timer: 0,
            sound_timer: 0,
            keypad: KeyPad::default(),
            display: Display::default(),
            awaiting_key: None,
            held_at_wait: [false; constants::KEY_COUNT],
            rng,
            cycles: 0,
        }
    }

    pub fn load(&mut self, data: &[u8], base: usize) -> Result<(), RamError> {
        self.memory.load(data, base)
    }

    pub fn load_rom(&mut self, rom: &Rom) -> Result<(), RamError> {
        self.load(rom.data(), constants::MEMORY_OFFSET)
    }

    /// Runs one fetch-decode-execute cycle. On error the machine is left as
    /// it was before the call, with PC on the faulting instruction. Every
    /// successful call counts as one cycle, including idle key-wait steps.
    pub fn step(&mut self) -> Result<Step, ProcessingError> {
        if let Some(x) = self.awaiting_key {
            self.cycles += 1;
            return Ok(match self.keypad.fresh_press(&mut self.held_at_wait) {
                Some(key) => {
                    self.register.set(x, key);
                    self.awaiting_key = None;
                    Step::KeyLatched { register: x, key }
                }
                None => Step::AwaitingKey(x),
            });
        }

        let resume = self.pc;
        let op_code = self.memory.op_code(&self.pc);
        self.pc.increment();

        let instruction_data = InstructionData::decode(op_code);
        match self.execute(&instruction_data) {
            Ok(true) => {
                trace!("{:#05x}: {op_code:04X}", resume.inner());
                self.cycles += 1;
                Ok(Step::Executed(op_code))
            }
            Ok(false) => {
                warn!("unknown opcode {op_code:04X} at {:#05x}, skipped", resume.inner());
                self.cycles += 1;
                Ok(Step::UnknownOpcode(op_code))
            }
            Err(err) => {
                error!("{err} at {:#05x} ({op_code:04X})", resume.inner());
                self.pc = resume;
                Err(err)
            }
        }
    }

    /// Returns false when the opcode matches nothing in the table.
    fn execute(&mut self, instruction: &InstructionData) -> Result<bool, ProcessingError> {
        let InstructionData {
            op, x, y, n, kk, nnn, ..
        } = *instruction;

        match op {
            0x0 => match nnn {
                0x0E0 => process::op_00E0(&mut self.display),
                0x0EE => process::op_00EE(&mut self.pc, &mut self.stack)?,
                _ => return Ok(false),
            },
            0x1 => process::op_1NNN(&mut self.pc, nnn),
            0x2 => process::op_2NNN(&mut self.stack, &mut self.pc, nnn)?,
            0x3 => process::op_3XKK(&self.register, x, kk, &mut self.pc),
            0x4 => process::op_4XKK(&self.register, x, kk, &mut self.pc),
            0x5 if n == 0x0 => process::op_5XY0(&self.register, x, y, &mut self.pc),
            0x6 => process::op_6XKK(&mut self.register, x, kk),
            0x7 => process::op_7XKK(&mut self.register, x, kk),
            0x8 => match n {
                0x0 => process::op_8XY0(&mut self.register, x, y),
                0x1 => process::op_8XY1(&mut self.register, x, y),
                0x2 => process::op_8XY2(&mut self.register, x, y),
                0x3 => process::op_8XY3(&mut self.register, x, y),
                0x4 => process::op_8XY4(&mut self.register, x, y),
                0x5 => process::op_8XY5(&mut self.register, x, y),
                0x6 => process::op_8XY6(&self.config.interpreter, &mut self.register, x, y),
                0x7 => process::op_8XY7(&mut self.register, x, y),
                0xE => process::op_8XYE(&self.config.interpreter, &mut self.register, x, y),
                _ => return Ok(false),
            },
            0x9 if n == 0x0 => process::op_9XY0(&self.register, x, y, &mut self.pc),
            0xA => process::op_ANNN(&mut self.index_register, nnn),
            0xB => process::op_BNNN(&self.config.interpreter, &self.register, &mut self.pc, x, nnn),
            0xC => process::op_CXKK(&mut self.register, &mut self.rng, x, kk),
            0xD => process::op_DXYN(
                &self.memory,
                &mut self.register,
                &mut self.display,
                self.index_register,
                x,
                y,
                n,
            ),
            0xE => match kk {
                0x9E => process::op_EX9E(&self.register, &self.keypad, &mut self.pc, x),
                0xA1 => process::op_EXA1(&self.register, &self.keypad, &mut self.pc, x),
                _ => return Ok(false),
            },
            0xF => match kk {
                0x07 => process::op_FX07(&mut self.register, x, self.delay_timer),
                0x0A => process::op_FX0A(&mut self.awaiting_key, &mut self.held_at_wait, &self.keypad, x),
                0x15 => process::op_FX15(&self.register, x, &mut self.delay_timer),
                0x18 => process::op_FX18(&self.register, x, &mut self.sound_timer),
                0x1E => process::op_FX1E(&self.config, &mut self.register, x, &mut self.index_register),
                0x29 => process::op_FX29(&self.register, &mut self.index_register, x),
                0x33 => process::op_FX33(&self.register, &mut self.memory, x, self.index_register),
                0x55 => process::op_FX55(
                    &self.config.interpreter,
                    &self.register,
                    &mut self.memory,
                    &mut self.index_register,
                    x,
                ),
                0x65 => process::op_FX65(
                    &self.config.interpreter,
                    &mut self.register,
                    &self.memory,
                    &mut self.index_register,
                    x,
                ),
                _ => return Ok(false),
            },
            _ => return Ok(false),
        }

        Ok(true)
    }

    /// One 60 Hz tick of the delay and sound timers.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    pub fn set_key(&mut self, key: u8, down: bool) {
        self.keypad.set_key(key, down);
    }

    pub fn keypad_mut(&mut self) -> &mut KeyPad {
        &mut self.keypad
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pc(&self) -> u16 {
        self.pc.inner()
    }

    pub fn index(&self) -> u16 {
        self.index_register
    }

    pub fn register(&self, x: u8) -> u8 {
        self.register.get(x)
    }

    pub fn registers(&self) -> &[u8] {
        self.register.as_slice()
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack.pointer()
    }

    pub fn stack(&self) -> &[u16] {
        self.stack.frames()
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn awaiting_key(&self) -> Option<u8> {
        self.awaiting_key
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn display_image(&self, pixel_size: u32) -> RgbImage {
        let pixel_size = pixel_size.max(1);
        RgbImage::from_fn(
            constants::DISPLAY_WIDTH as u32 * pixel_size,
            constants::DISPLAY_HEIGHT as u32 * pixel_size,
            |x, y| {
                if self.display.pixel((x / pixel_size) as usize, (y / pixel_size) as usize) {
                    PIXEL_ON
                } else {
                    PIXEL_OFF
                }
            },
        )
    }

    pub fn export_display<P: AsRef<Path>>(&self, path: P, pixel_size: u32) -> ImageResult<()> {
        self.display_image(pixel_size).save(path)
    }
}
