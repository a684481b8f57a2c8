use libisa::{Addr, Register, FLAG_REGISTER, KEY_COUNT, REGISTER_COUNT, STACK_DEPTH};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    display::FrameBuffer,
    execute::ExecuteError,
    keypad::Keypad,
    memory::{LoadError, Memory},
};

pub mod display;
pub mod execute;
pub mod keypad;
pub mod memory;

/// The whole machine state. Exclusively owned by whoever drives the cycle;
/// every instruction reads and writes through this one aggregate.
pub struct Emulator {
    pub memory: Memory,
    pub registers: [u8; REGISTER_COUNT],
    pub index: Addr,
    pub pc: Addr,
    pub stack: [Addr; STACK_DEPTH],
    /// Next free stack slot, in `[0, STACK_DEPTH]`. Call and return keep it
    /// in range by failing instead of wrapping.
    pub stack_pointer: usize,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub keypad: Keypad,
    pub framebuffer: FrameBuffer,
    /// The most recently fetched opcode.
    pub opcode: u16,
    rng: StdRng,
}

impl Emulator {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Machine with a fixed random sequence, for reproducible runs and tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            memory: Memory::new(),
            registers: [0; REGISTER_COUNT],
            index: 0,
            pc: libisa::PROGRAM_START,
            stack: [0; STACK_DEPTH],
            stack_pointer: 0,
            delay_timer: 0,
            sound_timer: 0,
            keypad: Keypad::new(),
            framebuffer: FrameBuffer::new(),
            opcode: 0,
            rng,
        }
    }

    /// Copies a raw program image into memory at the program origin. The
    /// image is an opaque byte sequence: no header, no magic number.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.memory.load_program(program)?;
        debug!(
            "loaded {} byte program at {:#05X}",
            program.len(),
            libisa::PROGRAM_START
        );
        Ok(())
    }

    /// Overwrites the keypad snapshot wholesale. The host calls this once per
    /// cycle with the keys currently held; the core never polls devices.
    pub fn set_keys(&mut self, keys: [bool; KEY_COUNT]) {
        self.keypad.set_states(keys);
    }

    pub fn register(&self, index: Register) -> Result<u8, ExecuteError> {
        self.registers
            .get(index)
            .copied()
            .ok_or(ExecuteError::InvalidRegisterIndex(index))
    }

    pub fn register_mut(&mut self, index: Register) -> Result<&mut u8, ExecuteError> {
        self.registers
            .get_mut(index)
            .ok_or(ExecuteError::InvalidRegisterIndex(index))
    }

    fn set_flag(&mut self, flag: bool) {
        self.registers[FLAG_REGISTER] = flag as u8;
    }

    fn random_byte(&mut self) -> u8 {
        self.rng.gen()
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}
