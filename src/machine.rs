use std::io::{self, Read};

use thiserror::Error;

use crate::{DISPLAY_HEIGHT, DISPLAY_WIDTH, MAX_ROM_SIZE, MEM_SIZE, PROG_START, STACK_SIZE};

/// The hexadecimal digit sprites every ROM expects to find in low memory,
/// 5 bytes per glyph. ROM compatibility depends on these exact values.
pub(crate) const FONT: [u8; 80] = [
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
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Failure to bring up a machine from ROM bytes.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("ROM is {0} bytes, over the 3584 byte maximum")]
    RomTooLarge(usize),
    #[error("could not read ROM: {0}")]
    RomUnreadable(#[from] io::Error),
}

/// Whether the machine is being stepped. Transitions are host decisions
/// (pause key, window close); no opcode changes this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Running,
    Paused,
    Halted,
}

/// One CHIP-8 machine: memory, registers, stack, timers, framebuffer and
/// keypad. Pure state; the interpreter mutates it, the host owns it.
#[derive(Debug)]
pub struct Machine {
    pub(crate) memory: [u8; MEM_SIZE],
    pub(crate) display: [bool; DISPLAY_WIDTH * DISPLAY_HEIGHT],
    pub(crate) registers: [u8; 16], // V0-VF (VF doubles as the flag register)
    pub(crate) index_register: u16,
    pub(crate) program_counter: u16,
    pub(crate) stack: [u16; STACK_SIZE],
    pub(crate) stack_pointer: usize, // entries in use
    pub(crate) delay_timer: u8,
    pub(crate) sound_timer: u8, // timers count down at 60Hz
    pub(crate) keypad: [bool; 16],
    pub(crate) execution_state: ExecutionState,
}

impl Machine {
    /// Builds a machine with `rom` in memory at 0x200, the font at 0x000,
    /// and everything else zeroed.
    pub fn load(rom: &[u8]) -> Result<Self, LoadError> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(LoadError::RomTooLarge(rom.len()));
        }

        let mut memory = [0; MEM_SIZE];
        memory[..FONT.len()].copy_from_slice(&FONT);
        memory[PROG_START..PROG_START + rom.len()].copy_from_slice(rom);

        Ok(Self {
            memory,
            display: [false; DISPLAY_WIDTH * DISPLAY_HEIGHT],
            registers: [0; 16],
            index_register: 0,
            program_counter: PROG_START as u16, // programs start at 0x200
            stack: [0; STACK_SIZE],
            stack_pointer: 0,
            delay_timer: 0,
            sound_timer: 0,
            keypad: [false; 16],
            execution_state: ExecutionState::Running,
        })
    }

    /// [`Machine::load`] from any byte source, e.g. an open ROM file.
    pub fn load_from(reader: &mut impl Read) -> Result<Self, LoadError> {
        let mut rom = Vec::new();
        reader.read_to_end(&mut rom)?;
        Self::load(&rom)
    }

    /// Records a host key event for keypad key 0x0-0xF.
    pub fn set_key(&mut self, key: u8, pressed: bool) {
        self.keypad[usize::from(key & 0xF)] = pressed;
    }

    pub fn pause(&mut self) {
        if self.execution_state == ExecutionState::Running {
            self.execution_state = ExecutionState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.execution_state == ExecutionState::Paused {
            self.execution_state = ExecutionState::Running;
        }
    }

    /// Ends the session. A halted machine stays halted.
    pub fn halt(&mut self) {
        self.execution_state = ExecutionState::Halted;
    }

    pub fn execution_state(&self) -> ExecutionState {
        self.execution_state
    }

    /// The framebuffer, row-major: `index = y * 64 + x`, `true` = lit.
    pub fn display(&self) -> &[bool] {
        &self.display
    }

    /// Whether the host should currently be emitting a tone.
    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    // read-only views for hosts, debuggers and tests

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.registers
    }

    pub fn index_register(&self) -> u16 {
        self.index_register
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn stack_depth(&self) -> usize {
        self.stack_pointer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_copies_rom_at_0x200() {
        let m = Machine::load(&[0x00, 0xE0, 0xA2, 0x22]).unwrap();
        assert_eq!(&m.memory[0x200..0x204], &[0x00, 0xE0, 0xA2, 0x22]);
        assert_eq!(m.program_counter, 0x200);
        assert_eq!(m.execution_state, ExecutionState::Running);
    }

    #[test]
    fn load_places_font_at_zero() {
        let m = Machine::load(&[]).unwrap();
        assert_eq!(&m.memory[..5], &[0xF0, 0x90, 0x90, 0x90, 0xF0]); // glyph 0
        assert_eq!(&m.memory[75..80], &[0xF0, 0x80, 0xF0, 0x80, 0x80]); // glyph F
    }

    #[test]
    fn load_rejects_oversized_rom() {
        let err = Machine::load(&[0; MAX_ROM_SIZE + 1]).unwrap_err();
        assert!(matches!(err, LoadError::RomTooLarge(3585)));
    }

    #[test]
    fn load_accepts_maximum_rom() {
        let rom: Vec<u8> = (0..MAX_ROM_SIZE).map(|i| i as u8).collect();
        let m = Machine::load(&rom).unwrap();
        assert_eq!(&m.memory[PROG_START..], &rom[..]);
    }

    #[test]
    fn load_from_maps_io_failure() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "gone"))
            }
        }
        let err = Machine::load_from(&mut Broken).unwrap_err();
        assert!(matches!(err, LoadError::RomUnreadable(_)));
    }

    #[test]
    fn set_key_masks_index() {
        let mut m = Machine::load(&[]).unwrap();
        m.set_key(0x13, true); // wraps to key 3
        assert!(m.keypad[0x3]);
        m.set_key(0x3, false);
        assert!(!m.keypad[0x3]);
    }

    #[test]
    fn halt_is_terminal() {
        let mut m = Machine::load(&[]).unwrap();
        m.halt();
        m.resume();
        assert_eq!(m.execution_state, ExecutionState::Halted);
    }
}
