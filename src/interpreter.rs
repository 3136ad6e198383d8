//! Fetch-decode-execute engine. One [`Interpreter::step`] is exactly one
//! instruction; the host calls it in bursts of `ips / 60` per frame and
//! [`tick_timers`] once per frame, so timer cadence stays at 60 Hz no matter
//! how fast instructions run.

use log::trace;
use rand::prelude::*;
use thiserror::Error;

use crate::instruction::Instruction;
use crate::machine::{ExecutionState, Machine};
use crate::{DISPLAY_HEIGHT, DISPLAY_WIDTH, MEM_SIZE};

/// Fatal execution faults. These mean a corrupt or hostile ROM (or an engine
/// bug); the faulting access is refused before it touches memory. Unknown
/// opcodes are deliberately not here, they execute as no-ops.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("subroutine stack overflow")]
    StackOverflow,
    #[error("return with an empty subroutine stack")]
    StackUnderflow,
    #[error("memory access out of range at {0:#06x}")]
    AddressOutOfRange(u16),
}

/// Executes instructions against a [`Machine`]. Owns the RNG for CXNN so the
/// machine itself stays pure state.
pub struct Interpreter {
    rng: ThreadRng,
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// One fetch-decode-execute cycle. Does nothing unless the machine is
    /// Running. The program counter moves past the instruction before it
    /// executes, so a "skip" is a further +2 and FX0A's busy-wait is a -2.
    pub fn step(&mut self, m: &mut Machine) -> Result<(), ExecError> {
        if m.execution_state != ExecutionState::Running {
            return Ok(());
        }

        let pc = usize::from(m.program_counter);
        if pc + 1 >= MEM_SIZE {
            return Err(ExecError::AddressOutOfRange(m.program_counter));
        }
        // two-byte opcodes, high byte first
        let opcode = u16::from_be_bytes([m.memory[pc], m.memory[pc + 1]]);
        m.program_counter += 2;

        trace!("{pc:03X}: {opcode:04X}");

        self.execute(m, Instruction::decode(opcode))
    }

    fn execute(&mut self, m: &mut Machine, instr: Instruction) -> Result<(), ExecError> {
        match instr {
            Instruction::Cls => {
                m.display = [false; DISPLAY_WIDTH * DISPLAY_HEIGHT];
            }
            Instruction::Ret => {
                if m.stack_pointer == 0 {
                    return Err(ExecError::StackUnderflow);
                }
                m.stack_pointer -= 1;
                m.program_counter = m.stack[m.stack_pointer];
            }
            Instruction::Jp { nnn } => {
                m.program_counter = nnn;
            }
            Instruction::Call { nnn } => {
                if m.stack_pointer == m.stack.len() {
                    return Err(ExecError::StackOverflow);
                }
                m.stack[m.stack_pointer] = m.program_counter;
                m.stack_pointer += 1;
                m.program_counter = nnn;
            }
            Instruction::SeByte { x, nn } => {
                if m.registers[usize::from(x)] == nn {
                    m.program_counter += 2;
                }
            }
            Instruction::SneByte { x, nn } => {
                if m.registers[usize::from(x)] != nn {
                    m.program_counter += 2;
                }
            }
            Instruction::SeReg { x, y } => {
                if m.registers[usize::from(x)] == m.registers[usize::from(y)] {
                    m.program_counter += 2;
                }
            }
            Instruction::LdByte { x, nn } => {
                m.registers[usize::from(x)] = nn;
            }
            Instruction::AddByte { x, nn } => {
                // no carry flag for the immediate add
                let x = usize::from(x);
                m.registers[x] = m.registers[x].wrapping_add(nn);
            }
            Instruction::LdReg { x, y } => {
                m.registers[usize::from(x)] = m.registers[usize::from(y)];
            }
            Instruction::Or { x, y } => {
                m.registers[usize::from(x)] |= m.registers[usize::from(y)];
            }
            Instruction::And { x, y } => {
                m.registers[usize::from(x)] &= m.registers[usize::from(y)];
            }
            Instruction::Xor { x, y } => {
                m.registers[usize::from(x)] ^= m.registers[usize::from(y)];
            }
            Instruction::AddReg { x, y } => {
                // VF is written last so it wins when X or Y is VF
                let x = usize::from(x);
                let (sum, carry) = m.registers[x].overflowing_add(m.registers[usize::from(y)]);
                m.registers[x] = sum;
                m.registers[0xF] = carry.into();
            }
            Instruction::Sub { x, y } => {
                // VF = 1 on no borrow
                let x = usize::from(x);
                let vy = m.registers[usize::from(y)];
                let no_borrow = m.registers[x] >= vy;
                m.registers[x] = m.registers[x].wrapping_sub(vy);
                m.registers[0xF] = no_borrow.into();
            }
            Instruction::Shr { x } => {
                let x = usize::from(x);
                let low_bit = m.registers[x] & 0x1;
                m.registers[x] >>= 1;
                m.registers[0xF] = low_bit;
            }
            Instruction::Subn { x, y } => {
                let x = usize::from(x);
                let vy = m.registers[usize::from(y)];
                let no_borrow = vy >= m.registers[x];
                m.registers[x] = vy.wrapping_sub(m.registers[x]);
                m.registers[0xF] = no_borrow.into();
            }
            Instruction::Shl { x } => {
                let x = usize::from(x);
                let high_bit = m.registers[x] >> 7;
                m.registers[x] <<= 1;
                m.registers[0xF] = high_bit;
            }
            Instruction::SneReg { x, y } => {
                if m.registers[usize::from(x)] != m.registers[usize::from(y)] {
                    m.program_counter += 2;
                }
            }
            Instruction::LdI { nnn } => {
                m.index_register = nnn;
            }
            Instruction::JpV0 { nnn } => {
                m.program_counter = nnn + u16::from(m.registers[0]);
            }
            Instruction::Rnd { x, nn } => {
                m.registers[usize::from(x)] = self.rng.gen::<u8>() & nn;
            }
            Instruction::Drw { x, y, n } => {
                draw_sprite(m, x, y, n);
            }
            Instruction::Skp { x } => {
                if m.keypad[usize::from(m.registers[usize::from(x)] & 0xF)] {
                    m.program_counter += 2;
                }
            }
            Instruction::Sknp { x } => {
                if !m.keypad[usize::from(m.registers[usize::from(x)] & 0xF)] {
                    m.program_counter += 2;
                }
            }
            Instruction::LdDelay { x } => {
                m.registers[usize::from(x)] = m.delay_timer;
            }
            Instruction::WaitKey { x } => {
                // Non-blocking: rewind and re-run this instruction until a
                // key is down. The scan stops short of key F, as historical
                // interpreters did; kept for compatibility.
                match (0u8..0xF).find(|&key| m.keypad[usize::from(key)]) {
                    Some(key) => m.registers[usize::from(x)] = key,
                    None => m.program_counter -= 2,
                }
            }
            Instruction::SetDelay { x } => {
                m.delay_timer = m.registers[usize::from(x)];
            }
            Instruction::SetSound { x } => {
                m.sound_timer = m.registers[usize::from(x)];
            }
            Instruction::AddI { x } => {
                // wraps mod 4096, no overflow flag
                m.index_register =
                    (m.index_register + u16::from(m.registers[usize::from(x)])) % MEM_SIZE as u16;
            }
            Instruction::LdFont { x } => {
                // font glyphs are 5 bytes each, starting at 0x000
                m.index_register = u16::from(m.registers[usize::from(x)]) * 5;
            }
            Instruction::Bcd { x } => {
                let at = checked_range(m.index_register, 3)?;
                let vx = m.registers[usize::from(x)];
                m.memory[at] = vx / 100;
                m.memory[at + 1] = (vx / 10) % 10;
                m.memory[at + 2] = vx % 10;
            }
            Instruction::Store { x } => {
                // I itself is unchanged
                let at = checked_range(m.index_register, usize::from(x) + 1)?;
                for offset in 0..=usize::from(x) {
                    m.memory[at + offset] = m.registers[offset];
                }
            }
            Instruction::Load { x } => {
                let at = checked_range(m.index_register, usize::from(x) + 1)?;
                for offset in 0..=usize::from(x) {
                    m.registers[offset] = m.memory[at + offset];
                }
            }
            Instruction::Unknown(_) => {}
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Refuses a register-derived memory range before anything touches it.
fn checked_range(index: u16, len: usize) -> Result<usize, ExecError> {
    let at = usize::from(index);
    if at + len > MEM_SIZE {
        return Err(ExecError::AddressOutOfRange((at + len - 1) as u16));
    }
    Ok(at)
}

/// DXYN. The start position wraps; the drawing itself clips at the screen
/// edge and never wraps around. VF accumulates collisions (lit pixels going
/// dark) across the whole sprite.
fn draw_sprite(m: &mut Machine, x: u8, y: u8, n: u8) {
    let x0 = usize::from(m.registers[usize::from(x)]) % DISPLAY_WIDTH;
    let y0 = usize::from(m.registers[usize::from(y)]) % DISPLAY_HEIGHT;

    m.registers[0xF] = 0;
    for row in 0..usize::from(n) {
        let py = y0 + row;
        if py >= DISPLAY_HEIGHT {
            break;
        }
        let sprite = m.memory[(usize::from(m.index_register) + row) % MEM_SIZE];
        for col in 0..8 {
            let px = x0 + col;
            if px >= DISPLAY_WIDTH {
                break;
            }
            if sprite & (0x80 >> col) == 0 {
                continue;
            }
            let cell = &mut m.display[py * DISPLAY_WIDTH + px];
            if *cell {
                m.registers[0xF] = 1;
            }
            *cell = !*cell;
        }
    }
}

/// Decrements both timers toward zero; returns whether the host should be
/// emitting sound, judged before this tick's decrement. Call at 60 Hz,
/// independent of how many instructions ran in between.
pub fn tick_timers(m: &mut Machine) -> bool {
    let sound_active = m.sound_timer > 0;
    if m.delay_timer > 0 {
        m.delay_timer -= 1;
    }
    if m.sound_timer > 0 {
        m.sound_timer -= 1;
    }
    sound_active
}
