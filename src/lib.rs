//! Core of a CHIP-8 virtual machine: the memory/register model, the
//! fetch-decode-execute cycle over the full opcode table, the 60 Hz countdown
//! timers, and the XOR sprite blit with edge clipping.
//!
//! The core never opens a window or polls an event queue. The host feeds it
//! key state and timer pulses, drives [`Interpreter::step`] in bursts, and
//! reads back the 64x32 pixel grid plus a sound on/off flag to realise on
//! whatever display and audio backend it likes.

pub mod instruction;
pub mod interpreter;
pub mod machine;

pub use instruction::Instruction;
pub use interpreter::{ExecError, Interpreter};
pub use machine::{ExecutionState, LoadError, Machine};

/// Size of system memory, in bytes.
pub const MEM_SIZE: usize = 4096;
/// Address programs are loaded at; everything below belongs to the machine.
pub const PROG_START: usize = 0x200;
/// The largest ROM that fits between [`PROG_START`] and the top of memory.
pub const MAX_ROM_SIZE: usize = MEM_SIZE - PROG_START;
/// Display width in pixels.
pub const DISPLAY_WIDTH: usize = 64;
/// Display height in pixels.
pub const DISPLAY_HEIGHT: usize = 32;
/// Nesting depth of the subroutine stack, as on the original hardware.
pub const STACK_SIZE: usize = 12;
