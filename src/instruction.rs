//! Opcode decoding. Every instruction is a big-endian 16-bit word carrying
//! up to five fields: NNN (low 12 bits), NN (low 8), N (low 4), X (bits
//! 8-11) and Y (bits 4-7). Decoding is pure and happens on every fetch.

/// One decoded instruction. Anything the dispatch tables don't recognise
/// becomes [`Instruction::Unknown`], which executes as a no-op; ROMs carry
/// data bytes that are never meant to run as code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0: clear the display
    Cls,
    /// 00EE: return from subroutine
    Ret,
    /// 1NNN: jump to NNN
    Jp { nnn: u16 },
    /// 2NNN: call subroutine at NNN
    Call { nnn: u16 },
    /// 3XNN: skip next if VX == NN
    SeByte { x: u8, nn: u8 },
    /// 4XNN: skip next if VX != NN
    SneByte { x: u8, nn: u8 },
    /// 5XY0: skip next if VX == VY
    SeReg { x: u8, y: u8 },
    /// 6XNN: VX = NN
    LdByte { x: u8, nn: u8 },
    /// 7XNN: VX += NN, no carry
    AddByte { x: u8, nn: u8 },
    /// 8XY0: VX = VY
    LdReg { x: u8, y: u8 },
    /// 8XY1: VX |= VY
    Or { x: u8, y: u8 },
    /// 8XY2: VX &= VY
    And { x: u8, y: u8 },
    /// 8XY3: VX ^= VY
    Xor { x: u8, y: u8 },
    /// 8XY4: VX += VY, VF = carry
    AddReg { x: u8, y: u8 },
    /// 8XY5: VX -= VY, VF = no borrow
    Sub { x: u8, y: u8 },
    /// 8XY6: VF = low bit of VX, VX >>= 1
    Shr { x: u8 },
    /// 8XY7: VX = VY - VX, VF = no borrow
    Subn { x: u8, y: u8 },
    /// 8XYE: VF = high bit of VX, VX <<= 1
    Shl { x: u8 },
    /// 9XY0: skip next if VX != VY
    SneReg { x: u8, y: u8 },
    /// ANNN: I = NNN
    LdI { nnn: u16 },
    /// BNNN: jump to NNN + V0
    JpV0 { nnn: u16 },
    /// CXNN: VX = random byte & NN
    Rnd { x: u8, nn: u8 },
    /// DXYN: XOR-blit an 8xN sprite from I at (VX, VY), VF = collision
    Drw { x: u8, y: u8, n: u8 },
    /// EX9E: skip next if key VX is pressed
    Skp { x: u8 },
    /// EXA1: skip next if key VX is not pressed
    Sknp { x: u8 },
    /// FX07: VX = delay timer
    LdDelay { x: u8 },
    /// FX0A: busy-wait for a key press, store it in VX
    WaitKey { x: u8 },
    /// FX15: delay timer = VX
    SetDelay { x: u8 },
    /// FX18: sound timer = VX
    SetSound { x: u8 },
    /// FX1E: I += VX
    AddI { x: u8 },
    /// FX29: I = address of the font glyph for VX
    LdFont { x: u8 },
    /// FX33: store VX as three decimal digits at I
    Bcd { x: u8 },
    /// FX55: copy V0..=VX to memory at I
    Store { x: u8 },
    /// FX65: copy memory at I into V0..=VX
    Load { x: u8 },
    /// anything else; executes as a no-op
    Unknown(u16),
}

impl Instruction {
    pub fn decode(opcode: u16) -> Self {
        use Instruction::*;

        let nnn = opcode & 0x0FFF;
        let nn = (opcode & 0x00FF) as u8;
        let n = (opcode & 0x000F) as u8;
        let x = ((opcode >> 8) & 0xF) as u8;
        let y = ((opcode >> 4) & 0xF) as u8;

        match opcode >> 12 {
            0x0 => match nn {
                0xE0 => Cls,
                0xEE => Ret,
                // 0NNN machine-code call on the original hardware
                _ => Unknown(opcode),
            },
            0x1 => Jp { nnn },
            0x2 => Call { nnn },
            0x3 => SeByte { x, nn },
            0x4 => SneByte { x, nn },
            0x5 if n == 0 => SeReg { x, y },
            0x6 => LdByte { x, nn },
            0x7 => AddByte { x, nn },
            0x8 => match n {
                0x0 => LdReg { x, y },
                0x1 => Or { x, y },
                0x2 => And { x, y },
                0x3 => Xor { x, y },
                0x4 => AddReg { x, y },
                0x5 => Sub { x, y },
                0x6 => Shr { x },
                0x7 => Subn { x, y },
                0xE => Shl { x },
                _ => Unknown(opcode),
            },
            0x9 if n == 0 => SneReg { x, y },
            0xA => LdI { nnn },
            0xB => JpV0 { nnn },
            0xC => Rnd { x, nn },
            0xD => Drw { x, y, n },
            0xE => match nn {
                0x9E => Skp { x },
                0xA1 => Sknp { x },
                _ => Unknown(opcode),
            },
            0xF => match nn {
                0x07 => LdDelay { x },
                0x0A => WaitKey { x },
                0x15 => SetDelay { x },
                0x18 => SetSound { x },
                0x1E => AddI { x },
                0x29 => LdFont { x },
                0x33 => Bcd { x },
                0x55 => Store { x },
                0x65 => Load { x },
                _ => Unknown(opcode),
            },
            _ => Unknown(opcode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Instruction::{self, *};

    #[test]
    fn decodes_every_family() {
        let cases: &[(u16, Instruction)] = &[
            (0x00E0, Cls),
            (0x00EE, Ret),
            (0x1234, Jp { nnn: 0x234 }),
            (0x2456, Call { nnn: 0x456 }),
            (0x342A, SeByte { x: 0x4, nn: 0x2A }),
            (0x4A75, SneByte { x: 0xA, nn: 0x75 }),
            (0x5AE0, SeReg { x: 0xA, y: 0xE }),
            (0x63F5, LdByte { x: 0x3, nn: 0xF5 }),
            (0x7B12, AddByte { x: 0xB, nn: 0x12 }),
            (0x8590, LdReg { x: 0x5, y: 0x9 }),
            (0x8101, Or { x: 0x1, y: 0x0 }),
            (0x8642, And { x: 0x6, y: 0x4 }),
            (0x87F3, Xor { x: 0x7, y: 0xF }),
            (0x8264, AddReg { x: 0x2, y: 0x6 }),
            (0x8C45, Sub { x: 0xC, y: 0x4 }),
            (0x8106, Shr { x: 0x1 }),
            (0x86D7, Subn { x: 0x6, y: 0xD }),
            (0x8E0E, Shl { x: 0xE }),
            (0x9990, SneReg { x: 0x9, y: 0x9 }),
            (0xA568, LdI { nnn: 0x568 }),
            (0xBABC, JpV0 { nnn: 0xABC }),
            (0xC5AF, Rnd { x: 0x5, nn: 0xAF }),
            (0xD7B4, Drw { x: 0x7, y: 0xB, n: 0x4 }),
            (0xE49E, Skp { x: 0x4 }),
            (0xECA1, Sknp { x: 0xC }),
            (0xF907, LdDelay { x: 0x9 }),
            (0xFD0A, WaitKey { x: 0xD }),
            (0xF315, SetDelay { x: 0x3 }),
            (0xF718, SetSound { x: 0x7 }),
            (0xF91E, AddI { x: 0x9 }),
            (0xFF29, LdFont { x: 0xF }),
            (0xF533, Bcd { x: 0x5 }),
            (0xF655, Store { x: 0x6 }),
            (0xF665, Load { x: 0x6 }),
        ];
        for &(opcode, expected) in cases {
            assert_eq!(Instruction::decode(opcode), expected, "{opcode:04X}");
        }
    }

    #[test]
    fn undefined_patterns_decode_as_unknown() {
        for opcode in [0x0123, 0x5AE1, 0x8AB8, 0x9AB5, 0xE4FF, 0xF0FF] {
            assert_eq!(Instruction::decode(opcode), Unknown(opcode));
        }
    }
}
