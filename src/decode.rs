//! Opcode bit layout:
//!
//! ```text
//!   7 6   5   4 3 2 1 0
//!  [ n ][alu][   id    ]
//! ```
//!
//! `n` is the number of operand bytes that follow, `alu` routes the
//! instruction to the ALU, and `id` picks the operation.

use std::fmt;

use crate::alu::AluOp;
use crate::error::CpuError;

pub const HLT: u8 = 0b0000_0001;
pub const LDI: u8 = 0b1000_0010;
pub const PRN: u8 = 0b0100_0111;
pub const PUSH: u8 = 0b0100_0101;
pub const POP: u8 = 0b0100_0110;
pub const ADD: u8 = 0b1010_0000;
pub const SUB: u8 = 0b1010_0001;
pub const MUL: u8 = 0b1010_0010;
pub const DIV: u8 = 0b1010_0011;

const ALU_FLAG: u8 = 0b0010_0000;
const ID_MASK: u8 = 0b0001_1111;

/// Raw bit fields of an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub opcode: u8,
    pub operand_count: u8,
    pub is_alu: bool,
}

pub fn decode(raw: u8) -> Decoded {
    Decoded {
        opcode: raw & ID_MASK,
        operand_count: raw >> 6,
        is_alu: raw & ALU_FLAG != 0,
    }
}

impl Decoded {
    pub fn encode(self) -> u8 {
        let alu = if self.is_alu { ALU_FLAG } else { 0 };
        (self.operand_count << 6) | alu | (self.opcode & ID_MASK)
    }
}

/// The closed set of instructions the CPU executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Hlt,
    Ldi,
    Prn,
    Push,
    Pop,
    Alu(AluOp),
}

impl Instruction {
    pub fn opcode(self) -> u8 {
        match self {
            Instruction::Hlt => HLT,
            Instruction::Ldi => LDI,
            Instruction::Prn => PRN,
            Instruction::Push => PUSH,
            Instruction::Pop => POP,
            Instruction::Alu(op) => (2 << 6) | ALU_FLAG | op.code(),
        }
    }

    pub fn operand_count(self) -> u8 {
        decode(self.opcode()).operand_count
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Instruction::Hlt => "HLT",
            Instruction::Ldi => "LDI",
            Instruction::Prn => "PRN",
            Instruction::Push => "PUSH",
            Instruction::Pop => "POP",
            Instruction::Alu(op) => op.mnemonic(),
        }
    }
}

impl TryFrom<u8> for Instruction {
    type Error = CpuError;

    /// Resolves a raw byte. Errors carry `pc = 0`; the dispatcher fills in the real one.
    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        let d = decode(raw);
        if d.is_alu && d.operand_count == 2 {
            return AluOp::try_from(d.opcode).map(Instruction::Alu);
        }
        match raw {
            // zeroed memory halts
            0 | HLT => Ok(Instruction::Hlt),
            LDI => Ok(Instruction::Ldi),
            PRN => Ok(Instruction::Prn),
            PUSH => Ok(Instruction::Push),
            POP => Ok(Instruction::Pop),
            _ => Err(CpuError::UnrecognizedOpcode { opcode: raw, pc: 0 }),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}
