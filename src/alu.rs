use crate::error::CpuError;
use crate::reg::Registers;

/// Arithmetic operations, identified by the low 5 bits of an ALU opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl AluOp {
    pub fn code(self) -> u8 {
        match self {
            AluOp::Add => 0b00000,
            AluOp::Sub => 0b00001,
            AluOp::Mul => 0b00010,
            AluOp::Div => 0b00011,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "ADD",
            AluOp::Sub => "SUB",
            AluOp::Mul => "MUL",
            AluOp::Div => "DIV",
        }
    }
}

impl TryFrom<u8> for AluOp {
    type Error = CpuError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0b00000 => Ok(AluOp::Add),
            0b00001 => Ok(AluOp::Sub),
            0b00010 => Ok(AluOp::Mul),
            0b00011 => Ok(AluOp::Div),
            _ => Err(CpuError::UnsupportedOperation(code)),
        }
    }
}

/// Computes `dst = dst <op> src` in place.
///
/// Arithmetic wraps at 8 bits. DIV truncates and refuses a zero divisor before
/// touching `dst`.
pub fn apply(regs: &mut Registers, op: AluOp, dst: u8, src: u8) -> Result<(), CpuError> {
    let a = regs.get(dst)?;
    let b = regs.get(src)?;
    let r = match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Mul => a.wrapping_mul(b),
        AluOp::Div => {
            if b == 0 {
                return Err(CpuError::DivideByZero);
            }
            a / b
        }
    };
    regs.set(dst, r)
}
