use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions raised while a [`Cpu`](crate::cpu::Cpu) executes.
#[derive(Debug, Error)]
pub enum CpuError {
    #[error("memory address {0} is outside 0..=255")]
    OutOfBounds(isize),
    #[error("register index {0} is outside 0..=7")]
    InvalidRegister(u8),
    #[error("unsupported ALU operation {0:#07b}")]
    UnsupportedOperation(u8),
    #[error("division by zero")]
    DivideByZero,
    #[error("unrecognized opcode {opcode:#010b} at pc={pc:#04x}")]
    UnrecognizedOpcode { opcode: u8, pc: usize },
    #[error("failed to write PRN output")]
    Output(#[source] io::Error),
}

/// Problems with a program image, raised before the first cycle runs.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read program image {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: `{text}` is not an 8-digit binary literal")]
    InvalidLiteral { line: usize, text: String },
    #[error("program image is {len} bytes, memory holds 256")]
    TooLarge { len: usize },
}
