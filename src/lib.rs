//! An LS-8 emulator: 256 bytes of memory, eight 8-bit registers and a small
//! load/print/arithmetic/stack instruction set.

pub mod alu;
pub mod cpu;
pub mod decode;
pub mod error;
pub mod loader;
pub mod memory;
pub mod reg;

pub use cpu::{Cpu, Flow, State};
pub use error::{CpuError, LoadError};
