use std::io::{self, Write};

use log::{debug, log_enabled, trace};

use crate::alu;
use crate::decode::{decode, Instruction};
use crate::error::CpuError;
use crate::memory::Memory;
use crate::reg::{Registers, NUM_REGS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Halted,
}

/// What the dispatcher does with the PC after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Move past the instruction and its operands.
    Advance,
    /// The handler picked the next PC itself.
    Jump(usize),
}

/// An LS-8 machine: memory, registers, PC and the sink PRN writes to.
pub struct Cpu<W = io::Stdout> {
    pub regs: Registers,
    pub pc: usize,
    pub mem: Memory,
    state: State,
    out: W,
}

impl Cpu<io::Stdout> {
    /// A CPU with `code` loaded at address 0, printing to stdout.
    pub fn new(code: &[u8]) -> Result<Self, CpuError> {
        Self::with_output(code, io::stdout())
    }
}

impl<W: Write> Cpu<W> {
    pub fn with_output(code: &[u8], out: W) -> Result<Self, CpuError> {
        let mut mem = Memory::new();
        mem.load(code)?;
        Ok(Self {
            regs: Registers::new(),
            pc: 0,
            mem,
            state: State::Running,
            out,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs until HLT or the first fault.
    pub fn run(&mut self) -> Result<(), CpuError> {
        let mut cycles = 0u64;
        while self.step()? == State::Running {
            cycles += 1;
        }
        debug!("halted at pc={:#04x} after {} cycles", self.pc, cycles + 1);
        Ok(())
    }

    /// Executes a single fetch-decode-execute cycle. A halted CPU stays halted.
    ///
    /// On error nothing written by the faulting instruction is kept and the PC
    /// still points at it.
    pub fn step(&mut self) -> Result<State, CpuError> {
        if self.state == State::Halted {
            return Ok(State::Halted);
        }
        if log_enabled!(log::Level::Trace) {
            trace!("{}", self.trace_line());
        }

        let pc = self.pc;
        let ir = self.mem.read(pc)?;
        let insn = Instruction::try_from(ir).map_err(|e| match e {
            CpuError::UnrecognizedOpcode { opcode, .. } => CpuError::UnrecognizedOpcode { opcode, pc },
            e => e,
        })?;
        let operand_count = decode(ir).operand_count as usize;
        let mut operands = [0u8; 2];
        for (i, slot) in operands.iter_mut().enumerate().take(operand_count) {
            *slot = self.mem.read(pc + 1 + i)?;
        }
        let [a, b] = operands;
        debug!("{:#04x}: {:<4} {:?}", pc, insn, &operands[..operand_count]);

        let flow = self.execute(insn, a, b)?;
        self.advance(pc, operand_count, flow);
        Ok(self.state)
    }

    fn advance(&mut self, pc: usize, operand_count: usize, flow: Flow) {
        self.pc = match flow {
            Flow::Advance => pc + 1 + operand_count,
            Flow::Jump(target) => target,
        };
    }

    fn execute(&mut self, insn: Instruction, a: u8, b: u8) -> Result<Flow, CpuError> {
        match insn {
            Instruction::Hlt => {
                self.state = State::Halted;
            }
            Instruction::Ldi => self.regs.set(a, b)?,
            Instruction::Prn => {
                let val = self.regs.get(a)?;
                writeln!(self.out, "{}", val).map_err(CpuError::Output)?;
            }
            Instruction::Push => self.push(a)?,
            Instruction::Pop => self.pop(a)?,
            Instruction::Alu(op) => alu::apply(&mut self.regs, op, a, b)?,
        }
        Ok(Flow::Advance)
    }

    /// The source is sampled before SP moves, so `PUSH R7` stores the old SP.
    fn push(&mut self, reg: u8) -> Result<(), CpuError> {
        let val = self.regs.get(reg)?;
        let sp = isize::from(self.regs.sp()) - 1;
        let addr = usize::try_from(sp).map_err(|_| CpuError::OutOfBounds(sp))?;
        self.mem.write(addr, val)?;
        self.regs.set_sp(addr as u8);
        Ok(())
    }

    /// SP moves before the destination is written, so `POP R7` leaves R7 holding the popped value.
    fn pop(&mut self, reg: u8) -> Result<(), CpuError> {
        self.regs.get(reg)?;
        let sp = self.regs.sp();
        let val = self.mem.read(sp as usize)?;
        let next = sp.checked_add(1).ok_or(CpuError::OutOfBounds(256))?;
        self.regs.set_sp(next);
        self.regs.set(reg, val)
    }

    /// `TRACE: PC | IR OP1 OP2 | R0 .. R7`, all in hex.
    pub fn trace_line(&self) -> String {
        let ram = self.mem.as_slice();
        let at = |addr: usize| ram.get(addr).copied().unwrap_or(0);
        let mut line = format!(
            "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
            self.pc,
            at(self.pc),
            at(self.pc + 1),
            at(self.pc + 2)
        );
        for i in 0..NUM_REGS {
            line.push_str(&format!(" {:02X}", self.regs.as_slice()[i]));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{ADD, DIV, HLT, LDI, MUL, POP, PRN, PUSH, SUB};
    use crate::reg::{SP, SP_INIT};
    use proptest::prelude::*;

    fn cpu(code: &[u8]) -> Cpu<Vec<u8>> {
        Cpu::with_output(code, Vec::new()).unwrap()
    }

    fn printed(cpu: &Cpu<Vec<u8>>) -> &str {
        std::str::from_utf8(cpu.output()).unwrap()
    }

    #[test]
    fn ldi_then_halt() {
        let mut cpu = cpu(&[0b1000_0010, 0b0000_0000, 0b0000_1000, 0b0000_0001]);
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(0).unwrap(), 8);
        assert_eq!(cpu.state(), State::Halted);
        assert!(!cpu.is_running());
        assert!(cpu.output().is_empty());
        assert_eq!(cpu.pc, 4);
    }

    #[test]
    fn print8() {
        let mut cpu = cpu(&[LDI, 0, 8, PRN, 0, HLT]);
        cpu.run().unwrap();
        assert_eq!(printed(&cpu), "8\n");
    }

    #[test]
    fn repeated_prn_does_not_mutate() {
        let mut cpu = cpu(&[LDI, 3, 99, PRN, 3, PRN, 3, PRN, 3, HLT]);
        cpu.step().unwrap();
        let after_ldi = cpu.regs.clone();
        cpu.run().unwrap();
        assert_eq!(cpu.regs, after_ldi);
        assert_eq!(printed(&cpu), "99\n99\n99\n");
    }

    #[test]
    fn step_by_step() {
        let mut cpu = cpu(&[LDI, 1, 5, HLT]);
        assert_eq!(cpu.step().unwrap(), State::Running);
        assert_eq!(cpu.pc, 3);
        assert_eq!(cpu.step().unwrap(), State::Halted);
        assert_eq!(cpu.pc, 4);
        // halted machines ignore further steps
        assert_eq!(cpu.step().unwrap(), State::Halted);
        assert_eq!(cpu.pc, 4);
    }

    #[test]
    fn empty_memory_halts_at_zero() {
        let mut cpu = cpu(&[]);
        assert_eq!(cpu.step().unwrap(), State::Halted);
        assert_eq!(cpu.regs, Registers::new());
    }

    #[test]
    fn truncated_ldi_reads_zeroed_operands() {
        let mut cpu = cpu(&[LDI]);
        cpu.regs.set(0, 77).unwrap();
        cpu.run().unwrap();
        // operands came from zeroed memory: LDI R0,0, then the zero byte halts
        assert_eq!(cpu.regs.get(0).unwrap(), 0);
        assert_eq!(cpu.pc, 4);
        assert_eq!(cpu.state(), State::Halted);
    }

    #[test]
    fn arithmetic_program() {
        let mut cpu = cpu(&[
            LDI, 0, 20, LDI, 1, 4, //
            ADD, 0, 1, // 24
            SUB, 0, 1, // 20
            MUL, 0, 1, // 80
            DIV, 0, 1, // 20
            PRN, 0, HLT,
        ]);
        cpu.run().unwrap();
        assert_eq!(printed(&cpu), "20\n");
    }

    #[test]
    fn div_by_zero_faults_without_mutation() {
        let mut cpu = cpu(&[LDI, 0, 9, DIV, 0, 1, HLT]);
        let err = cpu.run().unwrap_err();
        assert!(matches!(err, CpuError::DivideByZero));
        assert_eq!(cpu.regs.get(0).unwrap(), 9);
        assert_eq!(cpu.pc, 3);
        assert!(cpu.is_running());
    }

    #[test]
    fn unrecognized_opcode() {
        let mut cpu = cpu(&[LDI, 2, 1, 0b1111_1111, 2, 3, HLT]);
        cpu.step().unwrap();
        let before = cpu.regs.clone();
        let err = cpu.step().unwrap_err();
        assert!(matches!(err, CpuError::UnrecognizedOpcode { opcode: 0xFF, pc: 3 }));
        assert_eq!(cpu.regs, before);
        assert_eq!(cpu.pc, 3);
    }

    #[test]
    fn unsupported_alu_operation() {
        let mut cpu = cpu(&[0b1010_0111, 0, 1]);
        assert!(matches!(
            cpu.run(),
            Err(CpuError::UnsupportedOperation(0b00111))
        ));
    }

    #[test]
    fn invalid_register_operand() {
        let mut ldi = cpu(&[LDI, 8, 1]);
        assert!(matches!(ldi.run(), Err(CpuError::InvalidRegister(8))));
        let mut prn = cpu(&[PRN, 200]);
        assert!(matches!(prn.run(), Err(CpuError::InvalidRegister(200))));
    }

    #[test]
    fn operands_past_end_of_memory() {
        let mut image = vec![0u8; 256];
        image[254] = LDI;
        let mut cpu = cpu(&image);
        cpu.pc = 254;
        assert!(matches!(cpu.step(), Err(CpuError::OutOfBounds(256))));
        assert_eq!(cpu.pc, 254);
    }

    #[test]
    fn stack_grows_down() {
        let mut cpu = cpu(&[LDI, 0, 1, LDI, 1, 2, PUSH, 0, PUSH, 1, POP, 2, POP, 3, HLT]);
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(2).unwrap(), 2);
        assert_eq!(cpu.regs.get(3).unwrap(), 1);
        assert_eq!(cpu.regs.sp(), SP_INIT);
        assert_eq!(cpu.mem.read(SP_INIT as usize - 1).unwrap(), 1);
        assert_eq!(cpu.mem.read(SP_INIT as usize - 2).unwrap(), 2);
    }

    #[test]
    fn push_below_zero_faults() {
        let mut cpu = cpu(&[LDI, SP, 0, PUSH, 0]);
        cpu.step().unwrap();
        assert!(matches!(cpu.step(), Err(CpuError::OutOfBounds(-1))));
        assert_eq!(cpu.regs.sp(), 0);
    }

    #[test]
    fn pop_past_top_faults() {
        let mut cpu = cpu(&[LDI, SP, 255, POP, 0]);
        cpu.regs.set(0, 42).unwrap();
        cpu.step().unwrap();
        assert!(matches!(cpu.step(), Err(CpuError::OutOfBounds(256))));
        assert_eq!(cpu.regs.get(0).unwrap(), 42);
        assert_eq!(cpu.regs.sp(), 255);
    }

    #[test]
    fn jump_skips_the_advance() {
        let mut cpu = cpu(&[LDI, 0, 8, HLT]);
        cpu.advance(0, 2, Flow::Jump(0x40));
        assert_eq!(cpu.pc, 0x40);
        cpu.advance(0x40, 2, Flow::Advance);
        assert_eq!(cpu.pc, 0x43);
        // a jump back onto the instruction itself is not advanced past
        cpu.advance(0, 2, Flow::Jump(0));
        assert_eq!(cpu.pc, 0);
        assert_eq!(cpu.step().unwrap(), State::Running);
        assert_eq!(cpu.pc, 3);
    }

    #[test]
    fn trace_line_format() {
        let cpu = cpu(&[LDI, 0, 8, HLT]);
        assert_eq!(
            cpu.trace_line(),
            "TRACE: 00 | 82 00 08 | 00 00 00 00 00 00 00 F4"
        );
    }

    proptest! {
        #[test]
        fn push_pop_restores_sp(r in 0u8..8, r2 in 0u8..8, v in any::<u8>()) {
            // POP into R7 overwrites the stack pointer unless R7 was what got pushed
            prop_assume!(r2 != SP || r == SP);
            let mut cpu = cpu(&[PUSH, r, POP, r2, HLT]);
            if r != SP {
                cpu.regs.set(r, v).unwrap();
            }
            let sp = cpu.regs.sp();
            let pushed = cpu.regs.get(r).unwrap();
            cpu.run().unwrap();
            prop_assert_eq!(cpu.regs.sp(), sp);
            prop_assert_eq!(cpu.regs.get(r2).unwrap(), pushed);
        }
    }
}
