use crate::error::CpuError;

pub const NUM_REGS: usize = 8;
/// Register reserved for the stack pointer.
pub const SP: u8 = 7;
/// Initial stack pointer; the stack grows down from here.
pub const SP_INIT: u8 = 0xF4;

/// General purpose registers R0..R7. Values are 8-bit words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    regs: [u8; NUM_REGS],
}

impl Default for Registers {
    fn default() -> Self {
        let mut regs = [0; NUM_REGS];
        regs[SP as usize] = SP_INIT;
        Self { regs }
    }
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, idx: u8) -> Result<u8, CpuError> {
        self.regs
            .get(idx as usize)
            .copied()
            .ok_or(CpuError::InvalidRegister(idx))
    }

    pub fn set(&mut self, idx: u8, val: u8) -> Result<(), CpuError> {
        let reg = self
            .regs
            .get_mut(idx as usize)
            .ok_or(CpuError::InvalidRegister(idx))?;
        *reg = val;
        Ok(())
    }

    pub fn sp(&self) -> u8 {
        self.regs[SP as usize]
    }

    pub fn set_sp(&mut self, val: u8) {
        self.regs[SP as usize] = val;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.regs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_pointer_is_preset() {
        let regs = Registers::new();
        assert_eq!(regs.sp(), SP_INIT);
        assert_eq!(regs.get(SP).unwrap(), SP_INIT);
        assert!(regs.as_slice()[..7].iter().all(|&r| r == 0));
    }

    #[test]
    fn set_then_get() {
        let mut regs = Registers::new();
        for i in 0..NUM_REGS as u8 {
            regs.set(i, i * 3).unwrap();
        }
        for i in 0..NUM_REGS as u8 {
            assert_eq!(regs.get(i).unwrap(), i * 3);
        }
        assert_eq!(regs.sp(), 21);
    }

    #[test]
    fn invalid_index() {
        let mut regs = Registers::new();
        assert!(matches!(regs.get(8), Err(CpuError::InvalidRegister(8))));
        assert!(matches!(regs.set(255, 1), Err(CpuError::InvalidRegister(255))));
        assert_eq!(regs, Registers::new());
    }
}
