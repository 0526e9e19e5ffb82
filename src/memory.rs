use crate::error::CpuError;

/// Number of addressable byte cells.
pub const MEM_SIZE: usize = 256;

/// Flat, zero-initialized byte memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    cells: [u8; MEM_SIZE],
}

impl Default for Memory {
    fn default() -> Self {
        Self { cells: [0; MEM_SIZE] }
    }
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, addr: usize) -> Result<u8, CpuError> {
        self.cells
            .get(addr)
            .copied()
            .ok_or_else(|| out_of_bounds(addr))
    }

    pub fn write(&mut self, addr: usize, val: u8) -> Result<(), CpuError> {
        let cell = self.cells.get_mut(addr).ok_or_else(|| out_of_bounds(addr))?;
        *cell = val;
        Ok(())
    }

    /// Copies `image` to the start of memory. Cells past the image keep their contents.
    pub fn load(&mut self, image: &[u8]) -> Result<(), CpuError> {
        if image.len() > MEM_SIZE {
            return Err(out_of_bounds(MEM_SIZE));
        }
        self.cells[..image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // only the populated prefix is interesting
        let used = self.cells.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        f.debug_struct("Memory")
            .field("used", &&self.cells[..used])
            .finish()
    }
}

fn out_of_bounds(addr: usize) -> CpuError {
    CpuError::OutOfBounds(isize::try_from(addr).unwrap_or(isize::MAX))
}
