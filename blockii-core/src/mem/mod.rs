mod loader;
mod regs;

pub use loader::Loader;
pub use regs::RegisterFile;

use log::trace;
use thiserror::Error;

use crate::consts::memmap::*;
use crate::consts::WORD_MASK;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("address {0:o} is out of range")]
    OutOfRange(usize),
    #[error("address {0:o} is fixed and cannot be written")]
    FixedWrite(usize),
    #[error("erasable bank {0:o} is out of range")]
    ErasableBankOutOfRange(usize),
    #[error("fixed bank {0:o} is out of range")]
    FixedBankOutOfRange(usize),
    #[error("reached end of fixed memory")]
    EndOfFixedMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BankKind {
    Erasable,
    Fixed,
}

/// The full addressable main memory: 8 erasable banks behind addresses
/// 00000-01777 (the last quarter switched by EB) and 40 fixed banks
/// behind 02000-07777 (the first quarter switched by FB and the super
/// bit, banks 2 and 3 wired straight in).
pub struct MainMemory {
    erasable: [[u16; RAM_BANK_SIZE]; RAM_NUM_BANKS],
    fixed: [[u16; ROM_BANK_SIZE]; ROM_TOTAL_BANKS],
    pub eb: usize,
    pub fb: usize,
    pub sb: bool,
}

impl Default for MainMemory {
    fn default() -> Self {
        MainMemory::new()
    }
}

impl MainMemory {
    pub fn new() -> MainMemory {
        MainMemory {
            erasable: [[0; RAM_BANK_SIZE]; RAM_NUM_BANKS],
            fixed: [[0; ROM_BANK_SIZE]; ROM_TOTAL_BANKS],
            eb: 0,
            fb: 0,
            sb: false,
        }
    }

    /// Reads the 15-bit word at a 12-bit address through the current
    /// bank selection.
    pub fn read(&self, address: usize) -> Result<u16, MemoryError> {
        let (kind, bank, offset) = self.select_bank(address)?;
        let val = match kind {
            BankKind::Erasable => self.erasable[bank][offset],
            BankKind::Fixed => self.fixed[bank][offset],
        };
        trace!("mem read {:o}: {:o}", address, val);
        Ok(val)
    }

    /// Stores a word at a 12-bit address. Only the low 15 bits are kept;
    /// the 16th bit is the hardware's parity bit and is discarded here.
    /// Fixed memory refuses writes.
    pub fn write(&mut self, address: usize, val: u16) -> Result<(), MemoryError> {
        let (kind, bank, offset) = self.select_bank(address)?;
        if kind == BankKind::Fixed {
            return Err(MemoryError::FixedWrite(address));
        }

        trace!("mem write {:o}: {:o}", address, val);
        self.erasable[bank][offset] = val & WORD_MASK;
        Ok(())
    }

    fn select_bank(&self, address: usize) -> Result<(BankKind, usize, usize), MemoryError> {
        if address >= TOTAL_SIZE {
            return Err(MemoryError::OutOfRange(address));
        }

        if address < FIXED_WINDOW_START {
            // erasable memory
            // 00000 - 00377 -> erasable[0]
            // 00400 - 00777 -> erasable[1]
            // 01000 - 01377 -> erasable[2]
            // 01400 - 01777 -> erasable[eb]
            let mut idx = address / RAM_BANK_SIZE;
            if idx == 3 {
                if self.eb >= RAM_NUM_BANKS {
                    return Err(MemoryError::ErasableBankOutOfRange(self.eb));
                }
                idx = self.eb;
            }
            return Ok((BankKind::Erasable, idx, address % RAM_BANK_SIZE));
        }

        // fixed memory
        // 02000 - 03777 -> fixed[fb, sb]
        // 04000 - 05777 -> fixed[2]
        // 06000 - 07777 -> fixed[3]
        let mut idx = (address - FIXED_WINDOW_START) / ROM_BANK_SIZE + 1;
        if idx == 1 {
            if self.fb >= ROM_NUM_BANKS {
                return Err(MemoryError::FixedBankOutOfRange(self.fb));
            }

            idx = self.fb;
            if self.fb >= SB_FIRST_BANK && self.sb {
                // with the super bit set, banks 030-037 really select
                // 040-047
                idx += SB_BANK_OFFSET;
            }
        }
        Ok((BankKind::Fixed, idx, address % ROM_BANK_SIZE))
    }

    pub(crate) fn load_fixed_word(
        &mut self,
        bank: usize,
        offset: usize,
        val: u16,
    ) -> Result<(), MemoryError> {
        if bank >= ROM_TOTAL_BANKS {
            return Err(MemoryError::EndOfFixedMemory);
        }
        self.fixed[bank][offset] = val & WORD_MASK;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn fixed_word(&self, bank: usize, offset: usize) -> u16 {
        self.fixed[bank][offset]
    }
}

#[cfg(test)]
mod memory_tests {
    use super::*;

    #[test]
    fn erasable_sequential_write() {
        let mut mm = MainMemory::new();

        for a in 0..FIXED_WINDOW_START {
            mm.write(a, a as u16).unwrap();
        }

        // In the default setup a sequential write fills E0, E1, E2 and
        // then E0 again through the window, so E0 keeps the later values.
        for b in 1..=2 {
            for i in 0..RAM_BANK_SIZE {
                assert_eq!(
                    (b * RAM_BANK_SIZE + i) as u16,
                    mm.erasable[b][i],
                    "bank {} offset {}",
                    b,
                    i
                );
            }
        }
        for i in 0..RAM_BANK_SIZE {
            assert_eq!((3 * RAM_BANK_SIZE + i) as u16, mm.erasable[0][i]);
        }
    }

    #[test]
    fn erasable_bank_selection() {
        let mut mm = MainMemory::new();

        for b in 0..RAM_NUM_BANKS {
            mm.eb = b;
            for i in 0..RAM_BANK_SIZE {
                mm.write(0o1400 + i, (b + 100 + i) as u16).unwrap();
            }
        }

        for b in 0..RAM_NUM_BANKS {
            for i in 0..RAM_BANK_SIZE {
                assert_eq!(
                    (b + 100 + i) as u16,
                    mm.erasable[b][i],
                    "bank {} offset {}",
                    b,
                    i
                );
            }
        }
    }

    #[test]
    fn fixed_bank_selection() {
        let mut mm = MainMemory::new();
        for b in 0..ROM_TOTAL_BANKS {
            for i in 0..ROM_BANK_SIZE {
                mm.fixed[b][i] = (b + 100) as u16;
            }
        }

        mm.sb = false;
        for b in 0..ROM_NUM_BANKS {
            mm.fb = b;
            assert_eq!((b + 100) as u16, mm.read(0o2000).unwrap(), "bank {}", b);
            assert_eq!(
                (b + 100) as u16,
                mm.read(0o3777).unwrap(),
                "bank {} end",
                b
            );
        }

        // The unswitched banks ignore FB entirely.
        mm.fb = 0o27;
        assert_eq!(102, mm.read(0o4000).unwrap());
        assert_eq!(103, mm.read(0o6000).unwrap());
    }

    #[test]
    fn super_bit_bank_selection() {
        let mut mm = MainMemory::new();
        for b in 0..ROM_TOTAL_BANKS {
            for i in 0..ROM_BANK_SIZE {
                mm.fixed[b][i] = (b + 100) as u16;
            }
        }

        mm.sb = true;
        for b in SB_FIRST_BANK..ROM_NUM_BANKS {
            mm.fb = b;
            assert_eq!(
                (b + SB_BANK_OFFSET + 100) as u16,
                mm.read(0o2000).unwrap(),
                "bank {}",
                b
            );
        }

        // Below bank 030 the super bit has no effect.
        mm.fb = 0o27;
        assert_eq!(0o27 + 100, mm.read(0o2000).unwrap());
    }

    #[test]
    fn write_read_masks_to_15_bits() {
        let mut mm = MainMemory::new();
        mm.write(0o123, 0o177777).unwrap();
        assert_eq!(0o77777, mm.read(0o123).unwrap());

        mm.write(0o124, 0o40123).unwrap();
        assert_eq!(0o40123, mm.read(0o124).unwrap());
    }

    #[test]
    fn fixed_memory_is_write_protected() {
        let mut mm = MainMemory::new();
        for address in [0o2000usize, 0o4000, 0o6000, 0o7777].iter() {
            assert_eq!(
                Err(MemoryError::FixedWrite(*address)),
                mm.write(*address, 1),
                "address {:o}",
                address
            );
        }
    }

    #[test]
    fn out_of_range_addresses() {
        let mut mm = MainMemory::new();
        assert_eq!(Err(MemoryError::OutOfRange(0o10000)), mm.read(0o10000));
        assert_eq!(Err(MemoryError::OutOfRange(0o20000)), mm.write(0o20000, 1));
    }

    #[test]
    fn erasable_bank_out_of_range() {
        let mut mm = MainMemory::new();
        mm.eb = 8;
        assert_eq!(Err(MemoryError::ErasableBankOutOfRange(8)), mm.read(0o1400));
        // Unswitched erasable still works.
        assert!(mm.read(0o1377).is_ok());
    }

    #[test]
    fn fixed_bank_out_of_range() {
        let mut mm = MainMemory::new();
        mm.fb = 32;
        assert_eq!(Err(MemoryError::FixedBankOutOfRange(32)), mm.read(0o2000));
        // Unswitched fixed still works.
        assert!(mm.read(0o4000).is_ok());
    }
}
