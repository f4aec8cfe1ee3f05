use log::debug;

use super::{Cpu, CpuFault};
use crate::consts::cpu::*;

impl Cpu {
    pub(super) fn relint(&mut self) {
        self.ints_off = false;
    }

    pub(super) fn inhint(&mut self) {
        self.ints_off = true;
    }

    pub(super) fn tcf(&mut self, addr: u16) {
        self.mm.regs.set(REG_Z, addr);
    }

    /// CA rewrites the fetched value back to its source when the
    /// address is erasable, which is what makes the editing registers
    /// re-edit on every load.
    pub(super) fn ca(&mut self, addr: u16) -> Result<(), CpuFault> {
        let val = self.read_s16(addr as usize)?;
        self.write_s16(REG_A, val)?;

        if addr & 0o6000 == 0 {
            // bits 11 and 12 clear means the address is erasable
            self.write_s16(addr as usize, val)?;
        }

        debug!("{:05o} loaded into A from {:05o}", val, addr);
        Ok(())
    }

    pub(super) fn cs(&mut self, addr: u16) -> Result<(), CpuFault> {
        let val = self.read_s16(addr as usize)?;
        self.write_s16(REG_A, !val)?;

        if addr & 0o6000 == 0 {
            self.write_s16(addr as usize, val)?;
        }

        Ok(())
    }

    /// Double exchange: A,L with K,K+1. The L half runs first, which
    /// gives the overlap cases (DXCH L) the hardware's behavior.
    pub(super) fn dxch(&mut self, addr: u16) -> Result<(), CpuFault> {
        let k = addr as usize;

        let l = self.read_s16(REG_L)?;
        let k2 = self.read_s16(k + 1)?;
        self.write_s16(REG_L, k2)?;
        self.write_s16(k + 1, l)?;

        let a = self.read_s16(REG_A)?;
        let k1 = self.read_s16(k)?;
        self.write_s16(REG_A, k1)?;
        self.write_s16(k, a)?;

        Ok(())
    }

    /// TS stores A and, when A holds an overflow, replaces it with +/-1
    /// and skips the next instruction.
    pub(super) fn ts(&mut self, addr: u16) -> Result<(), CpuFault> {
        let a = self.mm.regs.get(REG_A);
        self.write_s16(addr as usize, a)?;

        match a & 0xC000 {
            0x4000 => {
                // positive overflow
                self.mm.regs.set(REG_A, 1);
                self.skip_next();
            }
            0x8000 => {
                // negative overflow
                self.mm.regs.set(REG_A, 0o177776);
                self.skip_next();
            }
            _ => {}
        }

        Ok(())
    }

    fn skip_next(&mut self) {
        let z = self.mm.regs.get(REG_Z);
        self.mm.regs.set(REG_Z, z + 1);
    }
}
