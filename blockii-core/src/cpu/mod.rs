pub mod decode;
mod instr;
pub mod logging;
pub mod seq;
pub mod timer;

use log::debug;
use thiserror::Error;

use self::decode::{decode, DecodeError, Mnemonic};
use self::logging::{EventLogger, LogEvent};
use self::seq::UnprogSeq;
use self::timer::CycleTimer;
use crate::consts::cpu::*;
use crate::consts::timer::{INTERVAL_10MS, OFFSET_5MS, OFFSET_7_5MS};
use crate::mem::{MainMemory, MemoryError, RegisterFile};
use crate::utils::{overflow_correction, sign_extend};

/// A fault the hardware has no defined behavior for. The simulation
/// stops rather than running on in an undefined state.
#[derive(Debug, Error)]
pub enum CpuFault {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// The CPU's unified view of storage: addresses below 061 land in the
/// register file (through `set`, so editing side effects apply), the
/// rest in banked memory. Bank-select writes are forwarded to the
/// memory's bank state.
pub struct AddressSpace {
    pub regs: RegisterFile,
    pub mem: MainMemory,
}

impl AddressSpace {
    pub fn new(mem: MainMemory) -> AddressSpace {
        AddressSpace {
            regs: RegisterFile::new(),
            mem,
        }
    }

    pub fn read(&self, address: usize) -> Result<u16, MemoryError> {
        if address < REG_FILE_SIZE {
            return Ok(self.regs.get(address));
        }
        self.mem.read(address)
    }

    pub fn write(&mut self, address: usize, val: u16) -> Result<(), MemoryError> {
        if address < REG_FILE_SIZE {
            self.regs.set(address, val);
            match address {
                REG_EB | REG_FB | REG_BB => {
                    self.mem.eb = self.regs.ebank();
                    self.mem.fb = self.regs.fbank();
                }
                _ => {}
            }
            return Ok(());
        }
        self.mem.write(address, val)
    }
}

pub struct Cpu {
    pub mm: AddressSpace,
    ints_off: bool,
    rupt: u16,
    pending: Vec<UnprogSeq>,
    time13: CycleTimer,
    time4: CycleTimer,
    time5: CycleTimer,
    total_mcts: u64,
    logger: Option<EventLogger>,
}

impl Cpu {
    pub fn new(mem: MainMemory) -> Cpu {
        let mut cpu = Cpu {
            mm: AddressSpace::new(mem),
            ints_off: false,
            rupt: 0,
            pending: Vec::new(),
            time13: CycleTimer::new("TIME1/3", INTERVAL_10MS, 0),
            time4: CycleTimer::new("TIME4", INTERVAL_10MS, OFFSET_7_5MS),
            time5: CycleTimer::new("TIME5", INTERVAL_10MS, OFFSET_5MS),
            total_mcts: 0,
            logger: None,
        };
        cpu.reset();
        cpu
    }

    pub fn attach_logger(&mut self, logger: EventLogger) {
        self.logger = Some(logger);
    }

    pub fn reset(&mut self) {
        self.mm.regs.set(REG_Z, RUPT_VECTOR_BASE);
        self.ints_off = false;
    }

    pub fn total_mcts(&self) -> u64 {
        self.total_mcts
    }

    fn emit(&mut self, event: LogEvent) {
        if let Some(logger) = self.logger.as_mut() {
            logger.log(event);
        }
    }

    // ---- 15/16-bit access discipline ---------------------------------

    /// Reads a location as a 16-bit one's-complement value. A and Q are
    /// already 16 bits wide; everything else is sign-extended.
    pub fn read_s16(&mut self, address: usize) -> Result<u16, MemoryError> {
        match address {
            REG_A | REG_Q => self.mm.read(address),
            _ => Ok(sign_extend(self.mm.read(address)?)),
        }
    }

    /// Writes a 16-bit one's-complement value. Stores into anything
    /// narrower than A or Q are overflow-corrected down to 15 bits.
    pub fn write_s16(&mut self, address: usize, value: u16) -> Result<(), MemoryError> {
        match address {
            REG_A | REG_Q => self.mm.write(address, value),
            _ => self.mm.write(address, overflow_correction(value) & 0o77777),
        }
    }

    // ---- main loop ---------------------------------------------------

    /// One step of the machine: run a pending unprogrammed sequence if
    /// there is one, otherwise fetch and execute the next instruction;
    /// then feed the elapsed MCTs to the timers and deliver a posted
    /// interrupt. Returns the MCTs the step took.
    pub fn step(&mut self) -> Result<u32, CpuFault> {
        let timing = match self.pending.pop() {
            Some(seq) => {
                self.emit(LogEvent::Sequence { name: seq.name() });
                if let Some(chained) = self.run_sequence(seq) {
                    self.pending.push(chained);
                }
                seq.timing()
            }
            None => self.step_programmed()?,
        };

        self.advance_timers(timing);

        if self.rupt != 0 && !self.ints_off {
            self.deliver_interrupt()?;
        }

        self.total_mcts += u64::from(timing);
        Ok(timing)
    }

    fn step_programmed(&mut self) -> Result<u32, CpuFault> {
        let z = self.mm.regs.get(REG_Z);
        let word = self.mm.read(z as usize)?;
        let (def, operand) = decode(word)?;

        self.emit(LogEvent::Instruction {
            z,
            code: word,
            name: def.name,
            operand,
        });

        // the PC moves past the instruction before it runs; TCF and the
        // TS skip overwrite it from there
        self.mm.regs.set(REG_Z, z + 1);

        self.execute(def.mnem, operand)?;
        Ok(def.timing)
    }

    fn execute(&mut self, mnem: Mnemonic, operand: u16) -> Result<(), CpuFault> {
        match mnem {
            Mnemonic::Relint => self.relint(),
            Mnemonic::Inhint => self.inhint(),
            Mnemonic::Tcf => self.tcf(operand),
            Mnemonic::Ca => self.ca(operand)?,
            Mnemonic::Cs => self.cs(operand)?,
            Mnemonic::Dxch => self.dxch(operand)?,
            Mnemonic::Ts => self.ts(operand)?,
        }
        Ok(())
    }

    fn advance_timers(&mut self, timing: u32) {
        let delta = timing as i32;

        if self.time13.inc(delta) {
            self.emit(LogEvent::Timer {
                name: self.time13.name(),
            });
            self.pending.push(UnprogSeq::PincTime1);
            self.pending.push(UnprogSeq::PincTime3);
        }
        if self.time4.inc(delta) {
            self.emit(LogEvent::Timer {
                name: self.time4.name(),
            });
            self.pending.push(UnprogSeq::PincTime4);
        }
        if self.time5.inc(delta) {
            self.emit(LogEvent::Timer {
                name: self.time5.name(),
            });
            self.pending.push(UnprogSeq::PincTime5);
        }
    }

    /// Runs one unprogrammed sequence against the counter registers,
    /// returning a chained child to run next, if any.
    fn run_sequence(&mut self, seq: UnprogSeq) -> Option<UnprogSeq> {
        match seq {
            UnprogSeq::PincTime1 => {
                if self.mm.regs.increment(REG_TIME1) {
                    return Some(UnprogSeq::PincTime2);
                }
            }
            UnprogSeq::PincTime2 => {
                self.mm.regs.increment(REG_TIME2);
            }
            UnprogSeq::PincTime3 => {
                if self.mm.regs.increment(REG_TIME3) {
                    self.post_interrupt(RUPT_TIME3);
                }
            }
            UnprogSeq::PincTime4 => {
                if self.mm.regs.increment(REG_TIME4) {
                    self.post_interrupt(RUPT_TIME4);
                }
            }
            UnprogSeq::PincTime5 => {
                if self.mm.regs.increment(REG_TIME5) {
                    self.post_interrupt(RUPT_TIME5);
                }
            }
        }
        None
    }

    pub fn post_interrupt(&mut self, rupt: u8) {
        debug!("posting rupt {}", rupt);
        self.rupt |= 1 << rupt;
    }

    /// Commits the lowest posted interrupt: the return state goes to
    /// ZRUPT/BRUPT and control transfers to the rupt's vector with
    /// further interrupts held off until RELINT.
    fn deliver_interrupt(&mut self) -> Result<(), CpuFault> {
        for i in 0..16u16 {
            let mask = 1 << i;
            if self.rupt & mask == 0 {
                continue;
            }

            let z = self.mm.regs.get(REG_Z);
            let saved = self.mm.read(z as usize)?;
            self.mm.regs.set(REG_ZRUPT, z);
            self.mm.regs.set(REG_BRUPT, saved);
            self.mm.regs.set(REG_Z, RUPT_VECTOR_BASE + 4 * i);
            self.ints_off = true;
            self.rupt ^= mask;

            debug!("delivered rupt {} to {:o}", i, RUPT_VECTOR_BASE + 4 * i);
            break;
        }
        Ok(())
    }

    // ---- test hooks --------------------------------------------------

    #[cfg(test)]
    fn preset_time13(&mut self, value: i32) {
        self.time13 = CycleTimer::new("TIME1/3", INTERVAL_10MS, value);
    }

    #[cfg(test)]
    fn rupt_pending(&self, rupt: u8) -> bool {
        self.rupt & (1 << rupt) != 0
    }
}
