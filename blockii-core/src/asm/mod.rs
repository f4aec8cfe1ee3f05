mod directive;
pub mod instruction;
pub mod operand;
pub mod problem;
pub mod pseudo;
pub mod scanner;

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};

use log::debug;
use thiserror::Error;

use self::instruction::{encode_noop, find_instruction, Encoding, InstructionDef};
use self::operand::resolve_operand;
use self::problem::{Problem, ProblemLog};
use self::pseudo::{PseudoAddress, UNDEFINED};
use self::scanner::TokenScanner;
use crate::consts::memmap::{ROM_BANK_SIZE, ROM_TOTAL_BANKS};

const MAX_ERRORS: usize = 10;

type Bank = [u16; ROM_BANK_SIZE];

/// Pending diagnostic attached to a location advance. The message is
/// only interesting if something actually gets placed at the new
/// location, so it is held back until the location is next required.
#[derive(Debug, Clone, Copy)]
enum LocNote {
    EndOfErasable,
    EndOfFixed,
    NewSwitchableBank,
}

/// Pass-1 output: an inspectable queue of operations that pass 2
/// replays against the image. Encoding happens at replay time, when the
/// symbol table is complete.
#[derive(Debug)]
enum Deferred {
    SetLoc(PseudoAddress),
    Emit { line: usize, op: EmitOp },
}

#[derive(Debug)]
enum EmitOp {
    Word(u16),
    Pair(u16, u16),
    Instruction {
        def: &'static InstructionDef,
        inst_token: String,
        operand: Option<String>,
        location: PseudoAddress,
    },
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("a valid image has not been assembled")]
    NotBuilt,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Two-pass assembler producing a fixed-memory core-rope image.
pub struct Assembler {
    location: PseudoAddress,
    loc_note: Option<LocNote>,
    extended: bool,
    symbols: HashMap<String, u16>,
    log: ProblemLog,
    ops: Vec<Deferred>,
    image: Option<HashMap<u16, Box<Bank>>>,
    emit_loc: PseudoAddress,
}

impl Default for Assembler {
    fn default() -> Self {
        Assembler::new()
    }
}

impl Assembler {
    pub fn new() -> Assembler {
        Assembler {
            location: UNDEFINED,
            loc_note: None,
            extended: false,
            symbols: HashMap::new(),
            log: ProblemLog::new(""),
            ops: Vec::new(),
            image: None,
            emit_loc: UNDEFINED,
        }
    }

    /// Assembles the file at `path`. Failure to open the file is
    /// recorded as a problem like any other.
    pub fn assemble(&mut self, path: &str) -> bool {
        let source = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                self.log = ProblemLog::new(path);
                self.log.error(format!("could not open file ({})", e));
                return false;
            }
        };
        self.assemble_source(&source, path)
    }

    /// Runs both passes over in-memory source. Returns whether an image
    /// was built; problems accumulate either way.
    pub fn assemble_source(&mut self, source: &str, file_name: &str) -> bool {
        self.location = UNDEFINED;
        self.loc_note = None;
        self.extended = false;
        self.symbols.clear();
        self.log = ProblemLog::new(file_name);
        self.ops.clear();
        self.image = None;

        for (idx, line) in source.lines().enumerate() {
            self.log.set_line(idx + 1);
            self.parse_line(line);

            if self.log.error_count() >= MAX_ERRORS {
                self.log.error("assembler stopped due to too many errors");
                return false;
            }
        }

        if self.log.error_count() > 0 {
            return false;
        }

        debug!("pass 1 complete: {} deferred operations", self.ops.len());
        self.run_pass2()
    }

    pub fn problems(&self) -> &[Problem] {
        self.log.problems()
    }

    pub fn error_count(&self) -> usize {
        self.log.error_count()
    }

    pub fn image_built(&self) -> bool {
        self.image.is_some()
    }

    /// Value currently in the image at (fixed bank, offset), if pass 2
    /// placed one there.
    pub fn image_word(&self, bank: u16, offset: usize) -> Option<u16> {
        self.image
            .as_ref()
            .and_then(|image| image.get(&bank))
            .map(|words| words[offset])
    }

    /// Streams the image out: 40 fixed banks of 1024 big-endian words in
    /// index order, zero-filled where nothing was assembled.
    pub fn write_out<W: Write>(&self, w: &mut W) -> Result<(), ImageError> {
        let image = self.image.as_ref().ok_or(ImageError::NotBuilt)?;

        for bank in 0..ROM_TOTAL_BANKS as u16 {
            match image.get(&bank) {
                Some(words) => {
                    for mc in words.iter() {
                        w.write_all(&mc.to_be_bytes())?;
                    }
                }
                None => {
                    for _ in 0..ROM_BANK_SIZE {
                        w.write_all(&[0u8, 0u8])?;
                    }
                }
            }
        }

        Ok(())
    }

    // ---- pass 1 ------------------------------------------------------

    fn parse_line(&mut self, line: &str) {
        let mut sp = TokenScanner::new(line);

        let token = match self.try_parse_command(&mut sp) {
            None => return,
            Some(token) => token,
        };

        self.add_label(&token);

        if let Some(token) = self.try_parse_command(&mut sp) {
            self.log.error(format!("unknown instruction {}", token));
        }
    }

    /// Consumes one token and tries it as a command. `None` means the
    /// line is handled (or exhausted); `Some` hands the token back so it
    /// can be taken as a label.
    fn try_parse_command(&mut self, sp: &mut TokenScanner) -> Option<String> {
        let token = sp.consume()?;

        if self.try_token(&token, sp) {
            self.demand_end_of_line(sp);
            return None;
        }

        Some(token)
    }

    fn try_token(&mut self, token: &str, sp: &mut TokenScanner) -> bool {
        match instruction::resolve_alias(token) {
            "SETLOC" => {
                self.directive_setloc(sp);
                return true;
            }
            "OCT" => {
                self.directive_oct(sp);
                return true;
            }
            "DEC" => {
                self.directive_dec(sp, false);
                return true;
            }
            "2DEC" => {
                self.directive_dec(sp, true);
                return true;
            }
            _ => {}
        }

        if let Some(def) = find_instruction(token, self.extended, &mut self.log) {
            self.queue_instruction(def, token, sp);

            // prepare for the next instruction
            self.extended = def.set_extend;
            self.inc_location();
            return true;
        }

        self.try_parse_symbol_def(token, sp)
    }

    fn queue_instruction(
        &mut self,
        def: &'static InstructionDef,
        token: &str,
        sp: &mut TokenScanner,
    ) {
        let location = self.require_location();

        let operand = if def.operand.is_some() {
            match sp.consume() {
                Some(t) => Some(t),
                None => {
                    self.log.error("operand expected but none found");
                    return;
                }
            }
        } else {
            None
        };

        self.ops.push(Deferred::Emit {
            line: self.log.line(),
            op: EmitOp::Instruction {
                def,
                inst_token: token.to_string(),
                operand,
                location,
            },
        });
    }

    fn try_parse_symbol_def(&mut self, token: &str, sp: &mut TokenScanner) -> bool {
        match sp.peek() {
            Some("=") | Some("EQUALS") => {}
            _ => return false,
        }
        sp.consume();

        let operand = match sp.consume() {
            Some(t) => t,
            None => {
                self.log.error("operand expected but none found");
                return true;
            }
        };

        match resolve_operand(&self.symbols, &operand) {
            Ok(val) => self.define_symbol(token, val),
            Err(msg) => self.log.error(msg),
        }
        true
    }

    fn add_label(&mut self, token: &str) {
        let pa = self.require_location();
        if !pa.is_valid() {
            self.log
                .error(format!("location for label {} is undefined", token));
            return;
        }

        self.define_symbol(token, pa.as_operand());
    }

    fn define_symbol(&mut self, name: &str, val: u16) {
        if let Some(old) = self.symbols.get(name) {
            if *old == val {
                return;
            }
            self.log
                .warning(format!("symbol {} is being re-defined", name));
        }

        self.symbols.insert(name.to_string(), val);
    }

    fn demand_end_of_line(&mut self, sp: &mut TokenScanner) {
        if let Some(t) = sp.peek() {
            let msg = format!("expected end of line but token found ({})", t);
            self.log.error(msg);
        }
    }

    // ---- location tracking -------------------------------------------

    fn set_location(&mut self, new_loc: PseudoAddress) {
        self.location = new_loc;
        self.loc_note = None;
    }

    /// The current location, flushing any diagnostic held back from the
    /// last advance.
    fn require_location(&mut self) -> PseudoAddress {
        if let Some(note) = self.loc_note.take() {
            match note {
                LocNote::EndOfErasable => self.log.error("end of erasable memory"),
                LocNote::EndOfFixed => self.log.error("end of fixed memory"),
                LocNote::NewSwitchableBank => self
                    .log
                    .warning("address transitioned to new switchable bank"),
            }
        }
        self.location
    }

    fn inc_location(&mut self) {
        if !self.location.is_valid() {
            return;
        }

        match self.location.next_valid() {
            Ok(next) => {
                self.loc_note = if next.is_beginning_of_switchable_bank() {
                    Some(LocNote::NewSwitchableBank)
                } else {
                    None
                };
                self.location = next;
            }
            Err(e) => {
                self.loc_note = Some(if self.location.is_erasable() {
                    LocNote::EndOfErasable
                } else {
                    LocNote::EndOfFixed
                });
                debug!("location advance stopped: {}", e);
                self.location = UNDEFINED;
            }
        }
    }

    // ---- pass 2 ------------------------------------------------------

    fn run_pass2(&mut self) -> bool {
        self.emit_loc = UNDEFINED;
        self.image = Some(HashMap::new());

        let ops = std::mem::take(&mut self.ops);
        for op in &ops {
            let ok = match op {
                Deferred::SetLoc(loc) => {
                    self.emit_loc = *loc;
                    true
                }
                Deferred::Emit { line, op } => {
                    self.log.set_line(*line);
                    self.finalize(op)
                }
            };

            if !ok || self.log.error_count() > 0 {
                self.image = None;
                return false;
            }
        }

        true
    }

    fn finalize(&mut self, op: &EmitOp) -> bool {
        match op {
            EmitOp::Word(v) => self.write_word(*v),
            EmitOp::Pair(h, l) => self.write_word(*h) && self.write_word(*l),
            EmitOp::Instruction {
                def,
                inst_token,
                operand,
                location,
            } => {
                match self.encode_instruction(def, inst_token, operand.as_deref(), *location) {
                    Some(mc) => self.write_word(mc),
                    None => false,
                }
            }
        }
    }

    fn encode_instruction(
        &mut self,
        def: &InstructionDef,
        inst_token: &str,
        operand: Option<&str>,
        location: PseudoAddress,
    ) -> Option<u16> {
        let mut op_val = 0u16;

        if let Some(class) = def.operand {
            let token = operand?;
            let val = match resolve_operand(&self.symbols, token) {
                Ok(v) => v,
                Err(msg) => {
                    self.log.error(msg);
                    return None;
                }
            };

            if !class.validate(val, token, inst_token, &mut self.log) {
                return None;
            }
            op_val = val;
        }

        match def.encoding {
            Encoding::Opcode(base) => Some(base.wrapping_add(op_val)),
            Encoding::Noop => encode_noop(location, inst_token, &mut self.log),
        }
    }

    fn write_word(&mut self, v: u16) -> bool {
        let loc = self.emit_loc;
        if !loc.is_valid() {
            self.log.error("writing to invalid address");
            return false;
        }

        let (erasable, bank, offset) = loc.bank_and_offset();
        if erasable {
            self.log.error("writing to erasable memory");
            return false;
        }

        let image = match self.image.as_mut() {
            Some(m) => m,
            None => return false,
        };

        image
            .entry(bank)
            .or_insert_with(|| Box::new([0u16; ROM_BANK_SIZE]))[offset as usize] = v;

        self.emit_loc = match self.emit_loc.next_valid() {
            Ok(next) => next,
            Err(_) => UNDEFINED,
        };
        true
    }
}

#[cfg(test)]
mod assembler_tests {
    use super::problem::ProblemKind;
    use super::*;

    fn assemble(src: &str) -> Assembler {
        let mut a = Assembler::new();
        a.assemble_source(src, "fake_file.asm");
        a
    }

    #[test]
    fn minimal_loop() {
        let mut a = Assembler::new();
        let ok = a.assemble_source("SETLOC 04000\nSTART   TCF START\n", "fake_file.asm");

        assert!(ok, "problems: {:?}", a.problems());
        assert_eq!(Some(0o14000), a.image_word(2, 0));
        assert_eq!(Some(0), a.image_word(2, 1));
        assert_eq!(None, a.image_word(3, 0));
    }

    #[test]
    fn oct_and_dec_coexist() {
        let mut a = Assembler::new();
        let ok = a.assemble_source("SETLOC 4000\nDEC 5349\nOCT 77777\n", "fake_file.asm");

        assert!(ok, "problems: {:?}", a.problems());
        assert_eq!(0, a.problems().len());
        assert_eq!(Some(0o12345), a.image_word(2, 0));
        assert_eq!(Some(0o77777), a.image_word(2, 1));
    }

    #[test]
    fn bank_transition_warns_once() {
        let a = assemble("SETLOC 031777\nCA 0123\nCA 0123\n");

        let warnings: Vec<_> = a
            .problems()
            .iter()
            .filter(|p| p.kind == ProblemKind::Warning)
            .collect();
        assert_eq!(1, warnings.len(), "problems: {:?}", a.problems());
        assert!(warnings[0]
            .message
            .contains("transitioned to new switchable bank"));
        assert_eq!(3, warnings[0].line);

        // Both instructions still landed: 031777 is the last word of
        // fixed bank 8, 032000 the first word of fixed bank 9.
        assert!(a.image_built());
        assert_eq!(Some(0o30123), a.image_word(8, 0o1777));
        assert_eq!(Some(0o30123), a.image_word(9, 0));
    }

    #[test]
    fn symbol_redefinition_warns_and_last_wins() {
        let a = assemble("FOO = 0111\nFOO = 0222\nSETLOC 4000\nTC FOO\n");

        let warnings: Vec<_> = a
            .problems()
            .iter()
            .filter(|p| p.kind == ProblemKind::Warning)
            .collect();
        assert_eq!(1, warnings.len());
        assert!(warnings[0].message.contains("re-defined"));
        assert_eq!(Some(0o0222), a.image_word(2, 0));
    }

    #[test]
    fn symbol_redefinition_same_value_is_silent() {
        let a = assemble("FOO = 0111\nFOO = 0111\n");
        assert_eq!(0, a.problems().len());
    }

    #[test]
    fn symbol_equals_spelling() {
        let a = assemble("FOO EQUALS 0333\nSETLOC 4000\nTC FOO\n");
        assert_eq!(0, a.problems().len());
        assert_eq!(Some(0o0333), a.image_word(2, 0));
    }

    #[test]
    fn forward_reference_resolves_in_pass_2() {
        let a = assemble("SETLOC 4000\nTCF LATER\nLATER TCF LATER\n");
        assert!(a.image_built(), "problems: {:?}", a.problems());
        assert_eq!(Some(0o14001), a.image_word(2, 0));
        assert_eq!(Some(0o14001), a.image_word(2, 1));
    }

    #[test]
    fn too_many_errors_aborts() {
        let src = "CA\n".repeat(20);
        let mut a = Assembler::new();
        let ok = a.assemble_source(&src, "fake_file.asm");

        assert!(!ok);
        assert_eq!(11, a.problems().len());
        assert_eq!(11, a.error_count());
        assert!(a.problems()[10]
            .message
            .contains("stopped due to too many errors"));
        assert!(!a.image_built());
    }

    #[test]
    fn unknown_instruction() {
        let a = assemble("SETLOC 4000\nLBL FROBNICATE 123\n");
        assert_eq!(1, a.error_count());
        assert!(a.problems()[0].message.contains("unknown instruction"));
    }

    #[test]
    fn label_with_undefined_location() {
        let a = assemble("START TCF START\n");
        assert!(a
            .problems()
            .iter()
            .any(|p| p.message.contains("location for label START is undefined")));
    }

    #[test]
    fn trailing_token_is_an_error() {
        let a = assemble("SETLOC 4000\nRELINT 0123\n");
        assert_eq!(1, a.error_count());
        assert!(a.problems()[0].message.contains("expected end of line"));
    }

    #[test]
    fn extend_prefix_state() {
        // QXCH is only valid right after EXTEND; the prefix arms the
        // extended table for exactly one instruction.
        let a = assemble("SETLOC 4000\nEXTEND\nQXCH 0100\nQXCH 0100\n");
        assert_eq!(1, a.error_count());
        assert!(a.problems()[0].message.contains("EXTEND"));
        assert_eq!(4, a.problems()[0].line);
    }

    #[test]
    fn noop_in_fixed_becomes_tcf_to_next() {
        let a = assemble("SETLOC 4000\nNOOP\n");
        assert!(a.image_built());
        assert_eq!(Some(0o010000 | 0o4001), a.image_word(2, 0));
    }

    #[test]
    fn dec_sign_pairs() {
        let a = assemble("SETLOC 4000\nDEC 5349\nDEC -5349\nDEC -0\n");
        assert!(a.image_built());
        let pos = a.image_word(2, 0).unwrap();
        let neg = a.image_word(2, 1).unwrap();
        assert_eq!(pos | 0o40000, neg);
        // Negative zero is distinct from positive zero.
        assert_eq!(Some(0o40000), a.image_word(2, 2));
    }

    #[test]
    fn empty_program_writes_zero_image() {
        let mut a = Assembler::new();
        let ok = a.assemble_source("", "fake_file.asm");
        assert!(ok);

        let mut out = Vec::new();
        a.write_out(&mut out).unwrap();
        assert_eq!(81_920, out.len());
        assert!(out.iter().all(|b| *b == 0));
    }

    #[test]
    fn write_out_without_image_fails() {
        let a = Assembler::new();
        let mut out = Vec::new();
        assert!(a.write_out(&mut out).is_err());
    }

    #[test]
    fn write_out_is_big_endian_in_bank_order() {
        let mut a = Assembler::new();
        let ok = a.assemble_source("SETLOC 20000\nOCT 52525\n", "fake_file.asm");
        assert!(ok);

        let mut out = Vec::new();
        a.write_out(&mut out).unwrap();
        assert_eq!(81_920, out.len());
        // 020000 is the start of fixed bank 4.
        let pos = 4 * ROM_BANK_SIZE * 2;
        assert_eq!(0o52525u16.to_be_bytes(), [out[pos], out[pos + 1]]);
    }

    #[test]
    fn unresolved_symbol_fails_pass_2() {
        let mut a = Assembler::new();
        let ok = a.assemble_source("SETLOC 4000\nTCF NOWHERE\n", "fake_file.asm");
        assert!(!ok);
        assert!(!a.image_built());
        assert!(a
            .problems()
            .iter()
            .any(|p| p.message.contains("symbol NOWHERE is undefined")));
    }

    #[test]
    fn writing_without_setloc_fails_pass_2() {
        // OCT with no location queues an emit that pass 2 cannot place.
        let mut a = Assembler::new();
        let ok = a.assemble_source("OCT 123\n", "fake_file.asm");
        assert!(!ok);
        assert!(a
            .problems()
            .iter()
            .any(|p| p.message.contains("writing to invalid address")));
    }

    #[test]
    fn writing_to_erasable_fails_pass_2() {
        let mut a = Assembler::new();
        let ok = a.assemble_source("SETLOC 1000\nOCT 123\n", "fake_file.asm");
        assert!(!ok);
        assert!(a
            .problems()
            .iter()
            .any(|p| p.message.contains("writing to erasable memory")));
    }

    #[test]
    fn end_of_erasable_diagnosed() {
        let a = assemble("SETLOC 3777\nTS 0100\nTS 0100\n");
        assert!(a
            .problems()
            .iter()
            .any(|p| p.message.contains("end of erasable memory")));
    }
}
