use crate::asm::operand::OperandClass;
use crate::asm::problem::ProblemLog;
use crate::asm::pseudo::PseudoAddress;

/// How an instruction turns into a machine word. Almost everything is
/// opcode-plus-operand; NOOP picks its replacement from where it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Opcode(u16),
    Noop,
}

#[derive(Debug)]
pub struct InstructionDef {
    pub name: &'static str,
    pub encoding: Encoding,
    pub operand: Option<OperandClass>,
    pub set_extend: bool,
}

const fn plain(name: &'static str, opcode: u16) -> InstructionDef {
    InstructionDef {
        name,
        encoding: Encoding::Opcode(opcode),
        operand: None,
        set_extend: false,
    }
}

const fn with_operand(name: &'static str, opcode: u16, class: OperandClass) -> InstructionDef {
    InstructionDef {
        name,
        encoding: Encoding::Opcode(opcode),
        operand: Some(class),
        set_extend: false,
    }
}

pub static STANDARD_INSTRUCTIONS: &[InstructionDef] = &[
    with_operand("TC", 0o000000, OperandClass::TcTarget),
    plain("RELINT", 0o000003),
    plain("INHINT", 0o000004),
    InstructionDef {
        name: "EXTEND",
        encoding: Encoding::Opcode(0o000006),
        operand: None,
        set_extend: true,
    },
    with_operand("CCS", 0o010000, OperandClass::Erasable),
    with_operand("TCF", 0o010000, OperandClass::Fixed),
    with_operand("DAS", 0o020001, OperandClass::DoubleErasable),
    with_operand("LXCH", 0o022000, OperandClass::Erasable),
    with_operand("INCR", 0o024000, OperandClass::Erasable),
    with_operand("ADS", 0o026000, OperandClass::Erasable),
    with_operand("CA", 0o030000, OperandClass::AnyMemory),
    with_operand("CS", 0o040000, OperandClass::AnyMemory),
    with_operand("INDEX", 0o050000, OperandClass::IndexTarget),
    plain("RESUME", 0o050017),
    with_operand("DXCH", 0o052001, OperandClass::DoubleErasable),
    with_operand("TS", 0o054000, OperandClass::Erasable),
    with_operand("XCH", 0o056000, OperandClass::Erasable),
    with_operand("AD", 0o060000, OperandClass::AnyMemory),
    with_operand("MASK", 0o070000, OperandClass::AnyMemory),
    // Implied-address codes.
    plain("XXALQ", 0o000000),  // TC A
    plain("XLQ", 0o000001),    // TC L
    plain("RETURN", 0o000002), // TC Q
    InstructionDef {
        name: "NOOP",
        encoding: Encoding::Noop,
        operand: None,
        set_extend: false,
    },
    plain("DDOUBL", 0o020001), // DAS A
    plain("ZL", 0o022007),     // LXCH 7
    plain("COM", 0o040000),    // CS A
    plain("DTCF", 0o052005),   // DXCH FB
    plain("DTCB", 0o052006),   // DXCH Z
    plain("OVSK", 0o054000),   // TS A
    plain("TCAA", 0o054005),   // TS Z
    plain("DOUBLE", 0o060000), // AD A
];

pub static EXTENDED_INSTRUCTIONS: &[InstructionDef] = &[
    with_operand("READ", 0o000000, OperandClass::Channel),
    with_operand("WRITE", 0o001000, OperandClass::Channel),
    with_operand("RAND", 0o002000, OperandClass::Channel),
    with_operand("WAND", 0o003000, OperandClass::Channel),
    with_operand("ROR", 0o004000, OperandClass::Channel),
    with_operand("WOR", 0o005000, OperandClass::Channel),
    with_operand("RXOR", 0o006000, OperandClass::Channel),
    with_operand("EDRUPT", 0o007000, OperandClass::Channel),
    with_operand("DV", 0o010000, OperandClass::Erasable),
    with_operand("BZF", 0o010000, OperandClass::Fixed),
    with_operand("MSU", 0o020000, OperandClass::Erasable),
    with_operand("QXCH", 0o022000, OperandClass::Erasable),
    with_operand("AUG", 0o024000, OperandClass::Erasable),
    with_operand("DIM", 0o026000, OperandClass::Erasable),
    with_operand("DCA", 0o030001, OperandClass::DoubleAnyMemory),
    with_operand("DCS", 0o040001, OperandClass::DoubleAnyMemory),
    InstructionDef {
        name: "INDEX",
        encoding: Encoding::Opcode(0o050000),
        operand: Some(OperandClass::AnyMemory),
        set_extend: true,
    },
    with_operand("SU", 0o060000, OperandClass::Erasable),
    with_operand("BZMF", 0o060000, OperandClass::Fixed),
    with_operand("MP", 0o070000, OperandClass::AnyMemory),
    // Implied-address codes.
    plain("ZQ", 0o022007),     // QXCH 7
    plain("DCOM", 0o040001),   // DCS A
    plain("SQUARE", 0o070000), // MP A
];

/// Folds the historical pseudonyms onto their canonical mnemonics.
pub fn resolve_alias(name: &str) -> &str {
    match name {
        "TCR" => "TC",
        "CAF" => "CA",
        "CAE" => "CA",
        "NDX" => "INDEX",
        "MSK" => "MASK",
        _ => name,
    }
}

fn lookup(table: &'static [InstructionDef], name: &str) -> Option<&'static InstructionDef> {
    table.iter().find(|i| i.name == name)
}

/// Looks a mnemonic up against the current EXTEND state. A mnemonic
/// found only in the other table is still returned so assembly can
/// continue, but the mismatch is an error.
pub fn find_instruction(
    token: &str,
    extended: bool,
    log: &mut ProblemLog,
) -> Option<&'static InstructionDef> {
    let name = resolve_alias(token);

    if !extended {
        if let Some(inst) = lookup(STANDARD_INSTRUCTIONS, name) {
            return Some(inst);
        }
        if let Some(inst) = lookup(EXTENDED_INSTRUCTIONS, name) {
            log.error(format!("{} must be preceded by an EXTEND instruction", token));
            return Some(inst);
        }
    } else {
        if let Some(inst) = lookup(EXTENDED_INSTRUCTIONS, name) {
            return Some(inst);
        }
        if let Some(inst) = lookup(STANDARD_INSTRUCTIONS, name) {
            log.error(format!("{} is not an EXTEND instruction", token));
            return Some(inst);
        }
    }

    None
}

/// NOOP replacement: in erasable memory it becomes CA A, in fixed
/// memory a TCF to the next location. At the very end of fixed memory
/// there is no next location to jump to.
pub fn encode_noop(location: PseudoAddress, inst: &str, log: &mut ProblemLog) -> Option<u16> {
    if location.is_erasable() {
        return Some(0o030000);
    }

    match location.next_valid() {
        Ok(next) => Some(0o010000 | next.as_operand()),
        Err(_) => {
            log.error(format!(
                "cannot implement {} at the end of fixed memory",
                inst
            ));
            None
        }
    }
}
