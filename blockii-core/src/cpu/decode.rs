use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Relint,
    Inhint,
    Tcf,
    Ca,
    Cs,
    Dxch,
    Ts,
}

#[derive(Debug)]
pub struct OpcodeDef {
    pub mnem: Mnemonic,
    pub name: &'static str,
    pub code: u16,
    pub mask: u16,
    pub timing: u32,
}

/// The decode table, ordered by ascending address mask so that a scan
/// returns the longest opcode prefix that matches. RELINT, INHINT and
/// friends are full-word codes that would otherwise decode as TC.
static OPCODES: &[OpcodeDef] = &[
    OpcodeDef {
        mnem: Mnemonic::Relint,
        name: "RELINT",
        code: 0o000003,
        mask: 0o00000,
        timing: 1,
    },
    OpcodeDef {
        mnem: Mnemonic::Inhint,
        name: "INHINT",
        code: 0o000004,
        mask: 0o00000,
        timing: 1,
    },
    OpcodeDef {
        mnem: Mnemonic::Dxch,
        name: "DXCH",
        code: 0o052001,
        mask: 0o01776,
        timing: 3,
    },
    OpcodeDef {
        mnem: Mnemonic::Ts,
        name: "TS",
        code: 0o054000,
        mask: 0o01777,
        timing: 2,
    },
    OpcodeDef {
        mnem: Mnemonic::Tcf,
        name: "TCF",
        code: 0o010000,
        mask: 0o07777,
        timing: 1,
    },
    OpcodeDef {
        mnem: Mnemonic::Ca,
        name: "CA",
        code: 0o030000,
        mask: 0o07777,
        timing: 2,
    },
    OpcodeDef {
        mnem: Mnemonic::Cs,
        name: "CS",
        code: 0o040000,
        mask: 0o07777,
        timing: 2,
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no instruction matches word {0:05o}")]
pub struct DecodeError(pub u16);

/// Splits a machine word into (instruction, operand). Each table entry
/// claims the word if the bits outside its address mask equal its code;
/// the table is ordered so the smallest mask wins.
pub fn decode(word: u16) -> Result<(&'static OpcodeDef, u16), DecodeError> {
    for def in OPCODES {
        let addr = word & def.mask;
        if def.code == word ^ addr {
            return Ok((def, addr));
        }
    }

    Err(DecodeError(word))
}
