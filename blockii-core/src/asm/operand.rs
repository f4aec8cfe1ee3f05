use std::collections::HashMap;

use crate::asm::problem::ProblemLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Octal,
    Decimal,
    Symbol,
}

/// A token made only of digits 0-7 is octal; digits with an 8 or 9
/// somewhere make it decimal; anything else is a symbol.
pub fn classify_token(token: &str) -> TokenKind {
    let mut dec_num = false;

    for c in token.chars() {
        if c.is_ascii_digit() {
            if c >= '8' {
                dec_num = true;
            }
        } else {
            return TokenKind::Symbol;
        }
    }

    if dec_num {
        TokenKind::Decimal
    } else {
        TokenKind::Octal
    }
}

/// Resolves an operand token to its value: octal literals parse in base
/// 8, symbols go through the table, and decimal literals are rejected
/// outright (they only mean something inside DEC directives).
pub fn resolve_operand(symbols: &HashMap<String, u16>, token: &str) -> Result<u16, String> {
    match classify_token(token) {
        TokenKind::Octal => u16::from_str_radix(token, 8)
            .map_err(|e| format!("unable to parse {} ({})", token, e)),
        TokenKind::Decimal => Err("decimal operands are not valid, use octal".to_string()),
        TokenKind::Symbol => symbols
            .get(token)
            .copied()
            .ok_or_else(|| format!("symbol {} is undefined", token)),
    }
}

/// Address classes an instruction operand may be required to fall in.
/// `validate` reports failures (and boundary warnings for the
/// double-precision classes) into the problem log and returns whether
/// the operand may be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandClass {
    AnyMemory,
    DoubleAnyMemory,
    Erasable,
    DoubleErasable,
    Channel,
    Fixed,
    TcTarget,
    IndexTarget,
}

impl OperandClass {
    pub fn validate(self, val: u16, operand: &str, inst: &str, log: &mut ProblemLog) -> bool {
        match self {
            OperandClass::AnyMemory => {
                if val > 0o7777 {
                    log.error(format!("{} is not a valid memory address", operand));
                    return false;
                }
                true
            }
            OperandClass::DoubleAnyMemory => {
                if val >= 0o7777 {
                    log.error(format!(
                        "{} is not a valid double-precision memory address",
                        operand
                    ));
                    return false;
                }
                if val == 0o1377 || val == 0o1777 || val == 0o3777 {
                    log.warning(format!(
                        "double-precision pair at {} crosses a bank boundary",
                        operand
                    ));
                }
                true
            }
            OperandClass::Erasable => {
                if val > 0o1777 {
                    log.error(format!("{} is not a valid erasable memory address", operand));
                    return false;
                }
                true
            }
            OperandClass::DoubleErasable => {
                if val >= 0o1777 {
                    log.error(format!(
                        "{} is not a valid double-precision erasable memory address",
                        operand
                    ));
                    return false;
                }
                if val == 0o1377 {
                    log.warning(format!(
                        "double-precision pair at {} crosses a bank boundary",
                        operand
                    ));
                }
                true
            }
            OperandClass::Channel => {
                if val > 0o777 {
                    log.error(format!("{} is not a valid I/O channel address", operand));
                    return false;
                }
                true
            }
            OperandClass::Fixed => {
                if val < 0o2000 || val > 0o7777 {
                    log.error(format!("{} is not a valid fixed memory address", operand));
                    return false;
                }
                true
            }
            OperandClass::TcTarget => {
                if !OperandClass::AnyMemory.validate(val, operand, inst, log) {
                    return false;
                }
                // 3, 4 and 6 decode as RELINT, INHINT and EXTEND.
                if val == 0o3 || val == 0o4 || val == 0o6 {
                    log.error(format!("{} is not a valid operand for {}", operand, inst));
                    return false;
                }
                true
            }
            OperandClass::IndexTarget => {
                if !OperandClass::Erasable.validate(val, operand, inst, log) {
                    return false;
                }
                // 017 is the resume vector.
                if val == 0o17 {
                    log.error(format!("{} is not a valid operand for {}", operand, inst));
                    return false;
                }
                true
            }
        }
    }
}
