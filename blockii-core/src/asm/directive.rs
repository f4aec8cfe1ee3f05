use super::operand::{classify_token, resolve_operand, TokenKind};
use super::problem::ProblemLog;
use super::pseudo::PseudoAddress;
use super::scanner::TokenScanner;
use super::{Assembler, Deferred, EmitOp};
use crate::consts::NEG_ZERO;

impl Assembler {
    /// SETLOC moves the location counter. It takes effect immediately so
    /// labels and bank diagnostics on the following lines see the new
    /// location, and is queued so pass 2 replays the same move.
    pub(super) fn directive_setloc(&mut self, sp: &mut TokenScanner) {
        let operand = match sp.consume() {
            Some(t) => t,
            None => {
                self.log.error("operand expected but none found");
                return;
            }
        };

        let val = match resolve_operand(&self.symbols, &operand) {
            Ok(v) => v,
            Err(msg) => {
                self.log.error(msg);
                return;
            }
        };

        let new_loc = PseudoAddress(val);
        if !new_loc.is_valid() {
            self.log
                .error(format!("{} is not a valid pseudo-address", operand));
            return;
        }

        self.set_location(new_loc);
        self.ops.push(Deferred::SetLoc(new_loc));
    }

    /// OCT reserves one word holding a literal octal value.
    pub(super) fn directive_oct(&mut self, sp: &mut TokenScanner) {
        let operand = match sp.consume() {
            Some(t) => t,
            None => {
                self.log.error("operand expected but none found");
                return;
            }
        };

        if classify_token(&operand) != TokenKind::Octal {
            self.log
                .error(format!("{} is not a valid octal value", operand));
            return;
        }

        let val = match u16::from_str_radix(&operand, 8) {
            Ok(v) if v <= 0o77777 => v,
            _ => {
                self.log
                    .error(format!("{} does not fit in a machine word", operand));
                return;
            }
        };

        self.require_location();
        let line = self.log.line();
        self.ops.push(Deferred::Emit {
            line,
            op: EmitOp::Word(val),
        });
        self.inc_location();
    }

    /// DEC and 2DEC convert a decimal value to one's-complement scaled
    /// fraction words. DEC keeps the high word only, 2DEC both.
    pub(super) fn directive_dec(&mut self, sp: &mut TokenScanner, double: bool) {
        let (h, l) = match try_parse_dec(sp, &mut self.log, double) {
            Some(pair) => pair,
            None => return,
        };

        self.require_location();
        let line = self.log.line();
        if double {
            self.ops.push(Deferred::Emit {
                line,
                op: EmitOp::Pair(h, l),
            });
            self.inc_location();
            self.inc_location();
        } else {
            self.ops.push(Deferred::Emit {
                line,
                op: EmitOp::Word(h),
            });
            self.inc_location();
        }
    }
}

/// Parses a DEC/2DEC operand into (high, low) one's-complement words.
///
/// A bare integer (no `.`, no scale tokens) is taken literally: as the
/// 14-bit high word for DEC, as a 28-bit magnitude for 2DEC. Anything
/// with a decimal point or trailing `E<n>` / `B<n>` scale tokens is a
/// real number: the scales multiply in order and the result is a
/// fraction of 2^28, rounded to the nearest integer magnitude.
pub(super) fn try_parse_dec(
    sp: &mut TokenScanner,
    log: &mut ProblemLog,
    double: bool,
) -> Option<(u16, u16)> {
    let number = match sp.consume() {
        Some(t) => t,
        None => {
            log.error("operand expected but none found");
            return None;
        }
    };

    let mut scales = Vec::new();
    while let Some(t) = sp.consume() {
        scales.push(t);
    }

    // The sign has to come from the token; a parsed -0 forgets it.
    let neg = number.starts_with('-');

    if !number.contains('.') && scales.is_empty() {
        let i = match number.parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                log.error(format!("unable to parse {}", number));
                return None;
            }
        };

        let mut mag = i.unsigned_abs();
        let limit = if double { 1u64 << 28 } else { 1u64 << 14 };
        if mag >= limit {
            log.error(format!("{} is out of range", number));
            return None;
        }
        if !double {
            mag <<= 14;
        }

        return Some(split_magnitude(mag as u32, neg));
    }

    let mut value = match number.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            log.error(format!("unable to parse {}", number));
            return None;
        }
    };

    for scale in &scales {
        if let Some(exp) = scale.strip_prefix('E') {
            match exp.parse::<i32>() {
                Ok(e) => value *= 10f64.powi(e),
                Err(_) => {
                    log.error(format!("invalid scale token {}", scale));
                    return None;
                }
            }
        } else if let Some(exp) = scale.strip_prefix('B') {
            match exp.parse::<i32>() {
                Ok(e) => value *= 2f64.powi(e),
                Err(_) => {
                    log.error(format!("invalid scale token {}", scale));
                    return None;
                }
            }
        } else {
            log.error(format!("invalid scale token {}", scale));
            return None;
        }
    }

    let neg = neg || value.is_sign_negative();
    let mag = (value.abs() * (1u32 << 28) as f64).round() as u64;
    if mag >= 1 << 28 {
        log.error(format!("{} is out of range", number));
        return None;
    }

    Some(split_magnitude(mag as u32, neg))
}

fn split_magnitude(mag: u32, neg: bool) -> (u16, u16) {
    let sign = if neg { NEG_ZERO } else { 0 };
    let h = ((mag >> 14) & 0x3FFF) as u16 | sign;
    let l = (mag & 0x3FFF) as u16 | sign;
    (h, l)
}

#[cfg(test)]
mod directive_tests {
    use super::super::problem::ProblemKind;
    use super::super::Assembler;
    use super::*;

    fn parse_dec(line: &str, double: bool) -> (Option<(u16, u16)>, ProblemLog) {
        let mut sp = TokenScanner::new(line);
        let mut log = ProblemLog::new("fake_file.asm");
        log.set_line(1);
        let res = try_parse_dec(&mut sp, &mut log, double);
        (res, log)
    }

    fn expect_dec(line: &str, double: bool) -> (u16, u16) {
        let (res, log) = parse_dec(line, double);
        assert_eq!(0, log.problems().len(), "line {:?}: {:?}", line, log.problems());
        res.unwrap()
    }

    fn expect_dec_error(line: &str, double: bool) {
        let (res, log) = parse_dec(line, double);
        assert!(res.is_none(), "line {:?} should not parse", line);
        assert_eq!(1, log.problems().len(), "line {:?}", line);
        assert_eq!(ProblemKind::Error, log.problems()[0].kind);
    }

    #[test]
    fn dec_positive_integer() {
        assert_eq!((0o12345, 0), expect_dec("5349", false));
    }

    #[test]
    fn dec_negative_integer() {
        assert_eq!((0o12345 | NEG_ZERO, NEG_ZERO), expect_dec("-5349", false));
    }

    #[test]
    fn dec2_integers() {
        // 87641674 = 5349 << 14 | 3658: the 28-bit magnitude splits into
        // high word 0o12345 and low word 0o7112.
        let (h, l) = expect_dec("87641674", true);
        assert_eq!(0o12345, h);
        assert_eq!(0o7112, l);

        let (h, l) = expect_dec("-87641674", true);
        assert_eq!(0o12345 | NEG_ZERO, h);
        assert_eq!(0o7112 | NEG_ZERO, l);
    }

    #[test]
    fn dec_negative_zero() {
        assert_eq!((NEG_ZERO, NEG_ZERO), expect_dec("-0", false));
        assert_eq!((NEG_ZERO, NEG_ZERO), expect_dec("-0", true));
        assert_eq!((NEG_ZERO, NEG_ZERO), expect_dec("-0.", false));
    }

    #[test]
    fn dec_integer_range() {
        expect_dec("16383", false);
        expect_dec_error("16384", false);
        expect_dec_error("-16384", false);

        expect_dec("268435455", true);
        expect_dec_error("268435456", true);
        expect_dec_error("-268435456", true);
    }

    #[test]
    fn dec_integer_garbage() {
        expect_dec_error("123FOOBAR678", false);
    }

    #[test]
    fn dec_float_plain() {
        assert_eq!((0o30000, 0), expect_dec("0.75", false));
        assert_eq!((0o30000 | NEG_ZERO, NEG_ZERO), expect_dec("-0.75", false));
    }

    #[test]
    fn dec_float_zero_exponents() {
        assert_eq!((0o30000, 0), expect_dec("0.75 E0 B0", false));
        assert_eq!((0o30000 | NEG_ZERO, NEG_ZERO), expect_dec("-0.75 E0 B0", false));
    }

    #[test]
    fn dec_float_decimal_exponent() {
        assert_eq!((0o30000, 0), expect_dec("75 E-2", false));
        assert_eq!((0o30000 | NEG_ZERO, NEG_ZERO), expect_dec("-75 E-2", false));
    }

    #[test]
    fn dec_float_binary_exponent() {
        assert_eq!((0o30000, 0), expect_dec("3 B-2", false));
        assert_eq!((0o30000 | NEG_ZERO, NEG_ZERO), expect_dec("-3 B-2", false));
    }

    #[test]
    fn dec_float_both_exponents() {
        assert_eq!((0o30000, 0), expect_dec("300 E-2 B-2", false));
        assert_eq!((0o30000 | NEG_ZERO, NEG_ZERO), expect_dec("-300 E-2 B-2", false));
    }

    #[test]
    fn dec_float_tiny() {
        assert_eq!((0, 1), expect_dec("1 B-28", false));
        assert_eq!((NEG_ZERO, 1 | NEG_ZERO), expect_dec("-1 B-28", false));
    }

    #[test]
    fn dec_float_unity_is_out_of_range() {
        expect_dec_error("50.0 E-2 B1", false);
        expect_dec_error("-1.0", false);
    }

    #[test]
    fn dec_float_garbage() {
        expect_dec_error("1.0FOOBAR123", false);
    }

    #[test]
    fn dec_scale_token_garbage() {
        expect_dec_error("0.75 Q2", false);
        expect_dec_error("0.75 E2FOO", false);
        expect_dec_error("0.75 B2FOO", false);
    }

    #[test]
    fn dec_missing_operand() {
        let (res, log) = parse_dec("", false);
        assert!(res.is_none());
        assert_eq!(1, log.error_count());
    }

    #[test]
    fn setloc_rejects_invalid_pseudo_address() {
        let mut a = Assembler::new();
        let ok = a.assemble_source("SETLOC 14000\n", "fake_file.asm");
        assert!(!ok);
        assert_eq!(1, a.error_count());
        assert!(a.problems()[0]
            .message
            .contains("is not a valid pseudo-address"));
    }

    #[test]
    fn setloc_accepts_symbols() {
        let mut a = Assembler::new();
        let ok = a.assemble_source("ORG = 4000\nSETLOC ORG\nOCT 1\n", "fake_file.asm");
        assert!(ok, "problems: {:?}", a.problems());
        assert_eq!(Some(0o1), a.image_word(2, 0));
    }

    #[test]
    fn oct_rejects_decimal_token() {
        let mut a = Assembler::new();
        a.assemble_source("SETLOC 4000\nOCT 1289\n", "fake_file.asm");
        assert_eq!(1, a.error_count());
    }

    #[test]
    fn oct_rejects_oversized_values() {
        for src in ["SETLOC 4000\nOCT 100000\n", "SETLOC 4000\nOCT 7654321\n"].iter() {
            let mut a = Assembler::new();
            a.assemble_source(src, "fake_file.asm");
            assert_eq!(1, a.error_count(), "source {:?}", src);
        }
    }

    #[test]
    fn oct_missing_operand() {
        let mut a = Assembler::new();
        a.assemble_source("SETLOC 4000\nOCT \n", "fake_file.asm");
        assert_eq!(1, a.error_count());
    }

    #[test]
    fn dec2_emits_both_words() {
        let mut a = Assembler::new();
        let ok = a.assemble_source(
            "SETLOC 4000\n2DEC 87641674\nOCT 77777\n",
            "fake_file.asm",
        );
        assert!(ok, "problems: {:?}", a.problems());
        assert_eq!(Some(0o12345), a.image_word(2, 0));
        assert_eq!(Some(0o7112), a.image_word(2, 1));
        assert_eq!(Some(0o77777), a.image_word(2, 2));
    }

    #[test]
    fn dec_advances_location_once() {
        let mut a = Assembler::new();
        let ok = a.assemble_source("SETLOC 4000\nDEC 1\nOCT 77777\n", "fake_file.asm");
        assert!(ok);
        assert_eq!(Some(0o1), a.image_word(2, 0));
        assert_eq!(Some(0o77777), a.image_word(2, 1));
    }
}
