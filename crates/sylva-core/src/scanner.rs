//! External scanner program format.
//!
//! Grammars whose lexical behavior cannot be expressed by the static DFA
//! ship a small bytecode program executed by the engine's scanner VM.
//! The format and its validation live here; the interpreter lives in
//! `sylva-engine`.

use serde::{Deserialize, Serialize};

use crate::Symbol;

/// Opcode for the external scanner VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScannerOp {
    /// Abort the scan with no token.
    Fail,
    /// Unconditional jump to instruction `a`.
    Jump,
    /// Continue if valid-symbol slot `a` is set, else jump to `alt`.
    RequireValid,
    /// Continue if the state word equals `a`, else jump to `alt`.
    RequireStateEq,
    /// Store `a` into the state word.
    SetState,
    /// Continue if the lookahead rune equals `a`, else jump to `alt`.
    IfRuneEq,
    /// Continue if the lookahead rune is in `[a, b]`, else jump to `alt`.
    IfRuneInRange,
    /// Continue if the lookahead rune is in class `a`, else jump to `alt`.
    IfRuneClass,
    /// Consume the lookahead rune; `a != 0` skips it (token start moves).
    Advance,
    /// Record the current position as the token end.
    MarkEnd,
    /// Succeed, emitting symbol `a`.
    Emit,
}

/// Character class tested by [`ScannerOp::IfRuneClass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuneClass {
    Whitespace,
    Digit,
    Letter,
    Word,
    Newline,
}

impl Default for ScannerOp {
    fn default() -> Self {
        ScannerOp::Fail
    }
}

impl RuneClass {
    pub fn matches(self, c: char) -> bool {
        match self {
            RuneClass::Whitespace => c.is_whitespace(),
            RuneClass::Digit => c.is_ascii_digit(),
            RuneClass::Letter => c.is_alphabetic(),
            RuneClass::Word => c == '_' || c.is_alphabetic() || c.is_ascii_digit(),
            RuneClass::Newline => c == '\n',
        }
    }

    fn from_operand(value: i32) -> Option<Self> {
        match value {
            0 => Some(RuneClass::Whitespace),
            1 => Some(RuneClass::Digit),
            2 => Some(RuneClass::Letter),
            3 => Some(RuneClass::Word),
            4 => Some(RuneClass::Newline),
            _ => None,
        }
    }
}

/// One scanner instruction.
///
/// Operands:
/// - `a`: primary operand (opcode-specific)
/// - `b`: secondary operand (range upper bound)
/// - `alt`: alternate program counter when a condition fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerInstr {
    pub op: ScannerOp,
    #[serde(default)]
    pub a: i32,
    #[serde(default)]
    pub b: i32,
    #[serde(default)]
    pub alt: i32,
}

/// A flat scanner program plus its step budget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerProgram {
    pub code: Vec<ScannerInstr>,
    /// 0 uses a safe default based on program size.
    #[serde(default)]
    pub max_steps: u32,
}

/// Scanner program validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    #[error("empty program")]
    Empty,

    #[error("instruction {index} invalid {operand} target {target} (code len {code_len})")]
    BadTarget {
        index: usize,
        operand: &'static str,
        target: i32,
        code_len: usize,
    },

    #[error("instruction {index} invalid rune range [{lo}, {hi}]")]
    InvertedRange { index: usize, lo: i32, hi: i32 },

    #[error("instruction {index} invalid rune class {value}")]
    BadRuneClass { index: usize, value: i32 },

    #[error("instruction {index} invalid valid-symbol index {value}")]
    BadSymbolIndex { index: usize, value: i32 },

    #[error("instruction {index} invalid state value {value}")]
    BadStateValue { index: usize, value: i32 },
}

impl ScannerProgram {
    pub fn new(code: Vec<ScannerInstr>) -> Self {
        Self { code, max_steps: 0 }
    }

    /// Effective step budget: `max(64, 16 * code_len)` unless overridden.
    pub fn effective_max_steps(&self) -> u32 {
        if self.max_steps > 0 {
            return self.max_steps;
        }
        ((self.code.len() as u32) * 16).max(64)
    }

    /// Reject unknown control-flow targets, inverted ranges, and negative
    /// symbol/state operands.
    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.code.is_empty() {
            return Err(ProgramError::Empty);
        }
        let code_len = self.code.len();
        for (index, ins) in self.code.iter().enumerate() {
            match ins.op {
                ScannerOp::Fail | ScannerOp::MarkEnd | ScannerOp::Advance => {}
                ScannerOp::Jump => check_target(index, "a", ins.a, code_len)?,
                ScannerOp::RequireValid => {
                    if ins.a < 0 {
                        return Err(ProgramError::BadSymbolIndex {
                            index,
                            value: ins.a,
                        });
                    }
                    check_target(index, "alt", ins.alt, code_len)?;
                }
                ScannerOp::RequireStateEq => {
                    if ins.a < 0 {
                        return Err(ProgramError::BadStateValue {
                            index,
                            value: ins.a,
                        });
                    }
                    check_target(index, "alt", ins.alt, code_len)?;
                }
                ScannerOp::SetState => {
                    if ins.a < 0 {
                        return Err(ProgramError::BadStateValue {
                            index,
                            value: ins.a,
                        });
                    }
                }
                ScannerOp::IfRuneEq => check_target(index, "alt", ins.alt, code_len)?,
                ScannerOp::IfRuneInRange => {
                    if ins.b < ins.a {
                        return Err(ProgramError::InvertedRange {
                            index,
                            lo: ins.a,
                            hi: ins.b,
                        });
                    }
                    check_target(index, "alt", ins.alt, code_len)?;
                }
                ScannerOp::IfRuneClass => {
                    if RuneClass::from_operand(ins.a).is_none() {
                        return Err(ProgramError::BadRuneClass {
                            index,
                            value: ins.a,
                        });
                    }
                    check_target(index, "alt", ins.alt, code_len)?;
                }
                ScannerOp::Emit => {}
            }
        }
        Ok(())
    }
}

fn check_target(
    index: usize,
    operand: &'static str,
    target: i32,
    code_len: usize,
) -> Result<(), ProgramError> {
    if target < 0 || target as usize >= code_len {
        return Err(ProgramError::BadTarget {
            index,
            operand,
            target,
            code_len,
        });
    }
    Ok(())
}

// Instruction builders, mirroring the shape programs are written in.

pub fn fail() -> ScannerInstr {
    ScannerInstr {
        op: ScannerOp::Fail,
        ..Default::default()
    }
}

pub fn jump(target: i32) -> ScannerInstr {
    ScannerInstr {
        op: ScannerOp::Jump,
        a: target,
        ..Default::default()
    }
}

pub fn require_valid(symbol_index: i32, alt: i32) -> ScannerInstr {
    ScannerInstr {
        op: ScannerOp::RequireValid,
        a: symbol_index,
        alt,
        ..Default::default()
    }
}

pub fn require_state_eq(state: u32, alt: i32) -> ScannerInstr {
    ScannerInstr {
        op: ScannerOp::RequireStateEq,
        a: state as i32,
        alt,
        ..Default::default()
    }
}

pub fn set_state(state: u32) -> ScannerInstr {
    ScannerInstr {
        op: ScannerOp::SetState,
        a: state as i32,
        ..Default::default()
    }
}

pub fn if_rune_eq(r: char, alt: i32) -> ScannerInstr {
    ScannerInstr {
        op: ScannerOp::IfRuneEq,
        a: r as i32,
        alt,
        ..Default::default()
    }
}

pub fn if_rune_in_range(lo: char, hi: char, alt: i32) -> ScannerInstr {
    ScannerInstr {
        op: ScannerOp::IfRuneInRange,
        a: lo as i32,
        b: hi as i32,
        alt,
        ..Default::default()
    }
}

pub fn if_rune_class(class: RuneClass, alt: i32) -> ScannerInstr {
    ScannerInstr {
        op: ScannerOp::IfRuneClass,
        a: class as i32,
        alt,
        ..Default::default()
    }
}

pub fn advance(skip: bool) -> ScannerInstr {
    ScannerInstr {
        op: ScannerOp::Advance,
        a: skip as i32,
        ..Default::default()
    }
}

pub fn mark_end() -> ScannerInstr {
    ScannerInstr {
        op: ScannerOp::MarkEnd,
        ..Default::default()
    }
}

pub fn emit(symbol: Symbol) -> ScannerInstr {
    ScannerInstr {
        op: ScannerOp::Emit,
        a: symbol as i32,
        ..Default::default()
    }
}

/// Decode the class operand of a validated `IfRuneClass` instruction.
pub fn rune_class_of(ins: &ScannerInstr) -> RuneClass {
    RuneClass::from_operand(ins.a).expect("rune class validated at construction")
}
