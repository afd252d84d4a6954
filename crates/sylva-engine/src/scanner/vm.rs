//! Bytecode interpreter for external scanner programs.

use sylva_core::scanner::rune_class_of;
use sylva_core::{ProgramError, ScannerOp, ScannerProgram, Symbol};

use super::ScannerLexer;

/// Serialized scanner payload size in bytes.
pub const SCANNER_STATE_LEN: usize = 4;

/// Scanner payload: a single state word. Larger scanners would define
/// their own fixed-size layout; the driver treats the blob as opaque.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmPayload {
    state: u32,
}

impl VmPayload {
    pub fn state(&self) -> u32 {
        self.state
    }
}

/// Executes a validated [`ScannerProgram`]. Execution is step-bounded so
/// a malformed program cannot hang the parse.
#[derive(Debug, Clone)]
pub struct VmScanner {
    program: ScannerProgram,
}

impl VmScanner {
    /// Validate and wrap a program.
    pub fn new(program: ScannerProgram) -> Result<Self, ProgramError> {
        program.validate()?;
        Ok(Self { program })
    }

    /// Fresh zeroed payload.
    pub fn create(&self) -> VmPayload {
        VmPayload::default()
    }

    /// Write the payload into `buf`, returning the number of bytes
    /// written (0 when `buf` is too small).
    pub fn serialize(&self, payload: &VmPayload, buf: &mut [u8]) -> usize {
        if buf.len() < SCANNER_STATE_LEN {
            return 0;
        }
        buf[..SCANNER_STATE_LEN].copy_from_slice(&payload.state.to_le_bytes());
        SCANNER_STATE_LEN
    }

    /// Restore the payload from `buf`; short input resets to zero state.
    pub fn deserialize(&self, payload: &mut VmPayload, buf: &[u8]) {
        if buf.len() < SCANNER_STATE_LEN {
            payload.state = 0;
            return;
        }
        let mut bytes = [0u8; SCANNER_STATE_LEN];
        bytes.copy_from_slice(&buf[..SCANNER_STATE_LEN]);
        payload.state = u32::from_le_bytes(bytes);
    }

    /// Execute the program against the lexer position. Returns `true`
    /// when a token was emitted; the step budget exhausting counts as a
    /// failed scan.
    pub fn scan(
        &self,
        payload: &mut VmPayload,
        lexer: &mut ScannerLexer<'_>,
        valid_symbols: &[bool],
    ) -> bool {
        let code = &self.program.code;
        if code.is_empty() {
            return false;
        }

        let mut state = payload.state;
        let max_steps = self.program.effective_max_steps();
        let mut pc = 0usize;

        for _ in 0..max_steps {
            let Some(ins) = code.get(pc) else {
                payload.state = state;
                return false;
            };
            match ins.op {
                ScannerOp::Fail => {
                    payload.state = state;
                    return false;
                }
                ScannerOp::Jump => pc = ins.a as usize,
                ScannerOp::RequireValid => {
                    let idx = ins.a as usize;
                    if valid_symbols.get(idx).copied().unwrap_or(false) {
                        pc += 1;
                    } else {
                        pc = ins.alt as usize;
                    }
                }
                ScannerOp::RequireStateEq => {
                    if state == ins.a as u32 {
                        pc += 1;
                    } else {
                        pc = ins.alt as usize;
                    }
                }
                ScannerOp::SetState => {
                    state = ins.a as u32;
                    pc += 1;
                }
                ScannerOp::IfRuneEq => {
                    let hit = match (lexer.lookahead(), char::from_u32(ins.a as u32)) {
                        (Some(c), Some(target)) => c == target,
                        _ => false,
                    };
                    if hit {
                        pc += 1;
                    } else {
                        pc = ins.alt as usize;
                    }
                }
                ScannerOp::IfRuneInRange => {
                    let hit = lexer
                        .lookahead()
                        .is_some_and(|c| (ins.a..=ins.b).contains(&(c as i32)));
                    if hit {
                        pc += 1;
                    } else {
                        pc = ins.alt as usize;
                    }
                }
                ScannerOp::IfRuneClass => {
                    let class = rune_class_of(ins);
                    if lexer.lookahead().is_some_and(|c| class.matches(c)) {
                        pc += 1;
                    } else {
                        pc = ins.alt as usize;
                    }
                }
                ScannerOp::Advance => {
                    lexer.advance(ins.a != 0);
                    pc += 1;
                }
                ScannerOp::MarkEnd => {
                    lexer.mark_end();
                    pc += 1;
                }
                ScannerOp::Emit => {
                    lexer.set_result_symbol(ins.a as Symbol);
                    payload.state = state;
                    return true;
                }
            }
        }

        // Step budget hit: treat as a failed scan so runaway programs
        // terminate.
        payload.state = state;
        false
    }
}
