//! Incremental, error-tolerant GLR parsing runtime.
//!
//! The engine consumes a validated [`sylva_core::Language`] descriptor and
//! a byte buffer, producing a concrete syntax tree with byte-accurate
//! spans, row/column points, and error/missing markers. The dominant
//! workload is re-parsing after small edits: the driver grafts intact
//! subtrees from the previous tree wherever parser-state invariants allow.
//!
//! Entry points: [`Parser::parse`], [`Parser::parse_incremental`], and the
//! `_with_token_source` variants for grammars with hand-written lexers.

mod arena;
mod node;
mod parser;
mod scanner;
mod token_source;
mod tree;

#[cfg(test)]
mod test_language;

pub use node::Node;
pub use parser::Parser;
pub use scanner::{ScannerLexer, VmPayload, VmScanner, SCANNER_STATE_LEN};
pub use token_source::{DfaTokenSource, EofTokenSource, TokenSource};
pub use tree::Tree;
