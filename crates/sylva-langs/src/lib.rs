//! Hand-written token sources for grammars whose lexical behavior the
//! static DFA cannot express, plus the per-language parse-backend
//! registry.
//!
//! Each bridge resolves grammar symbol ids by their grammar-defined
//! names through [`TokenLookup`]; construction fails when required
//! names are missing, and the `*_or_eof` constructors degrade to an
//! EOF-only sentinel source instead of failing.

mod cursor;
mod generic;
mod html;
mod lookup;
mod registry;
mod toml;

#[cfg(test)]
mod generic_tests;
#[cfg(test)]
mod test_support;
#[cfg(test)]
mod registry_tests;
#[cfg(test)]
mod toml_tests;

pub use generic::GenericTokenSource;
pub use html::HtmlTokenSource;
pub use lookup::{LexerError, TokenLookup};
pub use registry::{LangEntry, ParseBackend, Registry, SupportReport, TokenSourceFactory};
pub use toml::TomlTokenSource;
