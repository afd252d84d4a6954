//! Shared helpers for bridge tests.

use std::sync::Arc;

use sylva_core::{Language, RawLanguage, SymbolInfo};

/// Build a descriptor whose only content is token names. Symbol 0 must
/// be the EOF sentinel.
pub fn names_language(name: &str, tokens: &[(&str, bool)]) -> Arc<Language> {
    let symbols: Vec<SymbolInfo> = tokens
        .iter()
        .map(|&(token, named)| {
            if named {
                SymbolInfo::named(token)
            } else {
                SymbolInfo::anonymous(token)
            }
        })
        .collect();
    let raw = RawLanguage {
        name: name.to_owned(),
        token_count: symbols.len() as u16,
        state_count: 1,
        symbols,
        ..Default::default()
    };
    Arc::new(Language::from_raw(raw).expect("test fixture is valid"))
}
