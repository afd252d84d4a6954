//! JSON serialization for language descriptors.

use super::{Language, LanguageError, RawLanguage};

/// Error while decoding a serialized descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary decode error: {0}")]
    Binary(#[from] postcard::Error),

    #[error(transparent)]
    Language(#[from] LanguageError),
}

impl Language {
    /// Parse and validate a descriptor from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        let raw: RawLanguage = serde_json::from_str(json)?;
        Ok(Language::from_raw(raw)?)
    }

    /// Serialize the descriptor to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_raw()).expect("descriptor serialization")
    }
}
