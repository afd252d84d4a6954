//! Compact binary serialization for language descriptors using postcard.

use super::json::DecodeError;
use super::{Language, RawLanguage};

impl Language {
    /// Decode and validate a descriptor from the binary format.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, DecodeError> {
        let raw: RawLanguage = postcard::from_bytes(bytes)?;
        Ok(Language::from_raw(raw)?)
    }

    /// Serialize the descriptor to the binary format.
    pub fn to_binary(&self) -> Vec<u8> {
        postcard::to_allocvec(&self.to_raw()).expect("descriptor serialization")
    }
}
