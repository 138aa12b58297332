//! Key Validation Module
//!
//! Shape and length rules shared by every store.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, StoreError};

// == Public Constants ==
/// Maximum allowed key length in characters
pub const MAX_KEY_LENGTH: usize = 256;

static KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9/_\-:.]+$").expect("key pattern is a valid regex")
});

// == Is Valid Key ==
/// Checks a key against the length limit, the allowed alphabet and the
/// no-leading-slash rule.
pub fn is_valid_key(key: &str) -> bool {
    // Unicode case folding would let e.g. the Kelvin sign through.
    key.is_ascii()
        && key.len() <= MAX_KEY_LENGTH
        && !key.starts_with('/')
        && KEY_PATTERN.is_match(key)
}

// == Validate Key ==
/// Same as [`is_valid_key`] but yields [`StoreError::InvalidKey`].
pub fn validate_key(key: &str) -> Result<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
