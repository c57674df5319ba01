//! Table name guard.
//!
//! The table name is the one value that cannot be bound as a statement
//! parameter, so it is restricted to a plain identifier before being
//! spliced into SQL text.

use crate::error::StoreError;

const MAX_IDENT_LEN: usize = 63;

/// Validate a table name for direct interpolation.
pub fn validate_table(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if head_ok
        && name.len() <= MAX_IDENT_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(StoreError::BadTable(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifiers_pass() {
        assert!(validate_table("tsindex").is_ok());
        assert!(validate_table("_tsindex_2").is_ok());
    }

    #[test]
    fn injection_shapes_fail() {
        assert!(validate_table("").is_err());
        assert!(validate_table("ts index").is_err());
        assert!(validate_table("t;DROP TABLE x").is_err());
        assert!(validate_table("2fast").is_err());
        assert!(validate_table(&"x".repeat(64)).is_err());
    }
}
