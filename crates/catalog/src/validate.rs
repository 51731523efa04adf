//! Shared field rules for registry records.

use partstock_core::{DomainError, DomainResult};

/// Trim and length-check a display name.
pub(crate) fn name(field: &str, raw: &str, min: usize, max: usize) -> DomainResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(DomainError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Uppercase alphanumeric-with-hyphens codes (`^[A-Z0-9-]+$`).
pub(crate) fn code(field: &str, raw: &str, min: usize, max: usize) -> DomainResult<String> {
    let len = raw.chars().count();
    if len < min || len > max {
        return Err(DomainError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(DomainError::validation(format!(
            "{field} must be uppercase alphanumeric with hyphens only"
        )));
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_before_length_check() {
        assert_eq!(name("name", "  Main  ", 3, 10).unwrap(), "Main");
        assert!(name("name", "  ab  ", 3, 10).is_err());
    }

    #[test]
    fn code_rejects_lowercase_and_spaces() {
        assert!(code("code", "WH-01", 2, 20).is_ok());
        assert!(code("code", "wh-01", 2, 20).is_err());
        assert!(code("code", "WH 01", 2, 20).is_err());
        assert!(code("code", "W", 2, 20).is_err());
    }
}
