//! # Validation Module
//!
//! Input checks the goods service runs before it touches any dependency.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler                                                 │
//! │  ├── Query parameters parse as integers                                │
//! │  └── JSON body decodes                                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: GoodsService                                                 │
//! │  └── THIS MODULE: ids, names, priorities                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (Postgres)                                          │
//! │  └── NOT NULL constraints                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use goods_core::validation::{validate_good_name, validate_positive};
//!
//! assert!(validate_good_name("Widget").is_ok());
//! assert!(validate_positive("projectId", 0).is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a good name: any non-empty string, stored as given.
pub fn validate_good_name(name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates that an identifier or priority is strictly positive.
pub fn validate_positive(field: &str, value: i32) -> ValidationResult<()> {
    if value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates the `(id, projectId)` address of a good.
pub fn validate_address(id: i32, project_id: i32) -> ValidationResult<()> {
    validate_positive("id", id)?;
    validate_positive("projectId", project_id)
}

/// Parses a decimal query parameter.
///
/// Missing parameters are [`ValidationError::Required`]; anything that is
/// not a base-10 `i32` is [`ValidationError::InvalidFormat`].
pub fn parse_param(field: &str, raw: Option<&str>) -> ValidationResult<i32> {
    let raw = raw.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })?;
    raw.trim()
        .parse::<i32>()
        .map_err(|e| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: e.to_string(),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_good_name() {
        assert!(validate_good_name("one").is_ok());
        assert!(validate_good_name("  padded  ").is_ok());
        assert!(validate_good_name(&"x".repeat(300)).is_ok());
        assert_eq!(
            validate_good_name(""),
            Err(ValidationError::Required {
                field: "name".to_string()
            })
        );
    }

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive("newPriority", 1).is_ok());
        assert!(validate_positive("newPriority", 0).is_err());
        assert!(validate_positive("newPriority", -8).is_err());
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address(1, 1).is_ok());
        assert_eq!(
            validate_address(1, 0),
            Err(ValidationError::MustBePositive {
                field: "projectId".to_string()
            })
        );
        assert_eq!(
            validate_address(0, 1),
            Err(ValidationError::MustBePositive {
                field: "id".to_string()
            })
        );
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("id", Some("42")), Ok(42));
        assert_eq!(parse_param("id", Some(" 7 ")), Ok(7));
        assert!(matches!(
            parse_param("id", None),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            parse_param("projectId", Some("abc")),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }
}
