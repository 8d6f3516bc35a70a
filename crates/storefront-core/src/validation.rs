//! # Validation Module
//!
//! Input validation for values that enter the system from configuration,
//! the command line or permission providers.
//!
//! ```rust
//! use storefront_core::validation::{validate_page_size, validate_system_name};
//!
//! validate_system_name("catalog.product.read").unwrap();
//! validate_page_size(500).unwrap();
//! assert!(validate_page_size(0).is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest page a loader may request in one query.
pub const MAX_PAGE_SIZE: usize = 10_000;

const MAX_SKU_LEN: usize = 400;
const MAX_SYSTEM_NAME_LEN: usize = 255;

/// Validates a SKU: non-empty, bounded, no whitespace.
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    if sku.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > MAX_SKU_LEN {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LEN,
        });
    }

    if sku.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates a system name such as a role or permission name.
///
/// ## Rules
/// - Must not be empty
/// - At most 255 characters
/// - Letters, digits, '.', '-' and '_' only
/// - No empty dot-separated segment ("catalog..read")
pub fn validate_system_name(name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "system_name".to_string(),
        });
    }

    if name.len() > MAX_SYSTEM_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "system_name".to_string(),
            max: MAX_SYSTEM_NAME_LEN,
        });
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "system_name".to_string(),
            reason: "must contain only letters, digits, '.', '-' and '_'".to_string(),
        });
    }

    if name.split('.').any(str::is_empty) {
        return Err(ValidationError::InvalidFormat {
            field: "system_name".to_string(),
            reason: "must not contain empty segments".to_string(),
        });
    }

    Ok(())
}

/// Validates a stored tax rate in basis points.
///
/// Accepts exactly the values [`TaxRate`](crate::TaxRate) can hold.
pub fn validate_tax_rate(bps: i64) -> ValidationResult<()> {
    if bps < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "tax_rate_bps".to_string(),
        });
    }

    if u32::try_from(bps).is_err() {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate_bps".to_string(),
            min: 0,
            max: i64::from(u32::MAX),
        });
    }

    Ok(())
}

/// Validates the number of entities a loader fetches per query.
pub fn validate_page_size(take: usize) -> ValidationResult<()> {
    if take == 0 || take > MAX_PAGE_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "take".to_string(),
            min: 1,
            max: MAX_PAGE_SIZE as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
