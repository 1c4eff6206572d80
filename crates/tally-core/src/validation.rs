//! # Validation Module
//!
//! Input validation utilities for Tally POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Typed input (serde)                                          │
//! │  ├── Shape checks (NewTransaction, TransactionPatch, ProductPatch)     │
//! │  └── Unknown fields dropped                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: tally-pos services                                           │
//! │  └── THIS MODULE: business rule validation, before any unit of work    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), CHECK (quantity > 0)                          │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_product_name, validate_quantity};
//!
//! validate_product_name("Cola 330ml").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::{NewProduct, NewTransaction, ProductPatch};
use crate::MAX_PRODUCT_NAME_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Cola 330ml").is_ok());
/// assert!(validate_product_name("  ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_PRODUCT_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_PRODUCT_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an identifier supplied by a caller. Only emptiness is checked;
/// ids are opaque.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale quantity.
///
/// ## Rules
/// - Must be positive (> 0)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Sale line { product_id, quantity: 5 }                                 │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       └── OK → conditional stock decrement                             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());  // $10.99
/// assert!(validate_price_cents(0).is_ok());     // Free item
/// assert!(validate_price_cents(-100).is_err()); // Invalid
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a stock level set through the catalog.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::Negative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates a whole sale request before any stock is touched.
///
/// ## Rules
/// - At least one line
/// - Every line names a product
/// - Every quantity > 0
pub fn validate_new_transaction(input: &NewTransaction) -> ValidationResult<()> {
    if input.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    for line in &input.items {
        validate_id("product_id", &line.product_id)?;
        validate_quantity(line.quantity)?;
    }

    Ok(())
}

pub fn validate_new_product(input: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&input.name)?;
    validate_price_cents(input.price_cents)?;
    validate_stock(input.stock)
}

/// Validates only the fields a patch supplies. A patch that supplies
/// nothing is rejected.
pub fn validate_product_patch(patch: &ProductPatch) -> ValidationResult<()> {
    if patch.is_empty() {
        return Err(ValidationError::Empty {
            field: "patch".to_string(),
        });
    }
    if let Some(name) = &patch.name {
        validate_product_name(name)?;
    }
    if let Some(price) = patch.price_cents {
        validate_price_cents(price)?;
    }
    if let Some(stock) = patch.stock {
        validate_stock(stock)?;
    }
    Ok(())
}

// =============================================================================
// Paging
// =============================================================================

/// Resolves a requested page into an effective `(limit, offset)`.
///
/// - `limit` absent → `default_limit`
/// - `limit <= 0` or `offset < 0` → error
/// - `limit > max_limit` → clamped to `max_limit`
///
/// ## Example
/// ```rust
/// use tally_core::validation::resolve_page;
///
/// assert_eq!(resolve_page(None, 0, 20, 100).unwrap(), (20, 0));
/// assert_eq!(resolve_page(Some(500), 40, 20, 100).unwrap(), (100, 40));
/// assert!(resolve_page(Some(0), 0, 20, 100).is_err());
/// ```
pub fn resolve_page(
    limit: Option<i64>,
    offset: i64,
    default_limit: i64,
    max_limit: i64,
) -> ValidationResult<(i64, i64)> {
    let limit = limit.unwrap_or(default_limit);

    if limit <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "limit".to_string(),
        });
    }

    if offset < 0 {
        return Err(ValidationError::Negative {
            field: "offset".to_string(),
        });
    }

    Ok((limit.min(max_limit), offset))
}

// =============================================================================
// Unit Tests
// =============================================================================
