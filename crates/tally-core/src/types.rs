//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   Transaction   │   │ TransactionItem │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──┼─ product_id ────┼───│  product_id     │       │
//! │  │  merchant_id    │   │  merchant_id    │   │  line_no        │       │
//! │  │  name           │   │  status         │   │  product_name ❄ │       │
//! │  │  price_cents    │   │  total_amount   │   │  price_cents  ❄ │       │
//! │  │  stock          │   │  items[] ───────┼──►│  quantity       │       │
//! │  │  is_active      │   │                 │   │  subtotal_cents │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ❄ = snapshot, frozen at sale time, never re-priced                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │TransactionStatus│   │ PaymentMethod   │                              │
//! │  │  Completed      │   │  Cash           │                              │
//! │  │  Cancelled (end)│   │  Card / Ewallet │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every record is scoped by `merchant_id`. The merchant identifier is opaque
//! and trusted; it comes from the caller's auth layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::validate_quantity;

// =============================================================================
// Product
// =============================================================================

/// A product in a merchant's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Merchant that owns this product.
    pub merchant_id: String,

    /// Display name, copied into each sale line at sale time.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// The error for a sale line asking for `requested` units of this
    /// product when only `self.stock` are on hand.
    pub fn insufficient_stock(&self, requested: i64) -> CoreError {
        CoreError::InsufficientStock {
            product_id: self.id.clone(),
            product_name: self.name.clone(),
            available: self.stock,
            requested,
        }
    }
}

/// Input for creating a catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i64,
}

/// Partial update for a catalog product.
///
/// Only supplied fields change. There is no way to reach `merchant_id`,
/// `is_active` or the timestamps through a patch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i64>,
}

impl ProductPatch {
    /// True when the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price_cents.is_none()
            && self.stock.is_none()
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// The status of a sales transaction.
///
/// ```text
///   create ──► Completed ──cancel──► Cancelled (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Sale recorded, stock decremented.
    Completed,
    /// Sale reversed, stock restored.
    Cancelled,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Completed
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Wallet app / QR payment.
    Ewallet,
}

// =============================================================================
// Transaction
// =============================================================================

/// A recorded sale and, once loaded, its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,
    pub merchant_id: String,
    /// Σ item subtotals, computed server-side at creation.
    pub total_amount_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Line items in sale order. Loaded separately from the header row.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<TransactionItem>,
}

impl Transaction {
    /// Returns the total as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == TransactionStatus::Cancelled
    }

}

// =============================================================================
// Transaction Item
// =============================================================================

/// A line item in a transaction.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    /// Position in the sale, starting at 0.
    pub line_no: i64,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// Unit price in cents at time of sale (frozen).
    pub price_cents: i64,
    /// Quantity sold.
    pub quantity: i64,
    /// quantity × price_cents.
    pub subtotal_cents: i64,

    /// Current catalog record for `product_id`, attached on single-transaction
    /// reads. May be a soft-deleted product.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

impl TransactionItem {
    /// Builds a line item by snapshotting `product` as it is right now.
    ///
    /// ## User Workflow
    /// ```text
    /// Product { name: "Cola", price_cents: 1000 }  + quantity 3
    ///      │
    ///      ▼
    /// snapshot() ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Item { product_name: "Cola", price_cents: 1000, subtotal_cents: 3000 }
    /// ```
    ///
    /// Later catalog edits never touch the snapshot.
    pub fn snapshot(
        id: String,
        transaction_id: String,
        line_no: i64,
        product: &Product,
        quantity: i64,
    ) -> CoreResult<Self> {
        validate_quantity(quantity)?;

        let subtotal = product
            .price()
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| CoreError::AmountOverflow(format!("subtotal of {}", product.id)))?;

        Ok(TransactionItem {
            id,
            transaction_id,
            product_id: product.id.clone(),
            line_no,
            product_name: product.name.clone(),
            price_cents: product.price_cents,
            quantity,
            subtotal_cents: subtotal.cents(),
            product: None,
        })
    }

    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// Sums item subtotals into a transaction total.
pub fn total_of(items: &[TransactionItem]) -> CoreResult<Money> {
    items.iter().try_fold(Money::zero(), |acc, item| {
        acc.checked_add(item.subtotal())
            .ok_or_else(|| CoreError::AmountOverflow("transaction total".to_string()))
    })
}

// =============================================================================
// Sale Requests
// =============================================================================

/// One requested line of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
}

impl SaleLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        SaleLine {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Input for creating a transaction.
///
/// There is no total here: the total is always derived from the lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTransaction {
    pub items: Vec<SaleLine>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// The only fields of a transaction that may change after creation.
///
/// Unknown fields in the incoming document (`total_amount`, `status`, ...)
/// are dropped during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionPatch {
    pub notes: Option<String>,
    pub customer_name: Option<String>,
}

// =============================================================================
// Reads
// =============================================================================

/// Completed sales for one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_amount_cents: i64,
    pub count: i64,
    pub date: NaiveDate,
}

impl SalesSummary {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// One page of a listing plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            merchant_id: "m-1".to_string(),
            name: "Cola 330ml".to_string(),
            description: None,
            price_cents,
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_snapshot_freezes_name_and_price() {
        let mut p = product(1000, 10);
        let item = TransactionItem::snapshot("i-1".into(), "t-1".into(), 0, &p, 3).unwrap();

        p.name = "Renamed".to_string();
        p.price_cents = 5;

        assert_eq!(item.product_name, "Cola 330ml");
        assert_eq!(item.price_cents, 1000);
        assert_eq!(item.subtotal_cents, 3000);
        assert!(item.product.is_none());
    }

    #[test]
    fn test_snapshot_rejects_non_positive_quantity() {
        let p = product(1000, 10);
        let err = TransactionItem::snapshot("i".into(), "t".into(), 0, &p, 0).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_snapshot_overflow() {
        let p = product(i64::MAX, 10);
        let err = TransactionItem::snapshot("i".into(), "t".into(), 0, &p, 2).unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow(_)));
    }

    #[test]
    fn test_total_of_items() {
        let a = TransactionItem::snapshot("a".into(), "t".into(), 0, &product(299, 9), 3).unwrap();
        let b = TransactionItem::snapshot("b".into(), "t".into(), 1, &product(1000, 9), 1).unwrap();
        assert_eq!(total_of(&[a, b]).unwrap().cents(), 1897);
        assert_eq!(total_of(&[]).unwrap(), Money::zero());
    }

    #[test]
    fn test_insufficient_stock_error() {
        let p = product(100, 3);
        let err = p.insufficient_stock(5);
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Cola 330ml: available 3, requested 5"
        );
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_patch_ignores_financial_fields() {
        let patch: TransactionPatch =
            serde_json::from_str(r#"{"notes": "x", "total_amount": 999, "status": "cancelled"}"#)
                .unwrap();
        assert_eq!(patch.notes.as_deref(), Some("x"));
        assert!(patch.customer_name.is_none());
    }

    #[test]
    fn test_status_and_payment_serialization() {
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Cancelled).unwrap(),
            r#""cancelled""#
        );
        let method: PaymentMethod = serde_json::from_str(r#""ewallet""#).unwrap();
        assert_eq!(method, PaymentMethod::Ewallet);
        assert_eq!(TransactionStatus::default(), TransactionStatus::Completed);
    }

    #[test]
    fn test_new_transaction_defaults() {
        let input: NewTransaction =
            serde_json::from_str(r#"{"items": [{"product_id": "p-1", "quantity": 2}]}"#).unwrap();
        assert_eq!(input.items, vec![SaleLine::new("p-1", 2)]);
        assert!(input.payment_method.is_none());
        assert!(input.notes.is_none());
    }
}
