//! # Shared Domain Types
//!
//! Types consumed by the transaction engine but owned by collaborating
//! subsystems (catalog, organization management). The engine only reads
//! them; their CRUD lives elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::discount::Discount;
use crate::price::Price;

// =============================================================================
// Product Packaging
// =============================================================================

/// A sellable packaging of a product (e.g. "box of 20 tablets"), as exposed
/// by the catalog lookup.
///
/// `selling_price()` is the price captured onto a cart line at add time:
/// the catalog list price with any catalog-level discount already applied.
/// Once on the line it is a frozen snapshot — later catalog changes do not
/// reprice open carts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPackaging {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Organization this packaging belongs to.
    pub organization_id: String,

    /// Display name shown on the line and the receipt.
    pub product_name: String,

    /// Barcode (EAN-13, UPC-A, etc.), scannable at the till.
    pub barcode: Option<String>,

    /// Catalog list price, in any currency the organization trades in.
    pub list_price: Price,

    /// Catalog-level discount baked into the selling price.
    pub catalog_discount: Discount,

    /// Whether the packaging is sellable (soft delete).
    pub is_active: bool,

    /// When the packaging was created.
    pub created_at: DateTime<Utc>,

    /// When the packaging was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ProductPackaging {
    /// The current selling price: list price net of the catalog discount.
    pub fn selling_price(&self) -> Price {
        self.catalog_discount.apply_to(&self.list_price)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_selling_price_applies_catalog_discount() {
        let packaging = ProductPackaging {
            id: "pkg-1".to_string(),
            organization_id: "org-1".to_string(),
            product_name: "Amoxicillin 250mg (20 caps)".to_string(),
            barcode: Some("6251234567890".to_string()),
            list_price: Price::new(Decimal::from(8000), "IQD").unwrap(),
            catalog_discount: Discount::percentage(Decimal::from(25)).unwrap(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(packaging.selling_price().amount(), Decimal::from(6000));
    }

    #[test]
    fn test_selling_price_without_discount_is_list_price() {
        let packaging = ProductPackaging {
            id: "pkg-2".to_string(),
            organization_id: "org-1".to_string(),
            product_name: "Gauze roll".to_string(),
            barcode: None,
            list_price: Price::new(Decimal::from(500), "IQD").unwrap(),
            catalog_discount: Discount::none(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(packaging.selling_price(), packaging.list_price);
    }
}
