use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, ProductId, VariationId};

/// Sale availability of a product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    InStock,
    OutOfStock,
    /// Purchasable while stock is zero; an explicit admin override.
    Preorder,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::InStock => "in_stock",
            Availability::OutOfStock => "out_of_stock",
            Availability::Preorder => "preorder",
        }
    }
}

/// Per-product stock counters and derived availability.
///
/// Invariant: `availability == OutOfStock` iff `total_stock == 0`, except
/// for the explicit `Preorder` override which is only valid at zero stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub total_stock: u32,
    pub low_stock_alert: u32,
    pub availability: Availability,
}

impl StockRecord {
    pub fn new(total_stock: u32, low_stock_alert: u32) -> Self {
        let mut record = Self {
            total_stock,
            low_stock_alert,
            availability: Availability::InStock,
        };
        record.recompute_availability();
        record
    }

    /// Re-derive availability after a ledger mutation: zero stock is out of
    /// stock, anything else is in stock. Reserve/release never produce the
    /// preorder state; only an explicit admin override does.
    pub fn recompute_availability(&mut self) {
        self.availability = if self.total_stock == 0 {
            Availability::OutOfStock
        } else {
            Availability::InStock
        };
    }

    /// Low on stock: strictly positive but at or under the alert threshold.
    pub fn is_low(&self) -> bool {
        self.total_stock > 0 && self.total_stock <= self.low_stock_alert
    }
}

/// A selectable product variation (size, colour, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    pub id: VariationId,
    /// Human-readable selector, e.g. `"XL"` or `"blue"`.
    pub selector: String,
}

/// Catalog product document.
///
/// Prices are in the currency's smallest unit (e.g. cents). The stock record
/// exists for exactly as long as the product does; it is created when the
/// product is published and mutated only by the inventory ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub regular_price: u64,
    pub sale_price: Option<u64>,
    pub published: bool,
    pub variations: Vec<Variation>,
    pub stock: StockRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Publish a new product with its initial stock record.
    pub fn publish(
        name: impl Into<String>,
        slug: impl Into<String>,
        regular_price: u64,
        sale_price: Option<u64>,
        initial_stock: u32,
        low_stock_alert: u32,
        variations: Vec<Variation>,
    ) -> DomainResult<Self> {
        let name = name.into();
        let slug = slug.into();

        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if slug.trim().is_empty() {
            return Err(DomainError::validation("product slug cannot be empty"));
        }
        if regular_price == 0 {
            return Err(DomainError::validation("regular price must be positive"));
        }
        if let Some(sale) = sale_price {
            if sale >= regular_price {
                return Err(DomainError::validation(
                    "sale price must be below the regular price",
                ));
            }
        }

        let now = Utc::now();
        Ok(Self {
            id: ProductId::new(),
            name,
            slug,
            regular_price,
            sale_price,
            published: true,
            variations,
            stock: StockRecord::new(initial_stock, low_stock_alert),
            created_at: now,
            updated_at: now,
        })
    }

    /// Effective unit price: the sale price when one is set.
    pub fn unit_price(&self) -> u64 {
        self.sale_price.unwrap_or(self.regular_price)
    }

    /// Whether `selector` names one of this product's variations.
    pub fn has_variation(&self, selector: &str) -> bool {
        self.variations.iter().any(|v| v.selector == selector)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &ProductId {
        &self.id
    }
}
