use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CouponId, DomainError, DomainResult, Entity};

/// Discount rule carried by a coupon. Amounts are in the currency's
/// smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the subtotal, optionally capped.
    Percent {
        value: u32,
        max_discount_amount: Option<u64>,
    },
    /// Flat amount off the subtotal.
    Fixed { amount: u64 },
}

/// Coupon document.
///
/// Codes are stored normalized (trimmed, upper-case) and are unique; orders
/// reference a coupon by code string, not by id, so per-customer usage is
/// counted by scanning orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub discount: Discount,
    pub min_purchase_amount: u64,
    /// Global redemption cap; `None` means unlimited.
    pub usage_limit: Option<u64>,
    /// Per-customer redemption cap; `None` means unlimited.
    pub usage_limit_per_user: Option<u64>,
    pub used_count: u64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Create a coupon, normalizing the code and validating the rule.
    pub fn new(
        code: impl AsRef<str>,
        discount: Discount,
        min_purchase_amount: u64,
        usage_limit: Option<u64>,
        usage_limit_per_user: Option<u64>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let code = Self::normalize_code(code.as_ref());
        if code.is_empty() {
            return Err(DomainError::validation("coupon code cannot be empty"));
        }
        if ends_at <= starts_at {
            return Err(DomainError::validation(
                "coupon end date must be after its start date",
            ));
        }
        match discount {
            Discount::Percent { value, .. } if value == 0 || value > 100 => {
                return Err(DomainError::validation(
                    "percent discount must be between 1 and 100",
                ));
            }
            Discount::Fixed { amount } if amount == 0 => {
                return Err(DomainError::validation("fixed discount must be positive"));
            }
            _ => {}
        }

        Ok(Self {
            id: CouponId::new(),
            code,
            discount,
            min_purchase_amount,
            usage_limit,
            usage_limit_per_user,
            used_count: 0,
            starts_at,
            ends_at,
            enabled: true,
            created_at: Utc::now(),
        })
    }

    /// Trim and upper-case a user-supplied code.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Active: enabled and inside its date window.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.starts_at <= now && now <= self.ends_at
    }

    /// Discount for `subtotal`, in minor units. Percent values truncate
    /// toward zero and respect the cap; a fixed discount never exceeds the
    /// subtotal.
    pub fn discount_amount(&self, subtotal: u64) -> u64 {
        match &self.discount {
            Discount::Percent {
                value,
                max_discount_amount,
            } => {
                // Widen before multiplying; `value <= 100` keeps the
                // quotient within u64.
                let raw = (u128::from(subtotal) * u128::from(*value) / 100) as u64;
                match max_discount_amount {
                    Some(cap) => raw.min(*cap),
                    None => raw,
                }
            }
            Discount::Fixed { amount } => (*amount).min(subtotal),
        }
    }
}

impl Entity for Coupon {
    type Id = CouponId;

    fn id(&self) -> &CouponId {
        &self.id
    }
}
