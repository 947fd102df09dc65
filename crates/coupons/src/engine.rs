use chrono::{DateTime, Utc};
use thiserror::Error;

use storefront_core::{CouponId, CustomerId, DomainError, DomainResult};
use storefront_store::{Collection, StoreError};

use crate::coupon::Coupon;

/// Why a coupon cannot be applied. Each reason carries its own user-facing
/// message; callers and tests distinguish causes by variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CouponError {
    #[error("coupon not found")]
    NotFound,

    #[error("this coupon is not active yet")]
    NotYetActive,

    #[error("this coupon has expired")]
    Expired,

    #[error("order subtotal is below the coupon minimum of {required}")]
    MinPurchaseNotMet { required: u64 },

    #[error("this coupon has reached its usage limit")]
    UsageLimitReached,

    #[error("you have already used this coupon the maximum number of times")]
    PerUserLimitReached,
}

impl From<CouponError> for DomainError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::NotFound => DomainError::not_found("coupon"),
            other => DomainError::validation(other.to_string()),
        }
    }
}

/// Result of a successful validation: the priced discount plus the coupon
/// it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub discount_amount: u64,
    pub coupon: Coupon,
}

/// Port: how many non-cancelled orders of `customer` carry `code`.
///
/// Orders reference coupons by code string, so the order collection is the
/// source of truth for per-customer usage; the engine only consumes the
/// count.
pub trait CustomerUsage: Send + Sync {
    fn redemption_count(&self, code: &str, customer: CustomerId) -> u64;
}

impl<U> CustomerUsage for std::sync::Arc<U>
where
    U: CustomerUsage + ?Sized,
{
    fn redemption_count(&self, code: &str, customer: CustomerId) -> u64 {
        (**self).redemption_count(code, customer)
    }
}

/// Coupon validation and redemption service.
#[derive(Debug, Clone)]
pub struct CouponEngine<C, U> {
    coupons: C,
    usage: U,
}

impl<C, U> CouponEngine<C, U>
where
    C: Collection<Coupon>,
    U: CustomerUsage,
{
    pub fn new(coupons: C, usage: U) -> Self {
        Self { coupons, usage }
    }

    fn find_by_code(&self, normalized: &str) -> Option<Coupon> {
        self.coupons
            .find(|c| c.code == normalized)
            .into_iter()
            .next()
    }

    /// Validate `code` against a candidate order.
    ///
    /// Pure read: calling it repeatedly (cart re-pricing) never mutates
    /// `used_count`. Disabled coupons are indistinguishable from absent
    /// ones.
    pub fn validate(
        &self,
        code: &str,
        subtotal: u64,
        customer: Option<CustomerId>,
        now: DateTime<Utc>,
    ) -> Result<Quote, CouponError> {
        let normalized = Coupon::normalize_code(code);
        let coupon = self
            .find_by_code(&normalized)
            .filter(|c| c.enabled)
            .ok_or(CouponError::NotFound)?;

        if now < coupon.starts_at {
            return Err(CouponError::NotYetActive);
        }
        if now > coupon.ends_at {
            return Err(CouponError::Expired);
        }
        if subtotal < coupon.min_purchase_amount {
            return Err(CouponError::MinPurchaseNotMet {
                required: coupon.min_purchase_amount,
            });
        }
        if let Some(limit) = coupon.usage_limit {
            if coupon.used_count >= limit {
                return Err(CouponError::UsageLimitReached);
            }
        }
        if let (Some(limit), Some(customer)) = (coupon.usage_limit_per_user, customer) {
            if self.usage.redemption_count(&coupon.code, customer) >= limit {
                return Err(CouponError::PerUserLimitReached);
            }
        }

        let discount_amount = coupon.discount_amount(subtotal);
        Ok(Quote {
            discount_amount,
            coupon,
        })
    }

    /// Record a redemption: atomically re-check the global cap and increment
    /// `used_count` in one conditional write. Called only by successful
    /// order creation; concurrent redeemers past the cap lose here even if
    /// they passed `validate`.
    pub fn redeem(&self, code: &str) -> Result<Coupon, CouponError> {
        let normalized = Coupon::normalize_code(code);
        let coupon = self
            .find_by_code(&normalized)
            .ok_or(CouponError::NotFound)?;

        self.coupons
            .update(&coupon.id, |c| {
                if let Some(limit) = c.usage_limit {
                    if c.used_count >= limit {
                        return Err(CouponError::UsageLimitReached);
                    }
                }
                c.used_count += 1;
                Ok(())
            })
            .map_err(|e| e.into_inner(|| CouponError::NotFound))
    }

    /// Compensate a redemption whose order never materialized.
    pub fn release_redemption(&self, code: &str) {
        let normalized = Coupon::normalize_code(code);
        if let Some(coupon) = self.find_by_code(&normalized) {
            let _ = self.coupons.update(&coupon.id, |c| {
                c.used_count = c.used_count.saturating_sub(1);
                Ok::<(), CouponError>(())
            });
        }
    }

    // ------------------------------------------------------------------
    // Back-office operations
    // ------------------------------------------------------------------

    /// Register a new coupon; duplicate codes conflict.
    pub fn create(&self, coupon: Coupon) -> DomainResult<Coupon> {
        if self.find_by_code(&coupon.code).is_some() {
            return Err(DomainError::conflict(format!(
                "coupon code '{}' already exists",
                coupon.code
            )));
        }
        match self.coupons.insert(coupon.clone()) {
            Ok(()) => Ok(coupon),
            Err(StoreError::Duplicate(id)) => {
                Err(DomainError::conflict(format!("coupon {id} already exists")))
            }
            Err(e) => Err(DomainError::internal(e.to_string())),
        }
    }

    pub fn list(&self) -> Vec<Coupon> {
        self.coupons.list()
    }

    pub fn set_enabled(&self, id: CouponId, enabled: bool) -> DomainResult<Coupon> {
        self.coupons
            .update(&id, |c| {
                c.enabled = enabled;
                Ok::<(), DomainError>(())
            })
            .map_err(|e| e.into_inner(|| DomainError::not_found("coupon")))
    }

    pub fn delete(&self, id: CouponId) -> DomainResult<()> {
        if self.coupons.remove(&id) {
            Ok(())
        } else {
            Err(DomainError::not_found("coupon"))
        }
    }
}
