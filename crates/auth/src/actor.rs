use storefront_core::CustomerId;

use crate::Role;

/// The resolved caller of a request: an authenticated customer, an admin, or
/// an anonymous guest.
///
/// This is the only identity fact the order/inventory/coupon core consumes;
/// how it was established (JWT, session cookie, ...) is not its concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    customer_id: Option<CustomerId>,
    roles: Vec<Role>,
}

impl Actor {
    pub fn authenticated(customer_id: CustomerId, roles: Vec<Role>) -> Self {
        Self {
            customer_id: Some(customer_id),
            roles,
        }
    }

    /// Anonymous caller (guest checkout, public coupon validation).
    pub fn guest() -> Self {
        Self {
            customer_id: None,
            roles: Vec::new(),
        }
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(Role::is_admin)
    }

    /// Whether this actor may act on a resource owned by `owner`.
    ///
    /// Admins may act on anything; guests own nothing.
    pub fn owns(&self, owner: Option<CustomerId>) -> bool {
        if self.is_admin() {
            return true;
        }
        match (self.customer_id, owner) {
            (Some(me), Some(them)) => me == them,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_owns_everything() {
        let admin = Actor::authenticated(CustomerId::new(), vec![Role::admin()]);
        assert!(admin.owns(Some(CustomerId::new())));
        assert!(admin.owns(None));
    }

    #[test]
    fn customer_owns_only_their_resources() {
        let me = CustomerId::new();
        let actor = Actor::authenticated(me, vec![Role::new("customer")]);
        assert!(actor.owns(Some(me)));
        assert!(!actor.owns(Some(CustomerId::new())));
        assert!(!actor.owns(None));
    }

    #[test]
    fn guest_owns_nothing() {
        assert!(!Actor::guest().owns(Some(CustomerId::new())));
        assert!(!Actor::guest().owns(None));
    }
}
