use storefront_auth::Actor;

/// Resolved caller identity for a request.
///
/// Present on every route: authenticated customers and admins carry their
/// token claims, everyone else is a guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor: Actor,
}

impl ActorContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }
}
