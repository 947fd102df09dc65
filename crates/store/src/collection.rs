use std::sync::Arc;

use storefront_core::Entity;

use crate::error::StoreError;

/// Outcome of a conditional [`Collection::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError<E> {
    /// No document with that id.
    NotFound,
    /// The closure rejected the update; the stored document is unchanged.
    Rejected(E),
}

impl<E> UpdateError<E> {
    /// Collapse into the caller's error type, mapping `NotFound` through `f`.
    pub fn into_inner(self, f: impl FnOnce() -> E) -> E {
        match self {
            UpdateError::NotFound => f(),
            UpdateError::Rejected(e) => e,
        }
    }
}

/// A keyed document collection.
///
/// `update` is the only write path that may observe current state: the
/// closure runs against the stored document in one indivisible step, and a
/// rejection leaves the document untouched. This is the seam where a real
/// document database's conditional-update operator plugs in; the in-memory
/// backend holds its write lock across the closure for the same effect.
pub trait Collection<T>: Send + Sync
where
    T: Entity + Clone + Send + Sync + 'static,
    T::Id: Send + Sync + 'static,
{
    fn get(&self, id: &T::Id) -> Option<T>;

    /// Insert a new document; fails with [`StoreError::Duplicate`] if the id
    /// is already taken.
    fn insert(&self, doc: T) -> Result<(), StoreError>;

    /// Insert-or-replace, unconditionally.
    fn put(&self, doc: T);

    /// Remove a document; returns whether it existed.
    fn remove(&self, id: &T::Id) -> bool;

    fn list(&self) -> Vec<T>;

    fn find<P>(&self, pred: P) -> Vec<T>
    where
        P: Fn(&T) -> bool;

    fn count<P>(&self, pred: P) -> usize
    where
        P: Fn(&T) -> bool;

    /// Atomic conditional update: load, check, mutate in one indivisible
    /// step. On `Err` the stored document is guaranteed unchanged; on `Ok`
    /// the updated document is returned.
    fn update<E, F>(&self, id: &T::Id, apply: F) -> Result<T, UpdateError<E>>
    where
        F: FnOnce(&mut T) -> Result<(), E>;
}

impl<T, S> Collection<T> for Arc<S>
where
    T: Entity + Clone + Send + Sync + 'static,
    T::Id: Send + Sync + 'static,
    S: Collection<T> + ?Sized,
{
    fn get(&self, id: &T::Id) -> Option<T> {
        (**self).get(id)
    }

    fn insert(&self, doc: T) -> Result<(), StoreError> {
        (**self).insert(doc)
    }

    fn put(&self, doc: T) {
        (**self).put(doc)
    }

    fn remove(&self, id: &T::Id) -> bool {
        (**self).remove(id)
    }

    fn list(&self) -> Vec<T> {
        (**self).list()
    }

    fn find<P>(&self, pred: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        (**self).find(pred)
    }

    fn count<P>(&self, pred: P) -> usize
    where
        P: Fn(&T) -> bool,
    {
        (**self).count(pred)
    }

    fn update<E, F>(&self, id: &T::Id, apply: F) -> Result<T, UpdateError<E>>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        (**self).update(id, apply)
    }
}
