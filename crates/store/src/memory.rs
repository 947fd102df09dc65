use std::collections::HashMap;
use std::sync::RwLock;

use storefront_core::Entity;

use crate::collection::{Collection, UpdateError};
use crate::error::StoreError;

/// In-memory document collection for dev/test deployments.
///
/// A single `RwLock` per collection stands in for the document database's
/// per-document conditional update: `update` holds the write lock across the
/// check-and-mutate closure, so concurrent writers serialize exactly where a
/// real backend's compare-and-set would.
#[derive(Debug)]
pub struct InMemoryCollection<T: Entity> {
    inner: RwLock<HashMap<T::Id, T>>,
}

impl<T: Entity> InMemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Entity> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InMemoryCollection<T>
where
    T: Entity + Clone,
{
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<T::Id, T>> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<T::Id, T>> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<T> Collection<T> for InMemoryCollection<T>
where
    T: Entity + Clone + Send + Sync + 'static,
    T::Id: Send + Sync + 'static,
{
    fn get(&self, id: &T::Id) -> Option<T> {
        self.read().get(id).cloned()
    }

    fn insert(&self, doc: T) -> Result<(), StoreError> {
        let mut map = self.write();
        let id = doc.id().clone();
        if map.contains_key(&id) {
            return Err(StoreError::Duplicate(format!("{id:?}")));
        }
        map.insert(id, doc);
        Ok(())
    }

    fn put(&self, doc: T) {
        self.write().insert(doc.id().clone(), doc);
    }

    fn remove(&self, id: &T::Id) -> bool {
        self.write().remove(id).is_some()
    }

    fn list(&self) -> Vec<T> {
        self.read().values().cloned().collect()
    }

    fn find<P>(&self, pred: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        self.read().values().filter(|v| pred(v)).cloned().collect()
    }

    fn count<P>(&self, pred: P) -> usize
    where
        P: Fn(&T) -> bool,
    {
        self.read().values().filter(|v| pred(v)).count()
    }

    fn update<E, F>(&self, id: &T::Id, apply: F) -> Result<T, UpdateError<E>>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        let mut map = self.write();
        let Some(stored) = map.get_mut(id) else {
            return Err(UpdateError::NotFound);
        };

        // Mutate a candidate copy so a rejection leaves the document intact.
        let mut candidate = stored.clone();
        apply(&mut candidate).map_err(UpdateError::Rejected)?;
        *stored = candidate.clone();
        Ok(candidate)
    }
}
