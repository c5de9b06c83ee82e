//! Per-instance memoization for values derived from immutable report data.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

/// A lazily filled cache keyed by argument. Each owner holds its own table,
/// so nothing is shared between reports.
pub struct Memo<K, V> {
    table: RefCell<HashMap<K, Rc<V>>>,
}

impl<K: Eq + Hash + Clone, V> Memo<K, V> {
    pub fn new() -> Self {
        Self {
            table: RefCell::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, computing it on first use.
    /// Errors are returned as-is and not cached.
    pub fn get_or_try_insert<E>(
        &self,
        key: &K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<Rc<V>, E> {
        if let Some(value) = self.table.borrow().get(key) {
            return Ok(Rc::clone(value));
        }
        let value = Rc::new(compute()?);
        self.table
            .borrow_mut()
            .insert(key.clone(), Rc::clone(&value));
        Ok(value)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.borrow().len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }
}

impl<K: Eq + Hash + Clone, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
