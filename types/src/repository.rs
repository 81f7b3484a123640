use std::{collections::HashSet, hash::Hash, sync::Arc};

use crate::{schema::Type, value::Value};

/// Interning table which hands out shared handles to structurally equal objects.
///
/// Interning the same value twice returns pointers to the same allocation.
#[derive(Debug)]
pub struct Repository<T> {
    entries: HashSet<Arc<T>>,
}

pub type TypeRepository = Repository<Type>;
pub type ValueRepository = Repository<Value>;

impl<T> Default for Repository<T> {
    fn default() -> Self {
        Repository {
            entries: HashSet::new(),
        }
    }
}

impl<T: Eq + Hash> Repository<T> {
    /// Returns the shared handle of `value`, registering it if it was not seen before.
    pub fn get(&mut self, value: T) -> Arc<T> {
        if let Some(existing) = self.entries.get(&value) {
            return Arc::clone(existing);
        }
        let entry = Arc::new(value);
        self.entries.insert(Arc::clone(&entry));
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every interned entry. Handles already given out stay valid.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_share_allocation() {
        // given an empty repository
        let mut repository = TypeRepository::default();

        // when the same type is interned twice
        let first = repository.get(Type::Int8);
        let second = repository.get(Type::Int8);

        // then both handles point to the same entry
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(repository.len(), 1);
    }

    #[test]
    fn distinct_values_are_kept_apart() {
        let mut repository = ValueRepository::default();
        let one = repository.get(Value::Int4(1));
        let two = repository.get(Value::Int4(2));
        assert!(!Arc::ptr_eq(&one, &two));
        assert_eq!(repository.len(), 2);
    }

    #[test]
    fn clear_keeps_handles_alive() {
        let mut repository = ValueRepository::default();
        let value = repository.get(Value::Character("a".into()));
        repository.clear();
        assert!(repository.is_empty());
        assert_eq!(*value, Value::Character("a".into()));
    }
}
