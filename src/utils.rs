//! Common interface over both directory kinds

use crate::{BitKey, ExtendibleHashMap, LinearHashMap, Result};

/// Operations shared by [`ExtendibleHashMap`] and [`LinearHashMap`], so
/// workloads can be written once for both
pub trait HashIndex<K, V> {
    /// Inserts a key-value pair, returning the previous value of the key
    ///
    /// # Errors
    ///
    /// Fails only if the index cannot grow to fit the pair.
    fn insert(&mut self, key: K, value: V) -> Result<Option<V>>;

    /// Retrieves the value stored under `key`
    fn get(&self, key: &K) -> Option<&V>;

    /// Removes `key`, returning its value
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Returns the number of records
    fn len(&self) -> usize;

    /// Returns true if the index holds no record
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the index holds `key`
    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

impl<K: BitKey, V> HashIndex<K, V> for ExtendibleHashMap<K, V> {
    fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        Self::insert(self, key, value)
    }

    fn get(&self, key: &K) -> Option<&V> {
        Self::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        Self::remove(self, key)
    }

    fn len(&self) -> usize {
        Self::len(self)
    }
}

impl<K: BitKey, V> HashIndex<K, V> for LinearHashMap<K, V> {
    fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        Ok(Self::insert(self, key, value))
    }

    fn get(&self, key: &K) -> Option<&V> {
        Self::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        Self::remove(self, key)
    }

    fn len(&self) -> usize {
        Self::len(self)
    }
}

/// Inserts every pair of `iter` into `index`, stopping at the first failure
///
/// # Errors
///
/// Propagates the first insertion error.
pub fn load<K, V, I, T>(index: &mut I, iter: T) -> Result<()>
where
    I: HashIndex<K, V> + ?Sized,
    T: IntoIterator<Item = (K, V)>,
{
    for (key, value) in iter {
        index.insert(key, value)?;
    }
    Ok(())
}
