use std::{
    fmt::{self, Display},
    mem,
};

use crate::{
    BitKey, Config, Result,
    block::{LeafBlock, OverflowPolicy},
};

/// A linear hash index over integer keys.
///
/// Buckets are addressed by the low bits of the key. Whenever the load factor
/// exceeds its threshold the bucket under the split pointer is split, no
/// matter which bucket received the insert; overflow in between is absorbed
/// by chaining. The split pointer sweeps round-robin over the buckets of the
/// current round, and each completed round widens the address by one bit.
///
/// At all times `bucket_count() == 2^(global_bits + 1) + split_index()`.
///
/// Note: This implementation is not thread-safe; wrap it in a lock to share it.
#[derive(Debug, Clone)]
pub struct LinearHashMap<K, V> {
    /// Chained buckets, appended on every split and never aliased
    buckets: Vec<LeafBlock<K, V>>,
    /// Buckets below `split_index` are addressed with `global_bits + 2` bits,
    /// the rest with `global_bits + 1`
    global_bits: u32,
    /// Next bucket to split
    split_index: usize,
    /// Number of records stored
    len: usize,
    /// Records per block
    bucket_capacity: usize,
    /// Load factor above which a split is performed
    load_factor_threshold: f64,
}

impl<K: BitKey, V> Default for LinearHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: BitKey, V> LinearHashMap<K, V> {
    /// Creates an empty map with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(Config::default())
    }

    /// Creates an empty map that splits above `threshold` load
    ///
    /// # Errors
    ///
    /// Fails if `threshold` is not in (0, 1].
    pub fn with_load_factor(threshold: f64) -> Result<Self> {
        Self::with_config(Config::default().load_factor_threshold(threshold))
    }

    /// Creates an empty map from `config`; depth settings are ignored
    ///
    /// # Errors
    ///
    /// Fails if the bucket capacity is zero or the load factor threshold is
    /// not in (0, 1].
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate_linear()?;
        Ok(Self::from_valid_config(config))
    }

    /// Builds the initial pair of empty buckets
    fn from_valid_config(config: Config) -> Self {
        let capacity = config.bucket_capacity;
        Self {
            buckets: vec![
                LeafBlock::new(capacity, OverflowPolicy::Chain),
                LeafBlock::new(capacity, OverflowPolicy::Chain),
            ],
            global_bits: 0,
            split_index: 0,
            len: 0,
            bucket_capacity: capacity,
            load_factor_threshold: config.load_factor_threshold,
        }
    }

    /// Bucket index `key` routes to
    fn bucket_index(&self, key: K) -> usize {
        let index = key.lsb_mask(self.global_bits.saturating_add(1));
        if index < self.split_index {
            // already split this round, one more bit tells the halves apart
            key.lsb_mask(self.global_bits.saturating_add(2))
        } else {
            index
        }
    }

    /// Shared access to the bucket `key` routes to
    #[allow(clippy::indexing_slicing)]
    fn bucket(&self, key: K) -> &LeafBlock<K, V> {
        &self.buckets[self.bucket_index(key)]
    }

    /// Exclusive access to the bucket `key` routes to
    #[allow(clippy::indexing_slicing)]
    fn bucket_mut(&mut self, key: K) -> &mut LeafBlock<K, V> {
        let index = self.bucket_index(key);
        &mut self.buckets[index]
    }

    /// Inserts a key-value pair, returning the previous value of the key.
    ///
    /// Never fails: a full bucket grows an overflow chain, and the scheduled
    /// split runs afterwards if the load factor crossed its threshold.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let bucket = self.bucket_mut(key);
        if let Some(slot) = bucket.find_mut(&key) {
            return Some(mem::replace(slot, value));
        }

        let appended = bucket.insert(key, value);
        debug_assert!(appended.is_ok(), "chaining bucket refused a record");
        self.len = self.len.saturating_add(1);

        if self.load_factor() > self.load_factor_threshold {
            self.split();
        }
        None
    }

    /// Returns true while the keys still have a bit left to tell the halves
    /// of the next split apart
    fn can_split(&self) -> bool {
        self.global_bits.saturating_add(2) <= K::BITS
    }

    /// Splits the bucket under the split pointer and advances the pointer
    #[allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]
    fn split(&mut self) {
        if !self.can_split() {
            return;
        }

        let bit = self.global_bits + 1;
        let image_index = self.buckets.len();
        let source = &mut self.buckets[self.split_index];
        let (moved, kept): (Vec<_>, Vec<_>) =
            source.take_records().into_iter().partition(|record| record.key().lsb_bit(bit));

        log::trace!(
            "splitting bucket {} on bit {bit}: {} stay, {} move to bucket {image_index}",
            self.split_index,
            kept.len(),
            moved.len()
        );
        source.replace_records(kept);
        let mut image = LeafBlock::new(self.bucket_capacity, OverflowPolicy::Chain);
        image.replace_records(moved);
        self.buckets.push(image);

        if self.split_index < (1usize << bit) - 1 {
            self.split_index += 1;
        } else {
            self.split_index = 0;
            self.global_bits += 1;
            log::debug!(
                "linear round complete: {} buckets, addressing with {} bits",
                self.buckets.len(),
                self.global_bits + 1
            );
            if !self.can_split() {
                log::warn!(
                    "keys are {} bits wide, no further splits; overflow chains will absorb growth",
                    K::BITS
                );
            }
        }
    }

    /// Retrieves the value stored under `key`
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.bucket(*key).find(key)
    }

    /// Retrieves a mutable reference to the value stored under `key`
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.bucket_mut(*key).find_mut(key)
    }

    /// Returns true if the map holds `key`
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key` from the map, returning its value
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.bucket_mut(*key).remove(key);
        if removed.is_some() {
            self.len = self.len.saturating_sub(1);
        }
        removed
    }

    /// Returns the number of records in the map
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the map holds no record
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of address bits of the current round, minus one
    #[must_use]
    pub const fn global_bits(&self) -> u32 {
        self.global_bits
    }

    /// Returns the index of the next bucket to split
    #[must_use]
    pub const fn split_index(&self) -> usize {
        self.split_index
    }

    /// Returns the number of buckets, overflow blocks not counted
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the configured split threshold
    #[must_use]
    pub const fn load_factor_threshold(&self) -> f64 {
        self.load_factor_threshold
    }

    /// Returns records stored over the capacity of the primary buckets
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len().saturating_mul(self.bucket_capacity) as f64
    }

    /// Returns an iterator over the key-value pairs, bucket by bucket
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.buckets.iter().flat_map(LeafBlock::iter).map(|record| (record.key(), record.value()))
    }

    /// Returns an iterator over the keys
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Removes every record, keeping the buckets and the split pointer
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            drop(bucket.take_records());
        }
        self.len = 0;
    }

    /// Checks bucket count, addressing and the split trigger bound
    #[cfg(test)]
    #[allow(
        clippy::indexing_slicing,
        clippy::arithmetic_side_effects,
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub(crate) fn assert_invariants(&self) {
        assert_eq!(self.buckets.len(), (1usize << (self.global_bits + 1)) + self.split_index);
        assert!(self.split_index < (1usize << (self.global_bits + 1)));

        let mut total = 0;
        for (index, bucket) in self.buckets.iter().enumerate() {
            assert!(bucket.occupied() <= bucket.capacity());
            for record in bucket {
                assert_eq!(self.bucket_index(*record.key()), index);
            }
            total += bucket.size();
        }
        assert_eq!(total, self.len);

        // one split per insert keeps up only while each split adds at least
        // one record's worth of headroom
        let headroom = self.load_factor_threshold * self.bucket_capacity as f64;
        if self.can_split() && headroom >= 1.0 {
            let capacity = self.buckets.len() * self.bucket_capacity;
            let bound = (self.load_factor_threshold * capacity as f64).ceil() as usize;
            assert!(
                self.len <= bound + self.bucket_capacity,
                "{} records over bound {bound}",
                self.len
            );
        }
    }
}

impl<K: BitKey, V> Extend<(K, V)> for LinearHashMap<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: BitKey, V> FromIterator<(K, V)> for LinearHashMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

/// Diagnostic dump: one line per bucket, overflow blocks after `->`
impl<K: BitKey, V> Display for LinearHashMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "linear: bits {}, split at {}, {} buckets, {} records",
            self.global_bits,
            self.split_index,
            self.buckets.len(),
            self.len
        )?;
        for (index, bucket) in self.buckets.iter().enumerate() {
            let marker = if index == self.split_index { '*' } else { ' ' };
            write!(f, "bucket {index:>4}{marker}--> [")?;
            for (position, block) in bucket.chain().enumerate() {
                if position > 0 {
                    write!(f, " ] -> [")?;
                }
                for record in block.local_records() {
                    write!(f, " {}", record.key())?;
                }
            }
            writeln!(f, " ]")?;
        }
        Ok(())
    }
}
