use std::{
    fmt::{self, Display},
    mem,
};

use crate::{
    BitKey, Config, Error, Result,
    block::{LeafBlock, OverflowPolicy},
};

/// Identity of a bucket in the directory's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BucketId(usize);

/// A leaf block together with the number of key bits its contents agree on
#[derive(Debug, Clone)]
struct Bucket<K, V> {
    /// Number of high-order key bits shared by every record in the bucket
    local_depth: u32,
    /// The records of the bucket
    block: LeafBlock<K, V>,
}

impl<K: BitKey, V> Bucket<K, V> {
    /// Creates an empty, non-chaining bucket
    fn new(local_depth: u32, capacity: usize) -> Self {
        Self { local_depth, block: LeafBlock::new(capacity, OverflowPolicy::Refuse) }
    }
}

/// An extendible hash index over integer keys.
///
/// The directory has `2^global_depth` slots addressed by the top
/// `global_depth` bits of the key. A bucket of local depth `d` is referenced
/// by the `2^(global_depth - d)` contiguous slots sharing its `d`-bit prefix.
/// A full bucket is split on its next key bit; when it is referenced by a
/// single slot the directory doubles first.
///
/// Buckets live in an arena owned by the map and slots hold arena handles,
/// so aliasing is tracked by identity rather than by pointer comparison.
/// Buckets are never freed before the map itself.
///
/// Note: This implementation is not thread-safe; wrap it in a lock to share it.
#[derive(Debug, Clone)]
pub struct ExtendibleHashMap<K, V> {
    /// Every bucket ever created, addressed by `BucketId`
    buckets: Vec<Bucket<K, V>>,
    /// The directory, `2^global_depth` handles into `buckets`
    slots: Vec<BucketId>,
    /// Number of key bits used to address the directory
    global_depth: u32,
    /// Bound on `global_depth`, clamped to the key width
    max_depth: u32,
    /// Records per bucket
    bucket_capacity: usize,
    /// Number of records stored
    len: usize,
}

impl<K: BitKey, V> Default for ExtendibleHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: BitKey, V> ExtendibleHashMap<K, V> {
    /// Creates an empty map with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(Config::default())
    }

    /// Creates an empty map whose directory starts with `global_depth` bits
    ///
    /// # Errors
    ///
    /// Fails if `global_depth` exceeds the key width or the default maximum
    /// depth.
    pub fn with_depth(global_depth: u32) -> Result<Self> {
        Self::with_config(Config::default().initial_depth(global_depth))
    }

    /// Creates an empty map from `config`
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or its initial depth exceeds the
    /// key width.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        if config.initial_depth > K::BITS {
            return Err(Error::InvalidConfig("initial depth exceeds the key width"));
        }
        Ok(Self::from_valid_config(config))
    }

    /// Builds the initial directory: a single bucket at depth zero, otherwise
    /// a pair of buckets each covering one half of the slots
    fn from_valid_config(config: Config) -> Self {
        let capacity = config.bucket_capacity;
        let depth = config.initial_depth;
        let (buckets, slots) = if depth == 0 {
            (vec![Bucket::new(0, capacity)], vec![BucketId(0)])
        } else {
            let half = 1usize << depth.saturating_sub(1);
            let slots = [BucketId(0), BucketId(1)]
                .into_iter()
                .flat_map(|id| std::iter::repeat_n(id, half))
                .collect();
            (vec![Bucket::new(1, capacity), Bucket::new(1, capacity)], slots)
        };

        Self {
            buckets,
            slots,
            global_depth: depth,
            max_depth: config.max_depth.min(K::BITS),
            bucket_capacity: capacity,
            len: 0,
        }
    }

    /// Directory slot addressed by `key`
    fn slot_of(&self, key: K) -> usize {
        key.msb_prefix(self.global_depth)
    }

    /// Bucket referenced by directory slot `slot`
    #[allow(clippy::indexing_slicing)]
    fn slot_bucket(&self, slot: usize) -> BucketId {
        self.slots[slot]
    }

    /// Bucket `key` routes to
    fn bucket_of(&self, key: K) -> &Bucket<K, V> {
        self.bucket(self.slot_bucket(self.slot_of(key)))
    }

    /// Shared access to a bucket of the arena
    #[allow(clippy::indexing_slicing)]
    fn bucket(&self, id: BucketId) -> &Bucket<K, V> {
        &self.buckets[id.0]
    }

    /// Exclusive access to a bucket of the arena
    #[allow(clippy::indexing_slicing)]
    fn bucket_mut(&mut self, id: BucketId) -> &mut Bucket<K, V> {
        &mut self.buckets[id.0]
    }

    /// Inserts a key-value pair, returning the previous value of the key.
    ///
    /// A full target bucket is split, doubling the directory when needed,
    /// until the record fits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DepthExhausted`] when the directory would have to
    /// grow past its maximum depth. The map stays consistent but the pair is
    /// not stored.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        if let Some(slot) = self.get_mut(&key) {
            return Ok(Some(mem::replace(slot, value)));
        }

        let mut value = value;
        loop {
            let id = self.slot_bucket(self.slot_of(key));
            match self.bucket_mut(id).block.insert(key, value) {
                Ok(()) => {
                    self.len = self.len.saturating_add(1);
                    return Ok(None);
                }
                Err(rejected) => {
                    (_, value) = rejected.into_parts();
                    self.split(key)?;
                }
            }
        }
    }

    /// Splits the bucket `key` routes to, doubling the directory first when
    /// that bucket is referenced by a single slot
    #[allow(clippy::arithmetic_side_effects)]
    fn split(&mut self, key: K) -> Result<()> {
        let id = self.slot_bucket(self.slot_of(key));
        let local_depth = self.bucket(id).local_depth;

        if local_depth == self.global_depth {
            if self.global_depth >= self.max_depth {
                return Err(Error::DepthExhausted { depth: self.global_depth });
            }
            self.double();
        }

        // slots aliasing the bucket share its local_depth-bit prefix
        let span_bits = self.global_depth - local_depth;
        let start = (self.slot_of(key) >> span_bits) << span_bits;
        let end = start + (1usize << span_bits);
        let mid = start + (1usize << (span_bits - 1));

        let (moved, kept): (Vec<_>, Vec<_>) = self
            .bucket_mut(id)
            .block
            .take_records()
            .into_iter()
            .partition(|record| record.key().msb_bit(local_depth));

        let sibling_id = BucketId(self.buckets.len());
        let mut sibling = Bucket::new(local_depth + 1, self.bucket_capacity);
        log::trace!(
            "splitting bucket {} at depth {local_depth}: {} stay, {} move to bucket {}, slots {mid}..{end}",
            id.0,
            kept.len(),
            moved.len(),
            sibling_id.0
        );
        sibling.block.replace_records(moved);

        let bucket = self.bucket_mut(id);
        bucket.local_depth = local_depth + 1;
        bucket.block.replace_records(kept);
        self.buckets.push(sibling);

        if let Some(upper) = self.slots.get_mut(mid..end) {
            upper.fill(sibling_id);
        }
        Ok(())
    }

    /// Doubles the directory; slot `i` becomes slots `2i` and `2i + 1`
    fn double(&mut self) {
        self.slots = self.slots.iter().flat_map(|&id| [id, id]).collect();
        self.global_depth = self.global_depth.saturating_add(1);
        log::debug!(
            "directory doubled to depth {} ({} slots, {} buckets)",
            self.global_depth,
            self.slots.len(),
            self.buckets.len()
        );
    }

    /// Retrieves the value stored under `key`
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.bucket_of(*key).block.find(key)
    }

    /// Retrieves a mutable reference to the value stored under `key`
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.slot_bucket(self.slot_of(*key));
        self.bucket_mut(id).block.find_mut(key)
    }

    /// Returns true if the map holds `key`
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key` from the map, returning its value
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.slot_bucket(self.slot_of(*key));
        let removed = self.bucket_mut(id).block.remove(key);
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

    /// Returns the number of key bits addressing the directory
    #[must_use]
    pub const fn global_depth(&self) -> u32 {
        self.global_depth
    }

    /// Returns the depth the directory never grows past
    #[must_use]
    pub const fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Returns the number of directory slots, `2^global_depth`
    #[must_use]
    pub fn directory_len(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of distinct buckets
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the local depth of the bucket `key` routes to
    #[must_use]
    pub fn local_depth(&self, key: &K) -> u32 {
        self.bucket_of(*key).local_depth
    }

    /// Returns an iterator over the key-value pairs, bucket by bucket
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.block.iter())
            .map(|record| (record.key(), record.value()))
    }

    /// Returns an iterator over the keys
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Checks the aliasing invariant: bucket `b` is referenced by exactly
    /// `2^(global_depth - b.local_depth)` contiguous, aligned slots
    #[cfg(test)]
    #[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
    pub(crate) fn assert_invariants(&self) {
        assert_eq!(self.slots.len(), 1usize << self.global_depth);

        let mut seen = vec![false; self.buckets.len()];
        let mut slot = 0;
        while slot < self.slots.len() {
            let id = self.slots[slot];
            let bucket = &self.buckets[id.0];
            assert!(bucket.local_depth <= self.global_depth);
            assert!(!seen[id.0], "bucket {} referenced by two separate ranges", id.0);
            seen[id.0] = true;

            let span = 1usize << (self.global_depth - bucket.local_depth);
            assert_eq!(slot % span, 0, "range of bucket {} is misaligned", id.0);
            assert!(self.slots[slot..slot + span].iter().all(|&other| other == id));

            assert!(bucket.block.occupied() <= bucket.block.capacity());
            assert_eq!(bucket.block.chain_len(), 1);
            for record in &bucket.block {
                assert_eq!(self.slot_of(*record.key()) / span, slot / span);
            }
            slot += span;
        }
        assert!(seen.iter().all(|&s| s), "unreachable bucket in the arena");

        let total: usize = self.buckets.iter().map(|b| b.block.size()).sum();
        assert_eq!(total, self.len);
    }

    /// Removes every record, keeping the directory shape
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            drop(bucket.block.take_records());
        }
        self.len = 0;
    }
}

/// Diagnostic dump: one line per slot, slots aliasing the previous slot's
/// bucket are drawn as `|`
impl<K: BitKey, V> Display for ExtendibleHashMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "extendible: depth {}, {} slots, {} buckets, {} records",
            self.global_depth,
            self.slots.len(),
            self.buckets.len(),
            self.len
        )?;
        let mut previous = None;
        for (slot, &id) in self.slots.iter().enumerate() {
            if previous == Some(id) {
                writeln!(f, "slot {slot:>4} --|")?;
                continue;
            }
            previous = Some(id);
            let bucket = self.bucket(id);
            write!(f, "slot {slot:>4} --> #{} d{} [", id.0, bucket.local_depth)?;
            for record in &bucket.block {
                write!(f, " {}", record.key())?;
            }
            writeln!(f, " ]")?;
        }
        Ok(())
    }
}
