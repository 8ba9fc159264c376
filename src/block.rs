//! Fixed-capacity leaf blocks, the storage unit behind every bucket.

use std::{
    fmt::{self, Debug},
    iter, mem,
    ops::Index,
};

/// Number of records a leaf block holds when no capacity is configured.
pub const DEFAULT_BLOCK_CAPACITY: usize = 3;

/// An immutable key-value pair stored in a leaf block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<K, V> {
    /// The key of the record
    key: K,
    /// The value stored under the key
    value: V,
}

impl<K, V> Record<K, V> {
    /// Creates a new record
    pub const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// Returns the key of the record
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Returns the value of the record
    pub const fn value(&self) -> &V {
        &self.value
    }

    /// Splits the record into its key and value
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

/// What a full block does with one more record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Reject the record so the caller can split the bucket
    Refuse,
    /// Append it to a lazily allocated overflow block
    Chain,
}

/// A fixed-capacity block of records, optionally chained to overflow blocks.
///
/// Records are kept unordered: removal moves the last live record into the
/// freed slot. A block never holds more than `capacity` records itself; with
/// [`OverflowPolicy::Chain`] the excess lives in the overflow chain, which is
/// treated as one flattened sequence by [`LeafBlock::size`], [`LeafBlock::get`]
/// and [`LeafBlock::iter`].
///
/// ```
/// use dynhash::{LeafBlock, OverflowPolicy, Record};
///
/// let mut block = LeafBlock::new(2, OverflowPolicy::Refuse);
/// assert!(block.insert(1u8, 'a').is_ok());
/// assert!(block.insert(2, 'b').is_ok());
/// assert_eq!(block.insert(3, 'c'), Err(Record::new(3, 'c')));
/// assert_eq!(block.remove(&1), Some('a'));
/// assert_eq!(block.find(&2), Some(&'b'));
/// ```
pub struct LeafBlock<K, V> {
    /// Maximum number of live records in this block
    capacity: usize,
    /// Behaviour when the block is full
    policy: OverflowPolicy,
    /// Live records; never longer than `capacity`
    records: Vec<Record<K, V>>,
    /// Next block of the chain, only ever present under `OverflowPolicy::Chain`
    overflow: Option<Box<LeafBlock<K, V>>>,
}

impl<K, V> Drop for LeafBlock<K, V> {
    fn drop(&mut self) {
        // unlink the chain one block at a time instead of recursing through it
        let mut next = self.overflow.take();
        while let Some(mut block) = next {
            next = block.overflow.take();
        }
    }
}

impl<K: Clone, V: Clone> Clone for LeafBlock<K, V> {
    fn clone(&self) -> Self {
        let mut head = self.detached_copy();
        let mut tail = &mut head.overflow;
        for block in self.chain().skip(1) {
            let copy = tail.insert(Box::new(block.detached_copy()));
            tail = &mut copy.overflow;
        }
        head
    }
}

impl<K: Debug, V: Debug> Debug for LeafBlock<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafBlock")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("blocks", &self.chain().map(Self::local_records).collect::<Vec<_>>())
            .finish()
    }
}

impl<K, V> LeafBlock<K, V>
where
    K: Eq,
{
    /// Creates an empty block
    #[must_use]
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self { capacity, policy, records: Vec::with_capacity(capacity), overflow: None }
    }

    /// Appends a record to the first block of the chain with a free slot.
    ///
    /// # Errors
    ///
    /// Returns the record back when the block is full and its policy is
    /// [`OverflowPolicy::Refuse`]. Chaining blocks always accept.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), Record<K, V>> {
        self.push(Record::new(key, value))
    }

    /// Appends an already built record, see [`LeafBlock::insert`]
    fn push(&mut self, record: Record<K, V>) -> Result<(), Record<K, V>> {
        let mut block = self;
        loop {
            if block.records.len() < block.capacity {
                block.records.push(record);
                return Ok(());
            }
            if block.policy == OverflowPolicy::Refuse {
                return Err(record);
            }
            let (capacity, policy) = (block.capacity, block.policy);
            block = &mut **block
                .overflow
                .get_or_insert_with(|| Box::new(Self::new(capacity, policy)));
        }
    }

    /// Finds the value of the first record matching `key`
    pub fn find(&self, key: &K) -> Option<&V> {
        self.iter().find(|record| record.key == *key).map(|record| &record.value)
    }

    /// Finds the value of the first record matching `key` for modification
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        let mut block = Some(self);
        while let Some(current) = block {
            if let Some(pos) = current.records.iter().position(|record| record.key == *key) {
                return current.records.get_mut(pos).map(|record| &mut record.value);
            }
            block = current.overflow.as_deref_mut();
        }
        None
    }

    /// Removes the first record matching `key`, filling its slot with the
    /// last record of the same block.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut block = Some(self);
        while let Some(current) = block {
            if let Some(pos) = current.records.iter().position(|record| record.key == *key) {
                return Some(current.records.swap_remove(pos).value);
            }
            block = current.overflow.as_deref_mut();
        }
        None
    }

    /// Lays `records` out across this block and, if needed, a fresh overflow
    /// chain, discarding whatever the block held before.
    ///
    /// # Panics
    ///
    /// Panics if the block refuses overflow and more than `capacity` records
    /// are given.
    pub fn replace_records(&mut self, records: Vec<Record<K, V>>) {
        assert!(
            self.policy == OverflowPolicy::Chain || records.len() <= self.capacity,
            "{} records do not fit a non-chaining block of capacity {}",
            records.len(),
            self.capacity
        );

        let (capacity, policy) = (self.capacity, self.policy);
        self.overflow = None;

        let mut rest = records.into_iter();
        self.records = rest.by_ref().take(capacity).collect();
        let mut tail = &mut self.overflow;
        loop {
            let chunk: Vec<_> = rest.by_ref().take(capacity).collect();
            if chunk.is_empty() {
                break;
            }
            let block =
                tail.insert(Box::new(Self { capacity, policy, records: chunk, overflow: None }));
            tail = &mut block.overflow;
        }
    }
}

impl<K: Clone, V: Clone> LeafBlock<K, V> {
    /// Copies this block's own records, leaving the chain behind
    fn detached_copy(&self) -> Self {
        Self {
            capacity: self.capacity,
            policy: self.policy,
            records: self.records.clone(),
            overflow: None,
        }
    }
}

impl<K, V> LeafBlock<K, V> {
    /// Returns the maximum number of records a single block holds
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the overflow policy of the block
    #[must_use]
    pub const fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Returns the number of live records in this block, excluding the chain
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.records.len()
    }

    /// Returns true if this block has no free slot left
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    /// Returns the number of live records in the block and its whole chain
    #[must_use]
    pub fn size(&self) -> usize {
        self.chain().map(|block| block.records.len()).sum()
    }

    /// Returns true if neither the block nor its chain holds a record
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain().all(|block| block.records.is_empty())
    }

    /// Returns the number of blocks in the chain, this one included
    #[must_use]
    pub fn chain_len(&self) -> usize {
        self.chain().count()
    }

    /// Returns the `index`-th live record of the flattened chain
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Record<K, V>> {
        let mut index = index;
        for block in self.chain() {
            match block.records.get(index) {
                Some(record) => return Some(record),
                None => index = index.saturating_sub(block.records.len()),
            }
        }
        None
    }

    /// Returns the `index`-th live record of the flattened chain.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`LeafBlock::size`]; reading past the
    /// live records is a caller bug.
    #[must_use]
    #[allow(clippy::panic)]
    pub fn at(&self, index: usize) -> &Record<K, V> {
        match self.get(index) {
            Some(record) => record,
            None => panic!("record index {index} out of range for a block holding {}", self.size()),
        }
    }

    /// Returns an iterator over the records of the block and its chain
    #[must_use]
    pub fn iter(&self) -> Records<'_, K, V> {
        Records { block: Some(self), index: 0 }
    }

    /// Removes every record from the block and its chain, releasing the
    /// overflow blocks.
    pub fn take_records(&mut self) -> Vec<Record<K, V>> {
        let mut records = mem::replace(&mut self.records, Vec::with_capacity(self.capacity));
        let mut next = self.overflow.take();
        while let Some(mut block) = next {
            records.append(&mut block.records);
            next = block.overflow.take();
        }
        records
    }

    /// Returns the live records of this block alone, excluding the chain
    #[must_use]
    pub fn local_records(&self) -> &[Record<K, V>] {
        &self.records
    }

    /// Iterates over the blocks of the chain, this one first
    pub fn chain(&self) -> impl Iterator<Item = &Self> {
        iter::successors(Some(self), |block| block.overflow.as_deref())
    }
}

impl<K, V> Index<usize> for LeafBlock<K, V> {
    type Output = Record<K, V>;

    fn index(&self, index: usize) -> &Self::Output {
        self.at(index)
    }
}

impl<'a, K, V> IntoIterator for &'a LeafBlock<K, V> {
    type Item = &'a Record<K, V>;
    type IntoIter = Records<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the records of a block chain, in block-then-slot order
#[derive(Debug, Clone)]
pub struct Records<'a, K, V> {
    /// Block currently being read
    block: Option<&'a LeafBlock<K, V>>,
    /// Position of the next record in `block`
    index: usize,
}

impl<'a, K, V> Iterator for Records<'a, K, V> {
    type Item = &'a Record<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(block) = self.block {
            if let Some(record) = block.records.get(self.index) {
                self.index = self.index.saturating_add(1);
                return Some(record);
            }
            self.block = block.overflow.as_deref();
            self.index = 0;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn filled(policy: OverflowPolicy, keys: &[u32]) -> LeafBlock<u32, u32> {
        let mut block = LeafBlock::new(3, policy);
        for &key in keys {
            assert!(block.insert(key, key * 10).is_ok());
        }
        block
    }

    #[test]
    fn test_refusing_block_signals_full() {
        let mut block = filled(OverflowPolicy::Refuse, &[1, 2, 3]);
        assert!(block.is_full());

        let rejected = block.insert(4, 40);
        assert_eq!(rejected, Err(Record::new(4, 40)));
        assert_eq!(block.occupied(), 3);
        assert_eq!(block.size(), 3);
        assert_eq!(block.chain_len(), 1);
        assert_eq!(block.find(&4), None);
    }

    #[test]
    fn test_chaining_block_grows_chain() {
        let block = filled(OverflowPolicy::Chain, &[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(block.occupied(), 3);
        assert_eq!(block.size(), 7);
        assert_eq!(block.chain_len(), 3);

        for key in 1..=7 {
            assert_eq!(block.find(&key), Some(&(key * 10)));
        }
        assert_eq!(block.find(&8), None);
    }

    #[test]
    fn test_duplicates_are_not_merged() {
        let mut block = LeafBlock::new(3, OverflowPolicy::Refuse);
        assert!(block.insert(7, 1).is_ok());
        assert!(block.insert(7, 2).is_ok());
        assert_eq!(block.size(), 2);
        assert_eq!(block.find(&7), Some(&1));
    }

    #[test]
    fn test_remove_swaps_last_into_hole() {
        let mut block = filled(OverflowPolicy::Refuse, &[1, 2, 3]);
        assert_eq!(block.remove(&1), Some(10));
        assert_eq!(block.occupied(), 2);
        assert_eq!(*block.at(0).key(), 3);
        assert_eq!(*block.at(1).key(), 2);
        assert_eq!(block.remove(&1), None);
        assert_eq!(block.occupied(), 2);
    }

    #[test]
    fn test_remove_from_chain() {
        let mut block = filled(OverflowPolicy::Chain, &[1, 2, 3, 4, 5]);
        assert_eq!(block.remove(&5), Some(50));
        assert_eq!(block.remove(&2), Some(20));
        assert_eq!(block.size(), 3);
        assert_eq!(block.find(&5), None);
        assert_eq!(block.find(&4), Some(&40));

        // the freed head slot is reused before the chain
        assert!(block.insert(9, 90).is_ok());
        assert_eq!(block.occupied(), 3);
        assert_eq!(block.size(), 4);
    }

    #[test]
    fn test_remove_all_in_any_order_resets_block() {
        let mut block = filled(OverflowPolicy::Refuse, &[4, 8, 15]);
        for key in [8, 15, 4] {
            assert!(block.remove(&key).is_some());
        }
        assert_eq!(block.occupied(), 0);
        assert!(block.is_empty());

        let fresh = filled(OverflowPolicy::Refuse, &[16, 23, 42]);
        for key in [16, 23, 42] {
            assert!(block.insert(key, key * 10).is_ok());
        }
        assert!(block.insert(99, 0).is_err());
        let ours: Vec<_> = block.iter().copied().collect();
        let theirs: Vec<_> = fresh.iter().copied().collect();
        assert_eq!(ours, theirs);
    }

    #[test]
    fn test_indexed_access_flattens_chain() {
        let block = filled(OverflowPolicy::Chain, &[1, 2, 3, 4, 5]);
        let keys: Vec<u32> = (0..block.size()).map(|i| *block[i].key()).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5]);
        assert!(block.get(5).is_none());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_indexed_access_past_end_panics() {
        let block = filled(OverflowPolicy::Chain, &[1, 2, 3, 4]);
        let _record = block.at(4);
    }

    #[test]
    fn test_take_and_replace_records() {
        let mut block = filled(OverflowPolicy::Chain, &[1, 2, 3, 4, 5, 6, 7]);
        let records = block.take_records();
        assert_eq!(records.len(), 7);
        assert!(block.is_empty());
        assert_eq!(block.chain_len(), 1);

        block.replace_records(records.into_iter().filter(|r| r.key() % 2 == 0).collect());
        assert_eq!(block.size(), 3);
        assert_eq!(block.chain_len(), 1);

        let mut refusing = LeafBlock::new(3, OverflowPolicy::Refuse);
        refusing.replace_records(vec![Record::new(1, 1), Record::new(2, 2)]);
        assert_eq!(refusing.occupied(), 2);
    }

    #[test]
    #[should_panic(expected = "do not fit")]
    fn test_replace_overfull_refusing_block_panics() {
        let mut block: LeafBlock<u32, u32> = LeafBlock::new(2, OverflowPolicy::Refuse);
        block.replace_records((0..3).map(|k| Record::new(k, k)).collect());
    }

    #[test]
    fn test_long_chain_drops_iteratively() {
        let mut block = LeafBlock::new(1, OverflowPolicy::Chain);
        block.replace_records((0..100_000u32).map(|key| Record::new(key, ())).collect());
        assert_eq!(block.chain_len(), 100_000);
        drop(block);
    }

    #[test]
    fn test_long_chain_clones_iteratively() {
        let mut block = LeafBlock::new(1, OverflowPolicy::Chain);
        block.replace_records((0..100_000u32).map(|key| Record::new(key, key)).collect());

        let copy = block.clone();
        assert_eq!(copy.chain_len(), 100_000);
        assert_eq!(copy.size(), 100_000);
        assert!(copy.iter().eq(block.iter()));
        assert_eq!(copy.find(&99_999), Some(&99_999));
    }

    #[test]
    fn test_clone_keeps_chain_shape() {
        let mut block = filled(OverflowPolicy::Chain, &[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(block.remove(&2), Some(20));

        let mut copy = block.clone();
        assert_eq!(copy.chain_len(), 3);
        assert_eq!(copy.occupied(), 2);
        assert!(copy.iter().eq(block.iter()));

        // the copy owns its own chain
        assert_eq!(copy.remove(&7), Some(70));
        assert_eq!(block.find(&7), Some(&70));
    }

    #[test]
    fn test_long_chain_formats_iteratively() {
        let mut block = LeafBlock::new(1, OverflowPolicy::Chain);
        block.replace_records((0..100_000u32).map(|key| Record::new(key, ())).collect());

        let debug = format!("{block:?}");
        assert!(debug.starts_with("LeafBlock { capacity: 1, policy: Chain, blocks: [["));
        assert!(debug.contains("[Record { key: 0, value: () }]"));
        assert!(debug.contains("key: 99999"));
    }
}
