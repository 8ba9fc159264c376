//! Construction parameters for the hash directories

use crate::{
    Error, Result,
    block::DEFAULT_BLOCK_CAPACITY,
};

/// Default bound on the extendible directory's global depth, `2^24` slots
pub const DEFAULT_MAX_DEPTH: u32 = 24;

/// Default fraction of total bucket capacity that triggers a linear split
pub const DEFAULT_LOAD_FACTOR_THRESHOLD: f64 = 0.8;

/// Directory configuration.
///
/// Every index built from one `Config` uses the same block capacity for all
/// of its buckets. The depth settings only affect [`crate::ExtendibleHashMap`],
/// the load factor threshold only affects [`crate::LinearHashMap`].
///
/// ```
/// use dynhash::{Config, ExtendibleHashMap};
///
/// let config = Config::new().bucket_capacity(4).initial_depth(2);
/// let map = ExtendibleHashMap::<u32, u32>::with_config(config).unwrap();
/// assert_eq!(map.global_depth(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Records per leaf block
    pub(crate) bucket_capacity: usize,
    /// Global depth of a freshly built extendible directory
    pub(crate) initial_depth: u32,
    /// Global depth the extendible directory never grows past
    pub(crate) max_depth: u32,
    /// Load factor above which the linear directory splits a bucket
    pub(crate) load_factor_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket_capacity: DEFAULT_BLOCK_CAPACITY,
            initial_depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            load_factor_threshold: DEFAULT_LOAD_FACTOR_THRESHOLD,
        }
    }
}

impl Config {
    /// Creates a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of records each leaf block holds
    #[must_use]
    pub fn bucket_capacity(mut self, capacity: usize) -> Self {
        self.bucket_capacity = capacity;
        self
    }

    /// Sets the initial global depth of an extendible directory
    #[must_use]
    pub fn initial_depth(mut self, depth: u32) -> Self {
        self.initial_depth = depth;
        self
    }

    /// Sets the largest global depth an extendible directory may reach.
    ///
    /// It is further clamped to the key width.
    #[must_use]
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the load factor threshold of a linear directory, in (0, 1]
    #[must_use]
    pub fn load_factor_threshold(mut self, threshold: f64) -> Self {
        self.load_factor_threshold = threshold;
        self
    }

    /// Checks that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending value.
    pub fn validate(&self) -> Result<()> {
        self.validate_linear()?;
        if self.max_depth >= usize::BITS {
            return Err(Error::InvalidConfig("max depth must be below the pointer width"));
        }
        if self.initial_depth > self.max_depth {
            return Err(Error::InvalidConfig("initial depth exceeds max depth"));
        }
        Ok(())
    }

    /// Checks only the values a linear directory reads, the depth settings
    /// are left alone
    pub(crate) fn validate_linear(&self) -> Result<()> {
        if self.bucket_capacity == 0 {
            return Err(Error::InvalidConfig("bucket capacity must be at least 1"));
        }
        if !(self.load_factor_threshold > 0.0 && self.load_factor_threshold <= 1.0) {
            return Err(Error::InvalidConfig("load factor threshold must be in (0, 1]"));
        }
        Ok(())
    }
}
