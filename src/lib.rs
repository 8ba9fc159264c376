//! # Dynamic Hashing
//!
//! In-memory associative indexes built on the two classical dynamic hashing
//! schemes. Both grow one bucket split at a time, never rehashing the whole
//! table.
//!
//! - `ExtendibleHashMap`: a directory of `2^global_depth` slots addressed by
//!   the top bits of the key. Several slots may share one bucket; a full
//!   bucket is split on its next key bit, doubling the directory only when
//!   the bucket is already referenced by a single slot.
//! - `LinearHashMap`: a growing vector of chained buckets addressed by the
//!   low bits of the key. Splits are driven by a global load factor and
//!   happen round-robin at a split pointer, whichever bucket overflowed.
//!
//! Keys are fixed-width unsigned integers whose own bits address the buckets
//! (see [`BitKey`]); no hash function is applied. Spread keys beforehand if
//! their distribution is skewed.
//!
//! ## Basic Usage
//!
//! ```rust
//! use dynhash::{ExtendibleHashMap, LinearHashMap};
//!
//! # fn main() -> dynhash::Result<()> {
//! let mut extendible = ExtendibleHashMap::with_depth(3)?;
//! let mut linear = LinearHashMap::with_load_factor(0.8)?;
//!
//! for key in [25u8, 7, 5, 6, 20, 8, 3, 30, 17, 13, 21, 28, 12, 31] {
//!     extendible.insert(key, u32::from(key) * 10)?;
//!     linear.insert(key, u32::from(key) * 10);
//! }
//!
//! assert_eq!(extendible.get(&17), Some(&170));
//! assert_eq!(linear.get(&17), Some(&170));
//! assert_eq!(extendible.get(&255), None);
//!
//! assert_eq!(extendible.remove(&17), Some(170));
//! assert!(!extendible.contains_key(&17));
//!
//! // diagnostic dumps, one line per slot or bucket
//! println!("{extendible}");
//! println!("{linear}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Limitations
//!
//! Extendible splits terminate because distinct keys always differ in some
//! bit, but the directory never grows past [`Config::max_depth`] (by default
//! [`DEFAULT_MAX_DEPTH`] bits, `2^24` slots). When more than a bucket's worth
//! of keys share every addressable bit, insertion reports
//! [`Error::DepthExhausted`]; raise the bound for clustered wide keys.
//!
//! Linear hashing never fails; once the key width is used up it stops
//! splitting and its chains keep growing.
//!
//! Neither map is thread-safe. Guard a map with a single lock: a directory
//! doubling or split rewrites the addressing that every lookup depends on.

/// Fixed-capacity leaf blocks and records
mod block;
/// Directory configuration
mod config;
/// Error types
mod error;
/// Extendible hashing directory
mod extendible;
/// Bit addressing of integer keys
mod key;
/// Linear hashing directory
mod linear;
/// Common interface over both directories
mod utils;

#[cfg(test)]
mod proptests;

pub use block::{DEFAULT_BLOCK_CAPACITY, LeafBlock, OverflowPolicy, Record, Records};
pub use config::{Config, DEFAULT_LOAD_FACTOR_THRESHOLD, DEFAULT_MAX_DEPTH};
pub use error::{Error, Result};
pub use extendible::ExtendibleHashMap;
pub use key::BitKey;
pub use linear::LinearHashMap;
pub use utils::{HashIndex, load};
