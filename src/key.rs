//! Bit addressing for fixed-width unsigned integer keys.
//!
//! Neither directory hashes its keys: the key's own bits select a bucket.
//! Extendible hashing numbers bits from the most significant end, linear
//! hashing from the least significant end. Both views live here side by
//! side so they can be tested independently.

use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

/// A fixed-width unsigned integer usable as a directory key.
pub trait BitKey: Copy + Eq + Hash + Debug + Display {
    /// Width of the key's storage in bits.
    const BITS: u32;

    /// The key zero-extended to 64 bits.
    fn to_bits(self) -> u64;

    /// The top `width` bits of the key, read as an integer.
    ///
    /// A width of zero yields `0`. Widths above [`Self::BITS`] are clamped.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    fn msb_prefix(self, width: u32) -> usize {
        let shift = Self::BITS.saturating_sub(width);
        self.to_bits().checked_shr(shift).unwrap_or(0) as usize
    }

    /// Bit `n` counted from the most significant bit (bit `0` is the top bit).
    #[must_use]
    fn msb_bit(self, n: u32) -> bool {
        n < Self::BITS &&
            self.to_bits()
                .checked_shr(Self::BITS.saturating_sub(1).saturating_sub(n))
                .is_some_and(|bits| bits & 1 == 1)
    }

    /// The low `width` bits of the key, read as an integer.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    fn lsb_mask(self, width: u32) -> usize {
        let mask = u64::MAX.checked_shr(u64::BITS.saturating_sub(width)).unwrap_or(0);
        (self.to_bits() & mask) as usize
    }

    /// Bit `n` counted from the least significant bit.
    #[must_use]
    fn lsb_bit(self, n: u32) -> bool {
        n < Self::BITS && self.to_bits().checked_shr(n).is_some_and(|bits| bits & 1 == 1)
    }
}

/// Implements [`BitKey`] for unsigned types losslessly convertible to `u64`.
macro_rules! impl_bit_key {
    ($($ty:ty),*) => {
        $(
            impl BitKey for $ty {
                const BITS: u32 = <$ty>::BITS;

                fn to_bits(self) -> u64 {
                    u64::from(self)
                }
            }
        )*
    };
}

impl_bit_key!(u8, u16, u32, u64);

impl BitKey for usize {
    const BITS: u32 = usize::BITS;

    fn to_bits(self) -> u64 {
        // usize is at most 64 bits wide on every supported target
        self as u64
    }
}
