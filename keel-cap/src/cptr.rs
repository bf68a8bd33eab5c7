//! Capability pointer (CPtr) addressing
//!
//! A CPtr addresses a capability slot within a CSpace through a
//! hierarchical path of CNode indices. The CPtr is interpreted MSB-first
//! as concatenated guard and index fields determined by the CNode chain
//! walked; the encoding is *not* self-describing - the same bit pattern
//! resolves differently depending on the CNode structure of the root.
//!
//! # Bit windows
//!
//! Resolution tracks the number of address bits still to resolve
//! (`n_bits`). The *active window* is the top `n_bits` of the CPtr value
//! shifted down to the low end; each CNode level peels its guard and
//! index fields off the top of that window. Working in terms of bits
//! remaining (rather than bits consumed) keeps the arithmetic aligned
//! with the `bits_left` fields reported in lookup faults.

use core::fmt;

/// Number of bits in a capability address.
pub const WORD_BITS: u8 = 64;

/// Capability pointer - addresses a slot in the CSpace.
///
/// A CPtr is a 64-bit value interpreted as concatenated guard and index
/// fields through a hierarchy of CNodes.
///
/// # Layout
///
/// `#[repr(transparent)]` over the raw u64 address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CPtr(u64);

impl CPtr {
    /// Create a CPtr from a raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw CPtr value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Create a null CPtr.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self(0)
    }

    /// Check if this is a null CPtr.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Extract the guard field at the top of the active window.
    ///
    /// Returns the top `guard_bits` of the remaining `n_bits` of address.
    /// When `guard_bits` exceeds `n_bits` the shift saturates at zero so
    /// the caller can still report the bits it found; the comparison
    /// against the stored guard is the caller's responsibility.
    ///
    /// A zero-width guard extracts zero; this also avoids the undefined
    /// shift when `n_bits == WORD_BITS` and `guard_bits == 0`.
    #[inline]
    #[must_use]
    pub const fn guard_window(self, n_bits: u8, guard_bits: u8) -> u64 {
        if guard_bits == 0 {
            return 0;
        }
        let shift = n_bits.saturating_sub(guard_bits);
        let mask = (1u64 << guard_bits) - 1;
        (self.0 >> shift) & mask
    }

    /// Extract the radix-index field for the current level.
    ///
    /// `level_bits` is `guard_bits + radix` for the level; the index is
    /// the `radix` bits immediately below the guard field. Requires
    /// `level_bits <= n_bits` (checked by the resolver before calling).
    #[inline]
    #[must_use]
    pub const fn index_window(self, n_bits: u8, level_bits: u8, radix: u8) -> usize {
        let shift = n_bits - level_bits;
        let mask = (1u64 << radix) - 1;
        ((self.0 >> shift) & mask) as usize
    }

    /// Build a CPtr for a single-level CSpace from a slot index.
    ///
    /// Shifts the index to the top bits, after `guard_bits` of guard.
    #[inline]
    #[must_use]
    pub const fn from_index(index: u64, radix: u8, guard: u64, guard_bits: u8) -> Self {
        let guard_part = if guard_bits == 0 {
            0
        } else {
            guard << (WORD_BITS - guard_bits) as u32
        };
        let index_part = index << (WORD_BITS - guard_bits - radix) as u32;
        Self(guard_part | index_part)
    }
}

impl Default for CPtr {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for CPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "CPtr::null()")
        } else {
            write!(f, "CPtr({:#018x})", self.0)
        }
    }
}

impl fmt::Display for CPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{:#x}", self.0)
        }
    }
}

impl From<u64> for CPtr {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cptr_null() {
        let cptr = CPtr::null();
        assert!(cptr.is_null());
        assert_eq!(cptr.raw(), 0);
    }

    #[test]
    fn test_guard_window_top_bits() {
        // Guard value 0b11 in the top 2 bits of a full-width window
        let cptr = CPtr::from_raw(0xC000_0000_0000_0000);
        assert_eq!(cptr.guard_window(64, 2), 0b11);
        assert_eq!(cptr.guard_window(64, 3), 0b110);
    }

    #[test]
    fn test_guard_window_zero_width() {
        let cptr = CPtr::from_raw(u64::MAX);
        assert_eq!(cptr.guard_window(64, 0), 0);
    }

    #[test]
    fn test_index_window() {
        // 8-bit radix, no guard, index 5 at the top of the word
        let cptr = CPtr::from_index(5, 8, 0, 0);
        assert_eq!(cptr.index_window(64, 8, 8), 5);
    }

    #[test]
    fn test_index_window_after_guard() {
        // 4 guard bits (0b1010) then 8 index bits (0x3C)
        let cptr = CPtr::from_index(0x3C, 8, 0b1010, 4);
        assert_eq!(cptr.guard_window(64, 4), 0b1010);
        assert_eq!(cptr.index_window(64, 12, 8), 0x3C);
    }

    #[test]
    fn test_narrow_window() {
        // 11-bit address in the low bits: [idx(4)=0x9][guard(3)=0b101][idx(4)=0x6]
        let addr = (0x9u64 << 7) | (0b101 << 4) | 0x6;
        let cptr = CPtr::from_raw(addr);
        assert_eq!(cptr.index_window(11, 4, 4), 0x9);
        assert_eq!(cptr.guard_window(7, 3), 0b101);
        assert_eq!(cptr.index_window(7, 7, 4), 0x6);
    }
}
