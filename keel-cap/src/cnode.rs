//! CNode configuration - radix and guard
//!
//! A CNode is a power-of-two table of capability slots. CNodes form the
//! hierarchical capability space (CSpace): a CNode capability can be
//! stored in a slot of another CNode, and address resolution walks the
//! resulting trie.
//!
//! # Guarded addressing
//!
//! A CNode capability carries a *guard*: a constant bit pattern that must
//! match the next bits of the address before the radix-index bits are
//! consumed. A single CNode level can therefore stand in for several
//! logical trie levels by pre-matching a constant prefix, which is what
//! makes the trie "guarded".
//!
//! # Configuration invariants
//!
//! - **Radix**: the number of slots is `2^radix`; radix is at least 1,
//!   so every CNode level resolves at least one bit. A CNode that would
//!   resolve zero bits is rejected at construction, never at resolution.
//! - **Guard**: 0 to [`MAX_GUARD_BITS`] bits.

use core::fmt;

use crate::error::CapError;

/// CNode radix type.
///
/// The radix determines the number of slots in the CNode:
/// - `radix = 1`: 2 slots
/// - `radix = 8`: 256 slots
/// - `radix = 12`: 4096 slots
pub type CNodeRadix = u8;

/// Minimum CNode radix (2^1 = 2 slots).
///
/// Radix 0 is forbidden: together with an empty guard it would make a
/// CNode level that resolves zero address bits, and resolution would
/// never terminate.
pub const MIN_CNODE_RADIX: CNodeRadix = 1;

/// Maximum CNode radix (2^12 = 4096 slots).
pub const MAX_CNODE_RADIX: CNodeRadix = 12;

/// Maximum guard size in bits.
pub const MAX_GUARD_BITS: u8 = 58;

/// Guard value for address resolution.
///
/// Guards allow efficient addressing by requiring certain bits to match
/// before extracting the index. This enables:
///
/// - Skipping levels in a sparse CSpace
/// - Efficient single-level addressing
/// - Namespace isolation between components
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub struct CNodeGuard {
    /// The guard value to match.
    pub value: u64,
    /// Number of bits in the guard (0 to [`MAX_GUARD_BITS`]).
    pub bits: u8,
}

impl CNodeGuard {
    /// No guard (matches everything, consumes no bits).
    pub const NONE: Self = Self { value: 0, bits: 0 };

    /// Create a new guard.
    ///
    /// Only the low `bits` bits of `value` are kept.
    ///
    /// # Errors
    ///
    /// Returns [`CapError::InvalidGuard`] if `bits > MAX_GUARD_BITS`.
    pub const fn new(value: u64, bits: u8) -> Result<Self, CapError> {
        if bits > MAX_GUARD_BITS {
            return Err(CapError::InvalidGuard);
        }
        let mask = if bits == 0 { 0 } else { (1u64 << bits) - 1 };
        Ok(Self {
            value: value & mask,
            bits,
        })
    }

    /// Check if this is an empty guard (no bits).
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl fmt::Display for CNodeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "no guard")
        } else {
            write!(f, "guard({:#x}, {} bits)", self.value, self.bits)
        }
    }
}
