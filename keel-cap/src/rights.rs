//! Capability access rights
//!
//! Four orthogonal permission bits, packed into one byte. What a bit
//! means depends on the object behind the capability: read is receive
//! on an endpoint but load on a frame, write is send or store. Grant
//! moves capabilities across IPC; grant-reply is its narrow form that
//! moves reply capabilities only, enough for call/reply servers.
//!
//! The one rule enforced everywhere is monotonicity: derivation may
//! drop bits, never add them ([`is_subset_of`](CapRights::is_subset_of)
//! is the check minting runs).

use core::fmt;

/// A set of access rights.
///
/// Bits 0-3 are read, write, grant and grant-reply; the upper nibble is
/// reserved and always zero. The empty set is a valid (if useless)
/// rights value, not an error.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct CapRights(u8);

impl CapRights {
    /// The empty set.
    pub const NONE: Self = Self(0);

    /// Read: receive from an endpoint, load from a frame.
    pub const READ: Self = Self(1 << 0);

    /// Write: send to an endpoint, store to a frame.
    pub const WRITE: Self = Self(1 << 1);

    /// Grant: pass arbitrary capabilities over IPC.
    pub const GRANT: Self = Self(1 << 2);

    /// Grant-reply: pass reply capabilities only.
    pub const GRANT_REPLY: Self = Self(1 << 3);

    /// Every right.
    pub const ALL: Self = Self(0x0F);

    /// Read and write.
    pub const RW: Self = Self(Self::READ.0 | Self::WRITE.0);

    /// Read, write and grant.
    pub const RWG: Self = Self(Self::READ.0 | Self::WRITE.0 | Self::GRANT.0);

    /// Build a rights set from individual flags.
    #[inline]
    #[must_use]
    pub const fn new(read: bool, write: bool, grant: bool, grant_reply: bool) -> Self {
        let mut bits = 0u8;
        if read {
            bits |= Self::READ.0;
        }
        if write {
            bits |= Self::WRITE.0;
        }
        if grant {
            bits |= Self::GRANT.0;
        }
        if grant_reply {
            bits |= Self::GRANT_REPLY.0;
        }
        Self(bits)
    }

    /// Build from a raw byte; reserved upper bits are discarded.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0F)
    }

    /// The raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether the read right is present.
    #[inline]
    #[must_use]
    pub const fn has_read(self) -> bool {
        (self.0 & Self::READ.0) != 0
    }

    /// Whether the write right is present.
    #[inline]
    #[must_use]
    pub const fn has_write(self) -> bool {
        (self.0 & Self::WRITE.0) != 0
    }

    /// Whether the grant right is present.
    #[inline]
    #[must_use]
    pub const fn has_grant(self) -> bool {
        (self.0 & Self::GRANT.0) != 0
    }

    /// Whether the grant-reply right is present.
    #[inline]
    #[must_use]
    pub const fn has_grant_reply(self) -> bool {
        (self.0 & Self::GRANT_REPLY.0) != 0
    }

    /// Whether every right in `other` is also in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// The rights present in both sets.
    #[inline]
    #[must_use]
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// The rights present in either set.
    ///
    /// For assembling a rights value, not for widening an existing
    /// capability's rights; attenuation checks sit above this.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether `self` holds no right that `other` lacks.
    ///
    /// This is the attenuation check: a mint is legal exactly when the
    /// requested rights pass it against the source.
    #[inline]
    #[must_use]
    pub const fn is_subset_of(self, other: Self) -> bool {
        (self.0 & !other.0) == 0
    }

    /// Whether the set is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for CapRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_set();
        if self.has_read() {
            list.entry(&"Read");
        }
        if self.has_write() {
            list.entry(&"Write");
        }
        if self.has_grant() {
            list.entry(&"Grant");
        }
        if self.has_grant_reply() {
            list.entry(&"GrantReply");
        }
        list.finish()
    }
}

impl fmt::Display for CapRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            if self.has_read() { "R" } else { "-" },
            if self.has_write() { "W" } else { "-" },
            if self.has_grant() { "G" } else { "-" },
            if self.has_grant_reply() { "g" } else { "-" },
        )
    }
}

impl core::ops::BitAnd for CapRights {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersect(rhs)
    }
}

impl core::ops::BitOr for CapRights {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}
