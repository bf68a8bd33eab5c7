//! Badge values for capability identification
//!
//! A badge is an immutable value attached to a capability during minting.
//! When a message is sent through a badged endpoint, the receiver sees the
//! badge value, allowing them to identify the sender without a separate
//! authentication mechanism.
//!
//! Badges also feed the derivation tracker: minting a *new* badge value
//! onto an endpoint or notification capability starts a fresh revocable
//! run in the derivation list (see the `first_badged` flag on
//! [`MdbNode`](crate::MdbNode)).

use core::fmt;

/// A badge value for capability identification.
///
/// Badges are 64-bit values attached to capabilities during minting.
/// They are immutable once set and are delivered to the receiver during
/// IPC operations.
///
/// # Zero Badge
///
/// A badge of zero (`Badge::NONE`) indicates an unbadged capability.
/// This is the default for original (non-minted) capabilities.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Badge(u64);

impl Badge {
    /// No badge (unbadged capability).
    pub const NONE: Self = Self(0);

    /// Maximum badge value.
    pub const MAX: Self = Self(u64::MAX);

    /// Create a new badge with the given value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw badge value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Check if this is an unbadged capability (badge is zero).
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Check if this capability has a badge (badge is non-zero).
    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Badge::NONE")
        } else {
            write!(f, "Badge({:#018x})", self.0)
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{:#x}", self.0)
        }
    }
}

impl From<u64> for Badge {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Badge> for u64 {
    #[inline]
    fn from(badge: Badge) -> Self {
        badge.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_none() {
        assert!(Badge::NONE.is_none());
        assert!(!Badge::NONE.is_some());
        assert_eq!(Badge::NONE.value(), 0);
    }

    #[test]
    fn test_badge_value() {
        let badge = Badge::new(0x1234);
        assert!(!badge.is_none());
        assert!(badge.is_some());
        assert_eq!(badge.value(), 0x1234);
    }
}
