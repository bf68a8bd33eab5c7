//! Capability values
//!
//! A capability is an unforgeable token that combines an object
//! reference with access rights. Capabilities are the *only* way to
//! reach kernel objects: they cannot be forged or guessed, only granted.
//!
//! [`Cap`] is a closed tagged union over the capability kinds this core
//! handles. Every decision point in the resolver and the derivation
//! tracker matches on it exhaustively, so "root is not a CNode" and
//! "walk ended on a non-CNode" are distinct, compiler-checked cases
//! rather than fallthroughs.
//!
//! Capabilities are immutable values. New capabilities are produced by
//! the pure transformation functions [`Cap::derive`], [`Cap::mint`] and
//! [`Cap::restrict_rights`]; storage and derivation bookkeeping live in
//! the kernel crate.

use core::fmt;

use crate::cnode::{CNodeGuard, CNodeRadix, MAX_CNODE_RADIX, MIN_CNODE_RADIX};
use crate::error::CapError;
use crate::slot::{ObjectRef, SlotRef};
use crate::{Badge, CapRights};

/// Capability kind discriminant.
///
/// Used for diagnostics and type checks that don't need the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapType {
    /// Empty slot (no capability).
    Null,
    /// Untyped memory.
    Untyped,
    /// Memory frame.
    Frame,
    /// Synchronous IPC endpoint.
    Endpoint,
    /// Asynchronous notification.
    Notification,
    /// One-time reply.
    Reply,
    /// Capability node (CNode).
    CNode,
    /// Thread control block.
    Tcb,
}

impl CapType {
    /// Get the human-readable name for this capability type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Untyped => "Untyped",
            Self::Frame => "Frame",
            Self::Endpoint => "Endpoint",
            Self::Notification => "Notification",
            Self::Reply => "Reply",
            Self::CNode => "CNode",
            Self::Tcb => "TCB",
        }
    }
}

impl fmt::Display for CapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A capability value.
///
/// Fixed-width tagged value: object type, access rights, and
/// type-specific fields. The `Null` variant is the default and the
/// contents of every empty slot.
///
/// # CNode capabilities
///
/// A `CNode` capability carries everything resolution needs: the base
/// slot of the node's `2^radix` slot range plus the guard that must
/// match before the radix bits are consumed. Guard and radix live in
/// the *capability*, not the node, so two capabilities to the same
/// CNode may impose different guards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Cap {
    /// Empty slot (no capability).
    #[default]
    Null,

    /// Untyped memory: raw physical region that can be retyped.
    Untyped {
        /// Base address of the region.
        base: u64,
        /// Region size as a power of two.
        size_bits: u8,
    },

    /// Memory frame, mappable into an address space.
    Frame {
        /// The frame object.
        frame: ObjectRef,
        /// Access rights (read/write).
        rights: CapRights,
    },

    /// Synchronous IPC endpoint.
    Endpoint {
        /// The endpoint object.
        ep: ObjectRef,
        /// Badge delivered to the receiver (zero = unbadged).
        badge: Badge,
        /// Access rights (send/receive/grant/grant-reply).
        rights: CapRights,
    },

    /// Asynchronous notification.
    Notification {
        /// The notification object.
        ntfn: ObjectRef,
        /// Badge OR'd into the notification word on signal.
        badge: Badge,
        /// Access rights (signal/wait).
        rights: CapRights,
    },

    /// One-time reply capability.
    Reply {
        /// The thread awaiting the reply.
        tcb: ObjectRef,
    },

    /// Capability node: a `2^radix` slot table with a guard.
    CNode {
        /// First slot of the node's contiguous slot range.
        base: SlotRef,
        /// log2 of the slot count.
        radix: CNodeRadix,
        /// Guard matched before the radix bits are consumed.
        guard: CNodeGuard,
    },

    /// Thread control block.
    Tcb {
        /// The thread object.
        tcb: ObjectRef,
    },
}

impl Cap {
    /// Create a CNode capability.
    ///
    /// Enforces the construction invariants the resolver relies on:
    /// the radix must be within `[MIN_CNODE_RADIX, MAX_CNODE_RADIX]`,
    /// so every CNode level resolves at least one bit.
    ///
    /// # Errors
    ///
    /// Returns [`CapError::InvalidRadix`] if the radix is out of range.
    pub const fn new_cnode(
        base: SlotRef,
        radix: CNodeRadix,
        guard: CNodeGuard,
    ) -> Result<Self, CapError> {
        if radix < MIN_CNODE_RADIX || radix > MAX_CNODE_RADIX {
            return Err(CapError::InvalidRadix);
        }
        Ok(Self::CNode { base, radix, guard })
    }

    /// Get the capability type discriminant.
    #[must_use]
    pub const fn cap_type(&self) -> CapType {
        match self {
            Self::Null => CapType::Null,
            Self::Untyped { .. } => CapType::Untyped,
            Self::Frame { .. } => CapType::Frame,
            Self::Endpoint { .. } => CapType::Endpoint,
            Self::Notification { .. } => CapType::Notification,
            Self::Reply { .. } => CapType::Reply,
            Self::CNode { .. } => CapType::CNode,
            Self::Tcb { .. } => CapType::Tcb,
        }
    }

    /// Check if this is the null capability.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the access rights, if this capability kind carries any.
    #[must_use]
    pub const fn rights(&self) -> Option<CapRights> {
        match self {
            Self::Frame { rights, .. }
            | Self::Endpoint { rights, .. }
            | Self::Notification { rights, .. } => Some(*rights),
            _ => None,
        }
    }

    /// Get the badge (zero for unbadged or non-badgeable capabilities).
    #[must_use]
    pub const fn badge(&self) -> Badge {
        match self {
            Self::Endpoint { badge, .. } | Self::Notification { badge, .. } => *badge,
            _ => Badge::NONE,
        }
    }

    /// Check if this capability kind supports badging.
    #[inline]
    #[must_use]
    pub const fn supports_badge(&self) -> bool {
        matches!(self, Self::Endpoint { .. } | Self::Notification { .. })
    }

    /// Check if this capability can send (endpoint/notification write).
    #[must_use]
    pub const fn can_send(&self) -> bool {
        match self.rights() {
            Some(r) => r.has_write(),
            None => false,
        }
    }

    /// Check if this capability can grant capabilities over IPC.
    #[must_use]
    pub const fn can_grant(&self) -> bool {
        match self.rights() {
            Some(r) => r.has_grant(),
            None => false,
        }
    }

    /// Check if this capability can grant reply capabilities over IPC.
    #[must_use]
    pub const fn can_grant_reply(&self) -> bool {
        match self.rights() {
            Some(r) => r.has_grant_reply(),
            None => false,
        }
    }

    /// Derive the capability stored when this one is copied.
    ///
    /// Most capabilities derive to themselves. Untyped capabilities do
    /// not derive (copies would confuse retype accounting) and reply
    /// capabilities are single-use.
    ///
    /// # Errors
    ///
    /// Returns [`CapError::InvalidOperation`] for non-derivable kinds.
    pub const fn derive(&self) -> Result<Self, CapError> {
        match self {
            Self::Untyped { .. } | Self::Reply { .. } => Err(CapError::InvalidOperation),
            _ => Ok(*self),
        }
    }

    /// Mint a derived capability with attenuated rights and a badge.
    ///
    /// Rights can only be reduced, never escalated. A badge may only be
    /// applied to endpoint and notification capabilities, and only if
    /// the source is unbadged (a badge is set at most once along a
    /// derivation chain).
    ///
    /// # Errors
    ///
    /// - [`CapError::RightsEscalation`]: new rights not a subset
    /// - [`CapError::BadgeNotSupported`]: badge on a non-badgeable kind
    /// - [`CapError::BadgeAlreadySet`]: source already badged differently
    /// - [`CapError::InvalidOperation`]: kind cannot be minted
    pub fn mint(&self, new_rights: CapRights, new_badge: Badge) -> Result<Self, CapError> {
        if new_badge.is_some() && !self.supports_badge() {
            return Err(CapError::BadgeNotSupported);
        }
        match *self {
            Self::Endpoint { ep, badge, rights } => {
                if !new_rights.is_subset_of(rights) {
                    return Err(CapError::RightsEscalation);
                }
                let badge = Self::effective_badge(badge, new_badge)?;
                Ok(Self::Endpoint {
                    ep,
                    badge,
                    rights: new_rights,
                })
            }
            Self::Notification { ntfn, badge, rights } => {
                if !new_rights.is_subset_of(rights) {
                    return Err(CapError::RightsEscalation);
                }
                let badge = Self::effective_badge(badge, new_badge)?;
                Ok(Self::Notification {
                    ntfn,
                    badge,
                    rights: new_rights,
                })
            }
            Self::Frame { frame, rights } => {
                if !new_rights.is_subset_of(rights) {
                    return Err(CapError::RightsEscalation);
                }
                Ok(Self::Frame {
                    frame,
                    rights: new_rights,
                })
            }
            _ => Err(CapError::InvalidOperation),
        }
    }

    /// Restrict the rights of this capability in place (mutate).
    ///
    /// Like minting without a badge: rights can only be reduced. The
    /// derivation parentage of the slot is unchanged by this operation,
    /// so the kernel's mutate path never touches derivation links.
    ///
    /// # Errors
    ///
    /// - [`CapError::RightsEscalation`]: new rights not a subset
    /// - [`CapError::InvalidOperation`]: kind carries no rights
    pub fn restrict_rights(&self, new_rights: CapRights) -> Result<Self, CapError> {
        self.mint(new_rights, Badge::NONE)
    }

    fn effective_badge(src: Badge, new: Badge) -> Result<Badge, CapError> {
        if new.is_none() {
            Ok(src)
        } else if src.is_some() && src != new {
            Err(CapError::BadgeAlreadySet)
        } else {
            Ok(new)
        }
    }

    /// Check if two capabilities reference the same derivation region.
    ///
    /// This is the object-identity half of the derivation-parent test:
    /// badges and rights are ignored, only the referenced object (or
    /// for untyped memory, range containment) matters. Null and reply
    /// capabilities have no derivation region.
    #[must_use]
    pub fn same_region_as(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Untyped { base, size_bits },
                Self::Untyped {
                    base: other_base,
                    size_bits: other_size,
                },
            ) => {
                // size_bits is caller-supplied; 64 or more means the
                // region covers the rest of the address space
                let len = |bits: u8| 1u64.checked_shl(bits as u32).unwrap_or(u64::MAX);
                let end = base.saturating_add(len(*size_bits));
                let other_end = other_base.saturating_add(len(*other_size));
                base <= other_base && other_end <= end
            }
            (Self::Frame { frame, .. }, Self::Frame { frame: f2, .. }) => frame == f2,
            (Self::Endpoint { ep, .. }, Self::Endpoint { ep: e2, .. }) => ep == e2,
            (Self::Notification { ntfn, .. }, Self::Notification { ntfn: n2, .. }) => ntfn == n2,
            (
                Self::CNode { base, radix, .. },
                Self::CNode {
                    base: b2,
                    radix: r2,
                    ..
                },
            ) => base == b2 && radix == r2,
            (Self::Tcb { tcb, .. }, Self::Tcb { tcb: t2, .. }) => tcb == t2,
            (Self::Null, _)
            | (_, Self::Null)
            | (Self::Reply { .. }, _)
            | (_, Self::Reply { .. }) => false,
            _ => false,
        }
    }

    /// Decide whether a newly inserted capability starts a revocable run.
    ///
    /// A freshly badged endpoint or notification capability is the head
    /// of a new badge-equivalence run; untyped capabilities are always
    /// revocation roots for what is retyped out of them. Everything else
    /// inherits revocation from its source.
    #[must_use]
    pub fn is_revocable_derivation(new_cap: &Self, src_cap: &Self) -> bool {
        match (new_cap, src_cap) {
            (Self::Endpoint { badge, .. }, Self::Endpoint { badge: src, .. })
            | (Self::Notification { badge, .. }, Self::Notification { badge: src, .. }) => {
                badge != src
            }
            (Self::Untyped { .. }, _) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Cap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "<null>"),
            Self::Untyped { base, size_bits } => {
                write!(f, "Untyped({:#x}, 2^{})", base, size_bits)
            }
            Self::Frame { frame, rights } => write!(f, "Frame({}) [{}]", frame, rights),
            Self::Endpoint { ep, badge, rights } => {
                write!(f, "Endpoint({}) [{}]", ep, rights)?;
                if badge.is_some() {
                    write!(f, " badge={}", badge)?;
                }
                Ok(())
            }
            Self::Notification { ntfn, badge, rights } => {
                write!(f, "Notification({}) [{}]", ntfn, rights)?;
                if badge.is_some() {
                    write!(f, " badge={}", badge)?;
                }
                Ok(())
            }
            Self::Reply { tcb } => write!(f, "Reply({})", tcb),
            Self::CNode { base, radix, guard } => {
                write!(f, "CNode(base={}, 2^{} slots, {})", base, radix, guard)
            }
            Self::Tcb { tcb } => write!(f, "TCB({})", tcb),
        }
    }
}
