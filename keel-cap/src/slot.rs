//! Capability slot storage model
//!
//! A slot is the fundamental unit of capability storage: exactly one
//! [`Cap`] plus one [`MdbNode`] of derivation metadata. Slots are
//! organised into CNodes (contiguous ranges in the kernel's slot arena)
//! and are addressed only by resolving a capability address from some
//! root - they have no identity outside the trie and list structures
//! that reference them.
//!
//! # Derivation list
//!
//! The MDB (mapping database) is a single doubly linked list over all
//! non-null slots, ordered so that a capability's derived children
//! appear contiguously after it. The list gives revocation an efficient
//! traversal order and O(1) splicing; whether a neighbour is actually a
//! descendant is a property of the capabilities themselves, tested by
//! the kernel's parent predicate.
//!
//! Links are slot indices, not references, so splices are plain index
//! rewrites with no aliasing hazard.

use core::fmt;

use crate::cap::Cap;

/// Object reference - kernel-internal index to the actual object.
///
/// An index into a kernel object table, not a raw pointer. Indices are
/// bounds-checkable, compact, and clearing a table entry invalidates
/// every outstanding reference at once.
///
/// An `ObjectRef` of zero (`ObjectRef::NULL`) references no object.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ObjectRef(u32);

impl ObjectRef {
    /// Null reference (no object).
    pub const NULL: Self = Self(0);

    /// Create an object reference from a raw index.
    ///
    /// Index 0 is reserved for NULL; valid object indices start at 1.
    #[inline]
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Get the raw index value.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Check if this is a null reference.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Check if this is a valid (non-null) reference.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "ObjectRef::NULL")
        } else {
            write!(f, "ObjectRef({})", self.0)
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Slot reference - index of a capability slot in the kernel's arena.
///
/// Like [`ObjectRef`] this is an index rather than a pointer; index 0
/// is reserved as the null slot, so MDB list ends and "no handler
/// installed" are both representable without an option type in the
/// packed slot layout.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SlotRef(u32);

impl SlotRef {
    /// Null slot (no slot / end of list).
    pub const NULL: Self = Self(0);

    /// Create from a raw index.
    ///
    /// Index 0 is reserved for NULL. Valid slot indices start at 1.
    #[inline]
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Get the raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Check if this is the null slot reference.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Check if this is a valid (non-null) reference.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// The slot `offset` places after this one in the same CNode.
    #[inline]
    #[must_use]
    pub const fn offset(self, offset: u32) -> Self {
        Self(self.0 + offset)
    }
}

impl fmt::Debug for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "SlotRef::NULL")
        } else {
            write!(f, "SlotRef({})", self.0)
        }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "slot#{}", self.0)
        }
    }
}

/// Derivation-list node stored alongside every capability.
///
/// `prev`/`next` thread the slot into the global derivation-ordered
/// list. `revocable` marks the head of a revocable run: revocation of a
/// slot removes the following slots for as long as they test as its
/// descendants. `first_badged` marks the first capability of a distinct
/// badge-equivalence run, which stops a badged ancestor's revocation
/// from crossing into a sibling badge run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MdbNode {
    /// Previous slot in derivation order.
    pub prev: SlotRef,
    /// Next slot in derivation order.
    pub next: SlotRef,
    /// This capability may have derived descendants revoked through it.
    pub revocable: bool,
    /// This capability starts a new badge-equivalence run.
    pub first_badged: bool,
}

impl MdbNode {
    /// Node with null links and cleared flags (empty-slot state).
    pub const NULL: Self = Self {
        prev: SlotRef::NULL,
        next: SlotRef::NULL,
        revocable: false,
        first_badged: false,
    };

    /// Node for a freshly created original capability.
    ///
    /// Original capabilities are revocation roots and badge-run heads.
    #[must_use]
    pub const fn original() -> Self {
        Self {
            prev: SlotRef::NULL,
            next: SlotRef::NULL,
            revocable: true,
            first_badged: true,
        }
    }

    /// Check if this node is linked into the derivation list.
    #[inline]
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.prev.is_valid() || self.next.is_valid()
    }
}

/// Capability slot: one capability plus its derivation node.
///
/// # Invariants
///
/// - A slot holding `Cap::Null` has a null [`MdbNode`] (it is not in
///   the derivation list).
/// - Every slot holding a non-null capability is linked into exactly
///   one position of the global derivation list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Slot {
    /// The stored capability.
    pub cap: Cap,
    /// Derivation metadata.
    pub mdb: MdbNode,
}

impl Slot {
    /// Create an empty slot.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            cap: Cap::Null,
            mdb: MdbNode::NULL,
        }
    }

    /// Check if the slot is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cap.is_null()
    }

    /// Clear the slot (make empty, unlink metadata).
    #[inline]
    pub fn clear(&mut self) {
        *self = Self::empty();
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "<empty>")
        } else {
            write!(f, "{}", self.cap)?;
            if self.mdb.revocable {
                write!(f, " (revocable)")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slot() {
        let slot = Slot::empty();
        assert!(slot.is_empty());
        assert!(!slot.mdb.is_linked());
        assert!(!slot.mdb.revocable);
    }

    #[test]
    fn test_slot_clear() {
        let mut slot = Slot {
            cap: Cap::Tcb {
                tcb: ObjectRef::from_index(1),
            },
            mdb: MdbNode::original(),
        };
        assert!(!slot.is_empty());
        slot.clear();
        assert!(slot.is_empty());
        assert_eq!(slot.mdb, MdbNode::NULL);
    }

    #[test]
    fn test_original_mdb_flags() {
        let mdb = MdbNode::original();
        assert!(mdb.revocable);
        assert!(mdb.first_badged);
        assert!(!mdb.is_linked());
    }
}
