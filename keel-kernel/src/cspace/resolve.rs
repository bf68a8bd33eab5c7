//! Guarded radix-trie resolution
//!
//! Resolves a capability address to a slot by walking CNode levels from
//! a root capability. Each level strips its guard bits (which must
//! match the CNode's stored guard constant) and then its radix bits
//! (indexing the CNode's slot array) off the top of the remaining
//! address window.
//!
//! # Resolution Algorithm
//!
//! 1. The root must be a CNode capability; its own guard and radix are
//!    consulted immediately, like any other level
//! 2. At each CNode:
//!    - Compare the guard field against the address; mismatch fails
//!      with full diagnostics (guard is checked *before* depth, so a
//!      mismatched guard is reported even when depth would also fail)
//!    - Fail if the level would consume more bits than remain
//!    - Extract the radix index and locate the slot
//! 3. If the level consumed the last bits, that slot is the answer,
//!    regardless of what it contains
//! 4. Otherwise read the slot: another CNode continues the walk, and
//!    anything else ends it with the unconsumed bit count reported
//!
//! The walk is a bounded loop: every level consumes at least one bit,
//! so it runs at most `bits_to_resolve` iterations.

use keel_cap::{Cap, CPtr, LookupFault, SlotRef, WORD_BITS};

use crate::cspace::arena::SlotArena;
use crate::error::SyscallError;

/// Outcome of a successful resolution.
///
/// `bits_remaining` is nonzero when the walk ended early on a non-CNode
/// capability; callers that require full consumption escalate that case
/// themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// The slot the walk ended on.
    pub slot: SlotRef,
    /// Address bits left unconsumed.
    pub bits_remaining: u8,
}

/// Resolve `bits_to_resolve` bits of `cptr` from `root`.
///
/// # Errors
///
/// - [`LookupFault::InvalidRoot`]: `root` is not a CNode capability
/// - [`LookupFault::GuardMismatch`]: a level's guard did not match
/// - [`LookupFault::DepthMismatch`]: a level needed more bits than remained
pub fn resolve_address_bits(
    arena: &SlotArena,
    root: &Cap,
    cptr: CPtr,
    bits_to_resolve: u8,
) -> Result<Resolution, LookupFault> {
    let (mut base, mut radix, mut guard) = match *root {
        Cap::CNode { base, radix, guard } => (base, radix, guard),
        _ => return Err(LookupFault::InvalidRoot),
    };

    let mut n_bits = bits_to_resolve;
    loop {
        let level_bits = radix + guard.bits;
        // level_bits >= 1 is a construction invariant of CNode caps,
        // so every iteration consumes at least one bit

        let found_guard = cptr.guard_window(n_bits, guard.bits);
        if guard.bits > n_bits || found_guard != guard.value {
            return Err(LookupFault::GuardMismatch {
                expected: guard.value,
                found: found_guard,
                bits_left: n_bits,
            });
        }

        if level_bits > n_bits {
            return Err(LookupFault::DepthMismatch {
                bits_needed: level_bits,
                bits_left: n_bits,
            });
        }

        let offset = cptr.index_window(n_bits, level_bits, radix);
        let slot = base.offset(offset as u32);

        if level_bits == n_bits {
            return Ok(Resolution {
                slot,
                bits_remaining: 0,
            });
        }

        n_bits -= level_bits;
        match arena.cap(slot) {
            Cap::CNode {
                base: next_base,
                radix: next_radix,
                guard: next_guard,
            } => {
                base = next_base;
                radix = next_radix;
                guard = next_guard;
            }
            _ => {
                return Ok(Resolution {
                    slot,
                    bits_remaining: n_bits,
                })
            }
        }
    }
}

/// Resolve a full-width capability address to a slot.
///
/// The entry point used for invocation addresses: the whole word must
/// resolve, so a partial walk (bits left over) is itself a lookup
/// failure, never a valid outcome.
///
/// # Errors
///
/// Any resolver fault, plus [`LookupFault::MissingCapability`] when the
/// walk ended early.
pub fn lookup_slot(arena: &SlotArena, root: &Cap, cptr: CPtr) -> Result<SlotRef, LookupFault> {
    let res = resolve_address_bits(arena, root, cptr, WORD_BITS)?;
    if res.bits_remaining != 0 {
        return Err(LookupFault::MissingCapability {
            bits_left: res.bits_remaining,
        });
    }
    Ok(res.slot)
}

/// Resolve a full-width address and read the capability it names.
///
/// Convenience wrapper over [`lookup_slot`]; callers get the capability
/// value and the slot together, or a fault - there is no path that
/// yields a slot without a defined capability value.
pub fn lookup_cap_and_slot(
    arena: &SlotArena,
    root: &Cap,
    cptr: CPtr,
) -> Result<(Cap, SlotRef), LookupFault> {
    let slot = lookup_slot(arena, root, cptr)?;
    Ok((arena.cap(slot), slot))
}

/// Resolve a slot for an explicit CNode-manipulation operation.
///
/// These operations supply their own root capability and an explicit
/// `depth` instead of resolving the full word. The depth is validated
/// first ([`SyscallError::RangeError`] for anything outside
/// `[1, WORD_BITS]` - a caller-contract violation, not a trie fault),
/// then the root is checked to be a CNode, then exactly `depth` bits
/// must resolve.
///
/// `was_source` tags any lookup failure with the role of the address,
/// so two-capability operations can report which side failed.
pub fn lookup_slot_for_cnode_op(
    arena: &SlotArena,
    was_source: bool,
    root: &Cap,
    cptr: CPtr,
    depth: u64,
) -> Result<SlotRef, SyscallError> {
    let failed = |fault| SyscallError::FailedLookup { was_source, fault };

    if depth < 1 || depth > WORD_BITS as u64 {
        return Err(SyscallError::RangeError {
            min: 1,
            max: WORD_BITS as u64,
        });
    }

    if !matches!(root, Cap::CNode { .. }) {
        return Err(failed(LookupFault::InvalidRoot));
    }

    let res = resolve_address_bits(arena, root, cptr, depth as u8).map_err(failed)?;
    if res.bits_remaining != 0 {
        return Err(failed(LookupFault::DepthMismatch {
            bits_needed: 0,
            bits_left: res.bits_remaining,
        }));
    }

    Ok(res.slot)
}

/// Resolve the source slot of a CNode operation.
pub fn lookup_source_slot(
    arena: &SlotArena,
    root: &Cap,
    cptr: CPtr,
    depth: u64,
) -> Result<SlotRef, SyscallError> {
    lookup_slot_for_cnode_op(arena, true, root, cptr, depth)
}

/// Resolve the target slot of a CNode operation.
pub fn lookup_target_slot(
    arena: &SlotArena,
    root: &Cap,
    cptr: CPtr,
    depth: u64,
) -> Result<SlotRef, SyscallError> {
    lookup_slot_for_cnode_op(arena, false, root, cptr, depth)
}

/// Resolve the pivot slot of a three-way rotate operation.
pub fn lookup_pivot_slot(
    arena: &SlotArena,
    root: &Cap,
    cptr: CPtr,
    depth: u64,
) -> Result<SlotRef, SyscallError> {
    lookup_slot_for_cnode_op(arena, true, root, cptr, depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_cap::{Badge, CapRights, CNodeGuard, ObjectRef};

    fn endpoint_cap(n: u32) -> Cap {
        Cap::Endpoint {
            ep: ObjectRef::from_index(n),
            badge: Badge::NONE,
            rights: CapRights::ALL,
        }
    }

    fn cnode_base(cap: &Cap) -> SlotRef {
        match cap {
            Cap::CNode { base, .. } => *base,
            other => panic!("expected CNode cap, got {other:?}"),
        }
    }

    /// Single-level CSpace: root radix 8, guard fills the rest of the word.
    fn single_level(arena: &mut SlotArena) -> Cap {
        let guard = CNodeGuard::new(0, (WORD_BITS - 8) as u8).unwrap();
        arena.alloc_cnode(8, guard).unwrap()
    }

    #[test]
    fn test_invalid_root() {
        let arena = SlotArena::new();
        let result = resolve_address_bits(&arena, &endpoint_cap(1), CPtr::null(), WORD_BITS);
        assert_eq!(result, Err(LookupFault::InvalidRoot));
    }

    #[test]
    fn test_single_level_resolution() {
        let mut arena = SlotArena::new();
        let root = single_level(&mut arena);
        let base = cnode_base(&root);

        // Address: 56 zero guard bits then index 5
        let cptr = CPtr::from_raw(5);
        let slot = lookup_slot(&arena, &root, cptr).unwrap();
        assert_eq!(slot, base.offset(5));
    }

    #[test]
    fn test_determinism() {
        let mut arena = SlotArena::new();
        let root = single_level(&mut arena);
        let cptr = CPtr::from_raw(42);
        let first = resolve_address_bits(&arena, &root, cptr, WORD_BITS).unwrap();
        for _ in 0..8 {
            let again = resolve_address_bits(&arena, &root, cptr, WORD_BITS).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_guard_mismatch_diagnostics() {
        let mut arena = SlotArena::new();
        let guard = CNodeGuard::new(0b1010, 4).unwrap();
        let root = arena.alloc_cnode(4, guard).unwrap();

        // Top 4 bits are 0b1111, not 0b1010
        let cptr = CPtr::from_raw(0xF000_0000_0000_0000);
        let result = resolve_address_bits(&arena, &root, cptr, WORD_BITS);
        assert_eq!(
            result,
            Err(LookupFault::GuardMismatch {
                expected: 0b1010,
                found: 0b1111,
                bits_left: 64,
            })
        );
    }

    #[test]
    fn test_guard_checked_before_depth() {
        // Root wants 4 guard + 4 radix bits but only 2 bits remain, and
        // the guard does not match either: the guard fault must win.
        let mut arena = SlotArena::new();
        let guard = CNodeGuard::new(0b1111, 4).unwrap();
        let root = arena.alloc_cnode(4, guard).unwrap();

        let result = resolve_address_bits(&arena, &root, CPtr::from_raw(0), 2);
        assert!(matches!(result, Err(LookupFault::GuardMismatch { .. })));
    }

    #[test]
    fn test_depth_mismatch() {
        // Guard matches (zero against zero bits of address) but the
        // level needs 8 bits and only 4 remain.
        let mut arena = SlotArena::new();
        let root = arena.alloc_cnode(8, CNodeGuard::NONE).unwrap();

        let result = resolve_address_bits(&arena, &root, CPtr::from_raw(0), 4);
        assert_eq!(
            result,
            Err(LookupFault::DepthMismatch {
                bits_needed: 8,
                bits_left: 4,
            })
        );
    }

    #[test]
    fn test_two_level_round_trip() {
        // Root: radix 4, no guard. Leaf: radix 4, 3-bit guard 0b101.
        // An 11-bit address [top(4)][guard(3)=101][leaf(4)] resolves to
        // the leaf index in the second CNode.
        let mut arena = SlotArena::new();
        let root = arena.alloc_cnode(4, CNodeGuard::NONE).unwrap();
        let root_base = cnode_base(&root);

        let leaf_guard = CNodeGuard::new(0b101, 3).unwrap();
        let leaf = arena.alloc_cnode(4, leaf_guard).unwrap();
        let leaf_base = cnode_base(&leaf);

        // Install the leaf CNode in root slot 0x9
        arena.slot_mut(root_base.offset(0x9)).unwrap().cap = leaf;

        let addr = (0x9u64 << 7) | (0b101 << 4) | 0x6;
        let res = resolve_address_bits(&arena, &root, CPtr::from_raw(addr), 11).unwrap();
        assert_eq!(res.slot, leaf_base.offset(0x6));
        assert_eq!(res.bits_remaining, 0);

        // Any other guard value must be a mismatch naming 0b101
        for bad_guard in 0u64..8 {
            if bad_guard == 0b101 {
                continue;
            }
            let addr = (0x9u64 << 7) | (bad_guard << 4) | 0x6;
            let result = resolve_address_bits(&arena, &root, CPtr::from_raw(addr), 11);
            assert_eq!(
                result,
                Err(LookupFault::GuardMismatch {
                    expected: 0b101,
                    found: bad_guard,
                    bits_left: 7,
                })
            );
        }
    }

    #[test]
    fn test_depth_conservation() {
        // Bits consumed across levels equals requested minus remaining.
        let mut arena = SlotArena::new();
        let root = arena.alloc_cnode(4, CNodeGuard::NONE).unwrap();
        let root_base = cnode_base(&root);

        // Slot 2 holds an endpoint: the walk stops there with bits left
        arena.slot_mut(root_base.offset(2)).unwrap().cap = endpoint_cap(1);

        let addr = 2u64 << 7; // index 2 at the top of an 11-bit window
        let res = resolve_address_bits(&arena, &root, CPtr::from_raw(addr), 11).unwrap();
        assert_eq!(res.slot, root_base.offset(2));
        assert_eq!(res.bits_remaining, 11 - 4);
    }

    #[test]
    fn test_lookup_slot_rejects_partial() {
        // Full-word lookup ending early on a non-CNode is escalated.
        let mut arena = SlotArena::new();
        let root = arena.alloc_cnode(4, CNodeGuard::NONE).unwrap();
        let root_base = cnode_base(&root);
        arena.slot_mut(root_base.offset(1)).unwrap().cap = endpoint_cap(1);

        let cptr = CPtr::from_index(1, 4, 0, 0);
        let result = lookup_slot(&arena, &root, cptr);
        assert_eq!(
            result,
            Err(LookupFault::MissingCapability { bits_left: 60 })
        );
    }

    #[test]
    fn test_lookup_cap_and_slot() {
        let mut arena = SlotArena::new();
        let root = single_level(&mut arena);
        let base = cnode_base(&root);
        arena.slot_mut(base.offset(3)).unwrap().cap = endpoint_cap(7);

        let (cap, slot) = lookup_cap_and_slot(&arena, &root, CPtr::from_raw(3)).unwrap();
        assert_eq!(slot, base.offset(3));
        assert_eq!(cap, endpoint_cap(7));
    }

    #[test]
    fn test_cnode_op_depth_range() {
        let mut arena = SlotArena::new();
        let root = arena.alloc_cnode(4, CNodeGuard::NONE).unwrap();

        for depth in [0u64, 65, 1000] {
            let result = lookup_slot_for_cnode_op(&arena, true, &root, CPtr::null(), depth);
            assert_eq!(result, Err(SyscallError::RangeError { min: 1, max: 64 }));
        }
    }

    #[test]
    fn test_cnode_op_invalid_root() {
        let arena = SlotArena::new();
        let result = lookup_slot_for_cnode_op(&arena, false, &endpoint_cap(1), CPtr::null(), 4);
        assert_eq!(
            result,
            Err(SyscallError::FailedLookup {
                was_source: false,
                fault: LookupFault::InvalidRoot,
            })
        );
    }

    #[test]
    fn test_cnode_op_exact_depth() {
        let mut arena = SlotArena::new();
        let root = arena.alloc_cnode(4, CNodeGuard::NONE).unwrap();
        let base = cnode_base(&root);

        // Depth 4 consumes exactly the root level
        let cptr = CPtr::from_raw(0xA);
        let slot = lookup_source_slot(&arena, &root, cptr, 4).unwrap();
        assert_eq!(slot, base.offset(0xA));

        // Depth 8 leaves 4 bits unresolved after the walk stops
        let result = lookup_source_slot(&arena, &root, CPtr::from_raw(0xA0), 8);
        assert_eq!(
            result,
            Err(SyscallError::FailedLookup {
                was_source: true,
                fault: LookupFault::DepthMismatch {
                    bits_needed: 0,
                    bits_left: 4,
                },
            })
        );
    }
}
