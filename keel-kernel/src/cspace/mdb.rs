//! Derivation database (MDB) maintenance
//!
//! The MDB is a doubly linked list over all non-null slots, kept in
//! derivation order: a capability always appears before all of its
//! strict derivatives, and a capability's descendants sit contiguously
//! after it. Revocation is therefore a forward walk from the revoked
//! slot that deletes neighbours for as long as they test as its
//! descendants.
//!
//! Four operations mutate the list: insert-derived, delete, revoke and
//! move. Rights restriction in place ([`mutate`]) changes the stored
//! capability but never touches links - derivation parentage is not
//! affected by attenuation.
//!
//! All link fields are slot indices into the arena, so splices are
//! index rewrites; the arena is only reached through `&mut`, which is
//! the caller's (lock-holding) exclusivity made explicit.

use keel_cap::{Cap, CapError, CapResult, CapRights, MdbNode, SlotRef};

use crate::cspace::arena::SlotArena;

/// Rewrite a slot's `next` link. No-op on the null reference.
fn set_next(arena: &mut SlotArena, slot: SlotRef, next: SlotRef) {
    if let Some(s) = arena.slot_mut(slot) {
        s.mdb.next = next;
    }
}

/// Rewrite a slot's `prev` link. No-op on the null reference.
fn set_prev(arena: &mut SlotArena, slot: SlotRef, prev: SlotRef) {
    if let Some(s) = arena.slot_mut(slot) {
        s.mdb.prev = prev;
    }
}

/// Test whether the capability in `parent` is a derivation parent of
/// the one in `child`.
///
/// The list gives ordering only; actual descent is a property of the
/// capabilities: the parent must be revocable, both must reference the
/// same derivation region, and for badged endpoint and notification
/// capabilities the child must carry the same badge and not itself
/// start a new badge run.
#[must_use]
pub fn is_mdb_parent_of(arena: &SlotArena, parent: SlotRef, child: SlotRef) -> bool {
    let (parent_cap, parent_mdb) = match arena.slot(parent) {
        Some(s) => (s.cap, s.mdb),
        None => return false,
    };
    let (child_cap, child_mdb) = match arena.slot(child) {
        Some(s) => (s.cap, s.mdb),
        None => return false,
    };

    if !parent_mdb.revocable {
        return false;
    }
    if !parent_cap.same_region_as(&child_cap) {
        return false;
    }

    match parent_cap {
        Cap::Endpoint { badge, .. } | Cap::Notification { badge, .. } if badge.is_some() => {
            badge == child_cap.badge() && !child_mdb.first_badged
        }
        _ => true,
    }
}

/// Insert a derived capability immediately after its source slot.
///
/// The new slot becomes the source's list successor; its `revocable`
/// and `first_badged` flags are set when the derivation starts a new
/// revocable run (a freshly badged endpoint or notification, or a
/// retypeable untyped capability) and cleared otherwise.
///
/// # Errors
///
/// - [`CapError::EmptySlot`]: the source slot is empty
/// - [`CapError::SlotOccupied`]: the destination is not empty
pub fn insert_derived(
    arena: &mut SlotArena,
    new_cap: Cap,
    src: SlotRef,
    dest: SlotRef,
) -> CapResult<()> {
    let src_slot = arena.slot(src).ok_or(CapError::EmptySlot)?;
    if src_slot.is_empty() {
        return Err(CapError::EmptySlot);
    }
    let src_cap = src_slot.cap;
    let src_next = src_slot.mdb.next;

    let dest_slot = arena.slot(dest).ok_or(CapError::SlotOccupied)?;
    if !dest_slot.is_empty() {
        return Err(CapError::SlotOccupied);
    }

    let revocable = Cap::is_revocable_derivation(&new_cap, &src_cap);
    let node = MdbNode {
        prev: src,
        next: src_next,
        revocable,
        first_badged: revocable,
    };

    if let Some(d) = arena.slot_mut(dest) {
        d.cap = new_cap;
        d.mdb = node;
    }
    set_next(arena, src, dest);
    set_prev(arena, src_next, dest);
    Ok(())
}

/// Install an original capability into an empty slot.
///
/// Used when an object subsystem creates a capability from nothing
/// (boot-time roots, retype results). The slot starts its own
/// derivation run: revocable, first-badged, no neighbours.
///
/// # Errors
///
/// Returns [`CapError::SlotOccupied`] if the slot is not empty.
pub fn insert_new(arena: &mut SlotArena, cap: Cap, dest: SlotRef) -> CapResult<()> {
    let slot = arena.slot_mut(dest).ok_or(CapError::SlotOccupied)?;
    if !slot.is_empty() {
        return Err(CapError::SlotOccupied);
    }
    slot.cap = cap;
    slot.mdb = MdbNode::original();
    Ok(())
}

/// Delete the capability in a slot.
///
/// Splices the slot out of the derivation list and nulls it. Safe on
/// the list head and tail (null neighbours are skipped).
///
/// # Errors
///
/// Returns [`CapError::EmptySlot`] if the slot is already empty.
pub fn delete(arena: &mut SlotArena, slot: SlotRef) -> CapResult<()> {
    let mdb = match arena.slot(slot) {
        Some(s) if !s.is_empty() => s.mdb,
        _ => return Err(CapError::EmptySlot),
    };

    set_next(arena, mdb.prev, mdb.next);
    set_prev(arena, mdb.next, mdb.prev);
    if let Some(s) = arena.slot_mut(slot) {
        s.clear();
    }
    Ok(())
}

/// Revoke every capability derived from the one in `slot`.
///
/// Walks forward from the slot, deleting the next list entry for as
/// long as it tests as a descendant. Descendants are contiguous after
/// their parent, so the walk stops at the first non-descendant. The
/// revoked capability itself is untouched.
///
/// Returns the number of capabilities removed.
///
/// # Errors
///
/// Returns [`CapError::EmptySlot`] if the slot is empty.
pub fn revoke(arena: &mut SlotArena, slot: SlotRef) -> CapResult<usize> {
    if arena.slot(slot).map_or(true, |s| s.is_empty()) {
        return Err(CapError::EmptySlot);
    }

    let mut removed = 0;
    loop {
        let next = match arena.slot(slot) {
            Some(s) => s.mdb.next,
            None => break,
        };
        if next.is_null() || !is_mdb_parent_of(arena, slot, next) {
            break;
        }
        delete(arena, next)?;
        removed += 1;
    }
    Ok(removed)
}

/// Restrict the rights of the capability in a slot, in place.
///
/// Updates the stored capability value only; the slot keeps its place
/// and flags in the derivation list.
///
/// # Errors
///
/// - [`CapError::EmptySlot`]: the slot is empty
/// - any error from [`Cap::restrict_rights`]
pub fn mutate(arena: &mut SlotArena, slot: SlotRef, new_rights: CapRights) -> CapResult<()> {
    let s = arena.slot_mut(slot).ok_or(CapError::EmptySlot)?;
    if s.is_empty() {
        return Err(CapError::EmptySlot);
    }
    s.cap = s.cap.restrict_rights(new_rights)?;
    Ok(())
}

/// Move a capability between slots.
///
/// The destination takes over the source's exact position in the
/// derivation list (links and flags); the source is nulled. The stored
/// capability may be updated in the same step (rights/badge changes
/// performed by the caller before the move).
///
/// # Errors
///
/// - [`CapError::EmptySlot`]: the source slot is empty
/// - [`CapError::SlotOccupied`]: the destination is not empty
pub fn move_cap(arena: &mut SlotArena, new_cap: Cap, src: SlotRef, dest: SlotRef) -> CapResult<()> {
    let src_slot = arena.slot(src).ok_or(CapError::EmptySlot)?;
    if src_slot.is_empty() {
        return Err(CapError::EmptySlot);
    }
    let mdb = src_slot.mdb;

    let dest_slot = arena.slot(dest).ok_or(CapError::SlotOccupied)?;
    if !dest_slot.is_empty() {
        return Err(CapError::SlotOccupied);
    }

    if let Some(d) = arena.slot_mut(dest) {
        d.cap = new_cap;
        d.mdb = mdb;
    }
    if let Some(s) = arena.slot_mut(src) {
        s.clear();
    }
    set_next(arena, mdb.prev, dest);
    set_prev(arena, mdb.next, dest);
    Ok(())
}

/// Swap the capabilities in two slots.
///
/// Each capability takes over the other slot's position in the
/// derivation list. Correct for adjacent slots: the second node is
/// re-read after the first splice so a link that was just rewritten is
/// carried over rather than clobbered.
///
/// # Errors
///
/// Returns [`CapError::EmptySlot`] if either slot is empty.
pub fn swap(arena: &mut SlotArena, slot1: SlotRef, slot2: SlotRef) -> CapResult<()> {
    if slot1 == slot2 {
        return Ok(());
    }
    let cap1 = match arena.slot(slot1) {
        Some(s) if !s.is_empty() => s.cap,
        _ => return Err(CapError::EmptySlot),
    };
    let cap2 = match arena.slot(slot2) {
        Some(s) if !s.is_empty() => s.cap,
        _ => return Err(CapError::EmptySlot),
    };

    if let Some(s) = arena.slot_mut(slot1) {
        s.cap = cap2;
    }
    if let Some(s) = arena.slot_mut(slot2) {
        s.cap = cap1;
    }

    let mdb1 = arena.slot(slot1).map(|s| s.mdb).unwrap_or_default();
    set_next(arena, mdb1.prev, slot2);
    set_prev(arena, mdb1.next, slot2);

    // Re-read after the splice above: if the slots are adjacent the
    // second node's links were just rewritten
    let mdb2 = arena.slot(slot2).map(|s| s.mdb).unwrap_or_default();
    if let Some(s) = arena.slot_mut(slot2) {
        s.mdb = mdb1;
    }
    set_next(arena, mdb2.prev, slot1);
    set_prev(arena, mdb2.next, slot1);
    if let Some(s) = arena.slot_mut(slot1) {
        s.mdb = mdb2;
    }
    Ok(())
}
