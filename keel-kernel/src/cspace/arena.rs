//! Slot arena - storage for all capability slots
//!
//! All CNodes live in one contiguous arena of [`Slot`]s, addressed by
//! stable [`SlotRef`] indices. A CNode is a `2^radix` run of arena
//! slots; the CNode capability records the base index and the radix, so
//! resolution is index arithmetic and the derivation list's prev/next
//! links are plain index rewrites with no aliasing hazard.
//!
//! # Design
//!
//! - Slot storage allocated on heap (boxed slice)
//! - Index 0 is reserved (NULL)
//! - CNode regions are carved off by a bump allocator; regions are
//!   returned to the untyped-memory subsystem, not to the arena, so
//!   there is no free list here

extern crate alloc;

use alloc::boxed::Box;

use keel_cap::{Cap, CapError, CapResult, CNodeGuard, CNodeRadix, Slot, SlotRef};

/// Default number of slots in the arena.
pub const DEFAULT_ARENA_SLOTS: usize = 65536;

/// Arena of capability slots.
pub struct SlotArena {
    /// Slot storage (boxed to avoid stack overflow).
    slots: Box<[Slot]>,
    /// First never-allocated slot index.
    next_free: u32,
}

impl SlotArena {
    /// Create an arena with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ARENA_SLOTS)
    }

    /// Create an arena with room for `capacity` slots.
    ///
    /// Slot 0 is reserved as NULL, so the usable capacity is one less.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let slots: Box<[Slot]> = (0..capacity).map(|_| Slot::empty()).collect();
        Self {
            slots,
            next_free: 1, // Index 0 is NULL
        }
    }

    /// Allocate a CNode of `2^radix` zero-initialised slots.
    ///
    /// Returns the CNode capability covering the new region.
    ///
    /// # Errors
    ///
    /// - [`CapError::InvalidRadix`]: radix out of range
    /// - [`CapError::OutOfSlots`]: arena exhausted
    pub fn alloc_cnode(&mut self, radix: CNodeRadix, guard: CNodeGuard) -> CapResult<Cap> {
        // Validate the radix before committing any slots
        let cap = Cap::new_cnode(SlotRef::from_index(self.next_free), radix, guard)?;

        let count = 1u32 << radix;
        let end = self.next_free as usize + count as usize;
        if end > self.slots.len() {
            return Err(CapError::OutOfSlots);
        }
        self.next_free += count;
        Ok(cap)
    }

    /// Get a slot by reference, if valid and allocated.
    #[must_use]
    pub fn slot(&self, slot: SlotRef) -> Option<&Slot> {
        let index = slot.index() as usize;
        if index == 0 || index >= self.next_free as usize {
            return None;
        }
        Some(&self.slots[index])
    }

    /// Get a slot mutably, if valid and allocated.
    #[must_use]
    pub fn slot_mut(&mut self, slot: SlotRef) -> Option<&mut Slot> {
        let index = slot.index() as usize;
        if index == 0 || index >= self.next_free as usize {
            return None;
        }
        Some(&mut self.slots[index])
    }

    /// Read the capability stored in a slot.
    ///
    /// Invalid references read as [`Cap::Null`], the same as an empty
    /// slot, so resolution never has to distinguish the two.
    #[must_use]
    pub fn cap(&self, slot: SlotRef) -> Cap {
        match self.slot(slot) {
            Some(s) => s.cap,
            None => Cap::Null,
        }
    }

    /// Number of slots handed out so far (including reserved index 0).
    #[must_use]
    pub fn allocated(&self) -> u32 {
        self.next_free
    }

    /// Number of slots still available.
    #[must_use]
    pub fn free_count(&self) -> u32 {
        (self.slots.len() as u32).saturating_sub(self.next_free)
    }
}

impl Default for SlotArena {
    fn default() -> Self {
        Self::new()
    }
}
