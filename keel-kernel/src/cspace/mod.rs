//! Capability space: slot storage, address resolution, derivation
//! tracking
//!
//! Three layers, leaf-first:
//!
//! - [`arena`]: the slot arena CNodes are carved out of
//! - [`resolve`]: the guarded radix-trie resolver and the lookup API
//!   built on it
//! - [`mdb`]: the derivation database maintained across insert, delete,
//!   revoke, move and swap

pub mod arena;
pub mod mdb;
pub mod resolve;

pub use arena::SlotArena;
pub use resolve::{
    lookup_cap_and_slot, lookup_pivot_slot, lookup_slot, lookup_slot_for_cnode_op,
    lookup_source_slot, lookup_target_slot, resolve_address_bits, Resolution,
};
