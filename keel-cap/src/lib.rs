//! Keel capability model
//!
//! This crate defines the value types of the Keel kernel's capability
//! system, following seL4's proven capability model.
//!
//! # Overview
//!
//! A **capability** is an unforgeable token that combines:
//! - An object reference (points to a kernel object)
//! - Access rights (defines permitted operations)
//! - Optionally a badge (identifies the holder during IPC)
//!
//! Capabilities are the *only* way to access kernel resources. They
//! cannot be forged or guessed—they must be explicitly granted.
//!
//! # Core Types
//!
//! - [`Cap`]: the capability itself, a closed tagged union over every
//!   object type the kernel knows
//! - [`CapRights`]: access permissions (read, write, grant, grant_reply)
//! - [`Badge`]: immutable identifier for IPC sender identification
//! - [`CPtr`]: capability pointer for addressing slots in the CSpace
//! - [`Slot`]: storage for one capability plus its [`MdbNode`]
//! - [`LookupFault`]: structured diagnosis of a failed resolution
//!
//! # CSpace Structure
//!
//! Capabilities are stored in a hierarchical structure called the CSpace
//! (capability space): CNode capabilities stored in slots of other
//! CNodes form a guarded radix trie, walked by the kernel's resolver.
//!
//! ```text
//! CSpace
//! └── CNode (root, radix r, guard g)
//!     ├── Slot 0: Capability to Object A
//!     ├── Slot 1: Capability to CNode B (enables hierarchy)
//!     │   └── CNode B
//!     │       ├── Slot 0: Capability to Object C
//!     │       └── ...
//!     └── ...
//! ```
//!
//! # Derivation Tracking
//!
//! Every slot carries an [`MdbNode`] linking it into the kernel's
//! derivation-ordered list, the structure revocation walks to find and
//! remove a capability's descendants.
//!
//! # Kernel Integration
//!
//! This crate defines the capability values and their pure operations
//! (derive, mint, attenuation checks); the `keel-kernel` crate provides
//! slot storage, address resolution, and the derivation database.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

// Module declarations
mod badge;
mod cap;
pub mod cnode;
mod cptr;
mod error;
pub mod fault;
mod rights;
mod slot;

// Re-exports for convenient access
pub use badge::Badge;
pub use cap::{Cap, CapType};
pub use cnode::{CNodeGuard, CNodeRadix, MAX_CNODE_RADIX, MAX_GUARD_BITS, MIN_CNODE_RADIX};
pub use cptr::{CPtr, WORD_BITS};
pub use error::{CapError, CapResult};
pub use fault::{Fault, LookupFault};
pub use rights::CapRights;
pub use slot::{MdbNode, ObjectRef, Slot, SlotRef};
