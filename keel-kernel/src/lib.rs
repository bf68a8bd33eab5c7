//! Keel kernel core
//!
//! The capability-space addressing and derivation-tracking engine: the
//! guarded radix-trie resolver that turns an opaque capability address
//! into a concrete slot, the derivation database (MDB) that lets the
//! kernel revoke whole capability subtrees, and the fault-delivery
//! protocol that converts lookup failures into either a recoverable
//! error or an IPC to a registered handler.
//!
//! Capability *values* and their pure operations live in [`keel_cap`];
//! this crate owns the storage and the algorithms over it.
//!
//! # Locking
//!
//! Nothing in this crate is internally thread-safe. All state hangs off
//! [`state::Kernel`], and the global instance is reached only through
//! [`state::with_kernel`], which holds the single kernel lock for the
//! duration of the closure.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod cspace;
pub mod endpoint;
pub mod error;
pub mod faulthandler;
pub mod state;
pub mod thread;

pub use error::{SyscallError, SyscallResult};
pub use state::{with_kernel, Kernel};
