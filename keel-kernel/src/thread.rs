//! Thread control blocks
//!
//! The addressing core's view of a thread: its CSpace root, its two
//! handler-capability slots, its scheduling state, and any pending
//! fault. Scheduling policy and register context live elsewhere; this
//! module only carries what capability lookup and fault delivery need.
//!
//! # Handler slots
//!
//! The fault and timeout handler capabilities are *direct* slot
//! references written by thread-control invocations, not addresses
//! resolved at fault time. This core only ever reads them.

extern crate alloc;

use alloc::boxed::Box;
use core::fmt;

use keel_cap::{Cap, Fault, ObjectRef, SlotRef};

/// Scheduling state of a thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ThreadState {
    /// Not runnable; requires an explicit resume.
    #[default]
    Inactive,
    /// Runnable or running.
    Running,
    /// Blocked awaiting a reply to a delivered fault.
    BlockedOnFault,
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inactive => "inactive",
            Self::Running => "running",
            Self::BlockedOnFault => "blocked on fault",
        };
        write!(f, "{name}")
    }
}

/// Thread control block.
#[derive(Clone, Debug, Default)]
pub struct Tcb {
    /// Scheduling state.
    pub state: ThreadState,
    /// Root of the thread's capability space.
    pub cspace_root: Cap,
    /// Direct slot holding the fault-handler capability.
    pub fault_handler: SlotRef,
    /// Direct slot holding the timeout-handler capability.
    pub timeout_handler: SlotRef,
    /// Pending fault, set when the thread faults and cleared on resume.
    pub fault: Option<Fault>,
    /// Program counter at the last kernel entry, for fault reports.
    pub pc: u64,
}

impl Tcb {
    /// Create an inactive thread with no CSpace and no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Maximum number of threads.
pub const MAX_TCBS: usize = 256;

/// Thread table.
///
/// Index 0 is reserved (NULL); threads are handed out sequentially and
/// never reclaimed here (thread destruction is an object-layer concern).
pub struct TcbTable {
    tcbs: Box<[Tcb]>,
    next_free: u32,
}

impl TcbTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        let tcbs: Box<[Tcb]> = (0..MAX_TCBS).map(|_| Tcb::new()).collect();
        Self { tcbs, next_free: 1 }
    }

    /// Allocate a fresh thread. Returns `None` when the table is full.
    pub fn alloc(&mut self) -> Option<ObjectRef> {
        if self.next_free as usize >= self.tcbs.len() {
            return None;
        }
        let index = self.next_free;
        self.next_free += 1;
        Some(ObjectRef::from_index(index))
    }

    /// Get a thread by reference.
    #[must_use]
    pub fn get(&self, tcb: ObjectRef) -> Option<&Tcb> {
        let index = tcb.index() as usize;
        if index == 0 || index >= self.next_free as usize {
            return None;
        }
        Some(&self.tcbs[index])
    }

    /// Get a thread mutably.
    #[must_use]
    pub fn get_mut(&mut self, tcb: ObjectRef) -> Option<&mut Tcb> {
        let index = tcb.index() as usize;
        if index == 0 || index >= self.next_free as usize {
            return None;
        }
        Some(&mut self.tcbs[index])
    }
}

impl Default for TcbTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_access() {
        let mut table = TcbTable::new();
        let t = table.alloc().unwrap();
        assert_eq!(table.get(t).unwrap().state, ThreadState::Inactive);

        table.get_mut(t).unwrap().state = ThreadState::Running;
        assert_eq!(table.get(t).unwrap().state, ThreadState::Running);
    }

    #[test]
    fn test_null_thread_invalid() {
        let table = TcbTable::new();
        assert!(table.get(ObjectRef::NULL).is_none());
        assert!(table.get(ObjectRef::from_index(1)).is_none());
    }
}
