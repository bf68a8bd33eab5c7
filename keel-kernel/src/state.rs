//! Global kernel state
//!
//! All mutable kernel structures - the slot arena, the thread table and
//! the endpoint table - live in one [`Kernel`] value behind a single
//! coarse lock. The resolver and the derivation database are not
//! internally thread-safe; every core that enters the kernel takes this
//! lock before touching them, which is the whole mutual-exclusion
//! argument for MDB splicing.
//!
//! [`Kernel`] is an ordinary value, so tests construct their own
//! instances; the global is only for the kernel proper.

use spin::{Mutex, Once};

use keel_cap::{Cap, CPtr, LookupFault, ObjectRef, SlotRef};

use crate::cspace::arena::SlotArena;
use crate::cspace::resolve;
use crate::endpoint::EndpointTable;
use crate::thread::TcbTable;

/// The kernel's mutable state.
pub struct Kernel {
    /// Capability slot storage.
    pub slots: SlotArena,
    /// Thread control blocks.
    pub tcbs: TcbTable,
    /// Endpoint objects.
    pub endpoints: EndpointTable,
}

impl Kernel {
    /// Create a fresh kernel state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: SlotArena::new(),
            tcbs: TcbTable::new(),
            endpoints: EndpointTable::new(),
        }
    }

    /// Resolve a full-width capability address in a thread's CSpace.
    ///
    /// # Errors
    ///
    /// [`LookupFault::InvalidRoot`] when the thread is unknown or has
    /// no CSpace root, otherwise any resolver fault.
    pub fn lookup_slot(&self, thread: ObjectRef, cptr: CPtr) -> Result<SlotRef, LookupFault> {
        let root = match self.tcbs.get(thread) {
            Some(tcb) => tcb.cspace_root,
            None => return Err(LookupFault::InvalidRoot),
        };
        resolve::lookup_slot(&self.slots, &root, cptr)
    }

    /// Resolve a full-width address in a thread's CSpace and read the
    /// capability it names.
    ///
    /// # Errors
    ///
    /// As [`Kernel::lookup_slot`].
    pub fn lookup_cap_and_slot(
        &self,
        thread: ObjectRef,
        cptr: CPtr,
    ) -> Result<(Cap, SlotRef), LookupFault> {
        let slot = self.lookup_slot(thread, cptr)?;
        Ok((self.slots.cap(slot), slot))
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

/// Global kernel state, behind the kernel lock.
///
/// Lazily initialised on first access.
static KERNEL: Once<Mutex<Kernel>> = Once::new();

fn get_kernel() -> &'static Mutex<Kernel> {
    KERNEL.call_once(|| {
        log::debug!("kernel state initialised");
        Mutex::new(Kernel::new())
    })
}

/// Initialise the global kernel state.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let _ = get_kernel();
}

/// Run a closure holding the kernel lock.
pub fn with_kernel<F, R>(f: F) -> R
where
    F: FnOnce(&mut Kernel) -> R,
{
    f(&mut get_kernel().lock())
}
