//! Fault delivery
//!
//! Converts a fault taken by a thread into either an IPC to the
//! thread's registered handler endpoint or, when no valid handler is
//! installed, suspension of the thread.
//!
//! Two fault classes, two handler slots:
//!
//! - Ordinary faults (capability, VM, unknown syscall, user exception)
//!   go through the fault-handler slot and block the faulting thread
//!   until the handler replies
//! - Timeout faults go through the separate timeout-handler slot and
//!   are delivered without blocking; budget exhaustion is a scheduling
//!   notification, not a correctness exception
//!
//! Both slots are direct references stored on the thread's control
//! block; nothing here performs an address lookup. An invalid handler
//! (null slot, wrong type, missing rights) is never an error to the
//! caller: the fault is simply unrecoverable and the thread suspends,
//! with a diagnostic logged for the ordinary-fault case.

use keel_cap::{Badge, Cap, Fault, ObjectRef};

use crate::endpoint::Message;
use crate::state::Kernel;
use crate::thread::ThreadState;

/// Check whether a capability can receive fault IPC.
///
/// The handler must be an endpoint the kernel can send through, with
/// grant or grant-reply rights so the faulting thread's reply
/// capability can be passed along. A null capability is the ordinary
/// "no handler installed" state and simply fails the test.
#[must_use]
pub fn is_valid_fault_handler(cap: &Cap) -> bool {
    matches!(cap, Cap::Endpoint { .. })
        && cap.can_send()
        && (cap.can_grant() || cap.can_grant_reply())
}

/// Send a fault message through a handler capability.
///
/// Returns `false` without side effects when the capability is not a
/// valid fault handler.
fn send_fault_ipc(kernel: &mut Kernel, handler: &Cap, fault: Fault, blocking: bool) -> bool {
    let (ep, badge) = match handler {
        Cap::Endpoint { ep, badge, .. } if is_valid_fault_handler(handler) => (*ep, *badge),
        _ => return false,
    };
    let Some(endpoint) = kernel.endpoints.get_mut(ep) else {
        return false;
    };
    endpoint.send(Message {
        badge: badge.value(),
        regs: fault.to_regs(),
        expects_reply: blocking,
    });
    true
}

/// Deliver an ordinary fault taken by `thread`.
///
/// The fault is recorded on the thread, then:
///
/// - valid handler installed: a blocking fault IPC is issued and the
///   thread waits for the handler's reply
/// - otherwise: the thread is suspended, and a human-readable report is
///   logged (diagnostic only, never control flow)
pub fn handle_fault(kernel: &mut Kernel, thread: ObjectRef, fault: Fault) {
    let (handler_slot, pc) = match kernel.tcbs.get_mut(thread) {
        Some(tcb) => {
            tcb.fault = Some(fault);
            (tcb.fault_handler, tcb.pc)
        }
        None => return,
    };

    let handler = kernel.slots.cap(handler_slot);
    if send_fault_ipc(kernel, &handler, fault, true) {
        if let Some(tcb) = kernel.tcbs.get_mut(thread) {
            tcb.state = ThreadState::BlockedOnFault;
        }
        return;
    }

    log::warn!("unhandled fault in thread {thread}: {fault} (pc {pc:#x}), suspending");
    if let Some(tcb) = kernel.tcbs.get_mut(thread) {
        tcb.state = ThreadState::Inactive;
    }
}

/// Deliver a timeout fault for `thread`'s exhausted budget.
///
/// Non-blocking: the thread's state is never changed here, whether or
/// not a timeout handler is installed. Returns whether a message was
/// actually delivered.
pub fn handle_timeout(kernel: &mut Kernel, thread: ObjectRef, badge: Badge) -> bool {
    let handler_slot = match kernel.tcbs.get(thread) {
        Some(tcb) => tcb.timeout_handler,
        None => return false,
    };

    let handler = kernel.slots.cap(handler_slot);
    let fault = Fault::Timeout { badge };
    let delivered = send_fault_ipc(kernel, &handler, fault, false);
    if !delivered {
        log::debug!("timeout for thread {thread} dropped: no timeout handler");
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_cap::{CapRights, SlotRef};

    fn handler_cap(ep: ObjectRef, rights: CapRights) -> Cap {
        Cap::Endpoint {
            ep,
            badge: Badge::new(0xBEEF),
            rights,
        }
    }

    /// Kernel with one thread; returns the thread and a handler slot.
    fn setup() -> (Kernel, ObjectRef, SlotRef) {
        let mut kernel = Kernel::new();
        let cnode = kernel
            .slots
            .alloc_cnode(2, keel_cap::CNodeGuard::NONE)
            .unwrap();
        let slot = match cnode {
            Cap::CNode { base, .. } => base,
            _ => unreachable!(),
        };
        let thread = kernel.tcbs.alloc().unwrap();
        let tcb = kernel.tcbs.get_mut(thread).unwrap();
        tcb.state = ThreadState::Running;
        tcb.fault_handler = slot;
        tcb.timeout_handler = slot;
        (kernel, thread, slot)
    }

    #[test]
    fn test_handler_validity() {
        let ep = ObjectRef::from_index(1);
        assert!(is_valid_fault_handler(&handler_cap(ep, CapRights::ALL)));
        assert!(is_valid_fault_handler(&handler_cap(
            ep,
            CapRights::WRITE.union(CapRights::GRANT_REPLY)
        )));
        // Send right alone is not enough
        assert!(!is_valid_fault_handler(&handler_cap(ep, CapRights::WRITE)));
        // Grant without send is not enough either
        assert!(!is_valid_fault_handler(&handler_cap(ep, CapRights::GRANT)));
        assert!(!is_valid_fault_handler(&Cap::Null));
    }

    #[test]
    fn test_fault_delivered_to_handler() {
        let (mut kernel, thread, slot) = setup();
        let ep = kernel.endpoints.alloc().unwrap();
        kernel.slots.slot_mut(slot).unwrap().cap = handler_cap(ep, CapRights::ALL);

        let fault = Fault::UnknownSyscall { syscall: 99 };
        handle_fault(&mut kernel, thread, fault);

        let tcb = kernel.tcbs.get(thread).unwrap();
        assert_eq!(tcb.state, ThreadState::BlockedOnFault);
        assert_eq!(tcb.fault, Some(fault));

        let queue = &kernel.endpoints.get(ep).unwrap().queue;
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].badge, 0xBEEF);
        assert!(queue[0].expects_reply);
        assert_eq!(queue[0].regs, fault.to_regs());
    }

    #[test]
    fn test_fault_with_null_handler_suspends() {
        // Handler slot left empty: no IPC anywhere, thread goes inactive
        let (mut kernel, thread, _slot) = setup();
        let ep = kernel.endpoints.alloc().unwrap();

        handle_fault(
            &mut kernel,
            thread,
            Fault::UserException { number: 3, code: 0 },
        );

        let tcb = kernel.tcbs.get(thread).unwrap();
        assert_eq!(tcb.state, ThreadState::Inactive);
        assert!(kernel.endpoints.get(ep).unwrap().queue.is_empty());
    }

    #[test]
    fn test_fault_with_insufficient_rights_suspends() {
        let (mut kernel, thread, slot) = setup();
        let ep = kernel.endpoints.alloc().unwrap();
        // Endpoint without grant rights fails the validity check
        kernel.slots.slot_mut(slot).unwrap().cap = handler_cap(ep, CapRights::RW);

        handle_fault(&mut kernel, thread, Fault::UnknownSyscall { syscall: 1 });

        assert_eq!(
            kernel.tcbs.get(thread).unwrap().state,
            ThreadState::Inactive
        );
        assert!(kernel.endpoints.get(ep).unwrap().queue.is_empty());
    }

    #[test]
    fn test_timeout_nonblocking() {
        let (mut kernel, thread, slot) = setup();
        let ep = kernel.endpoints.alloc().unwrap();
        kernel.slots.slot_mut(slot).unwrap().cap = handler_cap(ep, CapRights::ALL);

        assert!(handle_timeout(&mut kernel, thread, Badge::new(7)));

        // Delivered without touching the thread's state
        assert_eq!(kernel.tcbs.get(thread).unwrap().state, ThreadState::Running);
        let queue = &kernel.endpoints.get(ep).unwrap().queue;
        assert_eq!(queue.len(), 1);
        assert!(!queue[0].expects_reply);
        let expected = Fault::Timeout {
            badge: Badge::new(7),
        };
        assert_eq!(queue[0].regs, expected.to_regs());
    }

    #[test]
    fn test_timeout_without_handler_drops() {
        let (mut kernel, thread, _slot) = setup();
        assert!(!handle_timeout(&mut kernel, thread, Badge::new(7)));
        assert_eq!(kernel.tcbs.get(thread).unwrap().state, ThreadState::Running);
    }
}
