//! IPC endpoints (fault-delivery view)
//!
//! The addressing core does not implement general message transfer;
//! what it needs from endpoints is a place for fault delivery to queue
//! a message. Each endpoint carries a FIFO of pending messages tagged
//! with the sending capability's badge and whether the sender blocked
//! awaiting a reply.

extern crate alloc;

use alloc::boxed::Box;
use alloc::collections::VecDeque;

use keel_cap::ObjectRef;

/// A message queued on an endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Message {
    /// Badge of the capability the message was sent through.
    pub badge: u64,
    /// Message registers.
    pub regs: [u64; 7],
    /// Whether the sender is blocked awaiting a reply.
    pub expects_reply: bool,
}

/// An IPC endpoint object.
#[derive(Clone, Debug, Default)]
pub struct Endpoint {
    /// Pending messages in arrival order.
    pub queue: VecDeque<Message>,
}

impl Endpoint {
    /// Queue a message on this endpoint.
    pub fn send(&mut self, msg: Message) {
        self.queue.push_back(msg);
    }
}

/// Maximum number of endpoint objects.
pub const MAX_ENDPOINTS: usize = 256;

/// Endpoint object table.
///
/// Index 0 is reserved (NULL), matching the arena and thread tables.
pub struct EndpointTable {
    endpoints: Box<[Endpoint]>,
    next_free: u32,
}

impl EndpointTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        let endpoints: Box<[Endpoint]> = (0..MAX_ENDPOINTS).map(|_| Endpoint::default()).collect();
        Self {
            endpoints,
            next_free: 1,
        }
    }

    /// Allocate a fresh endpoint. Returns `None` when the table is full.
    pub fn alloc(&mut self) -> Option<ObjectRef> {
        if self.next_free as usize >= self.endpoints.len() {
            return None;
        }
        let index = self.next_free;
        self.next_free += 1;
        Some(ObjectRef::from_index(index))
    }

    /// Get an endpoint by reference.
    #[must_use]
    pub fn get(&self, ep: ObjectRef) -> Option<&Endpoint> {
        let index = ep.index() as usize;
        if index == 0 || index >= self.next_free as usize {
            return None;
        }
        Some(&self.endpoints[index])
    }

    /// Get an endpoint mutably.
    #[must_use]
    pub fn get_mut(&mut self, ep: ObjectRef) -> Option<&mut Endpoint> {
        let index = ep.index() as usize;
        if index == 0 || index >= self.next_free as usize {
            return None;
        }
        Some(&mut self.endpoints[index])
    }
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_queues_in_order() {
        let mut table = EndpointTable::new();
        let ep = table.alloc().unwrap();
        let endpoint = table.get_mut(ep).unwrap();
        endpoint.send(Message {
            badge: 1,
            regs: [0; 7],
            expects_reply: true,
        });
        endpoint.send(Message {
            badge: 2,
            regs: [0; 7],
            expects_reply: false,
        });
        assert_eq!(endpoint.queue.len(), 2);
        assert_eq!(endpoint.queue[0].badge, 1);
        assert_eq!(endpoint.queue[1].badge, 2);
    }
}
