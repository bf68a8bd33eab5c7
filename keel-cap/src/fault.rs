//! Fault types and messages
//!
//! Defines the faults a thread can incur and the structured lookup
//! faults produced by capability address resolution, together with the
//! message encoding used when a fault is delivered to a user fault
//! handler via IPC.
//!
//! # Fault Delivery
//!
//! When a thread faults, the kernel delivers a fault message through the
//! thread's fault-handler capability (if one is installed). The handler
//! can then repair the cause and reply to resume the thread, or decline
//! to reply and leave it suspended.

use core::fmt;

use crate::badge::Badge;

/// Structured diagnosis of a failed capability address resolution.
///
/// Every failure names the exact cause and carries enough positional
/// information (`bits_left` at the point of failure) for the handler to
/// identify the failing level of the CSpace without re-walking it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupFault {
    /// The root capability was not a CNode (or was null).
    InvalidRoot,

    /// A CNode's guard did not match the address bits.
    ///
    /// Reported with the guard the CNode expected, the bits actually
    /// found in the address window, and the bits that remained
    /// unresolved when the comparison was made.
    GuardMismatch {
        /// Guard value the CNode carries.
        expected: u64,
        /// Bits extracted from the address at the guard position.
        found: u64,
        /// Address bits still unresolved at this level.
        bits_left: u8,
    },

    /// A CNode level needed more address bits than remained.
    DepthMismatch {
        /// Bits the level would have consumed (guard + radix).
        bits_needed: u8,
        /// Address bits still unresolved at this level.
        bits_left: u8,
    },

    /// Resolution ended on an empty or unusable slot.
    MissingCapability {
        /// Address bits still unresolved when the walk stopped.
        bits_left: u8,
    },
}

impl LookupFault {
    /// Message label identifying the fault kind.
    #[must_use]
    pub const fn label(self) -> u64 {
        match self {
            Self::InvalidRoot => 0,
            Self::MissingCapability { .. } => 1,
            Self::DepthMismatch { .. } => 2,
            Self::GuardMismatch { .. } => 3,
        }
    }

    /// Encode as message words for IPC delivery.
    ///
    /// Word 0 is the [`label`](Self::label); the remaining words carry
    /// the payload in declaration order, zero-padded.
    #[must_use]
    pub const fn to_regs(self) -> [u64; 4] {
        match self {
            Self::InvalidRoot => [0, 0, 0, 0],
            Self::MissingCapability { bits_left } => [1, bits_left as u64, 0, 0],
            Self::DepthMismatch {
                bits_needed,
                bits_left,
            } => [2, bits_left as u64, bits_needed as u64, 0],
            Self::GuardMismatch {
                expected,
                found,
                bits_left,
            } => [3, bits_left as u64, expected, found],
        }
    }
}

impl fmt::Display for LookupFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRoot => write!(f, "invalid root capability"),
            Self::GuardMismatch {
                expected,
                found,
                bits_left,
            } => write!(
                f,
                "guard mismatch: expected {expected:#x}, found {found:#x} ({bits_left} bits left)"
            ),
            Self::DepthMismatch {
                bits_needed,
                bits_left,
            } => write!(
                f,
                "depth mismatch: level needs {bits_needed} bits, {bits_left} left"
            ),
            Self::MissingCapability { bits_left } => {
                write!(f, "missing capability ({bits_left} bits left)")
            }
        }
    }
}

/// A fault incurred by a thread.
///
/// Faults are stored on the faulting thread until delivered (or
/// discarded when no valid handler is installed).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// A capability lookup performed on the thread's behalf failed.
    CapFault {
        /// The capability address that failed to resolve.
        address: u64,
        /// Whether the lookup was for a receive operation.
        in_receive: bool,
        /// Structured cause of the failure.
        lookup: LookupFault,
    },

    /// A virtual-memory access faulted.
    VmFault {
        /// Faulting data or instruction address.
        address: u64,
        /// Instruction pointer at the fault.
        ip: u64,
        /// Architecture-specific fault status bits.
        flags: u64,
    },

    /// The thread invoked a syscall number the kernel does not know.
    UnknownSyscall {
        /// The syscall number.
        syscall: u64,
    },

    /// The thread raised a user-level exception.
    UserException {
        /// Exception number.
        number: u64,
        /// Exception-specific error code.
        code: u64,
    },

    /// The thread exhausted its time allocation.
    Timeout {
        /// Badge of the scheduling context's timeout notification.
        badge: Badge,
    },
}

impl Fault {
    /// Message label identifying the fault kind.
    #[must_use]
    pub const fn label(self) -> u64 {
        match self {
            Self::CapFault { .. } => 1,
            Self::VmFault { .. } => 2,
            Self::UnknownSyscall { .. } => 3,
            Self::UserException { .. } => 4,
            Self::Timeout { .. } => 5,
        }
    }

    /// Whether this is a timeout fault (delivered through the timeout
    /// handler rather than the fault handler).
    #[must_use]
    pub const fn is_timeout(self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Encode as message words for IPC delivery.
    ///
    /// Word 0 is the [`label`](Self::label); the rest is the payload.
    /// A capability fault nests the complete lookup-fault encoding
    /// after its address words, so a guard-mismatch message still
    /// carries all of expected guard, found guard and window size.
    #[must_use]
    pub const fn to_regs(self) -> [u64; 7] {
        match self {
            Self::CapFault {
                address,
                in_receive,
                lookup,
            } => {
                let l = lookup.to_regs();
                [1, address, in_receive as u64, l[0], l[1], l[2], l[3]]
            }
            Self::VmFault { address, ip, flags } => [2, address, ip, flags, 0, 0, 0],
            Self::UnknownSyscall { syscall } => [3, syscall, 0, 0, 0, 0, 0],
            Self::UserException { number, code } => [4, number, code, 0, 0, 0, 0],
            Self::Timeout { badge } => [5, badge.value(), 0, 0, 0, 0, 0],
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapFault {
                address, lookup, ..
            } => write!(f, "cap fault at {address:#x}: {lookup}"),
            Self::VmFault { address, ip, .. } => {
                write!(f, "vm fault at {address:#x} (ip {ip:#x})")
            }
            Self::UnknownSyscall { syscall } => write!(f, "unknown syscall {syscall}"),
            Self::UserException { number, code } => {
                write!(f, "user exception {number} (code {code:#x})")
            }
            Self::Timeout { badge } => write!(f, "timeout (badge {badge})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_fault_labels_distinct() {
        let faults = [
            LookupFault::InvalidRoot,
            LookupFault::MissingCapability { bits_left: 4 },
            LookupFault::DepthMismatch {
                bits_needed: 8,
                bits_left: 4,
            },
            LookupFault::GuardMismatch {
                expected: 0b101,
                found: 0b100,
                bits_left: 7,
            },
        ];
        for (i, a) in faults.iter().enumerate() {
            for b in &faults[i + 1..] {
                assert_ne!(a.label(), b.label());
            }
        }
    }

    #[test]
    fn test_guard_mismatch_encoding() {
        let fault = LookupFault::GuardMismatch {
            expected: 0x5,
            found: 0x4,
            bits_left: 7,
        };
        assert_eq!(fault.to_regs(), [3, 7, 0x5, 0x4]);
    }

    #[test]
    fn test_cap_fault_nests_lookup() {
        let fault = Fault::CapFault {
            address: 0x40,
            in_receive: false,
            lookup: LookupFault::MissingCapability { bits_left: 0 },
        };
        assert_eq!(fault.label(), 1);
        assert_eq!(fault.to_regs(), [1, 0x40, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_cap_fault_keeps_guard_diagnostics() {
        // The nested guard-mismatch must arrive whole: expected guard,
        // found guard and window size all survive the encoding.
        let fault = Fault::CapFault {
            address: 0x40,
            in_receive: false,
            lookup: LookupFault::GuardMismatch {
                expected: 0b101,
                found: 0b110,
                bits_left: 7,
            },
        };
        assert_eq!(fault.to_regs(), [1, 0x40, 0, 3, 7, 0b101, 0b110]);
    }

    #[test]
    fn test_timeout_is_timeout() {
        let timeout = Fault::Timeout {
            badge: Badge::new(1),
        };
        assert!(timeout.is_timeout());
        assert!(!Fault::UnknownSyscall { syscall: 9 }.is_timeout());
    }
}
