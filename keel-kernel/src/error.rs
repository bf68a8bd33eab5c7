//! Syscall-level error types
//!
//! Errors reported back to userland from capability syscalls. Lookup
//! faults are wrapped here with the role (source or destination) of the
//! address that failed, so two-capability operations can report which
//! side went wrong.

use core::fmt;

use keel_cap::LookupFault;

/// Error returned to userland from a capability syscall.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "syscall errors must be reported to the caller"]
pub enum SyscallError {
    /// A capability address failed to resolve.
    FailedLookup {
        /// Whether the failing address was the operation's source
        /// (as opposed to its destination or pivot).
        was_source: bool,
        /// Structured cause of the failure.
        fault: LookupFault,
    },

    /// A caller-supplied argument was outside its valid range.
    ///
    /// Distinct from a lookup fault: the caller violated the syscall
    /// contract before resolution was even attempted.
    RangeError {
        /// Smallest acceptable value.
        min: u64,
        /// Largest acceptable value.
        max: u64,
    },
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailedLookup { was_source, fault } => {
                let role = if *was_source { "source" } else { "destination" };
                write!(f, "{role} lookup failed: {fault}")
            }
            Self::RangeError { min, max } => {
                write!(f, "argument out of range [{min}, {max}]")
            }
        }
    }
}

/// Result type for syscall-level operations.
pub type SyscallResult<T> = Result<T, SyscallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_lookup_names_role() {
        use alloc::format;

        let err = SyscallError::FailedLookup {
            was_source: true,
            fault: LookupFault::InvalidRoot,
        };
        assert!(format!("{err}").starts_with("source"));
    }
}
