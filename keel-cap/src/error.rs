//! Capability error types
//!
//! This module defines the error types that can occur during capability
//! operations such as copy, move, mint, delete, and revoke. Address
//! resolution failures are *not* represented here; they carry structured
//! diagnostic payloads and live in [`fault`](crate::fault) as
//! [`LookupFault`](crate::fault::LookupFault).

use core::fmt;

/// Errors that can occur during capability operations.
///
/// All capability operations return `Result<T, CapError>` to indicate
/// success or failure. These errors are designed to be informative
/// while not leaking sensitive information about the system state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use = "capability errors must be handled"]
pub enum CapError {
    /// The source slot is empty (no capability present).
    EmptySlot,

    /// The destination slot is already occupied.
    ///
    /// Capabilities cannot overwrite existing capabilities.
    /// Delete the existing capability first.
    SlotOccupied,

    /// Attempted to increase capability rights.
    ///
    /// Rights can only be reduced (attenuated), never increased.
    /// This error occurs when minting with rights that are not
    /// a subset of the source capability's rights.
    RightsEscalation,

    /// The object type does not support badging.
    ///
    /// Only Endpoint and Notification objects support badges.
    BadgeNotSupported,

    /// The capability already has a badge.
    ///
    /// A badge can only be set once during minting.
    /// If the source capability already has a badge, the minted
    /// capability must use the same badge or no badge.
    BadgeAlreadySet,

    /// Invalid operation for this object type.
    ///
    /// The operation is not valid for capabilities of this type.
    InvalidOperation,

    /// Out of capability slots.
    ///
    /// No free region remains in the slot arena for a new CNode.
    OutOfSlots,

    /// CNode radix is out of valid range.
    ///
    /// The CNode radix must be between MIN_CNODE_RADIX and
    /// MAX_CNODE_RADIX.
    InvalidRadix,

    /// Guard bits exceed maximum.
    ///
    /// The guard size exceeds the maximum allowed bits.
    InvalidGuard,
}

impl CapError {
    /// Get a short description of the error.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptySlot => "slot is empty",
            Self::SlotOccupied => "destination slot is occupied",
            Self::RightsEscalation => "cannot increase capability rights",
            Self::BadgeNotSupported => "object type does not support badging",
            Self::BadgeAlreadySet => "capability already has a badge",
            Self::InvalidOperation => "invalid operation for object type",
            Self::OutOfSlots => "out of capability slots",
            Self::InvalidRadix => "invalid CNode radix",
            Self::InvalidGuard => "invalid guard size",
        }
    }
}

impl fmt::Display for CapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result type for capability operations.
pub type CapResult<T> = Result<T, CapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(CapError::EmptySlot.as_str(), "slot is empty");
        assert_eq!(
            CapError::RightsEscalation.as_str(),
            "cannot increase capability rights"
        );
    }
}
