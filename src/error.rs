//! Unified error type for ptt-button.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (with the `defmt` feature) for efficient
//! on-target logging.
//!
//! None of these are fatal to the control loop: a failed publish is
//! logged and the next tick carries on.

/// Top-level error type used by the collaborator interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Radio
    /// The radio stack refused to send a notification.
    Notify,

    /// The radio stack refused to store a characteristic value.
    SetValue,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Notify => f.write_str("notification failed"),
            Error::SetValue => f.write_str("characteristic update failed"),
        }
    }
}
