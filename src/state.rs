//! Device lifecycle state machine.
//!
//! Transitions, first match wins within a state:
//!
//! - **Off**: press (or always, per [`WakePolicy`]) → Broadcasting
//! - **Broadcasting**: connected → Sleeping; idle timeout → Off
//! - **Sleeping**: press → ConfirmingButtonDown; idle timeout → Off;
//!   disconnected → Broadcasting
//! - **ConfirmingButtonDown**: debounce elapsed → Transmitting; else → Sleeping
//! - **Transmitting**: released → ConfirmingButtonUp
//! - **ConfirmingButtonUp**: re-press → Transmitting; else → Sleeping
//!
//! [`transition`] is pure. [`StateRecord`] holds the current state and
//! the time it was entered, which is the only timing reference for idle
//! and debounce events.

use crate::config::{Config, IdleTimeout, WakePolicy};
use crate::events::{Event, EventSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Powered down (system off).
    Off,
    /// Advertising, waiting for a central.
    Broadcasting,
    /// Connected, CPU idle between events.
    Sleeping,
    /// Press seen, waiting out the debounce window.
    ConfirmingButtonDown,
    /// Button held; "pressed" has been published.
    Transmitting,
    /// Release seen, one tick to catch a re-press.
    ConfirmingButtonUp,
    /// Defect sentinel. Never produced from a valid state.
    Invalid,
}

impl DeviceState {
    pub const VALID: [DeviceState; 6] = [
        DeviceState::Off,
        DeviceState::Broadcasting,
        DeviceState::Sleeping,
        DeviceState::ConfirmingButtonDown,
        DeviceState::Transmitting,
        DeviceState::ConfirmingButtonUp,
    ];

    pub const fn is_valid(self) -> bool {
        !matches!(self, DeviceState::Invalid)
    }
}

/// Current state plus when it was entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateRecord {
    current: DeviceState,
    entered_at_ms: u64,
}

impl StateRecord {
    pub const fn new(state: DeviceState, now_ms: u64) -> Self {
        Self {
            current: state,
            entered_at_ms: now_ms,
        }
    }

    pub const fn state(&self) -> DeviceState {
        self.current
    }

    pub const fn entered_at_ms(&self) -> u64 {
        self.entered_at_ms
    }

    /// Time spent in the current state. A clock reading before the entry
    /// time counts as zero.
    pub const fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.entered_at_ms)
    }

    /// Move to `next`. The entry time is only reset on an actual change.
    /// Returns whether the state changed.
    pub fn advance(&mut self, next: DeviceState, now_ms: u64) -> bool {
        if next == self.current {
            return false;
        }
        self.current = next;
        self.entered_at_ms = now_ms;
        true
    }
}

fn timeout_event(timeout: IdleTimeout) -> Event {
    match timeout {
        IdleTimeout::Short => Event::ShortIdleTimeoutElapsed,
        IdleTimeout::Long => Event::LongIdleTimeoutElapsed,
    }
}

/// Next state for `state` given this tick's events.
///
/// Within each state the first matching condition wins.
pub fn transition(state: DeviceState, events: EventSet, config: &Config) -> DeviceState {
    use DeviceState::*;

    match state {
        Off => match config.wake_policy {
            WakePolicy::Always => Broadcasting,
            WakePolicy::OnButtonPress if events.contains(Event::ButtonPressed) => Broadcasting,
            WakePolicy::OnButtonPress => Off,
        },
        Broadcasting => {
            if events.contains(Event::RadioConnected) {
                Sleeping
            } else if events.contains(timeout_event(config.broadcast_timeout)) {
                Off
            } else {
                Broadcasting
            }
        }
        Sleeping => {
            if events.contains(Event::ButtonPressed) {
                ConfirmingButtonDown
            } else if events.contains(timeout_event(config.sleep_timeout)) {
                Off
            } else if events.contains(Event::RadioDisconnected) {
                Broadcasting
            } else {
                Sleeping
            }
        }
        ConfirmingButtonDown => {
            if events.contains(Event::DebounceWindowElapsed) {
                Transmitting
            } else {
                Sleeping
            }
        }
        Transmitting => {
            if events.contains(Event::ButtonReleased) {
                ConfirmingButtonUp
            } else {
                Transmitting
            }
        }
        ConfirmingButtonUp => {
            if events.contains(Event::ButtonPressed) {
                Transmitting
            } else {
                Sleeping
            }
        }
        Invalid => Invalid,
    }
}
