//! Event derivation.
//!
//! Once per tick the raw inputs (the interrupt-set press flag, the current
//! button level, the connection flag, and time spent in the current state)
//! are folded into an [`EventSet`] for the state machine.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::Config;
use crate::state::StateRecord;

/// Individual events observed in a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Event {
    /// A press happened since the last tick (edge, consumed on read).
    ButtonPressed = 1 << 0,
    /// The button is not held right now (level).
    ButtonReleased = 1 << 1,
    RadioConnected = 1 << 2,
    RadioDisconnected = 1 << 3,
    LongIdleTimeoutElapsed = 1 << 4,
    ShortIdleTimeoutElapsed = 1 << 5,
    DebounceWindowElapsed = 1 << 6,
}

impl Event {
    pub const ALL: [Event; 7] = [
        Event::ButtonPressed,
        Event::ButtonReleased,
        Event::RadioConnected,
        Event::RadioDisconnected,
        Event::LongIdleTimeoutElapsed,
        Event::ShortIdleTimeoutElapsed,
        Event::DebounceWindowElapsed,
    ];

    const fn bit(self) -> u8 {
        self as u8
    }
}

/// Set of events for one tick.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventSet(u8);

impl EventSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn with(self, event: Event) -> Self {
        Self(self.0 | event.bit())
    }

    pub fn insert(&mut self, event: Event) {
        self.0 |= event.bit();
    }

    pub const fn contains(&self, event: Event) -> bool {
        self.0 & event.bit() != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        Event::ALL.into_iter().filter(|e| self.contains(*e))
    }
}

impl FromIterator<Event> for EventSet {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        let mut set = EventSet::empty();
        for event in iter {
            set.insert(event);
        }
        set
    }
}

impl core::fmt::Debug for EventSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Press flag shared between the button interrupt and the control loop.
///
/// The interrupt side only ever raises it; the loop consumes it with a
/// single atomic swap, so a press landing between two ticks is reported
/// exactly once.
pub struct ButtonEdge {
    pressed: AtomicBool,
}

impl ButtonEdge {
    pub const fn new() -> Self {
        Self {
            pressed: AtomicBool::new(false),
        }
    }

    /// Record a press. Safe to call from interrupt context.
    pub fn signal(&self) {
        self.pressed.store(true, Ordering::Release);
    }

    /// Test-and-clear.
    pub fn take(&self) -> bool {
        self.pressed.swap(false, Ordering::AcqRel)
    }

    /// Look without consuming.
    pub fn is_pending(&self) -> bool {
        self.pressed.load(Ordering::Acquire)
    }
}

impl Default for ButtonEdge {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw inputs sampled for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Inputs {
    pub now_ms: u64,
    /// Button level is high (open switch, pulled up).
    pub button_released: bool,
    pub connected: bool,
}

/// Build the event set for this tick, consuming any pending press.
pub fn derive_events(
    record: &StateRecord,
    inputs: Inputs,
    edge: &ButtonEdge,
    config: &Config,
) -> EventSet {
    let mut events = EventSet::empty();

    if edge.take() {
        events.insert(Event::ButtonPressed);
    }
    if inputs.button_released {
        events.insert(Event::ButtonReleased);
    }

    let elapsed = record.elapsed_ms(inputs.now_ms);
    if elapsed > config.long_idle_timeout_ms {
        events.insert(Event::LongIdleTimeoutElapsed);
    }
    if elapsed > config.short_idle_timeout_ms {
        events.insert(Event::ShortIdleTimeoutElapsed);
    }
    if elapsed > config.debounce_window_ms {
        events.insert(Event::DebounceWindowElapsed);
    }

    events.insert(if inputs.connected {
        Event::RadioConnected
    } else {
        Event::RadioDisconnected
    });

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DeviceState;

    fn inputs(now_ms: u64, button_released: bool, connected: bool) -> Inputs {
        Inputs {
            now_ms,
            button_released,
            connected,
        }
    }

    #[test]
    fn event_set_basics() {
        let set = EventSet::empty()
            .with(Event::ButtonPressed)
            .with(Event::RadioConnected);
        assert!(set.contains(Event::ButtonPressed));
        assert!(set.contains(Event::RadioConnected));
        assert!(!set.contains(Event::RadioDisconnected));
        assert!(!set.is_empty());
        assert!(EventSet::empty().is_empty());

        let collected: EventSet = set.iter().collect();
        assert_eq!(collected, set);
    }

    #[test]
    fn event_bits_are_distinct() {
        let all: EventSet = Event::ALL.into_iter().collect();
        assert_eq!(all.iter().count(), Event::ALL.len());
    }

    #[test]
    fn edge_is_consumed_exactly_once() {
        let edge = ButtonEdge::new();
        assert!(!edge.take());

        edge.signal();
        edge.signal();
        assert!(edge.is_pending());
        assert!(edge.take());
        assert!(!edge.take());
        assert!(!edge.is_pending());
    }

    #[test]
    fn press_is_reported_once() {
        let config = Config::default();
        let record = StateRecord::new(DeviceState::Sleeping, 0);
        let edge = ButtonEdge::new();
        edge.signal();

        let first = derive_events(&record, inputs(1, false, true), &edge, &config);
        let second = derive_events(&record, inputs(2, false, true), &edge, &config);
        assert!(first.contains(Event::ButtonPressed));
        assert!(!second.contains(Event::ButtonPressed));
    }

    #[test]
    fn connection_flag_is_exactly_one() {
        let config = Config::default();
        let record = StateRecord::new(DeviceState::Broadcasting, 0);
        let edge = ButtonEdge::new();

        for connected in [true, false] {
            let events = derive_events(&record, inputs(0, true, connected), &edge, &config);
            assert_ne!(
                events.contains(Event::RadioConnected),
                events.contains(Event::RadioDisconnected)
            );
            assert_eq!(events.contains(Event::RadioConnected), connected);
        }
    }

    #[test]
    fn released_reflects_level() {
        let config = Config::default();
        let record = StateRecord::new(DeviceState::Transmitting, 0);
        let edge = ButtonEdge::new();

        let held = derive_events(&record, inputs(0, false, true), &edge, &config);
        let open = derive_events(&record, inputs(0, true, true), &edge, &config);
        assert!(!held.contains(Event::ButtonReleased));
        assert!(open.contains(Event::ButtonReleased));
    }

    #[test]
    fn timeouts_fire_strictly_after_threshold() {
        let config = Config::default();
        let record = StateRecord::new(DeviceState::Broadcasting, 1_000);
        let edge = ButtonEdge::new();
        let at = |elapsed: u64| {
            derive_events(&record, inputs(1_000 + elapsed, true, false), &edge, &config)
        };

        let e = at(config.debounce_window_ms);
        assert!(!e.contains(Event::DebounceWindowElapsed));
        let e = at(config.debounce_window_ms + 1);
        assert!(e.contains(Event::DebounceWindowElapsed));
        assert!(!e.contains(Event::ShortIdleTimeoutElapsed));

        let e = at(config.short_idle_timeout_ms);
        assert!(!e.contains(Event::ShortIdleTimeoutElapsed));
        let e = at(config.short_idle_timeout_ms + 1);
        assert!(e.contains(Event::ShortIdleTimeoutElapsed));
        assert!(!e.contains(Event::LongIdleTimeoutElapsed));

        let e = at(config.long_idle_timeout_ms + 1);
        assert!(e.contains(Event::LongIdleTimeoutElapsed));
        assert!(e.contains(Event::ShortIdleTimeoutElapsed));
        assert!(e.contains(Event::DebounceWindowElapsed));
    }

    #[test]
    fn clock_before_entry_counts_as_zero_elapsed() {
        let config = Config::default();
        let record = StateRecord::new(DeviceState::Sleeping, 5_000);
        let edge = ButtonEdge::new();
        let events = derive_events(&record, inputs(10, false, true), &edge, &config);
        assert!(!events.contains(Event::DebounceWindowElapsed));
    }
}
