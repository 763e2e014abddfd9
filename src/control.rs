//! The per-tick control loop: derive events, transition, run entry actions.
//!
//! [`ControlLoop::tick`] never blocks. It returns a [`Directive`] and the
//! board loop performs the suspension (idle, power-off, fatal blink) that
//! the new state calls for, then ticks again.

use crate::actions::{self, Directive, Outputs};
use crate::config::Config;
use crate::events::{derive_events, ButtonEdge, EventSet, Inputs};
use crate::hal::{AnalogSensor, Clock, DigitalIo, Pin, Radio};
use crate::state::{transition, DeviceState, StateRecord};

/// Outcome of one tick, for logging and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick {
    pub from: DeviceState,
    pub to: DeviceState,
    pub events: EventSet,
    pub directive: Directive,
}

pub struct ControlLoop<'e, R, D, A, C> {
    config: Config,
    record: StateRecord,
    edge: &'e ButtonEdge,
    radio: R,
    io: D,
    sensor: A,
    clock: C,
}

impl<'e, R, D, A, C> ControlLoop<'e, R, D, A, C>
where
    R: Radio,
    D: DigitalIo,
    A: AnalogSensor,
    C: Clock,
{
    /// Start in `Off`, entered now.
    pub fn new(config: Config, edge: &'e ButtonEdge, radio: R, io: D, sensor: A, clock: C) -> Self {
        let record = StateRecord::new(DeviceState::Off, clock.now_ms());
        Self {
            config,
            record,
            edge,
            radio,
            io,
            sensor,
            clock,
        }
    }

    /// Publish the boot values (button released, battery level) and turn
    /// the indicator off. Returns the published battery level.
    pub fn start(&mut self) -> u8 {
        let percent = actions::publish_boot_values(&mut self.outputs());
        info!("control: started in {}, battery {}%", self.record.state(), percent);
        percent
    }

    pub fn tick(&mut self) -> Directive {
        self.step().directive
    }

    /// Like [`tick`](Self::tick) but reports the whole outcome.
    pub fn step(&mut self) -> Tick {
        let now_ms = self.clock.now_ms();
        let inputs = Inputs {
            now_ms,
            button_released: self.io.read_level(Pin::Button),
            connected: self.radio.is_connected(),
        };
        let events = derive_events(&self.record, inputs, self.edge, &self.config);

        let from = self.record.state();
        let to = transition(from, events, &self.config);
        if self.record.advance(to, now_ms) {
            info!("state: {} -> {} @{}ms ({})", from, to, now_ms, events);
        } else {
            trace!("state: {} ({})", from, events);
        }

        let directive = actions::dispatch(from, to, &mut self.outputs());
        self.radio.poll();

        Tick {
            from,
            to,
            events,
            directive,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.record.state()
    }

    pub fn record(&self) -> &StateRecord {
        &self.record
    }

    /// Flip the indicator; one half-period of the fatal blink.
    pub fn toggle_indicator(&mut self) {
        let on = self.io.read_level(Pin::Indicator);
        self.io.write_level(Pin::Indicator, !on);
    }

    pub fn set_indicator(&mut self, on: bool) {
        self.io.write_level(Pin::Indicator, on);
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn io(&self) -> &D {
        &self.io
    }

    fn outputs(&mut self) -> Outputs<'_, R, D, A> {
        Outputs {
            radio: &mut self.radio,
            io: &mut self.io,
            sensor: &mut self.sensor,
            config: &self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::hal::Characteristic;
    use core::cell::Cell;

    #[derive(Default)]
    struct TestRadio {
        connected: bool,
        polls: usize,
        published: heapless::Vec<(Characteristic, u8), 16>,
    }

    impl Radio for TestRadio {
        fn is_connected(&self) -> bool {
            self.connected
        }
        fn publish(&mut self, characteristic: Characteristic, value: u8) -> Result<(), Error> {
            self.published.push((characteristic, value)).map_err(|_| Error::Notify)
        }
        fn poll(&mut self) {
            self.polls += 1;
        }
    }

    struct TestIo {
        button_high: bool,
        indicator: bool,
    }

    impl DigitalIo for TestIo {
        fn read_level(&mut self, pin: Pin) -> bool {
            match pin {
                Pin::Button => self.button_high,
                Pin::Indicator => self.indicator,
            }
        }
        fn write_level(&mut self, pin: Pin, high: bool) {
            if pin == Pin::Indicator {
                self.indicator = high;
            }
        }
    }

    struct FixedSensor(i32);

    impl AnalogSensor for FixedSensor {
        fn read_raw(&mut self) -> i32 {
            self.0
        }
    }

    struct TestClock<'a>(&'a Cell<u64>);

    impl Clock for TestClock<'_> {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }
    }

    type Loop<'a> = ControlLoop<'a, TestRadio, TestIo, FixedSensor, TestClock<'a>>;

    fn control<'a>(edge: &'a ButtonEdge, time: &'a Cell<u64>) -> Loop<'a> {
        let io = TestIo {
            button_high: true,
            indicator: true,
        };
        ControlLoop::new(
            Config::default(),
            edge,
            TestRadio::default(),
            io,
            FixedSensor(3000),
            TestClock(time),
        )
    }

    #[test]
    fn new_loop_starts_off_at_current_time() {
        let edge = ButtonEdge::new();
        let time = Cell::new(42);
        let ctl = control(&edge, &time);
        assert_eq!(ctl.state(), DeviceState::Off);
        assert_eq!(ctl.record().entered_at_ms(), 42);
    }

    #[test]
    fn start_publishes_boot_values() {
        let edge = ButtonEdge::new();
        let time = Cell::new(0);
        let mut ctl = control(&edge, &time);
        let percent = ctl.start();
        assert!(percent <= 100);
        assert_eq!(
            ctl.radio().published.as_slice(),
            &[(Characteristic::Button, 0), (Characteristic::Battery, percent)]
        );
        assert!(!ctl.io().indicator);
    }

    #[test]
    fn tick_polls_radio_every_time() {
        let edge = ButtonEdge::new();
        let time = Cell::new(0);
        let mut ctl = control(&edge, &time);
        edge.signal();
        ctl.tick();
        ctl.tick();
        ctl.tick();
        assert_eq!(ctl.radio().polls, 3);
    }

    #[test]
    fn step_reports_transition_and_resets_clock() {
        let edge = ButtonEdge::new();
        let time = Cell::new(1_000);
        let mut ctl = control(&edge, &time);

        time.set(1_500);
        edge.signal();
        let tick = ctl.step();
        assert_eq!(tick.from, DeviceState::Off);
        assert_eq!(tick.to, DeviceState::Broadcasting);
        assert_eq!(tick.directive, Directive::Idle);
        assert_eq!(ctl.record().entered_at_ms(), 1_500);

        time.set(2_000);
        let tick = ctl.step();
        assert_eq!(tick.to, DeviceState::Broadcasting);
        assert_eq!(ctl.record().entered_at_ms(), 1_500);
    }

    #[test]
    fn toggle_indicator_flips_level() {
        let edge = ButtonEdge::new();
        let time = Cell::new(0);
        let mut ctl = control(&edge, &time);
        ctl.set_indicator(false);
        ctl.toggle_indicator();
        assert!(ctl.io().indicator);
        ctl.toggle_indicator();
        assert!(!ctl.io().indicator);
    }
}
