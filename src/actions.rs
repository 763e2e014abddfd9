//! Entry actions.
//!
//! Run after every transition (including self-loops) with the previous and
//! the new state. Side effects that only make sense inside the core
//! (publishing characteristics, driving the indicator) happen here; the
//! ones that suspend or end execution are handed back to the board loop as
//! a [`Directive`].

use crate::config::Config;
use crate::hal::{
    AnalogSensor, Characteristic, DigitalIo, Pin, Radio, BUTTON_PRESSED, BUTTON_RELEASED,
};
use crate::state::DeviceState;

/// What the board loop does once the tick's entry actions ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Directive {
    /// Tick again once `after_ms` has passed.
    Continue { after_ms: u64 },
    /// Sleep until the next radio, button or timer event, then tick.
    Idle,
    /// Irreversible system off. Never returns.
    PowerOff,
    /// Logic defect: blink the indicator forever.
    Halt,
}

/// Collaborators touched by entry actions.
pub struct Outputs<'a, R, D, A> {
    pub radio: &'a mut R,
    pub io: &'a mut D,
    pub sensor: &'a mut A,
    pub config: &'a Config,
}

impl<R, D, A> Outputs<'_, R, D, A>
where
    R: Radio,
    D: DigitalIo,
    A: AnalogSensor,
{
    fn publish(&mut self, characteristic: Characteristic, value: u8) {
        if let Err(e) = self.radio.publish(characteristic, value) {
            warn!("publish {}={} failed: {}", characteristic, value, e);
        }
    }

    fn publish_battery(&mut self) -> u8 {
        let raw = self.sensor.read_raw();
        let percent = self.config.battery.estimate(raw);
        debug!("battery raw={} -> {}%", raw, percent);
        self.publish(Characteristic::Battery, percent);
        percent
    }

    fn active(&self) -> Directive {
        Directive::Continue {
            after_ms: self.config.active_tick_ms,
        }
    }
}

/// Perform the entry actions for `to`, having come from `from`.
pub fn dispatch<R, D, A>(
    from: DeviceState,
    to: DeviceState,
    out: &mut Outputs<'_, R, D, A>,
) -> Directive
where
    R: Radio,
    D: DigitalIo,
    A: AnalogSensor,
{
    match to {
        DeviceState::Off => Directive::PowerOff,
        DeviceState::Broadcasting => Directive::Idle,
        DeviceState::Sleeping => {
            if from == DeviceState::ConfirmingButtonUp {
                out.publish(Characteristic::Button, BUTTON_RELEASED);
                out.publish_battery();
            }
            Directive::Idle
        }
        DeviceState::ConfirmingButtonDown => Directive::Continue {
            after_ms: out.config.debounce_tick_ms(),
        },
        DeviceState::Transmitting => {
            if from != DeviceState::Transmitting {
                out.publish(Characteristic::Button, BUTTON_PRESSED);
            }
            out.io.write_level(Pin::Indicator, true);
            out.active()
        }
        DeviceState::ConfirmingButtonUp => {
            if from == DeviceState::Transmitting {
                out.io.write_level(Pin::Indicator, false);
            }
            out.active()
        }
        DeviceState::Invalid => Directive::Halt,
    }
}

/// Initial characteristic values after boot: released, current battery level.
pub fn publish_boot_values<R, D, A>(out: &mut Outputs<'_, R, D, A>) -> u8
where
    R: Radio,
    D: DigitalIo,
    A: AnalogSensor,
{
    out.publish(Characteristic::Button, BUTTON_RELEASED);
    out.io.write_level(Pin::Indicator, false);
    out.publish_battery()
}
