//! Collaborator interfaces the control logic drives.
//!
//! The core never touches registers. The board binary backs these with
//! the SoftDevice, GPIO and SAADC; tests back them with plain structs.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::Error;

/// Values the radio exposes to the central.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Characteristic {
    /// 0 released, 1 pressed.
    Button,
    /// 0..=100 percent.
    Battery,
}

pub const BUTTON_RELEASED: u8 = 0;
pub const BUTTON_PRESSED: u8 = 1;

pub trait Radio {
    fn is_connected(&self) -> bool;

    /// Store `value` and notify the central if one is subscribed.
    fn publish(&mut self, characteristic: Characteristic, value: u8) -> Result<(), Error>;

    /// Service the protocol stack. Called once per tick.
    fn poll(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pin {
    /// Active-low push button with pull-up.
    Button,
    /// Status LED, active-high.
    Indicator,
}

pub trait DigitalIo {
    fn read_level(&mut self, pin: Pin) -> bool;
    fn write_level(&mut self, pin: Pin, high: bool);
}

pub trait AnalogSensor {
    /// Latest raw sample of the battery divider.
    fn read_raw(&mut self) -> i32;
}

pub trait Clock {
    /// Monotonic milliseconds since boot.
    fn now_ms(&self) -> u64;
}

/// [`DigitalIo`] over a pair of `embedded-hal` pins.
pub struct GpioPins<B, L> {
    button: B,
    indicator: L,
    indicator_high: bool,
}

impl<B, L> GpioPins<B, L>
where
    B: InputPin,
    L: OutputPin,
{
    pub fn new(button: B, indicator: L) -> Self {
        Self {
            button,
            indicator,
            indicator_high: false,
        }
    }

    pub fn release(self) -> (B, L) {
        (self.button, self.indicator)
    }
}

impl<B, L> DigitalIo for GpioPins<B, L>
where
    B: InputPin,
    L: OutputPin,
{
    fn read_level(&mut self, pin: Pin) -> bool {
        match pin {
            // An unreadable button reads as open: never start a transmission on a fault.
            Pin::Button => self.button.is_high().unwrap_or_else(|_| {
                warn!("gpio: {} read failed", pin);
                true
            }),
            Pin::Indicator => self.indicator_high,
        }
    }

    fn write_level(&mut self, pin: Pin, high: bool) {
        match pin {
            Pin::Indicator => {
                let result = if high {
                    self.indicator.set_high()
                } else {
                    self.indicator.set_low()
                };
                match result {
                    Ok(()) => self.indicator_high = high,
                    Err(_) => warn!("gpio: {} write failed", pin),
                }
            }
            Pin::Button => warn!("gpio: {} is an input", pin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    struct Level(bool);

    impl ErrorType for Level {
        type Error = Infallible;
    }

    impl InputPin for Level {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0)
        }
        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0)
        }
    }

    #[derive(Default)]
    struct Led {
        high: bool,
        writes: usize,
    }

    impl ErrorType for Led {
        type Error = Infallible;
    }

    impl OutputPin for Led {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    struct Broken;

    impl ErrorType for Broken {
        type Error = ErrorKind;
    }

    impl InputPin for Broken {
        fn is_high(&mut self) -> Result<bool, ErrorKind> {
            Err(ErrorKind::Other)
        }
        fn is_low(&mut self) -> Result<bool, ErrorKind> {
            Err(ErrorKind::Other)
        }
    }

    impl OutputPin for Broken {
        fn set_low(&mut self) -> Result<(), ErrorKind> {
            Err(ErrorKind::Other)
        }
        fn set_high(&mut self) -> Result<(), ErrorKind> {
            Err(ErrorKind::Other)
        }
    }

    #[test]
    fn gpio_pins_read_button_and_drive_indicator() {
        let mut io = GpioPins::new(Level(false), Led::default());
        assert!(!io.read_level(Pin::Button));
        assert!(!io.read_level(Pin::Indicator));

        io.write_level(Pin::Indicator, true);
        assert!(io.read_level(Pin::Indicator));

        let (_, led) = io.release();
        assert!(led.high);
        assert_eq!(led.writes, 1);
    }

    #[test]
    fn gpio_pins_ignore_writes_to_button() {
        let mut io = GpioPins::new(Level(true), Led::default());
        io.write_level(Pin::Button, false);
        assert!(io.read_level(Pin::Button));
        let (_, led) = io.release();
        assert_eq!(led.writes, 0);
    }

    #[test]
    fn gpio_faults_read_as_released_and_keep_indicator_state() {
        let mut io = GpioPins::new(Broken, Broken);
        assert!(io.read_level(Pin::Button));
        io.write_level(Pin::Indicator, true);
        assert!(!io.read_level(Pin::Indicator));
    }
}
