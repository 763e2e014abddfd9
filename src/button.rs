//! GPIO push button (active-low with internal pull-up).
//!
//! One task owns the pin. It raises the shared press flag on every press
//! and mirrors the current level into an atomic, which is what the control
//! loop reads through [`MirroredButton`]. Level waits (not edge waits) are
//! used so a press landing between two waits is never missed.

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};

use defmt::trace;
use embassy_nrf::gpio::Input;
use embedded_hal::digital::{ErrorType, InputPin};
use embedded_hal_async::digital::Wait;
use ptt_button::ButtonEdge;

use crate::power::WAKE;

/// Press flag consumed by the control loop.
pub static BUTTON_EDGE: ButtonEdge = ButtonEdge::new();

/// Last observed level: true while the button is up.
static RELEASED: AtomicBool = AtomicBool::new(true);

/// Read-only view of the button level for the control loop.
pub struct MirroredButton;

impl ErrorType for MirroredButton {
    type Error = Infallible;
}

impl InputPin for MirroredButton {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(RELEASED.load(Ordering::Acquire))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!RELEASED.load(Ordering::Acquire))
    }
}

/// Follow the pin forever.
pub async fn watch<P>(pin: &mut P, edge: &ButtonEdge) -> !
where
    P: Wait + InputPin,
{
    loop {
        let released = pin.is_high().unwrap_or(true);
        RELEASED.store(released, Ordering::Release);

        if released {
            if pin.wait_for_low().await.is_ok() {
                trace!("button: down");
                edge.signal();
                WAKE.signal(());
            }
        } else if pin.wait_for_high().await.is_ok() {
            trace!("button: up");
        }
    }
}

#[embassy_executor::task]
pub async fn button_task(mut pin: Input<'static>) -> ! {
    watch(&mut pin, &BUTTON_EDGE).await
}
