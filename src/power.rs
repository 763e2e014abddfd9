//! Power management - idle, system off, and the fatal blink.
//!
//! nRF52840 power modes:
//! - System ON: Normal operation
//! - System ON Idle: CPU sleeping in the executor, peripherals active
//! - System OFF: Deep sleep, wake (= reset) on the button's GPIO sense
//!
//! This is where the control loop's [`Directive`]s are carried out.

use defmt::{error, info};
use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Timer};
use nrf_softdevice::raw;
use ptt_button::config::{FATAL_BLINK_MS, IDLE_WAKE_INTERVAL_MS};
use ptt_button::hal::{AnalogSensor, Clock, DigitalIo, Radio};
use ptt_button::{ControlLoop, Directive};

/// Raised by anything that should end an idle wait early: button press,
/// connect, disconnect.
pub static WAKE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Milliseconds since boot from the RTC-backed embassy time driver.
pub struct Uptime;

impl Clock for Uptime {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

/// Sleep until a wake signal or the idle timer. A signal raised while the
/// loop was busy is still pending here and ends the wait at once; that
/// costs one extra tick and never loses an event.
async fn idle() {
    select(WAKE.wait(), Timer::after_millis(IDLE_WAKE_INTERVAL_MS)).await;
}

/// Enter System OFF. The button task is parked in a level wait, which keeps
/// the pin's SENSE armed, so the next press resets the chip.
fn system_off() -> ! {
    info!("power: system off");
    // SAFETY: no return; the SoftDevice owns the POWER peripheral.
    unsafe {
        raw::sd_power_system_off();
    }
    // Only reached under a debugger, where System OFF is emulated.
    loop {
        cortex_m::asm::wfe();
    }
}

async fn halt<R, D, A, C>(control: &mut ControlLoop<'_, R, D, A, C>) -> !
where
    R: Radio,
    D: DigitalIo,
    A: AnalogSensor,
    C: Clock,
{
    error!("control: invalid state, halting");
    loop {
        control.toggle_indicator();
        Timer::after_millis(FATAL_BLINK_MS).await;
    }
}

/// Run the control loop forever.
pub async fn run<R, D, A, C>(mut control: ControlLoop<'_, R, D, A, C>) -> !
where
    R: Radio,
    D: DigitalIo,
    A: AnalogSensor,
    C: Clock,
{
    control.start();
    loop {
        match control.tick() {
            Directive::Continue { after_ms } => Timer::after_millis(after_ms).await,
            Directive::Idle => idle().await,
            Directive::PowerOff => system_off(),
            Directive::Halt => halt(&mut control).await,
        }
    }
}
