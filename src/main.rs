//! ptt-button firmware entry point (nRF52840 + SoftDevice S140).
//!
//! Boot sequence:
//!
//! 1. Embassy HAL init with SoftDevice-compatible interrupt priorities.
//! 2. If the button is held, this boot was the wake-up press: record it.
//! 3. SoftDevice + GATT server, startup blink, first battery sample.
//! 4. Spawn the SoftDevice, button, battery and advertiser tasks.
//! 5. Run the control loop on the main task until it powers off.

#![no_std]
#![no_main]

mod battery_adc;
mod ble;
mod button;
mod power;

use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::{bind_interrupts, saadc};
use embassy_time::Timer;
use ptt_button::config::{self, Config};
use ptt_button::hal::GpioPins;
use ptt_button::ControlLoop;
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
});

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("ptt-button booting");

    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);
    interrupt::SAADC.set_priority(Priority::P3);

    let mut led = Output::new(p.P0_13, Level::Low, OutputDrive::Standard);
    let button_pin = Input::new(p.P0_11, Pull::Up);

    if button_pin.is_low() {
        info!("woken by button");
        button::BUTTON_EDGE.signal();
    }

    let (sd, server) = ble::init();
    unwrap!(spawner.spawn(ble::softdevice_task(sd)));

    led.set_high();
    Timer::after_millis(config::STARTUP_BLINK_ON_MS).await;
    led.set_low();
    Timer::after_millis(config::STARTUP_BLINK_OFF_MS).await;

    let adc = battery_adc::init(p.SAADC, Irqs).await;
    unwrap!(spawner.spawn(battery_adc::battery_task(adc)));
    unwrap!(spawner.spawn(button::button_task(button_pin)));
    unwrap!(spawner.spawn(ble::advertiser::advertise_task(sd, server)));

    let control = ControlLoop::new(
        Config::new(),
        &button::BUTTON_EDGE,
        ble::server::SoftdeviceRadio::new(server),
        GpioPins::new(button::MirroredButton, led),
        battery_adc::LatestSample,
        power::Uptime,
    );
    power::run(control).await
}
