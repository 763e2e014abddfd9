//! Supply voltage sampling with the SAADC.
//!
//! SAADC sampling is async, so a task samples VDD periodically and the
//! control loop reads the latest value. The default channel config (gain
//! 1/6, internal 0.6 V reference, 12 bit) matches `AdcScale::NRF52_VDD`.

use core::sync::atomic::{AtomicI32, Ordering};

use defmt::debug;
use embassy_nrf::interrupt::typelevel::Binding;
use embassy_nrf::peripherals::SAADC;
use embassy_nrf::saadc::{self, ChannelConfig, Saadc, VddInput};
use embassy_time::Timer;
use ptt_button::config::BATTERY_SAMPLE_INTERVAL_SECS;
use ptt_button::hal::AnalogSensor;

static LATEST_RAW: AtomicI32 = AtomicI32::new(0);

/// [`AnalogSensor`] returning the most recent sample.
pub struct LatestSample;

impl AnalogSensor for LatestSample {
    fn read_raw(&mut self) -> i32 {
        LATEST_RAW.load(Ordering::Relaxed)
    }
}

/// Calibrate and take the first sample, so boot publishes a real value.
pub async fn init(
    peripheral: SAADC,
    irq: impl Binding<embassy_nrf::interrupt::typelevel::SAADC, saadc::InterruptHandler> + 'static,
) -> Saadc<'static, 1> {
    let channel = ChannelConfig::single_ended(VddInput);
    let mut adc = Saadc::new(peripheral, irq, saadc::Config::default(), [channel]);
    adc.calibrate().await;
    sample(&mut adc).await;
    adc
}

async fn sample(adc: &mut Saadc<'_, 1>) {
    let mut buf = [0i16; 1];
    adc.sample(&mut buf).await;
    debug!("battery: raw {}", buf[0]);
    LATEST_RAW.store(i32::from(buf[0]), Ordering::Relaxed);
}

#[embassy_executor::task]
pub async fn battery_task(mut adc: Saadc<'static, 1>) -> ! {
    loop {
        Timer::after_secs(BATTERY_SAMPLE_INTERVAL_SECS).await;
        sample(&mut adc).await;
    }
}
