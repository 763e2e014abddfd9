//! Application-wide constants and runtime-selectable device variants.
//!
//! All radio identifiers, timing parameters, and battery calibration
//! live here so they can be tuned in one place.

use crate::battery::{AdcScale, BatteryEstimator, BatteryPolicy, CR2032_CURVE};

// Lifecycle timing

/// Time without a connection after which an advertising device powers off.
pub const SHORT_IDLE_TIMEOUT_MS: u64 = 60 * 1000;

/// Time a connected device may sit unused before it powers off.
pub const LONG_IDLE_TIMEOUT_MS: u64 = 6 * 60 * 60 * 1000;

/// Settling time after a press before committing to transmit.
pub const DEBOUNCE_WINDOW_MS: u64 = 10;

// BLE

/// GAP device name and advertised local name.
pub const DEVICE_NAME: &str = "CLICK";

/// Manufacturer-specific advertising payload.
pub const MANUFACTURER_DATA: [u8; 4] = [0x59, 0x00, 0x00, 0x95];

/// GAP appearance: Generic Remote Control.
pub const APPEARANCE: u16 = 0x0180;

/// Advertising interval (ms).
pub const ADVERTISING_INTERVAL_MS: u32 = 60;

/// BLE connection interval range (in 1.25 ms units).
/// 36 = 45 ms. Lower values make the button more responsive.
pub const BLE_CONN_INTERVAL_MIN: u16 = 36;
pub const BLE_CONN_INTERVAL_MAX: u16 = 36;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// Push-to-talk service. `ffe0` is what phone PTT apps look for.
pub const BUTTON_SERVICE_UUID: u16 = 0xffe0;
/// Button state characteristic: 0 released, 1 pressed.
pub const BUTTON_CHAR_UUID: u16 = 0xffe1;
/// Read/write companion characteristic held at 1; some phones refuse the
/// service without it.
pub const COMPAT_CHAR_UUID: u16 = 0x1525;

/// Standard Battery Service / Battery Level.
pub const BATTERY_SERVICE_UUID: u16 = 0x180f;
pub const BATTERY_LEVEL_CHAR_UUID: u16 = 0x2a19;

// Indicator LED patterns

/// Power-on blink: on, then off, before the control loop starts.
pub const STARTUP_BLINK_ON_MS: u64 = 100;
pub const STARTUP_BLINK_OFF_MS: u64 = 500;

/// Half-period of the unrecoverable-failure blink.
pub const FATAL_BLINK_MS: u64 = 300;

// Control loop pacing

/// Timer wake while idling, so idle timeouts are noticed without any
/// radio or button activity.
pub const IDLE_WAKE_INTERVAL_MS: u64 = 1000;

/// Spacing between ticks in states that do not idle.
pub const ACTIVE_TICK_MS: u64 = 1;

/// How often the battery voltage is re-sampled (seconds).
pub const BATTERY_SAMPLE_INTERVAL_SECS: u64 = 60;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Button (active-low, pull-up) → P0.11
//   Indicator LED (active-high)  → P0.13

/// What takes the device out of `Off`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakePolicy {
    /// A button press starts advertising.
    OnButtonPress,
    /// Advertising starts as soon as `Off` is re-evaluated.
    Always,
}

/// Which idle threshold a state watches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdleTimeout {
    Short,
    Long,
}

/// Runtime configuration handed to the control loop.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub wake_policy: WakePolicy,
    pub short_idle_timeout_ms: u64,
    pub long_idle_timeout_ms: u64,
    pub debounce_window_ms: u64,
    /// Spacing between ticks in `Transmitting` and `ConfirmingButtonUp`.
    pub active_tick_ms: u64,
    /// Timeout that powers off an advertising device.
    pub broadcast_timeout: IdleTimeout,
    /// Timeout that powers off a connected, idle device.
    pub sleep_timeout: IdleTimeout,
    pub battery: BatteryEstimator,
}

impl Config {
    /// Button-wake device with the CR2032 discharge curve.
    pub const fn new() -> Self {
        Self {
            wake_policy: WakePolicy::OnButtonPress,
            short_idle_timeout_ms: SHORT_IDLE_TIMEOUT_MS,
            long_idle_timeout_ms: LONG_IDLE_TIMEOUT_MS,
            debounce_window_ms: DEBOUNCE_WINDOW_MS,
            active_tick_ms: ACTIVE_TICK_MS,
            broadcast_timeout: IdleTimeout::Short,
            sleep_timeout: IdleTimeout::Long,
            battery: BatteryEstimator::new(
                AdcScale::NRF52_VDD,
                BatteryPolicy::Curve(&CR2032_CURVE),
            ),
        }
    }

    pub const fn with_wake_policy(mut self, policy: WakePolicy) -> Self {
        self.wake_policy = policy;
        self
    }

    /// Swap which state watches the short and which the long timeout.
    pub const fn with_swapped_timeouts(mut self) -> Self {
        let broadcast = self.broadcast_timeout;
        self.broadcast_timeout = self.sleep_timeout;
        self.sleep_timeout = broadcast;
        self
    }

    /// Wait after entering `ConfirmingButtonDown`. The next tick must land
    /// past the debounce window, otherwise the press is dropped.
    pub const fn debounce_tick_ms(&self) -> u64 {
        self.debounce_window_ms + 1
    }

    pub const fn with_battery(mut self, battery: BatteryEstimator) -> Self {
        self.battery = battery;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
