//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **GATT server** - the push-to-talk service (`ffe0`) and the standard
//!    Battery Service, plus the [`Radio`](ptt_button::hal::Radio) backing
//!    the control loop.
//! 2. **Advertiser** - connectable advertising whenever no central is
//!    connected; serves GATT for the lifetime of each connection.
//!
//! The current connection is shared with the control loop through
//! [`CONNECTION`]; every connect/disconnect also wakes the loop.

pub mod advertiser;
pub mod server;

use core::cell::RefCell;

use defmt::{info, unwrap, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use nrf_softdevice::ble::Connection;
use nrf_softdevice::{raw, Softdevice};
use ptt_button::config;
use static_cell::StaticCell;

use self::server::Server;

/// The connected central, if any.
pub static CONNECTION: Mutex<CriticalSectionRawMutex, RefCell<Option<Connection>>> =
    Mutex::new(RefCell::new(None));

pub fn current_connection() -> Option<Connection> {
    CONNECTION.lock(|c| c.borrow().clone())
}

/// Enable the SoftDevice for a single peripheral link and register the
/// GATT server.
pub fn init() -> (&'static Softdevice, &'static Server) {
    let name = config::DEVICE_NAME.as_bytes();
    let sd_config = nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: name.as_ptr() as _,
            current_len: name.len() as u16,
            max_len: name.len() as u16,
            write_perm: unsafe { core::mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    };

    let sd = Softdevice::enable(&sd_config);

    static SERVER: StaticCell<Server> = StaticCell::new();
    let server = SERVER.init(unwrap!(Server::new(sd)));
    configure_gap();

    (sd, server)
}

/// Appearance and preferred connection parameters.
fn configure_gap() {
    let params = conn_params();
    // SAFETY: called once after the SoftDevice is enabled; arguments outlive the calls.
    let (appearance_err, ppcp_err) = unsafe {
        (
            raw::sd_ble_gap_appearance_set(config::APPEARANCE),
            raw::sd_ble_gap_ppcp_set(&params),
        )
    };
    if appearance_err != raw::NRF_SUCCESS {
        warn!("ble: appearance not set ({})", appearance_err);
    }
    if ppcp_err != raw::NRF_SUCCESS {
        warn!("ble: preferred connection parameters not set ({})", ppcp_err);
    }
}

pub fn conn_params() -> raw::ble_gap_conn_params_t {
    raw::ble_gap_conn_params_t {
        min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
        max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
        slave_latency: config::BLE_SLAVE_LATENCY,
        conn_sup_timeout: config::BLE_SUP_TIMEOUT,
    }
}

#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
    info!("SoftDevice task started");
    sd.run().await
}
