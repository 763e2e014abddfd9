//! Connectable advertising and per-connection GATT service.

use defmt::{info, warn};
use embassy_time::Timer;
use nrf_softdevice::ble::advertisement_builder::{
    AdvertisementDataType, Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload,
    ServiceList, ServiceUuid16,
};
use nrf_softdevice::ble::{gatt_server, peripheral};
use nrf_softdevice::Softdevice;
use ptt_button::config;

use super::server::Server;
use super::{conn_params, CONNECTION};
use crate::power::WAKE;

const APPEARANCE_LE: [u8; 2] = config::APPEARANCE.to_le_bytes();

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_16(
        ServiceList::Incomplete,
        &[
            ServiceUuid16::from_u16(config::BUTTON_SERVICE_UUID),
            ServiceUuid16::from_u16(config::BATTERY_SERVICE_UUID),
        ],
    )
    .full_name(config::DEVICE_NAME)
    .raw(AdvertisementDataType::APPEARANCE, &APPEARANCE_LE)
    .raw(
        AdvertisementDataType::MANUFACTURER_SPECIFIC_DATA,
        &config::MANUFACTURER_DATA,
    )
    .build();

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new().build();

/// Advertising interval in 0.625 ms units.
const ADV_INTERVAL: u32 = config::ADVERTISING_INTERVAL_MS * 1000 / 625;

/// Advertise, serve one connection until it drops, repeat.
#[embassy_executor::task]
pub async fn advertise_task(sd: &'static Softdevice, server: &'static Server) -> ! {
    let adv_config = peripheral::Config {
        interval: ADV_INTERVAL,
        ..Default::default()
    };

    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        let conn = match peripheral::advertise_connectable(sd, adv, &adv_config).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("ble: advertising failed: {:?}", e);
                Timer::after_secs(1).await;
                continue;
            }
        };

        info!("ble: central connected");
        if let Err(e) = conn.set_conn_params(conn_params()) {
            warn!("ble: connection parameters rejected: {:?}", e);
        }
        if server.ptt.compat_set(&1).is_err() {
            warn!("ble: compat characteristic not set");
        }

        CONNECTION.lock(|c| c.replace(Some(conn.clone())));
        WAKE.signal(());

        let reason = gatt_server::run(&conn, server, |event| server.on_event(event)).await;
        info!("ble: disconnected: {:?}", reason);

        CONNECTION.lock(|c| c.replace(None));
        WAKE.signal(());
    }
}
