//! GATT server and the control loop's view of the radio.

use defmt::{debug, info};
use ptt_button::hal::{Characteristic, Radio};
use ptt_button::Error;

use super::CONNECTION;
use crate::power::WAKE;

/// Push-to-talk service. Phone PTT apps subscribe to `ffe1`.
#[nrf_softdevice::gatt_service(uuid = "ffe0")]
pub struct PttService {
    /// 0 released, 1 pressed.
    #[characteristic(uuid = "ffe1", read, notify)]
    pub button: u8,
    /// Held at 1. Some phones will not use the service without it.
    #[characteristic(uuid = "1525", read, write)]
    pub compat: u8,
}

/// Battery Service (UUID: 0x180F)
#[nrf_softdevice::gatt_service(uuid = "180f")]
pub struct BatteryService {
    /// Battery Level (UUID: 0x2A19), 0-100 %.
    #[characteristic(uuid = "2a19", read, notify)]
    pub battery_level: u8,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub ptt: PttService,
    pub bas: BatteryService,
}

impl Server {
    /// Handle a GATT write from the central.
    pub fn on_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::Ptt(PttServiceEvent::ButtonCccdWrite { notifications }) => {
                info!("ble: button notifications {}", notifications);
            }
            ServerEvent::Ptt(PttServiceEvent::CompatWrite(value)) => {
                debug!("ble: compat written {}", value);
            }
            ServerEvent::Bas(BatteryServiceEvent::BatteryLevelCccdWrite { notifications }) => {
                info!("ble: battery notifications {}", notifications);
            }
        }
    }
}

/// [`Radio`] over the SoftDevice GATT server.
pub struct SoftdeviceRadio {
    server: &'static Server,
}

impl SoftdeviceRadio {
    pub fn new(server: &'static Server) -> Self {
        Self { server }
    }
}

impl Radio for SoftdeviceRadio {
    fn is_connected(&self) -> bool {
        CONNECTION.lock(|c| c.borrow().is_some())
    }

    fn publish(&mut self, characteristic: Characteristic, value: u8) -> Result<(), Error> {
        let stored = match characteristic {
            Characteristic::Button => self.server.ptt.button_set(&value),
            Characteristic::Battery => self.server.bas.battery_level_set(&value),
        };
        stored.map_err(|_| Error::SetValue)?;

        // Without a central the stored value is what the next read returns.
        let Some(conn) = super::current_connection() else {
            return Ok(());
        };
        let notified = match characteristic {
            Characteristic::Button => self.server.ptt.button_notify(&conn, &value),
            Characteristic::Battery => self.server.bas.battery_level_notify(&conn, &value),
        };
        notified.map_err(|_| Error::Notify)
    }

    /// Drop a connection the stack has already torn down, so the state
    /// machine sees the disconnect on this tick rather than after the
    /// advertiser catches up.
    fn poll(&mut self) {
        let dropped = CONNECTION.lock(|c| {
            let mut conn = c.borrow_mut();
            let stale = conn.as_ref().is_some_and(|conn| conn.handle().is_none());
            if stale {
                *conn = None;
            }
            stale
        });
        if dropped {
            debug!("ble: stale connection cleared");
            WAKE.signal(());
        }
    }
}
