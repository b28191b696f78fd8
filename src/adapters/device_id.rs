//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable device ID in the form `pg-xxyyzz` (last 3 bytes of
//! the 6-byte MAC in lowercase hex).  Used as the telemetry `device_id`
//! and in the publish topic unless the config overrides it.

use core::fmt::Write;

/// Fixed-size device ID string.
pub type DeviceIdString = heapless::String<32>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    let _ = write!(id, "pg-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}

/// The configured id if set, otherwise the MAC-derived one.
pub fn resolve(configured: &str, mac: &MacAddress) -> DeviceIdString {
    if configured.is_empty() {
        device_id(mac)
    } else {
        let mut id = DeviceIdString::new();
        let _ = id.push_str(configured);
        id
    }
}
