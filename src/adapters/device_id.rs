//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable device ID in the form `fsu-eye-xxyyzz` (last 3 bytes
//! of the 6-byte MAC in lowercase hex). It is deterministic across reboots
//! and doubles as the MQTT thing name the cloud addresses commands to.

/// Fixed-size device ID string.
pub type DeviceIdString = heapless::String<32>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly 6 bytes as the API requires.
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

/// Derive the device ID from the last 3 MAC bytes.
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    use core::fmt::Write;
    let _ = write!(id, "fsu-eye-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}
