//! Enumeration of candidate HID++ nodes
//!
//! Only lists what is plugged in right now; hot-plug is left to the caller.

use hidapi::{DeviceInfo, HidApi};
use tracing::{debug, info};

use crate::error::TransportError;
use crate::types::DiscoveredDevice;

/// Logitech USB vendor id
pub const LOGITECH_VID: u16 = 0x046d;

/// HID++ lives on the vendor-defined usage pages
fn is_vendor_interface(info: &DeviceInfo) -> bool {
    info.usage_page() >= 0xff00
}

/// List hidraw nodes of Logitech devices exposing a vendor interface.
///
/// Each node appears once even when it declares several top-level usages.
pub fn list_devices() -> Result<Vec<DiscoveredDevice>, TransportError> {
    let api = HidApi::new()?;
    let mut devices: Vec<DiscoveredDevice> = Vec::new();

    for device_info in api.device_list() {
        if device_info.vendor_id() != LOGITECH_VID || !is_vendor_interface(device_info) {
            continue;
        }

        let path = device_info.path().to_string_lossy().to_string();
        if devices.iter().any(|d| d.path == path) {
            continue;
        }

        debug!(
            "found candidate VID={:04X} PID={:04X} iface={} page={:04X} path={}",
            device_info.vendor_id(),
            device_info.product_id(),
            device_info.interface_number(),
            device_info.usage_page(),
            path
        );

        devices.push(DiscoveredDevice {
            path,
            vid: device_info.vendor_id(),
            pid: device_info.product_id(),
            product_name: device_info.product_string().map(|s| s.to_string()),
            serial: device_info.serial_number().map(|s| s.to_string()),
        });
    }

    info!("found {} candidate devices", devices.len());
    Ok(devices)
}
