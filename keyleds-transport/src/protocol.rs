//! HID++ 2.0 protocol constants and lookup tables

/// Target id addressing the device itself (as opposed to a receiver slot)
pub const TARGET_DEFAULT: u8 = 0xff;

/// Report header bytes after the report id: target, feature index, function/sequence
pub const HEADER_SIZE: usize = 3;

/// Feature byte marking a HID++ 2.0 error report
pub const ERROR_HIDPP2: u8 = 0xff;
/// Sub-id marking a HID++ 1.0 error report
pub const ERROR_HIDPP1: u8 = 0x8f;

/// Feature ids (stable across devices)
pub mod feature {
    pub const ROOT: u16 = 0x0000;
    pub const FEATURE: u16 = 0x0001;
    pub const VERSION: u16 = 0x0003;
    pub const NAME: u16 = 0x0005;
    pub const DFU: u16 = 0x00c1;
    pub const BATTERY: u16 = 0x1000;
    pub const GAMEMODE: u16 = 0x4522;
    pub const LAYOUT2: u16 = 0x4540;
    pub const GKEYS: u16 = 0x8010;
    pub const MKEYS: u16 = 0x8020;
    pub const MRKEYS: u16 = 0x8030;
    pub const REPORTRATE: u16 = 0x8060;
    pub const LED_EFFECTS: u16 = 0x8070;
    pub const LEDS: u16 = 0x8080;
}

/// Feature indices that are fixed by the protocol
pub mod index {
    pub const ROOT: u8 = 0;
    pub const FEATURE: u8 = 1;
}

/// Function numbers, grouped by feature
pub mod func {
    // Root (0x0000)
    pub const ROOT_GET_FEATURE: u8 = 0;
    pub const ROOT_PING: u8 = 1;

    // Feature set (0x0001)
    pub const FEATURE_GET_COUNT: u8 = 0;
    pub const FEATURE_GET_ID: u8 = 1;

    // Version (0x0003)
    pub const VERSION_GET_DEVICE_INFO: u8 = 0;
    pub const VERSION_GET_FIRMWARE_INFO: u8 = 1;

    // Name (0x0005)
    pub const NAME_GET_LENGTH: u8 = 0;
    pub const NAME_GET_NAME: u8 = 1;
    pub const NAME_GET_TYPE: u8 = 2;

    // Game mode (0x4522)
    pub const GAMEMODE_GET_MAX: u8 = 0;
    pub const GAMEMODE_BLOCK: u8 = 1;
    pub const GAMEMODE_UNBLOCK: u8 = 2;
    pub const GAMEMODE_CLEAR: u8 = 3;

    // Layout (0x4540)
    pub const LAYOUT_GET: u8 = 0;

    // G-keys (0x8010), M-keys (0x8020), MR-keys (0x8030)
    pub const GKEYS_GET_COUNT: u8 = 0;
    pub const GKEYS_ENABLE: u8 = 2;
    pub const MKEYS_SET: u8 = 1;
    pub const MRKEYS_SET: u8 = 0;

    // Report rate (0x8060)
    pub const REPORTRATE_GET_RATES: u8 = 0;
    pub const REPORTRATE_GET: u8 = 1;
    pub const REPORTRATE_SET: u8 = 2;

    // LEDs (0x8080)
    pub const LEDS_GET_KEYBLOCKS: u8 = 0;
    pub const LEDS_GET_BLOCK_INFO: u8 = 1;
    pub const LEDS_GET: u8 = 2;
    pub const LEDS_SET: u8 = 3;
    pub const LEDS_FILL: u8 = 4;
    pub const LEDS_COMMIT: u8 = 5;
}

/// Display name of a known feature id
pub fn feature_name(id: u16) -> Option<&'static str> {
    Some(match id {
        feature::ROOT => "root",
        feature::FEATURE => "feature",
        feature::VERSION => "version",
        feature::NAME => "name",
        feature::DFU => "dfu-control",
        feature::BATTERY => "battery",
        feature::GAMEMODE => "gamemode",
        feature::LAYOUT2 => "layout2",
        feature::GKEYS => "gkeys",
        feature::MKEYS => "mkeys",
        feature::MRKEYS => "mrkeys",
        feature::REPORTRATE => "reportrate",
        feature::LED_EFFECTS => "led-effects",
        feature::LEDS => "leds",
        _ => return None,
    })
}

/// Display name of a device-reported error code
pub fn error_name(code: u8) -> &'static str {
    match code {
        0x00 => "no error",
        0x01 => "unknown",
        0x02 => "invalid argument",
        0x03 => "out of range",
        0x04 => "hardware error",
        0x05 => "logitech internal",
        0x06 => "invalid feature index",
        0x07 => "invalid function",
        0x08 => "busy",
        0x09 => "unsupported",
        _ => "unrecognized",
    }
}

/// Display name of a firmware entry type (version feature)
pub fn firmware_type_name(kind: u8) -> &'static str {
    match kind {
        0 => "application",
        1 => "bootloader",
        2 => "hardware",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names() {
        assert_eq!(feature_name(feature::LEDS), Some("leds"));
        assert_eq!(feature_name(feature::GAMEMODE), Some("gamemode"));
        assert_eq!(feature_name(0x1234), None);
    }

    #[test]
    fn test_error_names() {
        assert_eq!(error_name(0x08), "busy");
        assert_eq!(error_name(0x09), "unsupported");
        assert_eq!(error_name(0x42), "unrecognized");
    }
}
