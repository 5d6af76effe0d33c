//! Key blocks, device types and colors

use keyleds_transport::BlockId;

/// RGB color value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    /// Create a new RGB color
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Black (all LEDs off)
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    /// White (all LEDs full)
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };
}

/// Kind of device reported by the name feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceType {
    Keyboard = 0,
    Remote = 1,
    Numpad = 2,
    Mouse = 3,
    Touchpad = 4,
    Trackball = 5,
    Presenter = 6,
    Receiver = 7,
}

impl DeviceType {
    /// Get type from numeric value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Keyboard),
            1 => Some(Self::Remote),
            2 => Some(Self::Numpad),
            3 => Some(Self::Mouse),
            4 => Some(Self::Touchpad),
            5 => Some(Self::Trackball),
            6 => Some(Self::Presenter),
            7 => Some(Self::Receiver),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Keyboard => "keyboard",
            Self::Remote => "remote",
            Self::Numpad => "numpad",
            Self::Mouse => "mouse",
            Self::Touchpad => "touchpad",
            Self::Trackball => "trackball",
            Self::Presenter => "presenter",
            Self::Receiver => "receiver",
        }
    }
}

/// A device-defined group of keys sharing one LED addressing scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBlock {
    id: BlockId,
    name: String,
    keys: Vec<u8>,
    max_values: RgbColor,
}

impl KeyBlock {
    pub fn new(id: BlockId, keys: Vec<u8>, max_values: RgbColor) -> Self {
        Self {
            id,
            name: id.to_string(),
            keys,
            max_values,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key ids (scancodes) in device order
    pub fn keys(&self) -> &[u8] {
        &self.keys
    }

    /// Maximum intensity of each channel
    pub fn max_values(&self) -> RgbColor {
        self.max_values
    }

    pub fn contains(&self, key: u8) -> bool {
        self.keys.contains(&key)
    }

    /// Append keys the device's own enumeration left out.
    ///
    /// Ids already present are skipped; existing order is preserved.
    pub fn patch_keys(&mut self, keys: &[u8]) -> usize {
        let mut added = 0;
        for &key in keys {
            if key != 0 && !self.keys.contains(&key) {
                self.keys.push(key);
                added += 1;
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_roundtrip() {
        for value in 0..8 {
            let kind = DeviceType::from_u8(value).unwrap();
            assert_eq!(kind as u8, value);
        }
        assert_eq!(DeviceType::from_u8(8), None);
        assert_eq!(DeviceType::Numpad.name(), "numpad");
    }

    #[test]
    fn test_patch_keys_is_append_only() {
        let mut block = KeyBlock::new(BlockId::KEYS, vec![4, 5, 6], RgbColor::WHITE);
        assert_eq!(block.patch_keys(&[6, 7, 0, 7, 8]), 2);
        assert_eq!(block.keys(), &[4, 5, 6, 7, 8]);
        assert_eq!(block.name(), "keys");
    }

    #[test]
    fn test_patch_empty_block() {
        let mut block = KeyBlock::new(BlockId::LOGO, Vec::new(), RgbColor::WHITE);
        assert_eq!(block.patch_keys(&[0xd2]), 1);
        assert!(block.contains(0xd2));
    }
}
