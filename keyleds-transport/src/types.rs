//! Common types for transport layer

/// One HID++-compatible report declared by the device's report descriptor.
///
/// `size` counts the bytes after the report id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportType {
    pub id: u8,
    pub size: usize,
}

/// Feature flags returned alongside a feature index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub reserved: bool,
    pub hidden: bool,
    pub obsolete: bool,
}

impl FeatureFlags {
    pub fn from_byte(flags: u8) -> Self {
        Self {
            reserved: flags & (1 << 5) != 0,
            hidden: flags & (1 << 6) != 0,
            obsolete: flags & (1 << 7) != 0,
        }
    }
}

/// One row of the device feature table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureEntry {
    pub index: u8,
    pub id: u16,
    pub flags: FeatureFlags,
}

/// Key block identifiers. Each block is one bit of the LED feature's block mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const KEYS: BlockId = BlockId(1 << 0);
    pub const MULTIMEDIA: BlockId = BlockId(1 << 1);
    pub const GKEYS: BlockId = BlockId(1 << 2);
    pub const LOGO: BlockId = BlockId(1 << 4);
    pub const MODES: BlockId = BlockId(1 << 6);

    /// Short name used in configuration and on the command line
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            BlockId::KEYS => "keys",
            BlockId::MULTIMEDIA => "media",
            BlockId::GKEYS => "gkeys",
            BlockId::LOGO => "logo",
            BlockId::MODES => "modes",
            _ => return None,
        })
    }

    pub fn from_name(name: &str) -> Option<BlockId> {
        [
            BlockId::KEYS,
            BlockId::MULTIMEDIA,
            BlockId::GKEYS,
            BlockId::LOGO,
            BlockId::MODES,
        ]
        .into_iter()
        .find(|b| b.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "block{:#06x}", self.0),
        }
    }
}

/// A hidraw node that looks like a HID++ device
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// Path of the hidraw node
    pub path: String,
    pub vid: u16,
    pub pid: u16,
    pub product_name: Option<String>,
    pub serial: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_flags() {
        let flags = FeatureFlags::from_byte(0b1010_0000);
        assert!(flags.reserved);
        assert!(!flags.hidden);
        assert!(flags.obsolete);
    }

    #[test]
    fn test_block_names() {
        assert_eq!(BlockId::from_name("media"), Some(BlockId::MULTIMEDIA));
        assert_eq!(BlockId::from_name("LOGO"), Some(BlockId::LOGO));
        assert_eq!(BlockId::from_name("nope"), None);
        assert_eq!(BlockId(0x0100).to_string(), "block0x0100");
    }
}
