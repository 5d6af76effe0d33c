//! Typed HID++ requests and responses
//!
//! Every device function the crate uses has a small request struct that knows
//! its feature id, function number and payload encoding, and a response type
//! that validates the payload length before decoding. Fixed layouts are
//! decoded through zerocopy structs; variable ones by hand.

use zerocopy::byteorder::big_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::protocol::{feature, func};
use crate::types::{BlockId, FeatureFlags};

// =============================================================================
// Traits
// =============================================================================

/// A request that can be sent with [`crate::Hidpp::execute`]
pub trait HidppCommand {
    /// Feature id the function belongs to
    const FEATURE: u16;
    /// Function number within the feature (0..=15)
    const FUNCTION: u8;

    /// Request payload (after the 3-byte header)
    fn to_payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// A response that can be decoded from a reply payload
pub trait HidppResponse: Sized {
    /// Minimum payload length required
    const MIN_LEN: usize;

    /// Decode from a payload already checked against `MIN_LEN`
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError>;

    /// Decode with length validation
    fn parse(payload: &[u8]) -> Result<Self, ParseError> {
        if payload.len() < Self::MIN_LEN {
            return Err(ParseError::TooShort {
                expected: Self::MIN_LEN,
                got: payload.len(),
            });
        }
        Self::from_payload(payload)
    }
}

/// Parse error for responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    TooShort { expected: usize, got: usize },
    InvalidValue { field: &'static str, value: u16 },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort { expected, got } => {
                write!(f, "payload too short: expected {expected} bytes, got {got}")
            }
            Self::InvalidValue { field, value } => {
                write!(f, "invalid value for {field}: {value:#x}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

// =============================================================================
// Generic responses
// =============================================================================

/// Reply whose only meaningful content is its first byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteResponse(pub u8);

impl HidppResponse for ByteResponse {
    const MIN_LEN: usize = 1;
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        Ok(Self(payload[0]))
    }
}

/// Reply carrying a big-endian 16-bit value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordResponse(pub u16);

impl HidppResponse for WordResponse {
    const MIN_LEN: usize = 2;
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        Ok(Self(u16::from_be_bytes([payload[0], payload[1]])))
    }
}

// =============================================================================
// Root and feature set (0x0000, 0x0001)
// =============================================================================

/// Look up the index of a feature id
#[derive(Debug, Clone, Copy)]
pub struct GetFeatureIndex {
    pub id: u16,
}

impl HidppCommand for GetFeatureIndex {
    const FEATURE: u16 = feature::ROOT;
    const FUNCTION: u8 = func::ROOT_GET_FEATURE;
    fn to_payload(&self) -> Vec<u8> {
        self.id.to_be_bytes().to_vec()
    }
}

/// Index 0 means the device does not implement the feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureIndexResponse {
    pub index: u8,
    pub flags: FeatureFlags,
}

impl HidppResponse for FeatureIndexResponse {
    const MIN_LEN: usize = 2;
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            index: payload[0],
            flags: FeatureFlags::from_byte(payload[1]),
        })
    }
}

/// Ping carrying an echo byte
#[derive(Debug, Clone, Copy)]
pub struct Ping {
    pub echo: u8,
}

impl HidppCommand for Ping {
    const FEATURE: u16 = feature::ROOT;
    const FUNCTION: u8 = func::ROOT_PING;
    fn to_payload(&self) -> Vec<u8> {
        vec![0, 0, self.echo]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingResponse {
    pub protocol: u8,
    pub handler: u8,
    pub echo: u8,
}

impl HidppResponse for PingResponse {
    const MIN_LEN: usize = 3;
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            protocol: payload[0],
            handler: payload[1],
            echo: payload[2],
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetFeatureCount;

impl HidppCommand for GetFeatureCount {
    const FEATURE: u16 = feature::FEATURE;
    const FUNCTION: u8 = func::FEATURE_GET_COUNT;
}

/// Feature id stored at a table slot
#[derive(Debug, Clone, Copy)]
pub struct GetFeatureId {
    pub index: u8,
}

impl HidppCommand for GetFeatureId {
    const FEATURE: u16 = feature::FEATURE;
    const FUNCTION: u8 = func::FEATURE_GET_ID;
    fn to_payload(&self) -> Vec<u8> {
        vec![self.index]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureIdResponse {
    pub id: u16,
    pub flags: FeatureFlags,
}

impl HidppResponse for FeatureIdResponse {
    const MIN_LEN: usize = 3;
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            id: u16::from_be_bytes([payload[0], payload[1]]),
            flags: FeatureFlags::from_byte(payload[2]),
        })
    }
}

// =============================================================================
// Identity (0x0003, 0x0005, 0x4540)
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct GetDeviceInfo;

impl HidppCommand for GetDeviceInfo {
    const FEATURE: u16 = feature::VERSION;
    const FUNCTION: u8 = func::VERSION_GET_DEVICE_INFO;
}

/// Device info block of the version feature
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct DeviceInfo {
    pub firmware_count: u8,
    pub serial: [u8; 4],
    pub transport: U16,
    pub model: [u8; 6],
}

impl HidppResponse for DeviceInfo {
    const MIN_LEN: usize = std::mem::size_of::<DeviceInfo>();
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        DeviceInfo::read_from_prefix(payload)
            .map(|(info, _)| info)
            .map_err(|_| ParseError::TooShort {
                expected: Self::MIN_LEN,
                got: payload.len(),
            })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetFirmwareInfo {
    pub index: u8,
}

impl HidppCommand for GetFirmwareInfo {
    const FEATURE: u16 = feature::VERSION;
    const FUNCTION: u8 = func::VERSION_GET_FIRMWARE_INFO;
    fn to_payload(&self) -> Vec<u8> {
        vec![self.index]
    }
}

/// One firmware entry of the version feature. Versions are BCD encoded.
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct FirmwareInfo {
    pub kind: u8,
    pub prefix: [u8; 3],
    major_bcd: u8,
    minor_bcd: u8,
    pub build: U16,
    flags: u8,
    pub product_id: U16,
    pub misc: [u8; 5],
}

fn from_bcd(value: u8) -> u16 {
    10 * u16::from(value >> 4) + u16::from(value & 0x0f)
}

impl FirmwareInfo {
    /// Major version; firmware numbering starts at 100
    pub fn major(&self) -> u16 {
        100 + from_bcd(self.major_bcd)
    }

    pub fn minor(&self) -> u16 {
        from_bcd(self.minor_bcd)
    }

    pub fn is_active(&self) -> bool {
        self.flags & 1 != 0
    }

    pub fn prefix_str(&self) -> String {
        self.prefix
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    /// Human readable version, e.g. `U1v118.2.15`
    pub fn version_string(&self) -> String {
        format!(
            "{}v{}.{}.{:x}",
            self.prefix_str(),
            self.major(),
            self.minor(),
            self.build.get()
        )
    }
}

impl HidppResponse for FirmwareInfo {
    const MIN_LEN: usize = std::mem::size_of::<FirmwareInfo>();
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        FirmwareInfo::read_from_prefix(payload)
            .map(|(info, _)| info)
            .map_err(|_| ParseError::TooShort {
                expected: Self::MIN_LEN,
                got: payload.len(),
            })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetNameLength;

impl HidppCommand for GetNameLength {
    const FEATURE: u16 = feature::NAME;
    const FUNCTION: u8 = func::NAME_GET_LENGTH;
}

/// Chunk of the device name starting at `offset`
#[derive(Debug, Clone, Copy)]
pub struct GetName {
    pub offset: u8,
}

impl HidppCommand for GetName {
    const FEATURE: u16 = feature::NAME;
    const FUNCTION: u8 = func::NAME_GET_NAME;
    fn to_payload(&self) -> Vec<u8> {
        vec![self.offset]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetDeviceType;

impl HidppCommand for GetDeviceType {
    const FEATURE: u16 = feature::NAME;
    const FUNCTION: u8 = func::NAME_GET_TYPE;
}

#[derive(Debug, Clone, Copy)]
pub struct GetLayout;

impl HidppCommand for GetLayout {
    const FEATURE: u16 = feature::LAYOUT2;
    const FUNCTION: u8 = func::LAYOUT_GET;
}

// =============================================================================
// LEDs (0x8080)
// =============================================================================

/// One key's LED state as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct KeyColor {
    pub id: u8,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl KeyColor {
    pub fn new(id: u8, red: u8, green: u8, blue: u8) -> Self {
        Self {
            id,
            red,
            green,
            blue,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetKeyBlocks;

impl HidppCommand for GetKeyBlocks {
    const FEATURE: u16 = feature::LEDS;
    const FUNCTION: u8 = func::LEDS_GET_KEYBLOCKS;
}

#[derive(Debug, Clone, Copy)]
pub struct GetBlockInfo {
    pub block: BlockId,
}

impl HidppCommand for GetBlockInfo {
    const FEATURE: u16 = feature::LEDS;
    const FUNCTION: u8 = func::LEDS_GET_BLOCK_INFO;
    fn to_payload(&self) -> Vec<u8> {
        self.block.0.to_be_bytes().to_vec()
    }
}

/// Key count and maximum intensity of a block
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct BlockInfo {
    pub nb_keys: U16,
    pub max_red: u8,
    pub max_green: u8,
    pub max_blue: u8,
}

impl HidppResponse for BlockInfo {
    const MIN_LEN: usize = std::mem::size_of::<BlockInfo>();
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        BlockInfo::read_from_prefix(payload)
            .map(|(info, _)| info)
            .map_err(|_| ParseError::TooShort {
                expected: Self::MIN_LEN,
                got: payload.len(),
            })
    }
}

/// Read key states of a block starting at key `offset`
#[derive(Debug, Clone, Copy)]
pub struct GetLeds {
    pub block: BlockId,
    pub offset: u16,
}

impl HidppCommand for GetLeds {
    const FEATURE: u16 = feature::LEDS;
    const FUNCTION: u8 = func::LEDS_GET;
    fn to_payload(&self) -> Vec<u8> {
        let mut payload = self.block.0.to_be_bytes().to_vec();
        payload.extend_from_slice(&self.offset.to_be_bytes());
        payload
    }
}

/// Reply to [`GetLeds`]: the echoed offset and as many keys as fit the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedChunk {
    pub offset: u16,
    pub keys: Vec<KeyColor>,
}

impl HidppResponse for LedChunk {
    const MIN_LEN: usize = 4;
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        let keys = payload[4..]
            .chunks_exact(4)
            .filter_map(|chunk| KeyColor::read_from_bytes(chunk).ok())
            .collect();
        Ok(Self {
            offset: u16::from_be_bytes([payload[2], payload[3]]),
            keys,
        })
    }
}

/// Write key states of a block. Callers split lists to fit one report.
#[derive(Debug, Clone)]
pub struct SetLeds<'a> {
    pub block: BlockId,
    pub keys: &'a [KeyColor],
}

impl HidppCommand for SetLeds<'_> {
    const FEATURE: u16 = feature::LEDS;
    const FUNCTION: u8 = func::LEDS_SET;
    fn to_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(4 + self.keys.len() * 4);
        payload.extend_from_slice(&self.block.0.to_be_bytes());
        payload.extend_from_slice(&(self.keys.len() as u16).to_be_bytes());
        payload.extend_from_slice(self.keys.as_bytes());
        payload
    }
}

/// Set every key of a block to one color
#[derive(Debug, Clone, Copy)]
pub struct FillLeds {
    pub block: BlockId,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl HidppCommand for FillLeds {
    const FEATURE: u16 = feature::LEDS;
    const FUNCTION: u8 = func::LEDS_FILL;
    fn to_payload(&self) -> Vec<u8> {
        let [hi, lo] = self.block.0.to_be_bytes();
        vec![hi, lo, self.red, self.green, self.blue]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommitLeds;

impl HidppCommand for CommitLeds {
    const FEATURE: u16 = feature::LEDS;
    const FUNCTION: u8 = func::LEDS_COMMIT;
}

// =============================================================================
// Game mode (0x4522)
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct GetGamemodeMax;

impl HidppCommand for GetGamemodeMax {
    const FEATURE: u16 = feature::GAMEMODE;
    const FUNCTION: u8 = func::GAMEMODE_GET_MAX;
}

/// Disable up to 16 keys (by scancode) while game mode is on
#[derive(Debug, Clone)]
pub struct GamemodeBlock<'a>(pub &'a [u8]);

impl HidppCommand for GamemodeBlock<'_> {
    const FEATURE: u16 = feature::GAMEMODE;
    const FUNCTION: u8 = func::GAMEMODE_BLOCK;
    fn to_payload(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

#[derive(Debug, Clone)]
pub struct GamemodeUnblock<'a>(pub &'a [u8]);

impl HidppCommand for GamemodeUnblock<'_> {
    const FEATURE: u16 = feature::GAMEMODE;
    const FUNCTION: u8 = func::GAMEMODE_UNBLOCK;
    fn to_payload(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GamemodeClear;

impl HidppCommand for GamemodeClear {
    const FEATURE: u16 = feature::GAMEMODE;
    const FUNCTION: u8 = func::GAMEMODE_CLEAR;
}

// =============================================================================
// Report rate (0x8060)
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct GetReportRates;

impl HidppCommand for GetReportRates {
    const FEATURE: u16 = feature::REPORTRATE;
    const FUNCTION: u8 = func::REPORTRATE_GET_RATES;
}

/// Supported report intervals in milliseconds; bit i of the mask means i+1 ms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRates(pub Vec<u8>);

impl HidppResponse for ReportRates {
    const MIN_LEN: usize = 1;
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        let mask = payload[0];
        Ok(Self(
            (0..8u8).filter(|i| mask & (1 << i) != 0).map(|i| i + 1).collect(),
        ))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetReportRate;

impl HidppCommand for GetReportRate {
    const FEATURE: u16 = feature::REPORTRATE;
    const FUNCTION: u8 = func::REPORTRATE_GET;
}

#[derive(Debug, Clone, Copy)]
pub struct SetReportRate {
    pub millis: u8,
}

impl HidppCommand for SetReportRate {
    const FEATURE: u16 = feature::REPORTRATE;
    const FUNCTION: u8 = func::REPORTRATE_SET;
    fn to_payload(&self) -> Vec<u8> {
        vec![self.millis]
    }
}

// =============================================================================
// G-keys (0x8010, 0x8020, 0x8030)
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct GetGkeysCount;

impl HidppCommand for GetGkeysCount {
    const FEATURE: u16 = feature::GKEYS;
    const FUNCTION: u8 = func::GKEYS_GET_COUNT;
}

/// Route G-keys to software (true) or to their firmware default (false)
#[derive(Debug, Clone, Copy)]
pub struct EnableGkeys {
    pub enabled: bool,
}

impl HidppCommand for EnableGkeys {
    const FEATURE: u16 = feature::GKEYS;
    const FUNCTION: u8 = func::GKEYS_ENABLE;
    fn to_payload(&self) -> Vec<u8> {
        vec![u8::from(self.enabled)]
    }
}

/// Light M1..M3 according to a bit mask
#[derive(Debug, Clone, Copy)]
pub struct SetMkeys {
    pub mask: u8,
}

impl HidppCommand for SetMkeys {
    const FEATURE: u16 = feature::MKEYS;
    const FUNCTION: u8 = func::MKEYS_SET;
    fn to_payload(&self) -> Vec<u8> {
        vec![self.mask]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SetMrkeys {
    pub mask: u8,
}

impl HidppCommand for SetMrkeys {
    const FEATURE: u16 = feature::MRKEYS;
    const FUNCTION: u8 = func::MRKEYS_SET;
    fn to_payload(&self) -> Vec<u8> {
        vec![self.mask]
    }
}
