//! High-level interface for Logitech HID++ RGB keyboards
//!
//! [`Keyboard`] wraps a protocol engine connection and reads the device
//! identity and key blocks once at open. Everything after that is a thin typed
//! call: per-key LED reads and writes, game mode, report rate and G-keys.
//!
//! Errors are passed through unchanged; deciding whether to resync or give up
//! is left to the caller (see [`KeyboardError::is_recoverable`]).

pub mod error;
pub mod led;

pub use error::KeyboardError;
pub use led::{DeviceType, KeyBlock, RgbColor};

pub use keyleds_transport::{BlockId, FeatureEntry, KeyColor};

use std::time::Duration;

use tracing::{debug, info};

use keyleds_transport::command::{
    BlockInfo, ByteResponse, CommitLeds, DeviceInfo, EnableGkeys, FillLeds, FirmwareInfo,
    GamemodeBlock, GamemodeClear, GamemodeUnblock, GetBlockInfo, GetDeviceInfo, GetDeviceType,
    GetFirmwareInfo, GetGamemodeMax, GetGkeysCount, GetKeyBlocks, GetLayout, GetLeds, GetName,
    GetNameLength, GetReportRate, GetReportRates, LedChunk, ReportRates, SetLeds, SetMkeys,
    SetMrkeys, SetReportRate, WordResponse,
};
use keyleds_transport::protocol::{feature, HEADER_SIZE};
use keyleds_transport::{Hidpp, HidrawTransport, Transport, TransportError, TARGET_DEFAULT};

/// Scancodes per game mode block/unblock request
pub const GAMEMODE_BATCH: usize = 16;

/// Block id and key count prefix of a SET_LEDS request
const SET_LEDS_PREFIX: usize = 4;

/// What the render loop needs from a device
pub trait LedDevice: Send {
    /// Device node, for logs
    fn path(&self) -> &str;

    /// Key blocks in device order
    fn blocks(&self) -> &[KeyBlock];

    /// Current color of every key of a block, in block key order
    fn get_colors(&mut self, block: BlockId) -> Result<Vec<KeyColor>, KeyboardError>;

    /// Queue new colors for some keys of a block
    fn set_colors(&mut self, block: BlockId, colors: &[KeyColor]) -> Result<(), KeyboardError>;

    /// Make every queued color visible
    fn commit_colors(&mut self) -> Result<(), KeyboardError>;

    /// Drop unread input
    fn flush(&mut self) -> Result<(), KeyboardError>;

    /// Flush and ping; whether the device answered
    fn resync(&mut self) -> bool;
}

/// Keyboard connected through any transport
pub struct Keyboard<T: Transport = HidrawTransport> {
    hidpp: Hidpp<T>,
    target: u8,
    device_type: DeviceType,
    name: String,
    model: String,
    serial: String,
    firmware: String,
    layout: Option<u8>,
    blocks: Vec<KeyBlock>,
}

impl Keyboard<HidrawTransport> {
    /// Open a hidraw node and read the device identity
    pub fn open(path: &str) -> Result<Self, KeyboardError> {
        let transport = HidrawTransport::open(path)?;
        Self::from_transport(transport)
    }
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn invalid(msg: impl Into<String>) -> KeyboardError {
    KeyboardError::Transport(TransportError::InvalidResponse(msg.into()))
}

impl<T: Transport> Keyboard<T> {
    /// Create a keyboard on an already opened transport
    ///
    /// Runs the protocol handshake, then reads type, name, version, layout
    /// and key blocks, in that order.
    pub fn from_transport(transport: T) -> Result<Self, KeyboardError> {
        let hidpp = Hidpp::open(transport)?;
        let mut keyboard = Self {
            hidpp,
            target: TARGET_DEFAULT,
            device_type: DeviceType::Keyboard,
            name: String::new(),
            model: String::new(),
            serial: String::new(),
            firmware: String::new(),
            layout: None,
            blocks: Vec::new(),
        };

        keyboard.device_type = keyboard.read_type()?;
        keyboard.name = keyboard.read_name()?;
        keyboard.read_version()?;
        keyboard.layout = keyboard.read_layout();
        keyboard.blocks = keyboard.read_blocks()?;

        info!(
            "{} is a {} '{}' model {} firmware {}",
            keyboard.path(),
            keyboard.device_type.name(),
            keyboard.name,
            keyboard.model,
            keyboard.firmware
        );
        Ok(keyboard)
    }

    // === Device Info ===

    pub fn path(&self) -> &str {
        self.hidpp.path()
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Model number as lowercase hex
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Serial number as lowercase hex
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Version string of the active firmware, empty if none is flagged active
    pub fn firmware(&self) -> &str {
        &self.firmware
    }

    /// Physical layout code, if the device reports one
    pub fn layout(&self) -> Option<u8> {
        self.layout
    }

    pub fn protocol_version(&self) -> u8 {
        self.hidpp.protocol_version()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.hidpp.set_timeout(timeout);
    }

    /// Underlying protocol connection, for raw calls
    pub fn hidpp(&mut self) -> &mut Hidpp<T> {
        &mut self.hidpp
    }

    /// Device feature table, root included
    pub fn features(&mut self) -> Result<Vec<FeatureEntry>, KeyboardError> {
        Ok(self.hidpp.features(self.target)?)
    }

    pub fn has_feature(&mut self, feature_id: u16) -> Result<bool, KeyboardError> {
        Ok(self.hidpp.has_feature(self.target, feature_id)?)
    }

    fn read_type(&mut self) -> Result<DeviceType, KeyboardError> {
        let kind: ByteResponse = self.hidpp.query(self.target, &GetDeviceType)?;
        DeviceType::from_u8(kind.0).ok_or_else(|| invalid(format!("device type {}", kind.0)))
    }

    fn read_name(&mut self) -> Result<String, KeyboardError> {
        let length: ByteResponse = self.hidpp.query(self.target, &GetNameLength)?;
        let length = usize::from(length.0);

        let mut name = Vec::with_capacity(length);
        while name.len() < length {
            let chunk = self.hidpp.execute(
                self.target,
                &GetName {
                    offset: name.len() as u8,
                },
            )?;
            if chunk.is_empty() {
                return Err(invalid("empty name chunk"));
            }
            let take = chunk.len().min(length - name.len());
            name.extend_from_slice(&chunk[..take]);
        }
        Ok(String::from_utf8_lossy(&name)
            .trim_end_matches('\0')
            .to_string())
    }

    fn read_version(&mut self) -> Result<(), KeyboardError> {
        let info: DeviceInfo = self.hidpp.query(self.target, &GetDeviceInfo)?;
        self.model = hex_string(&info.model);
        self.serial = hex_string(&info.serial);

        for index in 0..info.firmware_count {
            let firmware: FirmwareInfo =
                self.hidpp.query(self.target, &GetFirmwareInfo { index })?;
            debug!(
                "firmware {index}: {} {}{}",
                keyleds_transport::protocol::firmware_type_name(firmware.kind),
                firmware.version_string(),
                if firmware.is_active() { " (active)" } else { "" }
            );
            if firmware.is_active() {
                self.firmware = firmware.version_string();
                break;
            }
        }
        Ok(())
    }

    fn read_layout(&mut self) -> Option<u8> {
        match self.hidpp.query::<_, ByteResponse>(self.target, &GetLayout) {
            Ok(layout) => Some(layout.0),
            Err(e) => {
                debug!("no layout: {e}");
                None
            }
        }
    }

    fn read_blocks(&mut self) -> Result<Vec<KeyBlock>, KeyboardError> {
        let mask = match self.hidpp.query::<_, WordResponse>(self.target, &GetKeyBlocks) {
            Ok(mask) => mask.0,
            Err(TransportError::FeatureNotFound(_)) => {
                debug!("{} has no per-key lighting", self.path());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut blocks = Vec::new();
        for bit in 0..16 {
            if mask & (1 << bit) == 0 {
                continue;
            }
            let id = BlockId(1 << bit);
            let info: BlockInfo = match self.hidpp.query(self.target, &GetBlockInfo { block: id }) {
                Ok(info) => info,
                Err(e) => {
                    debug!("skipping block {id}: {e}");
                    continue;
                }
            };

            // Blocks without keys are kept so a layout can patch them later
            let nb_keys = usize::from(info.nb_keys.get());
            let keys = if nb_keys > 0 {
                self.read_leds(id, nb_keys)?
                    .into_iter()
                    .map(|k| k.id)
                    .filter(|&id| id != 0)
                    .collect()
            } else {
                Vec::new()
            };

            debug!("block {id}: {} keys", keys.len());
            blocks.push(KeyBlock::new(
                id,
                keys,
                RgbColor::new(info.max_red, info.max_green, info.max_blue),
            ));
        }
        Ok(blocks)
    }

    // === Key blocks ===

    pub fn blocks(&self) -> &[KeyBlock] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&KeyBlock> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    fn known_block(&self, id: BlockId) -> Result<&KeyBlock, KeyboardError> {
        self.block(id).ok_or(KeyboardError::UnknownBlock(id))
    }

    /// Add keys missing from a block's device enumeration
    ///
    /// Returns the number of keys actually added.
    pub fn patch_missing_keys(&mut self, id: BlockId, keys: &[u8]) -> Result<usize, KeyboardError> {
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.id() == id)
            .ok_or(KeyboardError::UnknownBlock(id))?;
        let added = block.patch_keys(keys);
        if added > 0 {
            info!("patched {added} keys into block {id}");
        }
        Ok(added)
    }

    // === LEDs ===

    /// Read `count` key states of a block, starting at the first key.
    fn read_leds(&mut self, block: BlockId, count: usize) -> Result<Vec<KeyColor>, KeyboardError> {
        let mut keys = Vec::with_capacity(count);
        while keys.len() < count {
            let offset = keys.len() as u16;
            let chunk: LedChunk = self
                .hidpp
                .query(self.target, &GetLeds { block, offset })?;
            if chunk.offset != offset {
                return Err(invalid(format!(
                    "led offset {} instead of {offset}",
                    chunk.offset
                )));
            }
            if chunk.keys.is_empty() {
                return Err(invalid("empty led chunk"));
            }
            let take = chunk.keys.len().min(count - keys.len());
            keys.extend_from_slice(&chunk.keys[..take]);
        }
        Ok(keys)
    }

    /// Current state of every key of a block
    pub fn get_colors(&mut self, block: BlockId) -> Result<Vec<KeyColor>, KeyboardError> {
        let count = self.known_block(block)?.keys().len();
        if count == 0 {
            return Ok(Vec::new());
        }
        self.read_leds(block, count)
    }

    /// Keys per SET_LEDS request
    fn set_leds_batch(&self) -> usize {
        self.hidpp
            .max_report_size()
            .saturating_sub(HEADER_SIZE + SET_LEDS_PREFIX)
            / std::mem::size_of::<KeyColor>()
    }

    /// Queue new colors, split over as many requests as needed.
    ///
    /// Nothing changes on the device until [`Keyboard::commit_colors`].
    pub fn set_colors(&mut self, block: BlockId, colors: &[KeyColor]) -> Result<(), KeyboardError> {
        self.known_block(block)?;
        let batch = self.set_leds_batch();
        if batch == 0 {
            return Err(KeyboardError::NotSupported(
                "reports too small for LED updates".into(),
            ));
        }
        for keys in colors.chunks(batch) {
            self.hidpp.execute(self.target, &SetLeds { block, keys })?;
        }
        Ok(())
    }

    /// Set every key of a block to one color
    pub fn fill_color(&mut self, block: BlockId, color: RgbColor) -> Result<(), KeyboardError> {
        self.known_block(block)?;
        self.hidpp.execute(
            self.target,
            &FillLeds {
                block,
                red: color.r,
                green: color.g,
                blue: color.b,
            },
        )?;
        Ok(())
    }

    pub fn commit_colors(&mut self) -> Result<(), KeyboardError> {
        self.hidpp.execute(self.target, &CommitLeds)?;
        Ok(())
    }

    // === Game mode ===

    /// How many keys game mode can disable at once
    pub fn gamemode_max(&mut self) -> Result<u8, KeyboardError> {
        let max: ByteResponse = self.hidpp.query(self.target, &GetGamemodeMax)?;
        Ok(max.0)
    }

    /// Disable keys (by scancode) while game mode is on
    pub fn gamemode_block(&mut self, keys: &[u8]) -> Result<(), KeyboardError> {
        for batch in keys.chunks(GAMEMODE_BATCH) {
            self.hidpp.execute(self.target, &GamemodeBlock(batch))?;
        }
        Ok(())
    }

    pub fn gamemode_unblock(&mut self, keys: &[u8]) -> Result<(), KeyboardError> {
        for batch in keys.chunks(GAMEMODE_BATCH) {
            self.hidpp.execute(self.target, &GamemodeUnblock(batch))?;
        }
        Ok(())
    }

    pub fn gamemode_clear(&mut self) -> Result<(), KeyboardError> {
        self.hidpp.execute(self.target, &GamemodeClear)?;
        Ok(())
    }

    // === Report rate ===

    /// Supported report intervals in milliseconds, ascending
    pub fn report_rates(&mut self) -> Result<Vec<u8>, KeyboardError> {
        let rates: ReportRates = self.hidpp.query(self.target, &GetReportRates)?;
        Ok(rates.0)
    }

    /// Current report interval in milliseconds
    pub fn report_rate(&mut self) -> Result<u8, KeyboardError> {
        let rate: ByteResponse = self.hidpp.query(self.target, &GetReportRate)?;
        Ok(rate.0)
    }

    /// Set the report interval
    ///
    /// # Arguments
    /// * `millis` - Interval in milliseconds, one of [`Keyboard::report_rates`]
    pub fn set_report_rate(&mut self, millis: u8) -> Result<(), KeyboardError> {
        if millis == 0 || millis > 8 {
            return Err(KeyboardError::InvalidParameter(format!(
                "report rate {millis}ms (expected 1-8)"
            )));
        }
        self.hidpp.execute(self.target, &SetReportRate { millis })?;
        Ok(())
    }

    // === G-keys ===

    pub fn gkeys_count(&mut self) -> Result<u8, KeyboardError> {
        let count: ByteResponse = self.hidpp.query(self.target, &GetGkeysCount)?;
        Ok(count.0)
    }

    /// Route G-keys to software (`true`) or back to the firmware
    pub fn gkeys_enable(&mut self, enabled: bool) -> Result<(), KeyboardError> {
        self.hidpp.execute(self.target, &EnableGkeys { enabled })?;
        Ok(())
    }

    /// Light M-keys from a bit mask (bit 0 = M1)
    pub fn set_mkeys(&mut self, mask: u8) -> Result<(), KeyboardError> {
        self.hidpp.execute(self.target, &SetMkeys { mask })?;
        Ok(())
    }

    pub fn set_mrkeys(&mut self, mask: u8) -> Result<(), KeyboardError> {
        self.hidpp.execute(self.target, &SetMrkeys { mask })?;
        Ok(())
    }

    pub fn has_gkeys(&mut self) -> Result<bool, KeyboardError> {
        self.has_feature(feature::GKEYS)
    }

    // === Recovery ===

    pub fn flush(&mut self) -> Result<(), KeyboardError> {
        Ok(self.hidpp.flush()?)
    }

    /// Flush then ping. A failed resync is a normal outcome, not an error.
    pub fn resync(&mut self) -> bool {
        self.hidpp.resync(self.target)
    }
}

impl<T: Transport> LedDevice for Keyboard<T> {
    fn path(&self) -> &str {
        Keyboard::path(self)
    }

    fn blocks(&self) -> &[KeyBlock] {
        Keyboard::blocks(self)
    }

    fn get_colors(&mut self, block: BlockId) -> Result<Vec<KeyColor>, KeyboardError> {
        Keyboard::get_colors(self, block)
    }

    fn set_colors(&mut self, block: BlockId, colors: &[KeyColor]) -> Result<(), KeyboardError> {
        Keyboard::set_colors(self, block, colors)
    }

    fn commit_colors(&mut self) -> Result<(), KeyboardError> {
        Keyboard::commit_colors(self)
    }

    fn flush(&mut self) -> Result<(), KeyboardError> {
        Keyboard::flush(self)
    }

    fn resync(&mut self) -> bool {
        Keyboard::resync(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyleds_transport::mock::{MockDevice, MockReply};
    use keyleds_transport::protocol::func;

    const NAME: &str = "Logitech G410 Atlas Spectrum";
    const NAME_INDEX: u8 = 2;
    const VERSION_INDEX: u8 = 3;
    const LEDS_INDEX: u8 = 4;
    const GAMEMODE_INDEX: u8 = 5;

    /// Key ids of the keys block; 0 marks a hole in the matrix
    const KEYS: [u8; 5] = [0x04, 0x05, 0x00, 0x06, 0x07];

    fn led_entries(ids: &[u8], offset: usize) -> Vec<u8> {
        let mut data = Vec::new();
        for &id in ids.iter().skip(offset).take(3) {
            data.extend_from_slice(&[id, 0xff, 0x00, 0x00]);
        }
        data
    }

    fn scripted_device() -> MockDevice {
        let mock = MockDevice::new();
        mock.add_feature(feature::NAME, NAME_INDEX, |function, payload| match function {
            func::NAME_GET_LENGTH => MockReply::Data(vec![NAME.len() as u8]),
            func::NAME_GET_NAME => {
                MockReply::Data(NAME.as_bytes()[usize::from(payload[0])..].to_vec())
            }
            func::NAME_GET_TYPE => MockReply::Data(vec![0]),
            _ => MockReply::Error(0x07),
        });
        mock.add_feature(feature::VERSION, VERSION_INDEX, |function, payload| {
            match function {
                func::VERSION_GET_DEVICE_INFO => MockReply::Data(vec![
                    2, 0x12, 0x34, 0xab, 0xcd, 0x00, 0x0e, 0xc3, 0x3e, 0x0f, 0x00, 0x00, 0x00,
                ]),
                func::VERSION_GET_FIRMWARE_INFO if payload[0] == 0 => MockReply::Data(vec![
                    1, b'B', b'O', b'T', 0x01, 0x02, 0x00, 0x10, 0x00, 0xc3, 0x3e, 0, 0, 0, 0, 0,
                ]),
                func::VERSION_GET_FIRMWARE_INFO => MockReply::Data(vec![
                    0, b'U', b'1', b' ', 0x18, 0x02, 0x00, 0x2f, 0x01, 0xc3, 0x3e, 0, 0, 0, 0, 0,
                ]),
                _ => MockReply::Error(0x07),
            }
        });
        mock.add_feature(feature::LEDS, LEDS_INDEX, |function, payload| match function {
            func::LEDS_GET_KEYBLOCKS => MockReply::Data(vec![0x00, 0x13]),
            func::LEDS_GET_BLOCK_INFO => match payload[1] {
                0x01 => MockReply::Data(vec![0x00, KEYS.len() as u8, 0xff, 0xff, 0xff]),
                0x02 => MockReply::Error(0x02),
                _ => MockReply::Data(vec![0x00, 0x00, 0xff, 0xff, 0xff]),
            },
            func::LEDS_GET => {
                let offset = usize::from(u16::from_be_bytes([payload[2], payload[3]]));
                let mut data = payload[..4].to_vec();
                data.extend(led_entries(&KEYS, offset));
                MockReply::Data(data)
            }
            func::LEDS_SET | func::LEDS_FILL | func::LEDS_COMMIT => MockReply::Data(Vec::new()),
            _ => MockReply::Error(0x07),
        });
        mock.add_feature(feature::GAMEMODE, GAMEMODE_INDEX, |function, _| {
            match function {
                func::GAMEMODE_GET_MAX => MockReply::Data(vec![40]),
                _ => MockReply::Data(Vec::new()),
            }
        });
        mock
    }

    fn requests(mock: &MockDevice, index: u8, function: u8) -> Vec<Vec<u8>> {
        mock.written()
            .into_iter()
            .filter(|f| f[2] == index && f[3] >> 4 == function)
            .collect()
    }

    #[test]
    fn test_open_reads_identity() {
        let mock = scripted_device();
        let kb = Keyboard::from_transport(mock).unwrap();

        assert_eq!(kb.device_type(), DeviceType::Keyboard);
        assert_eq!(kb.name(), NAME);
        assert_eq!(kb.model(), "c33e0f000000");
        assert_eq!(kb.serial(), "1234abcd");
        assert_eq!(kb.firmware(), "U1v118.2.2f");
        assert_eq!(kb.layout(), None);
        assert_eq!(kb.protocol_version(), 4);
    }

    #[test]
    fn test_name_read_in_chunks() {
        let mock = scripted_device();
        let _kb = Keyboard::from_transport(mock.clone()).unwrap();

        let chunks = requests(&mock, NAME_INDEX, func::NAME_GET_NAME);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0][4], 0);
        assert_eq!(chunks[1][4], 16);
    }

    #[test]
    fn test_blocks_filter_holes_and_keep_empty() {
        let mock = scripted_device();
        let kb = Keyboard::from_transport(mock).unwrap();

        // multimedia fails block info and is skipped, logo has no keys
        let ids: Vec<BlockId> = kb.blocks().iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec![BlockId::KEYS, BlockId::LOGO]);
        assert_eq!(kb.blocks()[0].keys(), &[0x04, 0x05, 0x06, 0x07]);
        assert!(kb.blocks()[1].keys().is_empty());
        assert_eq!(kb.blocks()[0].max_values(), RgbColor::WHITE);
    }

    #[test]
    fn test_patch_missing_keys() {
        let mut kb = Keyboard::from_transport(scripted_device()).unwrap();
        assert_eq!(kb.patch_missing_keys(BlockId::LOGO, &[0xd2]).unwrap(), 1);
        assert_eq!(kb.block(BlockId::LOGO).unwrap().keys(), &[0xd2]);
        assert!(matches!(
            kb.patch_missing_keys(BlockId::GKEYS, &[1]),
            Err(KeyboardError::UnknownBlock(BlockId::GKEYS))
        ));
    }

    #[test]
    fn test_get_colors_walks_offsets() {
        let mock = scripted_device();
        let mut kb = Keyboard::from_transport(mock.clone()).unwrap();
        mock.clear_written();

        let colors = kb.get_colors(BlockId::KEYS).unwrap();
        assert_eq!(colors.len(), 4);
        assert_eq!(colors[0], KeyColor::new(0x04, 0xff, 0, 0));

        let reads = requests(&mock, LEDS_INDEX, func::LEDS_GET);
        assert_eq!(reads.len(), 2);
        assert_eq!(&reads[1][4..8], &[0x00, 0x01, 0x00, 0x03]);

        assert!(kb.get_colors(BlockId::LOGO).unwrap().is_empty());
    }

    #[test]
    fn test_get_colors_rejects_wrong_offset() {
        let mock = scripted_device();
        let mut kb = Keyboard::from_transport(mock.clone()).unwrap();
        mock.add_feature(feature::LEDS, LEDS_INDEX, |_, payload| {
            MockReply::Data(vec![payload[0], payload[1], 0x00, 0x09, 0x04, 1, 2, 3])
        });

        let err = kb.get_colors(BlockId::KEYS).unwrap_err();
        assert!(matches!(
            err,
            KeyboardError::Transport(TransportError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_set_colors_batches() {
        let mock = scripted_device();
        let mut kb = Keyboard::from_transport(mock.clone()).unwrap();
        mock.clear_written();

        let colors: Vec<KeyColor> = (1..=7).map(|id| KeyColor::new(id, 0, 255, 0)).collect();
        kb.set_colors(BlockId::KEYS, &colors).unwrap();

        // 19-byte reports hold 3 keys after the header and prefix
        let writes = requests(&mock, LEDS_INDEX, func::LEDS_SET);
        assert_eq!(writes.len(), 3);
        let counts: Vec<u8> = writes.iter().map(|f| f[7]).collect();
        assert_eq!(counts, vec![3, 3, 1]);
        assert_eq!(&writes[2][8..12], &[7, 0, 255, 0]);
    }

    #[test]
    fn test_set_colors_unknown_block() {
        let mut kb = Keyboard::from_transport(scripted_device()).unwrap();
        let err = kb
            .set_colors(BlockId::MULTIMEDIA, &[KeyColor::new(1, 0, 0, 0)])
            .unwrap_err();
        assert!(matches!(err, KeyboardError::UnknownBlock(_)));
    }

    #[test]
    fn test_fill_and_commit() {
        let mock = scripted_device();
        let mut kb = Keyboard::from_transport(mock.clone()).unwrap();
        mock.clear_written();

        kb.fill_color(BlockId::KEYS, RgbColor::new(1, 2, 3)).unwrap();
        kb.commit_colors().unwrap();

        let fills = requests(&mock, LEDS_INDEX, func::LEDS_FILL);
        assert_eq!(&fills[0][4..9], &[0x00, 0x01, 1, 2, 3]);
        assert_eq!(requests(&mock, LEDS_INDEX, func::LEDS_COMMIT).len(), 1);
    }

    #[test]
    fn test_gamemode_batches_of_sixteen() {
        let mock = scripted_device();
        let mut kb = Keyboard::from_transport(mock.clone()).unwrap();
        mock.clear_written();

        assert_eq!(kb.gamemode_max().unwrap(), 40);
        let keys: Vec<u8> = (1..=20).collect();
        kb.gamemode_block(&keys).unwrap();
        kb.gamemode_clear().unwrap();

        let blocks = requests(&mock, GAMEMODE_INDEX, func::GAMEMODE_BLOCK);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0][4], 1);
        assert_eq!(blocks[1][4], 17);
        assert_eq!(requests(&mock, GAMEMODE_INDEX, func::GAMEMODE_CLEAR).len(), 1);
    }

    #[test]
    fn test_missing_feature_is_reported() {
        let mut kb = Keyboard::from_transport(scripted_device()).unwrap();
        let err = kb.report_rates().unwrap_err();
        assert!(matches!(
            err,
            KeyboardError::Transport(TransportError::FeatureNotFound(feature::REPORTRATE))
        ));
        assert!(!kb.has_gkeys().unwrap());
    }

    #[test]
    fn test_report_rate_range() {
        let mut kb = Keyboard::from_transport(scripted_device()).unwrap();
        assert!(matches!(
            kb.set_report_rate(0),
            Err(KeyboardError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_features_table() {
        let mut kb = Keyboard::from_transport(scripted_device()).unwrap();
        let ids: Vec<u16> = kb.features().unwrap().iter().map(|f| f.id).collect();
        assert_eq!(
            ids,
            vec![
                feature::ROOT,
                feature::FEATURE,
                feature::NAME,
                feature::VERSION,
                feature::LEDS,
                feature::GAMEMODE
            ]
        );
    }

    #[test]
    fn test_device_without_leds() {
        let mock = MockDevice::new();
        mock.add_feature(feature::NAME, NAME_INDEX, |function, _| match function {
            func::NAME_GET_LENGTH => MockReply::Data(vec![1]),
            func::NAME_GET_NAME => MockReply::Data(b"x".to_vec()),
            _ => MockReply::Data(vec![3]),
        });
        mock.add_feature(feature::VERSION, VERSION_INDEX, |_, _| {
            MockReply::Data(vec![0; 13])
        });

        let kb = Keyboard::from_transport(mock).unwrap();
        assert_eq!(kb.device_type(), DeviceType::Mouse);
        assert!(kb.blocks().is_empty());
        assert_eq!(kb.firmware(), "");
    }

    #[test]
    fn test_resync_after_unplug() {
        let mock = scripted_device();
        let mut kb = Keyboard::from_transport(mock.clone()).unwrap();
        assert!(kb.resync());
        mock.set_unplugged(true);
        assert!(!kb.resync());
        let err = kb.commit_colors().unwrap_err();
        assert!(err.is_expected());
        assert!(!err.is_recoverable());
    }
}
