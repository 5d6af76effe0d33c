//! Key database: one entry per render target slot.
//!
//! Slots follow device order: blocks as the device lists them, keys in block
//! order. Effects address keys by slot index; configuration and the command
//! line address them by name.

use std::collections::BTreeMap;

use keyleds_keyboard::{BlockId, KeyBlock};
use keyleds_transport::keys::{keycode_from_name, keycode_name, translate_scancode};

// ---------------------------------------------------------------------------
// Key — one slot
// ---------------------------------------------------------------------------

/// A single key of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// Slot in every render target of the device
    pub index: usize,
    pub block: BlockId,
    /// Device key id within the block
    pub key_id: u8,
    /// Linux input keycode, when the key has one
    pub keycode: Option<u16>,
    pub name: String,
}

/// Display name of a device key.
///
/// Keys with an input keycode use its name (`ESC`, `NEXTSONG`); the others are
/// named after their block and id (`logo-01`, `gkeys-03`).
pub fn key_name(block: BlockId, key_id: u8) -> String {
    match translate_scancode(block, key_id).and_then(keycode_name) {
        Some(name) => name.to_string(),
        None => format!("{block}-{key_id:02x}"),
    }
}

// ---------------------------------------------------------------------------
// KeyGroup — named subset of keys
// ---------------------------------------------------------------------------

/// Named subset of keys, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGroup {
    name: String,
    indices: Vec<usize>,
}

impl KeyGroup {
    pub fn new(name: impl Into<String>, indices: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            indices,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slot indices of the group's keys
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

// ---------------------------------------------------------------------------
// KeyDatabase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct KeyDatabase {
    keys: Vec<Key>,
}

impl KeyDatabase {
    /// Build slots from the device's key blocks.
    pub fn from_blocks(blocks: &[KeyBlock]) -> Self {
        let keys = blocks
            .iter()
            .flat_map(|block| block.keys().iter().map(move |&id| (block.id(), id)))
            .enumerate()
            .map(|(index, (block, key_id))| Key {
                index,
                block,
                key_id,
                keycode: translate_scancode(block, key_id),
                name: key_name(block, key_id),
            })
            .collect();
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Key> {
        self.keys.get(index)
    }

    /// Look a key up by device address.
    pub fn find(&self, block: BlockId, key_id: u8) -> Option<&Key> {
        self.keys
            .iter()
            .find(|k| k.block == block && k.key_id == key_id)
    }

    pub fn find_keycode(&self, keycode: u16) -> Option<&Key> {
        self.keys.iter().find(|k| k.keycode == Some(keycode))
    }

    /// Look a key up by name, ignoring case.
    ///
    /// Accepts display names and `KEY_`-prefixed input names.
    pub fn find_name(&self, name: &str) -> Option<&Key> {
        if let Some(key) = self
            .keys
            .iter()
            .find(|k| k.name.eq_ignore_ascii_case(name))
        {
            return Some(key);
        }
        let bare = name
            .get(..4)
            .filter(|p| p.eq_ignore_ascii_case("KEY_"))
            .map_or(name, |_| &name[4..]);
        keycode_from_name(bare).and_then(|code| self.find_keycode(code))
    }

    /// Slots of one block
    pub fn block(&self, block: BlockId) -> impl Iterator<Item = &Key> {
        self.keys.iter().filter(move |k| k.block == block)
    }

    /// Resolve a list of key names into a group.
    ///
    /// A block name (`logo`, `media`) stands for every key of that block.
    /// Returns the names that matched nothing alongside the group.
    pub fn group<S: AsRef<str>>(&self, name: &str, members: &[S]) -> (KeyGroup, Vec<String>) {
        let mut indices = Vec::new();
        let mut unknown = Vec::new();
        for member in members {
            let member = member.as_ref();
            if let Some(key) = self.find_name(member) {
                if !indices.contains(&key.index) {
                    indices.push(key.index);
                }
            } else if let Some(block) = BlockId::from_name(member) {
                for key in self.block(block) {
                    if !indices.contains(&key.index) {
                        indices.push(key.index);
                    }
                }
            } else {
                unknown.push(member.to_string());
            }
        }
        (KeyGroup::new(name, indices), unknown)
    }

    /// Resolve every configured group.
    pub fn groups(&self, config: &BTreeMap<String, Vec<String>>) -> (Vec<KeyGroup>, Vec<String>) {
        let mut groups = Vec::with_capacity(config.len());
        let mut unknown = Vec::new();
        for (name, members) in config {
            let (group, missing) = self.group(name, members);
            groups.push(group);
            unknown.extend(missing);
        }
        (groups, unknown)
    }
}
