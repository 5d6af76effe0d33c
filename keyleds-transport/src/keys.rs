//! Scancode and keycode translation
//!
//! Devices identify keys by a block-qualified scancode. Everything above the
//! adapter speaks Linux input keycodes. The normal-keys block maps through a
//! 256-entry table, the multimedia block through a short explicit list. Other
//! blocks have no keycode.

use crate::types::BlockId;

#[rustfmt::skip]
static SCANCODE_TO_KEYCODE: [u8; 256] = [
      0,   0,   0,   0,  30,  48,  46,  32,  18,  33,  34,  35,  23,  36,  37,  38, // 0x00
     50,  49,  24,  25,  16,  19,  31,  20,  22,  47,  17,  45,  21,  44,   2,   3, // 0x10
      4,   5,   6,   7,   8,   9,  10,  11,  28,   1,  14,  15,  57,  12,  13,  26, // 0x20
     27,   0,  43,  39,  40,  41,  51,  52,  53,  58,  59,  60,  61,  62,  63,  64, // 0x30
     65,  66,  67,  68,  87,  88,  99,  70, 119, 110, 102, 104, 111, 107, 109, 106, // 0x40
    105, 108, 103,  69,  98,  55,  74,  78,  96,  79,  80,  81,  75,  76,  77,  71, // 0x50
     72,  73,  82,  83,  86, 127, 116, 117, 183, 184, 185, 186, 187, 188, 189, 190, // 0x60
    191, 192, 193, 194, 134, 138, 130, 132, 128, 129, 131, 137, 133, 135, 136, 113, // 0x70
    115, 114,   0,   0,   0, 121,   0,  89,  93, 124,  92,  94,  95,   0,   0,   0, // 0x80
    122, 123,  90,  91,  85,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0, // 0x90
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0, // 0xa0
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0, // 0xb0
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0, // 0xc0
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0, // 0xd0
     29,  42,  56, 125,  97,  54, 100, 126, 164, 166, 165, 163, 161, 115, 114, 113, // 0xe0
    150, 158, 159, 128, 136, 177, 178, 176, 142, 152, 173, 140,   0,   0,   0,   0, // 0xf0
];

// Where several scancodes share a keycode, this picks the one Logitech uses
// (backslash is 0x32, not 0x31).
#[rustfmt::skip]
static KEYCODE_TO_SCANCODE: [u8; 200] = [
    0x00, 0x29, 0x1e, 0x1f, 0x20, 0x21, 0x22, 0x23, // 0x00
    0x24, 0x25, 0x26, 0x27, 0x2d, 0x2e, 0x2a, 0x2b, // 0x08
    0x14, 0x1a, 0x08, 0x15, 0x17, 0x1c, 0x18, 0x0c, // 0x10
    0x12, 0x13, 0x2f, 0x30, 0x28, 0xe0, 0x04, 0x16, // 0x18
    0x07, 0x09, 0x0a, 0x0b, 0x0d, 0x0e, 0x0f, 0x33, // 0x20
    0x34, 0x35, 0xe1, 0x32, 0x1d, 0x1b, 0x06, 0x19, // 0x28
    0x05, 0x11, 0x10, 0x36, 0x37, 0x38, 0xe5, 0x55, // 0x30
    0xe2, 0x2c, 0x39, 0x3a, 0x3b, 0x3c, 0x3d, 0x3e, // 0x38
    0x3f, 0x40, 0x41, 0x42, 0x43, 0x53, 0x47, 0x5f, // 0x40
    0x60, 0x61, 0x56, 0x5c, 0x5d, 0x5e, 0x57, 0x59, // 0x48
    0x5a, 0x5b, 0x62, 0x63, 0x00, 0x94, 0x64, 0x44, // 0x50
    0x45, 0x87, 0x92, 0x93, 0x8a, 0x88, 0x8b, 0x8c, // 0x58
    0x58, 0xe4, 0x54, 0x46, 0xe6, 0x00, 0x4a, 0x52, // 0x60
    0x4b, 0x50, 0x4f, 0x4d, 0x51, 0x4e, 0x49, 0x4c, // 0x68
    0x00, 0xef, 0xee, 0xed, 0x66, 0x67, 0x00, 0x48, // 0x70
    0x00, 0x85, 0x90, 0x91, 0x89, 0xe3, 0xe7, 0x65, // 0x78
    0xf3, 0x79, 0x76, 0x7a, 0x77, 0x7c, 0x74, 0x7d, // 0x80
    0xf4, 0x7b, 0x75, 0x00, 0xfb, 0x00, 0xf8, 0x00, // 0x88
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf0, 0x00, // 0x90
    0xf9, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf1, 0xf2, // 0x98
    0x00, 0xec, 0x00, 0xeb, 0xe8, 0xea, 0xe9, 0x00, // 0xa0
    0x00, 0x00, 0x00, 0x00, 0x00, 0xfa, 0x00, 0x00, // 0xa8
    0xf7, 0xf5, 0xf6, 0x00, 0x00, 0x00, 0x00, 0x68, // 0xb0
    0x69, 0x6a, 0x6b, 0x6c, 0x6d, 0x6e, 0x6f, 0x70, // 0xb8
    0x71, 0x72, 0x73, 0x00, 0x00, 0x00, 0x00, 0x00, // 0xc0
];

/// Multimedia block scancodes and their keycodes
const MULTIMEDIA: [(u8, u16); 7] = [
    (0xb5, 163), // next song
    (0xb6, 165), // previous song
    (0xb7, 166), // stop
    (0xcd, 164), // play/pause
    (0xe2, 113), // mute
    (0xe9, 114), // volume down
    (0xea, 115), // volume up
];

/// Keycode of a device key, `None` when the key has no input equivalent.
pub fn translate_scancode(block: BlockId, scancode: u8) -> Option<u16> {
    let keycode = match block {
        BlockId::KEYS => u16::from(SCANCODE_TO_KEYCODE[usize::from(scancode)]),
        BlockId::MULTIMEDIA => MULTIMEDIA
            .iter()
            .find(|(s, _)| *s == scancode)
            .map(|&(_, k)| k)?,
        _ => return None,
    };
    (keycode != 0).then_some(keycode)
}

/// Device key for a keycode, `None` when no block carries it.
pub fn translate_keycode(keycode: u16) -> Option<(BlockId, u8)> {
    if let Some(&(scancode, _)) = MULTIMEDIA.iter().find(|(_, k)| *k == keycode) {
        return Some((BlockId::MULTIMEDIA, scancode));
    }
    match KEYCODE_TO_SCANCODE.get(usize::from(keycode)) {
        Some(&scancode) if scancode != 0 => Some((BlockId::KEYS, scancode)),
        _ => None,
    }
}

/// Linux input key names, as used in configuration files
#[rustfmt::skip]
static KEYCODE_NAMES: &[(u16, &str)] = &[
    (1, "ESC"), (2, "1"), (3, "2"), (4, "3"), (5, "4"), (6, "5"), (7, "6"), (8, "7"),
    (9, "8"), (10, "9"), (11, "0"), (12, "MINUS"), (13, "EQUAL"), (14, "BACKSPACE"),
    (15, "TAB"), (16, "Q"), (17, "W"), (18, "E"), (19, "R"), (20, "T"), (21, "Y"),
    (22, "U"), (23, "I"), (24, "O"), (25, "P"), (26, "LBRACE"), (27, "RBRACE"),
    (28, "ENTER"), (29, "LCTRL"), (30, "A"), (31, "S"), (32, "D"), (33, "F"), (34, "G"),
    (35, "H"), (36, "J"), (37, "K"), (38, "L"), (39, "SEMICOLON"), (40, "APOSTROPHE"),
    (41, "GRAVE"), (42, "LSHIFT"), (43, "BACKSLASH"), (44, "Z"), (45, "X"), (46, "C"),
    (47, "V"), (48, "B"), (49, "N"), (50, "M"), (51, "COMMA"), (52, "DOT"), (53, "SLASH"),
    (54, "RSHIFT"), (55, "KPASTERISK"), (56, "LALT"), (57, "SPACE"), (58, "CAPSLOCK"),
    (59, "F1"), (60, "F2"), (61, "F3"), (62, "F4"), (63, "F5"), (64, "F6"), (65, "F7"),
    (66, "F8"), (67, "F9"), (68, "F10"), (69, "NUMLOCK"), (70, "SCROLLLOCK"), (71, "KP7"),
    (72, "KP8"), (73, "KP9"), (74, "KPMINUS"), (75, "KP4"), (76, "KP5"), (77, "KP6"),
    (78, "KPPLUS"), (79, "KP1"), (80, "KP2"), (81, "KP3"), (82, "KP0"), (83, "KPDOT"),
    (85, "ZENKAKUHANKAKU"), (86, "102ND"), (87, "F11"), (88, "F12"), (89, "RO"),
    (90, "KATAKANA"), (91, "HIRAGANA"), (92, "HENKAN"), (93, "KATAKANAHIRAGANA"),
    (94, "MUHENKAN"), (95, "KPJPCOMMA"), (96, "KPENTER"), (97, "RCTRL"), (98, "KPSLASH"),
    (99, "SYSRQ"), (100, "RALT"), (101, "LINEFEED"), (102, "HOME"), (103, "UP"),
    (104, "PAGEUP"), (105, "LEFT"), (106, "RIGHT"), (107, "END"), (108, "DOWN"),
    (109, "PAGEDOWN"), (110, "INSERT"), (111, "DELETE"), (112, "MACRO"), (113, "MUTE"),
    (114, "VOLUMEDOWN"), (115, "VOLUMEUP"), (116, "POWER"), (117, "KPEQUAL"),
    (118, "KPPLUSMINUS"), (119, "PAUSE"), (121, "KPCOMMA"), (122, "HANGEUL"),
    (123, "HANJA"), (124, "YEN"), (125, "LMETA"), (126, "RMETA"), (127, "COMPOSE"),
    (128, "STOP"), (129, "AGAIN"), (130, "PROPS"), (131, "UNDO"), (132, "FRONT"),
    (133, "COPY"), (134, "OPEN"), (135, "PASTE"), (136, "FIND"), (137, "CUT"),
    (138, "HELP"), (140, "CALC"), (142, "SLEEP"), (150, "WWW"), (152, "SCREENLOCK"),
    (158, "BACK"), (159, "FORWARD"), (161, "EJECTCD"), (163, "NEXTSONG"),
    (164, "PLAYPAUSE"), (165, "PREVIOUSSONG"), (166, "STOPCD"), (173, "REFRESH"),
    (176, "EDIT"), (177, "SCROLLUP"), (178, "SCROLLDOWN"), (183, "F13"), (184, "F14"),
    (185, "F15"), (186, "F16"), (187, "F17"), (188, "F18"), (189, "F19"), (190, "F20"),
    (191, "F21"), (192, "F22"), (193, "F23"), (194, "F24"),
];

/// Name of a keycode, e.g. `LCTRL`
pub fn keycode_name(keycode: u16) -> Option<&'static str> {
    KEYCODE_NAMES
        .iter()
        .find(|(code, _)| *code == keycode)
        .map(|&(_, name)| name)
}

/// Keycode for a name, ignoring case
pub fn keycode_from_name(name: &str) -> Option<u16> {
    KEYCODE_NAMES
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|&(code, _)| code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_block() {
        // 0x04 is 'A'
        assert_eq!(translate_scancode(BlockId::KEYS, 0x04), Some(30));
        assert_eq!(translate_scancode(BlockId::KEYS, 0x00), None);
        assert_eq!(translate_scancode(BlockId::KEYS, 0xff), None);
        assert_eq!(translate_scancode(BlockId::KEYS, 0x68), Some(183));
    }

    #[test]
    fn test_multimedia_block() {
        assert_eq!(translate_scancode(BlockId::MULTIMEDIA, 0xe2), Some(113));
        assert_eq!(translate_scancode(BlockId::MULTIMEDIA, 0xcd), Some(164));
        assert_eq!(translate_scancode(BlockId::MULTIMEDIA, 0x04), None);
    }

    #[test]
    fn test_other_blocks_have_no_keycode() {
        for scancode in 0..=255u8 {
            assert_eq!(translate_scancode(BlockId::LOGO, scancode), None);
            assert_eq!(translate_scancode(BlockId::GKEYS, scancode), None);
        }
    }

    #[test]
    fn test_reverse_translation() {
        assert_eq!(translate_keycode(30), Some((BlockId::KEYS, 0x04)));
        assert_eq!(translate_keycode(43), Some((BlockId::KEYS, 0x32)));
        // Media keys prefer the multimedia block
        assert_eq!(translate_keycode(113), Some((BlockId::MULTIMEDIA, 0xe2)));
        assert_eq!(translate_keycode(0), None);
        assert_eq!(translate_keycode(84), None);
        assert_eq!(translate_keycode(5000), None);
    }

    #[test]
    fn test_round_trip_on_keys_block() {
        for keycode in 1..200u16 {
            if let Some((BlockId::KEYS, scancode)) = translate_keycode(keycode) {
                assert_eq!(
                    translate_scancode(BlockId::KEYS, scancode),
                    Some(keycode),
                    "keycode {keycode}"
                );
            }
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(keycode_name(29), Some("LCTRL"));
        assert_eq!(keycode_from_name("lctrl"), Some(29));
        assert_eq!(keycode_from_name("F24"), Some(194));
        assert_eq!(keycode_from_name("nope"), None);
        assert_eq!(keycode_name(0), None);
    }
}
