//! HID report descriptor parsing
//!
//! Only the subset needed to find HID++ reports is decoded: short items are
//! folded into a state table the way the HID specification describes, and
//! every main item is reconstructed from the globals and locals in effect at
//! the time it appears. Long items are skipped.

use tracing::{debug, warn};

use crate::error::TransportError;
use crate::types::ReportType;

// =============================================================================
// Item prefixes
// =============================================================================

const TYPE_MAIN: u8 = 0 << 2;
const TYPE_GLOBAL: u8 = 1 << 2;
const TYPE_MASK: u8 = 0x0c;
const TAG_MASK: u8 = 0xfc;
const LONG_ITEM: u8 = 0xfe;

mod tag {
    use super::{TYPE_GLOBAL, TYPE_MAIN};

    const TYPE_LOCAL: u8 = 2 << 2;

    pub const INPUT: u8 = (8 << 4) | TYPE_MAIN;
    pub const OUTPUT: u8 = (9 << 4) | TYPE_MAIN;

    pub const USAGE_PAGE: u8 = TYPE_GLOBAL;
    pub const LOGICAL_MINIMUM: u8 = (1 << 4) | TYPE_GLOBAL;
    pub const LOGICAL_MAXIMUM: u8 = (2 << 4) | TYPE_GLOBAL;
    pub const REPORT_SIZE: u8 = (7 << 4) | TYPE_GLOBAL;
    pub const REPORT_ID: u8 = (8 << 4) | TYPE_GLOBAL;
    pub const REPORT_COUNT: u8 = (9 << 4) | TYPE_GLOBAL;
    pub const PUSH: u8 = (10 << 4) | TYPE_GLOBAL;
    pub const POP: u8 = (11 << 4) | TYPE_GLOBAL;

    pub const USAGE: u8 = TYPE_LOCAL;
}

/// One decoded short item
#[derive(Debug, Clone, Copy)]
struct Item {
    kind: u8,
    tag: u8,
    size: usize,
    data: [u8; 4],
}

impl Item {
    fn unsigned(&self) -> u32 {
        self.data[..self.size]
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
    }

    fn signed(&self) -> i32 {
        match self.size {
            1 => i32::from(self.data[0] as i8),
            2 => i32::from(i16::from_le_bytes([self.data[0], self.data[1]])),
            4 => i32::from_le_bytes(self.data),
            _ => 0,
        }
    }
}

/// Main item rebuilt from the parser state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MainItem {
    pub tag: u8,
    pub flags: u32,
    pub usage: u32,
    pub logical_minimum: Option<i32>,
    pub logical_maximum: Option<i32>,
    pub report_id: u8,
    pub report_size: u32,
    pub report_count: u32,
}

impl MainItem {
    fn is_vendor_usage(&self) -> bool {
        self.usage & 0xff00_0000 == 0xff00_0000
    }

    /// Vendor output item carrying plain bytes, the shape HID++ reports take
    pub fn is_hidpp_report(&self) -> bool {
        // FEATURE items are left out on purpose; HID++ reports are OUTPUT items
        self.tag == tag::OUTPUT
            && self.logical_minimum == Some(0)
            && self.logical_maximum == Some(255)
            && self.flags == 0
            && self.is_vendor_usage()
    }

    pub fn is_input(&self) -> bool {
        self.tag == tag::INPUT
    }
}

fn aggregate(state: &[Item]) -> Result<MainItem, TransportError> {
    let mut item = MainItem {
        usage: u32::MAX,
        ..MainItem::default()
    };

    for entry in state {
        if entry.kind == TYPE_MAIN {
            item.tag = entry.tag;
            item.flags = entry.unsigned();
        }
        match entry.tag {
            tag::USAGE_PAGE => item.usage = (entry.unsigned() << 16) | (item.usage & 0xffff),
            tag::LOGICAL_MINIMUM => item.logical_minimum = Some(entry.signed()),
            tag::LOGICAL_MAXIMUM => item.logical_maximum = Some(entry.signed()),
            tag::REPORT_SIZE => item.report_size = entry.unsigned(),
            tag::REPORT_ID => item.report_id = entry.unsigned() as u8,
            tag::REPORT_COUNT => item.report_count = entry.unsigned(),
            tag::USAGE => {
                // A 4-byte usage carries its own page
                let keep = if entry.size == 4 { 0 } else { 0xffff_0000 };
                item.usage = (item.usage & keep) | entry.unsigned();
            }
            tag::PUSH | tag::POP => {
                warn!("report descriptor uses push/pop, which is not supported");
                return Err(TransportError::MalformedDescriptor);
            }
            _ => {}
        }
    }
    Ok(item)
}

/// Decode a report descriptor into its main items.
pub fn parse_main_items(data: &[u8]) -> Result<Vec<MainItem>, TransportError> {
    let mut state: Vec<Item> = Vec::with_capacity(16);
    let mut items = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let prefix = data[pos];
        let kind = prefix & TYPE_MASK;
        let item_tag = prefix & TAG_MASK;
        let size = match prefix & 0x03 {
            3 => 4,
            n => n as usize,
        };

        if pos + size >= data.len() {
            warn!("report descriptor item at offset {pos:#x} overflows");
            break;
        }

        if prefix == LONG_ITEM {
            pos += usize::from(data[pos + 1]) + 3;
            continue;
        }

        let mut item = Item {
            kind,
            tag: item_tag,
            size,
            data: [0; 4],
        };
        item.data[..size].copy_from_slice(&data[pos + 1..pos + 1 + size]);

        // Globals are unique by tag, later values replace earlier ones
        let existing = if kind == TYPE_GLOBAL {
            state.iter().position(|s| s.tag == item_tag)
        } else {
            None
        };
        match existing {
            Some(idx) => state[idx] = item,
            None => state.push(item),
        }

        if kind == TYPE_MAIN {
            items.push(aggregate(&state)?);
            state.retain(|s| s.kind == TYPE_GLOBAL);
        }

        pos += size + 1;
    }

    Ok(items)
}

/// Extract HID++-compatible reports from a descriptor, sorted by size.
///
/// Fails with [`TransportError::NoHidpp`] when the device declares none.
pub fn parse_hidpp_reports(data: &[u8]) -> Result<Vec<ReportType>, TransportError> {
    let mut reports: Vec<ReportType> = parse_main_items(data)?
        .iter()
        .filter(|item| item.is_hidpp_report())
        .map(|item| ReportType {
            id: item.report_id,
            size: (item.report_count * item.report_size / 8) as usize,
        })
        .inspect(|r| debug!("found report id {:#04x} ({} bytes)", r.id, r.size))
        .collect();

    reports.sort_by_key(|r| r.size);

    if reports.is_empty() {
        return Err(TransportError::NoHidpp);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Descriptor of the vendor interface of a G410/G810 class keyboard
    const LOGITECH_VENDOR: &[u8] = &[
        0x06, 0x00, 0xff, 0x09, 0x01, 0xa1, 0x01, 0x85, 0x10, 0x95, 0x06, 0x75, 0x08, 0x15,
        0x00, 0x26, 0xff, 0x00, 0x09, 0x01, 0x81, 0x00, 0x09, 0x01, 0x91, 0x00, 0xc0, 0x06,
        0x00, 0xff, 0x09, 0x02, 0xa1, 0x01, 0x85, 0x11, 0x95, 0x13, 0x75, 0x08, 0x15, 0x00,
        0x26, 0xff, 0x00, 0x09, 0x02, 0x81, 0x00, 0x09, 0x02, 0x91, 0x00, 0xc0,
    ];

    /// Standard boot keyboard: no vendor usage anywhere
    const BOOT_KEYBOARD: &[u8] = &[
        0x05, 0x01, 0x09, 0x06, 0xa1, 0x01, 0x05, 0x07, 0x19, 0xe0, 0x29, 0xe7, 0x15, 0x00,
        0x25, 0x01, 0x75, 0x01, 0x95, 0x08, 0x81, 0x02, 0x95, 0x05, 0x75, 0x01, 0x05, 0x08,
        0x19, 0x01, 0x29, 0x05, 0x91, 0x02, 0x95, 0x01, 0x75, 0x03, 0x91, 0x01, 0xc0,
    ];

    #[test]
    fn test_logitech_reports() {
        let reports = parse_hidpp_reports(LOGITECH_VENDOR).unwrap();
        assert_eq!(
            reports,
            vec![
                ReportType { id: 0x10, size: 6 },
                ReportType { id: 0x11, size: 19 },
            ]
        );
    }

    #[test]
    fn test_boot_keyboard_has_no_hidpp() {
        assert!(matches!(
            parse_hidpp_reports(BOOT_KEYBOARD),
            Err(TransportError::NoHidpp)
        ));
    }

    #[test]
    fn test_feature_items_are_not_hidpp() {
        // Same vendor interface with every OUTPUT item turned into a FEATURE item
        let data: Vec<u8> = LOGITECH_VENDOR
            .iter()
            .map(|&b| if b == 0x91 { 0xb1 } else { b })
            .collect();
        assert!(matches!(
            parse_hidpp_reports(&data),
            Err(TransportError::NoHidpp)
        ));
    }

    #[test]
    fn test_reports_sorted_by_size() {
        // Long report declared first
        let mut data = LOGITECH_VENDOR[27..].to_vec();
        data.extend_from_slice(&LOGITECH_VENDOR[..27]);
        let reports = parse_hidpp_reports(&data).unwrap();
        assert_eq!(reports[0].size, 6);
        assert_eq!(reports[1].size, 19);
    }

    #[test]
    fn test_locals_reset_after_main_item() {
        let items = parse_main_items(LOGITECH_VENDOR).unwrap();
        // collection, input, output, end collection per report
        assert_eq!(items.len(), 8);
        let end = &items[3];
        assert_eq!(end.usage, 0xff00_ffff);
        let output = &items[2];
        assert_eq!(output.usage, 0xff00_0001);
        assert_eq!(output.report_id, 0x10);
    }

    #[test]
    fn test_four_byte_usage_replaces_page() {
        let data = [
            0x05, 0x01, // usage page (generic desktop)
            0x0b, 0x01, 0x00, 0x00, 0xff, // usage 0xff000001
            0x15, 0x00, 0x26, 0xff, 0x00, 0x75, 0x08, 0x95, 0x04, 0x85, 0x20, // globals
            0x91, 0x00, // output
            0xc0,
        ];
        let reports = parse_hidpp_reports(&data).unwrap();
        assert_eq!(reports, vec![ReportType { id: 0x20, size: 4 }]);
    }

    #[test]
    fn test_push_is_malformed() {
        let data = [0x06, 0x00, 0xff, 0xa4, 0x91, 0x00, 0xc0];
        assert!(matches!(
            parse_main_items(&data),
            Err(TransportError::MalformedDescriptor)
        ));
    }

    #[test]
    fn test_truncated_item_stops_parsing() {
        // The trailing logical maximum is missing its second data byte
        let mut data = LOGITECH_VENDOR[..27].to_vec();
        data.extend_from_slice(&[0x26, 0xff]);
        let reports = parse_hidpp_reports(&data).unwrap();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn test_long_item_skipped() {
        let mut data = vec![0xfe, 0x02, 0x10, 0xaa, 0xbb];
        data.extend_from_slice(LOGITECH_VENDOR);
        assert_eq!(parse_hidpp_reports(&data).unwrap().len(), 2);
    }

    #[test]
    fn test_signed_logical_range() {
        let item = Item {
            kind: TYPE_GLOBAL,
            tag: tag::LOGICAL_MINIMUM,
            size: 1,
            data: [0x81, 0, 0, 0],
        };
        assert_eq!(item.signed(), -127);
        let item = Item {
            size: 2,
            data: [0xff, 0x00, 0, 0],
            ..item
        };
        assert_eq!(item.signed(), 255);
    }
}
