//! HID++ report framing
//!
//! Request layout: `[report_id, target, feature_index, function << 4 | seq, payload..]`,
//! zero-padded to the size of the chosen report type.

use crate::error::TransportError;
use crate::protocol::{index, ERROR_HIDPP1, ERROR_HIDPP2, HEADER_SIZE};
use crate::types::ReportType;

/// Pick the smallest declared report that fits the header plus `payload_len`.
///
/// `reports` must be sorted by size, as returned by the descriptor parser.
pub fn select_report(
    reports: &[ReportType],
    payload_len: usize,
) -> Result<ReportType, TransportError> {
    reports
        .iter()
        .find(|r| r.size >= HEADER_SIZE + payload_len)
        .copied()
        .ok_or(TransportError::IoLength)
}

/// Pack the function number and sequence into the function byte
pub fn function_byte(function: u8, sequence: u8) -> u8 {
    (function << 4) | (sequence & 0x0f)
}

/// Build the full frame, report id included.
pub fn encode(
    report: ReportType,
    target: u8,
    feature_index: u8,
    function_byte: u8,
    payload: &[u8],
) -> Vec<u8> {
    let mut frame = vec![0u8; 1 + report.size];
    frame[0] = report.id;
    frame[1] = target;
    frame[2] = feature_index;
    frame[3] = function_byte;
    frame[4..4 + payload.len()].copy_from_slice(payload);
    frame
}

/// Check an inbound frame against the declared report types.
///
/// Unknown report ids are not ours and yield `None`. A known id with the
/// wrong length means the stream is out of sync.
pub fn check_frame(reports: &[ReportType], frame: &[u8]) -> Result<Option<ReportType>, TransportError> {
    let Some(&first) = frame.first() else {
        return Ok(None);
    };
    match reports.iter().find(|r| r.id == first) {
        None => Ok(None),
        Some(r) if frame.len() == 1 + r.size => Ok(Some(*r)),
        Some(_) => Err(TransportError::IoLength),
    }
}

/// What an inbound frame means for the outstanding request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply<'a> {
    /// Correlated reply; carries the payload after the header
    Response(&'a [u8]),
    /// HID++ 2.0 error report for the request
    DeviceError(u8),
    /// HID++ 1.0 error report on the root feature
    LegacyError(u8),
    /// Notification, stale reply or another application's traffic
    Unrelated,
}

/// Correlate a well-formed frame with the outstanding request.
pub fn classify(frame: &[u8], target: u8, feature_index: u8, function_byte: u8) -> Reply<'_> {
    if frame.len() < 1 + HEADER_SIZE || frame[1] != target {
        return Reply::Unrelated;
    }
    let byte = |i: usize| frame.get(i).copied().unwrap_or(0);

    if frame[2] == feature_index && frame[3] == function_byte {
        return Reply::Response(&frame[1 + HEADER_SIZE..]);
    }
    if frame[2] == ERROR_HIDPP2 && frame[3] == feature_index && byte(4) == function_byte {
        return Reply::DeviceError(byte(5));
    }
    if frame[2] == ERROR_HIDPP1 && frame[3] == index::ROOT && byte(4) == function_byte {
        return Reply::LegacyError(byte(5));
    }
    Reply::Unrelated
}

/// Space-separated hex dump for debug logs
pub fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const REPORTS: [ReportType; 2] = [
        ReportType { id: 0x10, size: 6 },
        ReportType { id: 0x11, size: 19 },
    ];

    #[test]
    fn test_select_report() {
        assert_eq!(select_report(&REPORTS, 0).unwrap().id, 0x10);
        assert_eq!(select_report(&REPORTS, 3).unwrap().id, 0x10);
        assert_eq!(select_report(&REPORTS, 4).unwrap().id, 0x11);
        assert_eq!(select_report(&REPORTS, 16).unwrap().id, 0x11);
        assert!(matches!(
            select_report(&REPORTS, 17),
            Err(TransportError::IoLength)
        ));
    }

    #[test]
    fn test_encode_pads() {
        let frame = encode(REPORTS[0], 0xff, 0x0b, function_byte(3, 2), &[1, 2]);
        assert_eq!(frame, vec![0x10, 0xff, 0x0b, 0x32, 1, 2, 0]);
    }

    #[test]
    fn test_check_frame() {
        assert_eq!(check_frame(&REPORTS, &[0x10; 7]).unwrap(), Some(REPORTS[0]));
        assert_eq!(check_frame(&REPORTS, &[0x01; 9]).unwrap(), None);
        assert!(matches!(
            check_frame(&REPORTS, &[0x11; 7]),
            Err(TransportError::IoLength)
        ));
    }

    #[test]
    fn test_classify() {
        let reply = [0x10, 0xff, 0x0b, 0x32, 9, 8, 7];
        assert_eq!(classify(&reply, 0xff, 0x0b, 0x32), Reply::Response(&[9, 8, 7]));
        // Wrong sequence
        assert_eq!(classify(&reply, 0xff, 0x0b, 0x33), Reply::Unrelated);
        // Wrong target
        assert_eq!(classify(&reply, 0x01, 0x0b, 0x32), Reply::Unrelated);

        let error = [0x10, 0xff, 0xff, 0x0b, 0x32, 0x08, 0];
        assert_eq!(classify(&error, 0xff, 0x0b, 0x32), Reply::DeviceError(0x08));
        assert_eq!(classify(&error, 0xff, 0x0c, 0x32), Reply::Unrelated);

        let legacy = [0x10, 0xff, 0x8f, 0x00, 0x11, 0x01, 0];
        assert_eq!(classify(&legacy, 0xff, 0x00, 0x11), Reply::LegacyError(0x01));
    }

    fn report_sets() -> impl Strategy<Value = Vec<ReportType>> {
        proptest::collection::btree_set(4usize..=64, 0..=4).prop_map(|sizes| {
            sizes
                .into_iter()
                .enumerate()
                .map(|(i, size)| ReportType {
                    id: 0x10 + i as u8,
                    size,
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(256))]

        #[test]
        fn prop_select_smallest_sufficient(reports in report_sets(), len in 0usize..=70) {
            let expected = reports
                .iter()
                .filter(|r| r.size >= HEADER_SIZE + len)
                .map(|r| r.size)
                .min();
            match select_report(&reports, len) {
                Ok(r) => prop_assert_eq!(Some(r.size), expected),
                Err(TransportError::IoLength) => prop_assert_eq!(expected, None),
                Err(e) => prop_assert!(false, "unexpected error {}", e),
            }
        }
    }
}
