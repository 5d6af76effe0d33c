//! Scripted in-memory HID++ device
//!
//! Answers the root and feature-set functions itself and forwards every other
//! feature to a handler registered by the test. Clones share state, so a test
//! keeps one handle to inspect traffic while the engine owns another.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::protocol::{feature, func, index, ERROR_HIDPP1, ERROR_HIDPP2};
use crate::Transport;

/// Vendor interface descriptor of a Logitech keyboard: report 0x10 (6 bytes)
/// and report 0x11 (19 bytes)
pub const LOGITECH_DESCRIPTOR: &[u8] = &[
    0x06, 0x00, 0xff, 0x09, 0x01, 0xa1, 0x01, 0x85, 0x10, 0x95, 0x06, 0x75, 0x08, 0x15, 0x00,
    0x26, 0xff, 0x00, 0x09, 0x01, 0x81, 0x00, 0x09, 0x01, 0x91, 0x00, 0xc0, 0x06, 0x00, 0xff,
    0x09, 0x02, 0xa1, 0x01, 0x85, 0x11, 0x95, 0x13, 0x75, 0x08, 0x15, 0x00, 0x26, 0xff, 0x00,
    0x09, 0x02, 0x81, 0x00, 0x09, 0x02, 0x91, 0x00, 0xc0,
];

const SHORT_REPORT: (u8, usize) = (0x10, 6);
const LONG_REPORT: (u8, usize) = (0x11, 19);

/// What a feature handler wants the device to answer
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Normal reply with this payload
    Data(Vec<u8>),
    /// HID++ 2.0 error report with this code
    Error(u8),
    /// No answer at all
    Silent,
    /// Frames pushed to the inbound queue as-is
    Raw(Vec<Vec<u8>>),
}

type Handler = Box<dyn FnMut(u8, &[u8]) -> MockReply + Send>;

struct MockFeature {
    id: u16,
    index: u8,
    handler: Handler,
}

struct MockState {
    descriptor: Vec<u8>,
    version: u8,
    features: Vec<MockFeature>,
    inbound: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    legacy: bool,
    stale_ping: bool,
    unplugged: bool,
}

/// Handle to a scripted device; implements [`Transport`]
#[derive(Clone)]
pub struct MockDevice {
    path: String,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame a reply, picking the short report when the payload fits
pub fn reply_frame(target: u8, feature_index: u8, function_byte: u8, data: &[u8]) -> Vec<u8> {
    let (id, size) = if data.len() <= SHORT_REPORT.1 - 3 {
        SHORT_REPORT
    } else {
        LONG_REPORT
    };
    let mut frame = vec![0u8; 1 + size];
    frame[0] = id;
    frame[1] = target;
    frame[2] = feature_index;
    frame[3] = function_byte;
    let len = data.len().min(size - 3);
    frame[4..4 + len].copy_from_slice(&data[..len]);
    frame
}

fn error_frame(marker: u8, target: u8, feature_index: u8, function_byte: u8, code: u8) -> Vec<u8> {
    vec![
        SHORT_REPORT.0,
        target,
        marker,
        feature_index,
        function_byte,
        code,
        0,
    ]
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            path: "/dev/mock-hidraw".to_string(),
            state: Arc::new(Mutex::new(MockState {
                descriptor: LOGITECH_DESCRIPTOR.to_vec(),
                version: 4,
                features: Vec::new(),
                inbound: VecDeque::new(),
                written: Vec::new(),
                legacy: false,
                stale_ping: false,
                unplugged: false,
            })),
        }
    }

    /// Register a feature at a table slot with the handler answering its functions.
    ///
    /// The handler receives the function number and the request payload.
    pub fn add_feature<F>(&self, id: u16, index: u8, handler: F)
    where
        F: FnMut(u8, &[u8]) -> MockReply + Send + 'static,
    {
        let mut state = self.state.lock();
        state.features.retain(|f| f.id != id);
        state.features.push(MockFeature {
            id,
            index,
            handler: Box::new(handler),
        });
    }

    pub fn set_descriptor(&self, descriptor: Vec<u8>) {
        self.state.lock().descriptor = descriptor;
    }

    /// Answer the protocol probe like a HID++ 1.0 device
    pub fn set_legacy(&self, legacy: bool) {
        self.state.lock().legacy = legacy;
    }

    /// Precede every ping reply with one echoing the wrong byte
    pub fn set_stale_ping(&self, stale: bool) {
        self.state.lock().stale_ping = stale;
    }

    /// Fail all I/O with ENODEV
    pub fn set_unplugged(&self, unplugged: bool) {
        self.state.lock().unplugged = unplugged;
    }

    /// Push a frame the engine will read before any reply
    pub fn queue_inbound(&self, frame: Vec<u8>) {
        self.state.lock().inbound.push_back(frame);
    }

    pub fn pending_inbound(&self) -> usize {
        self.state.lock().inbound.len()
    }

    /// Every frame written so far, report id included
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }

    pub fn clear_written(&self) {
        self.state.lock().written.clear();
    }
}

impl MockState {
    fn answer(&mut self, frame: &[u8]) {
        if frame.len() < 4 {
            return;
        }
        let (target, feature_index, function_byte) = (frame[1], frame[2], frame[3]);
        let function = function_byte >> 4;
        let payload = &frame[4..];

        let reply = match feature_index {
            index::ROOT => self.answer_root(function, payload),
            index::FEATURE => self.answer_feature_set(function, payload),
            _ => match self.features.iter_mut().find(|f| f.index == feature_index) {
                Some(f) => (f.handler)(function, payload),
                None => MockReply::Error(0x06),
            },
        };

        match reply {
            MockReply::Data(data) => {
                if feature_index == index::ROOT && function == func::ROOT_PING {
                    if self.legacy {
                        self.inbound.push_back(error_frame(
                            ERROR_HIDPP1,
                            target,
                            index::ROOT,
                            function_byte,
                            0x01,
                        ));
                        return;
                    }
                    if self.stale_ping {
                        let mut stale = data.clone();
                        stale[2] = stale[2].wrapping_sub(1);
                        self.inbound
                            .push_back(reply_frame(target, feature_index, function_byte, &stale));
                    }
                }
                self.inbound
                    .push_back(reply_frame(target, feature_index, function_byte, &data));
            }
            MockReply::Error(code) => self.inbound.push_back(error_frame(
                ERROR_HIDPP2,
                target,
                feature_index,
                function_byte,
                code,
            )),
            MockReply::Silent => {}
            MockReply::Raw(frames) => self.inbound.extend(frames),
        }
    }

    fn answer_root(&self, function: u8, payload: &[u8]) -> MockReply {
        match function {
            func::ROOT_GET_FEATURE => {
                let id = u16::from_be_bytes([payload[0], payload[1]]);
                let index = match id {
                    feature::ROOT => index::ROOT,
                    feature::FEATURE => index::FEATURE,
                    _ => self
                        .features
                        .iter()
                        .find(|f| f.id == id)
                        .map(|f| f.index)
                        .unwrap_or(0),
                };
                MockReply::Data(vec![index, 0])
            }
            func::ROOT_PING => MockReply::Data(vec![self.version, 0, payload[2]]),
            _ => MockReply::Error(0x07),
        }
    }

    fn answer_feature_set(&self, function: u8, payload: &[u8]) -> MockReply {
        match function {
            func::FEATURE_GET_COUNT => {
                let count = self
                    .features
                    .iter()
                    .map(|f| f.index)
                    .max()
                    .unwrap_or(index::FEATURE);
                MockReply::Data(vec![count])
            }
            func::FEATURE_GET_ID => {
                let id = self
                    .features
                    .iter()
                    .find(|f| f.index == payload[0])
                    .map(|f| f.id)
                    .unwrap_or(0);
                let [hi, lo] = id.to_be_bytes();
                MockReply::Data(vec![hi, lo, 0])
            }
            _ => MockReply::Error(0x07),
        }
    }
}

fn unplugged() -> TransportError {
    TransportError::Os(io::Error::from_raw_os_error(libc::ENODEV))
}

impl Transport for MockDevice {
    fn path(&self) -> &str {
        &self.path
    }

    fn report_descriptor(&self) -> Result<Vec<u8>, TransportError> {
        Ok(self.state.lock().descriptor.clone())
    }

    fn write_report(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut state = self.state.lock();
        if state.unplugged {
            return Err(unplugged());
        }
        state.written.push(data.to_vec());
        state.answer(data);
        Ok(data.len())
    }

    fn read_report(&mut self, buf: &mut [u8], _deadline: Instant) -> Result<usize, TransportError> {
        let mut state = self.state.lock();
        if state.unplugged {
            return Err(unplugged());
        }
        let frame = state.inbound.pop_front().ok_or(TransportError::Timedout)?;
        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }

    fn drain(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.unplugged {
            return Err(unplugged());
        }
        state.inbound.clear();
        Ok(())
    }
}
