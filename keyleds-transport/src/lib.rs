//! HID++ transport layer for Logitech RGB keyboards
//!
//! This crate provides everything below the keyboard abstraction:
//!
//! - the [`Transport`] trait and its Linux hidraw backend
//! - HID report descriptor parsing, to learn which report sizes a device accepts
//! - report framing and response correlation
//! - the [`Hidpp`] protocol engine: feature resolution, calls, ping and resync
//! - typed requests and responses for the features keyboards expose
//! - scancode/keycode translation

pub mod command;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod keys;
pub mod protocol;
pub mod report;
pub mod types;

mod discovery;
mod hidraw;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use command::{HidppCommand, HidppResponse, KeyColor, ParseError};
pub use discovery::{list_devices, LOGITECH_VID};
pub use engine::{Hidpp, DEFAULT_TIMEOUT};
pub use error::TransportError;
pub use hidraw::{HidrawTransport, RawInfo};
pub use protocol::TARGET_DEFAULT;
pub use types::{BlockId, DiscoveredDevice, FeatureEntry, FeatureFlags, ReportType};

use std::time::Instant;

/// Byte pipe to one HID device
///
/// Implementations move whole reports: one `write_report` is one report out,
/// one `read_report` is one report in. The first byte is the report id.
pub trait Transport: Send {
    /// Device node path, for logs and identity
    fn path(&self) -> &str;

    /// Raw HID report descriptor
    fn report_descriptor(&self) -> Result<Vec<u8>, TransportError>;

    /// Write one report; returns the number of bytes written
    fn write_report(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Read one report, waiting at most until `deadline`
    ///
    /// Fails with [`TransportError::Timedout`] if nothing arrives in time.
    fn read_report(&mut self, buf: &mut [u8], deadline: Instant) -> Result<usize, TransportError>;

    /// Discard every report already queued for reading
    fn drain(&mut self) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn path(&self) -> &str {
        (**self).path()
    }

    fn report_descriptor(&self) -> Result<Vec<u8>, TransportError> {
        (**self).report_descriptor()
    }

    fn write_report(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        (**self).write_report(data)
    }

    fn read_report(&mut self, buf: &mut [u8], deadline: Instant) -> Result<usize, TransportError> {
        (**self).read_report(buf, deadline)
    }

    fn drain(&mut self) -> Result<(), TransportError> {
        (**self).drain()
    }
}
