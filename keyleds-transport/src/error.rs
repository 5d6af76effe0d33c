//! Transport error types

use std::io;

use thiserror::Error;

use crate::protocol::error_name;

fn code_name(code: &u8) -> &'static str {
    error_name(*code)
}

/// Errors that can occur while talking HID++ to a device
#[derive(Error, Debug)]
pub enum TransportError {
    /// System call failure on the device node
    #[error("I/O error: {0}")]
    Os(#[from] io::Error),

    /// The device answered with a HID++ error report
    #[error("device error 0x{:02x} ({})", .0, code_name(.0))]
    Device(u8),

    #[error("unexpected report length")]
    IoLength,

    #[error("invalid device (could not parse report descriptor)")]
    MalformedDescriptor,

    #[error("invalid device (no HID++ reports in descriptor)")]
    NoHidpp,

    #[error("unsupported HID++ protocol version {0}")]
    UnsupportedProtocolVersion(u8),

    #[error("feature 0x{0:04x} not found")]
    FeatureNotFound(u16),

    #[error("device timeout")]
    Timedout,

    #[error("invalid response from device: {0}")]
    InvalidResponse(String),

    // Enumeration errors
    #[error("HID error: {0}")]
    HidError(String),
}

impl TransportError {
    /// Raw errno for OS-level failures
    pub fn errno(&self) -> Option<i32> {
        match self {
            TransportError::Os(e) => e.raw_os_error(),
            _ => None,
        }
    }

    /// Whether this failure is a normal outcome that should not alarm the user
    /// (device unplugged, device gone silent, device speaking the wrong protocol).
    pub fn is_expected(&self) -> bool {
        match self {
            TransportError::Os(_) => self.errno() == Some(libc::ENODEV),
            TransportError::Timedout
            | TransportError::NoHidpp
            | TransportError::UnsupportedProtocolVersion(_) => true,
            _ => false,
        }
    }

    /// Whether a flush-and-ping resync may bring the connection back.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransportError::Os(_) => {
                matches!(self.errno(), Some(libc::EIO) | Some(libc::EINTR))
            }
            TransportError::HidError(_) => false,
            _ => true,
        }
    }
}

impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        TransportError::HidError(e.to_string())
    }
}

impl From<crate::command::ParseError> for TransportError {
    fn from(e: crate::command::ParseError) -> Self {
        TransportError::InvalidResponse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(errno: i32) -> TransportError {
        TransportError::Os(io::Error::from_raw_os_error(errno))
    }

    #[test]
    fn test_expected_classification() {
        assert!(os(libc::ENODEV).is_expected());
        assert!(!os(libc::EIO).is_expected());
        assert!(TransportError::Timedout.is_expected());
        assert!(TransportError::NoHidpp.is_expected());
        assert!(TransportError::UnsupportedProtocolVersion(1).is_expected());
        assert!(!TransportError::Device(0x05).is_expected());
        assert!(!TransportError::MalformedDescriptor.is_expected());
        assert!(!TransportError::FeatureNotFound(0x8080).is_expected());
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(os(libc::EIO).is_recoverable());
        assert!(os(libc::EINTR).is_recoverable());
        assert!(!os(libc::ENODEV).is_recoverable());
        assert!(!os(libc::EACCES).is_recoverable());
        assert!(TransportError::Timedout.is_recoverable());
        assert!(TransportError::IoLength.is_recoverable());
        assert!(TransportError::Device(0x08).is_recoverable());
        assert!(TransportError::InvalidResponse("x".into()).is_recoverable());
        assert!(!TransportError::HidError("enumeration failed".into()).is_recoverable());
    }

    #[test]
    fn test_device_error_display() {
        let msg = TransportError::Device(0x08).to_string();
        assert!(msg.contains("0x08"));
        assert!(msg.contains("busy"));
    }
}
