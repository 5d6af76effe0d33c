//! Keyboard interface error types

use keyleds_transport::{BlockId, TransportError};
use thiserror::Error;

/// Errors from keyboard operations
#[derive(Error, Debug)]
pub enum KeyboardError {
    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The device has no key block with this id
    #[error("Unknown key block: {0}")]
    UnknownBlock(BlockId),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Feature not supported by this device
    #[error("Feature not supported: {0}")]
    NotSupported(String),
}

impl KeyboardError {
    /// Normal outcome that should not alarm the user: unplug, timeout,
    /// a node that is not a HID++ 2.0 device.
    pub fn is_expected(&self) -> bool {
        match self {
            KeyboardError::Transport(e) => e.is_expected(),
            _ => false,
        }
    }

    /// Whether a resync may bring the device back
    pub fn is_recoverable(&self) -> bool {
        match self {
            KeyboardError::Transport(e) => e.is_recoverable(),
            _ => true,
        }
    }
}
