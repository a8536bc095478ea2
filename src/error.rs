//! Sync error types

use thiserror::Error;

/// Errors that can occur during one sync attempt
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No matching keyboard interface found (VID {vid:04X} PID {pid:04X}, interface {interface})")]
    DeviceNotFound { vid: u16, pid: u16, interface: i32 },

    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("HID error: {0}")]
    Hid(String),
}

impl From<hidapi::HidError> for SyncError {
    fn from(e: hidapi::HidError) -> Self {
        SyncError::Hid(e.to_string())
    }
}
