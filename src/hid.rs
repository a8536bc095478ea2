//! HID backend abstraction
//!
//! The sync logic only needs enumerate/open/write from the host HID
//! subsystem. Putting those behind a trait keeps `hidapi` at the edge and
//! lets the discovery and write-fallback paths run against a mock in tests.

use std::ffi::{CStr, CString};

use hidapi::HidApi;

use crate::error::SyncError;

/// One logical HID interface as reported by enumeration.
///
/// Transient: only valid for the discovery pass that produced it.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Interface number, if the platform backend reports one
    pub interface_number: Option<i32>,
    /// Opaque platform path used to open the device
    pub path: CString,
}

impl DeviceDescriptor {
    /// Lossy display form of the platform path.
    pub fn path_string(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Open device handle that accepts output reports.
///
/// The handle is closed when the value is dropped.
pub trait HidWriter {
    /// Write one output report, returning the accepted byte count.
    fn write(&mut self, data: &[u8]) -> Result<usize, SyncError>;
}

/// Host HID subsystem capability: enumerate and open devices.
pub trait HidBackend {
    type Writer: HidWriter;

    /// List all HID interfaces currently exposed by the host.
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, SyncError>;

    /// Open a device by its enumeration path.
    fn open(&self, path: &CStr) -> Result<Self::Writer, SyncError>;
}

/// `hidapi`-backed implementation used by the CLI.
pub struct HidapiBackend {
    api: HidApi,
}

impl HidapiBackend {
    pub fn new() -> Result<Self, SyncError> {
        Ok(Self {
            api: HidApi::new()?,
        })
    }
}

impl HidBackend for HidapiBackend {
    type Writer = HidapiWriter;

    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, SyncError> {
        Ok(self
            .api
            .device_list()
            .map(|info| DeviceDescriptor {
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                // hidapi reports -1 when the platform does not expose one
                interface_number: match info.interface_number() {
                    n if n < 0 => None,
                    n => Some(n),
                },
                path: info.path().to_owned(),
            })
            .collect())
    }

    fn open(&self, path: &CStr) -> Result<Self::Writer, SyncError> {
        let device = self
            .api
            .open_path(path)
            .map_err(|e| SyncError::OpenFailed(e.to_string()))?;
        Ok(HidapiWriter { device })
    }
}

/// Owned `hidapi` device handle; drop closes it.
pub struct HidapiWriter {
    device: hidapi::HidDevice,
}

impl HidWriter for HidapiWriter {
    fn write(&mut self, data: &[u8]) -> Result<usize, SyncError> {
        self.device
            .write(data)
            .map_err(|e| SyncError::WriteFailed(e.to_string()))
    }
}
