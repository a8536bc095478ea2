// Keyboard RTC Sync - Shared Library
// Wire format, device discovery, and HID transmission

pub mod error;
pub mod hid;
pub mod protocol;
pub mod sync;

pub use error::SyncError;
pub use hid::{DeviceDescriptor, HidBackend, HidWriter, HidapiBackend};
pub use protocol::{build_sync_command, SyncCommand, TargetTime, PACKET_SIZE};
pub use sync::{ClockSync, SyncConfig};
