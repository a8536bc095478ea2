//! Device discovery and clock-set transmission

use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::hid::{DeviceDescriptor, HidBackend, HidWriter};
use crate::protocol::{build_sync_command, TargetTime};

/// Report ID 0 prefix tried on the first write attempt.
const REPORT_ID: u8 = 0x00;

/// Target device identification.
///
/// An explicit immutable value passed in at construction; there is no
/// process-wide device configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Interface number of the vendor endpoint that accepts the clock command
    pub target_interface: i32,
    /// Case-insensitive substring matched against the device path when the
    /// platform backend does not report interface numbers (e.g. `MI_03` on
    /// Windows paths). Heuristic; the interface number is checked first.
    pub path_hint: &'static str,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0x05AC,
            product_id: 0x024F,
            target_interface: 3,
            path_hint: "mi_03",
        }
    }
}

/// Writes clock-set commands to the keyboard's vendor interface.
pub struct ClockSync<B: HidBackend> {
    backend: B,
    config: SyncConfig,
}

impl<B: HidBackend> ClockSync<B> {
    pub fn new(backend: B, config: SyncConfig) -> Self {
        Self { backend, config }
    }

    /// All enumerated interfaces matching the configured VID/PID.
    pub fn candidates(&self) -> Result<Vec<DeviceDescriptor>, SyncError> {
        Ok(self
            .backend
            .enumerate()?
            .into_iter()
            .filter(|d| {
                d.vendor_id == self.config.vendor_id && d.product_id == self.config.product_id
            })
            .collect())
    }

    /// Whether a candidate is the vendor interface to write to.
    ///
    /// Interface number metadata wins; the path substring is a fallback for
    /// backends that only expose it in the path string.
    pub fn is_target_interface(&self, device: &DeviceDescriptor) -> bool {
        if device.interface_number == Some(self.config.target_interface) {
            return true;
        }
        device
            .path
            .to_string_lossy()
            .to_lowercase()
            .contains(self.config.path_hint)
    }

    /// Find the vendor interface among the enumerated devices.
    pub fn find_device(&self) -> Result<DeviceDescriptor, SyncError> {
        let candidates = self.candidates()?;
        debug!(
            "Found {} interface(s) for {:04X}:{:04X}",
            candidates.len(),
            self.config.vendor_id,
            self.config.product_id
        );

        candidates
            .into_iter()
            .find(|d| self.is_target_interface(d))
            .ok_or(SyncError::DeviceNotFound {
                vid: self.config.vendor_id,
                pid: self.config.product_id,
                interface: self.config.target_interface,
            })
    }

    /// Build the command for `time` and write it to the device.
    ///
    /// The first attempt prepends a report ID 0 byte (the common convention
    /// for output reports). If the transport rejects that write, a single
    /// retry sends the bare 32-byte command; some platform backends want one
    /// framing, some the other, depending on the report descriptor.
    ///
    /// The device handle is dropped (closed) on every exit path.
    pub fn sync(&self, time: &TargetTime) -> Result<(), SyncError> {
        let target = self.find_device()?;
        info!("Using device path {}", target.path_string());

        let mut device = self.backend.open(&target.path)?;

        let packet = build_sync_command(time);
        debug!("Clock-set packet: {:02X?}", packet.as_bytes());

        let mut report = [0u8; 33];
        report[0] = REPORT_ID;
        report[1..].copy_from_slice(packet.as_bytes());

        let written = match device.write(&report) {
            Ok(n) => n,
            Err(e) => {
                warn!("Prefixed write rejected ({}), retrying without report ID", e);
                device.write(packet.as_bytes())?
            }
        };

        if written == 0 {
            return Err(SyncError::WriteFailed("device accepted 0 bytes".into()));
        }

        debug!("Wrote {} bytes", written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::ffi::{CStr, CString};
    use std::rc::Rc;

    fn descriptor(vid: u16, pid: u16, interface: Option<i32>, path: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            vendor_id: vid,
            product_id: pid,
            interface_number: interface,
            path: CString::new(path).unwrap(),
        }
    }

    /// Scripted write outcomes for the mock device.
    #[derive(Clone, Copy)]
    enum WriteScript {
        /// Both attempts succeed with the given count
        Accept(usize),
        /// Prefixed write errors, raw retry succeeds with the given count
        RejectPrefixed(usize),
        /// Every write errors
        RejectAll,
    }

    /// Call log shared between backend and writer handles.
    #[derive(Default)]
    struct CallLog {
        opened: Vec<CString>,
        writes: Vec<Vec<u8>>,
    }

    struct MockBackend {
        devices: Vec<DeviceDescriptor>,
        script: WriteScript,
        log: Rc<RefCell<CallLog>>,
    }

    impl MockBackend {
        fn new(devices: Vec<DeviceDescriptor>, script: WriteScript) -> Self {
            Self {
                devices,
                script,
                log: Rc::new(RefCell::new(CallLog::default())),
            }
        }
    }

    struct MockWriter {
        script: WriteScript,
        log: Rc<RefCell<CallLog>>,
        attempts: usize,
    }

    impl HidWriter for MockWriter {
        fn write(&mut self, data: &[u8]) -> Result<usize, SyncError> {
            self.log.borrow_mut().writes.push(data.to_vec());
            self.attempts += 1;
            match self.script {
                WriteScript::Accept(n) => Ok(n),
                WriteScript::RejectPrefixed(n) if self.attempts > 1 => Ok(n),
                _ => Err(SyncError::WriteFailed("mock transport error".into())),
            }
        }
    }

    impl HidBackend for MockBackend {
        type Writer = MockWriter;

        fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, SyncError> {
            Ok(self.devices.clone())
        }

        fn open(&self, path: &CStr) -> Result<Self::Writer, SyncError> {
            self.log.borrow_mut().opened.push(path.to_owned());
            Ok(MockWriter {
                script: self.script,
                log: Rc::clone(&self.log),
                attempts: 0,
            })
        }
    }

    fn sample_time() -> TargetTime {
        TargetTime {
            year: 2025,
            month: 5,
            day: 20,
            hour: 18,
            minute: 30,
            second: 0,
        }
    }

    #[test]
    fn test_selects_interface_number_match() {
        let backend = MockBackend::new(
            vec![
                descriptor(0x05AC, 0x024F, Some(0), "/dev/hidraw0"),
                descriptor(0x05AC, 0x024F, Some(1), "/dev/hidraw1"),
                descriptor(0x05AC, 0x024F, Some(3), "/dev/hidraw3"),
            ],
            WriteScript::Accept(33),
        );
        let sync = ClockSync::new(backend, SyncConfig::default());

        let found = sync.find_device().unwrap();
        assert_eq!(found.interface_number, Some(3));
        assert_eq!(found.path_string(), "/dev/hidraw3");
    }

    #[test]
    fn test_path_substring_fallback_any_case() {
        let backend = MockBackend::new(
            vec![
                descriptor(0x05AC, 0x024F, None, r"\\?\hid#vid_05ac&pid_024f&MI_00#a"),
                descriptor(0x05AC, 0x024F, None, r"\\?\hid#vid_05ac&pid_024f&MI_03#b"),
            ],
            WriteScript::Accept(33),
        );
        let sync = ClockSync::new(backend, SyncConfig::default());

        let found = sync.find_device().unwrap();
        assert!(found.path_string().contains("MI_03"));
    }

    #[test]
    fn test_no_match_never_opens() {
        let backend = MockBackend::new(
            vec![
                descriptor(0x1234, 0x5678, Some(3), "/dev/hidraw0"),
                descriptor(0x05AC, 0x9999, Some(3), "/dev/hidraw1"),
            ],
            WriteScript::Accept(33),
        );
        let sync = ClockSync::new(backend, SyncConfig::default());

        let err = sync.sync(&sample_time()).unwrap_err();
        assert!(matches!(err, SyncError::DeviceNotFound { .. }));
        let log = sync.backend.log.borrow();
        assert!(log.opened.is_empty());
        assert!(log.writes.is_empty());
    }

    #[test]
    fn test_wrong_interface_only_is_not_found() {
        let backend = MockBackend::new(
            vec![descriptor(0x05AC, 0x024F, Some(1), "/dev/hidraw1")],
            WriteScript::Accept(33),
        );
        let sync = ClockSync::new(backend, SyncConfig::default());

        assert!(matches!(
            sync.find_device(),
            Err(SyncError::DeviceNotFound { .. })
        ));
    }

    #[test]
    fn test_prefixed_write_framing() {
        let backend = MockBackend::new(
            vec![descriptor(0x05AC, 0x024F, Some(3), "/dev/hidraw3")],
            WriteScript::Accept(33),
        );
        let sync = ClockSync::new(backend, SyncConfig::default());

        sync.sync(&sample_time()).unwrap();

        let log = sync.backend.log.borrow();
        assert_eq!(log.writes.len(), 1);
        assert_eq!(log.writes[0].len(), 33);
        assert_eq!(log.writes[0][0], 0x00);
        assert_eq!(&log.writes[0][1..5], &[0x0C, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn test_raw_retry_after_prefixed_rejection() {
        let backend = MockBackend::new(
            vec![descriptor(0x05AC, 0x024F, Some(3), "/dev/hidraw3")],
            WriteScript::RejectPrefixed(32),
        );
        let sync = ClockSync::new(backend, SyncConfig::default());

        sync.sync(&sample_time()).unwrap();

        let log = sync.backend.log.borrow();
        assert_eq!(log.writes.len(), 2);
        assert_eq!(log.writes[0].len(), 33);
        assert_eq!(log.writes[1].len(), 32);
        assert_eq!(&log.writes[1][0..4], &[0x0C, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn test_both_writes_failing_is_write_failed() {
        let backend = MockBackend::new(
            vec![descriptor(0x05AC, 0x024F, Some(3), "/dev/hidraw3")],
            WriteScript::RejectAll,
        );
        let sync = ClockSync::new(backend, SyncConfig::default());

        let err = sync.sync(&sample_time()).unwrap_err();
        assert!(matches!(err, SyncError::WriteFailed(_)));
        assert_eq!(sync.backend.log.borrow().writes.len(), 2);
    }

    #[test]
    fn test_zero_byte_write_is_write_failed() {
        let backend = MockBackend::new(
            vec![descriptor(0x05AC, 0x024F, Some(3), "/dev/hidraw3")],
            WriteScript::Accept(0),
        );
        let sync = ClockSync::new(backend, SyncConfig::default());

        assert!(matches!(
            sync.sync(&sample_time()),
            Err(SyncError::WriteFailed(_))
        ));
    }
}
