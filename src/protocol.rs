// Keyboard RTC Sync Protocol
// Wire format for the 32-byte clock-set command

/// Fixed 4-byte command header.
pub const HEADER: [u8; 4] = [0x0C, 0x10, 0x00, 0x00];

/// Fixed 2-byte flags following the header.
pub const FLAGS: [u8; 2] = [0x01, 0x5A];

/// Literal prefix of the padding block; the rest is zero fill.
pub const PADDING_PREFIX: [u8; 8] = [0x00, 0x01, 0x00, 0x00, 0x00, 0xAA, 0x55, 0x00];

/// Total command size including the trailing checksum byte.
pub const PACKET_SIZE: usize = 32;

/// Byte range covered by the checksum (flags + time + padding, header excluded).
const CHECKSUM_RANGE: std::ops::RangeInclusive<usize> = 4..=30;

/// Calendar timestamp to write into the keyboard RTC.
///
/// Fields are taken verbatim; the firmware expects 1-based month/day and
/// 24-hour time. Years before 2000 or after 2255 wrap in the year byte and
/// are the caller's responsibility to avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl From<chrono::NaiveDateTime> for TargetTime {
    fn from(dt: chrono::NaiveDateTime) -> Self {
        use chrono::{Datelike, Timelike};
        Self {
            year: dt.year() as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
        }
    }
}

/// Immutable 32-byte clock-set command, ready to write to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncCommand {
    buf: [u8; PACKET_SIZE],
}

impl SyncCommand {
    pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.buf
    }
}

impl AsRef<[u8]> for SyncCommand {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

/// XOR-fold checksum over bytes 4..=30.
///
/// The header is deliberately excluded; the firmware checks only the
/// flags/time/padding region.
pub fn checksum(buf: &[u8; PACKET_SIZE]) -> u8 {
    buf[CHECKSUM_RANGE].iter().fold(0, |acc, &b| acc ^ b)
}

/// Build the clock-set command for a timestamp.
///
/// Layout: header (4) + flags (2) + year-since-2000, month, day, hour,
/// minute, second (6) + padding (19) + checksum (1).
pub fn build_sync_command(time: &TargetTime) -> SyncCommand {
    let mut buf = [0u8; PACKET_SIZE];

    buf[0..4].copy_from_slice(&HEADER);
    buf[4..6].copy_from_slice(&FLAGS);

    buf[6] = (time.year.wrapping_sub(2000) & 0xFF) as u8;
    buf[7] = time.month;
    buf[8] = time.day;
    buf[9] = time.hour;
    buf[10] = time.minute;
    buf[11] = time.second;

    buf[12..20].copy_from_slice(&PADDING_PREFIX);
    // bytes 20..31 stay zero

    buf[31] = checksum(&buf);

    SyncCommand { buf }
}
