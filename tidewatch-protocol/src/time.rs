//! Calendar timestamps as carried in platform payloads
//!
//! Every timestamped payload uses the same 7-byte layout: year (u16 BE),
//! month, day, hour, minute, second.

/// Encoded size of a [`PlatformTime`]
pub const TIME_LEN: usize = 7;

/// Minimum payload size of a time-sync response (flag byte + timestamp)
pub const TIME_SYNC_RESPONSE_LEN: usize = 1 + TIME_LEN;

/// Errors from timestamp parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeError {
    /// Not enough bytes for a timestamp
    Truncated,
    /// A field is outside its calendar range
    OutOfRange,
}

/// Wall-clock time as exchanged with the platform (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlatformTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl PlatformTime {
    /// Earliest year the platform hands out
    pub const MIN_YEAR: u16 = 2000;
    /// Latest year accepted from the platform
    pub const MAX_YEAR: u16 = 2100;

    /// Create a timestamp without validation
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Encode into the 7-byte wire layout
    pub fn to_bytes(&self) -> [u8; TIME_LEN] {
        let year = self.year.to_be_bytes();
        [
            year[0],
            year[1],
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        ]
    }

    /// Decode from the 7-byte wire layout, without range checks
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TimeError> {
        if bytes.len() < TIME_LEN {
            return Err(TimeError::Truncated);
        }
        Ok(Self {
            year: u16::from_be_bytes([bytes[0], bytes[1]]),
            month: bytes[2],
            day: bytes[3],
            hour: bytes[4],
            minute: bytes[5],
            second: bytes[6],
        })
    }

    /// Parse the platform's time-sync response payload.
    ///
    /// Byte 0 is a platform flag and is ignored; the timestamp follows.
    /// The result is range checked.
    pub fn from_time_sync_payload(payload: &[u8]) -> Result<Self, TimeError> {
        if payload.len() < TIME_SYNC_RESPONSE_LEN {
            return Err(TimeError::Truncated);
        }
        let time = Self::from_bytes(&payload[1..])?;
        time.validate()?;
        Ok(time)
    }

    /// Check every field against its calendar range
    pub fn validate(&self) -> Result<(), TimeError> {
        let in_range = (Self::MIN_YEAR..=Self::MAX_YEAR).contains(&self.year)
            && (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && self.hour <= 23
            && self.minute <= 59
            && self.second <= 59;

        if in_range {
            Ok(())
        } else {
            Err(TimeError::OutOfRange)
        }
    }
}
