//! Sample record codec.

use crate::error::{Result, StoreError};
use crate::value::{read_value, Value, VALUE_SIZE};

/// Encoded record width: timestamp + value + running sum.
pub const RECORD_SIZE: usize = 8 + 2 * VALUE_SIZE;

/// One sample.
///
/// `running_sum` is the cumulative sum of every value from record 0
/// through this record inclusive. Subtracting two running sums yields any
/// range sum in O(1), which is what makes windowed averages cheap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub value: Value,
    pub running_sum: Value,
}

impl Record {
    pub fn new(timestamp: u64, value: Value, running_sum: Value) -> Self {
        Record {
            timestamp,
            value,
            running_sum,
        }
    }

    /// Serialize record to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(RECORD_SIZE);
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&self.value.to_le_bytes());
        bytes.extend_from_slice(&self.running_sum.to_le_bytes());
        bytes
    }

    /// Deserialize record from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RECORD_SIZE {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "insufficient bytes for record",
            )));
        }

        let timestamp = u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]);

        Ok(Record {
            timestamp,
            value: read_value(bytes, 8),
            running_sum: read_value(bytes, 8 + VALUE_SIZE),
        })
    }
}

/// Current wall clock as seconds since the Unix epoch.
pub(crate) fn wall_clock() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trip() {
        let record = Record::new(1_700_000_000, 2.5, 10.25);
        let bytes = record.to_bytes();
        assert_eq!(bytes.len(), RECORD_SIZE);

        let decoded = Record::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_short_buffer() {
        let bytes = Record::new(0, 0.0, 0.0).to_bytes();
        assert!(Record::from_bytes(&bytes[..RECORD_SIZE - 1]).is_err());
    }

    #[test]
    fn test_wall_clock_advances() {
        // Sanity: well past 2020-01-01.
        assert!(wall_clock() > 1_577_836_800);
    }
}
