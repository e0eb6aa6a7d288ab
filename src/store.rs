//! Store lifecycle and aggregate engine.
//!
//! A [`Store`] is a handle over one backing file. The header is kept in
//! memory and persisted on every mutation; variance and median are
//! computed lazily over a full scan and cached behind the header flag
//! bits until the next append invalidates them.

use crate::error::{Result, StoreError};
use crate::header::{Flags, Header, HEADER_SIZE, NAME_SIZE};
use crate::io::StoreFile;
use crate::record::{wall_clock, Record, RECORD_SIZE};
use crate::value::{self, Value, UNKNOWN};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Lifecycle state of a handle.
///
/// `Finalized` is terminal but re-enterable through [`Store::reopen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Initialized,
    Finalized,
}

/// Snapshot of the incrementally maintained aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub name: String,
    pub count: u32,
    pub sum: Value,
    pub average: Value,
    pub min: Value,
    pub max: Value,
}

/// An open handle to one store file.
pub struct Store {
    state: State,
    path: PathBuf,
    name: String,
    file: Option<StoreFile>,
    header: Header,
}

impl Store {
    /// Open the store at `path`, creating it if absent.
    ///
    /// For an existing file the stored name must equal `name`, the
    /// precision flags must agree with the compiled precision, and the
    /// record region must agree with the header count; any disagreement
    /// fails the open and leaves no handle behind.
    pub fn open<P: AsRef<Path>>(path: P, name: &str) -> Result<Self> {
        let mut store = Store {
            state: State::Uninitialized,
            path: path.as_ref().to_path_buf(),
            name: name.to_string(),
            file: None,
            header: Header::default(),
        };
        store.initialize()?;
        Ok(store)
    }

    /// No-op success when already initialized; otherwise runs the open
    /// sequence again against the same path and name.
    pub fn reopen(&mut self) -> Result<()> {
        if self.state == State::Initialized {
            return Ok(());
        }
        self.initialize()
    }

    /// Close the handle: release the file and zero the in-memory header.
    ///
    /// Idempotent; succeeds on an already finalized handle. No extra
    /// flush is needed since every mutation is flushed synchronously.
    pub fn close(&mut self) -> Result<()> {
        let result = match self.file.take() {
            Some(mut file) => file.sync(),
            None => Ok(()),
        };
        self.header = Header::default();
        self.state = State::Finalized;
        result
    }

    pub fn is_open(&self) -> bool {
        self.state == State::Initialized
    }

    /// Requested store identity.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn initialize(&mut self) -> Result<()> {
        if self.name.len() > NAME_SIZE {
            return Err(StoreError::NameTooLong(self.name.len()));
        }

        match StoreFile::open(&self.path) {
            Ok(file) => self.load_existing(file),
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                self.create_fresh()
            }
            Err(e) => Err(e),
        }
    }

    fn create_fresh(&mut self) -> Result<()> {
        let header = Header::new(&self.name)?;
        let file = StoreFile::create(&self.path, &header)?;

        self.header = header;
        self.file = Some(file);
        self.state = State::Initialized;
        tracing::debug!(path = %self.path.display(), name = %self.name, "created store");
        Ok(())
    }

    fn load_existing(&mut self, mut file: StoreFile) -> Result<()> {
        let header = match file.read_header() {
            Ok(header) => header,
            Err(e) => {
                self.abandon();
                return Err(e);
            }
        };

        if header.name() != self.name {
            let err = StoreError::NameMismatch {
                expected: self.name.clone(),
                found: header.name().to_string(),
            };
            self.abandon();
            return Err(err);
        }

        if !header.flags.precision_matches() {
            self.abandon();
            return Err(StoreError::PrecisionMismatch(header.flags.0));
        }

        let expected = HEADER_SIZE as u64 + header.count as u64 * RECORD_SIZE as u64;
        let actual = match file.file_len() {
            Ok(len) => len,
            Err(e) => {
                self.abandon();
                return Err(e);
            }
        };
        if actual != expected {
            self.abandon();
            return Err(StoreError::Corrupted(format!(
                "header count {} implies {} bytes, file has {}",
                header.count, expected, actual
            )));
        }

        if header.count > 0 {
            let last = match file.read_record(header.count - 1) {
                Ok(record) => record,
                Err(e) => {
                    self.abandon();
                    return Err(e);
                }
            };
            if last.running_sum.to_bits() != header.sum.to_bits() {
                self.abandon();
                return Err(StoreError::Corrupted(
                    "trailing running sum disagrees with header sum".to_string(),
                ));
            }
        }

        self.header = header;
        self.file = Some(file);
        self.state = State::Initialized;
        tracing::debug!(
            path = %self.path.display(),
            name = %self.name,
            count = header.count,
            "opened store"
        );
        Ok(())
    }

    /// Failed-open cleanup: drop the file and land in `Finalized`.
    fn abandon(&mut self) {
        self.file = None;
        self.header = Header::default();
        self.state = State::Finalized;
    }

    fn open_or_warn(&self) -> bool {
        if self.state != State::Initialized {
            tracing::warn!(name = %self.name, "store is not initialized");
            return false;
        }
        true
    }

    fn write_header(&mut self) -> Result<()> {
        let file = self.file.as_mut().ok_or(StoreError::NotOpen)?;
        file.write_header(&self.header)
    }

    /// Append a sample stamped with the current wall clock.
    pub fn append(&mut self, value: Value) -> Result<()> {
        self.append_at(wall_clock(), value)
    }

    /// Append a sample with an explicit timestamp.
    ///
    /// The header is persisted before the record. A failed header write
    /// rolls the in-memory header back to its snapshot; a failed record
    /// write leaves the already persisted header in place, which the next
    /// open reports as a count/length disagreement.
    pub fn append_at(&mut self, timestamp: u64, value: Value) -> Result<()> {
        if self.state != State::Initialized {
            return Err(StoreError::NotOpen);
        }

        let snapshot = self.header;

        self.header.flags.clear(Flags::VARIANCE_CACHED | Flags::MEDIAN_CACHED);
        self.header.count += 1;
        self.header.sum += value;
        self.header.average = self.header.sum / self.header.count as Value;
        if value < self.header.min {
            self.header.min = value;
        }
        if value > self.header.max {
            self.header.max = value;
        }
        self.header.variance = UNKNOWN;
        self.header.median = UNKNOWN;

        if let Err(e) = self.write_header() {
            self.header = snapshot;
            return Err(e);
        }

        let record = Record::new(timestamp, value, self.header.sum);
        let file = self.file.as_mut().ok_or(StoreError::NotOpen)?;
        file.append_record(&record)
    }

    /// Number of records. 0 when the handle is not initialized.
    pub fn count(&self) -> u32 {
        if !self.open_or_warn() {
            return 0;
        }
        self.header.count
    }

    pub fn sum(&self) -> Value {
        if !self.open_or_warn() {
            return 0.0;
        }
        self.header.sum
    }

    pub fn average(&self) -> Value {
        if !self.open_or_warn() {
            return 0.0;
        }
        self.header.average
    }

    pub fn min(&self) -> Value {
        if !self.open_or_warn() {
            return Value::INFINITY;
        }
        self.header.min
    }

    pub fn max(&self) -> Value {
        if !self.open_or_warn() {
            return Value::NEG_INFINITY;
        }
        self.header.max
    }

    /// Aggregate snapshot for read-only consumers.
    pub fn summary(&self) -> Summary {
        Summary {
            name: self.header.name().to_string(),
            count: self.count(),
            sum: self.sum(),
            average: self.average(),
            min: self.min(),
            max: self.max(),
        }
    }

    /// Fetch record `index`.
    ///
    /// `None` when the index is out of range or the handle is not
    /// initialized; I/O failures are real errors.
    pub fn record(&mut self, index: u32) -> Result<Option<Record>> {
        if !self.open_or_warn() {
            return Ok(None);
        }
        if index >= self.header.count {
            return Ok(None);
        }

        let file = self.file.as_mut().ok_or(StoreError::NotOpen)?;
        Ok(Some(file.read_record(index)?))
    }

    /// Fetch with the value remapped from `[min, max]` into `[0, 1]`.
    ///
    /// Not defined for a single-valued series (`min == max`).
    pub fn record_normalized(&mut self, index: u32) -> Result<Option<Record>> {
        let (min, max) = (self.header.min, self.header.max);
        Ok(self.record(index)?.map(|mut record| {
            record.value = value::remap(record.value, min, max, 0.0, 1.0);
            record
        }))
    }

    /// Fetch with the value remapped from `[min, max]` into `[-1, 1]`.
    ///
    /// Not defined for a single-valued series (`min == max`).
    pub fn record_normalized_signed(&mut self, index: u32) -> Result<Option<Record>> {
        let (min, max) = (self.header.min, self.header.max);
        Ok(self.record(index)?.map(|mut record| {
            record.value = value::remap(record.value, min, max, -1.0, 1.0);
            record
        }))
    }

    /// Population variance.
    ///
    /// Cached in the header until the next append; otherwise computed over
    /// a full sequential scan. Returns the unknown sentinel for an empty
    /// or uninitialized store, and when persisting the cache fails.
    pub fn variance(&mut self) -> Value {
        if !self.open_or_warn() {
            return UNKNOWN;
        }
        if self.header.count == 0 {
            return UNKNOWN;
        }
        if self.header.flags.contains(Flags::VARIANCE_CACHED) {
            return self.header.variance;
        }

        let average = self.header.average;
        let mut accum: Value = 0.0;
        for index in 0..self.header.count {
            let record = match self.record(index) {
                Ok(Some(record)) => record,
                _ => return UNKNOWN,
            };
            let difference = record.value - average;
            accum += difference * difference;
        }
        let variance = accum / self.header.count as Value;

        let snapshot = self.header;
        self.header.flags.set(Flags::VARIANCE_CACHED);
        self.header.variance = variance;
        if let Err(e) = self.write_header() {
            tracing::warn!(error = %e, "failed to persist variance cache");
            self.header = snapshot;
            return UNKNOWN;
        }

        variance
    }

    /// Square root of the population variance; unknown propagates.
    pub fn stddev(&mut self) -> Value {
        let variance = self.variance();
        if variance == UNKNOWN {
            return UNKNOWN;
        }
        variance.sqrt()
    }

    /// Median value.
    ///
    /// Cached like the variance; otherwise every value is scanned into a
    /// scratch buffer and sorted. A failed scratch allocation returns the
    /// unknown sentinel without caching.
    pub fn median(&mut self) -> Value {
        if !self.open_or_warn() {
            return UNKNOWN;
        }
        let count = self.header.count;
        if count == 0 {
            return UNKNOWN;
        }
        if self.header.flags.contains(Flags::MEDIAN_CACHED) {
            return self.header.median;
        }

        let mut values: Vec<Value> = Vec::new();
        if values.try_reserve_exact(count as usize).is_err() {
            tracing::error!(count, "scratch allocation for median failed");
            return UNKNOWN;
        }
        for index in 0..count {
            match self.record(index) {
                Ok(Some(record)) => values.push(record.value),
                _ => return UNKNOWN,
            }
        }

        values.sort_by(value::compare);
        let mid = (count / 2) as usize;
        let median = if count % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };

        let snapshot = self.header;
        self.header.flags.set(Flags::MEDIAN_CACHED);
        self.header.median = median;
        if let Err(e) = self.write_header() {
            tracing::warn!(error = %e, "failed to persist median cache");
            self.header = snapshot;
            return UNKNOWN;
        }

        median
    }

    /// Windowed (moving) average of the `window` samples ending at `index`.
    ///
    /// O(1) regardless of window length: the difference of two running
    /// sums divided by the window. Returns 0 for a zero-length window and
    /// for windows extending out of range; I/O failures also degrade to 0
    /// with a diagnostic.
    pub fn moving_average(&mut self, index: u32, window: u32) -> Value {
        if !self.open_or_warn() {
            return 0.0;
        }
        if window == 0 || index >= self.header.count || window > index + 1 {
            return 0.0;
        }

        let last = match self.record(index) {
            Ok(Some(record)) => record,
            Ok(None) => return 0.0,
            Err(e) => {
                tracing::warn!(error = %e, index, "moving average read failed");
                return 0.0;
            }
        };

        // Sum of everything before the window; zero when the window
        // starts at record 0.
        let base = if window == index + 1 {
            0.0
        } else {
            match self.record(index - window) {
                Ok(Some(record)) => record.running_sum,
                Ok(None) => return 0.0,
                Err(e) => {
                    tracing::warn!(error = %e, index, window, "moving average read failed");
                    return 0.0;
                }
            }
        };

        (last.running_sum - base) / window as Value
    }
}
