//! Embedded append-only store for scalar time-series samples.
//!
//! Each store is one file: a fixed-size header holding incrementally
//! maintained aggregates (count, sum, average, min, max) plus lazily
//! cached derived statistics (variance, median), followed by fixed-size
//! records. Every record carries the running cumulative sum of all values
//! so far, which makes windowed averages O(1) regardless of window length.
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ offset 0: Header                            │
//! │  - tag "SDB" + revision byte                │
//! │  - name, flags, count                       │
//! │  - sum, average, min, max, variance, median │
//! ├─────────────────────────────────────────────┤
//! │ Record[0]: timestamp, value, running sum    │
//! │ Record[1]: ...                              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use seriesdb::Store;
//!
//! # fn main() -> seriesdb::Result<()> {
//! let mut store = Store::open("readings.sdb", "readings")?;
//! store.append(0.5)?;
//! store.append(1.5)?;
//! assert_eq!(store.count(), 2);
//! assert_eq!(store.average(), 1.0);
//! store.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Precision is a compile-time choice recorded in the file: `f32` by
//! default, `f64` with the `double` feature. A store written by one build
//! is rejected by the other at open time.

pub mod error;
pub mod header;
pub mod io;
pub mod map;
pub mod record;
pub mod registry;
pub mod store;
pub mod value;

// Re-export commonly used types
pub use error::{Result, StoreError};
pub use header::{Flags, Header, FORMAT_VERSION, HEADER_SIZE, MAGIC, NAME_SIZE};
pub use io::StoreFile;
pub use map::{FixedMap, SlotKey};
pub use record::{Record, RECORD_SIZE};
pub use registry::{SharedStore, StoreRegistry, WindowCache};
pub use store::{Store, Summary};
pub use value::{Value, UNKNOWN, VALUE_SIZE};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
