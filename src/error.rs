use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid magic tag in header")]
    InvalidMagic,

    #[error("unsupported format revision: {found}")]
    UnsupportedVersion { found: u8 },

    #[error("store name mismatch: file has {found:?}, requested {expected:?}")]
    NameMismatch { expected: String, found: String },

    #[error("store name is {0} bytes, above the 10 byte limit")]
    NameTooLong(usize),

    #[error("file precision flags ({0:#06x}) do not match the compiled precision")]
    PrecisionMismatch(u16),

    #[error("store file is corrupted: {0}")]
    Corrupted(String),

    #[error("store is not initialized")]
    NotOpen,

    #[error("table full: no free slot within probe distance")]
    TableFull,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
