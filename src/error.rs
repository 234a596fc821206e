use std::path::PathBuf;
use thiserror::Error;

//-------------------------------------------------------------------------

/// Error kinds the engine and façade can produce.
///
/// Lower layers (block device, codecs, engine) return these directly;
/// orchestration code above them uses `anyhow::Result` and only downcasts
/// back to this type where a specific exit code or message is required.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Error: File already exists.")]
    PathConflict(PathBuf),

    #[error("Error: Output file already exists.")]
    OutputConflict(PathBuf),

    #[error("Error: file not found: {0}")]
    MissingInput(PathBuf),

    #[error("Error: Invalid index file: magic mismatch")]
    BadMagic,

    #[error("Error: Key not found")]
    KeyNotFound(u64),

    #[error("Error: duplicate key {0}")]
    DuplicateKey(u64),

    #[error("{0}")]
    MalformedCommand(String),

    #[error("Error: malformed input: {0}")]
    ParseFailure(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;

//-------------------------------------------------------------------------
