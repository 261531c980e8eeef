use std::io;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// TraceError – everything the library can fail with
// ---------------------------------------------------------------------------

/// Errors raised while loading, validating, querying or batching traces.
///
/// Nothing is recovered locally: a load either fully succeeds or returns one
/// of these with the offending file path and, where it applies, the ordinal
/// index of the sequence.
#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    /// An expected input file does not exist.
    #[error("file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// The deserialized structure does not match the registered schema.
    #[error("schema violation in {}: {detail}", path.display())]
    SchemaViolation { path: PathBuf, detail: String },

    /// A sequence with zero ticks was encountered.
    #[error("sequence {index} in {} has zero ticks", path.display())]
    EmptySequence { path: PathBuf, index: usize },

    #[error("index {index} out of range for {len} sequences")]
    IndexOutOfRange { index: usize, len: usize },

    /// The collation target is shorter than one of the batch's sequences.
    #[error("target length {target} is shorter than batch element {index} ({length} ticks)")]
    TargetTooShort {
        index: usize,
        length: usize,
        target: usize,
    },

    #[error("unknown field name '{name}'")]
    UnknownField { name: String },

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("msgpack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("csv error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

impl TraceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TraceError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn schema(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        TraceError::SchemaViolation {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T, E = TraceError> = std::result::Result<T, E>;
