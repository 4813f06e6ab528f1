//! Error types for filename parsing, record decoding and grid assembly.

use thiserror::Error;

/// Result type for filename parsing.
pub type NameResult<T> = Result<T, NameError>;

/// Result type for record decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// A product filename that does not follow the fixed 44-character layout.
///
/// Every variant except `MalformedName` carries the offending substring and
/// the whole filename.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("expected a filename of {expected} characters, got {actual}: {name}")]
    MalformedName {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("parsing {name}: unknown instrument {value}")]
    UnknownInstrument { value: String, name: String },

    #[error("parsing {name}: cannot parse start date {value}")]
    BadDate { value: String, name: String },

    #[error("parsing {name}: unknown average {value}")]
    UnknownAverage { value: String, name: String },

    #[error("parsing {name}: cannot parse number of pixels {value}")]
    BadPixelCount { value: String, name: String },

    #[error("parsing {name}: cannot parse number of lines {value}")]
    BadLineCount { value: String, name: String },

    #[error("parsing {name}: unknown variable {value}")]
    UnknownVariable { value: String, name: String },

    #[error("parsing {name}: unknown data type {value}")]
    UnknownEncoding { value: String, name: String },
}

/// A record body that cannot be turned into a calibrated grid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error(transparent)]
    Name(#[from] NameError),

    #[error("corrupt header field {field}: {reason}")]
    CorruptHeader { field: &'static str, reason: String },

    #[error(
        "header dimensions {header_pixels}x{header_lines} do not match filename {name_pixels}x{name_lines}"
    )]
    InconsistentDimensions {
        header_pixels: usize,
        header_lines: usize,
        name_pixels: usize,
        name_lines: usize,
    },

    #[error("record body has {actual} bytes, expected {expected}")]
    TruncatedBody { expected: usize, actual: usize },

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Grids that cannot be stacked along the time axis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("no grids to concatenate")]
    Empty,

    #[error("cannot concatenate {found} onto {expected}")]
    VariableMismatch { expected: String, found: String },

    #[error("coordinate axis {axis} differs between grids")]
    CoordinateMismatch { axis: &'static str },

    #[error("sample encoding {found} differs from {expected}")]
    EncodingMismatch { expected: String, found: String },

    #[error("sample buffer of {actual} values does not fit shape {shape:?}")]
    ShapeMismatch { shape: [usize; 3], actual: usize },
}
