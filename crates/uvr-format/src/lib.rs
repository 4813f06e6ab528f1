//! JASMES UVR product format.
//!
//! Pure decoding of the satellite radiation products distributed by the
//! JAXA JASMES archive:
//!
//! - [`filename`] parses the fixed 44-character product filename into
//!   [`ProductMetadata`]
//! - [`record`] decodes the binary record (ASCII header + raw samples) into
//!   a [`CalibratedGrid`]
//! - [`grid`] holds the calibrated, masked grid and time concatenation
//!
//! Nothing in this crate performs I/O, so every function is safe to call
//! concurrently across files.

pub mod error;
pub mod filename;
pub mod grid;
pub mod record;
pub mod tables;

pub use error::{DecodeError, DecodeResult, GridError, NameError, NameResult};
pub use filename::{parse as parse_filename, parse_remote_name, ProductMetadata, NAME_LEN};
pub use grid::{CalibratedGrid, GridStatistics, Samples, StorageEncoding};
pub use record::{decode, decode_named, read_header, RecordHeader};
pub use tables::{Average, Instrument, SampleEncoding, Variable};
