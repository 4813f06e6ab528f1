//! Transfer, decompression, decoding and persistence of one product file.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use grid_store::GridStore;
use tracing::{debug, instrument, warn};
use uvr_format::filename::strip_compression;
use uvr_format::{decode, parse_filename, CalibratedGrid};

use crate::error::FetchResult;
use crate::remote::{RemoteError, RemoteFile, RemoteSource};

const PARTIAL_SUFFIX: &str = "partial";

/// Decompress gzip-compressed data.
pub fn decompress_gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

/// Decode the contents of a remote file, unpacking it first if its name
/// carries the `.gz` suffix.
pub fn decode_remote(remote_name: &str, data: &[u8]) -> FetchResult<CalibratedGrid> {
    let (name, compressed) = strip_compression(remote_name);
    let meta = parse_filename(name)?;

    let grid = if compressed {
        let raw = decompress_gzip(data).map_err(|e| RemoteError::TransferFailure {
            location: remote_name.to_string(),
            reason: format!("gzip: {e}"),
        })?;
        decode(&meta, &raw)?
    } else {
        decode(&meta, data)?
    };
    Ok(grid)
}

/// Fetch a remote product file and decode it into a calibrated grid.
#[instrument(skip(source, file), fields(url = %file.url))]
pub async fn download(source: &dyn RemoteSource, file: &RemoteFile) -> FetchResult<CalibratedGrid> {
    let data = source.fetch(&file.path).await?;
    debug!(bytes = data.len(), "Fetched remote file");

    let name = file.name().to_string();
    tokio::task::spawn_blocking(move || decode_remote(&name, &data)).await?
}

/// Sibling path used while a file is being written.
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    destination.with_file_name(name)
}

/// Write one grid to `destination`.
///
/// The dataset is written under a `.partial` name and renamed into place, so
/// an interrupted run never leaves a half-written file at the final path.
pub fn persist(store: &dyn GridStore, grid: &CalibratedGrid, destination: &Path) -> FetchResult<()> {
    let partial = partial_path(destination);
    if let Err(e) = store.write(std::slice::from_ref(grid), &partial) {
        remove_partial(&partial);
        return Err(e.into());
    }
    if let Err(e) = std::fs::rename(&partial, destination) {
        remove_partial(&partial);
        return Err(e.into());
    }
    Ok(())
}

/// [`persist`] on the blocking pool.
pub async fn persist_async(
    store: Arc<dyn GridStore>,
    grid: CalibratedGrid,
    destination: PathBuf,
) -> FetchResult<()> {
    tokio::task::spawn_blocking(move || persist(store.as_ref(), &grid, &destination)).await?
}

fn remove_partial(partial: &Path) {
    if partial.exists() {
        if let Err(e) = std::fs::remove_file(partial) {
            warn!(path = %partial.display(), error = %e, "Failed to remove partial file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use test_utils::{daily_filename, gzip, i16_record, ramp_samples, RecordSpec};
    use uvr_format::{DecodeError, NameError};

    #[test]
    fn test_decompress_gzip_valid() {
        let original = b"Hello, UVR world!";
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        let result = decompress_gzip(&compressed).expect("Should decompress");
        assert_eq!(result, original);
    }

    #[test]
    fn test_decompress_gzip_invalid() {
        assert!(decompress_gzip(b"not gzip data").is_err());
    }

    #[test]
    fn test_decode_remote_gz_and_plain() {
        let spec = RecordSpec::default();
        let record = i16_record(&spec, &ramp_samples(spec.pixels, spec.lines));
        let name = daily_filename("20191105", "uvb");

        let plain = decode_remote(&name, &record).unwrap();
        let packed = decode_remote(&format!("{name}.gz"), &gzip(&record)).unwrap();
        assert_eq!(plain, packed);
    }

    #[test]
    fn test_decode_remote_corrupt_gzip() {
        let name = format!("{}.gz", daily_filename("20191105", "uvb"));
        let err = decode_remote(&name, b"definitely not gzip").unwrap_err();
        assert!(matches!(
            err,
            FetchError::Remote(RemoteError::TransferFailure { .. })
        ));
    }

    #[test]
    fn test_decode_remote_errors() {
        assert!(matches!(
            decode_remote("readme.txt", b""),
            Err(FetchError::Name(NameError::MalformedName { .. }))
        ));

        let spec = RecordSpec::default();
        let mut record = i16_record(&spec, &ramp_samples(spec.pixels, spec.lines));
        record.truncate(record.len() - 10);
        assert!(matches!(
            decode_remote(&daily_filename("20191105", "uvb"), &record),
            Err(FetchError::Decode(DecodeError::TruncatedBody { .. }))
        ));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/data/2019/11/20191105_uvb.nc")),
            PathBuf::from("/data/2019/11/20191105_uvb.nc.partial")
        );
    }
}
