//! Remote listing with glob expansion.
//!
//! A glob URL such as
//! `ftp://apollo.eorc.jaxa.jp/pub/JASMES/Global_05km/uv[a-b]/daily/201911/*.gz`
//! is split at its first wildcard segment. The literal prefix is listed,
//! entries matching the segment's shell-style pattern are kept, and the
//! remainder is expanded below each match until no wildcard is left.
//!
//! Transport is behind [`RemoteSource`]:
//! - [`FtpSource`]: anonymous FTP, one connection per operation
//! - [`LocalSource`]: `file://` URLs against a local mirror

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use glob::Pattern;
use suppaftp::types::FileType;
use suppaftp::FtpStream;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Characters that mark a path segment as a glob pattern.
pub const WILDCARDS: [char; 3] = ['*', '?', '['];

const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";
const DEFAULT_FTP_PORT: u16 = 21;

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors from listing or transferring remote files.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme {0}")]
    UnsupportedScheme(String),

    #[error("invalid glob pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A directory could not be reached or listed.
    #[error("remote location {location} unavailable: {reason}")]
    RemoteUnavailable { location: String, reason: String },

    /// A file could not be downloaded or unpacked.
    #[error("transfer of {location} failed: {reason}")]
    TransferFailure { location: String, reason: String },
}

/// A concrete remote file produced by glob expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Full URL, used for logging
    pub url: String,
    /// Path on the remote host, passed to [`RemoteSource::fetch`]
    pub path: String,
}

impl RemoteFile {
    /// Last path component.
    pub fn name(&self) -> &str {
        basename(&self.path)
    }
}

/// Transport able to list directories and fetch files.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Names of the entries of a directory.
    async fn list(&self, dir: &str) -> RemoteResult<Vec<String>>;

    /// Full contents of a file.
    async fn fetch(&self, path: &str) -> RemoteResult<Bytes>;
}

/// Anonymous FTP transport.
///
/// The FTP client is blocking, so every operation runs on the blocking pool
/// with its own connection.
#[derive(Debug, Clone)]
pub struct FtpSource {
    addr: String,
}

impl FtpSource {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
        }
    }

    fn connect(addr: &str) -> suppaftp::FtpResult<FtpStream> {
        let mut ftp = FtpStream::connect(addr)?;
        ftp.login(ANONYMOUS_USER, ANONYMOUS_PASSWORD)?;
        Ok(ftp)
    }
}

#[async_trait]
impl RemoteSource for FtpSource {
    async fn list(&self, dir: &str) -> RemoteResult<Vec<String>> {
        let addr = self.addr.clone();
        let target = dir.to_string();
        let location = format!("ftp://{}{}", self.addr, dir);

        let result = tokio::task::spawn_blocking(move || {
            let mut ftp = Self::connect(&addr)?;
            ftp.cwd(&target)?;
            let names = ftp.nlst(None)?;
            let _ = ftp.quit();
            Ok::<_, suppaftp::FtpError>(names)
        })
        .await;

        match result {
            Ok(Ok(names)) => Ok(names.iter().map(|n| basename(n).to_string()).collect()),
            Ok(Err(e)) => Err(RemoteError::RemoteUnavailable {
                location,
                reason: e.to_string(),
            }),
            Err(e) => Err(RemoteError::RemoteUnavailable {
                location,
                reason: e.to_string(),
            }),
        }
    }

    async fn fetch(&self, path: &str) -> RemoteResult<Bytes> {
        let addr = self.addr.clone();
        let target = path.to_string();
        let location = format!("ftp://{}{}", self.addr, path);

        let result = tokio::task::spawn_blocking(move || {
            let mut ftp = Self::connect(&addr)?;
            ftp.transfer_type(FileType::Binary)?;
            let buffer = ftp.retr_as_buffer(&target)?;
            let _ = ftp.quit();
            Ok::<_, suppaftp::FtpError>(buffer.into_inner())
        })
        .await;

        match result {
            Ok(Ok(data)) => Ok(Bytes::from(data)),
            Ok(Err(e)) => Err(RemoteError::TransferFailure {
                location,
                reason: e.to_string(),
            }),
            Err(e) => Err(RemoteError::TransferFailure {
                location,
                reason: e.to_string(),
            }),
        }
    }
}

/// Local directory tree addressed by `file://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSource;

#[async_trait]
impl RemoteSource for LocalSource {
    async fn list(&self, dir: &str) -> RemoteResult<Vec<String>> {
        let unavailable = |e: std::io::Error| RemoteError::RemoteUnavailable {
            location: dir.to_string(),
            reason: e.to_string(),
        };
        let mut entries = tokio::fs::read_dir(dir).await.map_err(unavailable)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn fetch(&self, path: &str) -> RemoteResult<Bytes> {
        tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|e| RemoteError::TransferFailure {
                location: path.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Split a URL at its first wildcard segment.
///
/// Returns the literal prefix and, if a wildcard segment exists, the pattern
/// and the (possibly empty) remainder after it.
pub fn split_glob(url: &str) -> (String, Option<(String, String)>) {
    let segments: Vec<&str> = url.split('/').collect();
    match segments
        .iter()
        .position(|s| s.contains(WILDCARDS.as_slice()))
    {
        Some(i) => (
            segments[..i].join("/"),
            Some((segments[i].to_string(), segments[i + 1..].join("/"))),
        ),
        None => (url.to_string(), None),
    }
}

/// Pick the transport for a (glob) URL from its scheme.
pub fn source_for_url(url: &str) -> RemoteResult<Arc<dyn RemoteSource>> {
    let (prefix, _) = split_glob(url);
    let parsed = parse_url(&prefix)?;
    match parsed.scheme() {
        "ftp" => {
            let host = parsed.host_str().ok_or_else(|| RemoteError::InvalidUrl {
                url: url.to_string(),
                reason: "missing host".to_string(),
            })?;
            Ok(Arc::new(FtpSource::new(
                host,
                parsed.port().unwrap_or(DEFAULT_FTP_PORT),
            )))
        }
        "file" => Ok(Arc::new(LocalSource)),
        other => Err(RemoteError::UnsupportedScheme(other.to_string())),
    }
}

/// Expand a glob URL into the concrete files it matches.
///
/// Directories that cannot be listed contribute nothing; the failure is
/// logged. A URL without wildcards yields itself.
pub async fn list_matching(
    source: &dyn RemoteSource,
    glob_url: &str,
) -> RemoteResult<Vec<RemoteFile>> {
    let mut pending = VecDeque::from([glob_url.to_string()]);
    let mut found = Vec::new();

    while let Some(url) = pending.pop_front() {
        let (prefix, wildcard) = split_glob(&url);
        let prefix = prefix.trim_end_matches('/').to_string();
        let dir = remote_path(&prefix)?;

        let Some((pattern, remainder)) = wildcard else {
            found.push(RemoteFile { url: prefix, path: dir });
            continue;
        };

        let matcher = Pattern::new(&pattern).map_err(|e| RemoteError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        let mut entries = match source.list(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(location = %prefix, error = %e, "Cannot list remote directory, skipping");
                continue;
            }
        };
        entries.retain(|name| matcher.matches(name));
        entries.sort();
        debug!(location = %prefix, pattern = %pattern, matches = entries.len(), "Listed remote directory");

        for name in entries {
            let child_url = format!("{prefix}/{name}");
            if remainder.is_empty() {
                found.push(RemoteFile {
                    url: child_url,
                    path: join_path(&dir, &name),
                });
            } else {
                pending.push_back(format!("{child_url}/{remainder}"));
            }
        }
    }

    Ok(found)
}

fn parse_url(url: &str) -> RemoteResult<Url> {
    Url::parse(url).map_err(|e| RemoteError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Path on the remote host for a wildcard-free URL.
fn remote_path(url: &str) -> RemoteResult<String> {
    let parsed = parse_url(url)?;
    if parsed.scheme() == "file" {
        let path: PathBuf = parsed.to_file_path().map_err(|_| RemoteError::InvalidUrl {
            url: url.to_string(),
            reason: "not a local path".to_string(),
        })?;
        return Ok(path.to_string_lossy().into_owned());
    }
    let path = urlencoding::decode(parsed.path()).map_err(|e| RemoteError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(if path.is_empty() { "/".to_string() } else { path.into_owned() })
}

fn join_path(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
