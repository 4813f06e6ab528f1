//! Fixture directory trees.
//!
//! A temporary directory laid out like the remote archive, reachable through
//! a `file://` URL.

use std::fs;
use std::io;
use std::path::Path;

use tempfile::TempDir;

/// Write `files` (relative path, contents) below `root`, creating parents.
pub fn write_tree<P: AsRef<Path>>(root: &Path, files: &[(P, Vec<u8>)]) -> io::Result<()> {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
    }
    Ok(())
}

/// A temporary archive tree with its `file://` base URL.
pub struct FixtureTree {
    pub dir: TempDir,
}

impl FixtureTree {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// `file://` URL of the tree root, without a trailing slash.
    pub fn url(&self) -> String {
        format!("file://{}", self.root().display())
    }

    pub fn add(&self, rel: &str, contents: Vec<u8>) -> io::Result<()> {
        write_tree(self.root(), &[(rel, contents)])
    }
}
