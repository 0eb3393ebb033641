//! Shared fixtures for cross-crate bucket voting tests.

use bucketvote_node::Storage;
use tempfile::TempDir;

/// A RocksDB vote store in a temporary directory, removed on drop.
pub struct TempStore {
    pub storage: Storage,
    _dir: TempDir,
}

impl TempStore {
    pub fn open() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let storage = Storage::open(dir.path())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        Ok(Self { storage, _dir: dir })
    }
}
