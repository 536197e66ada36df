//! Key-value store backed by one file per key.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use elpris_core::storage::KeyValueStore;

/// Stands in for the device's flash partition between simulator runs.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.bin"))
    }
}

impl KeyValueStore for FileStore {
    type Error = io::Error;

    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes a temporary file and renames it over the old blob
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        let path = self.path(key);
        let staging = path.with_extension("tmp");
        fs::write(&staging, bytes)?;
        fs::rename(&staging, &path)
    }
}
