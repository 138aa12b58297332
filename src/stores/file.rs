//! File Store Module
//!
//! Persists each key as one file below a root directory. Keys are escaped
//! into flat file names, so `a`, `a/b` and `.` never collide with each
//! other or with the directory layout. Writes land through a temp file
//! and a rename; a reader sees the old value or the new one, never a
//! truncated file.

use std::fmt::Write as _;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::debug;

use crate::context::Context;
use crate::error::{Result, StoreError};
use crate::store::Store;

/// Longest escaped chunk used as a single path component.
const SEGMENT_LEN: usize = 128;

/// Suffix of the file that holds a value.
const VALUE_SUFFIX: &str = ".v";

/// Suffix of the directories that hold escaped names longer than one segment.
const DIR_SUFFIX: &str = ".d";

// == File Store ==
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    reset_on_open: bool,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reset_on_open: false,
        }
    }

    /// Empties the root directory on `open`, dropping files from an
    /// earlier run that no capacity manager tracks.
    pub fn with_reset(mut self) -> Self {
        self.reset_on_open = true;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        let name = escape_key(key);
        let segments: Vec<&str> = name
            .as_bytes()
            .chunks(SEGMENT_LEN)
            // escaped names are pure ASCII
            .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
            .collect();

        let mut path = self.root.clone();
        if let Some((last, dirs)) = segments.split_last() {
            for dir in dirs {
                path.push(format!("{dir}{DIR_SUFFIX}"));
            }
            path.push(format!("{last}{VALUE_SUFFIX}"));
        }
        Ok(path)
    }
}

/// Keeps `[a-z0-9_-]` and percent-escapes every other byte, including
/// upper case letters so case-insensitive filesystems stay collision free.
fn escape_key(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => name.push(byte as char),
            _ => {
                let _ = write!(name, "%{byte:02X}");
            }
        }
    }
    name
}

fn write_atomic(path: &Path, val: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::Other, "missing parent"))?;
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(val)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[async_trait]
impl Store for FileStore {
    async fn open(&self) -> Result<()> {
        if self.reset_on_open {
            match fs::remove_dir_all(&self.root).await {
                Ok(()) => debug!(root = %self.root.display(), "file store reset"),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        fs::create_dir_all(&self.root).await?;

        let meta = fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            return Err(StoreError::backend(format!(
                "store path {} is not a directory",
                self.root.display()
            )));
        }
        debug!(root = %self.root.display(), "file store opened");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn put(&self, ctx: &Context, key: &str, val: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let val = val.to_vec();
        // The blocking write finishes even when the context gives up on it,
        // so the rename is never cut short.
        ctx.run(async move {
            tokio::task::spawn_blocking(move || write_atomic(&path, &val))
                .await
                .map_err(StoreError::backend)??;
            Ok(())
        })
        .await
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        ctx.run(async {
            match fs::read(&path).await {
                Ok(val) => Ok(val),
                // A missing object is a miss, not a failure.
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    async fn del(&self, ctx: &Context, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        ctx.run(async {
            match fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            }
        })
        .await
    }
}
