//! Crash-safe file writes.
//!
//! Every write goes to a uniquely named temporary file in the target's
//! directory, is fsynced, then renamed over the target. Readers see the old
//! contents or the new contents, never a torn file.

use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use sunroof_core::error::{Result, SunroofError};
use uuid::Uuid;

/// Suffix shared by every temporary file this module creates.
pub const TMP_SUFFIX: &str = ".tmp";

/// Atomically replaces `path` with `bytes`.
///
/// Concurrent writers to the same path never share a temporary file; the last
/// rename wins.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = temp_path_for(path)?;
    if let Some(dir) = tmp_path.parent() {
        fs::create_dir_all(dir)?;
    }

    let mut staged = File::create(&tmp_path)?;
    let written = staged.write_all(bytes).and_then(|_| staged.sync_all());
    drop(staged);

    if let Err(e) = written.and_then(|_| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Whether `file_name` looks like a leftover from an interrupted
/// [`write_atomic`].
pub fn is_temp_file_name(file_name: &str) -> bool {
    file_name.starts_with('.') && file_name.ends_with(TMP_SUFFIX)
}

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| SunroofError::storage(format!("{} has no parent directory", path.display())))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| SunroofError::storage(format!("{} has no file name", path.display())))?;

    Ok(parent.join(format!(
        ".{}.{}{}",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple(),
        TMP_SUFFIX
    )))
}

/// A typed TOML document on disk, written through [`write_atomic`].
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    marker: PhantomData<fn() -> T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the document.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: parsed document
    /// - `Ok(None)`: the file is missing or blank
    /// - `Err`: unreadable or malformed
    pub fn load(&self) -> Result<Option<T>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match content.trim() {
            "" => Ok(None),
            _ => Ok(Some(toml::from_str(&content)?)),
        }
    }

    pub fn save(&self, data: &T) -> Result<()> {
        let rendered = toml::to_string_pretty(data)?;
        write_atomic(&self.path, rendered.as_bytes())
    }

    /// Read-modify-write under an exclusive lock.
    ///
    /// Starts from `default_value` when the file does not exist yet and
    /// returns the value that was written.
    pub fn update<F>(&self, initial: T, edit: F) -> Result<T>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let _guard = FileLock::acquire(&self.path)?;

        let mut doc = self.load()?.unwrap_or(initial);
        edit(&mut doc)?;
        self.save(&doc)?;
        Ok(doc)
    }
}

/// Exclusive advisory lock on `<path>.lock`, released on drop.
pub struct FileLock {
    handle: File,
    marker_path: PathBuf,
}

impl FileLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        let marker_path = path.with_extension("lock");
        if let Some(dir) = marker_path.parent() {
            fs::create_dir_all(dir)?;
        }

        let handle = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&marker_path)?;
        fs2::FileExt::lock_exclusive(&handle).map_err(|e| {
            SunroofError::storage(format!("lock on {} unavailable: {}", marker_path.display(), e))
        })?;

        Ok(Self { handle, marker_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.handle);
        let _ = fs::remove_file(&self.marker_path);
    }
}
