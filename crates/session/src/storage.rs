//! Storage collaborator: project-relative file handles with whole-file
//! text reads and writes.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use parking_lot::Mutex;
use sp_project::ProjectError;
use tracing::debug;

/// A resolved, project-relative file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileHandle {
    relative_path: String,
}

impl FileHandle {
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
        }
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }
}

/// Where the session reads and writes its files.
///
/// Writes replace the whole file.
pub trait Storage: Send + Sync {
    /// Resolve `relative_path`. Returns `None` when the file does not exist
    /// and `create` is false.
    fn get_file_handle(&self, relative_path: &str, create: bool) -> io::Result<Option<FileHandle>>;

    fn read_text(&self, handle: &FileHandle) -> io::Result<String>;

    fn write_text(&self, handle: &FileHandle, text: &str) -> io::Result<()>;
}

/// Files under a project root directory.
#[derive(Clone, Debug)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a project-relative one. Paths escaping the root
    /// are rejected.
    fn resolve(&self, relative_path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(relative_path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative_path.is_empty() || escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a project-relative path: {relative_path:?}"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl Storage for FsStorage {
    fn get_file_handle(&self, relative_path: &str, create: bool) -> io::Result<Option<FileHandle>> {
        let path = self.resolve(relative_path)?;
        if path.is_file() {
            return Ok(Some(FileHandle::new(relative_path)));
        }
        if !create {
            return Ok(None);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, "")?;
        debug!(path = %path.display(), "Created empty file");
        Ok(Some(FileHandle::new(relative_path)))
    }

    fn read_text(&self, handle: &FileHandle) -> io::Result<String> {
        std::fs::read_to_string(self.resolve(handle.relative_path())?)
    }

    fn write_text(&self, handle: &FileHandle, text: &str) -> io::Result<()> {
        let path = self.resolve(handle.relative_path())?;
        sp_project::write_atomic(&path, text).map_err(|e| match e {
            ProjectError::Io(io_err) => io_err,
            other => io::Error::other(other.to_string()),
        })
    }
}

/// In-process storage, for tests and scratch sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<String, String>>,
    fail_writes: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, relative_path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(relative_path, text);
        self
    }

    pub fn insert(&self, relative_path: impl Into<String>, text: impl Into<String>) {
        self.files.lock().insert(relative_path.into(), text.into());
    }

    pub fn contents(&self, relative_path: &str) -> Option<String> {
        self.files.lock().get(relative_path).cloned()
    }

    /// Make every following write fail with `message` (`None` to recover).
    pub fn fail_writes(&self, message: Option<&str>) {
        *self.fail_writes.lock() = message.map(str::to_string);
    }
}

impl Storage for MemoryStorage {
    fn get_file_handle(&self, relative_path: &str, create: bool) -> io::Result<Option<FileHandle>> {
        let mut files = self.files.lock();
        if files.contains_key(relative_path) {
            return Ok(Some(FileHandle::new(relative_path)));
        }
        if !create {
            return Ok(None);
        }
        files.insert(relative_path.to_string(), String::new());
        Ok(Some(FileHandle::new(relative_path)))
    }

    fn read_text(&self, handle: &FileHandle) -> io::Result<String> {
        self.contents(handle.relative_path()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", handle.relative_path()),
            )
        })
    }

    fn write_text(&self, handle: &FileHandle, text: &str) -> io::Result<()> {
        if let Some(message) = self.fail_writes.lock().as_ref() {
            return Err(io::Error::other(message.clone()));
        }
        self.insert(handle.relative_path(), text);
        Ok(())
    }
}
