use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Key-value storage for serialized cart snapshots.
pub trait CartSnapshotStore: Send + Sync {
    /// Returns the stored snapshot, or `None` if nothing was saved.
    fn load(&self, key: &str) -> io::Result<Option<String>>;

    fn save(&self, key: &str, contents: &str) -> io::Result<()>;

    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Stores each snapshot as `{key}.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CartSnapshotStore for FileSnapshotStore {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn save(&self, key: &str, contents: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        // write-then-rename so a crash never leaves a truncated snapshot
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, contents)?;
        fs::rename(tmp, self.path_for(key))
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// In-process snapshot store.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent saves fail, for exercising persistence errors.
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.lock() {
            *flag = fail;
        }
    }

    fn entries(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| io::Error::other("snapshot store lock poisoned"))
    }
}

impl CartSnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn save(&self, key: &str, contents: &str) -> io::Result<()> {
        if self.fail_writes.lock().map(|flag| *flag).unwrap_or(false) {
            return Err(io::Error::other("snapshot writes disabled"));
        }
        self.entries()?.insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}
