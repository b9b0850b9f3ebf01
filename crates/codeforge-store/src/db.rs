use camino::Utf8Path;
use codeforge_utils::atomic_write::write_bytes_atomic;
use codeforge_utils::error::StoreError;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// A directory-backed key-value namespace.
///
/// Keys are relative paths using `/` as separator; values are UTF-8 text.
/// Writes create intermediate directories and replace existing values.
#[derive(Debug, Clone)]
pub struct Db {
    name: String,
    root: PathBuf,
}

impl Db {
    /// Namespace rooted at `root` without touching the filesystem.
    #[must_use]
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Namespace rooted at `root`, creating the directory.
    pub fn open(name: impl Into<String>, root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let db = Self::new(name, root);
        fs::create_dir_all(&db.root).map_err(|source| StoreError::Io {
            path: db.root.clone(),
            source,
        })?;
        Ok(db)
    }

    /// Namespace label used in errors (`input`, `memory`, ...)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Map a key to its file, rejecting keys that would escape the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if key.trim().is_empty() {
            return Err(invalid("key is empty"));
        }
        if key.starts_with('/') || key.starts_with('\\') {
            return Err(invalid("absolute paths are not allowed"));
        }

        let relative = Path::new(key);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => return Err(invalid("'..' is not allowed")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("absolute paths are not allowed"));
                }
            }
        }

        Ok(self.root.join(relative))
    }

    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when nothing was ever written under `key`.
    pub fn read(&self, key: &str) -> Result<String, StoreError> {
        let path = self.resolve(key)?;
        if !path.is_file() {
            return Err(StoreError::NotFound {
                namespace: self.name.clone(),
                key: key.to_string(),
            });
        }
        fs::read_to_string(&path).map_err(|source| StoreError::Io { path, source })
    }

    /// Store `text` under `key`, replacing any previous value.
    pub fn write(&self, key: &str, text: &str) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        let utf8 = Utf8Path::from_path(&path).ok_or_else(|| StoreError::InvalidKey {
            key: key.to_string(),
            reason: format!("{} is not valid UTF-8", path.display()),
        })?;

        write_bytes_atomic(utf8, text.as_bytes()).map_err(|e| StoreError::Io {
            path: path.clone(),
            source: io::Error::other(format!("{e:#}")),
        })?;

        tracing::trace!(namespace = %self.name, key = %key, bytes = text.len(), "stored");
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.resolve(key).is_ok_and(|p| p.is_file())
    }

    /// Every stored key, sorted, with `/` separators.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(|e| StoreError::Io {
                path: e.path().map_or_else(|| self.root.clone(), Path::to_path_buf),
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory walk failed")),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                let parts: Vec<_> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                keys.push(parts.join("/"));
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Delete the namespace directory and everything in it.
    pub fn remove_all(&self) -> Result<(), StoreError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: self.root.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn memory() -> (TempDir, Db) {
        let dir = TempDir::new().unwrap();
        let db = Db::open("memory", dir.path().join("memory")).unwrap();
        (dir, db)
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, db) = memory();
        db.write("specification", "a todo list app").unwrap();

        assert_eq!(db.read("specification").unwrap(), "a todo list app");
        assert!(db.contains("specification"));
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let (_dir, db) = memory();
        let err = db.read("tests").unwrap_err();

        let StoreError::NotFound { namespace, key } = err else {
            panic!("expected NotFound, got {err:?}");
        };
        assert_eq!((namespace.as_str(), key.as_str()), ("memory", "tests"));
        assert!(!db.contains("tests"));
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let (_dir, db) = memory();
        db.write("k", "a much longer first value").unwrap();
        db.write("k", "b").unwrap();

        assert_eq!(db.read("k").unwrap(), "b");
    }

    #[test]
    fn test_nested_keys_create_directories() {
        let (_dir, db) = memory();
        db.write("src/app/main.py", "print(1)").unwrap();

        assert!(db.path().join("src").join("app").join("main.py").is_file());
        assert_eq!(db.keys().unwrap(), vec!["src/app/main.py"]);
    }

    #[test]
    fn test_directory_is_not_a_value() {
        let (_dir, db) = memory();
        db.write("src/a.py", "x").unwrap();
        assert!(!db.contains("src"));
        assert!(db.read("src").unwrap_err().is_not_found());
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let (_dir, db) = memory();
        for key in ["../outside.txt", "a/../../b", "/etc/passwd", "", "  "] {
            assert!(
                matches!(db.write(key, "x"), Err(StoreError::InvalidKey { .. })),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_keys_sorted() {
        let (_dir, db) = memory();
        db.write("b.txt", "").unwrap();
        db.write("a/z.txt", "").unwrap();
        db.write("a/b.txt", "").unwrap();

        assert_eq!(db.keys().unwrap(), vec!["a/b.txt", "a/z.txt", "b.txt"]);
    }

    #[test]
    fn test_remove_all() {
        let (_dir, db) = memory();
        db.write("x", "1").unwrap();
        db.remove_all().unwrap();

        assert!(!db.path().exists());
        assert!(db.keys().unwrap().is_empty());
        db.remove_all().unwrap();
    }

    #[test]
    fn test_new_does_not_create_directory() {
        let dir = TempDir::new().unwrap();
        let db = Db::new("identity", dir.path().join("agents").join("proj"));
        assert!(!db.path().exists());
        assert!(db.read("qa").unwrap_err().is_not_found());
    }
}
