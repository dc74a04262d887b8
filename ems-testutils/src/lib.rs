//! Fixtures for building temporary job directories in `ems`'s tests.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// A scratch directory holding one or more `.jobs` files.
///
/// Dropping this removes the directory and every file in it.
pub struct JobDir {
    dir: TempDir,
}

impl JobDir {
    /// Creates an empty scratch directory.
    pub fn new() -> Self {
        JobDir {
            dir: TempDir::new().expect("failed to create temp job directory"),
        }
    }

    /// Writes `contents` to `<dir>/<name>.jobs` and returns its path.
    pub fn write_jobs(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{name}.jobs"));
        fs::write(&path, contents).expect("failed to write .jobs fixture");
        path
    }

    /// Path to the directory itself.
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Reads back `<dir>/<name>.out`, panicking if it doesn't exist yet.
    pub fn read_out(&self, name: &str) -> String {
        let path = self.dir.path().join(format!("{name}.out"));
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
    }
}

impl Default for JobDir {
    fn default() -> Self {
        Self::new()
    }
}
