use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DEFAULT_PROFILE_NAME: &str = ".pagewash-chromium-data";

/// Chromium leaves these behind when it is killed, and refuses to start on
/// a profile that still has one.
const LOCK_FILES: &[&str] = &["Default/SingletonLock", "SingletonLock"];

/// Persistent browser profile, reused across restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDir {
    root: PathBuf,
}

impl ProfileDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `configured`, else `~/.pagewash-chromium-data`, else a directory
    /// under the system temp dir when no home is known.
    pub fn resolve(configured: Option<&Path>) -> Self {
        if let Some(path) = configured {
            return Self::new(path);
        }
        let home = env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);
        Self::new(home.join(DEFAULT_PROFILE_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn crashpad_dir(&self) -> PathBuf {
        self.root.join("crashpad")
    }

    pub fn crashes_dir(&self) -> PathBuf {
        self.root.join("crashes")
    }

    /// Create the directory tree and clear stale locks. Returns how many
    /// lock files were removed.
    pub fn prepare(&self) -> io::Result<usize> {
        fs::create_dir_all(self.crashpad_dir())?;
        fs::create_dir_all(self.crashes_dir())?;

        let mut removed = 0;
        for lock in LOCK_FILES {
            let path = self.root.join(lock);
            // SingletonLock is usually a dangling symlink, so exists() would
            // report false for it.
            if fs::symlink_metadata(&path).is_err() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed stale profile lock");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove profile lock"),
            }
        }
        Ok(removed)
    }
}
