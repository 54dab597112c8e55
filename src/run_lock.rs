//! Exclusive run guard
//!
//! Only one capture run may execute at a time. The guard takes a
//! non-blocking exclusive `flock` on a well-known file; a second run that
//! finds the lock held reports [`LockAttempt::Busy`] and is expected to exit
//! quietly. The lock is released when the [`RunLock`] is dropped, including
//! on early returns and panics.
//!
//! Platforms without `flock` get [`RunLock::Unguarded`]: the run proceeds
//! without mutual exclusion after a warning.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error_handling::types::LockError;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::fcntl::{Flock, FlockArg};

/// Held for the whole duration of a run.
pub enum RunLock {
    /// OS-level exclusive lock on the lock file
    #[cfg(unix)]
    Exclusive { path: PathBuf, _guard: Flock<File> },
    /// No locking primitive available, overlapping runs are possible
    Unguarded,
}

#[derive(Debug)]
pub enum LockAttempt {
    Acquired(RunLock),
    /// Another run holds the lock
    Busy,
}

impl RunLock {
    pub fn is_exclusive(&self) -> bool {
        !matches!(self, RunLock::Unguarded)
    }
}

impl fmt::Debug for RunLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(unix)]
            RunLock::Exclusive { path, .. } => f.debug_tuple("Exclusive").field(path).finish(),
            RunLock::Unguarded => f.write_str("Unguarded"),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let RunLock::Exclusive { path, .. } = self {
            debug!("Releasing run lock {}", path.display());
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File, LockError> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| LockError::OpenFailed(path.to_path_buf(), e))
}

/// Tries to take the run lock without blocking.
#[cfg(unix)]
pub fn acquire(path: &Path) -> Result<LockAttempt, LockError> {
    let file = open_lock_file(path)?;
    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(guard) => {
            debug!("Acquired run lock {}", path.display());
            Ok(LockAttempt::Acquired(RunLock::Exclusive {
                path: path.to_path_buf(),
                _guard: guard,
            }))
        }
        Err((_, errno)) if errno == Errno::EWOULDBLOCK => Ok(LockAttempt::Busy),
        Err((_, errno)) => Err(LockError::LockFailed(path.to_path_buf(), errno.to_string())),
    }
}

#[cfg(not(unix))]
pub fn acquire(path: &Path) -> Result<LockAttempt, LockError> {
    use log::warn;

    // Still create the file so operators see where the lock would live
    drop(open_lock_file(path)?);
    warn!(
        "File locking unavailable on this platform; skipping lock {} (runs may overlap)",
        path.display()
    );
    Ok(LockAttempt::Acquired(RunLock::Unguarded))
}
