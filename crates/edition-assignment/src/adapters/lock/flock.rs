//! # Data Directory Lock
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on Windows).
//! Keeps two admin processes from rewriting the same edition store.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::domain::errors::StoreError;

/// Default time to wait for another process to release the directory.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Exclusive lock on a data directory.
///
/// Acquired when a store opens, released on drop (RAII).
///
/// # Example
///
/// ```ignore
/// let lock = DataDirLock::acquire(Path::new("/var/lib/editions"), DEFAULT_LOCK_TIMEOUT)?;
/// // Lock is held until `lock` goes out of scope
/// ```
#[derive(Debug)]
pub struct DataDirLock {
    /// The lock file handle (kept open to maintain lock)
    file: File,
    path: PathBuf,
    pid: u32,
}

impl DataDirLock {
    const LOCK_FILE: &'static str = "LOCK";

    /// Acquire an exclusive lock on the data directory.
    ///
    /// Retries with exponential backoff (capped at 500ms) until `timeout`.
    /// The kernel drops a flock when its holder dies, so a lock file left by a
    /// dead process is simply locked again and overwritten. The file is never
    /// removed while another process may hold it.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;

        let deadline = Instant::now() + timeout;
        let lock_path = data_dir.join(Self::LOCK_FILE);
        let mut retry_delay = Duration::from_millis(50);

        // Do not truncate before holding the lock: the PID belongs to the holder
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;

        loop {
            if file.try_lock_exclusive().is_ok() {
                let pid = std::process::id();
                if let Some(previous) = Self::read_pid(&lock_path) {
                    if previous != pid && !is_process_running(previous) {
                        warn!(
                            "[editions] Reclaiming lock left by exited process {} ({})",
                            previous,
                            lock_path.display()
                        );
                    }
                }

                file.set_len(0)?;
                file.seek(SeekFrom::Start(0))?;
                writeln!(file, "{}", pid)?;
                file.sync_all()?;

                debug!("[editions] Acquired data dir lock {}", lock_path.display());
                return Ok(Self {
                    file,
                    path: lock_path,
                    pid,
                });
            }

            if Instant::now() >= deadline {
                return Err(StoreError::Locked {
                    pid: Self::read_pid(&lock_path),
                    path: lock_path,
                });
            }

            std::thread::sleep(retry_delay);
            retry_delay = (retry_delay * 2).min(Duration::from_millis(500));
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_pid(path: &Path) -> Option<u32> {
        let mut content = String::new();
        File::open(path).ok()?.read_to_string(&mut content).ok()?;
        content.trim().parse().ok()
    }
}

// The LOCK file stays on disk. Unlinking it would let a waiter that already
// opened it lock an orphaned inode while a newcomer locks a fresh file.
impl Drop for DataDirLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        let _ = self.file.unlock();
    }
}

/// Checks if a process with the given PID is still running.
pub fn is_process_running(pid: u32) -> bool {
    #[cfg(target_os = "linux")]
    {
        Path::new(&format!("/proc/{}", pid)).exists()
    }

    #[cfg(not(target_os = "linux"))]
    {
        // Without a cheap check, assume the holder is alive
        let _ = pid;
        true
    }
}
