//! Advisory lock that keeps one open session per vault file.
//!
//! The lock lives beside the vault as `<file>.lock`.  Ownership is an
//! exclusive `flock(2)` on that file, not the file's existence, so the
//! kernel releases it when the owning process exits for any reason and a
//! crashed owner never leaves the vault unopenable.  The file holds the
//! owner's PID for diagnostics only.
//!
//! The holder unlinks the file on release.  An acquirer that locked a
//! file which was unlinked in the meantime notices the inode mismatch and
//! starts over, so at most one holder ever owns the linked lock file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::errors::{LockboxError, Result};

/// Held for as long as a session is open; removes the lock file on drop.
#[derive(Debug)]
pub struct VaultLock {
    file: File,
    lock_path: PathBuf,
    vault_path: PathBuf,
}

impl VaultLock {
    /// Lock file path for a vault file.
    pub fn path_for(vault_path: &Path) -> PathBuf {
        let mut name = vault_path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        vault_path.with_file_name(name)
    }

    /// Take the lock or fail with `AlreadyOpen`.
    pub fn acquire(vault_path: &Path) -> Result<Self> {
        Self::take(vault_path, false)?
            .ok_or_else(|| LockboxError::AlreadyOpen(vault_path.to_path_buf()))
    }

    /// Take the lock, waiting for the current holder to release it.
    pub fn acquire_blocking(vault_path: &Path) -> Result<Self> {
        Self::take(vault_path, true)?
            .ok_or_else(|| LockboxError::AlreadyOpen(vault_path.to_path_buf()))
    }

    pub fn vault_path(&self) -> &Path {
        &self.vault_path
    }

    fn take(vault_path: &Path, wait: bool) -> Result<Option<Self>> {
        let lock_path = Self::path_for(vault_path);

        loop {
            let Some(file) = open_locked(&lock_path, wait)? else {
                return Ok(None);
            };
            if !still_linked(&file, &lock_path)? {
                tracing::debug!(lock = %lock_path.display(), "lock file replaced while waiting, retrying");
                continue;
            }

            let mut lock = Self {
                file,
                lock_path,
                vault_path: vault_path.to_path_buf(),
            };
            lock.record_owner()?;
            tracing::debug!(lock = %lock.lock_path.display(), "acquired vault lock");
            return Ok(Some(lock));
        }
    }

    fn record_owner(&mut self) -> io::Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        writeln!(self.file, "{}", std::process::id())
    }
}

impl Drop for VaultLock {
    fn drop(&mut self) {
        // Unlink while still holding the lock; `file` closes afterwards.
        if let Err(e) = fs::remove_file(&self.lock_path) {
            tracing::warn!(lock = %self.lock_path.display(), error = %e, "failed to release vault lock");
        }
    }
}

/// Open (creating if needed) and lock `path`.  `None` means another
/// holder has it and `wait` was false.
#[cfg(unix)]
fn open_locked(path: &Path, wait: bool) -> io::Result<Option<File>> {
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::io::AsRawFd;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o600)
        .open(path)?;

    let op = if wait {
        libc::LOCK_EX
    } else {
        libc::LOCK_EX | libc::LOCK_NB
    };
    loop {
        // SAFETY: the descriptor belongs to `file`, which outlives the call.
        if unsafe { libc::flock(file.as_raw_fd(), op) } == 0 {
            return Ok(Some(file));
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) => continue,
            Some(libc::EWOULDBLOCK) => return Ok(None),
            _ => return Err(err),
        }
    }
}

#[cfg(not(unix))]
fn open_locked(path: &Path, wait: bool) -> io::Result<Option<File>> {
    loop {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => return Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && wait => {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(e),
        }
    }
}

/// Whether `path` still names the inode we hold the lock on.
#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file.metadata()?;
    match fs::metadata(path) {
        Ok(linked) => Ok(linked.dev() == held.dev() && linked.ino() == held.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(not(unix))]
fn still_linked(_file: &File, _path: &Path) -> io::Result<bool> {
    Ok(true)
}
