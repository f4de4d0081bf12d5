//! Binary vault file format and atomic file replacement.
//!
//! A `.vault` file has this layout (all integers little-endian):
//!
//! ```text
//! [LBXV: 4][format_version: u32][vault_id: 16]
//! [memory_kib: u32][iterations: u32][parallelism: u32][salt: 32]
//! [nonce: 12][ciphertext_len: u32][ciphertext][tag: 16]
//! ```
//!
//! - **Header** (magic through salt, 68 bytes): everything needed to
//!   re-derive the key.  The header bytes exactly as stored are the
//!   associated data of the AEAD, so a header edit fails authentication.
//! - **Nonce / ciphertext / tag**: one `seal` of the encoded entry set.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::crypto::{KdfParams, Sealed, NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::errors::{LockboxError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every vault file.
const MAGIC: &[u8; 4] = b"LBXV";

/// Current binary format version.
pub const CURRENT_VERSION: u32 = 1;

/// magic + version + vault_id + kdf params + salt.
pub const HEADER_LEN: usize = 4 + 4 + 16 + 12 + SALT_LEN;

/// Smallest possible file: header + nonce + length + tag.
const MIN_FILE_LEN: usize = HEADER_LEN + NONCE_LEN + 4 + TAG_LEN;

// ---------------------------------------------------------------------------
// VaultHeader
// ---------------------------------------------------------------------------

/// Everything stored in front of the ciphertext.
///
/// `salt` and `kdf_params` are fixed for the lifetime of one key;
/// a password change writes a new header with a fresh salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultHeader {
    pub format_version: u32,
    pub vault_id: Uuid,
    pub kdf_params: KdfParams,
    pub salt: [u8; SALT_LEN],
}

impl VaultHeader {
    pub fn new(vault_id: Uuid, kdf_params: KdfParams, salt: [u8; SALT_LEN]) -> Self {
        Self {
            format_version: CURRENT_VERSION,
            vault_id,
            kdf_params,
            salt,
        }
    }

    /// Serialize the header.  These bytes double as the associated data.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let mut w = SliceWriter::new(&mut out);
        w.put(MAGIC);
        w.put(&self.format_version.to_le_bytes());
        w.put(self.vault_id.as_bytes());
        w.put(&self.kdf_params.memory_kib.to_le_bytes());
        w.put(&self.kdf_params.iterations.to_le_bytes());
        w.put(&self.kdf_params.parallelism.to_le_bytes());
        w.put(&self.salt);
        out
    }

    /// Parse and sanity-check a header.
    ///
    /// KDF parameters above `KdfParams::MAXIMUM` are rejected here so a
    /// corrupted header can never make the KDF allocate gigabytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(LockboxError::InvalidVaultFormat(
                "file too small to be a valid vault".into(),
            ));
        }
        let mut r = SliceReader::new(&bytes[..HEADER_LEN]);

        if r.take(4)? != MAGIC {
            return Err(LockboxError::InvalidVaultFormat(
                "missing LBXV magic bytes".into(),
            ));
        }

        let format_version = r.u32()?;
        if format_version != CURRENT_VERSION {
            return Err(LockboxError::InvalidVaultFormat(format!(
                "unsupported version {format_version}, expected {CURRENT_VERSION}"
            )));
        }

        let vault_id = Uuid::from_slice(r.take(16)?)
            .map_err(|e| LockboxError::InvalidVaultFormat(format!("vault id: {e}")))?;

        let kdf_params = KdfParams {
            memory_kib: r.u32()?,
            iterations: r.u32()?,
            parallelism: r.u32()?,
        };
        if !kdf_params.is_plausible() {
            return Err(LockboxError::InvalidVaultFormat(format!(
                "implausible KDF parameters {kdf_params:?}"
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(r.take(SALT_LEN)?);

        Ok(Self {
            format_version,
            vault_id,
            kdf_params,
            salt,
        })
    }
}

// ---------------------------------------------------------------------------
// VaultFile
// ---------------------------------------------------------------------------

/// A parsed vault file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFile {
    pub header: VaultHeader,
    /// The header bytes exactly as read from disk (the associated data).
    pub header_bytes: [u8; HEADER_LEN],
    pub sealed: Sealed,
}

impl VaultFile {
    pub fn new(header: VaultHeader, sealed: Sealed) -> Self {
        let header_bytes = header.to_bytes();
        Self {
            header,
            header_bytes,
            sealed,
        }
    }

    /// Encode the whole file.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let ct_len = u32::try_from(self.sealed.ciphertext.len()).map_err(|_| {
            LockboxError::SerializationError(format!(
                "ciphertext length {} exceeds u32::MAX",
                self.sealed.ciphertext.len()
            ))
        })?;

        let mut buf = Vec::with_capacity(MIN_FILE_LEN + self.sealed.ciphertext.len());
        buf.extend_from_slice(&self.header_bytes);
        buf.extend_from_slice(&self.sealed.nonce);
        buf.extend_from_slice(&ct_len.to_le_bytes());
        buf.extend_from_slice(&self.sealed.ciphertext);
        buf.extend_from_slice(&self.sealed.tag);
        Ok(buf)
    }

    /// Decode a whole file.  Trailing bytes are an error.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_FILE_LEN {
            return Err(LockboxError::InvalidVaultFormat(
                "file too small to be a valid vault".into(),
            ));
        }

        let header = VaultHeader::from_bytes(data)?;
        let mut header_bytes = [0u8; HEADER_LEN];
        header_bytes.copy_from_slice(&data[..HEADER_LEN]);

        let mut r = SliceReader::new(&data[HEADER_LEN..]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(r.take(NONCE_LEN)?);

        let ct_len = usize::try_from(r.u32()?).map_err(|_| {
            LockboxError::InvalidVaultFormat("ciphertext length exceeds address space".into())
        })?;
        if r.remaining() != ct_len + TAG_LEN {
            return Err(LockboxError::InvalidVaultFormat(format!(
                "ciphertext length {ct_len} does not match file size"
            )));
        }
        let ciphertext = r.take(ct_len)?.to_vec();
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(r.take(TAG_LEN)?);

        Ok(Self {
            header,
            header_bytes,
            sealed: Sealed {
                nonce,
                ciphertext,
                tag,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Disk I/O
// ---------------------------------------------------------------------------

/// Read and parse a vault file.
pub fn read_vault(path: &Path) -> Result<VaultFile> {
    if !path.exists() {
        return Err(LockboxError::VaultNotFound(path.to_path_buf()));
    }
    let data = fs::read(path)?;
    VaultFile::from_bytes(&data)
}

/// Read only the header (used to validate files without a password).
pub fn read_header(path: &Path) -> Result<VaultHeader> {
    Ok(read_vault(path)?.header)
}

/// Write a vault file to disk **atomically**.
///
/// The previous file stays readable until the final rename.
pub fn write_vault(path: &Path, file: &VaultFile) -> Result<()> {
    let bytes = file.to_bytes()?;
    write_atomic(path, &bytes)
}

/// Stage `bytes` next to `path`, then rename over it.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let staged = stage(path, bytes)?;
    commit(&staged, path)
}

/// Path of the temp file used while replacing `path`.
pub fn staging_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ))
}

/// First half of an atomic write: the new content is fully written and
/// flushed to a temp file in the same directory, target untouched.
pub fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let tmp_path = staging_path(path);

    let mut file = File::create(&tmp_path)?;
    restrict_permissions(&tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;

    Ok(tmp_path)
}

/// Second half of an atomic write: rename the staged file over `path`.
///
/// The rename is atomic because both files share a directory.
pub fn commit(staged: &Path, path: &Path) -> Result<()> {
    fs::rename(staged, path)?;

    // Persist the directory entry too.  Not supported everywhere, so
    // failure here is not an error.
    #[cfg(unix)]
    {
        if let Some(dir) = path.parent().and_then(|p| File::open(p).ok()) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

/// Owner-only read/write on Unix; no-op elsewhere.
pub(crate) fn restrict_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

// ---------------------------------------------------------------------------
// Byte cursor helpers
// ---------------------------------------------------------------------------

struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }
}

struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(LockboxError::InvalidVaultFormat("unexpected end of file".into()));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        let mut arr = [0u8; 4];
        arr.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_file(ct: &[u8]) -> VaultFile {
        let header = VaultHeader::new(Uuid::new_v4(), KdfParams::MINIMUM, [7u8; SALT_LEN]);
        VaultFile::new(
            header,
            Sealed {
                nonce: [1u8; NONCE_LEN],
                ciphertext: ct.to_vec(),
                tag: [2u8; TAG_LEN],
            },
        )
    }

    #[test]
    fn file_bytes_roundtrip() {
        let file = sample_file(b"ciphertext");
        let bytes = file.to_bytes().unwrap();
        assert_eq!(bytes.len(), MIN_FILE_LEN + 10);
        assert_eq!(VaultFile::from_bytes(&bytes).unwrap(), file);
    }

    #[test]
    fn header_bytes_start_with_magic_and_version() {
        let bytes = sample_file(b"").header.to_bytes();
        assert_eq!(&bytes[0..4], b"LBXV");
        assert_eq!(&bytes[4..8], &CURRENT_VERSION.to_le_bytes());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = sample_file(b"x").to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            VaultFile::from_bytes(&bytes),
            Err(LockboxError::InvalidVaultFormat(_))
        ));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut bytes = sample_file(b"x").to_bytes().unwrap();
        bytes[4] = 9;
        assert!(VaultFile::from_bytes(&bytes).is_err());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = sample_file(b"x").to_bytes().unwrap();
        bytes.push(0);
        assert!(VaultFile::from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated_file_is_rejected() {
        let bytes = sample_file(b"some ciphertext").to_bytes().unwrap();
        for len in [0, 10, HEADER_LEN, bytes.len() - 1] {
            assert!(VaultFile::from_bytes(&bytes[..len]).is_err(), "len {len}");
        }
    }

    #[test]
    fn implausible_kdf_params_are_rejected_before_use() {
        let mut bytes = sample_file(b"x").to_bytes().unwrap();
        // memory_kib lives right after magic, version and vault id.
        bytes[24..28].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            VaultFile::from_bytes(&bytes),
            Err(LockboxError::InvalidVaultFormat(_))
        ));
    }

    #[test]
    fn write_is_atomic_and_cleans_up_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.vault");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn staged_write_leaves_target_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.vault");
        write_atomic(&path, b"original").unwrap();

        let staged = stage(&path, b"replacement").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"original");

        commit(&staged, &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"replacement");
    }

    #[test]
    fn read_missing_vault_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_vault(&dir.path().join("nope.vault")),
            Err(LockboxError::VaultNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn written_vault_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.vault");
        write_atomic(&path, b"data").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
