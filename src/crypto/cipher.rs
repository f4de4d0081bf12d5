//! AES-256-GCM authenticated encryption.
//!
//! `seal` generates a fresh random 12-byte nonce on every call; callers
//! can never supply one, so a nonce is never reused under the same key.
//! The tag is kept detached from the ciphertext so the vault file can
//! store nonce, ciphertext and tag as separate fields.
//!
//! `open` fails closed: a tag mismatch, a truncated buffer or a wrong
//! key all produce `AuthenticationFailed` and no plaintext.

use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use zeroize::{Zeroize, Zeroizing};

use super::keys::MasterKey;
use crate::errors::{LockboxError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Output of one `seal` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

/// Encrypt and authenticate `plaintext` under `key`.
///
/// `associated_data` is authenticated but not encrypted.
pub fn seal(key: &MasterKey, plaintext: &[u8], associated_data: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| LockboxError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let generated = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut buffer = plaintext.to_vec();
    let tag = match cipher.encrypt_in_place_detached(&generated, associated_data, &mut buffer) {
        Ok(tag) => tag,
        Err(e) => {
            // The buffer may still hold plaintext.
            buffer.zeroize();
            return Err(LockboxError::EncryptionFailed(format!(
                "encryption error: {e}"
            )));
        }
    };

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&generated);
    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);

    Ok(Sealed {
        nonce,
        ciphertext: buffer,
        tag: tag_bytes,
    })
}

/// Verify and decrypt a `Sealed` payload.
///
/// The plaintext comes back in a `Zeroizing` buffer.
pub fn open(key: &MasterKey, sealed: &Sealed, associated_data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| LockboxError::AuthenticationFailed)?;

    let nonce = Nonce::from_slice(&sealed.nonce);
    let tag = Tag::from_slice(&sealed.tag);

    let mut buffer = Zeroizing::new(sealed.ciphertext.clone());
    cipher
        .decrypt_in_place_detached(nonce, associated_data, buffer.as_mut_slice(), tag)
        .map_err(|_| LockboxError::AuthenticationFailed)?;

    Ok(buffer)
}
