//! Client-side secret encryption.
//!
//! Secrets are encrypted off-ledger with a symmetric key derived from the
//! plaintext vault key, then stored on the ledger as `dv1` envelopes.
//!
//! Primitive choices:
//! - **Key derivation**: SHA-256 over the lower-cased, trimmed address text
//! - **Cipher**: AES-256-GCM (authenticated encryption)
//! - **Nonce**: 96-bit, fresh per encryption via `SystemRandom`

use ring::aead::{self, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::envelope::{self, NONCE_LEN};
use crate::error::DarkVaultError;
use crate::identity::Identity;

const ALGORITHM: &aead::Algorithm = &AES_256_GCM;

/// Size of a symmetric key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// A symmetric key for secret encryption.
///
/// Not `Clone`. Zeroised on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LEN],
}

impl SymmetricKey {
    /// Derive the key for a plaintext vault key.
    pub fn for_vault_key(vault_key: &Identity) -> Self {
        derive_symmetric_key(&vault_key.to_string())
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Deterministically derive a symmetric key from an address string.
///
/// Case and surrounding whitespace are ignored, so checksummed and
/// lower-case renderings of the same address yield the same key.
pub fn derive_symmetric_key(address_like: &str) -> SymmetricKey {
    let normalized = address_like.trim().to_ascii_lowercase();
    let digest = digest::digest(&digest::SHA256, normalized.as_bytes());

    let mut bytes = [0u8; KEY_LEN];
    bytes.copy_from_slice(digest.as_ref());
    SymmetricKey { bytes }
}

fn sealing_key(key: &SymmetricKey) -> Result<LessSafeKey, DarkVaultError> {
    let unbound =
        UnboundKey::new(ALGORITHM, key.as_bytes()).map_err(|_| DarkVaultError::InvalidKey)?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` into a `dv1` envelope string.
pub fn encrypt_secret(key: &SymmetricKey, plaintext: &str) -> Result<String, DarkVaultError> {
    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes).map_err(|_| DarkVaultError::RandomnessFailure)?;

    let mut payload = plaintext.as_bytes().to_vec();
    sealing_key(key)?
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            aead::Aad::empty(),
            &mut payload,
        )
        .map_err(|_| DarkVaultError::EncryptionFailure)?;

    Ok(envelope::encode(&nonce_bytes, &payload))
}

/// Decrypt a `dv1` envelope string.
///
/// A wrong key or any tampering fails the GCM check; no partial plaintext
/// is returned.
pub fn decrypt_secret(key: &SymmetricKey, envelope: &str) -> Result<String, DarkVaultError> {
    let envelope::Envelope { nonce, mut payload } = envelope::decode(envelope)?;

    let plaintext = sealing_key(key)?
        .open_in_place(
            Nonce::assume_unique_for_key(nonce),
            aead::Aad::empty(),
            &mut payload,
        )
        .map_err(|_| DarkVaultError::DecryptionFailure)?;

    String::from_utf8(plaintext.to_vec()).map_err(|_| DarkVaultError::InvalidUtf8)
}
