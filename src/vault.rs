//! The per-owner vault record.
//!
//! A vault holds one encrypted key handle and an append-only list of
//! client-encrypted secrets. Only the ledger mutates it.

use serde::{Deserialize, Serialize};

use crate::access::EncryptedHandle;
use crate::error::DarkVaultError;

/// One owner's vault.
///
/// The default value is the record every owner has before `create_vault`:
/// empty handle, not initialized, no ciphertexts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    encrypted_key: EncryptedHandle,
    initialized: bool,
    ciphertexts: Vec<String>,
}

impl Vault {
    /// A freshly created vault holding `encrypted_key`.
    pub(crate) fn initialized_with(encrypted_key: EncryptedHandle) -> Self {
        Self {
            encrypted_key,
            initialized: true,
            ciphertexts: Vec::new(),
        }
    }

    pub fn encrypted_key(&self) -> EncryptedHandle {
        self.encrypted_key
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of stored secrets.
    pub fn secret_count(&self) -> usize {
        self.ciphertexts.len()
    }

    /// The ciphertext at `index`, in insertion order.
    pub fn secret(&self, index: usize) -> Result<&str, DarkVaultError> {
        self.ciphertexts
            .get(index)
            .map(String::as_str)
            .ok_or(DarkVaultError::SecretIndexOutOfBounds {
                index,
                len: self.ciphertexts.len(),
            })
    }

    /// Iterate over the stored ciphertexts in insertion order.
    pub fn secrets(&self) -> std::slice::Iter<'_, String> {
        self.ciphertexts.iter()
    }

    /// Swap in a new key handle. Ciphertexts and the initialized flag are untouched.
    pub(crate) fn replace_key(&mut self, encrypted_key: EncryptedHandle) {
        self.encrypted_key = encrypted_key;
    }

    /// Append a ciphertext and return its index.
    pub(crate) fn append(&mut self, ciphertext: String) -> usize {
        self.ciphertexts.push(ciphertext);
        self.ciphertexts.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vault_is_empty() {
        let vault = Vault::default();
        assert!(!vault.is_initialized());
        assert!(vault.encrypted_key().is_empty());
        assert_eq!(vault.secret_count(), 0);
        assert!(matches!(
            vault.secret(0),
            Err(DarkVaultError::SecretIndexOutOfBounds { index: 0, len: 0 })
        ));
    }

    #[test]
    fn append_assigns_stable_indices() {
        let mut vault = Vault::initialized_with(EncryptedHandle::from_bytes([1u8; 32]));
        assert_eq!(vault.append("a".into()), 0);
        assert_eq!(vault.append("b".into()), 1);

        vault.replace_key(EncryptedHandle::from_bytes([2u8; 32]));
        assert!(vault.is_initialized());
        assert_eq!(vault.secret(0).unwrap(), "a");
        assert_eq!(vault.secret(1).unwrap(), "b");
        assert_eq!(vault.secrets().count(), 2);
    }
}
