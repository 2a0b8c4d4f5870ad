//! The off-ledger key flow.
//!
//! A [`VaultClient`] acts for one authenticated owner. It generates vault
//! keys, submits them to the ledger in encrypted form, and performs the
//! two-step reveal: decrypt the vault key through the access layer, then
//! decrypt each stored secret locally with a key derived from it.

use chrono::Duration;
use tracing::debug;

use crate::access::{AccessLayer, DecryptionSession};
use crate::cipher::{self, SymmetricKey};
use crate::config::LedgerConfig;
use crate::error::DarkVaultError;
use crate::identity::{self, CallerContext, Identity};
use crate::ledger::VaultLedger;

/// The outcome of decrypting one stored secret.
#[derive(Debug)]
pub struct RevealedSecret {
    pub index: usize,
    /// Fails for entries written under a rotated-out key.
    pub plaintext: Result<String, DarkVaultError>,
}

/// Client-side operations for one owner against one ledger.
pub struct VaultClient<'a, A: AccessLayer> {
    ledger: &'a VaultLedger<A>,
    caller: CallerContext,
    session_ttl: Duration,
}

impl<'a, A: AccessLayer> VaultClient<'a, A> {
    pub fn new(ledger: &'a VaultLedger<A>, caller: CallerContext) -> Self {
        Self {
            ledger,
            caller,
            session_ttl: LedgerConfig::default().session_ttl(),
        }
    }

    /// Use `ttl` for sessions opened by [`Self::open_session`].
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn owner(&self) -> Identity {
        self.caller.identity()
    }

    fn submit_key(&self, vault_key: Identity, rotate: bool) -> Result<(), DarkVaultError> {
        let (input, proof) =
            self.ledger
                .access()
                .encrypt_input(vault_key, self.ledger.identity(), self.owner())?;
        if rotate {
            self.ledger.rotate_vault_key(&self.caller, &input, &proof)
        } else {
            self.ledger.create_vault(&self.caller, &input, &proof)
        }
    }

    /// Create the owner's vault under a freshly generated key.
    ///
    /// Returns the plaintext key. Callers may keep it locally to skip the
    /// decryption round trip in [`Self::store_secret_with_key`].
    pub fn create_vault(&self) -> Result<Identity, DarkVaultError> {
        let vault_key = identity::generate_vault_key()?;
        self.submit_key(vault_key, false)?;
        debug!(owner = %self.owner(), "client created vault");
        Ok(vault_key)
    }

    /// Create the owner's vault under a caller-chosen key.
    pub fn create_vault_with_key(&self, vault_key: Identity) -> Result<(), DarkVaultError> {
        self.submit_key(vault_key, false)
    }

    /// Replace the vault key with a freshly generated one and return it.
    ///
    /// Secrets already stored stay encrypted under the old key.
    pub fn rotate_key(&self) -> Result<Identity, DarkVaultError> {
        let vault_key = identity::generate_vault_key()?;
        self.submit_key(vault_key, true)?;
        debug!(owner = %self.owner(), "client rotated vault key");
        Ok(vault_key)
    }

    /// Open a decryption session covering this ledger.
    pub fn open_session(&self) -> Result<DecryptionSession, DarkVaultError> {
        self.ledger.access().issue_session(
            self.owner(),
            &[self.ledger.identity()],
            self.session_ttl,
        )
    }

    /// Step one of the reveal: recover the plaintext vault key.
    pub fn decrypt_key(&self, session: &DecryptionSession) -> Result<Identity, DarkVaultError> {
        let handle = self.ledger.get_vault_key(self.owner());
        if handle.is_empty() {
            return Err(DarkVaultError::VaultMissing);
        }
        self.ledger.access().request_user_decryption(
            handle,
            self.ledger.identity(),
            self.owner(),
            session,
        )
    }

    /// Decrypt the vault key, encrypt `plaintext` with it, and append the
    /// envelope to the ledger.
    pub fn store_secret(
        &self,
        session: &DecryptionSession,
        plaintext: &str,
    ) -> Result<(), DarkVaultError> {
        let vault_key = self.decrypt_key(session)?;
        self.store_secret_with_key(&vault_key, plaintext)
    }

    /// Encrypt `plaintext` under a locally held vault key and append it.
    pub fn store_secret_with_key(
        &self,
        vault_key: &Identity,
        plaintext: &str,
    ) -> Result<(), DarkVaultError> {
        let key = SymmetricKey::for_vault_key(vault_key);
        let envelope = cipher::encrypt_secret(&key, plaintext)?;
        self.ledger.store_secret(&self.caller, envelope)
    }

    pub fn secret_count(&self) -> usize {
        self.ledger.get_secret_count(self.owner())
    }

    /// The raw envelope at `index`.
    pub fn get_secret(&self, index: usize) -> Result<String, DarkVaultError> {
        self.ledger.get_secret(self.owner(), index)
    }

    /// Both reveal steps: decrypt the vault key, then every stored secret.
    ///
    /// Fails outright only if the key cannot be decrypted; per-entry
    /// failures are reported in the returned list.
    pub fn reveal_secrets(
        &self,
        session: &DecryptionSession,
    ) -> Result<Vec<RevealedSecret>, DarkVaultError> {
        let key = SymmetricKey::for_vault_key(&self.decrypt_key(session)?);
        let revealed = self
            .ledger
            .get_secrets(self.owner())
            .iter()
            .enumerate()
            .map(|(index, envelope)| RevealedSecret {
                index,
                plaintext: cipher::decrypt_secret(&key, envelope),
            })
            .collect();
        Ok(revealed)
    }
}
