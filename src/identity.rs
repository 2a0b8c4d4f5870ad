//! Identities and the authenticated caller context.
//!
//! Owners, the ledger itself and the vault key material are all 20-byte
//! account addresses. Mutating ledger calls take a [`CallerContext`] rather
//! than an owner parameter, so one identity can never name another's vault.

use alloy_primitives::Address;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::DarkVaultError;

/// An account-like identity (owner, ledger, or vault key material).
pub type Identity = Address;

/// The authenticated identity of whoever submitted the current call.
///
/// Produced by the host after it has authenticated a transaction. The ledger
/// derives the acting owner from this and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    identity: Identity,
}

impl CallerContext {
    /// Bind a context to an identity the host has already authenticated.
    pub fn authenticated(identity: Identity) -> Self {
        Self { identity }
    }

    /// The acting identity.
    pub fn identity(&self) -> Identity {
        self.identity
    }
}

/// Generate fresh vault key material: a random 20-byte address.
///
/// Uses `ring::rand::SystemRandom`. The returned value is plaintext key
/// material and must only ever reach the ledger in encrypted form.
pub fn generate_vault_key() -> Result<Identity, DarkVaultError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 20];
    rng.fill(&mut bytes).map_err(|_| DarkVaultError::RandomnessFailure)?;
    Ok(Address::from(bytes))
}
