//! The encrypted-value access seam.
//!
//! The ledger never sees plaintext key material. It holds opaque
//! [`EncryptedHandle`]s and relies on an [`AccessLayer`] to validate client
//! inputs, record who may decrypt a handle, and serve decryption requests
//! for authorized identities. Any FHE backend plugs in behind this trait;
//! [`crate::local_access::LocalAccessLayer`] is the in-process one.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::B256;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DarkVaultError;
use crate::identity::Identity;

/// An opaque reference to an encrypted value held by the access layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EncryptedHandle(B256);

impl EncryptedHandle {
    /// The handle returned for an owner without a vault.
    pub const ZERO: Self = Self(B256::ZERO);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(B256::from(bytes))
    }

    /// True for the empty handle.
    pub fn is_empty(&self) -> bool {
        self.0 == B256::ZERO
    }

    pub fn as_b256(&self) -> &B256 {
        &self.0
    }
}

impl Default for EncryptedHandle {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for EncryptedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedHandle({})", self.0)
    }
}

impl fmt::Display for EncryptedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An encrypted value as submitted by a client, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalInput(pub EncryptedHandle);

/// Proof that an [`ExternalInput`] was produced for a given ledger and user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProof(pub Vec<u8>);

impl fmt::Debug for InputProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputProof({} bytes)", self.0.len())
    }
}

/// Credentials a requester presents to have a handle decrypted for them.
///
/// A session names the requester, the ledgers whose handles it may be used
/// against, and a validity window. `token` authenticates all of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionSession {
    pub requester: Identity,
    pub ledgers: Vec<Identity>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token: Vec<u8>,
}

impl DecryptionSession {
    /// Whether the validity window has closed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the session may be used against handles held by `ledger`.
    pub fn covers(&self, ledger: Identity) -> bool {
        self.ledgers.contains(&ledger)
    }
}

/// Capabilities the vault ledger and its clients consume from an
/// encrypted-value backend.
///
/// Methods take `&self`; implementations serialize their own state. Grants
/// are idempotent and never revoked through this interface.
pub trait AccessLayer: Send + Sync {
    /// Encrypt `value` into a fresh handle plus a proof bound to
    /// `(ledger, user)`.
    fn encrypt_input(
        &self,
        value: Identity,
        ledger: Identity,
        user: Identity,
    ) -> Result<(ExternalInput, InputProof), DarkVaultError>;

    /// Check `proof` against `input` in the `(ledger, caller)` context and
    /// return the validated handle.
    fn validate(
        &self,
        input: &ExternalInput,
        proof: &InputProof,
        ledger: Identity,
        caller: Identity,
    ) -> Result<EncryptedHandle, DarkVaultError>;

    /// Grant the calling ledger access to its own handle.
    fn grant_self_access(&self, handle: EncryptedHandle, ledger: Identity) {
        self.grant_access(handle, ledger);
    }

    /// Add `identity` to the handle's authorized-decryptor set.
    fn grant_access(&self, handle: EncryptedHandle, identity: Identity);

    /// Whether `identity` holds a grant on `handle`.
    fn is_allowed(&self, handle: EncryptedHandle, identity: Identity) -> bool;

    /// Issue decryption credentials for `requester`, valid for `ttl` against
    /// handles held by any of `ledgers`.
    fn issue_session(
        &self,
        requester: Identity,
        ledgers: &[Identity],
        ttl: Duration,
    ) -> Result<DecryptionSession, DarkVaultError>;

    /// Decrypt `handle` (held by `ledger`) for `requester`.
    ///
    /// Fails unless the session is authentic, unexpired, issued to
    /// `requester`, covers `ledger`, and both `requester` and `ledger` hold a
    /// grant on the handle.
    fn request_user_decryption(
        &self,
        handle: EncryptedHandle,
        ledger: Identity,
        requester: Identity,
        session: &DecryptionSession,
    ) -> Result<Identity, DarkVaultError>;
}

impl<T: AccessLayer + ?Sized> AccessLayer for Arc<T> {
    fn encrypt_input(
        &self,
        value: Identity,
        ledger: Identity,
        user: Identity,
    ) -> Result<(ExternalInput, InputProof), DarkVaultError> {
        (**self).encrypt_input(value, ledger, user)
    }

    fn validate(
        &self,
        input: &ExternalInput,
        proof: &InputProof,
        ledger: Identity,
        caller: Identity,
    ) -> Result<EncryptedHandle, DarkVaultError> {
        (**self).validate(input, proof, ledger, caller)
    }

    fn grant_self_access(&self, handle: EncryptedHandle, ledger: Identity) {
        (**self).grant_self_access(handle, ledger)
    }

    fn grant_access(&self, handle: EncryptedHandle, identity: Identity) {
        (**self).grant_access(handle, identity)
    }

    fn is_allowed(&self, handle: EncryptedHandle, identity: Identity) -> bool {
        (**self).is_allowed(handle, identity)
    }

    fn issue_session(
        &self,
        requester: Identity,
        ledgers: &[Identity],
        ttl: Duration,
    ) -> Result<DecryptionSession, DarkVaultError> {
        (**self).issue_session(requester, ledgers, ttl)
    }

    fn request_user_decryption(
        &self,
        handle: EncryptedHandle,
        ledger: Identity,
        requester: Identity,
        session: &DecryptionSession,
    ) -> Result<Identity, DarkVaultError> {
        (**self).request_user_decryption(handle, ledger, requester, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_handle_is_empty_and_default() {
        assert!(EncryptedHandle::ZERO.is_empty());
        assert_eq!(EncryptedHandle::default(), EncryptedHandle::ZERO);
        assert!(!EncryptedHandle::from_bytes([7u8; 32]).is_empty());
    }

    #[test]
    fn session_window_and_coverage() {
        let ledger = Identity::repeat_byte(0xAA);
        let issued_at = Utc::now();
        let session = DecryptionSession {
            requester: Identity::repeat_byte(0x01),
            ledgers: vec![ledger],
            issued_at,
            expires_at: issued_at + Duration::seconds(60),
            token: Vec::new(),
        };

        assert!(session.covers(ledger));
        assert!(!session.covers(Identity::repeat_byte(0xBB)));
        assert!(!session.is_expired_at(issued_at));
        assert!(session.is_expired_at(issued_at + Duration::seconds(60)));
    }
}
