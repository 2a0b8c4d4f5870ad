//! In-process access layer.
//!
//! Stands in for an FHE coprocessor plus decryption relayer. Plaintext
//! values live in a handle registry that never leaves this module; the
//! ledger only ever sees handles. Input proofs and session tokens are
//! HMAC-SHA256 tags under a per-instance key, so a proof minted for one
//! `(ledger, user)` pair does not validate under any other.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, warn};

use crate::access::{AccessLayer, DecryptionSession, EncryptedHandle, ExternalInput, InputProof};
use crate::error::DarkVaultError;
use crate::identity::Identity;

const INPUT_PROOF_DOMAIN: &[u8] = b"darkvault/input-proof/v1";
const SESSION_DOMAIN: &[u8] = b"darkvault/session/v1";

#[derive(Default)]
struct Registry {
    values: HashMap<EncryptedHandle, Identity>,
    grants: HashMap<EncryptedHandle, HashSet<Identity>>,
}

/// An [`AccessLayer`] backed by an in-memory handle registry.
pub struct LocalAccessLayer {
    signing_key: hmac::Key,
    registry: Mutex<Registry>,
}

impl std::fmt::Debug for LocalAccessLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry();
        f.debug_struct("LocalAccessLayer")
            .field("handles", &registry.values.len())
            .finish()
    }
}

impl LocalAccessLayer {
    /// Create a layer with a fresh random signing key.
    pub fn new() -> Result<Self, DarkVaultError> {
        let rng = SystemRandom::new();
        let signing_key = hmac::Key::generate(hmac::HMAC_SHA256, &rng)
            .map_err(|_| DarkVaultError::RandomnessFailure)?;
        Ok(Self {
            signing_key,
            registry: Mutex::new(Registry::default()),
        })
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue a session as if the current time were `now`.
    pub fn issue_session_at(
        &self,
        requester: Identity,
        ledgers: &[Identity],
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<DecryptionSession, DarkVaultError> {
        if ttl <= Duration::zero() {
            return Err(DarkVaultError::InvalidSession);
        }
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(DarkVaultError::InvalidSession)?;

        let mut session = DecryptionSession {
            requester,
            ledgers: ledgers.to_vec(),
            issued_at: now,
            expires_at,
            token: Vec::new(),
        };
        let tag = hmac::sign(&self.signing_key, &session_message(&session));
        session.token = tag.as_ref().to_vec();
        Ok(session)
    }

    /// Serve a decryption request as if the current time were `now`.
    pub fn request_user_decryption_at(
        &self,
        handle: EncryptedHandle,
        ledger: Identity,
        requester: Identity,
        session: &DecryptionSession,
        now: DateTime<Utc>,
    ) -> Result<Identity, DarkVaultError> {
        hmac::verify(&self.signing_key, &session_message(session), &session.token)
            .map_err(|_| DarkVaultError::InvalidSession)?;
        if session.requester != requester || !session.covers(ledger) {
            return Err(DarkVaultError::InvalidSession);
        }
        if session.is_expired_at(now) {
            return Err(DarkVaultError::SessionExpired);
        }

        let registry = self.registry();
        let value = *registry
            .values
            .get(&handle)
            .ok_or(DarkVaultError::UnknownHandle)?;
        let allowed = registry
            .grants
            .get(&handle)
            .is_some_and(|set| set.contains(&requester) && set.contains(&ledger));
        if !allowed {
            warn!(%handle, %requester, "decryption refused: missing grant");
            return Err(DarkVaultError::AccessDenied);
        }

        debug!(%handle, %requester, "user decryption served");
        Ok(value)
    }
}

impl AccessLayer for LocalAccessLayer {
    fn encrypt_input(
        &self,
        value: Identity,
        ledger: Identity,
        user: Identity,
    ) -> Result<(ExternalInput, InputProof), DarkVaultError> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes).map_err(|_| DarkVaultError::RandomnessFailure)?;
        let handle = EncryptedHandle::from_bytes(bytes);

        let tag = hmac::sign(&self.signing_key, &input_message(handle, ledger, user));
        self.registry().values.insert(handle, value);

        Ok((ExternalInput(handle), InputProof(tag.as_ref().to_vec())))
    }

    fn validate(
        &self,
        input: &ExternalInput,
        proof: &InputProof,
        ledger: Identity,
        caller: Identity,
    ) -> Result<EncryptedHandle, DarkVaultError> {
        let handle = input.0;
        hmac::verify(
            &self.signing_key,
            &input_message(handle, ledger, caller),
            &proof.0,
        )
        .map_err(|_| DarkVaultError::InvalidInputProof)?;

        if !self.registry().values.contains_key(&handle) {
            return Err(DarkVaultError::UnknownHandle);
        }
        Ok(handle)
    }

    fn grant_access(&self, handle: EncryptedHandle, identity: Identity) {
        self.registry()
            .grants
            .entry(handle)
            .or_default()
            .insert(identity);
    }

    fn is_allowed(&self, handle: EncryptedHandle, identity: Identity) -> bool {
        self.registry()
            .grants
            .get(&handle)
            .is_some_and(|set| set.contains(&identity))
    }

    fn issue_session(
        &self,
        requester: Identity,
        ledgers: &[Identity],
        ttl: Duration,
    ) -> Result<DecryptionSession, DarkVaultError> {
        self.issue_session_at(requester, ledgers, ttl, Utc::now())
    }

    fn request_user_decryption(
        &self,
        handle: EncryptedHandle,
        ledger: Identity,
        requester: Identity,
        session: &DecryptionSession,
    ) -> Result<Identity, DarkVaultError> {
        self.request_user_decryption_at(handle, ledger, requester, session, Utc::now())
    }
}

fn input_message(handle: EncryptedHandle, ledger: Identity, user: Identity) -> Vec<u8> {
    let mut msg = Vec::with_capacity(INPUT_PROOF_DOMAIN.len() + 32 + 20 + 20);
    msg.extend_from_slice(INPUT_PROOF_DOMAIN);
    msg.extend_from_slice(handle.as_b256().as_slice());
    msg.extend_from_slice(ledger.as_slice());
    msg.extend_from_slice(user.as_slice());
    msg
}

fn session_message(session: &DecryptionSession) -> Vec<u8> {
    let mut msg = Vec::with_capacity(SESSION_DOMAIN.len() + 20 * (session.ledgers.len() + 1) + 24);
    msg.extend_from_slice(SESSION_DOMAIN);
    msg.extend_from_slice(session.requester.as_slice());
    msg.extend_from_slice(&(session.ledgers.len() as u64).to_be_bytes());
    for ledger in &session.ledgers {
        msg.extend_from_slice(ledger.as_slice());
    }
    msg.extend_from_slice(&session.issued_at.timestamp_millis().to_be_bytes());
    msg.extend_from_slice(&session.expires_at.timestamp_millis().to_be_bytes());
    msg
}
