//! The vault ledger.
//!
//! Owns the owner → [`Vault`] mapping and is its only mutator. Mutations
//! are serialized through a single lock, which gives every call the same
//! all-or-nothing behaviour a host ledger's transaction model gives: every
//! check (initialization state, input proof) runs before anything is
//! written, so a failed call leaves no trace.
//!
//! Event sinks run after the state lock is released, under a lock of
//! their own, and see events in log order. A sink may read the ledger but
//! must not mutate it.
//!
//! Mutators take a [`CallerContext`] and act on the caller's own vault.
//! Readers take an explicit owner and are unrestricted; handing out an
//! encrypted handle reveals nothing without a grant from the access layer.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::access::{AccessLayer, EncryptedHandle, ExternalInput, InputProof};
use crate::config::LedgerConfig;
use crate::error::DarkVaultError;
use crate::events::{
    EventLog, EventSink, EventSinks, FileEventSink, VaultEvent, VaultEventKind,
};
use crate::identity::{CallerContext, Identity};
use crate::vault::Vault;

#[derive(Default)]
struct LedgerState {
    vaults: HashMap<Identity, Vault>,
    events: EventLog,
}

#[derive(Debug, Default)]
struct SinkState {
    sinks: EventSinks,
    /// Number of log entries already handed to the sinks.
    delivered: usize,
}

/// Persisted form of the ledger: owner → vault. Holds handles and
/// ciphertexts only, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub ledger_identity: Identity,
    pub vaults: BTreeMap<Identity, Vault>,
}

impl LedgerSnapshot {
    pub fn to_json(&self) -> Result<String, DarkVaultError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DarkVaultError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Per-owner encrypted vault storage.
pub struct VaultLedger<A: AccessLayer> {
    identity: Identity,
    access: A,
    state: Mutex<LedgerState>,
    sinks: Mutex<SinkState>,
}

impl<A: AccessLayer> std::fmt::Debug for VaultLedger<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultLedger")
            .field("identity", &self.identity)
            .field("vaults", &self.state().vaults.len())
            .finish()
    }
}

impl<A: AccessLayer> VaultLedger<A> {
    /// An empty ledger acting as `identity` against `access`.
    pub fn new(identity: Identity, access: A) -> Self {
        Self {
            identity,
            access,
            state: Mutex::new(LedgerState::default()),
            sinks: Mutex::new(SinkState::default()),
        }
    }

    /// An empty ledger built from a validated config. Attaches a
    /// [`FileEventSink`] when `event_log_path` is set.
    pub fn with_config(config: &LedgerConfig, access: A) -> Result<Self, DarkVaultError> {
        config.validate()?;
        let ledger = Self::new(config.ledger_identity, access);
        if let Some(path) = &config.event_log_path {
            ledger.add_event_sink(Box::new(FileEventSink::new(path)?));
        }
        Ok(ledger)
    }

    /// Rebuild a ledger from a snapshot taken under the same identity.
    ///
    /// Grants live in the access layer and are not replayed.
    pub fn restore(
        config: &LedgerConfig,
        access: A,
        snapshot: LedgerSnapshot,
    ) -> Result<Self, DarkVaultError> {
        if snapshot.ledger_identity != config.ledger_identity {
            return Err(DarkVaultError::Config(format!(
                "snapshot belongs to ledger {}, not {}",
                snapshot.ledger_identity, config.ledger_identity
            )));
        }
        let ledger = Self::with_config(config, access)?;
        ledger.state().vaults = snapshot.vaults.into_iter().collect();
        Ok(ledger)
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sink_state(&self) -> MutexGuard<'_, SinkState> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The ledger's own identity.
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// The access layer this ledger validates and grants through.
    pub fn access(&self) -> &A {
        &self.access
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create the caller's vault around a validated encrypted key.
    ///
    /// Grants the ledger and the caller access to the key handle.
    pub fn create_vault(
        &self,
        caller: &CallerContext,
        input: &ExternalInput,
        proof: &InputProof,
    ) -> Result<(), DarkVaultError> {
        let owner = caller.identity();
        let mut state = self.state();

        if state.vaults.get(&owner).is_some_and(Vault::is_initialized) {
            warn!(%owner, "create_vault rejected: vault already exists");
            return Err(DarkVaultError::VaultAlreadyExists);
        }

        let handle = self.validated_key(input, proof, owner)?;
        state.vaults.insert(owner, Vault::initialized_with(handle));
        self.emit(state, VaultEvent::now(owner, VaultEventKind::VaultCreated));

        debug!(%owner, "vault created");
        Ok(())
    }

    /// Replace the caller's encrypted key.
    ///
    /// Grants go to the new handle only. The old handle keeps whatever
    /// grants it had; it is simply no longer referenced by the vault.
    pub fn rotate_vault_key(
        &self,
        caller: &CallerContext,
        input: &ExternalInput,
        proof: &InputProof,
    ) -> Result<(), DarkVaultError> {
        let owner = caller.identity();
        let mut state = self.state();

        if !state.vaults.get(&owner).is_some_and(Vault::is_initialized) {
            warn!(%owner, "rotate_vault_key rejected: vault missing");
            return Err(DarkVaultError::VaultMissing);
        }

        let handle = self.validated_key(input, proof, owner)?;
        let vault = state
            .vaults
            .get_mut(&owner)
            .ok_or(DarkVaultError::VaultMissing)?;
        vault.replace_key(handle);
        self.emit(state, VaultEvent::now(owner, VaultEventKind::VaultKeyRotated));

        debug!(%owner, "vault key rotated");
        Ok(())
    }

    /// Append a client-encrypted secret to the caller's vault.
    ///
    /// The ciphertext is stored verbatim; its format is not checked.
    pub fn store_secret(
        &self,
        caller: &CallerContext,
        ciphertext: impl Into<String>,
    ) -> Result<(), DarkVaultError> {
        let owner = caller.identity();
        let mut state = self.state();

        let vault = match state.vaults.get_mut(&owner) {
            Some(vault) if vault.is_initialized() => vault,
            _ => {
                warn!(%owner, "store_secret rejected: vault missing");
                return Err(DarkVaultError::VaultMissing);
            }
        };
        let index = vault.append(ciphertext.into());
        self.emit(
            state,
            VaultEvent::now(owner, VaultEventKind::SecretStored { index }),
        );

        debug!(%owner, index, "secret stored");
        Ok(())
    }

    /// Validate a key input for `owner` and grant the ledger and `owner`
    /// access to the resulting handle.
    fn validated_key(
        &self,
        input: &ExternalInput,
        proof: &InputProof,
        owner: Identity,
    ) -> Result<EncryptedHandle, DarkVaultError> {
        let handle = self
            .access
            .validate(input, proof, self.identity, owner)
            .inspect_err(|err| warn!(%owner, %err, "encrypted key input rejected"))?;
        self.access.grant_self_access(handle, self.identity);
        self.access.grant_access(handle, owner);
        Ok(handle)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Whether `owner` has created a vault.
    pub fn has_vault(&self, owner: Identity) -> bool {
        self.state()
            .vaults
            .get(&owner)
            .is_some_and(Vault::is_initialized)
    }

    /// The encrypted key handle for `owner`, or [`EncryptedHandle::ZERO`].
    pub fn get_vault_key(&self, owner: Identity) -> EncryptedHandle {
        self.state()
            .vaults
            .get(&owner)
            .map(Vault::encrypted_key)
            .unwrap_or_default()
    }

    /// Number of secrets stored by `owner`.
    pub fn get_secret_count(&self, owner: Identity) -> usize {
        self.state()
            .vaults
            .get(&owner)
            .map_or(0, Vault::secret_count)
    }

    /// The ciphertext `owner` stored at `index`.
    pub fn get_secret(&self, owner: Identity, index: usize) -> Result<String, DarkVaultError> {
        let state = self.state();
        match state.vaults.get(&owner) {
            Some(vault) => vault.secret(index).map(str::to_owned),
            None => Err(DarkVaultError::SecretIndexOutOfBounds { index, len: 0 }),
        }
    }

    /// Every ciphertext `owner` stored, in insertion order, read under one lock.
    pub fn get_secrets(&self, owner: Identity) -> Vec<String> {
        self.state()
            .vaults
            .get(&owner)
            .map(|vault| vault.secrets().cloned().collect())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Events and persistence
    // -----------------------------------------------------------------------

    /// Record `event` in the log, release the state lock, then deliver.
    fn emit(&self, mut state: MutexGuard<'_, LedgerState>, event: VaultEvent) {
        state.events.append(event);
        drop(state);
        self.deliver_pending();
    }

    fn deliver_pending(&self) {
        let mut sinks = self.sink_state();
        self.deliver_pending_to(&mut sinks);
    }

    /// Hand every not-yet-delivered log entry to the sinks.
    ///
    /// Lock order is sinks, then state; the state lock is held only while
    /// copying the pending entries out.
    fn deliver_pending_to(&self, sinks: &mut SinkState) {
        let pending: Vec<VaultEvent> = {
            let state = self.state();
            let pending: Vec<VaultEvent> =
                state.events.iter().skip(sinks.delivered).cloned().collect();
            sinks.delivered = state.events.len();
            pending
        };
        for event in &pending {
            sinks.sinks.forward(event);
        }
    }

    /// Every event emitted so far, in order.
    pub fn events(&self) -> Vec<VaultEvent> {
        self.state().events.iter().cloned().collect()
    }

    /// Forward every subsequent event to `sink`.
    pub fn add_event_sink(&self, sink: Box<dyn EventSink>) {
        let mut sinks = self.sink_state();
        self.deliver_pending_to(&mut sinks);
        sinks.sinks.add(sink);
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state();
        LedgerSnapshot {
            ledger_identity: self.identity,
            vaults: state
                .vaults
                .iter()
                .map(|(owner, vault)| (*owner, vault.clone()))
                .collect(),
        }
    }
}
