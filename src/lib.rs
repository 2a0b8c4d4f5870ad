//! # darkvault
//!
//! Per-owner encrypted vault ledger.
//!
//! Each owner has one vault holding a single encrypted vault key and an
//! append-only list of secrets encrypted off-ledger with that key. The
//! ledger never holds plaintext. Revealing a secret is a two-step process:
//! decrypt the vault key through the access layer (only the owner and the
//! ledger hold grants on it), then decrypt each secret locally.
//!
//! ## Layout
//!
//! - [`ledger`]: the vault state machine and its authorization contract.
//! - [`access`]: the encrypted-value seam the ledger depends on;
//!   [`local_access`] implements it in-process.
//! - [`cipher`] and [`envelope`]: client-side secret encryption.
//! - [`client`]: the owner-side flow tying the above together.

pub mod access;
pub mod cipher;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod events;
pub mod identity;
pub mod ledger;
pub mod local_access;
pub mod vault;

pub use access::{AccessLayer, DecryptionSession, EncryptedHandle, ExternalInput, InputProof};
pub use client::{RevealedSecret, VaultClient};
pub use config::LedgerConfig;
pub use error::DarkVaultError;
pub use identity::{generate_vault_key, CallerContext, Identity};
pub use ledger::{LedgerSnapshot, VaultLedger};
pub use local_access::LocalAccessLayer;
pub use vault::Vault;
