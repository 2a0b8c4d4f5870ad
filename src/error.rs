//! Error types for darkvault.
//!
//! Every variant is a distinct failure mode so callers can branch on the
//! reason (create instead of rotate, prompt for a valid index, and so on).
//! Messages name *what* failed and never echo key material or plaintext.

use std::fmt;

/// The single error type for all darkvault operations.
#[derive(Debug)]
pub enum DarkVaultError {
    /// `create_vault` was called by an owner whose vault is already initialized.
    VaultAlreadyExists,

    /// A mutation that needs an initialized vault was called before `create_vault`.
    VaultMissing,

    /// `get_secret` was called with an index outside `[0, len)`.
    SecretIndexOutOfBounds { index: usize, len: usize },

    /// The input proof does not match the encrypted input or its context.
    InvalidInputProof,

    /// The encrypted handle is not known to the access layer.
    UnknownHandle,

    /// The requester (or the ledger holding the handle) has no grant on it.
    AccessDenied,

    /// The decryption session is past its expiry.
    SessionExpired,

    /// The decryption session is not authentic or does not cover the request.
    InvalidSession,

    /// A symmetric key was rejected by the cipher.
    InvalidKey,

    /// Encryption failed. The underlying `ring` operation returned an error.
    EncryptionFailure,

    /// Decryption failed: wrong key, tampered ciphertext or bad GCM tag.
    DecryptionFailure,

    /// The system's random number generator failed to produce bytes.
    RandomnessFailure,

    /// The envelope carries a version tag this build does not understand.
    UnsupportedEnvelopeVersion(String),

    /// The envelope is missing a field or a field is not valid base64.
    MalformedEnvelope(String),

    /// Decrypted bytes are not valid UTF-8.
    InvalidUtf8,

    /// Configuration could not be loaded or failed validation.
    Config(String),

    /// Serializing or deserializing ledger state failed.
    Serialization(String),

    /// Underlying I/O failure (config file, event log file).
    Io(std::io::Error),
}

impl fmt::Display for DarkVaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VaultAlreadyExists => write!(f, "vault already exists"),
            Self::VaultMissing => write!(f, "vault missing"),
            Self::SecretIndexOutOfBounds { index, len } => {
                write!(f, "secret index {} out of bounds (count {})", index, len)
            }
            Self::InvalidInputProof => write!(f, "invalid input proof"),
            Self::UnknownHandle => write!(f, "unknown encrypted handle"),
            Self::AccessDenied => write!(f, "access denied"),
            Self::SessionExpired => write!(f, "decryption session expired"),
            Self::InvalidSession => write!(f, "invalid decryption session"),
            Self::InvalidKey => write!(f, "invalid key"),
            Self::EncryptionFailure => write!(f, "encryption failed"),
            Self::DecryptionFailure => write!(f, "decryption failed"),
            Self::RandomnessFailure => write!(f, "randomness source failed"),
            Self::UnsupportedEnvelopeVersion(tag) => {
                write!(f, "unsupported envelope version: {}", tag)
            }
            Self::MalformedEnvelope(reason) => write!(f, "malformed envelope: {}", reason),
            Self::InvalidUtf8 => write!(f, "decrypted secret is not valid utf-8"),
            Self::Config(reason) => write!(f, "invalid configuration: {}", reason),
            Self::Serialization(reason) => write!(f, "serialization failed: {}", reason),
            Self::Io(err) => write!(f, "i/o error: {}", err),
        }
    }
}

impl std::error::Error for DarkVaultError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DarkVaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for DarkVaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
