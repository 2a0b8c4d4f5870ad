//! Versioned textual envelope for client-encrypted secrets.
//!
//! ```text
//! dv1:<base64 nonce>:<base64 ciphertext + tag>
//! ```
//!
//! The ledger stores these strings verbatim and never parses them; only
//! the client cipher produces and consumes them.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::DarkVaultError;

/// Version tag written by this build.
pub const VERSION_TAG: &str = "dv1";

/// Nonce length for the `dv1` scheme (96 bits).
pub const NONCE_LEN: usize = 12;

const SEPARATOR: char = ':';

/// A decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub nonce: [u8; NONCE_LEN],
    pub payload: Vec<u8>,
}

/// Render `nonce` and `payload` as a `dv1` envelope string.
pub fn encode(nonce: &[u8; NONCE_LEN], payload: &[u8]) -> String {
    format!(
        "{VERSION_TAG}{SEPARATOR}{}{SEPARATOR}{}",
        BASE64.encode(nonce),
        BASE64.encode(payload)
    )
}

/// Parse an envelope string.
///
/// Fails with `UnsupportedEnvelopeVersion` for an unknown tag and
/// `MalformedEnvelope` for a missing, extra, or undecodable field.
pub fn decode(envelope: &str) -> Result<Envelope, DarkVaultError> {
    let mut fields = envelope.split(SEPARATOR);

    let tag = fields.next().unwrap_or_default();
    if tag != VERSION_TAG {
        return Err(DarkVaultError::UnsupportedEnvelopeVersion(tag.to_string()));
    }

    let nonce_field = non_empty(fields.next(), "nonce")?;
    let payload_field = non_empty(fields.next(), "payload")?;
    if fields.next().is_some() {
        return Err(DarkVaultError::MalformedEnvelope("unexpected trailing field".into()));
    }

    let nonce_bytes = BASE64
        .decode(nonce_field)
        .map_err(|e| DarkVaultError::MalformedEnvelope(format!("nonce: {e}")))?;
    let nonce: [u8; NONCE_LEN] = nonce_bytes.try_into().map_err(|_| {
        DarkVaultError::MalformedEnvelope(format!("nonce must be {NONCE_LEN} bytes"))
    })?;
    let payload = BASE64
        .decode(payload_field)
        .map_err(|e| DarkVaultError::MalformedEnvelope(format!("payload: {e}")))?;

    Ok(Envelope { nonce, payload })
}

fn non_empty<'a>(field: Option<&'a str>, name: &str) -> Result<&'a str, DarkVaultError> {
    match field {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(DarkVaultError::MalformedEnvelope(format!("missing {name}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode() {
        let nonce = [9u8; NONCE_LEN];
        let encoded = encode(&nonce, b"opaque");
        assert!(encoded.starts_with("dv1:"));

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.nonce, nonce);
        assert_eq!(decoded.payload, b"opaque");
    }

    #[test]
    fn unknown_version_is_rejected() {
        let encoded = encode(&[0u8; NONCE_LEN], b"x").replacen("dv1", "dv2", 1);
        assert!(matches!(
            decode(&encoded),
            Err(DarkVaultError::UnsupportedEnvelopeVersion(tag)) if tag == "dv2"
        ));
    }

    #[test]
    fn missing_fields_are_rejected() {
        for input in ["dv1", "dv1:", "dv1:AAAAAAAAAAAAAAAA", "dv1:AAAAAAAAAAAAAAAA:"] {
            assert!(
                matches!(decode(input), Err(DarkVaultError::MalformedEnvelope(_))),
                "accepted {input:?}"
            );
        }
    }

    #[test]
    fn bad_base64_and_nonce_length_are_rejected() {
        assert!(matches!(
            decode("dv1:iv1:payload1"),
            Err(DarkVaultError::MalformedEnvelope(_))
        ));
        // 8-byte nonce
        assert!(matches!(
            decode("dv1:AAAAAAAAAAA=:AAAA"),
            Err(DarkVaultError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            decode("dv1:AAAAAAAAAAAAAAAA:AAAA:extra"),
            Err(DarkVaultError::MalformedEnvelope(_))
        ));
    }
}
