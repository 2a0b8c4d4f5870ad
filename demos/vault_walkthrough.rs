//! Minimal walkthrough: one owner, one vault, two-step reveal.
//!
//! Run with: `cargo run --example vault_walkthrough`
//!
//! - Alice creates a vault; the ledger stores only an encrypted key handle
//! - Secrets are encrypted locally and stored as `dv1` envelopes
//! - Revealing them needs a decryption session that only Alice can use
//! - Events are persisted to a JSON-lines file and read back at the end

use darkvault::{CallerContext, Identity, LedgerConfig, LocalAccessLayer, VaultClient, VaultLedger};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 1. Setup
    let events_dir = tempfile::tempdir()?;
    let events_path = events_dir.path().join("events.jsonl");
    let config = LedgerConfig {
        event_log_path: Some(events_path.clone()),
        ..LedgerConfig::for_ledger(Identity::repeat_byte(0xC0))
    };
    let ledger = VaultLedger::with_config(&config, LocalAccessLayer::new()?)?;

    let alice = Identity::repeat_byte(0x0A);
    let client = VaultClient::new(&ledger, CallerContext::authenticated(alice))
        .with_session_ttl(config.session_ttl());

    // 2. Create the vault
    client.create_vault()?;
    println!("vault key handle: {}", ledger.get_vault_key(alice));

    // 3. Store secrets
    let session = client.open_session()?;
    client.store_secret(&session, "wifi: correct horse battery staple")?;
    client.store_secret(&session, "door code: 4711")?;

    for index in 0..client.secret_count() {
        println!("  [{index}] on ledger: {}", client.get_secret(index)?);
    }

    // 4. Reveal
    for secret in client.reveal_secrets(&session)? {
        println!("  [{}] revealed: {}", secret.index, secret.plaintext?);
    }

    // 5. Events as the file sink recorded them
    println!("{} event(s) written to {}", ledger.events().len(), events_path.display());
    for line in std::fs::read_to_string(&events_path)?.lines() {
        println!("  {line}");
    }
    Ok(())
}
