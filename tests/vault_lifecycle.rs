use darkvault::{
    AccessLayer, CallerContext, DarkVaultError, Identity, InputProof, LocalAccessLayer,
    VaultLedger,
};

const LEDGER: Identity = Identity::repeat_byte(0xC0);
const ALICE: Identity = Identity::repeat_byte(0x0A);
const BOB: Identity = Identity::repeat_byte(0x0B);

fn new_ledger() -> VaultLedger<LocalAccessLayer> {
    VaultLedger::new(LEDGER, LocalAccessLayer::new().unwrap())
}

fn create(
    ledger: &VaultLedger<LocalAccessLayer>,
    owner: Identity,
    key: Identity,
) -> Result<(), DarkVaultError> {
    let (input, proof) = ledger.access().encrypt_input(key, LEDGER, owner).unwrap();
    ledger.create_vault(&CallerContext::authenticated(owner), &input, &proof)
}

fn rotate(
    ledger: &VaultLedger<LocalAccessLayer>,
    owner: Identity,
    key: Identity,
) -> Result<(), DarkVaultError> {
    let (input, proof) = ledger.access().encrypt_input(key, LEDGER, owner).unwrap();
    ledger.rotate_vault_key(&CallerContext::authenticated(owner), &input, &proof)
}

#[test]
fn test_has_vault_flips_once_and_stays() {
    let ledger = new_ledger();
    assert!(!ledger.has_vault(ALICE));

    create(&ledger, ALICE, Identity::repeat_byte(0x41)).unwrap();
    assert!(ledger.has_vault(ALICE));

    // Rotation and storage do not touch the flag.
    rotate(&ledger, ALICE, Identity::repeat_byte(0x42)).unwrap();
    ledger
        .store_secret(&CallerContext::authenticated(ALICE), "dv1:iv1:payload1")
        .unwrap();
    assert!(ledger.has_vault(ALICE));

    // Other owners are unaffected.
    assert!(!ledger.has_vault(BOB));
}

#[test]
fn test_second_create_fails_and_keeps_first_key() {
    let ledger = new_ledger();
    create(&ledger, ALICE, Identity::repeat_byte(0x41)).unwrap();
    let first = ledger.get_vault_key(ALICE);

    let err = create(&ledger, ALICE, Identity::repeat_byte(0x99)).unwrap_err();
    assert!(matches!(err, DarkVaultError::VaultAlreadyExists));
    assert_eq!(ledger.get_vault_key(ALICE), first);
    assert_eq!(ledger.events().len(), 1);
}

#[test]
fn test_rotate_and_store_require_a_vault() {
    let ledger = new_ledger();
    let bob = CallerContext::authenticated(BOB);

    assert!(matches!(
        rotate(&ledger, BOB, Identity::repeat_byte(0x42)),
        Err(DarkVaultError::VaultMissing)
    ));
    assert!(matches!(
        ledger.store_secret(&bob, "x"),
        Err(DarkVaultError::VaultMissing)
    ));

    assert_eq!(ledger.get_secret_count(BOB), 0);
    assert!(!ledger.has_vault(BOB));
    assert!(ledger.events().is_empty());
}

#[test]
fn test_rotation_with_rejected_proof_changes_nothing() {
    let ledger = new_ledger();
    let alice = CallerContext::authenticated(ALICE);
    create(&ledger, ALICE, Identity::repeat_byte(0x41)).unwrap();
    let before = ledger.get_vault_key(ALICE);

    // 1. A genuine input with a forged proof.
    let (input, _) = ledger
        .access()
        .encrypt_input(Identity::repeat_byte(0x42), LEDGER, ALICE)
        .unwrap();
    let err = ledger
        .rotate_vault_key(&alice, &input, &InputProof(vec![0u8; 32]))
        .unwrap_err();
    assert!(matches!(err, DarkVaultError::InvalidInputProof));

    // 2. Key, grants and event log are as they were.
    assert_eq!(ledger.get_vault_key(ALICE), before);
    assert!(!ledger.access().is_allowed(input.0, ALICE));
    assert!(!ledger.access().is_allowed(input.0, LEDGER));
    assert_eq!(ledger.events().len(), 1);

    // 3. A proof minted for another owner is rejected the same way.
    let (input, proof) = ledger
        .access()
        .encrypt_input(Identity::repeat_byte(0x43), LEDGER, BOB)
        .unwrap();
    assert!(matches!(
        ledger.rotate_vault_key(&alice, &input, &proof),
        Err(DarkVaultError::InvalidInputProof)
    ));
    assert_eq!(ledger.get_vault_key(ALICE), before);
    assert_eq!(ledger.events().len(), 1);
}

#[test]
fn test_rotation_replaces_key_and_keeps_secrets() {
    let ledger = new_ledger();
    let alice = CallerContext::authenticated(ALICE);
    create(&ledger, ALICE, Identity::repeat_byte(0x41)).unwrap();
    ledger.store_secret(&alice, "dv1:a:b").unwrap();
    let before = ledger.get_vault_key(ALICE);

    rotate(&ledger, ALICE, Identity::repeat_byte(0x42)).unwrap();

    assert_ne!(ledger.get_vault_key(ALICE), before);
    assert_eq!(ledger.get_secret_count(ALICE), 1);
    assert_eq!(ledger.get_secret(ALICE, 0).unwrap(), "dv1:a:b");
}

#[test]
fn test_uninitialized_owner_reads_as_empty() {
    let ledger = new_ledger();
    assert!(ledger.get_vault_key(BOB).is_empty());
    assert_eq!(ledger.get_secret_count(BOB), 0);
}

#[test]
fn test_proof_for_another_owner_is_rejected() {
    // Alice's input replayed by Bob must not create a vault for Bob.
    let ledger = new_ledger();
    let (input, proof) = ledger
        .access()
        .encrypt_input(Identity::repeat_byte(0x41), LEDGER, ALICE)
        .unwrap();

    let err = ledger
        .create_vault(&CallerContext::authenticated(BOB), &input, &proof)
        .unwrap_err();
    assert!(matches!(err, DarkVaultError::InvalidInputProof));
    assert!(!ledger.has_vault(BOB));

    // The input is still good for Alice.
    ledger
        .create_vault(&CallerContext::authenticated(ALICE), &input, &proof)
        .unwrap();
    assert!(ledger.has_vault(ALICE));
}
