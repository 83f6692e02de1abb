// Identity lifecycle through the public API.
// ------------------------------------------
// Restore, persist, reload and prove ownership. No network needed.

use btry_client::error::{Error, ValidationError};
use btry_client::wallet::{self, FileStorage, Identity, IdentityStorage};
use btry_client::nickname_from_key;
use proptest::prelude::*;

const PRIVATE: &str = "0a20cec75e014c4afb5bccbd194b20e6fea7c727a3ccfdf6b72227154a575343";
const PUBLIC: &str = "6281adefcbf753053863061d414a905fb5b9063c22ec44feea10d82c8793a9a9";
const SIGNATURE: &str = "52ac82a03b6fc0d7e4f2aedcaf2b792dbcbd11b1e2664e4659f24429d0b01dbf5707ecb678121c31c2fe6586318c674fe8d04cbf14e194fe461a8dfcb2f7d903";

#[test]
fn restored_identity_survives_a_restart() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    {
        let storage = FileStorage::open(dir.path())?;
        let identity = Identity::restore(PRIVATE)?;
        storage.save(&identity)?;
    }

    let storage = FileStorage::open(dir.path())?;
    let identity = wallet::load_or_generate(&storage)?;
    assert_eq!(identity.public_key, PUBLIC);
    assert_eq!(identity.nickname, nickname_from_key(PUBLIC));
    assert_eq!(identity.signature()?, SIGNATURE);

    let on_disk: serde_json::Value = serde_json::from_slice(&std::fs::read(storage.path())?)?;
    assert_eq!(on_disk["publicKey"], PUBLIC);
    Ok(())
}

#[test]
fn fresh_identities_differ() {
    let a = Identity::generate();
    let b = Identity::generate();
    assert_ne!(a.public_key, b.public_key);
    assert_ne!(a.private_key, b.private_key);
}

#[test]
fn short_restore_input_is_rejected() {
    assert!(matches!(
        Identity::restore("tooshort"),
        Err(Error::Validation(ValidationError::InvalidRestoreInput { .. }))
    ));
}

#[test]
fn debug_output_hides_the_private_key() {
    let identity = Identity::restore(PRIVATE).unwrap();
    let shown = format!("{identity:?}");
    assert!(shown.contains(PUBLIC));
    assert!(!shown.contains(PRIVATE));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_long_input_restores_a_consistent_identity(input in "[ -~]{12,80}") {
        let identity = Identity::restore(&input).unwrap();
        identity.check().unwrap();
        prop_assert_eq!(identity.private_key.len(), 64);
        wallet::verify(&identity.public_key, &identity.signature().unwrap()).unwrap();
        prop_assert_eq!(Identity::restore(&input).unwrap(), identity);
    }
}
