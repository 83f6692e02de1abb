// Identity quickstart.
// --------------------
// Loads the identity stored under BTRY_STORAGE_DIR (creating one on first
// run) and prints its nickname, public key and withdraw signature. With an
// argument, the identity is restored from that secret and saved instead.
//
// Run:
//   cargo run --example identity
//   cargo run --example identity -- <64-hex private key | any secret of 12+ chars>
//
// Env:
//   BTRY_STORAGE_DIR  (default: .btry)

use btry_client::wallet::{self, FileStorage, Identity, IdentityStorage};
use btry_client::ClientConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let storage = FileStorage::open(&config.storage_dir)?;

    let identity = match std::env::args().nth(1) {
        Some(secret) => {
            let identity = Identity::restore(&secret)?;
            storage.save(&identity)?;
            println!("Restored identity saved to {}", storage.path().display());
            identity
        }
        None => wallet::load_or_generate(&storage)?,
    };

    println!("nickname:   {}", identity.nickname);
    println!("public key: {}", identity.public_key);
    println!("signature:  {}", identity.signature()?);

    wallet::verify(&identity.public_key, &identity.signature()?)?;
    println!("signature verifies against the public key");
    Ok(())
}
