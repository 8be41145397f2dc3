//! Signature subsystem
//!
//! Key pairs, signing, never-failing verification, and the passphrase-sealed
//! keyring that payload producers keep their keys in. Nothing here touches
//! the chain, so all of it is safe to call from many threads at once.

pub mod keypair;
pub mod keyring;
pub mod sealing;
pub mod signature;

pub use keypair::{fingerprint, hash_pub_key, validate_fingerprint, KeyPair};
pub use keyring::{Keyring, KEYRING_FILE};
pub use sealing::KdfParams;
pub use signature::{sign_payload, verify, verify_hex, Verification};
