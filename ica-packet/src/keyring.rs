//! Key material of the packet builder: the signing identity derived from a
//! mnemonic and the scratch keyring it is imported into for one invocation.

use core::fmt::{Debug, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bip39::{Language, Mnemonic, Seed};
use cosmrs::bip32::{DerivationPath, XPrv};
use cosmrs::crypto::secp256k1::SigningKey;
use cosmrs::crypto::PublicKey;
use cosmrs::AccountId;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::error::BuildError;

/// Cosmos HD path, coin type 118, first account.
pub const COSMOS_HD_PATH: &str = "m/44'/118'/0'/0/0";

/// Name the imported key is stored under.
pub const KEY_NAME: &str = "buildpacket-key";

const KEYRING_DIR_PREFIX: &str = "buildpacket-keyring-";

/// A secp256k1 key derived from a BIP-39 mnemonic.
pub struct SigningIdentity {
    secret: Vec<u8>,
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl SigningIdentity {
    pub fn from_mnemonic(phrase: &str) -> Result<Self, BuildError> {
        let mnemonic = Mnemonic::from_phrase(phrase.trim(), Language::English).map_err(|e| {
            BuildError::InvalidMnemonic {
                reason: e.to_string(),
            }
        })?;
        let seed = Seed::new(&mnemonic, "");

        let path: DerivationPath =
            COSMOS_HD_PATH
                .parse()
                .map_err(|e: cosmrs::bip32::Error| BuildError::KeyDerivation {
                    reason: e.to_string(),
                })?;
        let xprv = XPrv::derive_from_path(seed.as_bytes(), &path).map_err(|e| {
            BuildError::KeyDerivation {
                reason: e.to_string(),
            }
        })?;

        Self::from_secret(xprv.private_key().to_bytes().to_vec())
    }

    /// Identity of a raw 32-byte secp256k1 secret.
    pub fn from_secret(secret: Vec<u8>) -> Result<Self, BuildError> {
        let signing_key =
            SigningKey::from_slice(&secret).map_err(|e| BuildError::KeyDerivation {
                reason: e.to_string(),
            })?;
        let public_key = signing_key.public_key();

        Ok(Self {
            secret,
            signing_key,
            public_key,
        })
    }

    /// Bech32 address of the key under the given prefix.
    pub fn address(&self, prefix: &str) -> Result<AccountId, BuildError> {
        self.public_key
            .account_id(prefix)
            .map_err(|e| BuildError::KeyDerivation {
                reason: format!("derive `{prefix}` address: {e}"),
            })
    }

    /// Compressed 33-byte public key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key.to_bytes()
    }

    /// Signs `msg` and returns the 64-byte compact signature.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, BuildError> {
        let signature = self
            .signing_key
            .sign(msg)
            .map_err(|e| BuildError::Signing {
                reason: e.to_string(),
            })?;
        Ok(signature.to_bytes().to_vec())
    }
}

impl Debug for SigningIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("public_key", &STANDARD.encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

/// Public part of a key stored in the [`EphemeralKeyring`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub name: String,
    pub algo: String,
    pub hd_path: String,
    pub address: String,
    /// Base64 compressed public key.
    pub pubkey: String,
}

/// Keyring living in a scratch directory that is removed when the keyring
/// is dropped, whichever way the builder exits.
///
/// Each key is stored as `<name>.info`, its public record, and `<name>.key`,
/// its base64 secret. Signing goes through [`EphemeralKeyring::signer`].
#[derive(Debug)]
pub struct EphemeralKeyring {
    dir: TempDir,
}

impl EphemeralKeyring {
    pub fn new() -> Result<Self, BuildError> {
        let dir = tempfile::Builder::new()
            .prefix(KEYRING_DIR_PREFIX)
            .tempdir()
            .map_err(|e| BuildError::Keyring {
                reason: format!("create temp dir: {e}"),
            })?;
        tracing::debug!(path = %dir.path().display(), "created ephemeral keyring");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Stores the public record of `identity` under `name`, addressed with `prefix`.
    pub fn import(
        &self,
        name: &str,
        identity: &SigningIdentity,
        prefix: &str,
    ) -> Result<KeyRecord, BuildError> {
        let record = KeyRecord {
            name: name.to_string(),
            algo: "secp256k1".to_string(),
            hd_path: COSMOS_HD_PATH.to_string(),
            address: identity.address(prefix)?.to_string(),
            pubkey: STANDARD.encode(identity.public_key_bytes()),
        };

        let json = serde_json::to_vec(&record).map_err(|e| BuildError::Keyring {
            reason: e.to_string(),
        })?;
        fs::write(self.record_path(name), json).map_err(|e| BuildError::Keyring {
            reason: format!("write key `{name}`: {e}"),
        })?;
        fs::write(self.secret_path(name), STANDARD.encode(&identity.secret)).map_err(|e| {
            BuildError::Keyring {
                reason: format!("write key `{name}`: {e}"),
            }
        })?;
        tracing::debug!(name, address = %record.address, "imported key");

        Ok(record)
    }

    /// Loads the signing identity stored under `name`, checked against its record.
    pub fn signer(&self, name: &str) -> Result<SigningIdentity, BuildError> {
        let record = self.key(name)?;
        let encoded = fs::read_to_string(self.secret_path(name)).map_err(|e| {
            BuildError::Keyring {
                reason: format!("key `{name}` has no secret: {e}"),
            }
        })?;
        let secret = STANDARD
            .decode(encoded.trim())
            .map_err(|e| BuildError::Keyring {
                reason: format!("key `{name}`: {e}"),
            })?;

        let identity = SigningIdentity::from_secret(secret)?;
        if STANDARD.encode(identity.public_key_bytes()) != record.pubkey {
            return Err(BuildError::Keyring {
                reason: format!("key `{name}` does not match its record"),
            });
        }
        Ok(identity)
    }

    pub fn key(&self, name: &str) -> Result<KeyRecord, BuildError> {
        let json = fs::read(self.record_path(name)).map_err(|e| BuildError::Keyring {
            reason: format!("key `{name}` not found: {e}"),
        })?;
        serde_json::from_slice(&json).map_err(|e| BuildError::Keyring {
            reason: e.to_string(),
        })
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{name}.info"))
    }

    fn secret_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{name}.key"))
    }
}
