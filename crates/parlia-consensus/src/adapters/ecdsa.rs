//! # secp256k1 Signer Adapters
//!
//! Header seals are 65-byte recoverable signatures `r || s || v` over the
//! seal hash. The signer address is the last 20 bytes of the Keccak-256 hash
//! of the uncompressed public key (without the `0x04` prefix).

use crate::ports::{HeaderSigner, SignerRecovery};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use shared_types::{keccak256, Address, Hash, SIGNATURE_LENGTH};

/// Recovers header signers with k256.
#[derive(Debug, Default, Clone, Copy)]
pub struct K256Recovery;

impl SignerRecovery for K256Recovery {
    fn recover_signer(&self, seal_hash: &Hash, signature: &[u8; SIGNATURE_LENGTH]) -> Option<Address> {
        let recovery_id = parse_recovery_id(signature[64])?;
        let sig = Signature::from_slice(&signature[..64]).ok()?;
        let key = VerifyingKey::recover_from_prehash(seal_hash, &sig, recovery_id).ok()?;
        Some(address_from_pubkey(&key))
    }
}

/// Local signing identity backed by an in-memory secp256k1 key.
#[derive(Clone)]
pub struct K256Signer {
    key: SigningKey,
    address: Address,
}

impl K256Signer {
    pub fn new(key: SigningKey) -> Self {
        let address = address_from_pubkey(key.verifying_key());
        Self { key, address }
    }

    /// Load a key from 32 raw secret bytes.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, String> {
        SigningKey::from_slice(secret)
            .map(Self::new)
            .map_err(|e| format!("invalid secret key: {e}"))
    }

    /// Fresh random key.
    pub fn random() -> Self {
        Self::new(SigningKey::random(&mut rand::thread_rng()))
    }
}

impl std::fmt::Debug for K256Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("K256Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl HeaderSigner for K256Signer {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, seal_hash: &Hash) -> Result<[u8; SIGNATURE_LENGTH], String> {
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(seal_hash)
            .map_err(|e| e.to_string())?;

        let mut out = [0u8; SIGNATURE_LENGTH];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = recid.to_byte() + 27;
        Ok(out)
    }
}

/// Derive the account address of a public key.
pub fn address_from_pubkey(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Valid v values: 0, 1, 27, 28
fn parse_recovery_id(v: u8) -> Option<RecoveryId> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return None,
    };
    RecoveryId::try_from(id).ok()
}
