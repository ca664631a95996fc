//! # Key Signers
//!
//! In-process [`Signer`] implementations for both ledger families. Keys are
//! held in memory; production deployments plug their custody behind the
//! same trait.

use crate::domain::LedgerError;
use crate::ports::Signer;
use k256::ecdsa::SigningKey as Secp256k1Key;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rand::RngCore;
use sha3::{Digest, Keccak256};
use zeroize::Zeroize;

/// secp256k1 signer producing 65-byte `r ‖ s ‖ v` signatures over the
/// keccak256 of the payload. Identity is the 20-byte EVM address.
pub struct Secp256k1Signer {
    key: Secp256k1Key,
    address: [u8; 20],
}

impl Secp256k1Signer {
    /// Load from a raw 32-byte private key.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, LedgerError> {
        let key = Secp256k1Key::from_slice(secret)
            .map_err(|e| LedgerError::Signer(format!("invalid secp256k1 key: {e}")))?;
        let point = key.verifying_key().to_encoded_point(false);
        let digest = Keccak256::digest(&point.as_bytes()[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&digest[12..]);
        Ok(Self { key, address })
    }

    /// Fresh random key.
    pub fn random() -> Self {
        loop {
            let mut bytes = [0u8; 32];
            OsRng.fill_bytes(&mut bytes);
            let signer = Self::from_bytes(&bytes);
            bytes.zeroize();
            if let Ok(signer) = signer {
                return signer;
            }
        }
    }

    /// EVM address bytes.
    pub fn address(&self) -> [u8; 20] {
        self.address
    }
}

impl Signer for Secp256k1Signer {
    fn scheme(&self) -> &'static str {
        "secp256k1"
    }

    fn identity(&self) -> Vec<u8> {
        self.address.to_vec()
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, LedgerError> {
        let digest = Keccak256::digest(payload);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| LedgerError::Signer(e.to_string()))?;
        let mut out = signature.to_bytes().to_vec();
        out.push(27 + recovery_id.to_byte());
        Ok(out)
    }
}

/// ed25519 signer; identity is the 32-byte public key (implicit account).
pub struct Ed25519Signer {
    key: ed25519_dalek::SigningKey,
}

impl Ed25519Signer {
    /// Load from a raw 32-byte seed.
    pub fn from_bytes(seed: &[u8; 32]) -> Self {
        Self {
            key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Fresh random key.
    pub fn random() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        let signer = Self::from_bytes(&seed);
        seed.zeroize();
        signer
    }

    /// Public key bytes.
    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }
}

impl Signer for Ed25519Signer {
    fn scheme(&self) -> &'static str {
        "ed25519"
    }

    fn identity(&self) -> Vec<u8> {
        self.public_key().to_vec()
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, LedgerError> {
        use ed25519_dalek::Signer as _;
        Ok(self.key.sign(payload).to_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode32(s: &str) -> [u8; 32] {
        hex::decode(s).unwrap().try_into().unwrap()
    }

    #[test]
    fn test_secp256k1_known_address() {
        let signer = Secp256k1Signer::from_bytes(&decode32(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        ))
        .unwrap();
        assert_eq!(
            hex::encode(signer.identity()),
            "f39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_secp256k1_signature_recovers_signer() {
        use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

        let signer = Secp256k1Signer::random();
        let payload = b"initiate:swap";
        let sig = signer.sign(payload).unwrap();
        assert_eq!(sig.len(), 65);

        let signature = Signature::from_slice(&sig[..64]).unwrap();
        let recovery_id = RecoveryId::from_byte(sig[64] - 27).unwrap();
        let digest = Keccak256::digest(payload);
        let recovered =
            VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id).unwrap();
        assert_eq!(&recovered, signer.key.verifying_key());
    }

    #[test]
    fn test_secp256k1_zero_key_rejected() {
        assert!(matches!(
            Secp256k1Signer::from_bytes(&[0u8; 32]),
            Err(LedgerError::Signer(_))
        ));
    }

    #[test]
    fn test_ed25519_rfc8032_public_key() {
        let signer = Ed25519Signer::from_bytes(&decode32(
            "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60",
        ));
        assert_eq!(
            hex::encode(signer.identity()),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
    }

    #[test]
    fn test_ed25519_signature_verifies() {
        use ed25519_dalek::{Signature, Verifier};

        let signer = Ed25519Signer::random();
        let sig = signer.sign(b"refund:swap").unwrap();
        let signature = Signature::from_slice(&sig).unwrap();
        assert!(signer
            .key
            .verifying_key()
            .verify(b"refund:swap", &signature)
            .is_ok());
    }
}
