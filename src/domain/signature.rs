//! Detached ed25519 signatures over message digests.
//!
//! A [`SignedPayload`] carries the claimed signer next to the signature;
//! [`verify`] returns that signer only if the signature checks out, so
//! callers compare the returned identity against whoever is entitled to sign.

use super::key::AccountId;
use super::message::Digest32;
use crate::error::{AuthorizationError, ValidationError};
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SignatureBytes(pub [u8; 64]);

impl SignatureBytes {
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let bytes = hex::decode(s.trim()).map_err(|e| ValidationError::Malformed {
            field: "signature",
            reason: e.to_string(),
        })?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ValidationError::Malformed {
                field: "signature",
                reason: format!("expected 64 bytes, got {}", b.len()),
            })?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes({}..)", &self.to_hex()[..12])
    }
}

impl Serialize for SignatureBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SignatureBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A signature together with the identity that claims to have produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    pub signer: AccountId,
    pub signature: SignatureBytes,
}

impl SignedPayload {
    /// Replay-protection key: the digest of the raw signature bytes.
    pub fn replay_digest(&self) -> Digest32 {
        Digest32::of(&self.signature.0)
    }
}

/// Verifies `payload` over `digest` and returns the signer identity.
///
/// Uses strict verification, which rejects small-order keys and
/// non-canonical signature encodings.
pub fn verify(digest: &Digest32, payload: &SignedPayload) -> Result<AccountId, AuthorizationError> {
    let key = VerifyingKey::from_bytes(payload.signer.as_bytes())
        .map_err(|_| AuthorizationError::InvalidSignature)?;
    let signature = ed25519_dalek::Signature::from_bytes(&payload.signature.0);
    key.verify_strict(digest.as_bytes(), &signature)
        .map_err(|_| AuthorizationError::InvalidSignature)?;
    Ok(payload.signer)
}

/// Off-chain signing key for a route recipient.
///
/// Does not implement `Serialize`; the secret never leaves this struct.
pub struct Signer {
    signing_key: SigningKey,
}

impl Signer {
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: SigningKey::generate(&mut csprng),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn identity(&self) -> AccountId {
        AccountId(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, digest: &Digest32) -> SignedPayload {
        let signature = self.signing_key.sign(digest.as_bytes());
        SignedPayload {
            signer: self.identity(),
            signature: SignatureBytes(signature.to_bytes()),
        }
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("identity", &self.identity())
            .finish_non_exhaustive()
    }
}
