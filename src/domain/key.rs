use crate::error::{LedgerError, ValidationError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 32-byte identity: an ed25519 public key for signers and principals, or
/// an opaque account reference for custody and bridge accounts.
///
/// Serializes as a lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let bytes = hex::decode(s.trim()).map_err(|e| ValidationError::Malformed {
            field: "identity",
            reason: e.to_string(),
        })?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ValidationError::Malformed {
                field: "identity",
                reason: format!("expected 32 bytes, got {}", b.len()),
            })?;
        Ok(Self(arr))
    }
}

impl FromStr for AccountId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_hex(s)?)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({}..)", &self.to_hex()[..8])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $missing:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Rejects empty (null) identifiers.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if value.trim().is_empty() {
                    Err($missing)
                } else {
                    Ok(Self(value))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::new(s)?)
            }
        }
    };
}

string_id!(
    /// Identifier of a fungible asset accepted for deposit (e.g. a token symbol or address).
    AssetId,
    ValidationError::MissingAsset
);
impl AssetId {
    /// Infallible constructor for built-in non-empty identifiers.
    pub(crate) fn from_static(value: &'static str) -> Self {
        Self(value.to_string())
    }
}

string_id!(
    /// Opaque identifier of a logical payout destination.
    ProviderId,
    ValidationError::MissingProvider
);
string_id!(
    /// Identifier of the asset on the bridging subsystem's side.
    BridgeAssetId,
    ValidationError::MissingBridgeAsset
);

/// Composite key every per-provider record lives under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerKey {
    pub asset: AssetId,
    pub provider: ProviderId,
}

impl LedgerKey {
    pub fn new(asset: AssetId, provider: ProviderId) -> Self {
        Self { asset, provider }
    }

    /// Convenience constructor validating both parts.
    pub fn parse(asset: &str, provider: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(AssetId::new(asset)?, ProviderId::new(provider)?))
    }

    /// Stable byte encoding used as a storage key. Each part carries a
    /// 64-bit big-endian length prefix.
    pub fn storage_key(&self) -> Vec<u8> {
        let asset = self.asset.as_str().as_bytes();
        let provider = self.provider.as_str().as_bytes();
        let mut out = Vec::with_capacity(16 + asset.len() + provider.len());
        out.extend_from_slice(&(asset.len() as u64).to_be_bytes());
        out.extend_from_slice(asset);
        out.extend_from_slice(&(provider.len() as u64).to_be_bytes());
        out.extend_from_slice(provider);
        out
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.asset, self.provider)
    }
}
