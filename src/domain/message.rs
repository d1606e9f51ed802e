//! Canonical, domain-separated messages that off-chain signers authorize.
//!
//! Every message starts with an operation tag and ends with the network
//! domain and ledger instance, so a signature is only valid for one
//! operation on one deployment. Fields are length-prefixed and integers are
//! big-endian; the signed value is the SHA-256 digest of the encoding.

use super::key::{AccountId, BridgeAssetId, LedgerKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub const SET_ROUTE_TAG: &str = "SET_ROUTE";
pub const BULK_SETTLE_TAG: &str = "BULK_SETTLE";

/// Identifies which deployment a signature is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningDomain {
    pub network_domain_id: u64,
    pub ledger_instance_id: AccountId,
}

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest32(pub [u8; 32]);

impl Digest32 {
    pub fn of(bytes: &[u8]) -> Self {
        let hash = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hash);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest32({}..)", &self.to_hex()[..12])
    }
}

impl fmt::Display for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Default)]
struct Encoder(Vec<u8>);

impl Encoder {
    fn bytes(mut self, value: &[u8]) -> Self {
        self.0.extend_from_slice(&(value.len() as u64).to_be_bytes());
        self.0.extend_from_slice(value);
        self
    }

    fn str(self, value: &str) -> Self {
        self.bytes(value.as_bytes())
    }

    fn u64(mut self, value: u64) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn u128(mut self, value: u128) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn id(mut self, value: &AccountId) -> Self {
        self.0.extend_from_slice(value.as_bytes());
        self
    }

    fn domain(self, domain: &SigningDomain) -> Vec<u8> {
        self.u64(domain.network_domain_id)
            .id(&domain.ledger_instance_id)
            .0
    }
}

/// Fields a recipient signs to self-register a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMessage<'a> {
    pub key: &'a LedgerKey,
    pub bridge_asset: &'a BridgeAssetId,
    pub destination: &'a [u8],
    pub recipient: &'a AccountId,
}

impl RouteMessage<'_> {
    pub fn encode(&self, domain: &SigningDomain) -> Vec<u8> {
        Encoder::default()
            .str(SET_ROUTE_TAG)
            .str(self.key.asset.as_str())
            .str(self.key.provider.as_str())
            .str(self.bridge_asset.as_str())
            .bytes(self.destination)
            .id(self.recipient)
            .domain(domain)
    }

    pub fn digest(&self, domain: &SigningDomain) -> Digest32 {
        Digest32::of(&self.encode(domain))
    }
}

/// Fields a recipient signs to trigger settlement of its own balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementMessage<'a> {
    pub key: &'a LedgerKey,
    pub amount: u128,
    pub timeout_seconds: u64,
    pub nonce: u64,
}

impl SettlementMessage<'_> {
    pub fn encode(&self, domain: &SigningDomain) -> Vec<u8> {
        Encoder::default()
            .str(BULK_SETTLE_TAG)
            .str(self.key.asset.as_str())
            .str(self.key.provider.as_str())
            .u128(self.amount)
            .u64(self.timeout_seconds)
            .u64(self.nonce)
            .domain(domain)
    }

    pub fn digest(&self, domain: &SigningDomain) -> Digest32 {
        Digest32::of(&self.encode(domain))
    }
}
