use super::key::{AccountId, AssetId, BridgeAssetId, LedgerKey};
use super::message::Digest32;
use super::state::{Governance, KeyState};
use crate::error::Result;
use async_trait::async_trait;

/// Durable home of all ledger state. Only the ledger writes to it.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn key_state(&self, key: &LedgerKey) -> Result<Option<KeyState>>;
    async fn all_key_states(&self) -> Result<Vec<(LedgerKey, KeyState)>>;
    async fn governance(&self) -> Result<Option<Governance>>;
    async fn put_governance(&self, governance: Governance) -> Result<()>;
    async fn is_signature_used(&self, digest: &Digest32) -> Result<bool>;

    /// Atomically writes `state` and records `consumed_signature`.
    ///
    /// Fails with `LedgerError::Replay`, writing nothing, if the digest is
    /// already recorded.
    async fn commit(
        &self,
        key: &LedgerKey,
        state: KeyState,
        consumed_signature: Option<Digest32>,
    ) -> Result<()>;

    /// Undoes a `commit` whose operation was aborted before it returned.
    async fn revert(
        &self,
        key: &LedgerKey,
        previous: KeyState,
        consumed_signature: Option<Digest32>,
    ) -> Result<()>;
}

/// Multi-asset fungible ledger the custody account settles against.
#[async_trait]
pub trait AssetLedger: Send + Sync {
    /// Moves `amount` from `owner` to `to` using `spender`'s allowance.
    /// All-or-nothing.
    async fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<()>;
    async fn transfer(&self, asset: &AssetId, from: &AccountId, to: &AccountId, amount: u128) -> Result<()>;
    async fn approve(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId, amount: u128) -> Result<()>;
    async fn allowance(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId) -> Result<u128>;
    async fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Result<u128>;
}

/// Arguments of a single teleport into the bridging subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeleportRequest {
    pub amount: u128,
    pub relayer_fee: u128,
    pub bridge_asset: BridgeAssetId,
    pub redeem: bool,
    /// Recipient in the bridge's 32-byte addressing convention.
    pub recipient: [u8; 32],
    pub destination: Vec<u8>,
    pub timeout_seconds: u64,
    pub native_cost: u128,
    pub data: Vec<u8>,
}

/// Fire-and-forget dispatch into the bridging subsystem.
///
/// `Ok` only means the bridge accepted the request; delivery happens later
/// and is not observed by the ledger.
#[async_trait]
pub trait BridgeDispatcher: Send + Sync {
    async fn teleport(&self, request: TeleportRequest) -> Result<()>;
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type AssetLedgerBox = Box<dyn AssetLedger>;
pub type BridgeDispatcherBox = Box<dyn BridgeDispatcher>;
