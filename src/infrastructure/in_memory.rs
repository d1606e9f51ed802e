use crate::domain::key::{AccountId, AssetId, LedgerKey};
use crate::domain::message::Digest32;
use crate::domain::ports::{AssetLedger, BridgeDispatcher, LedgerStore, TeleportRequest};
use crate::domain::state::{Governance, KeyState};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};

#[derive(Default)]
struct LedgerTables {
    keys: HashMap<LedgerKey, KeyState>,
    signatures: HashSet<Digest32>,
    governance: Option<Governance>,
}

/// A thread-safe in-memory ledger store.
///
/// `Clone` shares the underlying tables, so a clone can be kept to inspect
/// state while the ledger owns the other handle.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    tables: Arc<RwLock<LedgerTables>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn key_state(&self, key: &LedgerKey) -> Result<Option<KeyState>> {
        Ok(self.tables.read().await.keys.get(key).cloned())
    }

    async fn all_key_states(&self) -> Result<Vec<(LedgerKey, KeyState)>> {
        let tables = self.tables.read().await;
        Ok(tables
            .keys
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn governance(&self) -> Result<Option<Governance>> {
        Ok(self.tables.read().await.governance.clone())
    }

    async fn put_governance(&self, governance: Governance) -> Result<()> {
        self.tables.write().await.governance = Some(governance);
        Ok(())
    }

    async fn is_signature_used(&self, digest: &Digest32) -> Result<bool> {
        Ok(self.tables.read().await.signatures.contains(digest))
    }

    async fn commit(
        &self,
        key: &LedgerKey,
        state: KeyState,
        consumed_signature: Option<Digest32>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(digest) = consumed_signature
            && !tables.signatures.insert(digest)
        {
            return Err(LedgerError::Replay);
        }
        tables.keys.insert(key.clone(), state);
        Ok(())
    }

    async fn revert(
        &self,
        key: &LedgerKey,
        previous: KeyState,
        consumed_signature: Option<Digest32>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(digest) = consumed_signature {
            tables.signatures.remove(&digest);
        }
        tables.keys.insert(key.clone(), previous);
        Ok(())
    }
}

#[derive(Default)]
struct AssetTables {
    balances: HashMap<(AssetId, AccountId), u128>,
    allowances: HashMap<(AssetId, AccountId, AccountId), u128>,
}

impl AssetTables {
    fn debit(&mut self, asset: &AssetId, from: &AccountId, amount: u128) -> Result<()> {
        let balance = self
            .balances
            .entry((asset.clone(), *from))
            .or_default();
        if *balance < amount {
            return Err(LedgerError::AssetTransfer(format!(
                "insufficient {asset} balance: has {balance}, needs {amount}"
            )));
        }
        *balance -= amount;
        Ok(())
    }

    fn credit(&mut self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<()> {
        let balance = self.balances.entry((asset.clone(), *to)).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::AssetTransfer(format!("{asset} balance overflow")))?;
        Ok(())
    }

    fn check_credit(&self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<()> {
        let balance = self
            .balances
            .get(&(asset.clone(), *to))
            .copied()
            .unwrap_or_default();
        balance
            .checked_add(amount)
            .map(|_| ())
            .ok_or_else(|| LedgerError::AssetTransfer(format!("{asset} balance overflow")))
    }

    fn move_funds(&mut self, asset: &AssetId, from: &AccountId, to: &AccountId, amount: u128) -> Result<()> {
        self.check_credit(asset, to, amount)?;
        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount)
    }
}

/// In-memory multi-asset fungible ledger.
///
/// Transfers are all-or-nothing; an allowance of `u128::MAX` is treated as
/// unlimited and never decremented.
#[derive(Default, Clone)]
pub struct InMemoryAssetLedger {
    tables: Arc<RwLock<AssetTables>>,
}

impl InMemoryAssetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `amount` out of thin air for `account`. Setup helper.
    pub async fn mint(&self, asset: &AssetId, account: &AccountId, amount: u128) {
        let mut tables = self.tables.write().await;
        let balance = tables.balances.entry((asset.clone(), *account)).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub async fn set_allowance(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId, amount: u128) {
        self.tables
            .write()
            .await
            .allowances
            .insert((asset.clone(), *owner, *spender), amount);
    }

    pub async fn holding(&self, asset: &AssetId, account: &AccountId) -> u128 {
        self.tables
            .read()
            .await
            .balances
            .get(&(asset.clone(), *account))
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AssetLedger for InMemoryAssetLedger {
    async fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let allowance_key = (asset.clone(), *owner, *spender);
        let allowance = if spender == owner {
            u128::MAX
        } else {
            tables
                .allowances
                .get(&allowance_key)
                .copied()
                .unwrap_or_default()
        };
        if allowance < amount {
            return Err(LedgerError::AssetTransfer(format!(
                "insufficient {asset} allowance: has {allowance}, needs {amount}"
            )));
        }
        tables.move_funds(asset, owner, to, amount)?;
        if allowance != u128::MAX {
            tables.allowances.insert(allowance_key, allowance - amount);
        }
        Ok(())
    }

    async fn transfer(&self, asset: &AssetId, from: &AccountId, to: &AccountId, amount: u128) -> Result<()> {
        self.tables
            .write()
            .await
            .move_funds(asset, from, to, amount)
    }

    async fn approve(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId, amount: u128) -> Result<()> {
        self.set_allowance(asset, owner, spender, amount).await;
        Ok(())
    }

    async fn allowance(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId) -> Result<u128> {
        Ok(self
            .tables
            .read()
            .await
            .allowances
            .get(&(asset.clone(), *owner, *spender))
            .copied()
            .unwrap_or_default())
    }

    async fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Result<u128> {
        Ok(self.holding(asset, account).await)
    }
}

/// Bridge stand-in that records every accepted teleport.
///
/// Can be switched to refuse dispatches to exercise the abort path.
#[derive(Default, Clone)]
pub struct RecordingBridge {
    requests: Arc<Mutex<Vec<TeleportRequest>>>,
    refusing: Arc<AtomicBool>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }

    pub async fn requests(&self) -> Vec<TeleportRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl BridgeDispatcher for RecordingBridge {
    async fn teleport(&self, request: TeleportRequest) -> Result<()> {
        if self.refusing.load(Ordering::SeqCst) {
            return Err(LedgerError::Dispatch("bridge refused teleport".to_string()));
        }
        self.requests.lock().await.push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> LedgerKey {
        LedgerKey::parse("USDC", "p1").unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_store_commit_and_get() {
        let store = InMemoryLedgerStore::new();
        assert!(store.key_state(&key()).await.unwrap().is_none());

        let state = KeyState {
            balance: 10,
            ..Default::default()
        };
        store.commit(&key(), state.clone(), None).await.unwrap();
        assert_eq!(store.key_state(&key()).await.unwrap(), Some(state));
        assert_eq!(store.all_key_states().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_store_rejects_reused_signature() {
        let store = InMemoryLedgerStore::new();
        let digest = Digest32::of(b"sig");
        store
            .commit(&key(), KeyState::default(), Some(digest))
            .await
            .unwrap();
        let replay = KeyState {
            balance: 99,
            ..Default::default()
        };
        let err = store.commit(&key(), replay, Some(digest)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Replay));
        assert_eq!(store.key_state(&key()).await.unwrap().unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_in_memory_store_revert() {
        let store = InMemoryLedgerStore::new();
        let digest = Digest32::of(b"sig");
        let after = KeyState {
            balance: 1,
            nonce: 1,
            ..Default::default()
        };
        store.commit(&key(), after, Some(digest)).await.unwrap();
        store
            .revert(&key(), KeyState::default(), Some(digest))
            .await
            .unwrap();
        assert!(!store.is_signature_used(&digest).await.unwrap());
        assert_eq!(
            store.key_state(&key()).await.unwrap(),
            Some(KeyState::default())
        );
    }

    #[tokio::test]
    async fn test_asset_transfer_from_needs_allowance() {
        let assets = InMemoryAssetLedger::new();
        let usdc = AssetId::new("USDC").unwrap();
        let owner = AccountId([1u8; 32]);
        let spender = AccountId([2u8; 32]);
        assets.mint(&usdc, &owner, 100).await;

        assert!(
            assets
                .transfer_from(&usdc, &spender, &owner, &spender, 10)
                .await
                .is_err()
        );
        assets.approve(&usdc, &owner, &spender, 30).await.unwrap();
        assets
            .transfer_from(&usdc, &spender, &owner, &spender, 10)
            .await
            .unwrap();
        assert_eq!(assets.allowance(&usdc, &owner, &spender).await.unwrap(), 20);
        assert_eq!(assets.balance_of(&usdc, &spender).await.unwrap(), 10);
        assert_eq!(assets.balance_of(&usdc, &owner).await.unwrap(), 90);
    }

    #[tokio::test]
    async fn test_asset_transfer_is_all_or_nothing() {
        let assets = InMemoryAssetLedger::new();
        let usdc = AssetId::new("USDC").unwrap();
        let owner = AccountId([1u8; 32]);
        let to = AccountId([2u8; 32]);
        assets.mint(&usdc, &owner, 5).await;
        assert!(assets.transfer(&usdc, &owner, &to, 6).await.is_err());
        assert_eq!(assets.holding(&usdc, &owner).await, 5);
        assert_eq!(assets.holding(&usdc, &to).await, 0);
    }

    #[tokio::test]
    async fn test_recording_bridge_refusal() {
        let bridge = RecordingBridge::new();
        let request = TeleportRequest {
            amount: 1,
            relayer_fee: 0,
            bridge_asset: crate::domain::key::BridgeAssetId::new("b").unwrap(),
            redeem: false,
            recipient: [0u8; 32],
            destination: vec![1],
            timeout_seconds: 1,
            native_cost: 0,
            data: Vec::new(),
        };
        bridge.teleport(request.clone()).await.unwrap();
        bridge.set_refusing(true);
        assert!(matches!(
            bridge.teleport(request).await,
            Err(LedgerError::Dispatch(_))
        ));
        assert_eq!(bridge.requests().await.len(), 1);
    }
}
