use super::authorization::AuthorizationEngine;
use super::locks::KeyLocks;
use crate::config::LedgerConfig;
use crate::domain::amount::Amount;
use crate::domain::event::{DepositRecord, LedgerEvent};
use crate::domain::key::{AccountId, BridgeAssetId, LedgerKey};
use crate::domain::message::Digest32;
use crate::domain::ports::{AssetLedgerBox, BridgeDispatcherBox, LedgerStoreBox};
use crate::domain::role::{Role, RoleSet};
use crate::domain::signature::SignedPayload;
use crate::domain::state::{Governance, KeyState, Route};
use crate::error::{LedgerError, Result, ValidationError};
use tokio::sync::{Mutex, broadcast};

const EVENT_CAPACITY: usize = 1024;

/// The payment-aggregation ledger.
///
/// Accumulates deposits per (asset, provider) key and settles them in
/// batches through the bridging subsystem. Every mutating operation runs
/// under the exclusive lock of the key it touches and either applies all of
/// its state changes or none of them.
pub struct AggregationLedger {
    pub(super) config: LedgerConfig,
    pub(super) auth: AuthorizationEngine,
    pub(super) store: LedgerStoreBox,
    pub(super) assets: AssetLedgerBox,
    pub(super) bridge: BridgeDispatcherBox,
    pub(super) locks: KeyLocks,
    /// Serializes read-modify-write of the governance record.
    pub(super) governance_lock: Mutex<()>,
    events: broadcast::Sender<LedgerEvent>,
}

impl AggregationLedger {
    /// Creates a ledger over the given collaborators.
    ///
    /// On a fresh store `deployer` receives every role; an existing store
    /// keeps its persisted governance.
    pub async fn new(
        config: LedgerConfig,
        store: LedgerStoreBox,
        assets: AssetLedgerBox,
        bridge: BridgeDispatcherBox,
        deployer: AccountId,
    ) -> Result<Self> {
        if store.governance().await?.is_none() {
            store.put_governance(Governance::bootstrap(deployer)).await?;
            tracing::info!(%deployer, "bootstrapped ledger governance");
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            auth: AuthorizationEngine::new(config.signing_domain()),
            config,
            store,
            assets,
            bridge,
            locks: KeyLocks::new(),
            governance_lock: Mutex::new(()),
            events,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Receives every event emitted after the call.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    pub(super) fn emit(&self, event: LedgerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(super) async fn load_governance(&self) -> Result<Governance> {
        Ok(self.store.governance().await?.unwrap_or_default())
    }

    pub(super) async fn load_key(&self, key: &LedgerKey) -> Result<KeyState> {
        Ok(self.store.key_state(key).await?.unwrap_or_default())
    }

    /// Pulls `amount` of the key's asset from `payer` into custody and
    /// credits it to the key's balance.
    pub async fn submit_payment(
        &self,
        payer: &AccountId,
        key: &LedgerKey,
        amount: u128,
    ) -> Result<DepositRecord> {
        let amount = Amount::new(amount)?.value();
        let _guard = self.locks.lock(key).await;

        if self.load_governance().await?.paused {
            tracing::debug!(%key, "deposit rejected: paused");
            return Err(LedgerError::Paused);
        }

        let mut state = self.load_key(key).await?;
        let balance = state.credit(amount)?;

        let custody = self.config.custody;
        self.assets
            .transfer_from(&key.asset, &custody, payer, &custody, amount)
            .await?;

        if let Err(err) = self.store.commit(key, state, None).await {
            tracing::warn!(%key, %payer, amount, error = %err, "deposit commit failed, refunding payer");
            self.assets
                .transfer(&key.asset, &custody, payer, amount)
                .await?;
            return Err(err);
        }

        let record = DepositRecord {
            payer: *payer,
            key: key.clone(),
            amount,
            balance,
        };
        tracing::info!(%key, %payer, amount, balance, "deposit accepted");
        self.emit(LedgerEvent::Deposit(record.clone()));
        Ok(record)
    }

    /// Binds `key` to a payout destination.
    ///
    /// Admins may set any route. Anyone else must present a signature from
    /// `recipient` over the route digest, letting a provider register its own
    /// destination.
    pub async fn set_route(
        &self,
        caller: &AccountId,
        key: &LedgerKey,
        bridge_asset: BridgeAssetId,
        destination: Vec<u8>,
        recipient: AccountId,
        signature: Option<&SignedPayload>,
    ) -> Result<Route> {
        if destination.is_empty() {
            return Err(ValidationError::EmptyDestination.into());
        }
        if recipient.is_zero() {
            return Err(ValidationError::MissingRecipient.into());
        }

        let _guard = self.locks.lock(key).await;
        let governance = self.load_governance().await?;
        let digest = self
            .auth
            .route_digest(key, &bridge_asset, &destination, &recipient);
        let authorization = self
            .auth
            .authorize(
                &governance,
                caller,
                Role::Admin,
                &digest,
                &recipient,
                signature,
                self.store.as_ref(),
            )
            .await
            .inspect_err(|err| tracing::debug!(%key, %caller, error = %err, "route change rejected"))?;

        let route = Route {
            bridge_asset,
            destination,
            recipient,
        };
        let mut state = self.load_key(key).await?;
        state.route = Some(route.clone());
        self.store
            .commit(key, state, authorization.consumed_signature())
            .await?;

        tracing::info!(
            %key,
            %recipient,
            bridge_asset = %route.bridge_asset,
            by_signature = authorization.is_signature(),
            "route configured"
        );
        self.emit(LedgerEvent::RouteSet {
            key: key.clone(),
            recipient,
            by_signature: authorization.is_signature(),
        });
        Ok(route)
    }

    // Point-in-time reads. They take no key lock, so during a settlement's
    // dispatch they see the debit and nonce bump that a failed dispatch
    // reverts.

    pub async fn balance(&self, key: &LedgerKey) -> Result<u128> {
        Ok(self.load_key(key).await?.balance)
    }

    pub async fn route(&self, key: &LedgerKey) -> Result<Option<Route>> {
        Ok(self.load_key(key).await?.route)
    }

    pub async fn nonce(&self, key: &LedgerKey) -> Result<u64> {
        Ok(self.load_key(key).await?.nonce)
    }

    pub async fn max_cap(&self, key: &LedgerKey) -> Result<Option<u128>> {
        Ok(self.load_key(key).await?.cap())
    }

    pub async fn key_state(&self, key: &LedgerKey) -> Result<KeyState> {
        self.load_key(key).await
    }

    /// Every key the ledger has state for, ordered by key.
    pub async fn balances(&self) -> Result<Vec<(LedgerKey, KeyState)>> {
        let mut all = self.store.all_key_states().await?;
        all.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(all)
    }

    pub async fn is_paused(&self) -> Result<bool> {
        Ok(self.load_governance().await?.paused)
    }

    pub async fn roles_of(&self, principal: &AccountId) -> Result<RoleSet> {
        Ok(self.load_governance().await?.roles_of(principal))
    }

    pub async fn is_signature_used(&self, digest: &Digest32) -> Result<bool> {
        self.store.is_signature_used(digest).await
    }

    /// Whether `identity` could currently authorize settlement of `key` by
    /// signature.
    pub async fn can_claim(&self, identity: &AccountId, key: &LedgerKey) -> Result<bool> {
        if self.is_paused().await? {
            return Ok(false);
        }
        Ok(self
            .route(key)
            .await?
            .is_some_and(|route| &route.recipient == identity))
    }

    /// Digest the route recipient signs to self-register a route.
    pub fn route_digest(
        &self,
        key: &LedgerKey,
        bridge_asset: &BridgeAssetId,
        destination: &[u8],
        recipient: &AccountId,
    ) -> Digest32 {
        self.auth
            .route_digest(key, bridge_asset, destination, recipient)
    }

    /// Digest the route recipient signs to settle `amount`, bound to the
    /// key's current nonce.
    ///
    /// Waits for any operation in flight on `key`, so the nonce is never one
    /// an unfinished settlement may still roll back.
    pub async fn settlement_digest(
        &self,
        key: &LedgerKey,
        amount: u128,
        timeout_seconds: u64,
    ) -> Result<Digest32> {
        let _guard = self.locks.lock(key).await;
        let nonce = self.load_key(key).await?.nonce;
        Ok(self
            .auth
            .settlement_digest(key, amount, timeout_seconds, nonce))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::key::AssetId;
    use crate::domain::signature::Signer;
    use crate::error::{AuthorizationError, StateError};
    use crate::infrastructure::in_memory::{
        InMemoryAssetLedger, InMemoryLedgerStore, RecordingBridge,
    };

    const ADMIN: AccountId = AccountId([0xaa; 32]);
    const PAYER: AccountId = AccountId([0x0b; 32]);

    async fn ledger() -> (AggregationLedger, InMemoryAssetLedger) {
        let config = LedgerConfig::default();
        let assets = InMemoryAssetLedger::new();
        let usdc = AssetId::new("USDC").unwrap();
        assets.mint(&usdc, &PAYER, 1_000_000_000).await;
        assets
            .set_allowance(&usdc, &PAYER, &config.custody, u128::MAX)
            .await;
        let ledger = AggregationLedger::new(
            config,
            Box::new(InMemoryLedgerStore::new()),
            Box::new(assets.clone()),
            Box::new(RecordingBridge::new()),
            ADMIN,
        )
        .await
        .unwrap();
        (ledger, assets)
    }

    fn key() -> LedgerKey {
        LedgerKey::parse("USDC", "provider-1").unwrap()
    }

    #[tokio::test]
    async fn test_deposit_accumulates() {
        let (ledger, assets) = ledger().await;
        ledger.submit_payment(&PAYER, &key(), 100).await.unwrap();
        let record = ledger.submit_payment(&PAYER, &key(), 50).await.unwrap();

        assert_eq!(record.balance, 150);
        assert_eq!(ledger.balance(&key()).await.unwrap(), 150);
        let custody = ledger.config().custody;
        assert_eq!(
            assets
                .holding(&key().asset, &custody)
                .await,
            150
        );
    }

    #[tokio::test]
    async fn test_zero_deposit_rejected() {
        let (ledger, _) = ledger().await;
        let err = ledger.submit_payment(&PAYER, &key(), 0).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::ZeroAmount)
        ));
    }

    #[tokio::test]
    async fn test_failed_transfer_leaves_balance_untouched() {
        let (ledger, _) = ledger().await;
        let broke = AccountId([0x42; 32]);
        let err = ledger.submit_payment(&broke, &key(), 10).await.unwrap_err();
        assert!(matches!(err, LedgerError::AssetTransfer(_)));
        assert_eq!(ledger.balance(&key()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deposit_respects_cap() {
        let (ledger, _) = ledger().await;
        ledger.set_max_cap(&ADMIN, &key(), 120).await.unwrap();
        ledger.submit_payment(&PAYER, &key(), 100).await.unwrap();
        let err = ledger.submit_payment(&PAYER, &key(), 21).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::State(StateError::CapExceeded { cap: 120 })
        ));
        assert_eq!(ledger.balance(&key()).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_route_requires_admin_or_recipient_signature() {
        let (ledger, _) = ledger().await;
        let recipient = Signer::from_seed(&[7u8; 32]);
        let bridge_asset = BridgeAssetId::new("usdc.bridge").unwrap();
        let destination = b"chain:42".to_vec();
        let stranger = AccountId([0x55; 32]);

        let err = ledger
            .set_route(
                &stranger,
                &key(),
                bridge_asset.clone(),
                destination.clone(),
                recipient.identity(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Authorization(AuthorizationError::MissingRole("admin"))
        ));

        let digest = ledger.route_digest(&key(), &bridge_asset, &destination, &recipient.identity());
        let signature = recipient.sign(&digest);
        let route = ledger
            .set_route(
                &stranger,
                &key(),
                bridge_asset,
                destination,
                recipient.identity(),
                Some(&signature),
            )
            .await
            .unwrap();
        assert_eq!(route.recipient, recipient.identity());
        assert!(ledger.key_state(&key()).await.unwrap().is_configured());
        assert!(ledger.can_claim(&recipient.identity(), &key()).await.unwrap());
        assert!(!ledger.can_claim(&stranger, &key()).await.unwrap());
    }

    #[tokio::test]
    async fn test_route_validation() {
        let (ledger, _) = ledger().await;
        let err = ledger
            .set_route(
                &ADMIN,
                &key(),
                BridgeAssetId::new("b").unwrap(),
                Vec::new(),
                AccountId([1u8; 32]),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::EmptyDestination)
        ));

        let err = ledger
            .set_route(
                &ADMIN,
                &key(),
                BridgeAssetId::new("b").unwrap(),
                vec![1],
                AccountId::ZERO,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::MissingRecipient)
        ));
    }

    #[tokio::test]
    async fn test_events_published() {
        let (ledger, _) = ledger().await;
        let mut events = ledger.subscribe();
        ledger.submit_payment(&PAYER, &key(), 5).await.unwrap();
        match events.recv().await.unwrap() {
            LedgerEvent::Deposit(record) => assert_eq!(record.amount, 5),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
