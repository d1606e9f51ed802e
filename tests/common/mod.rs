#![allow(dead_code)]

use relay_ledger::application::ledger::AggregationLedger;
use relay_ledger::config::LedgerConfig;
use relay_ledger::domain::key::{AccountId, AssetId, BridgeAssetId, LedgerKey};
use relay_ledger::domain::signature::Signer;
use relay_ledger::infrastructure::in_memory::{InMemoryAssetLedger, InMemoryLedgerStore, RecordingBridge};

pub const ADMIN: AccountId = AccountId([0xaa; 32]);
pub const OPERATOR: AccountId = AccountId([0x0e; 32]);
pub const PAYER: AccountId = AccountId([0x0b; 32]);
pub const STRANGER: AccountId = AccountId([0x55; 32]);

/// 1 000 bridging-asset units at 18 decimals.
pub const BRIDGE_LIQUIDITY: u128 = 1_000 * 10u128.pow(18);

/// A ledger wired to in-memory collaborators, with handles kept for
/// inspection.
pub struct Harness {
    pub ledger: AggregationLedger,
    pub assets: InMemoryAssetLedger,
    pub bridge: RecordingBridge,
    pub store: InMemoryLedgerStore,
    pub recipient: Signer,
}

pub fn usdc() -> AssetId {
    AssetId::new("USDC").unwrap()
}

pub fn key() -> LedgerKey {
    LedgerKey::parse("USDC", "provider-1").unwrap()
}

pub fn bridge_asset() -> BridgeAssetId {
    BridgeAssetId::new("usdc.bridge").unwrap()
}

pub fn destination() -> Vec<u8> {
    b"network:8453".to_vec()
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_bridge(RecordingBridge::new()).await
    }

    pub async fn with_bridge(bridge: RecordingBridge) -> Self {
        let store = InMemoryLedgerStore::new();
        let config = LedgerConfig::default();
        let assets = InMemoryAssetLedger::new();
        assets.mint(&usdc(), &PAYER, 1_000_000_000_000).await;
        assets
            .set_allowance(&usdc(), &PAYER, &config.custody, u128::MAX)
            .await;
        assets
            .mint(&config.bridging_token, &config.custody, BRIDGE_LIQUIDITY)
            .await;

        let ledger = AggregationLedger::new(
            config,
            Box::new(store.clone()),
            Box::new(assets.clone()),
            Box::new(bridge.clone()),
            ADMIN,
        )
        .await
        .unwrap();
        ledger
            .grant_role(&ADMIN, OPERATOR, relay_ledger::domain::role::Role::Operator)
            .await
            .unwrap();

        Self {
            ledger,
            assets,
            bridge,
            store,
            recipient: Signer::from_seed(&[0x42; 32]),
        }
    }

    /// Admin-configures the default key's route to `self.recipient`.
    pub async fn configure_route(&self) {
        self.ledger
            .set_route(
                &ADMIN,
                &key(),
                bridge_asset(),
                destination(),
                self.recipient.identity(),
                None,
            )
            .await
            .unwrap();
    }

    pub async fn deposit(&self, amount: u128) {
        self.ledger.submit_payment(&PAYER, &key(), amount).await.unwrap();
    }
}
