use super::ledger::AggregationLedger;
use crate::domain::amount::Amount;
use crate::domain::event::LedgerEvent;
use crate::domain::key::{AccountId, AssetId, LedgerKey};
use crate::domain::role::Role;
use crate::domain::state::Governance;
use crate::error::Result;

impl AggregationLedger {
    /// Read-modify-write of the governance record under the governance lock.
    /// `update` returns whether anything changed.
    async fn update_governance<F>(&self, caller: &AccountId, required: Role, update: F) -> Result<bool>
    where
        F: FnOnce(&mut Governance) -> bool,
    {
        let _guard = self.governance_lock.lock().await;
        let mut governance = self.load_governance().await?;
        governance
            .require_role(caller, required)
            .inspect_err(|err| tracing::debug!(%caller, error = %err, "governance change rejected"))?;
        let changed = update(&mut governance);
        if changed {
            self.store.put_governance(governance).await?;
        }
        Ok(changed)
    }

    pub async fn grant_role(&self, caller: &AccountId, principal: AccountId, role: Role) -> Result<()> {
        if self
            .update_governance(caller, Role::Admin, |g| g.grant(principal, role))
            .await?
        {
            tracing::info!(%principal, %role, "role granted");
            self.emit(LedgerEvent::RoleGranted { principal, role });
        }
        Ok(())
    }

    pub async fn revoke_role(&self, caller: &AccountId, principal: AccountId, role: Role) -> Result<()> {
        if self
            .update_governance(caller, Role::Admin, |g| g.revoke(&principal, role))
            .await?
        {
            tracing::info!(%principal, %role, "role revoked");
            self.emit(LedgerEvent::RoleRevoked { principal, role });
        }
        Ok(())
    }

    /// Stops deposits and settlements. Queries stay available.
    pub async fn pause(&self, caller: &AccountId) -> Result<()> {
        if self
            .update_governance(caller, Role::Admin, |g| !std::mem::replace(&mut g.paused, true))
            .await?
        {
            tracing::info!(%caller, "ledger paused");
            self.emit(LedgerEvent::Paused);
        }
        Ok(())
    }

    pub async fn unpause(&self, caller: &AccountId) -> Result<()> {
        if self
            .update_governance(caller, Role::Admin, |g| std::mem::replace(&mut g.paused, false))
            .await?
        {
            tracing::info!(%caller, "ledger unpaused");
            self.emit(LedgerEvent::Unpaused);
        }
        Ok(())
    }

    /// Sets the per-key ceiling; zero removes it.
    pub async fn set_max_cap(&self, caller: &AccountId, key: &LedgerKey, cap: u128) -> Result<()> {
        self.load_governance()
            .await?
            .require_role(caller, Role::CreditManager)?;

        let _guard = self.locks.lock(key).await;
        let mut state = self.load_key(key).await?;
        state.max_cap = cap;
        self.store.commit(key, state, None).await?;

        tracing::info!(%key, cap, "cap set");
        self.emit(LedgerEvent::CapSet {
            key: key.clone(),
            cap,
        });
        Ok(())
    }

    /// Moves custody holdings of `asset` to the calling admin for incident
    /// recovery. Ledger balances are not touched.
    pub async fn emergency_withdraw(&self, caller: &AccountId, asset: &AssetId, amount: u128) -> Result<()> {
        let amount = Amount::new(amount)?.value();
        self.load_governance().await?.require_role(caller, Role::Admin)?;

        self.assets
            .transfer(asset, &self.config.custody, caller, amount)
            .await?;

        tracing::warn!(%caller, %asset, amount, "emergency withdrawal from custody");
        self.emit(LedgerEvent::EmergencyWithdrawal {
            asset: asset.to_string(),
            amount,
            to: *caller,
        });
        Ok(())
    }

    /// Overwrites a key's balance without a matching deposit or settlement.
    ///
    /// Only compiled with the `balance-override` feature and only for
    /// admins. Breaks the deposit/settlement accounting identity; meant for
    /// demo and test deployments.
    #[cfg(feature = "balance-override")]
    pub async fn override_balance(&self, caller: &AccountId, key: &LedgerKey, balance: u128) -> Result<()> {
        self.load_governance().await?.require_role(caller, Role::Admin)?;

        let _guard = self.locks.lock(key).await;
        let mut state = self.load_key(key).await?;
        let previous = std::mem::replace(&mut state.balance, balance);
        self.store.commit(key, state, None).await?;

        tracing::warn!(%caller, %key, previous, balance, "balance overridden outside deposit/settlement flow");
        self.emit(LedgerEvent::BalanceOverridden {
            key: key.clone(),
            previous,
            balance,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::error::{AuthorizationError, LedgerError};
    use crate::infrastructure::in_memory::{
        InMemoryAssetLedger, InMemoryLedgerStore, RecordingBridge,
    };

    const ADMIN: AccountId = AccountId([0xaa; 32]);
    const USER: AccountId = AccountId([0x01; 32]);

    async fn ledger(assets: InMemoryAssetLedger) -> AggregationLedger {
        AggregationLedger::new(
            LedgerConfig::default(),
            Box::new(InMemoryLedgerStore::new()),
            Box::new(assets),
            Box::new(RecordingBridge::new()),
            ADMIN,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_deployer_holds_every_role() {
        let ledger = ledger(InMemoryAssetLedger::new()).await;
        let roles = ledger.roles_of(&ADMIN).await.unwrap();
        for role in Role::ALL {
            assert!(roles.contains(role));
        }
        assert!(ledger.roles_of(&USER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_admin_manages_roles() {
        let ledger = ledger(InMemoryAssetLedger::new()).await;
        let err = ledger
            .grant_role(&USER, USER, Role::Operator)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Authorization(AuthorizationError::MissingRole("admin"))
        ));

        ledger.grant_role(&ADMIN, USER, Role::CreditManager).await.unwrap();
        let key = LedgerKey::parse("USDC", "p").unwrap();
        ledger.set_max_cap(&USER, &key, 500).await.unwrap();
        assert_eq!(ledger.max_cap(&key).await.unwrap(), Some(500));

        ledger.revoke_role(&ADMIN, USER, Role::CreditManager).await.unwrap();
        assert!(ledger.set_max_cap(&USER, &key, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_cap_zero_means_unset() {
        let ledger = ledger(InMemoryAssetLedger::new()).await;
        let key = LedgerKey::parse("USDC", "p").unwrap();
        ledger.set_max_cap(&ADMIN, &key, 10).await.unwrap();
        ledger.set_max_cap(&ADMIN, &key, 0).await.unwrap();
        assert_eq!(ledger.max_cap(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pause_is_admin_only_and_idempotent() {
        let ledger = ledger(InMemoryAssetLedger::new()).await;
        assert!(ledger.pause(&USER).await.is_err());
        ledger.pause(&ADMIN).await.unwrap();
        ledger.pause(&ADMIN).await.unwrap();
        assert!(ledger.is_paused().await.unwrap());
        ledger.unpause(&ADMIN).await.unwrap();
        assert!(!ledger.is_paused().await.unwrap());
    }

    #[tokio::test]
    async fn test_emergency_withdraw() {
        let assets = InMemoryAssetLedger::new();
        let usdc = AssetId::new("USDC").unwrap();
        let custody = LedgerConfig::default().custody;
        assets.mint(&usdc, &custody, 1_000).await;
        let ledger = ledger(assets.clone()).await;

        assert!(ledger.emergency_withdraw(&USER, &usdc, 100).await.is_err());
        ledger.emergency_withdraw(&ADMIN, &usdc, 400).await.unwrap();
        assert_eq!(assets.holding(&usdc, &ADMIN).await, 400);
        assert_eq!(assets.holding(&usdc, &custody).await, 600);
    }

    #[cfg(feature = "balance-override")]
    #[tokio::test]
    async fn test_override_balance_admin_only() {
        let ledger = ledger(InMemoryAssetLedger::new()).await;
        let key = LedgerKey::parse("USDC", "p").unwrap();
        assert!(ledger.override_balance(&USER, &key, 5).await.is_err());
        ledger.override_balance(&ADMIN, &key, 5).await.unwrap();
        assert_eq!(ledger.balance(&key).await.unwrap(), 5);
    }
}
