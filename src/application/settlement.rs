use super::ledger::AggregationLedger;
use crate::domain::amount::{Amount, scale_amount};
use crate::domain::event::{LedgerEvent, SettlementRecord};
use crate::domain::key::{AccountId, LedgerKey};
use crate::domain::message::Digest32;
use crate::domain::ports::TeleportRequest;
use crate::domain::role::Role;
use crate::domain::signature::SignedPayload;
use crate::domain::state::{KeyState, Route};
use crate::error::{LedgerError, Result, StateError, ValidationError};

/// Allowance granted to the bridge on first settlement.
pub const BRIDGE_ALLOWANCE: u128 = u128::MAX;

/// Encodes a recipient in the bridge's 32-byte addressing convention.
pub fn encode_recipient(recipient: &AccountId) -> [u8; 32] {
    *recipient.as_bytes()
}

/// Teleport arguments for a settlement: no relayer fee, no native cost,
/// no redeem and an empty payload.
pub fn teleport_request(route: &Route, bridged_amount: u128, timeout_seconds: u64) -> TeleportRequest {
    TeleportRequest {
        amount: bridged_amount,
        relayer_fee: 0,
        bridge_asset: route.bridge_asset.clone(),
        redeem: false,
        recipient: encode_recipient(&route.recipient),
        destination: route.destination.clone(),
        timeout_seconds,
        native_cost: 0,
        data: Vec::new(),
    }
}

impl AggregationLedger {
    /// Settles `amount` of the key's balance through the bridge.
    ///
    /// Authorized by the Operator role or by a signature from the route
    /// recipient over [`AggregationLedger::settlement_digest`]. The balance
    /// is debited, the nonce advanced and the signature recorded before the
    /// bridge is called; if the bridge refuses the dispatch those changes are
    /// rolled back and the call fails as a whole.
    pub async fn bulk_settle(
        &self,
        caller: &AccountId,
        key: &LedgerKey,
        amount: u128,
        timeout_seconds: u64,
        signature: Option<&SignedPayload>,
    ) -> Result<SettlementRecord> {
        let amount = Amount::new(amount)?.value();
        if timeout_seconds == 0 {
            return Err(ValidationError::ZeroTimeout.into());
        }

        let _guard = self.locks.lock(key).await;
        let governance = self.load_governance().await?;
        if governance.paused {
            tracing::debug!(%key, "settlement rejected: paused");
            return Err(LedgerError::Paused);
        }

        let previous = self.load_key(key).await?;
        let route = previous.configured_route()?.clone();

        let digest = self
            .auth
            .settlement_digest(key, amount, timeout_seconds, previous.nonce);
        let authorization = self
            .auth
            .authorize(
                &governance,
                caller,
                Role::Operator,
                &digest,
                &route.recipient,
                signature,
                self.store.as_ref(),
            )
            .await
            .inspect_err(|err| tracing::debug!(%key, %caller, error = %err, "settlement rejected"))?;

        let mut next = previous.clone();
        let remaining = next.debit(amount)?;
        let consumed_nonce = if authorization.is_signature() {
            let nonce = next.nonce;
            next.nonce += 1;
            Some(nonce)
        } else {
            None
        };

        let bridged_amount = scale_amount(
            amount,
            self.config.ledger_decimals,
            self.config.bridging_decimals,
        )?;
        self.ensure_liquidity(bridged_amount).await?;

        let consumed = authorization.consumed_signature();
        self.store.commit(key, next, consumed).await?;

        let dispatched = async {
            self.ensure_bridge_allowance(bridged_amount).await?;
            self.bridge
                .teleport(teleport_request(&route, bridged_amount, timeout_seconds))
                .await
        }
        .await;
        if let Err(err) = dispatched {
            self.rollback(key, previous, consumed, &err).await?;
            return Err(err);
        }

        let record = SettlementRecord {
            key: key.clone(),
            amount,
            bridged_amount,
            recipient: route.recipient,
            destination: route.destination.clone(),
            bridge_asset: route.bridge_asset.clone(),
            remaining_balance: remaining,
            consumed_nonce,
        };
        tracing::info!(
            %key,
            amount,
            bridged_amount,
            recipient = %route.recipient,
            destination = %hex::encode(&route.destination),
            remaining,
            "settlement dispatched"
        );
        self.emit(LedgerEvent::Settlement(record.clone()));
        Ok(record)
    }

    async fn ensure_liquidity(&self, required: u128) -> Result<()> {
        let held = self
            .assets
            .balance_of(&self.config.bridging_token, &self.config.custody)
            .await?;
        if held < required {
            tracing::debug!(required, held, "settlement rejected: bridging liquidity");
            return Err(StateError::InsufficientLiquidity { required, held }.into());
        }
        Ok(())
    }

    async fn ensure_bridge_allowance(&self, required: u128) -> Result<()> {
        let _guard = self.governance_lock.lock().await;
        let mut governance = self.load_governance().await?;
        let current = self
            .assets
            .allowance(
                &self.config.bridging_token,
                &self.config.custody,
                &self.config.bridge_account,
            )
            .await?;
        if governance.bridge_allowance_granted && current >= required {
            return Ok(());
        }

        self.assets
            .approve(
                &self.config.bridging_token,
                &self.config.custody,
                &self.config.bridge_account,
                BRIDGE_ALLOWANCE,
            )
            .await?;
        if !governance.bridge_allowance_granted {
            governance.bridge_allowance_granted = true;
            self.store.put_governance(governance).await?;
        }
        tracing::info!(bridge = %self.config.bridge_account, "granted bridging-asset allowance");
        Ok(())
    }

    async fn rollback(
        &self,
        key: &LedgerKey,
        previous: KeyState,
        consumed: Option<Digest32>,
        cause: &LedgerError,
    ) -> Result<()> {
        tracing::warn!(%key, error = %cause, "dispatch failed, rolling back settlement");
        if let Err(storage) = self.store.revert(key, previous, consumed).await {
            tracing::error!(
                %key,
                dispatch_error = %cause,
                storage_error = %storage,
                "rollback failed, key left debited without dispatch"
            );
            return Err(LedgerError::RollbackFailed {
                key: key.to_string(),
                dispatch: cause.to_string(),
                storage: storage.to_string(),
            });
        }
        Ok(())
    }
}
