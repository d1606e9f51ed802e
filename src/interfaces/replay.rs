use super::csv::operation_reader::Operation;
use crate::application::ledger::AggregationLedger;
use crate::domain::ports::AssetLedger;
use crate::error::Result;
use crate::infrastructure::in_memory::InMemoryAssetLedger;

/// Applies journal operations to a ledger whose assets live in an
/// [`InMemoryAssetLedger`].
pub struct JournalReplayer<'a> {
    ledger: &'a AggregationLedger,
    assets: InMemoryAssetLedger,
}

impl<'a> JournalReplayer<'a> {
    pub fn new(ledger: &'a AggregationLedger, assets: InMemoryAssetLedger) -> Self {
        Self { ledger, assets }
    }

    pub async fn apply(&self, op: Operation) -> Result<()> {
        match op {
            Operation::Grant {
                caller,
                principal,
                role,
            } => self.ledger.grant_role(&caller, principal, role).await,
            Operation::Revoke {
                caller,
                principal,
                role,
            } => self.ledger.revoke_role(&caller, principal, role).await,
            Operation::Fund {
                account,
                asset,
                amount,
            } => {
                self.assets.mint(&asset, &account, amount).await;
                let custody = self.ledger.config().custody;
                if account != custody {
                    self.assets
                        .approve(&asset, &account, &custody, u128::MAX)
                        .await?;
                }
                Ok(())
            }
            Operation::Deposit { payer, key, amount } => self
                .ledger
                .submit_payment(&payer, &key, amount)
                .await
                .map(|_| ()),
            Operation::Route {
                caller,
                key,
                bridge_asset,
                recipient,
                destination,
            } => self
                .ledger
                .set_route(&caller, &key, bridge_asset, destination, recipient, None)
                .await
                .map(|_| ()),
            Operation::Settle {
                caller,
                key,
                amount,
                timeout_seconds,
            } => self
                .ledger
                .bulk_settle(&caller, &key, amount, timeout_seconds, None)
                .await
                .map(|_| ()),
            Operation::Cap { caller, key, cap } => self.ledger.set_max_cap(&caller, &key, cap).await,
            Operation::Pause { caller } => self.ledger.pause(&caller).await,
            Operation::Unpause { caller } => self.ledger.unpause(&caller).await,
        }
    }
}
