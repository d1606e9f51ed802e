use super::key::{AccountId, BridgeAssetId, LedgerKey};
use super::role::Role;
use serde::{Deserialize, Serialize};

/// Audit record of an accepted deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRecord {
    pub payer: AccountId,
    pub key: LedgerKey,
    pub amount: u128,
    pub balance: u128,
}

/// Audit record of a dispatched settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub key: LedgerKey,
    pub amount: u128,
    /// Amount handed to the bridge, in bridging-asset units.
    pub bridged_amount: u128,
    pub recipient: AccountId,
    pub destination: Vec<u8>,
    pub bridge_asset: BridgeAssetId,
    pub remaining_balance: u128,
    /// Nonce consumed when authorized by signature.
    pub consumed_nonce: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    Deposit(DepositRecord),
    Settlement(SettlementRecord),
    RouteSet {
        key: LedgerKey,
        recipient: AccountId,
        by_signature: bool,
    },
    CapSet {
        key: LedgerKey,
        cap: u128,
    },
    RoleGranted {
        principal: AccountId,
        role: Role,
    },
    RoleRevoked {
        principal: AccountId,
        role: Role,
    },
    Paused,
    Unpaused,
    EmergencyWithdrawal {
        asset: String,
        amount: u128,
        to: AccountId,
    },
    BalanceOverridden {
        key: LedgerKey,
        previous: u128,
        balance: u128,
    },
}
