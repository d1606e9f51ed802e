use crate::domain::key::{AccountId, AssetId};
use crate::domain::message::SigningDomain;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Deployment parameters of one ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Identifier of the network this ledger runs on; bound into every signature.
    pub network_domain_id: u64,
    /// Identifier of this deployment; bound into every signature.
    pub ledger_instance_id: AccountId,
    /// Account holding deposited assets and bridging-asset liquidity.
    pub custody: AccountId,
    /// Spender the bridge pulls bridging assets with.
    pub bridge_account: AccountId,
    pub bridging_token: AssetId,
    pub ledger_decimals: u32,
    pub bridging_decimals: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network_domain_id: 1,
            ledger_instance_id: AccountId([0x11; 32]),
            custody: AccountId([0xc0; 32]),
            bridge_account: AccountId([0xb0; 32]),
            bridging_token: AssetId::from_static("BRIDGE"),
            ledger_decimals: 6,
            bridging_decimals: 18,
        }
    }
}

impl LedgerConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| LedgerError::Internal(Box::new(e)))
    }

    pub fn signing_domain(&self) -> SigningDomain {
        SigningDomain {
            network_domain_id: self.network_domain_id,
            ledger_instance_id: self.ledger_instance_id,
        }
    }
}
