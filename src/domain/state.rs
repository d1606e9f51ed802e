use super::key::{AccountId, BridgeAssetId};
use super::role::{Role, RoleSet};
use crate::error::{AuthorizationError, StateError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Destination binding for one (asset, provider) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub bridge_asset: BridgeAssetId,
    /// Opaque destination-network descriptor, forwarded to the bridge as is.
    #[serde(with = "hex_bytes")]
    pub destination: Vec<u8>,
    /// Payout recipient and the only identity allowed to sign for this key.
    pub recipient: AccountId,
}

/// Everything the ledger tracks for one (asset, provider) key.
///
/// Created implicitly with zero values on first reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    pub balance: u128,
    pub route: Option<Route>,
    pub nonce: u64,
    /// Zero means no ceiling.
    pub max_cap: u128,
}

impl KeyState {
    pub fn is_configured(&self) -> bool {
        self.route.is_some()
    }

    pub fn configured_route(&self) -> Result<&Route, StateError> {
        self.route.as_ref().ok_or(StateError::RouteNotConfigured)
    }

    pub fn cap(&self) -> Option<u128> {
        (self.max_cap > 0).then_some(self.max_cap)
    }

    /// Adds a deposit, honouring the cap on the resulting balance.
    pub fn credit(&mut self, amount: u128) -> Result<u128, StateError> {
        let next = self.balance.checked_add(amount).ok_or(StateError::Overflow)?;
        if let Some(cap) = self.cap()
            && next > cap
        {
            return Err(StateError::CapExceeded { cap });
        }
        self.balance = next;
        Ok(next)
    }

    /// Removes a settled amount; never lets the balance go negative.
    pub fn debit(&mut self, amount: u128) -> Result<u128, StateError> {
        if let Some(cap) = self.cap()
            && amount > cap
        {
            return Err(StateError::CapExceeded { cap });
        }
        if self.balance < amount {
            return Err(StateError::InsufficientBalance {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }
}

/// Ledger-wide administrative state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Governance {
    pub roles: BTreeMap<AccountId, RoleSet>,
    pub paused: bool,
    /// Whether the bridge already holds the one-time bridging-asset allowance.
    pub bridge_allowance_granted: bool,
}

impl Governance {
    /// Initial state: the deployer holds every role.
    pub fn bootstrap(deployer: AccountId) -> Self {
        let mut roles = BTreeMap::new();
        roles.insert(deployer, RoleSet::all());
        Self {
            roles,
            paused: false,
            bridge_allowance_granted: false,
        }
    }

    pub fn roles_of(&self, principal: &AccountId) -> RoleSet {
        self.roles.get(principal).cloned().unwrap_or_default()
    }

    pub fn has_role(&self, principal: &AccountId, role: Role) -> bool {
        self.roles
            .get(principal)
            .is_some_and(|roles| roles.permits(role))
    }

    pub fn require_role(&self, principal: &AccountId, role: Role) -> Result<(), AuthorizationError> {
        self.roles_of(principal).require(role)
    }

    pub fn grant(&mut self, principal: AccountId, role: Role) -> bool {
        self.roles.entry(principal).or_default().grant(role)
    }

    pub fn revoke(&mut self, principal: &AccountId, role: Role) -> bool {
        let Some(roles) = self.roles.get_mut(principal) else {
            return false;
        };
        let removed = roles.revoke(role);
        if roles.is_empty() {
            self.roles.remove(principal);
        }
        removed
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
