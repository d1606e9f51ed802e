use crate::domain::key::{AccountId, BridgeAssetId, LedgerKey};
use crate::domain::message::{Digest32, RouteMessage, SettlementMessage, SigningDomain};
use crate::domain::ports::LedgerStore;
use crate::domain::role::Role;
use crate::domain::signature::{self, SignedPayload};
use crate::domain::state::Governance;
use crate::error::{AuthorizationError, LedgerError, Result};

/// How a privileged call was authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Role(Role),
    Signature {
        signer: AccountId,
        replay_digest: Digest32,
    },
}

impl Authorization {
    /// Digest that must be recorded as used when the operation commits.
    pub fn consumed_signature(&self) -> Option<Digest32> {
        match self {
            Authorization::Role(_) => None,
            Authorization::Signature { replay_digest, .. } => Some(*replay_digest),
        }
    }

    pub fn is_signature(&self) -> bool {
        matches!(self, Authorization::Signature { .. })
    }
}

/// Decides whether a caller may reconfigure a route or trigger settlement.
///
/// A caller holding the required role is always admitted. Otherwise the
/// caller must present a signature that has not been used before, made by
/// `expected_signer` over the operation's canonical digest.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationEngine {
    domain: SigningDomain,
}

impl AuthorizationEngine {
    pub fn new(domain: SigningDomain) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    pub fn route_digest(
        &self,
        key: &LedgerKey,
        bridge_asset: &BridgeAssetId,
        destination: &[u8],
        recipient: &AccountId,
    ) -> Digest32 {
        RouteMessage {
            key,
            bridge_asset,
            destination,
            recipient,
        }
        .digest(&self.domain)
    }

    pub fn settlement_digest(
        &self,
        key: &LedgerKey,
        amount: u128,
        timeout_seconds: u64,
        nonce: u64,
    ) -> Digest32 {
        SettlementMessage {
            key,
            amount,
            timeout_seconds,
            nonce,
        }
        .digest(&self.domain)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn authorize(
        &self,
        governance: &Governance,
        caller: &AccountId,
        required: Role,
        digest: &Digest32,
        expected_signer: &AccountId,
        signature: Option<&SignedPayload>,
        store: &dyn LedgerStore,
    ) -> Result<Authorization> {
        if governance.has_role(caller, required) {
            return Ok(Authorization::Role(required));
        }
        let Some(payload) = signature else {
            return Err(AuthorizationError::MissingRole(required.name()).into());
        };

        // The replay key depends only on the signature bytes, so a consumed
        // signature is recognised even after the nonce it signed has moved on.
        let replay_digest = payload.replay_digest();
        if store.is_signature_used(&replay_digest).await? {
            return Err(LedgerError::Replay);
        }

        let signer = signature::verify(digest, payload)?;
        if &signer != expected_signer {
            return Err(AuthorizationError::SignerMismatch.into());
        }

        Ok(Authorization::Signature {
            signer,
            replay_digest,
        })
    }
}
