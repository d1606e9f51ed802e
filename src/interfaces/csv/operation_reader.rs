use crate::domain::key::{AccountId, AssetId, BridgeAssetId, LedgerKey};
use crate::domain::role::Role;
use crate::error::{LedgerError, Result, ValidationError};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Grant,
    Revoke,
    Fund,
    Deposit,
    Route,
    Settle,
    Cap,
    Pause,
    Unpause,
}

/// One raw journal row.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct JournalRecord {
    pub op: OperationType,
    pub caller: String,
    pub asset: Option<String>,
    pub provider: Option<String>,
    pub amount: Option<u128>,
    pub extra: Option<String>,
}

/// A validated journal operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Grant {
        caller: AccountId,
        principal: AccountId,
        role: Role,
    },
    Revoke {
        caller: AccountId,
        principal: AccountId,
        role: Role,
    },
    /// Mints into `account` and approves custody to pull it. Local replay only.
    Fund {
        account: AccountId,
        asset: AssetId,
        amount: u128,
    },
    Deposit {
        payer: AccountId,
        key: LedgerKey,
        amount: u128,
    },
    Route {
        caller: AccountId,
        key: LedgerKey,
        bridge_asset: BridgeAssetId,
        recipient: AccountId,
        destination: Vec<u8>,
    },
    Settle {
        caller: AccountId,
        key: LedgerKey,
        amount: u128,
        timeout_seconds: u64,
    },
    Cap {
        caller: AccountId,
        key: LedgerKey,
        cap: u128,
    },
    Pause {
        caller: AccountId,
    },
    Unpause {
        caller: AccountId,
    },
}

fn missing(field: &'static str) -> ValidationError {
    ValidationError::Malformed {
        field,
        reason: "missing".to_string(),
    }
}

fn role_grant(extra: Option<&str>) -> Result<(Role, AccountId)> {
    let (role, principal) = extra
        .and_then(|e| e.split_once(':'))
        .ok_or_else(|| missing("role:principal"))?;
    Ok((role.parse()?, principal.parse()?))
}

impl JournalRecord {
    fn key(&self) -> Result<LedgerKey> {
        Ok(LedgerKey::parse(
            self.asset.as_deref().unwrap_or_default(),
            self.provider.as_deref().unwrap_or_default(),
        )?)
    }

    fn amount(&self) -> Result<u128> {
        self.amount.ok_or_else(|| missing("amount").into())
    }

    fn extra(&self) -> Option<&str> {
        self.extra.as_deref().filter(|e| !e.is_empty())
    }
}

impl TryFrom<JournalRecord> for Operation {
    type Error = LedgerError;

    fn try_from(record: JournalRecord) -> Result<Self> {
        let caller: AccountId = record.caller.parse()?;
        let op = match record.op {
            OperationType::Grant => {
                let (role, principal) = role_grant(record.extra())?;
                Operation::Grant {
                    caller,
                    principal,
                    role,
                }
            }
            OperationType::Revoke => {
                let (role, principal) = role_grant(record.extra())?;
                Operation::Revoke {
                    caller,
                    principal,
                    role,
                }
            }
            OperationType::Fund => Operation::Fund {
                account: caller,
                asset: AssetId::new(record.asset.clone().unwrap_or_default())?,
                amount: record.amount()?,
            },
            OperationType::Deposit => Operation::Deposit {
                payer: caller,
                key: record.key()?,
                amount: record.amount()?,
            },
            OperationType::Route => {
                let mut parts = record
                    .extra()
                    .ok_or_else(|| missing("bridge_asset:recipient:destination"))?
                    .splitn(3, ':');
                let bridge_asset = BridgeAssetId::new(parts.next().unwrap_or_default())?;
                let recipient: AccountId = parts.next().ok_or_else(|| missing("recipient"))?.parse()?;
                let destination = hex::decode(parts.next().ok_or_else(|| missing("destination"))?)
                    .map_err(|e| ValidationError::Malformed {
                        field: "destination",
                        reason: e.to_string(),
                    })?;
                Operation::Route {
                    caller,
                    key: record.key()?,
                    bridge_asset,
                    recipient,
                    destination,
                }
            }
            OperationType::Settle => {
                let timeout_seconds = record
                    .extra()
                    .ok_or_else(|| missing("timeout"))?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ValidationError::Malformed {
                        field: "timeout",
                        reason: e.to_string(),
                    })?;
                Operation::Settle {
                    caller,
                    key: record.key()?,
                    amount: record.amount()?,
                    timeout_seconds,
                }
            }
            OperationType::Cap => Operation::Cap {
                caller,
                key: record.key()?,
                cap: record.amount()?,
            },
            OperationType::Pause => Operation::Pause { caller },
            OperationType::Unpause => Operation::Unpause { caller },
        };
        Ok(op)
    }
}

/// Reads journal operations from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// yielding one `Result<Operation>` per row.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads, deserializes and validates each row.
    pub fn operations(self) -> impl Iterator<Item = Result<Operation>> {
        self.reader.into_deserialize().map(|result| {
            let record: JournalRecord = result.map_err(LedgerError::from)?;
            Operation::try_from(record)
        })
    }
}
