use crate::domain::key::LedgerKey;
use crate::domain::message::Digest32;
use crate::domain::ports::LedgerStore;
use crate::domain::state::{Governance, KeyState};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Column Family for per-key ledger state.
pub const CF_KEYS: &str = "keys";
/// Column Family for consumed signature digests.
pub const CF_SIGNATURES: &str = "signatures";
/// Column Family holding the single governance record.
pub const CF_GOVERNANCE: &str = "governance";

const GOVERNANCE_KEY: &[u8] = b"governance";

/// A persistent ledger store backed by RocksDB.
///
/// Key state, consumed signatures and governance live in separate Column
/// Families. A commit writes the key state and its signature digest in one
/// `WriteBatch`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    /// Makes the replay check and the batch write one step.
    commit_lock: Arc<Mutex<()>>,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| LedgerError::Storage(format!("serialization error: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| LedgerError::Storage(format!("deserialization error: {e}")))
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating the column
    /// families if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_KEYS, CF_SIGNATURES, CF_GOVERNANCE]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::Storage(format!("column family {name} not found")))
    }

    fn write_key(&self, key: &LedgerKey, state: &KeyState, batch: &mut WriteBatch) -> Result<()> {
        batch.put_cf(self.cf(CF_KEYS)?, key.storage_key(), encode(&(key, state))?);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn key_state(&self, key: &LedgerKey) -> Result<Option<KeyState>> {
        match self.db.get_cf(self.cf(CF_KEYS)?, key.storage_key())? {
            Some(bytes) => {
                let (_, state): (LedgerKey, KeyState) = decode(&bytes)?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn all_key_states(&self) -> Result<Vec<(LedgerKey, KeyState)>> {
        let iter = self
            .db
            .iterator_cf(self.cf(CF_KEYS)?, rocksdb::IteratorMode::Start);
        let mut out = Vec::new();
        for item in iter {
            let (_key, value) = item?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    async fn governance(&self) -> Result<Option<Governance>> {
        self.db
            .get_cf(self.cf(CF_GOVERNANCE)?, GOVERNANCE_KEY)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    async fn put_governance(&self, governance: Governance) -> Result<()> {
        self.db
            .put_cf(self.cf(CF_GOVERNANCE)?, GOVERNANCE_KEY, encode(&governance)?)?;
        Ok(())
    }

    async fn is_signature_used(&self, digest: &Digest32) -> Result<bool> {
        Ok(self
            .db
            .get_pinned_cf(self.cf(CF_SIGNATURES)?, digest.as_bytes())?
            .is_some())
    }

    async fn commit(
        &self,
        key: &LedgerKey,
        state: KeyState,
        consumed_signature: Option<Digest32>,
    ) -> Result<()> {
        let _guard = self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut batch = WriteBatch::default();
        if let Some(digest) = consumed_signature {
            let signatures = self.cf(CF_SIGNATURES)?;
            if self.db.get_pinned_cf(signatures, digest.as_bytes())?.is_some() {
                return Err(LedgerError::Replay);
            }
            batch.put_cf(signatures, digest.as_bytes(), b"");
        }
        self.write_key(key, &state, &mut batch)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn revert(
        &self,
        key: &LedgerKey,
        previous: KeyState,
        consumed_signature: Option<Digest32>,
    ) -> Result<()> {
        let _guard = self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut batch = WriteBatch::default();
        if let Some(digest) = consumed_signature {
            batch.delete_cf(self.cf(CF_SIGNATURES)?, digest.as_bytes());
        }
        self.write_key(key, &previous, &mut batch)?;
        self.db.write(batch)?;
        Ok(())
    }
}
