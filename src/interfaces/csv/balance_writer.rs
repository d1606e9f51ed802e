use crate::domain::amount::format_units;
use crate::domain::key::LedgerKey;
use crate::domain::state::KeyState;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct BalanceRow<'a> {
    asset: &'a str,
    provider: &'a str,
    balance: String,
    nonce: u64,
    configured: bool,
}

/// Writes the per-key balance report as CSV.
///
/// Balances are rendered in whole units of the ledger's precision, e.g.
/// `1.5` for 1 500 000 base units at 6 decimals.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
    decimals: u32,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W, decimals: u32) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
            decimals,
        }
    }

    pub fn write_balances(&mut self, balances: &[(LedgerKey, KeyState)]) -> Result<()> {
        if balances.is_empty() {
            self.writer
                .write_record(["asset", "provider", "balance", "nonce", "configured"])?;
        }
        for (key, state) in balances {
            self.writer.serialize(BalanceRow {
                asset: key.asset.as_str(),
                provider: key.provider.as_str(),
                balance: format_units(state.balance, self.decimals),
                nonce: state.nonce,
                configured: state.is_configured(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
