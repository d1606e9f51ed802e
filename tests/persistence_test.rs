#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

const PAYER: &str = "0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b";
const DEPLOYER: &str = "adadadadadadadadadadadadadadadadadadadadadadadadadadadadadadadad";
const RECIPIENT: &str = "4242424242424242424242424242424242424242424242424242424242424242";

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: deposit and configure a route
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv1, "op,caller,asset,provider,amount,extra").unwrap();
    writeln!(csv1, "fund,{PAYER},USDC,,200000000,").unwrap();
    writeln!(csv1, "deposit,{PAYER},USDC,provider-1,100000000,").unwrap();
    writeln!(csv1, "route,{DEPLOYER},USDC,provider-1,,usdc.bridge:{RECIPIENT}:beef").unwrap();

    let mut cmd1 = Command::new(cargo_bin!("relay-ledger"));
    cmd1.arg(csv1.path()).arg("--db-path").arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("USDC,provider-1,100,0,true"));

    // 2. Second run: asset balances are not persisted, so fund again
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv2, "op,caller,asset,provider,amount,extra").unwrap();
    writeln!(csv2, "fund,{PAYER},USDC,,50000000,").unwrap();
    writeln!(csv2, "deposit,{PAYER},USDC,provider-1,50000000,").unwrap();

    let mut cmd2 = Command::new(cargo_bin!("relay-ledger"));
    cmd2.arg(csv2.path()).arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // Balance and route both survive the restart
    assert!(stdout2.contains("USDC,provider-1,150,0,true"));
}
