use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("relay-ledger"));
    cmd.arg("tests/fixtures/journal.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "asset,provider,balance,nonce,configured",
        ))
        // 3.0 deposited, 1.5 settled through the operator
        .stdout(predicate::str::contains("USDC,provider-1,1.5,0,true"))
        // No route on the second provider
        .stdout(predicate::str::contains("USDC,provider-2,2,0,false"))
        .stderr(predicate::str::contains("Operation").not())
        .stderr(predicate::str::contains("Error reading").not());

    Ok(())
}
