use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::predicate;

#[test]
fn generates_fixture_set_into_directory() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out_dir = dir.path().join("tls");

    let mut cmd = Command::cargo_bin("mtls-fixtures")?;
    cmd.arg(&out_dir);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Generating TLS test fixtures"))
        .stdout(predicate::str::contains("untrusted-client"))
        .stdout(predicate::str::contains("Done."));

    for name in [
        "ca.key",
        "ca.crt",
        "server.key",
        "server.crt",
        "client.key",
        "client.crt",
        "untrusted-ca.key",
        "untrusted-ca.crt",
        "untrusted-client.key",
        "untrusted-client.crt",
    ] {
        assert!(out_dir.join(name).exists(), "missing artifact {name}");
    }
    assert_eq!(std::fs::read_dir(&out_dir)?.count(), 10);
    Ok(())
}

#[test]
fn honors_custom_validity() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let mut cmd = Command::cargo_bin("mtls-fixtures")?;
    cmd.args(["--days", "30"]).arg(dir.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("30 days validity"));
    Ok(())
}

#[test]
fn rejects_invalid_validity() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let mut cmd = Command::cargo_bin("mtls-fixtures")?;
    cmd.args(["--days", "soon"]).arg(dir.path());

    cmd.assert().failure();
    Ok(())
}
