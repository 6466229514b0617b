use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use mtls_fixtures::authority::DEFAULT_CA_VALIDITY_DAYS;
use mtls_fixtures::FixtureAssembler;

/// mtls-fixtures: generates a disposable PKI for TLS and mTLS tests.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to write the PEM artifacts into (created if missing).
    #[arg(default_value = "tls")]
    out_dir: PathBuf,

    /// Validity period, in days, for every generated certificate.
    #[arg(short = 'd', long, default_value_t = DEFAULT_CA_VALIDITY_DAYS)]
    days: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    println!(
        "Generating TLS test fixtures into {} ({} days validity)",
        args.out_dir.display(),
        args.days
    );

    let manifest = FixtureAssembler::new(&args.out_dir)
        .validity_days(args.days)
        .assemble()
        .context("Failed to build fixture set")?;

    for (name, pair) in manifest.pairs() {
        println!(
            "{} {}: {} / {}",
            style("✓").green(),
            name,
            pair.key.display(),
            pair.certificate.display()
        );
    }
    println!(
        "{} Done. Use ca.crt as the trust anchor; untrusted-* must be rejected.",
        style("✓").green()
    );
    Ok(())
}
