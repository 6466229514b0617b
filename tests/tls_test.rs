//! End-to-end loopback TLS checks: a listener configured with the generated
//! server pair must accept clients that trust `ca.crt` and present the
//! trusted client pair, and must reject the untrusted chain in both roles.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use mtls_fixtures::{FixtureAssembler, FixtureManifest, PemPair};
use openssl::ssl::{SslAcceptor, SslConnector, SslFiletype, SslMethod, SslVerifyMode};

/// Start a one-shot mTLS echo server using the generated server pair, trusting
/// `ca.crt` for client certificates. Returns whether the handshake succeeded.
fn spawn_server(manifest: &FixtureManifest) -> Result<(SocketAddr, JoinHandle<bool>)> {
    let mut acceptor = SslAcceptor::mozilla_intermediate(SslMethod::tls())?;
    acceptor.set_private_key_file(&manifest.server.key, SslFiletype::PEM)?;
    acceptor.set_certificate_chain_file(&manifest.server.certificate)?;
    acceptor.check_private_key()?;
    acceptor.set_ca_file(&manifest.ca.certificate)?;
    acceptor.set_verify(SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT);
    let acceptor = acceptor.build();

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let handle = std::thread::spawn(move || {
        let Ok((stream, _peer)) = listener.accept() else {
            return false;
        };
        match acceptor.accept(stream) {
            Ok(mut tls) => {
                let mut buf = [0u8; 4];
                tls.read_exact(&mut buf).is_ok() && tls.write_all(&buf).is_ok()
            }
            Err(_) => false,
        }
    });
    Ok((addr, handle))
}

/// Connect with the given trust anchor and client identity, then echo four
/// bytes through the TLS stream.
fn client_round_trip(addr: SocketAddr, trust_anchor: &Path, identity: &PemPair) -> Result<()> {
    let mut connector = SslConnector::builder(SslMethod::tls())?;
    connector.set_ca_file(trust_anchor)?;
    connector.set_certificate_file(&identity.certificate, SslFiletype::PEM)?;
    connector.set_private_key_file(&identity.key, SslFiletype::PEM)?;
    let connector = connector.build();

    let stream = TcpStream::connect(addr)?;
    let mut tls = connector
        .connect("localhost", stream)
        .map_err(|e| anyhow!("TLS handshake failed: {e}"))?;
    tls.write_all(b"ping")?;
    let mut buf = [0u8; 4];
    tls.read_exact(&mut buf).context("echo read failed")?;
    anyhow::ensure!(&buf == b"ping");
    Ok(())
}

#[test]
fn mtls_round_trip_with_trusted_chain() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let manifest = FixtureAssembler::new(dir.path()).assemble()?;

    let (addr, server) = spawn_server(&manifest)?;
    client_round_trip(addr, &manifest.ca.certificate, &manifest.client)?;
    assert!(server.join().map_err(|_| anyhow!("server panicked"))?);
    Ok(())
}

#[test]
fn untrusted_trust_anchor_rejects_the_server() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let manifest = FixtureAssembler::new(dir.path()).assemble()?;

    let (addr, server) = spawn_server(&manifest)?;
    // Trusting only the untrusted CA, the server certificate must not verify.
    let result = client_round_trip(addr, &manifest.untrusted_ca.certificate, &manifest.client);
    assert!(result.is_err());
    assert!(!server.join().map_err(|_| anyhow!("server panicked"))?);
    Ok(())
}

#[test]
fn server_rejects_client_from_untrusted_chain() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let manifest = FixtureAssembler::new(dir.path()).assemble()?;

    let (addr, server) = spawn_server(&manifest)?;
    let result = client_round_trip(addr, &manifest.ca.certificate, &manifest.untrusted_client);
    assert!(result.is_err());
    assert!(!server.join().map_err(|_| anyhow!("server panicked"))?);
    Ok(())
}
