use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use x509_parser::prelude::*;

use crate::models::CertificateStatus;

const HTTPS_PORT: u16 = 443;

/// Inspects the server certificate behind an HTTPS URL via a direct TLS
/// connection on port 443.
///
/// Verification here is always strict (webpki roots, hostname check) no
/// matter what transport mode the reachability probe used, which makes this
/// the authoritative source for expiry data. Every failure is reported as a
/// status value; callers treat those as advisory.
pub async fn inspect_certificate(url: &str, deadline: Duration) -> CertificateStatus {
    let parsed = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed,
        Err(err) => return CertificateStatus::fail(format!("invalid URL: {err}")),
    };
    if parsed.scheme() != "https" {
        return CertificateStatus::fail("not an HTTPS URL");
    }
    let Some(host) = parsed.host_str().map(str::to_owned) else {
        return CertificateStatus::fail("URL has no hostname");
    };

    let server_name = match ServerName::try_from(host.clone()) {
        Ok(name) => name,
        Err(err) => return CertificateStatus::fail(format!("invalid hostname {host:?}: {err}")),
    };

    let tcp = match timeout(deadline, TcpStream::connect((host.as_str(), HTTPS_PORT))).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(err)) => return CertificateStatus::fail(format!("connection failed: {err}")),
        Err(_) => return CertificateStatus::fail("TLS connection timed out"),
    };

    let connector = TlsConnector::from(strict_client_config());
    let stream = match timeout(deadline, connector.connect(server_name, tcp)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(err)) => return CertificateStatus::fail(format!("TLS handshake failed: {err}")),
        Err(_) => return CertificateStatus::fail("TLS handshake timed out"),
    };

    let (_, session) = stream.get_ref();
    match session.peer_certificates().and_then(|chain| chain.first()) {
        Some(leaf) => summarize_certificate(leaf.as_ref(), Utc::now()),
        None => CertificateStatus::fail("no certificate presented by server"),
    }
}

fn strict_client_config() -> Arc<ClientConfig> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

/// Reads expiry and issuer from the leaf certificate. The expiry comes from
/// the parsed ASN.1 validity field; a value that cannot be mapped to a
/// calendar date is reported as a failure naming the raw value.
fn summarize_certificate(der: &[u8], now: DateTime<Utc>) -> CertificateStatus {
    let (_, cert) = match X509Certificate::from_der(der) {
        Ok(parsed) => parsed,
        Err(err) => return CertificateStatus::fail(format!("certificate parse failed: {err}")),
    };

    let not_after = &cert.validity().not_after;
    let Some(expiry) = DateTime::<Utc>::from_timestamp(not_after.timestamp(), 0) else {
        return CertificateStatus::fail(format!("unparseable expiry time: {not_after}"));
    };

    CertificateStatus::Inspected {
        days_left: days_until(now, expiry),
        expiry_date: expiry.format("%Y-%m-%d").to_string(),
        issuer: issuer_display(&cert),
    }
}

/// Whole days from `now` to `expiry`, floored, so an expiry 12 hours in the
/// past already counts as day -1.
fn days_until(now: DateTime<Utc>, expiry: DateTime<Utc>) -> i64 {
    (expiry.timestamp() - now.timestamp()).div_euclid(86_400)
}

fn issuer_display(cert: &X509Certificate<'_>) -> String {
    let issuer = cert.issuer();
    issuer
        .iter_organization()
        .chain(issuer.iter_common_name())
        .filter_map(|attr| attr.as_str().ok())
        .map(str::to_owned)
        .next()
        .unwrap_or_else(|| "unknown".to_string())
}
