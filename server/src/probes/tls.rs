//! TLS observability for HTTPS probes
//!
//! Performs a dedicated handshake whose verifier delegates to webpki but
//! records the verdict instead of failing, so expired and self-signed
//! certificates are reported with their details rather than erroring the
//! probe out. The observed HTTP status stays the source of truth for
//! success; everything collected here is diagnostics.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use x509_parser::parse_x509_certificate;

use super::ProbeError;

/// What one inspection handshake observed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlsInfo {
    pub version: Option<String>,
    pub cipher: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub issuer: Option<String>,
    /// Advisory set when the certificate is not yet valid, expired, or the
    /// chain does not verify against the trusted roots (in that order)
    pub message: Option<String>,
}

/// Verifier that runs the real webpki verification but always reports the
/// handshake as acceptable, keeping the verdict for diagnostics.
#[derive(Debug)]
struct ObservingVerifier {
    inner: Arc<WebPkiServerVerifier>,
    verdict: Mutex<Option<rustls::Error>>,
}

impl ObservingVerifier {
    fn new() -> Result<Arc<Self>, ProbeError> {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let inner = WebPkiServerVerifier::builder(Arc::new(roots))
            .build()
            .map_err(|e| ProbeError::Tls(e.to_string()))?;

        Ok(Arc::new(Self {
            inner,
            verdict: Mutex::new(None),
        }))
    }

    fn take_verdict(&self) -> Option<rustls::Error> {
        self.verdict.lock().take()
    }
}

impl ServerCertVerifier for ObservingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if let Err(e) = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            *self.verdict.lock() = Some(e);
        }
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        // Signature checks stay strict; a forged handshake is not observable data
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Handshake with `host:port` and collect TLS diagnostics.
pub async fn inspect(host: &str, port: u16, timeout: Duration) -> Result<TlsInfo, ProbeError> {
    tokio::time::timeout(timeout, inspect_inner(host, port))
        .await
        .map_err(|_| ProbeError::Tls(format!("handshake with {}:{} timed out", host, port)))?
}

async fn inspect_inner(host: &str, port: u16) -> Result<TlsInfo, ProbeError> {
    let verifier = ObservingVerifier::new()?;

    let config = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(verifier.clone())
        .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| ProbeError::Tls(format!("invalid server name {}: {}", host, e)))?;

    let tcp = TcpStream::connect((host, port))
        .await
        .map_err(|e| ProbeError::Tls(format!("connect {}:{}: {}", host, port, e)))?;

    let connector = TlsConnector::from(Arc::new(config));
    let stream = connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| ProbeError::Tls(format!("handshake with {}:{}: {}", host, port, e)))?;

    let (_, connection) = stream.get_ref();

    let version = connection.protocol_version().map(version_label);
    let cipher = connection
        .negotiated_cipher_suite()
        .map(|suite| format!("{:?}", suite.suite()));

    let mut info = TlsInfo {
        version,
        cipher,
        ..TlsInfo::default()
    };

    let verify_error = verifier.take_verdict();

    if let Some(certs) = connection.peer_certificates() {
        if let Some(leaf) = certs.first() {
            if let Ok((_, cert)) = parse_x509_certificate(leaf.as_ref()) {
                let validity = cert.validity();
                let not_before = DateTime::from_timestamp(validity.not_before.timestamp(), 0);
                let not_after = DateTime::from_timestamp(validity.not_after.timestamp(), 0);
                info.expiry = not_after;
                info.issuer = Some(cert.issuer().to_string());
                info.message = advisory_message(
                    not_before,
                    not_after,
                    info.issuer.as_deref(),
                    verify_error.as_ref(),
                    Utc::now(),
                );
                return Ok(info);
            }
        }
    }

    info.message = verify_error.map(|e| format!("certificate chain not trusted: {}", e));
    Ok(info)
}

/// Certificate advisory, in decreasing priority: not yet valid, expired,
/// chain unverified. None when the certificate checks out.
fn advisory_message(
    not_before: Option<DateTime<Utc>>,
    not_after: Option<DateTime<Utc>>,
    issuer: Option<&str>,
    verify_error: Option<&rustls::Error>,
    now: DateTime<Utc>,
) -> Option<String> {
    let issued_by = issuer
        .map(|i| format!(" (issued by {})", i))
        .unwrap_or_default();

    if let Some(nb) = not_before {
        if nb > now {
            return Some(format!(
                "certificate is not valid before {}{}",
                nb.to_rfc3339(),
                issued_by
            ));
        }
    }

    if let Some(na) = not_after {
        if na < now {
            return Some(format!(
                "certificate expired at {}{}",
                na.to_rfc3339(),
                issued_by
            ));
        }
    }

    verify_error.map(|e| format!("certificate chain not trusted: {}", e))
}

fn version_label(version: rustls::ProtocolVersion) -> String {
    match version {
        rustls::ProtocolVersion::TLSv1_2 => "TLS 1.2".to_string(),
        rustls::ProtocolVersion::TLSv1_3 => "TLS 1.3".to_string(),
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_valid_certificate_has_no_advisory() {
        let msg = advisory_message(
            Some(now() - Duration::days(30)),
            Some(now() + Duration::days(30)),
            Some("CN=Test CA"),
            None,
            now(),
        );
        assert_eq!(msg, None);
    }

    #[test]
    fn test_not_yet_valid_takes_priority() {
        let err = rustls::Error::General("unknown issuer".to_string());
        let msg = advisory_message(
            Some(now() + Duration::days(1)),
            Some(now() - Duration::days(1)),
            None,
            Some(&err),
            now(),
        )
        .unwrap();
        assert!(msg.contains("not valid before"));
    }

    #[test]
    fn test_expired_beats_untrusted_chain() {
        let err = rustls::Error::General("unknown issuer".to_string());
        let msg = advisory_message(
            Some(now() - Duration::days(60)),
            Some(now() - Duration::days(1)),
            Some("CN=Old CA"),
            Some(&err),
            now(),
        )
        .unwrap();
        assert!(msg.contains("expired"));
        assert!(msg.contains("CN=Old CA"));
    }

    #[test]
    fn test_untrusted_chain_reported_last() {
        let err = rustls::Error::General("unknown issuer".to_string());
        let msg = advisory_message(
            Some(now() - Duration::days(1)),
            Some(now() + Duration::days(1)),
            None,
            Some(&err),
            now(),
        )
        .unwrap();
        assert!(msg.contains("not trusted"));
    }

    #[test]
    fn test_version_label() {
        assert_eq!(version_label(rustls::ProtocolVersion::TLSv1_3), "TLS 1.3");
        assert_eq!(version_label(rustls::ProtocolVersion::TLSv1_2), "TLS 1.2");
    }
}
