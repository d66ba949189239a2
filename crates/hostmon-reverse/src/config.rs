use crate::error::ReverseError;
use rustls::{ClientConfig, RootCertStore};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

/// Default broker reverse port when the configured URL does not carry one.
const DEFAULT_BROKER_PORT: u16 = 43191;

/// Configuration surface the reverse client consumes. The agent binary
/// fills this from its own config file.
#[derive(Debug, Clone)]
pub struct ReverseConfig {
    pub enabled: bool,
    /// Check identifier; names the broker-side check this connection serves.
    pub check_id: String,
    /// Broker reverse endpoint, e.g. `mtev_reverse://broker.example.net:43191`.
    /// A URL without a path gets `/check/<check_id>` appended.
    pub broker_url: String,
    /// Broker CA bundle (PEM). System web roots are used when absent.
    pub broker_ca_file: Option<PathBuf>,
    /// Verify the broker certificate. Default true.
    pub ssl_verify: bool,
    /// The local agent listen address the fetcher dials.
    pub listen_address: String,
    /// Consecutive connection failures before giving up; 0 retries forever.
    pub max_conn_retry: u32,
    /// Pre-shared reverse secret. A fragment on `broker_url` takes
    /// precedence.
    pub secret: Option<String>,
}

/// Parsed broker reverse endpoint. The fragment carries the pre-shared
/// secret and never appears in log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseUrl {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub fragment: Option<String>,
}

impl ReverseUrl {
    /// The introduction line written after dial, before the session loop.
    pub fn intro_line(&self) -> String {
        match &self.fragment {
            Some(secret) => format!("REVERSE {}#{} HTTP/1.1\r\n\r\n", self.path, secret),
            None => format!("REVERSE {} HTTP/1.1\r\n\r\n", self.path),
        }
    }
}

impl fmt::Display for ReverseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.host, self.port, self.path)
    }
}

/// Produce the (reverse URL, TLS configuration) pair from the configured
/// oracle values. Configuration errors are terminal; no attempt is made to
/// resolve them.
pub(crate) fn configure(
    cfg: &ReverseConfig,
) -> Result<(ReverseUrl, Arc<ClientConfig>), ReverseError> {
    let parsed = url::Url::parse(&cfg.broker_url).map_err(|e| {
        ReverseError::Config(format!("parsing broker url '{}': {e}", cfg.broker_url))
    })?;

    let host = parsed
        .host_str()
        .ok_or_else(|| {
            ReverseError::Config(format!("broker url '{}' has no host", cfg.broker_url))
        })?
        .to_string();
    let port = parsed.port().unwrap_or(DEFAULT_BROKER_PORT);

    let path = match parsed.path() {
        "" | "/" => {
            if cfg.check_id.is_empty() {
                return Err(ReverseError::Config(
                    "reverse check id is not set".to_string(),
                ));
            }
            format!("/check/{}", cfg.check_id)
        }
        path => path.to_string(),
    };

    let fragment = parsed
        .fragment()
        .map(str::to_string)
        .or_else(|| cfg.secret.clone());

    let tls_config = build_tls_config(cfg)?;

    Ok((
        ReverseUrl {
            host,
            port,
            path,
            fragment,
        },
        Arc::new(tls_config),
    ))
}

/// The agent always answers on loopback; a wildcard bind address is not
/// dialable.
pub(crate) fn agent_address(listen_address: &str) -> String {
    listen_address.replace("0.0.0.0", "localhost")
}

fn build_tls_config(cfg: &ReverseConfig) -> Result<ClientConfig, ReverseError> {
    if !cfg.ssl_verify {
        tracing::warn!("broker certificate verification disabled");
        return Ok(ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification))
            .with_no_client_auth());
    }

    let mut roots = RootCertStore::empty();
    match &cfg.broker_ca_file {
        Some(path) => {
            let file = File::open(path).map_err(|e| {
                ReverseError::Config(format!("opening broker CA file {}: {e}", path.display()))
            })?;
            let mut reader = BufReader::new(file);
            for cert in rustls_pemfile::certs(&mut reader) {
                let cert = cert.map_err(|e| {
                    ReverseError::Config(format!(
                        "reading broker CA file {}: {e}",
                        path.display()
                    ))
                })?;
                roots.add(cert).map_err(|e| {
                    ReverseError::Config(format!("adding broker CA certificate: {e}"))
                })?;
            }
            if roots.is_empty() {
                return Err(ReverseError::Config(format!(
                    "no certificates found in broker CA file {}",
                    path.display()
                )));
            }
        }
        None => roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
    }

    Ok(ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth())
}

/// Accept any broker certificate. Installed only when `ssl_verify = false`.
#[derive(Debug)]
struct SkipServerVerification;

impl rustls::client::danger::ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
