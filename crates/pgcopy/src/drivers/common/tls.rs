//! TLS setup for PostgreSQL connections.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{info, warn};

use crate::error::{Result, SyncError};

/// PostgreSQL `sslmode` values supported for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Plain TCP.
    #[default]
    Disable,
    /// Encrypt, but accept any server certificate.
    Require,
    /// Verify the certificate chain, ignore the host name.
    VerifyCa,
    /// Verify the certificate chain and the host name.
    VerifyFull,
}

impl SslMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disable" | "" => Ok(SslMode::Disable),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(SyncError::Config(format!(
                "Invalid ssl_mode '{}'. Valid values: disable, require, verify-ca, verify-full",
                other
            ))),
        }
    }

    pub fn requires_tls(&self) -> bool {
        !matches!(self, SslMode::Disable)
    }
}

/// Builds the rustls connector for one side.
pub struct TlsBuilder {
    ssl_mode: SslMode,
    provider: Arc<CryptoProvider>,
}

impl TlsBuilder {
    pub fn new(ssl_mode: SslMode) -> Self {
        Self {
            ssl_mode,
            provider: Arc::new(rustls::crypto::ring::default_provider()),
        }
    }

    pub fn parse(ssl_mode: &str) -> Result<Self> {
        Ok(Self::new(SslMode::parse(ssl_mode)?))
    }

    /// Connector for deadpool-postgres, or `None` when TLS is disabled.
    pub fn build(&self) -> Result<Option<MakeRustlsConnect>> {
        if !self.ssl_mode.requires_tls() {
            return Ok(None);
        }
        Ok(Some(MakeRustlsConnect::new(self.client_config()?)))
    }

    fn roots() -> Arc<RootCertStore> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Arc::new(roots)
    }

    fn client_config(&self) -> Result<ClientConfig> {
        let builder = ClientConfig::builder_with_provider(Arc::clone(&self.provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| SyncError::Config(format!("TLS setup failed: {}", e)))?;

        let verifier: Arc<dyn ServerCertVerifier> = match self.ssl_mode {
            SslMode::Disable => {
                return Err(SyncError::Config(
                    "TLS requested with ssl_mode=disable".into(),
                ))
            }
            SslMode::Require => {
                warn!("ssl_mode=require: server certificate is not verified");
                Arc::new(AnyCertificate {
                    provider: Arc::clone(&self.provider),
                })
            }
            SslMode::VerifyCa => {
                info!("ssl_mode=verify-ca: verifying certificate chain");
                Arc::new(ChainOnly {
                    inner: self.webpki_verifier()?,
                })
            }
            SslMode::VerifyFull => {
                info!("ssl_mode=verify-full: verifying certificate chain and host name");
                self.webpki_verifier()?
            }
        };

        Ok(builder
            .dangerous()
            .with_custom_certificate_verifier(verifier)
            .with_no_client_auth())
    }

    fn webpki_verifier(&self) -> Result<Arc<WebPkiServerVerifier>> {
        WebPkiServerVerifier::builder_with_provider(Self::roots(), Arc::clone(&self.provider))
            .build()
            .map_err(|e| SyncError::Config(format!("TLS verifier setup failed: {}", e)))
    }
}

/// Accepts any certificate but still checks handshake signatures.
#[derive(Debug)]
struct AnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Full chain verification that tolerates a host name mismatch.
#[derive(Debug)]
struct ChainOnly {
    inner: Arc<WebPkiServerVerifier>,
}

impl ServerCertVerifier for ChainOnly {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        match self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Err(rustls::Error::InvalidCertificate(CertificateError::NotValidForName)) => {
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
