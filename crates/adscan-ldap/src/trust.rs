//! Certificate trust override.
//!
//! The platform trust store is always tried first. A
//! [`CertificateTrustPolicy`] only comes into play when that validation
//! fails and the connection configuration allows a bypass.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, CertificateError, ClientConfig, ServerName};

/// Decides whether to accept a server certificate that failed validation.
pub trait CertificateTrustPolicy: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Returns `true` to accept the DER-encoded end-entity certificate.
    fn accept(&self, certificate_der: &[u8]) -> bool;
}

/// Accepts any certificate that carries raw data.
///
/// This is a debugging bypass: the certificate chain, host name and
/// validity period are not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptPresentCertificate;

impl CertificateTrustPolicy for AcceptPresentCertificate {
    fn name(&self) -> &'static str {
        "accept-present-certificate"
    }

    fn accept(&self, certificate_der: &[u8]) -> bool {
        if certificate_der.is_empty() {
            return false;
        }
        tracing::warn!(
            certificate_bytes = certificate_der.len(),
            "Accepting server certificate without validation"
        );
        true
    }
}

/// Rejects every certificate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

impl CertificateTrustPolicy for RejectAll {
    fn name(&self) -> &'static str {
        "reject-all"
    }

    fn accept(&self, _certificate_der: &[u8]) -> bool {
        false
    }
}

/// rustls verifier delegating to a [`CertificateTrustPolicy`].
pub struct PolicyVerifier {
    policy: Arc<dyn CertificateTrustPolicy>,
}

impl PolicyVerifier {
    /// Wraps a policy.
    #[must_use]
    pub fn new(policy: Arc<dyn CertificateTrustPolicy>) -> Self {
        Self { policy }
    }
}

impl fmt::Debug for PolicyVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyVerifier")
            .field("policy", &self.policy.name())
            .finish()
    }
}

impl ServerCertVerifier for PolicyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &Certificate,
        _intermediates: &[Certificate],
        server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if self.policy.accept(&end_entity.0) {
            tracing::debug!(
                policy = self.policy.name(),
                server = ?server_name,
                "Certificate accepted by trust policy"
            );
            Ok(ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ))
        }
    }
}

/// Builds a TLS client configuration that defers to `policy`.
#[must_use]
pub fn client_config(policy: Arc<dyn CertificateTrustPolicy>) -> Arc<ClientConfig> {
    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_custom_certificate_verifier(Arc::new(PolicyVerifier::new(policy)))
        .with_no_client_auth();
    Arc::new(config)
}
