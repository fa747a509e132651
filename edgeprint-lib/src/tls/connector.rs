use std::sync::Arc;

use rustls_pki_types::ServerName;
use tokio_rustls::rustls::crypto::aws_lc_rs;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::error::{EdgeprintError, Result};
use crate::tls::verifier::AcceptAnyCert;

/// Builds a client-side TLS connector
///
/// With `accept_invalid_certs` every certificate is accepted; otherwise the
/// chain is checked against the bundled Mozilla roots.
pub fn build_connector(accept_invalid_certs: bool) -> Result<TlsConnector> {
    let provider = Arc::new(aws_lc_rs::default_provider());

    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| EdgeprintError::Tls(format!("Failed to select TLS versions: {e}")))?;

    let config = if accept_invalid_certs {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCert::new(provider)))
            .with_no_client_auth()
    } else {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

/// SNI for `host`; IP literals are accepted and sent without SNI by rustls.
pub fn server_name(host: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|e| EdgeprintError::Tls(format!("Invalid server name '{host}': {e}")))
}
