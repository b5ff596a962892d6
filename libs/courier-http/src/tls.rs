//! TLS setup for the hyper connector.

use std::sync::Arc;

use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;

use crate::config::TransportSecurity;
use crate::error::BuildError;

/// Get the crypto provider for TLS connections.
///
/// Uses the process-wide default provider when one is installed, otherwise
/// creates an aws-lc-rs provider without installing it globally.
pub fn get_crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// Build an HTTPS connector trusting Mozilla's root certificates.
///
/// Plain `http://` connections are only possible with
/// [`TransportSecurity::AllowInsecureHttp`].
///
/// # Errors
///
/// Returns [`BuildError::Tls`] if the crypto provider rejects the default
/// protocol versions.
pub fn build_https_connector(
    security: TransportSecurity,
) -> Result<HttpsConnector<HttpConnector>, BuildError> {
    let builder = hyper_rustls::HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(get_crypto_provider())
        .map_err(|e| BuildError::Tls(Box::new(e)))?;

    let connector = match security {
        TransportSecurity::AllowInsecureHttp => {
            builder.https_or_http().enable_all_versions().build()
        }
        TransportSecurity::TlsOnly => builder.https_only().enable_all_versions().build(),
    };
    Ok(connector)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_connector_builds_for_both_modes() {
        assert!(build_https_connector(TransportSecurity::TlsOnly).is_ok());
        assert!(build_https_connector(TransportSecurity::AllowInsecureHttp).is_ok());
    }
}
