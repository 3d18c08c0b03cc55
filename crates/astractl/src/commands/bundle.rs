//! Secure connect bundle download

use std::path::Path;

use astractl_core::{AuthenticatedClient, BundleKind, BundleUrls};
use tracing::debug;

use crate::error::{AstraCtlError, Result as CliResult};

/// Download the selected bundle to `location`, returning the bytes written
pub async fn save_bundle(
    client: &AuthenticatedClient,
    urls: &BundleUrls,
    kind: BundleKind,
    location: &str,
) -> CliResult<u64> {
    let bytes = client.download_bundle(urls, kind).await?;
    debug!("Downloaded {} byte {:?} bundle", bytes.len(), kind);

    let path = Path::new(location);
    std::fs::write(path, &bytes).map_err(|e| AstraCtlError::FileError {
        path: location.to_string(),
        message: e.to_string(),
    })?;
    Ok(bytes.len() as u64)
}

/// Every bundle URL, one per line
pub fn listing(urls: &BundleUrls) -> String {
    format!(
        "external bundle: {}\ninternal bundle: {}\nexternal proxy: {}\ninternal proxy: {}\n",
        urls.download_url,
        urls.download_url_internal,
        urls.download_url_migration_proxy,
        urls.download_url_migration_proxy_internal
    )
}
