use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::catalogue::Catalogue;
use crate::config::ResolvedConfig;
use crate::error::AvhrrError;
use crate::fs_util;

pub trait CatalogueClient: Send + Sync {
    fn download(&self, url: &str, destination: &Path) -> Result<(), AvhrrError>;
}

/// Fetches over HTTP(S); `file://` URLs and bare paths are copied from disk.
#[derive(Clone)]
pub struct CatalogueHttpClient {
    client: Client,
}

impl CatalogueHttpClient {
    pub fn new() -> Result<Self, AvhrrError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("avhrr-mp/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| AvhrrError::FetchFailed(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|err| AvhrrError::FetchFailed(err.to_string()))?;
        Ok(Self { client })
    }

    fn download_http(&self, url: &str, destination: &Path) -> Result<(), AvhrrError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| AvhrrError::FetchFailed(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "catalogue request failed".to_string());
            return Err(AvhrrError::FetchStatus { status, message });
        }
        let temp = staging_file(destination)?;
        let mut file = temp
            .reopen()
            .map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| AvhrrError::FetchFailed(err.to_string()))?;
        temp.persist(destination)
            .map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

impl CatalogueClient for CatalogueHttpClient {
    fn download(&self, url: &str, destination: &Path) -> Result<(), AvhrrError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.download_http(url, destination);
        }
        let source = match url.strip_prefix("file://") {
            Some(path) => PathBuf::from(path),
            None if !url.contains("://") => PathBuf::from(url),
            None => {
                return Err(AvhrrError::FetchFailed(format!("unsupported URL scheme: {url}")));
            }
        };
        fs_util::copy_file_atomic(&source, destination)
            .map_err(|err| AvhrrError::FetchFailed(format!("{}: {err}", source.display())))
    }
}

/// Sibling temp file, so a partial transfer never replaces `destination`.
fn staging_file(destination: &Path) -> Result<NamedTempFile, AvhrrError> {
    let parent = destination
        .parent()
        .ok_or_else(|| AvhrrError::Filesystem("invalid destination path".to_string()))?;
    tempfile::Builder::new()
        .prefix("avhrr-mp-fetch")
        .tempfile_in(parent)
        .map_err(|err| AvhrrError::Filesystem(err.to_string()))
}

/// Archive file name taken from the last URL segment.
pub fn archive_name(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("catalogue.tgz")
        .to_string()
}

/// Makes the extracted catalogue available under `work_dir`. An existing extraction is
/// reused; a failed download falls back to a previously downloaded archive.
pub fn prepare_catalogue(
    client: &dyn CatalogueClient,
    config: &ResolvedConfig,
    work_dir: &Path,
) -> Result<Catalogue, AvhrrError> {
    let catalogue_dir = work_dir.join(&config.catalogue_dir_name);
    if catalogue_dir.is_dir() {
        info!("Using existing catalogue at {}", catalogue_dir.display());
        return Catalogue::open(&catalogue_dir);
    }

    fs::create_dir_all(work_dir).map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
    let archive = work_dir.join(archive_name(&config.catalogue_url));
    info!("Downloading catalogue from {}", config.catalogue_url);
    let staged = staging_file(&archive)?;
    let fetched = match client.download(&config.catalogue_url, staged.path()) {
        Ok(()) => staged
            .persist(&archive)
            .map(|_| ())
            .map_err(|err| AvhrrError::Filesystem(err.to_string())),
        Err(err) => Err(err),
    };
    if let Err(err) = fetched {
        if !archive.is_file() {
            warn!("Catalogue download failed: {err}");
            return Err(match err {
                AvhrrError::FetchFailed(_) => err,
                other => AvhrrError::FetchFailed(other.to_string()),
            });
        }
        warn!(
            "Catalogue download failed ({err}), using local copy {}",
            archive.display()
        );
    }

    fs::create_dir_all(&catalogue_dir).map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
    if let Err(err) = fs_util::extract_archive(&archive, &catalogue_dir) {
        let _ = fs::remove_dir_all(&catalogue_dir);
        return Err(err);
    }
    Catalogue::open(&catalogue_dir)
}
