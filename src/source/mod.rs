// src/source/mod.rs
use crate::utils::error::SourceError;
use reqwest::header;
use std::path::Path;

const USER_AGENT: &str = concat!("promob-extractor/", env!("CARGO_PKG_VERSION"));

/// Creates a reqwest client for fetching remote exports.
fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
}

pub fn is_remote(location: &str) -> bool {
    let lower = location.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Loads an export from a local path or an `http(s)://` URL.
pub async fn load_document(location: &str) -> Result<String, SourceError> {
    if is_remote(location) {
        download_document(location.trim()).await
    } else {
        read_document(location).await
    }
}

pub async fn read_document<P: AsRef<Path>>(path: P) -> Result<String, SourceError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(String::from_utf8(bytes)?)
}

/// Downloads an export; the body must be UTF-8.
pub async fn download_document(url: &str) -> Result<String, SourceError> {
    let client = build_client()?;

    tracing::info!("Downloading document from: {}", url);

    let response = client
        .get(url)
        .header(header::ACCEPT, "application/xml,text/xml,*/*")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!("HTTP error status: {} for URL: {}", status, url);
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url.to_string()));
        }
        return Err(SourceError::Http(status));
    }

    let body = response.bytes().await?;
    tracing::debug!("Successfully downloaded {} bytes from {}", body.len(), url);

    Ok(String::from_utf8(body.to_vec())?)
}
