//! Out-of-band checks of what is actually on the server.

use crate::error::{Result, UploadError};
use reqwest::{Client, StatusCode, header};
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Reports the size of a published file
pub trait RemoteSizeProbe {
    /// `Ok(None)` when the file does not exist
    fn remote_size(&self, url: &str) -> impl Future<Output = Result<Option<u64>>>;
}

/// Probe using HTTP `HEAD` (and local metadata for `file://` URLs)
#[derive(Debug, Clone)]
pub struct HttpSizeProbe {
    client: Client,
}

impl HttpSizeProbe {
    /// Create a probe with a request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::ProbeFailed {
                url: String::new(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

fn probe_error(url: &str, reason: impl std::fmt::Display) -> UploadError {
    UploadError::ProbeFailed {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

impl RemoteSizeProbe for HttpSizeProbe {
    async fn remote_size(&self, url: &str) -> Result<Option<u64>> {
        let parsed = Url::parse(url).map_err(|e| probe_error(url, e))?;

        if parsed.scheme() == "file" {
            let path = parsed
                .to_file_path()
                .map_err(|_| probe_error(url, "not a local path"))?;
            return match std::fs::metadata(&path) {
                Ok(meta) => Ok(Some(meta.len())),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(probe_error(url, e).into()),
            };
        }

        let response = self
            .client
            .head(parsed)
            .send()
            .await
            .map_err(|e| probe_error(url, e))?;

        if response.status() == StatusCode::NOT_FOUND || response.status() == StatusCode::GONE {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(probe_error(url, format!("HTTP {}", response.status())).into());
        }

        let length = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| probe_error(url, "no Content-Length in response"))?;
        Ok(Some(length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_url_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tar.gz");
        std::fs::write(&path, b"12345").unwrap();
        let probe = HttpSizeProbe::new(Duration::from_secs(5)).unwrap();

        let url = Url::from_file_path(&path).unwrap();
        assert_eq!(probe.remote_size(url.as_str()).await.unwrap(), Some(5));

        let missing = Url::from_file_path(dir.path().join("nope")).unwrap();
        assert_eq!(probe.remote_size(missing.as_str()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unparseable_url_is_probe_failure() {
        let probe = HttpSizeProbe::new(Duration::from_secs(5)).unwrap();
        assert!(probe.remote_size("not a url").await.is_err());
    }
}
