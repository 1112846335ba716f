//! Getting bytes from a path or URL.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::Path;

/// Retrieve a whole document by location.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>>;

    /// Fetch and write to `dest`, returning the number of bytes written.
    async fn fetch_to(&self, location: &str, dest: &Path) -> Result<u64> {
        let bytes = self.fetch(location).await?;
        tokio::fs::write(dest, &bytes).await.or_raise(|| ErrorKind::Io(dest.to_path_buf()))?;
        Ok(bytes.len() as u64)
    }
}

pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Local files, with or without a `file://` prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

#[async_trait]
impl Fetch for FileFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let path = location.strip_prefix("file://").unwrap_or(location);
        tokio::fs::read(path).await.or_raise(|| ErrorKind::Fetch(location.to_string()))
    }
}

#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .user_agent(concat!("marquee/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::Fetch("HTTP client".to_string()))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let fail = || ErrorKind::Fetch(location.to_string());
        let response = self
            .client
            .get(location)
            .send()
            .await
            .or_raise(fail)?
            .error_for_status()
            .or_raise(fail)?;
        let bytes = response.bytes().await.or_raise(fail)?;
        tracing::debug!(url = location, bytes = bytes.len(), "Fetched");
        Ok(bytes.to_vec())
    }
}

/// Picks the file or HTTP fetcher by the shape of the location.
#[derive(Debug, Clone)]
pub struct Fetcher {
    #[cfg(feature = "http")]
    http: HttpFetcher,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            #[cfg(feature = "http")]
            http: HttpFetcher::new()?,
        })
    }
}

#[async_trait]
impl Fetch for Fetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if !is_remote(location) {
            return FileFetcher.fetch(location).await;
        }
        #[cfg(feature = "http")]
        {
            self.http.fetch(location).await
        }
        #[cfg(not(feature = "http"))]
        {
            tracing::error!(url = location, "Built without HTTP support");
            exn::bail!(ErrorKind::Fetch(location.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("https://cdn.test/playlist.db", true)]
    #[case("http://localhost:8080/m.json", true)]
    #[case("file:///tmp/m.json", false)]
    #[case("./catalog.json", false)]
    fn test_is_remote(#[case] location: &str, #[case] expected: bool) {
        assert_eq!(is_remote(location), expected);
    }

    #[tokio::test]
    async fn test_file_fetch_and_fetch_to() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("catalog.json");
        std::fs::write(&source, b"{}").unwrap();
        let location = format!("file://{}", source.display());
        assert_eq!(FileFetcher.fetch(&location).await.unwrap(), b"{}");

        let dest = dir.path().join("copy.json");
        assert_eq!(Fetcher::new().unwrap().fetch_to(source.to_str().unwrap(), &dest).await.unwrap(), 2);
        assert_eq!(std::fs::read(dest).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = FileFetcher.fetch("/definitely/not/here.json").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Fetch("/definitely/not/here.json".to_string()));
    }
}
