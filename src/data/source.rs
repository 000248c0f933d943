use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use super::Dataset;
use crate::logging::{log_dataset_loaded, v_str, ProfileScope};
use crate::state::Config;

/// Where the raw CSV bytes come from.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    fn origin(&self) -> String;
    async fn fetch(&self) -> Result<Vec<u8>>;
}

pub struct HttpSource {
    client: Client,
    url: Url,
}

impl HttpSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("invalid dataset url {}", url))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    fn origin(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("fetching {}", self.url))?
            .error_for_status()
            .with_context(|| format!("fetching {}", self.url))?;
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("reading body of {}", self.url))?;
        Ok(body.to_vec())
    }
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DatasetSource for FileSource {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))
    }
}

/// A local path wins over the remote url.
pub fn source_from_config(cfg: &Config) -> Result<Box<dyn DatasetSource>> {
    match &cfg.dataset_path {
        Some(path) => Ok(Box::new(FileSource::new(path.clone()))),
        None => Ok(Box::new(HttpSource::new(
            &cfg.dataset_url,
            Duration::from_secs(cfg.fetch_timeout_secs),
        )?)),
    }
}

/// Fetch and parse once. Any failure here is fatal to startup.
pub async fn load(source: &dyn DatasetSource) -> Result<Dataset> {
    let origin = source.origin();
    let _scope = ProfileScope::with_context("dataset_load", &[("origin", v_str(&origin))]);
    let bytes = source.fetch().await?;
    let dataset = Dataset::from_csv_bytes(&origin, &bytes)?;
    let manifest = dataset.manifest();
    log_dataset_loaded(
        &manifest.origin,
        manifest.row_count,
        &manifest.columns,
        &manifest.hash_sha256,
    );
    Ok(dataset)
}
