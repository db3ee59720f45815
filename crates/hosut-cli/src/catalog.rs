//! Loading the course catalog from a local file or an HTTP URL.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, anyhow};
use hosut_core::catalog::Catalog;
use reqwest::Client;

/// Where the catalog JSON lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
  File(PathBuf),
  Http(String),
}

impl CatalogSource {
  /// `http://` and `https://` locations are fetched; anything else is a path.
  pub fn parse(location: &str) -> Self {
    if location.starts_with("http://") || location.starts_with("https://") {
      Self::Http(location.to_owned())
    } else {
      Self::File(PathBuf::from(location))
    }
  }

  pub async fn load(&self) -> Result<Catalog> {
    let json = match self {
      Self::File(path) => tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading catalog {}", path.display()))?,
      Self::Http(url) => fetch(url).await?,
    };
    Catalog::from_json(&json).context("Unable to load course data")
  }
}

async fn fetch(url: &str) -> Result<String> {
  let client = Client::builder()
    .timeout(Duration::from_secs(30))
    .build()
    .context("failed to build HTTP client")?;

  let resp = client
    .get(url)
    .send()
    .await
    .with_context(|| format!("GET {url} failed"))?;

  if !resp.status().is_success() {
    return Err(anyhow!("GET {url} → {}", resp.status()));
  }
  resp.text().await.context("reading catalog body")
}
