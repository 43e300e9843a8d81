use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    error::{Result, TriageError},
    matcher::parse_keyword_dataset,
    model::{DiseaseDefinition, KeywordEntry},
};

/// Where keyword data and disease definitions come from.
#[async_trait]
pub trait DiseaseSource: Send + Sync {
    /// The keyword dataset, in dataset order.
    async fn keywords(&self) -> Result<Vec<KeywordEntry>>;

    /// The definition for one disease.
    async fn disease(&self, disease_id: &str) -> Result<DiseaseDefinition>;
}

/// Disease ids double as file names, so only a conservative alphabet is accepted.
pub fn is_valid_disease_id(disease_id: &str) -> bool {
    !disease_id.is_empty()
        && disease_id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Reads `metadata/keywords.json` and `diseases/<id>.json` below a data directory.
#[derive(Debug, Clone)]
pub struct FsDiseaseSource {
    root: PathBuf,
}

impl FsDiseaseSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn keywords_path(&self) -> PathBuf {
        self.root.join("metadata").join("keywords.json")
    }

    pub fn disease_path(&self, disease_id: &str) -> PathBuf {
        self.root.join("diseases").join(format!("{disease_id}.json"))
    }
}

async fn read_to_string(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        TriageError::DataUnavailable(format!("failed to read {}: {e}", path.display()))
    })
}

#[async_trait]
impl DiseaseSource for FsDiseaseSource {
    async fn keywords(&self) -> Result<Vec<KeywordEntry>> {
        let path = self.keywords_path();
        info!(path = %path.display(), "loading keywords");
        let raw = read_to_string(&path).await?;
        parse_keyword_dataset(&raw).map_err(|e| {
            TriageError::DataUnavailable(format!("invalid keyword dataset {}: {e}", path.display()))
        })
    }

    async fn disease(&self, disease_id: &str) -> Result<DiseaseDefinition> {
        if !is_valid_disease_id(disease_id) {
            return Err(TriageError::DataUnavailable(format!(
                "unsupported disease id: {disease_id:?}"
            )));
        }
        let path = self.disease_path(disease_id);
        debug!(path = %path.display(), "loading disease definition");
        let raw = read_to_string(&path).await?;
        serde_json::from_str(&raw).map_err(|e| {
            TriageError::DataUnavailable(format!("invalid disease file {}: {e}", path.display()))
        })
    }
}

/// Keeps keywords and definitions in memory.
#[derive(Default, Clone)]
pub struct InMemoryDiseaseSource {
    keywords: Vec<KeywordEntry>,
    diseases: Arc<DashMap<String, DiseaseDefinition>>,
}

impl InMemoryDiseaseSource {
    pub fn new(keywords: Vec<KeywordEntry>) -> Self {
        Self {
            keywords,
            diseases: Arc::new(DashMap::new()),
        }
    }

    pub fn with_disease(self, disease_id: impl Into<String>, disease: DiseaseDefinition) -> Self {
        self.insert(disease_id, disease);
        self
    }

    pub fn insert(&self, disease_id: impl Into<String>, disease: DiseaseDefinition) {
        self.diseases.insert(disease_id.into(), disease);
    }
}

#[async_trait]
impl DiseaseSource for InMemoryDiseaseSource {
    async fn keywords(&self) -> Result<Vec<KeywordEntry>> {
        Ok(self.keywords.clone())
    }

    async fn disease(&self, disease_id: &str) -> Result<DiseaseDefinition> {
        self.diseases
            .get(disease_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| TriageError::DataUnavailable(format!("no definition for {disease_id}")))
    }
}

/// Fetches the same layout as [`FsDiseaseSource`] over HTTP.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpDiseaseSource {
    base_url: String,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpDiseaseSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch(&self, path: &str) -> Result<String> {
        let url = format!("{}/{path}", self.base_url);
        debug!(url = %url, "fetching triage data");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TriageError::DataUnavailable(format!("GET {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(TriageError::DataUnavailable(format!(
                "GET {url}: HTTP {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| TriageError::DataUnavailable(format!("GET {url}: {e}")))
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl DiseaseSource for HttpDiseaseSource {
    async fn keywords(&self) -> Result<Vec<KeywordEntry>> {
        let raw = self.fetch("metadata/keywords.json").await?;
        parse_keyword_dataset(&raw)
            .map_err(|e| TriageError::DataUnavailable(format!("invalid keyword dataset: {e}")))
    }

    async fn disease(&self, disease_id: &str) -> Result<DiseaseDefinition> {
        if !is_valid_disease_id(disease_id) {
            return Err(TriageError::DataUnavailable(format!(
                "unsupported disease id: {disease_id:?}"
            )));
        }
        let raw = self.fetch(&format!("diseases/{disease_id}.json")).await?;
        serde_json::from_str(&raw).map_err(|e| {
            TriageError::DataUnavailable(format!("invalid definition for {disease_id}: {e}"))
        })
    }
}
