use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const BRIEF_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

#[derive(Debug, Error)]
pub enum BriefError {
    #[error("failed to read brief {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid brief {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductSpec {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl ProductSpec {
    pub fn name(&self) -> &str {
        match self {
            ProductSpec::Name(name) => name,
            ProductSpec::Detailed { name, .. } => name,
        }
    }
}

fn default_aspect_ratios() -> Vec<String> {
    vec!["1:1".to_string(), "9:16".to_string(), "16:9".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignBrief {
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductSpec>,
    #[serde(default = "default_aspect_ratios")]
    pub aspect_ratios: Vec<String>,
    #[serde(default)]
    pub target_region: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub campaign_message: Option<String>,
}

impl CampaignBrief {
    pub fn expected_variants(&self) -> u32 {
        (self.products.len() * self.aspect_ratios.len()) as u32
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Self, BriefError> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let brief: CampaignBrief = if is_json {
            serde_json::from_str(raw).map_err(|source| BriefError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_yaml::from_str(raw).map_err(|source| BriefError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        };
        brief.validate(path)?;
        Ok(brief)
    }

    fn validate(&self, path: &Path) -> Result<(), BriefError> {
        if self.products.is_empty() {
            return Err(BriefError::Invalid {
                path: path.to_path_buf(),
                reason: "brief lists no products".to_string(),
            });
        }
        if let Some(blank) = self.products.iter().find(|p| p.name().trim().is_empty()) {
            return Err(BriefError::Invalid {
                path: path.to_path_buf(),
                reason: format!("product with empty name: {:?}", blank),
            });
        }
        if self.aspect_ratios.is_empty() {
            return Err(BriefError::Invalid {
                path: path.to_path_buf(),
                reason: "brief lists no aspect ratios".to_string(),
            });
        }
        Ok(())
    }
}

/// One unseen brief file. Parsing fails per item, never for the whole scan.
#[derive(Debug)]
pub struct DiscoveredBrief {
    pub campaign_id: String,
    pub path: PathBuf,
    pub parsed: Result<CampaignBrief, BriefError>,
}

#[async_trait]
pub trait BriefSource: Send + Sync {
    /// Lists briefs whose id is not in `known`.
    async fn list_new_briefs(&self, known: &HashSet<String>) -> Result<Vec<DiscoveredBrief>>;
}

/// Watches a directory of `*.yaml`, `*.yml` and `*.json` briefs. The campaign id is
/// the file stem.
pub struct FsBriefSource {
    dir: PathBuf,
}

impl FsBriefSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

pub fn campaign_id_for(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if !BRIEF_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl BriefSource for FsBriefSource {
    async fn list_new_briefs(&self, known: &HashSet<String>) -> Result<Vec<DiscoveredBrief>> {
        if !self.dir.exists() {
            debug!("Brief directory {} does not exist yet", self.dir.display());
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut found = Vec::new();
        for path in paths {
            let Some(campaign_id) = campaign_id_for(&path) else {
                continue;
            };
            if known.contains(&campaign_id) {
                continue;
            }
            let parsed = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => CampaignBrief::parse(&path, &raw),
                Err(source) => Err(BriefError::Io {
                    path: path.clone(),
                    source,
                }),
            };
            found.push(DiscoveredBrief {
                campaign_id,
                path,
                parsed,
            });
        }
        Ok(found)
    }
}
