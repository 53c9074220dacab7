use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

use super::OutputInspector;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    /// First directory under the campaign output root, if the file is nested.
    pub product: Option<String>,
    pub aspect_ratio: Option<String>,
}

/// Generated image files of one campaign, in walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTree {
    pub files: Vec<OutputFile>,
}

impl OutputTree {
    pub fn variant_count(&self) -> u32 {
        self.files.len() as u32
    }

    pub fn products(&self) -> BTreeSet<String> {
        self.files.iter().filter_map(|f| f.product.clone()).collect()
    }

    pub fn aspect_ratios(&self) -> BTreeSet<String> {
        self.files
            .iter()
            .filter_map(|f| f.aspect_ratio.clone())
            .collect()
    }
}

fn ratio_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:^|[^0-9])(\d{1,2})[x_:\-](\d{1,2})(?:[^0-9]|$)").expect("static regex")
    })
}

/// Extracts a `W:H` tag from a filename stem such as `hero_16x9` or `9-16`.
pub fn aspect_ratio_tag(stem: &str) -> Option<String> {
    ratio_pattern()
        .captures(stem)
        .map(|c| format!("{}:{}", &c[1], &c[2]))
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

fn walk(root: &Path) -> Result<OutputTree> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if !entry.file_type().is_file() || !is_image(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let mut components = relative.components();
        let product = if relative.components().count() > 1 {
            components
                .next()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
        } else {
            None
        };
        let aspect_ratio = entry
            .path()
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(aspect_ratio_tag);
        files.push(OutputFile {
            path: entry.path().to_path_buf(),
            product,
            aspect_ratio,
        });
    }
    Ok(OutputTree { files })
}

/// Walks campaign output directories on the blocking pool.
pub struct FsOutputInspector;

#[async_trait]
impl OutputInspector for FsOutputInspector {
    async fn list_output_files(&self, campaign_output_dir: &Path) -> Result<OutputTree> {
        let root = campaign_output_dir.to_path_buf();
        tokio::task::spawn_blocking(move || walk(&root))
            .await
            .context("output walk task panicked")?
    }
}
