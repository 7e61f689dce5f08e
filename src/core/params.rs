use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{IdEncoding, Resolution};

/// Header block shared by every site of one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteMetadata {
    pub author: String,
    pub email: String,
    /// Document date; today's date (`YYYY-MM-DD`) when unset
    pub date: Option<String>,
    pub dataset: String,
    pub version: String,
    pub source: String,
}

impl Default for SiteMetadata {
    fn default() -> Self {
        Self {
            author: String::new(),
            email: String::new(),
            date: None,
            dataset: "ISRIC-WISE".to_string(),
            version: "0.1".to_string(),
            source: "ISRIC-WISE derived soil properties".to_string(),
        }
    }
}

impl SiteMetadata {
    pub fn date_or_today(&self) -> String {
        self.date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string())
    }
}

/// Site generation parameters suitable for config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteParams {
    #[serde(flatten)]
    pub metadata: SiteMetadata,
    pub resolution: Resolution,
    pub id_encoding: IdEncoding,
    /// Characters of the geohash behind a geohash id
    pub geohash_precision: usize,
    /// Split the top layer into a 20 mm band and the remainder
    pub extra_split: bool,
    /// Cells per build chunk; does not affect the output
    pub chunk_size: usize,
    /// `usehistory` written into every soil block
    pub use_history: String,
}

impl Default for SiteParams {
    fn default() -> Self {
        Self {
            metadata: SiteMetadata::default(),
            resolution: Resolution::Lr,
            id_encoding: IdEncoding::Geohash,
            geohash_precision: 6,
            extra_split: false,
            chunk_size: 200,
            use_history: "arable".to_string(),
        }
    }
}

impl SiteParams {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn store(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// `$HOME/.ldndctools/dlsc.json`
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".ldndctools").join("dlsc.json"))
    }
}
