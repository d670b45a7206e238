//! Configuration types for a transform run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for a transform run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Configuration version
    pub version: String,
    /// Global settings
    pub settings: Settings,
    /// XML files to process, in order
    pub files: Vec<PathBuf>,
    /// Directory where transformed documents are written (created if missing)
    pub output_dir: PathBuf,
    /// Rename rules: tags whose `name` attribute is replaced with a
    /// prefix + per-document counter value
    pub rename: Vec<RenameRule>,
    /// Tags whose `name` attribute is removed
    pub delete: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            settings: Settings::default(),
            files: vec![],
            output_dir: PathBuf::from("output"),
            rename: vec![],
            delete: vec![],
        }
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// First value assigned by each per-tag counter
    pub start_counter: u64,
    /// Create the `name` attribute on rename-rule tags that lack one,
    /// instead of recording a warning
    pub add_missing_name: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_counter: 1,
            add_missing_name: false,
        }
    }
}

/// A rename rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRule {
    /// Tag name to match
    pub tag: String,
    /// Prefix for synthesized `name` values (`prefix` + counter)
    pub prefix: String,
}
