//! Run configuration loaded from TOML
//!
//! Every section is optional; a missing file means all defaults.

use anyhow::Context;
use formfill_core::{ButtonStates, FillOptions};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub template: TemplateConfig,
    pub data: DataConfig,
    pub output: OutputConfig,
    /// Button vocabulary of the template
    pub buttons: ButtonStates,
    pub values: ValuesConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    /// Options handed to the form filler
    pub fn fill_options(&self) -> FillOptions {
        FillOptions {
            form_page: self.template.form_page,
            button_states: self.buttons.clone(),
            ..FillOptions::default()
        }
    }
}

/// Where the template lives and which page holds the form
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Directory holding exactly one template PDF (default: `template`)
    pub dir: PathBuf,
    /// 0-based form page; earlier pages are headers (default: 0)
    pub form_page: usize,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("template"),
            form_page: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory of `*.json` record files, one group per file (default: `data`)
    pub dir: PathBuf,
    /// Field whose value in a group's first record names the group
    pub group_key_field: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            group_key_field: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Prefix of every generated file name
    pub prefix: String,
    /// Directory receiving merged documents (default: `output`)
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            dir: PathBuf::from("output"),
        }
    }
}

/// Adjustments applied to every loaded record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValuesConfig {
    /// Per field: input value (matched case-insensitively) to replacement
    pub overrides: BTreeMap<String, BTreeMap<String, String>>,
    /// Per field: constant assigned to every record
    pub defaults: BTreeMap<String, String>,
    /// Fields that should not be blank
    pub warn_blank: Vec<String>,
}
