use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_ARTIFACT, DEFAULT_CONFIG_FILE};
use crate::error::{EtlError, Result};
use crate::pipeline::processing::fact::JoinPolicy;

/// Everything a pipeline run needs, passed explicitly to each stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub commercial: CommercialConfig,
    pub musical: MusicalConfig,
    pub etl: EtlConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the `Comercial` and `Musical` source folders
    pub source_root: PathBuf,
    pub curated_dir: PathBuf,
    pub database: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("Exercicios"),
            curated_dir: PathBuf::from("curated_data"),
            database: PathBuf::from("analytics.db"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommercialConfig {
    pub dir: String,
    pub stores: String,
    pub consultants: String,
    pub targets: String,
    /// Sales files, concatenated in this order
    pub sales: Vec<String>,
}

impl Default for CommercialConfig {
    fn default() -> Self {
        Self {
            dir: "Comercial".to_string(),
            stores: "Lojas.xlsx".to_string(),
            consultants: "Consultores.xlsx".to_string(),
            targets: "Metas.xlsx".to_string(),
            sales: vec!["Vendas.xlsx".to_string(), "Vendas_2T.xlsx".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicalConfig {
    pub dir: String,
    pub tracks: String,
    /// Substring stripped from column names and text cells
    pub artifact: String,
}

impl Default for MusicalConfig {
    fn default() -> Self {
        Self {
            dir: "Musical".to_string(),
            tracks: "Music Test.csv".to_string(),
            artifact: DEFAULT_ARTIFACT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub join_policy: JoinPolicy,
    /// Candidate encodings for delimited text, tried in order
    pub encodings: Vec<String>,
    pub delimiter: char,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            join_policy: JoinPolicy::default(),
            encodings: vec!["utf-8".to_string(), "latin1".to_string()],
            delimiter: ',',
        }
    }
}

/// Values given on the command line. Each one that is set replaces the
/// value from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_root: Option<PathBuf>,
    pub curated_dir: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub join_policy: Option<JoinPolicy>,
}

impl Config {
    /// Loads `path` if given, else `etl.toml` in the working directory if it
    /// exists, else the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, Path::new("."))
    }

    /// Like [`Config::load`], looking for the default file in `working_dir`
    pub fn load_from(path: Option<&Path>, working_dir: &Path) -> Result<Self> {
        let discovered = working_dir.join(DEFAULT_CONFIG_FILE);
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None if discovered.exists() => Self::from_file(&discovered)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(root) = &overrides.source_root {
            self.paths.source_root = root.clone();
        }
        if let Some(dir) = &overrides.curated_dir {
            self.paths.curated_dir = dir.clone();
        }
        if let Some(db) = &overrides.database {
            self.paths.database = db.clone();
        }
        if let Some(policy) = overrides.join_policy {
            self.etl.join_policy = policy;
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.etl.encodings.is_empty() {
            return Err(EtlError::Config(
                "at least one candidate encoding is required".to_string(),
            ));
        }
        for label in &self.etl.encodings {
            if encoding_rs::Encoding::for_label(label.as_bytes()).is_none() {
                return Err(EtlError::Config(format!("unknown encoding '{label}'")));
            }
        }
        if !self.etl.delimiter.is_ascii() {
            return Err(EtlError::Config(format!(
                "delimiter '{}' must be a single ASCII character",
                self.etl.delimiter
            )));
        }
        if self.commercial.sales.is_empty() {
            return Err(EtlError::Config(
                "commercial.sales must list at least one file".to_string(),
            ));
        }
        Ok(())
    }

    pub fn commercial_path(&self, file: &str) -> PathBuf {
        self.paths
            .source_root
            .join(&self.commercial.dir)
            .join(file)
    }

    pub fn musical_path(&self, file: &str) -> PathBuf {
        self.paths.source_root.join(&self.musical.dir).join(file)
    }

    /// The configuration as TOML, for `show-config`
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EtlError::Config(e.to_string()))
    }
}
