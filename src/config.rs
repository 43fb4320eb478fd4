use std::fs;
use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AvhrrError;

pub const DEFAULT_CATALOGUE_URL: &str =
    "ftp://eogrid.esrin.esa.int/Catalogue/Noaa_catalogue_1_1.tgz";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub catalogue_url: Option<String>,
    #[serde(default)]
    pub catalogue_dir_name: Option<String>,
    #[serde(default)]
    pub archive_extensions: Option<Vec<String>>,
    #[serde(default)]
    pub level_patterns: Option<Vec<String>>,
    #[serde(default)]
    pub metadata_files: Option<Vec<String>>,
    #[serde(default)]
    pub product_markers: Option<Vec<String>>,
}

/// Resolver settings with defaults applied and level patterns compiled.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub catalogue_url: String,
    pub catalogue_dir_name: String,
    pub archive_extensions: Vec<String>,
    pub level_patterns: Vec<Regex>,
    pub metadata_files: Vec<String>,
    pub product_markers: Vec<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        // The default patterns are literals known to compile.
        ConfigLoader::resolve_config(Config::default())
            .unwrap_or_else(|err| panic!("default configuration is invalid: {err}"))
    }
}

impl ResolvedConfig {
    /// Returns the configured archive extension `name` ends with, longest first.
    pub fn archive_extension<'a>(&'a self, name: &str) -> Option<&'a str> {
        self.archive_extensions
            .iter()
            .filter(|ext| name.ends_with(ext.as_str()))
            .max_by_key(|ext| ext.len())
            .map(String::as_str)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, AvhrrError> {
        let Some(path) = path else {
            return Self::resolve_config(Config::default());
        };
        let config_path = PathBuf::from(path);
        let content = fs::read_to_string(&config_path)
            .map_err(|_| AvhrrError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| AvhrrError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, AvhrrError> {
        let level_patterns = config
            .level_patterns
            .unwrap_or_else(default_level_patterns)
            .into_iter()
            .map(|pattern| {
                Regex::new(&pattern).map_err(|err| AvhrrError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>, AvhrrError>>()?;

        Ok(ResolvedConfig {
            catalogue_url: config
                .catalogue_url
                .unwrap_or_else(|| DEFAULT_CATALOGUE_URL.to_string()),
            catalogue_dir_name: config
                .catalogue_dir_name
                .unwrap_or_else(|| "NOAA_sat_mtd".to_string()),
            archive_extensions: config
                .archive_extensions
                .unwrap_or_else(default_archive_extensions),
            level_patterns,
            metadata_files: config.metadata_files.unwrap_or_else(default_metadata_files),
            product_markers: config
                .product_markers
                .unwrap_or_else(default_product_markers),
        })
    }
}

pub fn default_archive_extensions() -> Vec<String> {
    vec![
        ".tar".to_string(),
        ".tgz".to_string(),
        ".tar.gz".to_string(),
        ".zip".to_string(),
    ]
}

pub fn default_level_patterns() -> Vec<String> {
    vec![r"LEVEL [0-1][AB_]".to_string(), r"L[0-1][AB_]".to_string()]
}

pub fn default_metadata_files() -> Vec<String> {
    vec![
        "catalogue.ief".to_string(),
        "catalogue.iuf".to_string(),
        "LEADER".to_string(),
    ]
}

pub fn default_product_markers() -> Vec<String> {
    vec![".l1a".to_string(), "IMAGE".to_string(), ".dat".to_string()]
}
