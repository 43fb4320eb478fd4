use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ResolvedConfig;
use crate::error::AvhrrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Tar,
    TarGz,
    Zip,
}

impl ArchiveKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            ".zip" => ArchiveKind::Zip,
            ".tar" => ArchiveKind::Tar,
            _ => ArchiveKind::TarGz,
        }
    }
}

/// Shape of a product on disk, decided once when the product is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductContainerKind {
    /// A product directory, or the directory holding a bare product file.
    Directory,
    /// A `.SHRK` directory whose image files live in sub-folders.
    ShrkDirectory,
    Archive(ArchiveKind),
}

impl ProductContainerKind {
    pub fn is_archive(&self) -> bool {
        matches!(self, ProductContainerKind::Archive(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductLocation {
    pub input: PathBuf,
    pub path: PathBuf,
    pub kind: ProductContainerKind,
    pub product_id: String,
}

impl ProductLocation {
    pub fn locate(input: &Path, config: &ResolvedConfig) -> Result<Self, AvhrrError> {
        let not_located = || AvhrrError::ProductNotLocated(input.display().to_string());
        if !input.exists() {
            return Err(not_located());
        }
        let name = file_name(input).ok_or_else(not_located)?;

        if input.is_file() {
            if let Some(ext) = config.archive_extension(&name) {
                return Ok(Self {
                    input: input.to_path_buf(),
                    path: input.to_path_buf(),
                    kind: ProductContainerKind::Archive(ArchiveKind::from_extension(ext)),
                    product_id: name[..name.len() - ext.len()].to_string(),
                });
            }
            let parent = input
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .ok_or_else(not_located)?;
            if !dir_has_marker(parent, &config.product_markers) {
                return Err(not_located());
            }
            let product_id = file_name(parent).ok_or_else(not_located)?;
            return Ok(Self {
                input: input.to_path_buf(),
                path: parent.to_path_buf(),
                kind: ProductContainerKind::Directory,
                product_id,
            });
        }

        let kind = if name.ends_with(".SHRK") {
            if !subdirs_have_marker(input, &config.product_markers) {
                return Err(not_located());
            }
            ProductContainerKind::ShrkDirectory
        } else {
            if !dir_has_marker(input, &config.product_markers) {
                return Err(not_located());
            }
            ProductContainerKind::Directory
        };
        Ok(Self {
            input: input.to_path_buf(),
            path: input.to_path_buf(),
            kind,
            product_id: name,
        })
    }

    /// Name of the container on disk, used to suppress duplicate inputs.
    pub fn container_name(&self) -> String {
        file_name(&self.path).unwrap_or_else(|| self.product_id.clone())
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
}

fn dir_has_marker(dir: &Path, markers: &[String]) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let name = entry.file_name().to_string_lossy().to_string();
        markers.iter().any(|marker| name.contains(marker.as_str()))
    })
}

fn subdirs_have_marker(root: &Path, markers: &[String]) -> bool {
    let mut stack = match fs::read_dir(root) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect::<Vec<_>>(),
        Err(_) => return false,
    };
    while let Some(dir) = stack.pop() {
        if dir_has_marker(&dir, markers) {
            return true;
        }
        if let Ok(entries) = fs::read_dir(&dir) {
            stack.extend(
                entries
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|path| path.is_dir()),
            );
        }
    }
    false
}

/// One reference row. Field positions are fixed by the catalogue layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogueRow(Vec<String>);

impl CatalogueRow {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    pub fn field(&self, index: usize) -> &str {
        self.0.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn date(&self) -> &str {
        self.field(1)
    }

    pub fn start_time(&self) -> &str {
        self.field(2)
    }

    pub fn stop_time(&self) -> &str {
        self.field(3)
    }

    pub fn station(&self) -> &str {
        self.field(5)
    }

    pub fn start_orbit(&self) -> &str {
        self.field(6)
    }

    pub fn level(&self) -> &str {
        self.field(7)
    }

    pub fn corners(&self) -> &str {
        self.field(8)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessingLevel(String);

impl ProcessingLevel {
    pub const NOT_AVAILABLE: &'static str = "Not available";

    pub fn not_available() -> Self {
        Self(Self::NOT_AVAILABLE.to_string())
    }

    /// Normalizes an explicit catalogue value to start with `L`.
    pub fn from_catalogue(value: &str) -> Self {
        if value.starts_with('L') {
            Self(value.to_string())
        } else {
            Self(format!("L{value}"))
        }
    }

    pub fn from_match(value: &str) -> Self {
        Self(value.to_string())
    }

    pub fn is_available(&self) -> bool {
        self.0 != Self::NOT_AVAILABLE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `LEVEL 1B` becomes `L1B`.
    pub fn dataset_token(&self) -> String {
        self.0.replace("LEVEL", "L").replace(' ', "")
    }
}

impl fmt::Display for ProcessingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    pub const PREFIX: &'static str = "NOAA_AVHRR_";
    pub const NO_FOOTPRINT_SUFFIX: &'static str = "_NOFP";

    pub fn resolve(
        explicit_override: Option<&str>,
        level: &ProcessingLevel,
        footprint_valid: bool,
    ) -> Self {
        if let Some(value) = explicit_override {
            return Self(value.to_string());
        }
        let suffix = if footprint_valid {
            ""
        } else {
            Self::NO_FOOTPRINT_SUFFIX
        };
        Self(format!("{}{}{suffix}", Self::PREFIX, level.dataset_token()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
