use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::domain::ProcessingLevel;
use crate::error::AvhrrError;

const HEADER: [&str; 5] = ["Product", "Processing", "Footprint", "New_dir", "Processing_level"];
const NOT_APPLICABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    Metadata,
    Reorganized,
    NotInCatalogue,
    NoEmbeddedMetadata,
    MalformedMetadata,
    Failed,
    NotLocated,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Metadata => "Metadata",
            ProductStatus::Reorganized => "Re-organized",
            ProductStatus::NotInCatalogue => "not found in the CSVs",
            ProductStatus::NoEmbeddedMetadata => "no embedded metadata",
            ProductStatus::MalformedMetadata => "malformed metadata",
            ProductStatus::Failed => "processing failed",
            ProductStatus::NotLocated => "not found or no structure",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ProductStatus::Metadata | ProductStatus::Reorganized)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub product: String,
    pub status: ProductStatus,
    pub footprint_valid: Option<bool>,
    pub destination: Option<PathBuf>,
    pub level: Option<ProcessingLevel>,
}

impl AuditRecord {
    pub fn unresolved(product: impl Into<String>, status: ProductStatus) -> Self {
        Self {
            product: product.into(),
            status,
            footprint_valid: None,
            destination: None,
            level: None,
        }
    }

    fn fields(&self) -> [String; 5] {
        [
            self.product.clone(),
            self.status.as_str().to_string(),
            match self.footprint_valid {
                Some(true) => "True".to_string(),
                Some(false) => "False".to_string(),
                None => NOT_APPLICABLE.to_string(),
            },
            self.destination
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
            self.level
                .as_ref()
                .map(|level| level.to_string())
                .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
        ]
    }
}

/// Append-only CSV of per-product outcomes.
pub struct AuditLog {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl AuditLog {
    /// Opens `<dir>/avhrr_parser_<YYYYmmddHHMMSS>.csv`.
    pub fn create_in(dir: &Path, now: DateTime<Local>) -> Result<Self, AvhrrError> {
        let path = dir.join(format!("avhrr_parser_{}.csv", now.format("%Y%m%d%H%M%S")));
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self, AvhrrError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| AvhrrError::Filesystem(format!("{}: {err}", path.display())))?;
        let is_new = file
            .metadata()
            .map_err(|err| AvhrrError::Filesystem(err.to_string()))?
            .len()
            == 0;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        let mut log = Self {
            path: path.to_path_buf(),
            writer,
        };
        if is_new {
            log.write_fields(&HEADER)?;
        }
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, record: &AuditRecord) -> Result<(), AvhrrError> {
        self.write_fields(&record.fields())
    }

    fn write_fields<T: AsRef<[u8]>>(&mut self, fields: &[T]) -> Result<(), AvhrrError> {
        self.writer
            .write_record(fields)
            .map_err(|err| AvhrrError::Csv(err.to_string()))?;
        self.writer
            .flush()
            .map_err(|err| AvhrrError::Filesystem(err.to_string()))
    }
}
