use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::CatalogueRow;
use crate::error::AvhrrError;
use crate::fs_util;

/// Returns the last candidate whose contents mention `product_id`.
pub fn find_catalogue_file(
    product_id: &str,
    candidates: &[PathBuf],
) -> Result<Option<PathBuf>, AvhrrError> {
    let mut found = None;
    for candidate in candidates {
        let bytes = fs::read(candidate)
            .map_err(|err| AvhrrError::Filesystem(format!("{}: {err}", candidate.display())))?;
        if String::from_utf8_lossy(&bytes).contains(product_id) {
            found = Some(candidate.clone());
        }
    }
    Ok(found)
}

/// Returns the last CSV row with a field containing `product_id`.
pub fn find_catalogue_row(
    file: &Path,
    product_id: &str,
) -> Result<Option<CatalogueRow>, AvhrrError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(file)
        .map_err(|err| AvhrrError::Csv(format!("{}: {err}", file.display())))?;

    let mut found = None;
    for record in reader.byte_records() {
        let record = record.map_err(|err| AvhrrError::Csv(err.to_string()))?;
        let fields = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).to_string())
            .collect::<Vec<_>>();
        if fields.iter().any(|field| field.contains(product_id)) {
            found = Some(CatalogueRow::new(fields));
        }
    }
    Ok(found)
}

/// The extracted reference catalogue: a flat set of CSV files.
#[derive(Debug, Clone)]
pub struct Catalogue {
    files: Vec<PathBuf>,
}

impl Catalogue {
    /// Collects every file below `dir`, sorted by path so scan order is stable.
    pub fn open(dir: &Path) -> Result<Self, AvhrrError> {
        let mut files = fs_util::walk_dir(dir)?
            .into_iter()
            .filter(|path| path.is_file())
            .collect::<Vec<_>>();
        files.sort();
        debug!(dir = %dir.display(), count = files.len(), "catalogue opened");
        Ok(Self { files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn lookup(&self, product_id: &str) -> Result<CatalogueRow, AvhrrError> {
        let not_found = || AvhrrError::CatalogueRowNotFound(product_id.to_string());
        let file = find_catalogue_file(product_id, &self.files)?.ok_or_else(not_found)?;
        debug!(file = %file.display(), "catalogue file matched {product_id}");
        find_catalogue_row(&file, product_id)?.ok_or_else(not_found)
    }
}
