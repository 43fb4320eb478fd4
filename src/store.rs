use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info};

use crate::domain::{DatasetId, ProductLocation};
use crate::error::AvhrrError;
use crate::fs_util;

/// The reorganized output tree: `root/<dataset>/<YYYY>/<MM>/<DD>/`.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn from_path(root: &Path) -> Result<Self, AvhrrError> {
        let root = Utf8PathBuf::from_path_buf(root.to_path_buf())
            .map_err(|_| AvhrrError::Filesystem("invalid output path".to_string()))?;
        Ok(Self { root })
    }

    pub fn dataset_day_dir(&self, dataset: &DatasetId, date: &DateTime<Utc>) -> Utf8PathBuf {
        self.root
            .join(dataset.as_str())
            .join(date.year().to_string())
            .join(format!("{:02}", date.month()))
            .join(format!("{:02}", date.day()))
    }

    /// Creates the day directory if missing and returns it.
    pub fn destination_path(
        &self,
        dataset: &DatasetId,
        date: &DateTime<Utc>,
    ) -> Result<Utf8PathBuf, AvhrrError> {
        let dir = self.dataset_day_dir(dataset, date);
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
        Ok(dir)
    }

    pub fn ensure_root(&self) -> Result<(), AvhrrError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| AvhrrError::Filesystem(err.to_string()))
    }
}

/// Result of placing a product into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    /// The archive was written by this call.
    Stored(PathBuf),
    /// A file of the same name was already at the destination and was kept as is.
    AlreadyPresent(PathBuf),
}

impl Relocation {
    pub fn path(&self) -> &Path {
        match self {
            Relocation::Stored(path) | Relocation::AlreadyPresent(path) => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            Relocation::Stored(path) | Relocation::AlreadyPresent(path) => path,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, Relocation::Stored(_))
    }
}

/// Places the product into `destination_dir` as a single archive. An existing file of
/// the same name is kept as is.
pub fn relocate(
    location: &ProductLocation,
    destination_dir: &Path,
) -> Result<Relocation, AvhrrError> {
    let target = if location.kind.is_archive() {
        let name = location
            .path
            .file_name()
            .ok_or_else(|| AvhrrError::Filesystem("archive without a file name".to_string()))?;
        destination_dir.join(name)
    } else {
        destination_dir.join(format!("{}.tgz", location.product_id))
    };

    if target.exists() {
        debug!(target = %target.display(), "destination exists, leaving it untouched");
        return Ok(Relocation::AlreadyPresent(target));
    }

    if location.kind.is_archive() {
        fs_util::copy_file_atomic(&location.path, &target)?;
    } else {
        fs_util::pack_dir_contents(&location.path, &target)?;
    }
    info!("Product was stored into {}", target.display());
    Ok(Relocation::Stored(target))
}

/// Deletes a product directory once it has been archived elsewhere. Archives are left.
pub fn remove_source(location: &ProductLocation) -> Result<bool, AvhrrError> {
    if location.kind.is_archive() || !location.path.is_dir() {
        return Ok(false);
    }
    fs::remove_dir_all(&location.path).map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
    info!("Removed source directory {}", location.path.display());
    Ok(true)
}
