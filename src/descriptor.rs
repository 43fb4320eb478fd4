use std::fmt;
use std::fs;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::codec::{parse_footprint, parse_timestamp};
use crate::config::ResolvedConfig;
use crate::domain::{CatalogueRow, DatasetId, ProcessingLevel, ProductContainerKind, ProductLocation};
use crate::error::AvhrrError;
use crate::fs_util;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDescriptor {
    pub product: String,
    pub dataset: DatasetId,
    pub acquisition_station: String,
    pub start_orbit_number: String,
    pub size: u64,
    pub start_time: String,
    pub stop_time: String,
    pub footprint: String,
    pub footprint_valid: bool,
    pub processing_level: ProcessingLevel,
}

impl fmt::Display for ProductDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "product={}", self.product)?;
        writeln!(f, "dataset={}", self.dataset)?;
        if !self.acquisition_station.is_empty() {
            writeln!(f, "acquisition_station={}", self.acquisition_station)?;
        }
        writeln!(f, "start_orbit_number={}", self.start_orbit_number)?;
        writeln!(f, "size={}", self.size)?;
        writeln!(f, "start_time={}", self.start_time)?;
        writeln!(f, "stop_time={}", self.stop_time)?;
        write!(f, "footprint='{}'", self.footprint)
    }
}

pub fn detect_processing_level(
    location: &ProductLocation,
    row: &CatalogueRow,
    config: &ResolvedConfig,
) -> Result<ProcessingLevel, AvhrrError> {
    if !row.level().is_empty() {
        return Ok(ProcessingLevel::from_catalogue(row.level()));
    }
    for name in &config.metadata_files {
        let Some(bytes) = read_metadata_file(location, name)? else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        if let Some(level) = match_level(&text, &config.level_patterns) {
            debug!("processing level {level} found in {name}");
            return Ok(level);
        }
    }
    Ok(ProcessingLevel::not_available())
}

fn match_level(text: &str, patterns: &[Regex]) -> Option<ProcessingLevel> {
    patterns
        .iter()
        .find_map(|pattern| pattern.find(text))
        .map(|found| ProcessingLevel::from_match(found.as_str()))
}

fn read_metadata_file(
    location: &ProductLocation,
    name: &str,
) -> Result<Option<Vec<u8>>, AvhrrError> {
    let path = match location.kind {
        ProductContainerKind::Archive(kind) => {
            return fs_util::read_archive_member(&location.path, kind, name);
        }
        ProductContainerKind::Directory => {
            Some(location.path.join(name)).filter(|path| path.is_file())
        }
        ProductContainerKind::ShrkDirectory => {
            let mut candidates = fs_util::walk_dir(&location.path)?
                .into_iter()
                .filter(|path| path.is_file() && path.file_name().is_some_and(|n| n == name))
                .collect::<Vec<_>>();
            candidates.sort();
            candidates.into_iter().next()
        }
    };
    match path {
        Some(path) => fs::read(&path)
            .map(Some)
            .map_err(|err| AvhrrError::Filesystem(err.to_string())),
        None => Ok(None),
    }
}

pub fn compute_size(location: &ProductLocation) -> Result<u64, AvhrrError> {
    if location.kind.is_archive() {
        return fs::metadata(&location.path)
            .map(|meta| meta.len())
            .map_err(|err| AvhrrError::Filesystem(err.to_string()));
    }
    let mut total = 0;
    for path in fs_util::walk_dir(&location.path)? {
        if path.is_file() {
            total += fs::metadata(&path)
                .map_err(|err| AvhrrError::Filesystem(err.to_string()))?
                .len();
        }
    }
    Ok(total)
}

pub fn resolve_dataset_id(
    explicit_override: Option<&str>,
    level: &ProcessingLevel,
    footprint_valid: bool,
) -> DatasetId {
    DatasetId::resolve(explicit_override, level, footprint_valid)
}

/// Composes the record for one product. `footprint_valid` only steers the dataset
/// suffix; the emitted footprint is always parsed from the row.
pub fn build_descriptor(
    product_id: &str,
    location: &ProductLocation,
    row: &CatalogueRow,
    dataset_override: Option<&str>,
    footprint_valid: bool,
    config: &ResolvedConfig,
) -> Result<ProductDescriptor, AvhrrError> {
    let level = detect_processing_level(location, row, config)?;
    let dataset = resolve_dataset_id(dataset_override, &level, footprint_valid);
    let start = parse_timestamp(row.date(), row.start_time())?;
    let stop = parse_timestamp(row.date(), row.stop_time())?;
    let footprint = parse_footprint(row.corners());

    Ok(ProductDescriptor {
        product: product_id.to_string(),
        dataset,
        acquisition_station: underscore_spaces(row.station()),
        start_orbit_number: row.start_orbit().replace("?????", "0"),
        size: compute_size(location)?,
        start_time: start.iso,
        stop_time: stop.iso,
        footprint: footprint.wkt,
        footprint_valid: footprint.valid,
        processing_level: level,
    })
}

static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(" +").unwrap_or_else(|err| panic!("invalid space pattern: {err}"))
});

/// Each run of spaces becomes a single `_`.
fn underscore_spaces(value: &str) -> String {
    SPACE_RUN.replace_all(value, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_pattern_takes_precedence() {
        let config = ResolvedConfig::default();
        let level = match_level("header L1B ... LEVEL 1A", &config.level_patterns).unwrap();
        assert_eq!(level.as_str(), "LEVEL 1A");
    }

    #[test]
    fn station_spaces_collapse() {
        assert_eq!(underscore_spaces("MAS  PALOMAS"), "MAS_PALOMAS");
        assert_eq!(underscore_spaces(" HRPT   GILMORE CREEK "), "_HRPT_GILMORE_CREEK_");
    }

    #[test]
    fn underscore_level_matches() {
        let config = ResolvedConfig::default();
        let level = match_level("product L0_ raw", &config.level_patterns).unwrap();
        assert_eq!(level.as_str(), "L0_");
    }
}
