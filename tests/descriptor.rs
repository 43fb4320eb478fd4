use std::fs;
use std::io::Write;
use std::path::Path;

use assert_matches::assert_matches;

use avhrr_metadata_parser::config::ResolvedConfig;
use avhrr_metadata_parser::descriptor::{build_descriptor, compute_size, detect_processing_level};
use avhrr_metadata_parser::domain::{CatalogueRow, ProductLocation};
use avhrr_metadata_parser::error::AvhrrError;
use avhrr_metadata_parser::fs_util::pack_dir_contents;

const PRODUCT: &str = "NOAA14_HRPT_200101";

fn row(level: &str, corners: &str) -> CatalogueRow {
    CatalogueRow::new(
        [
            PRODUCT, "200101", "120000", "120500", "", "MAS  PALOMAS", "?????", level, corners,
        ]
        .iter()
        .map(|field| field.to_string())
        .collect(),
    )
}

fn product_dir(root: &Path) -> std::path::PathBuf {
    let dir = root.join(PRODUCT);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{PRODUCT}.l1a")), vec![0u8; 100]).unwrap();
    fs::write(dir.join("LEADER"), b"HEADER L1B TRAILER").unwrap();
    dir
}

#[test]
fn descriptor_for_directory_product() {
    let temp = tempfile::tempdir().unwrap();
    let dir = product_dir(temp.path());
    let config = ResolvedConfig::default();
    let location = ProductLocation::locate(&dir, &config).unwrap();

    let descriptor = build_descriptor(
        PRODUCT,
        &location,
        &row("LEVEL 1B", "10 20 10 21 11 21 11 20 10 20 10 20 10 20 10 20"),
        None,
        true,
        &config,
    )
    .unwrap();

    let text = descriptor.to_string();
    assert!(text.contains("dataset=NOAA_AVHRR_L1B\n"));
    assert!(text.contains("start_time=2020-01-01T12:00:00.000Z\n"));
    assert!(text.contains("stop_time=2020-01-01T12:05:00.000Z\n"));
    assert_eq!(
        text,
        format!(
            "product={PRODUCT}\n\
             dataset=NOAA_AVHRR_L1B\n\
             acquisition_station=MAS_PALOMAS\n\
             start_orbit_number=0\n\
             size=118\n\
             start_time=2020-01-01T12:00:00.000Z\n\
             stop_time=2020-01-01T12:05:00.000Z\n\
             footprint='POLYGON((20 10,21 10,21 11,20 11,20 10))'"
        )
    );
}

#[test]
fn empty_station_line_is_omitted() {
    let temp = tempfile::tempdir().unwrap();
    let dir = product_dir(temp.path());
    let config = ResolvedConfig::default();
    let location = ProductLocation::locate(&dir, &config).unwrap();
    let mut fields = row("1B", "bad").fields().to_vec();
    fields[5] = String::new();

    let descriptor = build_descriptor(
        PRODUCT,
        &location,
        &CatalogueRow::new(fields),
        None,
        false,
        &config,
    )
    .unwrap();
    let text = descriptor.to_string();
    assert!(!text.contains("acquisition_station"));
    assert!(text.contains("dataset=NOAA_AVHRR_L1B_NOFP\n"));
    assert!(!descriptor.footprint_valid);
}

#[test]
fn bad_timestamp_fails_the_descriptor() {
    let temp = tempfile::tempdir().unwrap();
    let dir = product_dir(temp.path());
    let config = ResolvedConfig::default();
    let location = ProductLocation::locate(&dir, &config).unwrap();
    let mut fields = row("1B", "").fields().to_vec();
    fields[2] = "12:00".to_string();

    let err = build_descriptor(PRODUCT, &location, &CatalogueRow::new(fields), None, true, &config)
        .unwrap_err();
    assert_matches!(err, AvhrrError::MalformedTimestamp(_));
}

#[test]
fn level_detected_from_metadata_file_in_directory() {
    let temp = tempfile::tempdir().unwrap();
    let dir = product_dir(temp.path());
    let config = ResolvedConfig::default();
    let location = ProductLocation::locate(&dir, &config).unwrap();

    let level = detect_processing_level(&location, &row("", ""), &config).unwrap();
    assert_eq!(level.as_str(), "L1B");
}

#[test]
fn metadata_files_are_searched_in_configured_order() {
    let temp = tempfile::tempdir().unwrap();
    let dir = product_dir(temp.path());
    fs::write(dir.join("catalogue.iuf"), b"PROCESSING LEVEL 1A").unwrap();
    let config = ResolvedConfig::default();
    let location = ProductLocation::locate(&dir, &config).unwrap();

    let level = detect_processing_level(&location, &row("", ""), &config).unwrap();
    assert_eq!(level.as_str(), "LEVEL 1A");
}

#[test]
fn level_detected_inside_archive() {
    let temp = tempfile::tempdir().unwrap();
    let dir = product_dir(temp.path());
    let archive = temp.path().join(format!("{PRODUCT}.tgz"));
    pack_dir_contents(&dir, &archive).unwrap();
    let config = ResolvedConfig::default();
    let location = ProductLocation::locate(&archive, &config).unwrap();

    let level = detect_processing_level(&location, &row("", ""), &config).unwrap();
    assert_eq!(level.as_str(), "L1B");
}

#[test]
fn level_detected_inside_zip() {
    let temp = tempfile::tempdir().unwrap();
    let archive = temp.path().join(format!("{PRODUCT}.zip"));
    let mut writer = zip::ZipWriter::new(fs::File::create(&archive).unwrap());
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    writer.start_file("catalogue.ief", options).unwrap();
    writer.write_all(b"AVHRR LEVEL 1B").unwrap();
    writer.finish().unwrap();

    let config = ResolvedConfig::default();
    let location = ProductLocation::locate(&archive, &config).unwrap();
    let level = detect_processing_level(&location, &row("", ""), &config).unwrap();
    assert_eq!(level.as_str(), "LEVEL 1B");
}

#[test]
fn level_not_available_without_hints() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join(PRODUCT);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("scene.dat"), b"x").unwrap();
    let config = ResolvedConfig::default();
    let location = ProductLocation::locate(&dir, &config).unwrap();

    let level = detect_processing_level(&location, &row("", ""), &config).unwrap();
    assert!(!level.is_available());
    assert_eq!(level.as_str(), "Not available");
}

#[test]
fn catalogue_level_short_circuits_file_search() {
    let temp = tempfile::tempdir().unwrap();
    let dir = product_dir(temp.path());
    let config = ResolvedConfig::default();
    let location = ProductLocation::locate(&dir, &config).unwrap();

    let level = detect_processing_level(&location, &row("1A", ""), &config).unwrap();
    assert_eq!(level.as_str(), "L1A");
}

#[test]
fn size_sums_nested_files_or_uses_archive_size() {
    let temp = tempfile::tempdir().unwrap();
    let dir = product_dir(temp.path());
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("nested").join("extra.bin"), vec![1u8; 7]).unwrap();
    let config = ResolvedConfig::default();
    let location = ProductLocation::locate(&dir, &config).unwrap();
    assert_eq!(compute_size(&location).unwrap(), 100 + 18 + 7);

    let archive = temp.path().join(format!("{PRODUCT}.zip"));
    fs::write(&archive, vec![0u8; 42]).unwrap();
    let location = ProductLocation::locate(&archive, &config).unwrap();
    assert_eq!(compute_size(&location).unwrap(), 42);
}
