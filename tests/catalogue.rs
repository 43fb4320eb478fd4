use std::fs;

use assert_matches::assert_matches;

use avhrr_metadata_parser::catalogue::{Catalogue, find_catalogue_file, find_catalogue_row};
use avhrr_metadata_parser::error::AvhrrError;

const PRODUCT: &str = "NOAA14_HRPT_950312";

#[test]
fn later_file_wins_when_both_mention_the_product() {
    let temp = tempfile::tempdir().unwrap();
    let first = temp.path().join("a.csv");
    let second = temp.path().join("b.csv");
    let unrelated = temp.path().join("c.csv");
    fs::write(&first, format!("{PRODUCT},950312,101500,102300\n")).unwrap();
    fs::write(&second, format!("{PRODUCT},950312,101600,102400\n")).unwrap();
    fs::write(&unrelated, "OTHER,950312,101600,102400\n").unwrap();

    let found = find_catalogue_file(PRODUCT, &[first, second.clone(), unrelated]).unwrap();
    assert_eq!(found, Some(second));
}

#[test]
fn no_candidate_matches() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("a.csv");
    fs::write(&file, "OTHER,1,2,3\n").unwrap();
    assert_eq!(find_catalogue_file(PRODUCT, &[file]).unwrap(), None);
}

#[test]
fn later_row_wins_and_substring_match_counts() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("cat.csv");
    fs::write(
        &file,
        format!(
            "id,date,start,stop\n\
             {PRODUCT},950312,101500,102300\n\
             other,950312,000000,000100\n\
             prefix_{PRODUCT}_suffix,950313,111500,112300,,MAS,2938\n"
        ),
    )
    .unwrap();

    let row = find_catalogue_row(&file, PRODUCT).unwrap().unwrap();
    assert_eq!(row.date(), "950313");
    assert_eq!(row.start_time(), "111500");
    assert_eq!(row.station(), "MAS");
    assert_eq!(row.start_orbit(), "2938");
    assert_eq!(row.level(), "");
}

#[test]
fn quoted_fields_keep_embedded_commas() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("cat.csv");
    fs::write(
        &file,
        format!("{PRODUCT},950312,101500,102300,x,\"MAS, PALOMAS\",1,1B,\"1 2 3 4 5 6 7 8\"\n"),
    )
    .unwrap();

    let row = find_catalogue_row(&file, PRODUCT).unwrap().unwrap();
    assert_eq!(row.station(), "MAS, PALOMAS");
    assert_eq!(row.corners(), "1 2 3 4 5 6 7 8");
}

#[test]
fn lookup_across_catalogue_directory() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("1995.csv"), format!("{PRODUCT},950312,101500,102300\n")).unwrap();
    fs::write(temp.path().join("1996.csv"), "OTHER,960312,101500,102300\n").unwrap();

    let catalogue = Catalogue::open(temp.path()).unwrap();
    assert_eq!(catalogue.files().len(), 2);
    let row = catalogue.lookup(PRODUCT).unwrap();
    assert_eq!(row.stop_time(), "102300");

    let err = catalogue.lookup("NOAA12_MISSING").unwrap_err();
    assert_matches!(err, AvhrrError::CatalogueRowNotFound(id) if id == "NOAA12_MISSING");
}
