use std::fs;

use crate::domain::{CatalogueRow, ProductContainerKind, ProductLocation};
use crate::error::AvhrrError;
use crate::fs_util;

const MIN_TOKENS: usize = 23;
const CORNERS: std::ops::RangeInclusive<usize> = 15..=22;

/// Metadata read from a product's own `<id>.ief` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedMetadata {
    pub row: CatalogueRow,
    pub raw_corners: String,
}

pub fn read_embedded_metadata(
    product_id: &str,
    location: &ProductLocation,
) -> Result<EmbeddedMetadata, AvhrrError> {
    let unavailable = |reason: String| AvhrrError::EmbeddedMetadataUnavailable {
        product: product_id.to_string(),
        reason,
    };
    let member = format!("{product_id}.ief");
    let bytes = match location.kind {
        ProductContainerKind::Archive(kind) => {
            fs_util::read_archive_member(&location.path, kind, &member)?
        }
        ProductContainerKind::Directory | ProductContainerKind::ShrkDirectory => {
            let path = location.path.join(&member);
            if path.is_file() {
                Some(fs::read(&path).map_err(|err| AvhrrError::Filesystem(err.to_string()))?)
            } else {
                None
            }
        }
    };
    let bytes = bytes.ok_or_else(|| unavailable(format!("{member} not found")))?;
    parse_ief(&String::from_utf8_lossy(&bytes)).map_err(unavailable)
}

/// Token layout: `[6]` date, `[7]`/`[8]` start/stop time, `[9]` station and orbit,
/// `[15..=22]` corners.
pub fn parse_ief(contents: &str) -> Result<EmbeddedMetadata, String> {
    let normalized = contents.replace('-', " -");
    let tokens = normalized.split_whitespace().collect::<Vec<_>>();
    if tokens.len() < MIN_TOKENS {
        return Err(format!(
            "expected at least {MIN_TOKENS} tokens, found {}",
            tokens.len()
        ));
    }

    let pass = tokens[9];
    let station = char_slice(pass, 0, 3);
    let orbit = char_slice(pass, 6, 11);
    let raw_corners = tokens[CORNERS].join(" ");

    let row = CatalogueRow::new(vec![
        String::new(),
        tokens[6].to_string(),
        tokens[7].to_string(),
        tokens[8].to_string(),
        String::new(),
        station,
        orbit,
        String::new(),
        raw_corners.clone(),
    ]);
    Ok(EmbeddedMetadata { row, raw_corners })
}

fn char_slice(value: &str, start: usize, end: usize) -> String {
    value.chars().skip(start).take(end - start).collect()
}
