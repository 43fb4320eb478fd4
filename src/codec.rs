use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::AvhrrError;

pub const FALLBACK_FOOTPRINT: &str = "POLYGON((-180 -90,-180 90,180 90,180 -90,-180 -90))";

const CORNER_VALUES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub iso: String,
    pub instant: DateTime<Utc>,
}

/// Parses a `yyMMdd` date and a `HHmmss` time as a UTC instant.
pub fn parse_timestamp(date: &str, time: &str) -> Result<Timestamp, AvhrrError> {
    let malformed = || AvhrrError::MalformedTimestamp(format!("{date} {time}"));
    if !is_six_digits(date) || !is_six_digits(time) {
        return Err(malformed());
    }
    let naive = NaiveDateTime::parse_from_str(&format!("{date}{time}"), "%y%m%d%H%M%S")
        .map_err(|_| malformed())?;
    let instant = naive.and_utc();
    Ok(Timestamp {
        iso: instant.format("%Y-%m-%dT%H:%M:%S.000Z").to_string(),
        instant,
    })
}

fn is_six_digits(value: &str) -> bool {
    value.len() == 6 && value.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footprint {
    pub wkt: String,
    pub valid: bool,
}

impl Footprint {
    pub fn fallback() -> Self {
        Self {
            wkt: FALLBACK_FOOTPRINT.to_string(),
            valid: false,
        }
    }

    /// Builds the ring from four lat/lon corner pairs, swapping each pair to lon/lat.
    pub fn parse_strict(corners: &str) -> Result<Self, AvhrrError> {
        let tokens = corners.split_whitespace().take(CORNER_VALUES).collect::<Vec<_>>();
        if tokens.len() < CORNER_VALUES {
            return Err(AvhrrError::MalformedFootprint(format!(
                "expected {CORNER_VALUES} corner values, found {}",
                tokens.len()
            )));
        }
        let values = tokens
            .iter()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| AvhrrError::MalformedFootprint(format!("not a number: {token}")))
            })
            .collect::<Result<Vec<_>, AvhrrError>>()?;

        let ring = [(1, 0), (3, 2), (5, 4), (7, 6), (1, 0)]
            .iter()
            .map(|&(lon, lat)| format!("{} {}", values[lon], values[lat]))
            .collect::<Vec<_>>()
            .join(",");
        Ok(Self {
            wkt: format!("POLYGON(({ring}))"),
            valid: true,
        })
    }
}

pub fn parse_footprint(corners: &str) -> Footprint {
    Footprint::parse_strict(corners).unwrap_or_else(|err| {
        debug!("{err}; using whole-earth footprint");
        Footprint::fallback()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_corners_keep_precision() {
        let footprint = parse_footprint("45.5 -10.25 46 -10 46 -9 45.5 -9");
        assert_eq!(
            footprint.wkt,
            "POLYGON((-10.25 45.5,-10 46,-9 46,-9 45.5,-10.25 45.5))"
        );
    }

    #[test]
    fn too_few_corners_fall_back() {
        let footprint = parse_footprint("10 20 10 21");
        assert!(!footprint.valid);
        assert_eq!(footprint.wkt, FALLBACK_FOOTPRINT);
    }
}
