//! Coordinate list reader.
//!
//! One point per line, `lat lon [id]`, whitespace separated. A leading header line
//! (e.g. `lat lon id`) and `#` comments are skipped.
use std::path::Path;

use tracing::info;

use crate::core::site::CoordPoint;
use crate::error::{Error, Result};

pub fn parse_coordinates(text: &str) -> Result<Vec<CoordPoint>> {
    let mut points = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let lat = fields[0].parse::<f64>();
        if lat.is_err() && points.is_empty() && lineno == 0 {
            continue;
        }
        let bad = || Error::invalid("coordinate file", format!("line {}: '{}'", lineno + 1, line));
        if !(2..=3).contains(&fields.len()) {
            return Err(bad());
        }
        let lat = lat.map_err(|_| bad())?;
        let lon = fields[1].parse::<f64>().map_err(|_| bad())?;
        let id = match fields.get(2) {
            Some(v) => Some(v.parse::<u64>().map_err(|_| bad())?),
            None => None,
        };
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(bad());
        }
        points.push(CoordPoint { lat, lon, id });
    }
    Ok(points)
}

pub fn read_coordinate_file(path: &Path) -> Result<Vec<CoordPoint>> {
    let points = parse_coordinates(&std::fs::read_to_string(path)?)?;
    info!("Read {} coordinates from {}", points.len(), path.display());
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_comments_and_optional_ids() {
        let text = "lat lon id\n52.25 8.25 17\n# skipped\n\n51.75\t8.75\n";
        let points = parse_coordinates(text).unwrap();
        assert_eq!(
            points,
            vec![
                CoordPoint { lat: 52.25, lon: 8.25, id: Some(17) },
                CoordPoint { lat: 51.75, lon: 8.75, id: None },
            ]
        );
    }

    #[test]
    fn malformed_lines_are_reported() {
        assert!(parse_coordinates("lat lon\n52.25\n").is_err());
        assert!(parse_coordinates("lat lon\n52.25 x\n").is_err());
        assert!(parse_coordinates("lat lon\n95.0 8.0\n").is_err());
        let err = parse_coordinates("52.0 8.0\nfoo bar\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.txt");
        std::fs::write(&path, "lat lon\n47.5 11.0\n").unwrap();
        assert_eq!(read_coordinate_file(&path).unwrap().len(), 1);
    }
}
