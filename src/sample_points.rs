//! Sphere sample point lists.
//!
//! Text format: the first non-empty line holds the point count, every
//! following non-empty line one `longitude latitude` pair in degrees.
//! Lines starting with `#` are comments.
//!
//! ```text
//! 3
//! 0 0
//! 90.5 -12.25
//! -180 89
//! ```

use std::path::Path;

use glam::DVec3;

use crate::error::{GeoError, GeoResult};
use crate::geometry::direction;

/// A direction on the sphere, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpherePoint {
    pub lon: f64,
    pub lat: f64,
}

impl SpherePoint {
    pub fn direction(&self) -> DVec3 {
        direction(self.lon.to_radians(), self.lat.to_radians())
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> GeoError {
    GeoError::MalformedInput {
        line,
        reason: reason.into(),
    }
}

fn parse_number(token: &str, line: usize, what: &str) -> GeoResult<f64> {
    let v: f64 = token
        .parse()
        .map_err(|_| malformed(line, format!("{} '{}' is not a number", what, token)))?;
    if !v.is_finite() {
        return Err(malformed(line, format!("{} is not finite", what)));
    }
    Ok(v)
}

/// Parse a sample point list.
pub fn parse_sample_points(text: &str) -> GeoResult<Vec<SpherePoint>> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

    let (count_line, count_text) = lines.next().ok_or_else(|| malformed(1, "missing point count"))?;
    let count: usize = count_text
        .parse()
        .map_err(|_| malformed(count_line, format!("point count '{}' is not an integer", count_text)))?;

    let mut points = Vec::with_capacity(count);
    let mut last_line = count_line;
    for (line, text) in lines {
        last_line = line;
        if points.len() == count {
            return Err(malformed(line, format!("more than {} points", count)));
        }
        let mut tokens = text.split_whitespace();
        let (Some(lon), Some(lat), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(malformed(line, "expected 'longitude latitude'"));
        };
        let lon = parse_number(lon, line, "longitude")?;
        let lat = parse_number(lat, line, "latitude")?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(malformed(line, format!("latitude {} outside [-90, 90]", lat)));
        }
        points.push(SpherePoint { lon, lat });
    }
    if points.len() < count {
        return Err(malformed(
            last_line + 1,
            format!("expected {} points, found {}", count, points.len()),
        ));
    }
    Ok(points)
}

pub fn load_sample_points(path: &Path) -> GeoResult<Vec<SpherePoint>> {
    let text = std::fs::read_to_string(path)?;
    let points = parse_sample_points(&text)?;
    log::info!("Loaded {} sample points from {}", points.len(), path.display());
    Ok(points)
}
