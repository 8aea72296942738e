//! Single-face longitude/latitude projections.
//!
//! EquiRect, EqualArea and CrastersParabolic differ only in how the vertical
//! (and for Craster also horizontal) picture axis is warped. They share one
//! boundary rule: stepping over the top or bottom edge continues on the
//! opposite meridian (reflect vertically, shift half a width), and the
//! horizontal axis wraps around.

use std::f64::consts::{FRAC_PI_2, PI};

use super::{Position, Projection, angles, direction};
use crate::config::{ChromaFormat, FramePackStruct, GeometryType, Rotation};

/// Shared frame math, continuous coordinates u in [0, W), v in [0, H].
#[derive(Debug, Clone, Copy)]
struct LatLongFrame {
    width: usize,
    height: usize,
}

impl LatLongFrame {
    fn w(&self) -> f64 {
        self.width as f64
    }

    fn h(&self) -> f64 {
        self.height as f64
    }

    /// Sample index to wrapped continuous (u, v).
    fn wrap(&self, x: f64, y: f64) -> (f64, f64) {
        let (w, h) = (self.w(), self.h());
        let mut u = x + 0.5;
        let mut v = y + 0.5;
        if v < 0.0 {
            v = -v;
            u += w / 2.0;
        } else if v > h {
            v = 2.0 * h - v;
            u += w / 2.0;
        }
        (u.rem_euclid(w), v)
    }

    #[inline]
    fn lon_of(&self, u: f64) -> f64 {
        2.0 * PI * u / self.w() - PI
    }

    #[inline]
    fn u_of(&self, lon: f64) -> f64 {
        (lon + PI) * self.w() / (2.0 * PI)
    }

    fn single_face(&self, chroma_format: ChromaFormat) -> FramePackStruct {
        FramePackStruct::from_table(chroma_format, &[&[(0, Rotation::R0)]])
    }
}

// =============================================================================
// Equirectangular
// =============================================================================

#[derive(Debug, Clone)]
pub struct EquiRect {
    frame: LatLongFrame,
}

impl EquiRect {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            frame: LatLongFrame { width, height },
        }
    }
}

impl Projection for EquiRect {
    fn geometry_type(&self) -> GeometryType {
        GeometryType::EquiRect
    }

    fn face_size(&self) -> (usize, usize) {
        (self.frame.width, self.frame.height)
    }

    fn map_2d_to_3d(&self, pos: &Position) -> Position {
        let (u, v) = self.frame.wrap(pos.x, pos.y);
        let lat = FRAC_PI_2 - PI * v / self.frame.h();
        Position::sphere(direction(self.frame.lon_of(u), lat))
    }

    fn map_3d_to_2d(&self, pos: &Position) -> Position {
        let (lon, lat) = angles(pos.vec3());
        let u = self.frame.u_of(lon);
        let v = (FRAC_PI_2 - lat) * self.frame.h() / PI;
        Position::planar(0, u - 0.5, v - 0.5)
    }

    fn default_frame_pack(&self, chroma_format: ChromaFormat) -> FramePackStruct {
        self.frame.single_face(chroma_format)
    }
}

// =============================================================================
// Equal-area (Lambert cylindrical)
// =============================================================================

#[derive(Debug, Clone)]
pub struct EqualArea {
    frame: LatLongFrame,
}

impl EqualArea {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            frame: LatLongFrame { width, height },
        }
    }
}

impl Projection for EqualArea {
    fn geometry_type(&self) -> GeometryType {
        GeometryType::EqualArea
    }

    fn face_size(&self) -> (usize, usize) {
        (self.frame.width, self.frame.height)
    }

    fn map_2d_to_3d(&self, pos: &Position) -> Position {
        let (u, v) = self.frame.wrap(pos.x, pos.y);
        let lat = (1.0 - 2.0 * v / self.frame.h()).clamp(-1.0, 1.0).asin();
        Position::sphere(direction(self.frame.lon_of(u), lat))
    }

    fn map_3d_to_2d(&self, pos: &Position) -> Position {
        let (lon, lat) = angles(pos.vec3());
        let u = self.frame.u_of(lon);
        let v = (1.0 - lat.sin()) * self.frame.h() / 2.0;
        Position::planar(0, u - 0.5, v - 0.5)
    }

    fn default_frame_pack(&self, chroma_format: ChromaFormat) -> FramePackStruct {
        self.frame.single_face(chroma_format)
    }
}

// =============================================================================
// Craster parabolic
// =============================================================================

/// Craster parabolic: equal-area, footprint is a lens bounded by two parabolas.
#[derive(Debug, Clone)]
pub struct CrastersParabolic {
    frame: LatLongFrame,
}

impl CrastersParabolic {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            frame: LatLongFrame { width, height },
        }
    }

    /// Half-width of the lens at latitude `lat`, relative to W/2.
    #[inline]
    fn lens(lat: f64) -> f64 {
        2.0 * (2.0 * lat / 3.0).cos() - 1.0
    }

    #[inline]
    fn lat_of(&self, v: f64) -> f64 {
        3.0 * (0.5 - v / self.frame.h()).clamp(-0.5, 0.5).asin()
    }
}

impl Projection for CrastersParabolic {
    fn geometry_type(&self) -> GeometryType {
        GeometryType::CrastersParabolic
    }

    fn face_size(&self) -> (usize, usize) {
        (self.frame.width, self.frame.height)
    }

    fn map_2d_to_3d(&self, pos: &Position) -> Position {
        let (u, v) = self.frame.wrap(pos.x, pos.y);
        let lat = self.lat_of(v);
        let k = Self::lens(lat).max(1e-9);
        let lon = PI * (2.0 * u / self.frame.w() - 1.0) / k;
        Position::sphere(direction(lon, lat))
    }

    fn map_3d_to_2d(&self, pos: &Position) -> Position {
        let (lon, lat) = angles(pos.vec3());
        let v = (0.5 - (lat / 3.0).sin()) * self.frame.h();
        let u = (1.0 + lon * Self::lens(lat) / PI) * self.frame.w() / 2.0;
        Position::planar(0, u - 0.5, v - 0.5)
    }

    fn inside_footprint(&self, _face: usize, u: f64, v: f64) -> bool {
        let (w, h) = (self.frame.w(), self.frame.h());
        if !(0.0..=h).contains(&v) {
            return false;
        }
        (2.0 * u / w - 1.0).abs() <= Self::lens(self.lat_of(v))
    }

    fn is_rectangular(&self) -> bool {
        false
    }

    fn default_frame_pack(&self, chroma_format: ChromaFormat) -> FramePackStruct {
        self.frame.single_face(chroma_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn close(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-9
    }

    /// Test: ERP boundary wrap
    /// Validates: x = -1 lands on the same direction as x = W - 1
    #[test]
    fn test_erp_horizontal_wrap() {
        let erp = EquiRect::new(8, 4);
        let a = erp.map_2d_to_3d(&Position::planar(0, -1.0, 2.0)).vec3();
        let b = erp.map_2d_to_3d(&Position::planar(0, 7.0, 2.0)).vec3();
        assert!(close(a, b));
    }

    #[test]
    fn test_erp_pole_reflection() {
        let erp = EquiRect::new(16, 8);
        // One row above the top continues on the opposite meridian
        let above = erp.map_2d_to_3d(&Position::planar(0, 2.0, -1.0)).vec3();
        let mirrored = erp.map_2d_to_3d(&Position::planar(0, 10.0, 0.0)).vec3();
        assert!(close(above, mirrored));
        let below = erp.map_2d_to_3d(&Position::planar(0, 3.0, 8.0)).vec3();
        let mirrored = erp.map_2d_to_3d(&Position::planar(0, 11.0, 7.0)).vec3();
        assert!(close(below, mirrored));
    }

    #[test]
    fn test_erp_centre_is_plus_x() {
        let erp = EquiRect::new(64, 32);
        // continuous centre (32, 16) = sample index (31.5, 15.5)
        let c = erp.map_2d_to_3d(&Position::planar(0, 31.5, 15.5)).vec3();
        assert!(close(c, DVec3::X));
        let p = erp.map_3d_to_2d(&Position::sphere(DVec3::X));
        assert!((p.x - 31.5).abs() < 1e-9 && (p.y - 15.5).abs() < 1e-9);
    }

    #[test]
    fn test_equal_area_rows_cover_equal_area() {
        let eap = EqualArea::new(8, 8);
        // sin(lat) is linear in v
        let top = eap.map_2d_to_3d(&Position::planar(0, 3.5, -0.5)).vec3();
        let quarter = eap.map_2d_to_3d(&Position::planar(0, 3.5, 1.5)).vec3();
        assert!((top.y - 1.0).abs() < 1e-9);
        assert!((quarter.y - 0.5).abs() < 1e-9);
    }

    /// Test: Craster lens footprint
    /// Validates: equator spans the full width, poles collapse to the centre
    #[test]
    fn test_craster_footprint() {
        let cpp = CrastersParabolic::new(64, 32);
        assert!(cpp.inside_footprint(0, 0.5, 16.0));
        assert!(cpp.inside_footprint(0, 63.5, 16.0));
        assert!(!cpp.inside_footprint(0, 0.5, 0.5));
        assert!(cpp.inside_footprint(0, 32.0, 0.5));
        assert!(!cpp.inside_footprint(0, 32.0, 33.0));
        assert!(!cpp.is_rectangular());
    }
}
