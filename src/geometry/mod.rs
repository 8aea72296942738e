//! Sphere projections: the `Projection` contract and its seven implementations.
//!
//! A projection only knows math: how a face-local sample position maps onto
//! the unit sphere and back, which part of each face buffer is its real
//! footprint, and how faces are laid out by default. Buffers, filters and
//! packing live in `crate::engine`.
//!
//! ## Coordinates
//!
//! ```text
//! 2D: (face, x, y)    luma sample indices, sample (i, j) centred at (i, j)
//! 3D: (x, y, z)       unit sphere, +x = picture centre, +y = north pole
//!     lon = atan2(-z, x), lat = asin(y)
//! ```
//!
//! | Geometry | Faces | Footprint |
//! |----------|-------|-----------|
//! | EquiRect / EqualArea | 1 | rectangle |
//! | CrastersParabolic | 1 | parabolic lens |
//! | CubeMap | 6 | square |
//! | Octahedron | 8 | apex-up triangle |
//! | Icosahedron | 20 | apex-up triangle |
//! | Viewport | 1 | rectangle |

pub mod cubemap;
pub mod icosahedron;
pub mod latlong;
pub mod octahedron;
pub mod trimesh;
pub mod viewport;

use enum_dispatch::enum_dispatch;
use glam::DVec3;

use crate::config::{ChromaFormat, CompactVariant, FramePackStruct, GeometryType, VideoDescriptor};
use crate::error::{GeoError, GeoResult};

pub use cubemap::CubeMap;
pub use icosahedron::Icosahedron;
pub use latlong::{CrastersParabolic, EqualArea, EquiRect};
pub use octahedron::Octahedron;
pub use trimesh::{CompactLayout, CompactSlot, Half, TriFace, TriMesh};
pub use viewport::Viewport;

/// Face-local 2D position or unit-sphere 3D position.
///
/// 2D positions use (face, x, y); 3D positions use (x, y, z) and keep the
/// face index only as a hint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub face: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn planar(face: usize, x: f64, y: f64) -> Self {
        Self { face, x, y, z: 0.0 }
    }

    pub fn sphere(v: DVec3) -> Self {
        Self {
            face: 0,
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }

    #[inline]
    pub fn vec3(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }
}

/// Sphere mapping contract implemented by every geometry.
#[enum_dispatch]
pub trait Projection {
    fn geometry_type(&self) -> GeometryType;

    /// Luma face size (width, height)
    fn face_size(&self) -> (usize, usize);

    fn num_faces(&self) -> usize {
        self.geometry_type().face_count()
    }

    /// Face-local sample position to unit sphere. Positions outside the face
    /// follow the geometry's own wrap rule.
    fn map_2d_to_3d(&self, pos: &Position) -> Position;

    /// Unit-sphere direction to face-local sample position.
    fn map_3d_to_2d(&self, pos: &Position) -> Position;

    /// Footprint test in luma continuous coordinates (u = x + 0.5, v = y + 0.5).
    fn inside_footprint(&self, _face: usize, u: f64, v: f64) -> bool {
        let (w, h) = self.face_size();
        u >= 0.0 && v >= 0.0 && u <= w as f64 && v <= h as f64
    }

    /// Footprint fills the whole face rectangle
    fn is_rectangular(&self) -> bool {
        true
    }

    fn default_frame_pack(&self, chroma_format: ChromaFormat) -> FramePackStruct;

    fn compact_layout(&self, _variant: CompactVariant) -> Option<&'static CompactLayout> {
        None
    }
}

/// Closed set of geometries.
#[enum_dispatch(Projection)]
#[derive(Debug, Clone)]
pub enum GeometryKind {
    EquiRect(EquiRect),
    EqualArea(EqualArea),
    CrastersParabolic(CrastersParabolic),
    CubeMap(CubeMap),
    Octahedron(Octahedron),
    Icosahedron(Icosahedron),
    Viewport(Viewport),
}

impl GeometryKind {
    /// Instantiate the projection named by the descriptor.
    pub fn from_descriptor(desc: &VideoDescriptor) -> GeoResult<Self> {
        let (w, h) = (desc.face_width, desc.face_height);
        let kind = match desc.geometry {
            GeometryType::EquiRect => GeometryKind::EquiRect(EquiRect::new(w, h)),
            GeometryType::EqualArea => GeometryKind::EqualArea(EqualArea::new(w, h)),
            GeometryType::CrastersParabolic => {
                GeometryKind::CrastersParabolic(CrastersParabolic::new(w, h))
            }
            GeometryType::CubeMap => {
                if w != h {
                    return Err(GeoError::unsupported(format!(
                        "cubemap faces must be square, got {}x{}",
                        w, h
                    )));
                }
                GeometryKind::CubeMap(CubeMap::new(w))
            }
            GeometryType::Octahedron => GeometryKind::Octahedron(Octahedron::new(w, h)),
            GeometryType::Icosahedron => GeometryKind::Icosahedron(Icosahedron::new(w, h)),
            GeometryType::Viewport => {
                let params = desc.viewport.ok_or_else(|| {
                    GeoError::unsupported("viewport geometry needs viewport parameters")
                })?;
                GeometryKind::Viewport(Viewport::new(w, h, params)?)
            }
        };
        if desc.compact != CompactVariant::Off && kind.compact_layout(desc.compact).is_none() {
            return Err(GeoError::unsupported(format!(
                "{} has no compact layout {:?}",
                desc.geometry.name(),
                desc.compact
            )));
        }
        Ok(kind)
    }

    pub fn as_viewport_mut(&mut self) -> Option<&mut Viewport> {
        match self {
            GeometryKind::Viewport(v) => Some(v),
            _ => None,
        }
    }
}

/// Direction for longitude / latitude in radians.
#[inline]
pub fn direction(lon: f64, lat: f64) -> DVec3 {
    let (sl, cl) = lat.sin_cos();
    DVec3::new(cl * lon.cos(), sl, -cl * lon.sin())
}

/// (longitude, latitude) in radians of a direction; the zero vector maps to (0, 0).
#[inline]
pub fn angles(v: DVec3) -> (f64, f64) {
    let len = v.length();
    if len < 1e-12 {
        return (0.0, 0.0);
    }
    let lon = (-v.z).atan2(v.x);
    let lat = (v.y / len).clamp(-1.0, 1.0).asin();
    (lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewportParams;
    use std::f64::consts::PI;

    #[test]
    fn test_direction_angles_round_trip() {
        for &(lon, lat) in &[(0.0, 0.0), (1.0, 0.3), (-2.5, -1.2), (3.0, 1.5)] {
            let (l2, p2) = angles(direction(lon, lat));
            assert!((l2 - lon).abs() < 1e-12);
            assert!((p2 - lat).abs() < 1e-12);
        }
        assert!((direction(0.0, 0.0) - DVec3::X).length() < 1e-12);
        assert!((direction(0.0, PI / 2.0) - DVec3::Y).length() < 1e-12);
    }

    fn descriptor(g: GeometryType, w: usize, h: usize) -> VideoDescriptor {
        let mut d = VideoDescriptor::new(g, w, h, ChromaFormat::Yuv420);
        if g == GeometryType::Viewport {
            d.viewport = Some(ViewportParams::default());
        }
        d
    }

    /// Test: map3DTo2D(map2DTo3D(p)) for every geometry
    /// Validates: interior positions round-trip within one sample
    #[test]
    fn test_round_trip_all_geometries() {
        let cases = [
            (GeometryType::EquiRect, 64, 32),
            (GeometryType::EqualArea, 64, 32),
            (GeometryType::CrastersParabolic, 64, 32),
            (GeometryType::CubeMap, 32, 32),
            (GeometryType::Octahedron, 32, 28),
            (GeometryType::Icosahedron, 32, 28),
            (GeometryType::Viewport, 40, 30),
        ];
        for (g, w, h) in cases {
            let kind = GeometryKind::from_descriptor(&descriptor(g, w, h)).unwrap();
            for face in 0..kind.num_faces() {
                for y in 1..h - 1 {
                    for x in 1..w - 1 {
                        let (u, v) = (x as f64 + 0.5, y as f64 + 0.5);
                        if !kind.inside_footprint(face, u, v) {
                            continue;
                        }
                        let p = Position::planar(face, x as f64, y as f64);
                        let s = kind.map_2d_to_3d(&p);
                        assert!((s.vec3().length() - 1.0).abs() < 1e-9, "{:?} not unit", g);
                        let q = kind.map_3d_to_2d(&s);
                        assert_eq!(q.face, face, "{:?} face at ({}, {})", g, x, y);
                        assert!(
                            (q.x - p.x).abs() < 1.0 && (q.y - p.y).abs() < 1.0,
                            "{:?} face {} ({}, {}) -> ({}, {})",
                            g,
                            face,
                            x,
                            y,
                            q.x,
                            q.y
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_factory_rejects_bad_combinations() {
        let cube = descriptor(GeometryType::CubeMap, 32, 16);
        assert!(GeometryKind::from_descriptor(&cube).is_err());

        let mut vp = descriptor(GeometryType::Viewport, 32, 32);
        vp.viewport = None;
        assert!(GeometryKind::from_descriptor(&vp).is_err());

        let mut erp = descriptor(GeometryType::EquiRect, 32, 16);
        erp.compact = CompactVariant::Layout1;
        assert!(GeometryKind::from_descriptor(&erp).is_err());

        let mut ico = descriptor(GeometryType::Icosahedron, 32, 28);
        ico.compact = CompactVariant::Layout2;
        assert!(GeometryKind::from_descriptor(&ico).is_err());
    }
}
