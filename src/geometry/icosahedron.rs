//! Twenty-face icosahedron.
//!
//! Poles N / S plus two rings of five vertices at latitude +-atan(1/2): the
//! upper ring U_k at longitude 72k, the lower ring L_k at 36 + 72k degrees.
//!
//! | Faces | Triangle (apex; base-left, base-right) |
//! |-------|----------------------------------------|
//! | 0..5 | N; U_k, U_k+1 |
//! | 5..10 | L_k; U_k+1, U_k |
//! | 10..15 | U_k+1; L_k, L_k+1 |
//! | 15..20 | S; L_k+1, L_k |

use super::trimesh::{CompactLayout, CompactSlot, Half, TriMesh};
use super::{Position, Projection};
use crate::config::{ChromaFormat, CompactVariant, FramePackStruct, GeometryType, Rotation};

const VERTICES: [[f64; 3]; 12] = [
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    // U0..U4
    [0.894427190999916, 0.447213595499958, 0.0],
    [0.276393202250021, 0.447213595499958, -0.850650808352040],
    [-0.723606797749979, 0.447213595499958, -0.525731112119134],
    [-0.723606797749979, 0.447213595499958, 0.525731112119133],
    [0.276393202250021, 0.447213595499958, 0.850650808352040],
    // L0..L4
    [0.723606797749979, -0.447213595499958, -0.525731112119134],
    [-0.276393202250021, -0.447213595499958, -0.850650808352040],
    [-0.894427190999916, -0.447213595499958, 0.0],
    [-0.276393202250021, -0.447213595499958, 0.850650808352040],
    [0.723606797749979, -0.447213595499958, 0.525731112119134],
];

const N: usize = 0;
const S: usize = 1;

const fn upper(k: usize) -> usize {
    2 + k % 5
}

const fn lower(k: usize) -> usize {
    7 + k % 5
}

const fn triangles() -> [[usize; 3]; 20] {
    let mut t = [[0usize; 3]; 20];
    let mut k = 0;
    while k < 5 {
        t[k] = [N, upper(k), upper(k + 1)];
        t[5 + k] = [lower(k), upper(k + 1), upper(k)];
        t[10 + k] = [upper(k + 1), lower(k), lower(k + 1)];
        t[15 + k] = [S, lower(k + 1), lower(k)];
        k += 1;
    }
    t
}

const TRIANGLES: [[usize; 3]; 20] = triangles();

/// Middle band strip over the polar strip, 5W x 2H.
pub static COMPACT_LAYOUT1: CompactLayout = CompactLayout {
    strips: 2,
    strip_halves: 10,
    slots: &[
        CompactSlot::new(0, 14, Half::Right, false, -1),
        CompactSlot::new(0, 14, Half::Left, false, 9),
        CompactSlot::new(0, 5, Half::Whole, true, 0),
        CompactSlot::new(0, 10, Half::Whole, false, 1),
        CompactSlot::new(0, 6, Half::Whole, true, 2),
        CompactSlot::new(0, 11, Half::Whole, false, 3),
        CompactSlot::new(0, 7, Half::Whole, true, 4),
        CompactSlot::new(0, 12, Half::Whole, false, 5),
        CompactSlot::new(0, 8, Half::Whole, true, 6),
        CompactSlot::new(0, 13, Half::Whole, false, 7),
        CompactSlot::new(0, 9, Half::Whole, true, 8),
        CompactSlot::new(1, 0, Half::Right, false, -1),
        CompactSlot::new(1, 0, Half::Left, false, 9),
        CompactSlot::new(1, 15, Half::Whole, true, 0),
        CompactSlot::new(1, 1, Half::Whole, false, 1),
        CompactSlot::new(1, 16, Half::Whole, true, 2),
        CompactSlot::new(1, 2, Half::Whole, false, 3),
        CompactSlot::new(1, 17, Half::Whole, true, 4),
        CompactSlot::new(1, 3, Half::Whole, false, 5),
        CompactSlot::new(1, 18, Half::Whole, true, 6),
        CompactSlot::new(1, 4, Half::Whole, false, 7),
        CompactSlot::new(1, 19, Half::Whole, true, 8),
    ],
};

#[derive(Debug, Clone)]
pub struct Icosahedron {
    mesh: TriMesh,
}

impl Icosahedron {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            mesh: TriMesh::new(&VERTICES, &TRIANGLES, width, height),
        }
    }

    pub fn mesh(&self) -> &TriMesh {
        &self.mesh
    }
}

impl Projection for Icosahedron {
    fn geometry_type(&self) -> GeometryType {
        GeometryType::Icosahedron
    }

    fn face_size(&self) -> (usize, usize) {
        self.mesh.face_size()
    }

    fn map_2d_to_3d(&self, pos: &Position) -> Position {
        Position::sphere(self.mesh.to_sphere(pos.face, pos.x + 0.5, pos.y + 0.5))
    }

    fn map_3d_to_2d(&self, pos: &Position) -> Position {
        let (face, u, v) = self.mesh.to_face(pos.vec3());
        Position::planar(face, u - 0.5, v - 0.5)
    }

    fn inside_footprint(&self, _face: usize, u: f64, v: f64) -> bool {
        self.mesh.inside(u, v)
    }

    fn is_rectangular(&self) -> bool {
        false
    }

    /// 5x4: one row per face group, downward-pointing groups rotated 180
    fn default_frame_pack(&self, chroma_format: ChromaFormat) -> FramePackStruct {
        let row = |first: usize, rotation: Rotation| -> Vec<(usize, Rotation)> {
            (first..first + 5).map(|f| (f, rotation)).collect()
        };
        let rows = [
            row(0, Rotation::R0),
            row(5, Rotation::R180),
            row(10, Rotation::R0),
            row(15, Rotation::R180),
        ];
        let table: Vec<&[(usize, Rotation)]> = rows.iter().map(|r| r.as_slice()).collect();
        FramePackStruct::from_table(chroma_format, &table)
    }

    fn compact_layout(&self, variant: CompactVariant) -> Option<&'static CompactLayout> {
        match variant {
            CompactVariant::Layout1 => Some(&COMPACT_LAYOUT1),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::trimesh::layout_coverage;
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_vertices_on_unit_sphere() {
        for v in VERTICES {
            assert!((DVec3::from_array(v).length() - 1.0).abs() < 1e-12);
        }
    }

    /// Test: All faces are congruent and point outward
    /// Validates: vertex table and triangle ordering
    #[test]
    fn test_faces_regular() {
        let ico = Icosahedron::new(32, 28);
        let edge = (DVec3::from_array(VERTICES[2]) - DVec3::from_array(VERTICES[0])).length();
        for (i, f) in ico.mesh().faces().iter().enumerate() {
            let [a, b, c] = f.vertices;
            for d in [(a - b).length(), (b - c).length(), (c - a).length()] {
                assert!((d - edge).abs() < 1e-9, "face {} edge {}", i, d);
            }
            assert!(f.normal.dot(a + b + c) > 0.0);
        }
    }

    #[test]
    fn test_poles_owned_by_cap_faces() {
        let ico = Icosahedron::new(32, 28);
        let n = ico.map_3d_to_2d(&Position::sphere(DVec3::new(0.2, 1.0, -0.1)));
        assert!(n.face < 5);
        let s = ico.map_3d_to_2d(&Position::sphere(DVec3::new(0.2, -1.0, -0.1)));
        assert!((15..20).contains(&s.face));
    }

    #[test]
    fn test_compact_layout_tiles() {
        let ico = Icosahedron::new(32, 28);
        let hits = layout_coverage(&COMPACT_LAYOUT1, ico.mesh()).expect("slot outside raster");
        assert!(hits.iter().all(|&h| h >= 1));
        assert_eq!(COMPACT_LAYOUT1.raster_size(32, 28), (160, 56));
        assert!(ico.compact_layout(CompactVariant::Layout2).is_none());
    }
}
