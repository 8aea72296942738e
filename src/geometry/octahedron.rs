//! Eight-face octahedron.
//!
//! Equator ring E0..E3 = +x, -z, -x, +z. Faces 0..3 are the upper triangles
//! (+y, E_k, E_k+1), faces 4..7 the lower ones (-y, E_k+1, E_k).

use super::trimesh::{CompactLayout, CompactSlot, Half, TriMesh};
use super::{Position, Projection};
use crate::config::{ChromaFormat, CompactVariant, FramePackStruct, GeometryType, Rotation};

const VERTICES: [[f64; 3]; 6] = [
    [1.0, 0.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
];

const TRIANGLES: [[usize; 3]; 8] = [
    [2, 0, 5],
    [2, 5, 1],
    [2, 1, 4],
    [2, 4, 0],
    [3, 5, 0],
    [3, 1, 5],
    [3, 4, 1],
    [3, 0, 4],
];

/// Two strips of two upright and two inverted triangles, 2W x 2H.
pub static COMPACT_LAYOUT1: CompactLayout = CompactLayout {
    strips: 2,
    strip_halves: 4,
    slots: &[
        CompactSlot::new(0, 0, Half::Right, false, -1),
        CompactSlot::new(0, 0, Half::Left, false, 3),
        CompactSlot::new(0, 4, Half::Whole, true, 0),
        CompactSlot::new(0, 1, Half::Whole, false, 1),
        CompactSlot::new(0, 5, Half::Whole, true, 2),
        CompactSlot::new(1, 2, Half::Right, false, -1),
        CompactSlot::new(1, 2, Half::Left, false, 3),
        CompactSlot::new(1, 6, Half::Whole, true, 0),
        CompactSlot::new(1, 3, Half::Whole, false, 1),
        CompactSlot::new(1, 7, Half::Whole, true, 2),
    ],
};

/// One strip of all eight triangles, 4W x H.
pub static COMPACT_LAYOUT2: CompactLayout = CompactLayout {
    strips: 1,
    strip_halves: 8,
    slots: &[
        CompactSlot::new(0, 0, Half::Right, false, -1),
        CompactSlot::new(0, 0, Half::Left, false, 7),
        CompactSlot::new(0, 4, Half::Whole, true, 0),
        CompactSlot::new(0, 1, Half::Whole, false, 1),
        CompactSlot::new(0, 5, Half::Whole, true, 2),
        CompactSlot::new(0, 2, Half::Whole, false, 3),
        CompactSlot::new(0, 6, Half::Whole, true, 4),
        CompactSlot::new(0, 3, Half::Whole, false, 5),
        CompactSlot::new(0, 7, Half::Whole, true, 6),
    ],
};

#[derive(Debug, Clone)]
pub struct Octahedron {
    mesh: TriMesh,
}

impl Octahedron {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            mesh: TriMesh::new(&VERTICES, &TRIANGLES, width, height),
        }
    }

    pub fn mesh(&self) -> &TriMesh {
        &self.mesh
    }
}

impl Projection for Octahedron {
    fn geometry_type(&self) -> GeometryType {
        GeometryType::Octahedron
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

    /// 4x2: upper faces upright, lower faces inverted
    fn default_frame_pack(&self, chroma_format: ChromaFormat) -> FramePackStruct {
        FramePackStruct::from_table(
            chroma_format,
            &[
                &[
                    (0, Rotation::R0),
                    (1, Rotation::R0),
                    (2, Rotation::R0),
                    (3, Rotation::R0),
                ],
                &[
                    (4, Rotation::R180),
                    (5, Rotation::R180),
                    (6, Rotation::R180),
                    (7, Rotation::R180),
                ],
            ],
        )
    }

    fn compact_layout(&self, variant: CompactVariant) -> Option<&'static CompactLayout> {
        match variant {
            CompactVariant::Layout1 => Some(&COMPACT_LAYOUT1),
            CompactVariant::Layout2 => Some(&COMPACT_LAYOUT2),
            CompactVariant::Off => None,
        }
    }
}
