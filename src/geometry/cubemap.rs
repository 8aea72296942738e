//! Six-face cube map.
//!
//! Face order is PX, NX, PY, NY, PZ, NZ. Each face is a square seen from the
//! cube centre with picture-right / picture-down directions:
//!
//! | Face | Normal | Right | Down |
//! |------|--------|-------|------|
//! | 0 PX | +x | -z | -y |
//! | 1 NX | -x | +z | -y |
//! | 2 PY | +y | +x | +z |
//! | 3 NY | -y | +x | -z |
//! | 4 PZ | +z | +x | -y |
//! | 5 NZ | -z | -x | -y |

use glam::DVec3;

use super::{Position, Projection};
use crate::config::{ChromaFormat, FramePackStruct, GeometryType, Rotation};

pub const FACE_PX: usize = 0;
pub const FACE_NX: usize = 1;
pub const FACE_PY: usize = 2;
pub const FACE_NY: usize = 3;
pub const FACE_PZ: usize = 4;
pub const FACE_NZ: usize = 5;

#[derive(Debug, Clone)]
pub struct CubeMap {
    size: usize,
}

impl CubeMap {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    /// Cube surface point for face coordinates pu, pv in [-1, 1].
    fn face_vector(face: usize, pu: f64, pv: f64) -> DVec3 {
        match face {
            FACE_PX => DVec3::new(1.0, -pv, -pu),
            FACE_NX => DVec3::new(-1.0, -pv, pu),
            FACE_PY => DVec3::new(pu, 1.0, pv),
            FACE_NY => DVec3::new(pu, -1.0, -pv),
            FACE_PZ => DVec3::new(pu, -pv, 1.0),
            _ => DVec3::new(-pu, -pv, -1.0),
        }
    }

    /// Face owning a direction and its (pu, pv).
    fn project(v: DVec3) -> (usize, f64, f64) {
        let a = v.abs();
        if a.x >= a.y && a.x >= a.z {
            if v.x > 0.0 {
                (FACE_PX, -v.z / a.x, -v.y / a.x)
            } else {
                (FACE_NX, v.z / a.x, -v.y / a.x)
            }
        } else if a.y >= a.z {
            if v.y > 0.0 {
                (FACE_PY, v.x / a.y, v.z / a.y)
            } else {
                (FACE_NY, v.x / a.y, -v.z / a.y)
            }
        } else if v.z > 0.0 {
            (FACE_PZ, v.x / a.z, -v.y / a.z)
        } else {
            (FACE_NZ, -v.x / a.z, -v.y / a.z)
        }
    }
}

impl Projection for CubeMap {
    fn geometry_type(&self) -> GeometryType {
        GeometryType::CubeMap
    }

    fn face_size(&self) -> (usize, usize) {
        (self.size, self.size)
    }

    fn map_2d_to_3d(&self, pos: &Position) -> Position {
        let n = self.size as f64;
        let pu = 2.0 * (pos.x + 0.5) / n - 1.0;
        let pv = 2.0 * (pos.y + 0.5) / n - 1.0;
        Position::sphere(Self::face_vector(pos.face, pu, pv).normalize())
    }

    fn map_3d_to_2d(&self, pos: &Position) -> Position {
        let v = pos.vec3();
        if v.length_squared() < 1e-24 {
            let c = self.size as f64 / 2.0 - 0.5;
            return Position::planar(FACE_PX, c, c);
        }
        let (face, pu, pv) = Self::project(v);
        let n = self.size as f64;
        Position::planar(face, (pu + 1.0) * n / 2.0 - 0.5, (pv + 1.0) * n / 2.0 - 0.5)
    }

    /// 3x2: NX PZ PX / NY(180) NZ(270) PY
    fn default_frame_pack(&self, chroma_format: ChromaFormat) -> FramePackStruct {
        FramePackStruct::from_table(
            chroma_format,
            &[
                &[
                    (FACE_NX, Rotation::R0),
                    (FACE_PZ, Rotation::R0),
                    (FACE_PX, Rotation::R0),
                ],
                &[
                    (FACE_NY, Rotation::R180),
                    (FACE_NZ, Rotation::R270),
                    (FACE_PY, Rotation::R0),
                ],
            ],
        )
    }
}
