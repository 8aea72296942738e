//! Triangle-mesh face math shared by the octahedron and icosahedron.
//!
//! Every face buffer holds one apex-up triangle: apex at `(W/2, 0)`, base
//! corners at `(0, H)` and `(W, H)` in continuous coordinates. A face keeps
//! the plane frame that turns those coordinates into points on the
//! polyhedron surface; projecting onto the sphere is a normalize, and the
//! inverse is a ray/plane intersection on the face whose normal is closest to
//! the direction.
//!
//! Compact layouts (`CompactLayout`) are declared here too since both
//! polyhedra share the slot format.

use glam::DVec3;

/// One polyhedron face and its picture frame.
#[derive(Debug, Clone, Copy)]
pub struct TriFace {
    /// Apex, base-left, base-right
    pub vertices: [DVec3; 3],
    /// Surface point of continuous coordinate (0, 0)
    pub origin: DVec3,
    /// Unit picture-right / picture-down directions in the face plane
    pub basis: [DVec3; 2],
    /// Outward unit normal
    pub normal: DVec3,
    /// Surface distance per sample along each basis direction
    pub step: [f64; 2],
}

impl TriFace {
    /// Build the frame for triangle (apex, b, c). If b and c are ordered so
    /// that picture-right x picture-down points outward, they are swapped so
    /// every face reads the same way when looked at from the centre.
    fn new(apex: DVec3, b: DVec3, c: DVec3, width: f64, height: f64) -> Self {
        let normal = (apex + b + c).normalize();
        let (b, c) = if (c - b).cross((b + c) * 0.5 - apex).dot(normal) > 0.0 {
            (c, b)
        } else {
            (b, c)
        };
        let right = c - b;
        let down = (b + c) * 0.5 - apex;
        let step = [right.length() / width, down.length() / height];
        let basis = [right.normalize(), down.normalize()];
        let origin = apex - basis[0] * (step[0] * width / 2.0);
        Self {
            vertices: [apex, b, c],
            origin,
            basis,
            normal,
            step,
        }
    }

    #[inline]
    fn surface_point(&self, u: f64, v: f64) -> DVec3 {
        self.origin + self.basis[0] * (u * self.step[0]) + self.basis[1] * (v * self.step[1])
    }

    /// Continuous (u, v) of direction `dir` on this face's plane.
    #[inline]
    fn plane_coords(&self, dir: DVec3) -> (f64, f64) {
        let denom = self.normal.dot(dir);
        let t = if denom.abs() < 1e-12 {
            0.0
        } else {
            self.normal.dot(self.origin) / denom
        };
        let d = dir * t - self.origin;
        (d.dot(self.basis[0]) / self.step[0], d.dot(self.basis[1]) / self.step[1])
    }
}

/// All faces of one polyhedron at a given face buffer size.
#[derive(Debug, Clone)]
pub struct TriMesh {
    faces: Vec<TriFace>,
    width: usize,
    height: usize,
}

impl TriMesh {
    /// `triangles` lists (apex, base-left, base-right) vertex indices per face.
    pub fn new(vertices: &[[f64; 3]], triangles: &[[usize; 3]], width: usize, height: usize) -> Self {
        let v = |i: usize| DVec3::from_array(vertices[i]);
        let faces = triangles
            .iter()
            .map(|&[a, b, c]| TriFace::new(v(a), v(b), v(c), width as f64, height as f64))
            .collect();
        Self {
            faces,
            width,
            height,
        }
    }

    pub fn faces(&self) -> &[TriFace] {
        &self.faces
    }

    pub fn face_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Unit direction for continuous coordinates on a face.
    pub fn to_sphere(&self, face: usize, u: f64, v: f64) -> DVec3 {
        self.faces[face].surface_point(u, v).normalize()
    }

    /// Face hit first by a ray from the centre along `dir`.
    pub fn nearest_face(&self, dir: DVec3) -> usize {
        let mut best = 0;
        let mut best_dot = f64::NEG_INFINITY;
        for (i, f) in self.faces.iter().enumerate() {
            let d = f.normal.dot(dir);
            if d > best_dot {
                best_dot = d;
                best = i;
            }
        }
        best
    }

    /// Owning face and continuous coordinates of a direction.
    pub fn to_face(&self, dir: DVec3) -> (usize, f64, f64) {
        let face = self.nearest_face(dir);
        let (u, v) = self.faces[face].plane_coords(dir);
        (face, u, v)
    }

    /// Apex-up triangle test in continuous coordinates.
    pub fn inside(&self, u: f64, v: f64) -> bool {
        let (w, h) = (self.width as f64, self.height as f64);
        v >= 0.0 && v <= h && (u - w / 2.0).abs() <= (w / 2.0) * (v / h)
    }
}

// =============================================================================
// Compact layouts
// =============================================================================

/// Part of a face placed by one compact slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    Whole,
    /// Samples with face x < W/2
    Left,
    /// Samples with face x >= W/2
    Right,
}

/// Placement of (part of) one face inside a compact strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactSlot {
    pub strip: usize,
    pub face: usize,
    pub half: Half,
    /// Rotated by 180 degrees (apex down)
    pub rotated: bool,
    /// Horizontal offset in half-face widths: raster x = face x + shift * W/2
    pub shift: i32,
}

impl CompactSlot {
    pub const fn new(strip: usize, face: usize, half: Half, rotated: bool, shift: i32) -> Self {
        Self {
            strip,
            face,
            half,
            rotated,
            shift,
        }
    }

    /// Whether face sample column `x` of a `width`-wide face belongs to this slot.
    #[inline]
    pub fn takes_column(&self, x: usize, width: usize) -> bool {
        match self.half {
            Half::Whole => true,
            Half::Left => x < width / 2,
            Half::Right => x >= width / 2,
        }
    }

    /// Raster sample of face sample (x, y) for a `width x height` face.
    #[inline]
    pub fn place(&self, x: usize, y: usize, width: usize, height: usize) -> (i64, i64) {
        let (ox, oy) = if self.rotated {
            (width - 1 - x, height - 1 - y)
        } else {
            (x, y)
        };
        (
            ox as i64 + self.shift as i64 * (width / 2) as i64,
            (oy + self.strip * height) as i64,
        )
    }
}

/// Compact arrangement of triangles into horizontal strips.
#[derive(Debug, Clone, Copy)]
pub struct CompactLayout {
    pub strips: usize,
    /// Strip width in half-face widths
    pub strip_halves: usize,
    pub slots: &'static [CompactSlot],
}

impl CompactLayout {
    /// Packed raster size for a luma face size.
    pub fn raster_size(&self, width: usize, height: usize) -> (usize, usize) {
        (self.strip_halves * width / 2, self.strips * height)
    }
}

/// Count how often each luma raster sample is written by a layout.
/// Returns None if any slot places a footprint sample outside the raster.
#[cfg(test)]
pub(crate) fn layout_coverage(layout: &CompactLayout, mesh: &TriMesh) -> Option<Vec<u32>> {
    let (w, h) = mesh.face_size();
    let (rw, rh) = layout.raster_size(w, h);
    let mut hits = vec![0u32; rw * rh];
    for slot in layout.slots {
        for y in 0..h {
            for x in 0..w {
                if !slot.takes_column(x, w) || !mesh.inside(x as f64 + 0.5, y as f64 + 0.5) {
                    continue;
                }
                let (rx, ry) = slot.place(x, y, w, h);
                if rx < 0 || ry < 0 || rx as usize >= rw || ry as usize >= rh {
                    return None;
                }
                hits[ry as usize * rw + rx as usize] += 1;
            }
        }
    }
    Some(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_is_orthogonal() {
        let mesh = TriMesh::new(
            &[[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
            &[[0, 1, 2]],
            32,
            28,
        );
        let f = mesh.faces()[0];
        assert!(f.basis[0].dot(f.basis[1]).abs() < 1e-12);
        assert!(f.basis[0].dot(f.normal).abs() < 1e-12);
        // picture-right x picture-down points inward
        assert!(f.basis[0].cross(f.basis[1]).dot(f.normal) < 0.0);
    }

    #[test]
    fn test_vertices_map_to_corners() {
        let verts = [[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]];
        let mesh = TriMesh::new(&verts, &[[0, 1, 2]], 32, 28);
        let f = mesh.faces()[0];
        let apex = mesh.to_sphere(0, 16.0, 0.0);
        assert!((apex - f.vertices[0]).length() < 1e-12);
        let left = mesh.to_sphere(0, 0.0, 28.0);
        assert!((left - f.vertices[1]).length() < 1e-12);
        let (_, u, v) = mesh.to_face(f.vertices[2]);
        assert!((u - 32.0).abs() < 1e-9 && (v - 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_inside_triangle() {
        let mesh = TriMesh::new(
            &[[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
            &[[0, 1, 2]],
            32,
            28,
        );
        assert!(mesh.inside(16.0, 0.0));
        assert!(mesh.inside(0.5, 27.9));
        assert!(!mesh.inside(2.0, 5.0));
        assert!(!mesh.inside(16.0, 28.5));
    }

    #[test]
    fn test_slot_place() {
        let s = CompactSlot::new(1, 4, Half::Whole, true, 2);
        assert_eq!(s.place(0, 0, 8, 6), (7 + 8, 5 + 6));
        let r = CompactSlot::new(0, 0, Half::Right, false, -1);
        assert!(r.takes_column(4, 8) && !r.takes_column(3, 8));
        assert_eq!(r.place(4, 2, 8, 6), (0, 2));
    }
}
