//! Sphere padding.
//!
//! Every sample of the padded extent that is not inside its face's footprint
//! (margins, plus the corners of triangle and lens faces) is refilled from
//! the face that owns its sphere direction. The filter runs only when its
//! whole window lies in the owner's footprint; otherwise the nearest
//! footprint sample is copied. Values are gathered before any is written, so
//! repeating the pass changes nothing.
//!
//! Cube corners are skipped by the sphere pass and filled afterwards from
//! the two margin strips that meet there.

use std::time::Instant;

use log::{debug, trace};
use rayon::prelude::*;

use super::Geometry;
use super::mapping::{MapEntry, clamp_to_face};
use crate::config::{GeometryType, max_value};
use crate::error::GeoResult;
use crate::face_buffer::FaceStore;
use crate::filters::{FilterWindow, InterpolationFilter};
use crate::geometry::{Position, Projection};

#[derive(Debug, Clone, Copy)]
struct PadEntry {
    face: u16,
    /// Flat index of the padded sample in its own buffer
    dst: u32,
    src: MapEntry,
}

/// Per-channel list of samples to refill.
#[derive(Debug)]
pub(crate) struct PaddingMap {
    channels: Vec<Vec<PadEntry>>,
}

#[inline]
fn is_corner(x: i64, y: i64, w: i64, h: i64) -> bool {
    (x < 0 || x >= w) && (y < 0 || y >= h)
}

impl PaddingMap {
    pub fn build(g: &Geometry) -> GeoResult<Self> {
        let start = Instant::now();
        let skip_corners = g.desc.geometry == GeometryType::CubeMap;
        let mut channels = Vec::with_capacity(g.store.channel_count());
        for ch in 0..g.store.channel_count() {
            let filter = g.filters.for_channel(ch);
            let probe = g.store.get(0, ch);
            let (w, h) = (probe.width() as i64, probe.height() as i64);
            let m = probe.margin() as i64;
            let mut entries = Vec::new();
            for face in 0..g.num_faces() {
                let rows: Vec<Vec<PadEntry>> = (-m..h + m)
                    .into_par_iter()
                    .map(|y| {
                        (-m..w + m)
                            .filter(|&x| !(skip_corners && is_corner(x, y, w, h)))
                            .filter(|&x| !g.inside_face(face, x, y, ch, ch))
                            .map(|x| PadEntry {
                                face: face as u16,
                                dst: probe.index(x, y) as u32,
                                src: g.pad_source(face, ch, filter, x, y),
                            })
                            .collect()
                    })
                    .collect();
                let before = entries.len();
                entries.extend(rows.into_iter().flatten());
                trace!("  face {} ch {}: {} padded samples", face, ch, entries.len() - before);
            }
            channels.push(entries);
        }
        debug!(
            "Built {} padding map: {} samples in {:.1} ms",
            g.desc.geometry.name(),
            channels.iter().map(|c| c.len()).sum::<usize>(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(Self { channels })
    }

    fn apply(&self, g: &mut Geometry) {
        let max = max_value(g.bit_depth);
        for (ch, entries) in self.channels.iter().enumerate() {
            let filter = g.filters.for_channel(ch);
            let values: Vec<u16> = {
                let faces = g.store.channel(ch);
                entries
                    .par_iter()
                    .map(|e| e.src.sample(&faces, filter, max))
                    .collect()
            };
            for (e, v) in entries.iter().zip(values) {
                g.store.get_mut(e.face as usize, ch).data_mut()[e.dst as usize] = v;
            }
        }
    }
}

impl Geometry {
    /// Refill all non-footprint samples through the sphere.
    ///
    /// Does nothing when the margins are already valid unless `force` is set.
    pub fn sphere_padding(&mut self, force: bool) -> GeoResult<()> {
        if self.padded && !force {
            return Ok(());
        }
        let map = match self.padding_map.take() {
            Some(map) => map,
            None => PaddingMap::build(self)?,
        };
        map.apply(self);
        self.padding_map = Some(map);
        if self.desc.geometry == GeometryType::CubeMap {
            fill_cube_corners(&mut self.store);
        }
        self.padded = true;
        Ok(())
    }

    /// Source of one padded sample of `face`.
    fn pad_source(&self, face: usize, ch: usize, filter: &InterpolationFilter, x: i64, y: i64) -> MapEntry {
        let (lx, ly) = self.channel_to_luma(ch, x as f64, y as f64);
        let s = self.projection.map_2d_to_3d(&Position::planar(face, lx, ly));
        let q = self.projection.map_3d_to_2d(&s);
        let (w, h) = self.store.channel_dim(ch);
        let (cx, cy) = self.luma_to_channel(ch, q.x, q.y);
        let (cx, cy) = clamp_to_face(cx, cy, w, h);
        let probe = self.store.get(0, ch);

        let win = filter.locate(cx, cy);
        if self.window_in_footprint(q.face, ch, &win, filter.taps()) {
            return MapEntry {
                face: q.face as u16,
                nearest: filter.taps() == 1,
                cell: win.cell,
                offset: probe.index(win.x0, win.y0) as u32,
            };
        }
        let (nx, ny) = self.nearest_footprint_sample(q.face, ch, cx, cy);
        MapEntry {
            face: q.face as u16,
            nearest: true,
            cell: 0,
            offset: probe.index(nx, ny) as u32,
        }
    }

    fn window_in_footprint(&self, face: usize, ch: usize, win: &FilterWindow, taps: usize) -> bool {
        let (w, h) = self.store.channel_dim(ch);
        let (x0, y0) = (win.x0, win.y0);
        let (x1, y1) = (x0 + taps as i64 - 1, y0 + taps as i64 - 1);
        if x0 < 0 || y0 < 0 || x1 >= w as i64 || y1 >= h as i64 {
            return false;
        }
        if self.projection.is_rectangular() {
            return true;
        }
        // Triangle and lens footprints are convex
        [(x0, y0), (x1, y0), (x0, y1), (x1, y1)]
            .iter()
            .all(|&(x, y)| self.inside_face(face, x, y, ch, ch))
    }

    /// Footprint sample of `face` closest to channel position (cx, cy).
    pub(crate) fn nearest_footprint_sample(&self, face: usize, ch: usize, cx: f64, cy: f64) -> (i64, i64) {
        let (w, h) = self.store.channel_dim(ch);
        let (w, h) = (w as i64, h as i64);
        let rx = (cx.round() as i64).clamp(0, w - 1);
        let ry = (cy.round() as i64).clamp(0, h - 1);
        if self.inside_face(face, rx, ry, ch, ch) {
            return (rx, ry);
        }
        for r in 1..=w.max(h) {
            let mut best: Option<((i64, i64), f64)> = None;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx.abs() != r && dy.abs() != r {
                        continue;
                    }
                    let (x, y) = (rx + dx, ry + dy);
                    if x < 0 || y < 0 || x >= w || y >= h || !self.inside_face(face, x, y, ch, ch) {
                        continue;
                    }
                    let d = (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2);
                    if best.is_none_or(|(_, bd)| d < bd) {
                        best = Some(((x, y), d));
                    }
                }
            }
            if let Some((p, _)) = best {
                return p;
            }
        }
        (rx, ry)
    }
}

/// Fill the four margin corners of every cube face buffer.
///
/// Working in the top-left corner's frame (other corners are mirrored into
/// it), a corner sample at (-1 - i, -1 - j) copies the top strip when it is
/// further out horizontally, the left strip when further out vertically and
/// averages the two on the diagonal.
fn fill_cube_corners(store: &mut FaceStore) {
    for face in 0..store.num_faces() {
        for ch in 0..store.channel_count() {
            let buf = store.get_mut(face, ch);
            let (w, h, m) = (buf.width() as i64, buf.height() as i64, buf.margin() as i64);
            for (flip_x, flip_y) in [(false, false), (true, false), (false, true), (true, true)] {
                let at = |x: i64, y: i64| {
                    (
                        if flip_x { w - 1 - x } else { x },
                        if flip_y { h - 1 - y } else { y },
                    )
                };
                for j in 0..m {
                    for i in 0..m {
                        let top = at(j, -1 - i);
                        let left = at(-1 - j, i);
                        let v = match i.cmp(&j) {
                            std::cmp::Ordering::Greater => buf.at(top.0, top.1),
                            std::cmp::Ordering::Less => buf.at(left.0, left.1),
                            std::cmp::Ordering::Equal => {
                                let s = buf.at(top.0, top.1) as u32 + buf.at(left.0, left.1) as u32;
                                s.div_ceil(2) as u16
                            }
                        };
                        let (x, y) = at(-1 - i, -1 - j);
                        buf.set(x, y, v);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChromaFormat;
    use crate::engine::test_util::{geometry, paint_sphere};

    /// Test: ERP horizontal wrap through padding
    /// Validates: margin sample (-1, 2) equals interior sample (W - 1, 2)
    #[test]
    fn test_erp_wrap_padding() {
        let mut g = geometry(GeometryType::EquiRect, 8, 4, ChromaFormat::Yuv444, ChromaFormat::Yuv444);
        for y in 0..4 {
            for x in 0..8 {
                g.face_mut(0, 0).set(x, y, (10 * x + y) as u16);
            }
        }
        g.sphere_padding(false).unwrap();
        assert_eq!(g.face(0, 0).at(-1, 2), g.face(0, 0).at(7, 2));
        assert_eq!(g.face(0, 0).at(8, 1), g.face(0, 0).at(0, 1));
    }

    /// Test: Padding twice
    /// Validates: second pass reproduces the first exactly
    #[test]
    fn test_padding_idempotent() {
        for (kind, w, h) in [
            (GeometryType::CubeMap, 16, 16),
            (GeometryType::Icosahedron, 16, 14),
            (GeometryType::CrastersParabolic, 32, 16),
        ] {
            let mut g = geometry(kind, w, h, ChromaFormat::Yuv420, ChromaFormat::Yuv420);
            paint_sphere(&mut g);
            g.sphere_padding(false).unwrap();
            let first: Vec<Vec<u16>> = (0..g.num_faces())
                .flat_map(|f| (0..3).map(move |ch| (f, ch)))
                .map(|(f, ch)| g.face(f, ch).data().to_vec())
                .collect();
            g.sphere_padding(true).unwrap();
            let second: Vec<Vec<u16>> = (0..g.num_faces())
                .flat_map(|f| (0..3).map(move |ch| (f, ch)))
                .map(|(f, ch)| g.face(f, ch).data().to_vec())
                .collect();
            assert_eq!(first, second, "{:?}", kind);
        }
    }

    #[test]
    fn test_padding_skipped_when_valid() {
        let mut g = geometry(GeometryType::EquiRect, 16, 8, ChromaFormat::Yuv420, ChromaFormat::Yuv420);
        g.sphere_padding(false).unwrap();
        assert!(g.is_padded());
        g.face_mut(0, 0).set(-1, 0, 7);
        // face_mut marks the margin stale, so this pass runs again
        g.sphere_padding(false).unwrap();
        assert_ne!(g.face(0, 0).at(-1, 0), 7);
    }

    #[test]
    fn test_cube_corners_from_strips() {
        let mut g = geometry(GeometryType::CubeMap, 8, 8, ChromaFormat::Yuv444, ChromaFormat::Yuv444);
        paint_sphere(&mut g);
        g.sphere_padding(false).unwrap();
        let b = g.face(0, 0);
        // (-3, -2): further out horizontally, copies top strip (1, -3)
        assert_eq!(b.at(-3, -2), b.at(1, -3));
        // (-2, -3): further out vertically, copies left strip (-3, 1)
        assert_eq!(b.at(-2, -3), b.at(-3, 1));
        // bottom-right corner mirrors the rule
        assert_eq!(b.at(10, 9), b.at(6, 10));
    }

    #[test]
    fn test_triangle_corners_filled() {
        let mut g = geometry(GeometryType::Octahedron, 16, 14, ChromaFormat::Yuv444, ChromaFormat::Yuv444);
        for f in 0..8 {
            g.face_mut(f, 0).fill(50 + 10 * f as u16);
        }
        g.sphere_padding(false).unwrap();
        // (0, 0) lies outside face 0's triangle and now holds a neighbour's value
        let v = g.face(0, 0).at(0, 0);
        assert_ne!(v, 50);
        assert!((1..8).any(|f| v == 50 + 10 * f));
        assert_eq!(g.face(0, 0).at(8, 2), 50);
    }
}
