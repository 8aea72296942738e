//! Compact triangle packing.
//!
//! Triangles are interleaved upright / inverted along horizontal strips
//! (`CompactLayout`); the first triangle of each strip is split in two so the
//! strip is a full rectangle. Packing works at the internal chroma format:
//! footprint samples are copied slot by slot (later slots overwrite earlier
//! ones on shared edges), seam holes are interpolated from the nearest valid
//! samples, and only then is the raster converted to its own format and bit
//! depth. Unpacking reverses the order and finally replicates each row's
//! outermost samples across the rest of the face buffer row.

use log::debug;

use super::Geometry;
use crate::chroma::{convert_plane, shift_plane};
use crate::config::neutral_value;
use crate::error::{GeoError, GeoResult};
use crate::face_buffer::FaceBuffer;
use crate::frame::{Plane, RasterFrame};
use crate::geometry::{CompactLayout, Half, Position, Projection};

/// Fill unwritten samples by inverse-distance weighting the nearest written
/// sample in each of the four axis directions.
fn fill_holes(plane: &mut Plane, written: &[bool], neutral: u16) {
    let (w, h) = plane.dim();
    let src = plane.clone();
    let valid = |x: usize, y: usize| written[y * w + x];
    for y in 0..h {
        for x in 0..w {
            if valid(x, y) {
                continue;
            }
            let mut found: Vec<(u16, f64)> = Vec::with_capacity(4);
            if let Some(l) = (0..x).rev().find(|&i| valid(i, y)) {
                found.push((src.get(l, y), (x - l) as f64));
            }
            if let Some(r) = (x + 1..w).find(|&i| valid(i, y)) {
                found.push((src.get(r, y), (r - x) as f64));
            }
            if let Some(u) = (0..y).rev().find(|&j| valid(x, j)) {
                found.push((src.get(x, u), (y - u) as f64));
            }
            if let Some(d) = (y + 1..h).find(|&j| valid(x, j)) {
                found.push((src.get(x, d), (d - y) as f64));
            }
            let v = if found.is_empty() {
                neutral
            } else {
                let (num, den) = found
                    .iter()
                    .fold((0.0, 0.0), |(n, d), &(v, dist)| (n + v as f64 / dist, d + 1.0 / dist));
                (num / den).round() as u16
            };
            plane.set(x, y, v);
        }
    }
}

/// Extend each row's written span to the full buffer interior; rows with no
/// written sample copy the nearest row that has one.
fn replicate_rows(buf: &mut FaceBuffer, written: &[bool]) {
    let (w, h) = (buf.width(), buf.height());
    let mut spans: Vec<Option<(usize, usize)>> = Vec::with_capacity(h);
    for y in 0..h {
        let row = &written[y * w..(y + 1) * w];
        let first = row.iter().position(|&b| b);
        let last = row.iter().rposition(|&b| b);
        spans.push(first.zip(last));
    }
    for (y, span) in spans.iter().enumerate() {
        let Some((first, last)) = *span else {
            continue;
        };
        let row = buf.interior_row_mut(y);
        let (lv, rv) = (row[first], row[last]);
        row[..first].fill(lv);
        row[last + 1..].fill(rv);
        // Gaps inside the span take the sample to their left
        for x in first + 1..last {
            if !written[y * w + x] {
                row[x] = row[x - 1];
            }
        }
    }
    for y in 0..h {
        if spans[y].is_some() {
            continue;
        }
        let below = (y + 1..h).find(|&j| spans[j].is_some());
        let above = (0..y).rev().find(|&j| spans[j].is_some());
        let from = match (above, below) {
            (Some(a), Some(b)) => Some(if y - a <= b - y { a } else { b }),
            (a, b) => a.or(b),
        };
        if let Some(src) = from {
            let copy = buf.interior_row(src).to_vec();
            buf.interior_row_mut(y).copy_from_slice(&copy);
        }
    }
}

impl Geometry {
    fn compact_layout_or_err(&self) -> GeoResult<&'static CompactLayout> {
        self.projection.compact_layout(self.desc.compact).ok_or_else(|| {
            GeoError::unsupported(format!(
                "{} has no compact layout {:?}",
                self.desc.geometry.name(),
                self.desc.compact
            ))
        })
    }

    /// Pack faces into a compact raster.
    pub fn compact_frame_pack(&self, raster: &mut RasterFrame) -> GeoResult<()> {
        self.check_raster(raster)?;
        let layout = self.compact_layout_or_err()?;
        let (rw, rh) = raster.dim();
        let fmt = self.store.format();
        let siting = self.params.chroma_siting();
        let neutral = neutral_value(self.bit_depth);
        let mut holes = 0usize;

        for ch in 0..raster.channel_count() {
            if ch >= self.store.channel_count() {
                let nv = neutral_value(raster.bit_depth());
                raster.plane_mut(ch).fill(nv);
                continue;
            }
            let (sx, sy) = fmt.scale(ch);
            let (pw, ph) = (rw / sx, rh / sy);
            let (fw, fh) = self.store.channel_dim(ch);
            let mut plane = Plane::filled(pw, ph, neutral)?;
            let mut written = vec![false; pw * ph];

            for slot in layout.slots {
                let buf = self.store.get(slot.face, ch);
                for y in 0..fh {
                    for x in 0..fw {
                        if !slot.takes_column(x, fw) || !self.inside_face(slot.face, x as i64, y as i64, ch, ch) {
                            continue;
                        }
                        let (px, py) = slot.place(x, y, fw, fh);
                        if px < 0 || py < 0 || px as usize >= pw || py as usize >= ph {
                            continue;
                        }
                        let (px, py) = (px as usize, py as usize);
                        plane.set(px, py, buf.at(x as i64, y as i64));
                        written[py * pw + px] = true;
                    }
                }
            }
            holes += written.iter().filter(|&&b| !b).count();
            fill_holes(&mut plane, &written, neutral);

            if raster.format() != fmt && ch > 0 {
                plane = convert_plane(&plane, ch, fmt, raster.format(), siting, self.bit_depth)?;
            }
            shift_plane(&mut plane, self.bit_depth, raster.bit_depth());
            raster.set_plane(ch, plane)?;
        }
        debug!("Compact pack {}x{}: {} seam samples interpolated", rw, rh, holes);
        Ok(())
    }

    /// Unpack a compact raster into the face buffers.
    pub fn compact_frame_pack_convert_yuv(&mut self, raster: &RasterFrame) -> GeoResult<()> {
        self.check_raster(raster)?;
        let layout = self.compact_layout_or_err()?;
        let fmt = self.store.format();
        let siting = self.params.chroma_siting();

        for ch in 0..self.store.channel_count() {
            if ch >= raster.channel_count() {
                let neutral = neutral_value(self.bit_depth);
                for face in 0..self.num_faces() {
                    self.store.get_mut(face, ch).fill(neutral);
                }
                continue;
            }
            let mut plane = raster.plane(ch).clone();
            shift_plane(&mut plane, raster.bit_depth(), self.bit_depth);
            if raster.format() != fmt && ch > 0 {
                plane = convert_plane(&plane, ch, raster.format(), fmt, siting, self.bit_depth)?;
            }
            let (pw, ph) = plane.dim();
            let (fw, fh) = self.store.channel_dim(ch);
            let mut written = vec![vec![false; fw * fh]; self.num_faces()];

            for slot in layout.slots {
                for y in 0..fh {
                    for x in 0..fw {
                        if !slot.takes_column(x, fw) || !self.inside_face(slot.face, x as i64, y as i64, ch, ch) {
                            continue;
                        }
                        let (px, py) = slot.place(x, y, fw, fh);
                        if px < 0 || py < 0 || px as usize >= pw || py as usize >= ph {
                            continue;
                        }
                        let v = plane.get(px as usize, py as usize);
                        self.store.get_mut(slot.face, ch).set(x as i64, y as i64, v);
                        written[slot.face][y * fw + x] = true;
                    }
                }
            }
            for (face, mask) in written.iter().enumerate() {
                replicate_rows(self.store.get_mut(face, ch), mask);
            }
        }
        self.padded = false;
        Ok(())
    }

    /// Raster position of a face-local luma position under a compact layout.
    pub(crate) fn compact_geo_to_frame_pack(&self, layout: &CompactLayout, pos: &Position) -> Option<Position> {
        let (w, h) = self.face_size();
        let (wf, hf) = (w as f64, h as f64);
        let left = pos.x + 0.5 < wf / 2.0;
        let slot = layout.slots.iter().find(|s| {
            s.face == pos.face
                && match s.half {
                    Half::Whole => true,
                    Half::Left => left,
                    Half::Right => !left,
                }
        })?;
        let (x, y) = if slot.rotated {
            (wf - 1.0 - pos.x, hf - 1.0 - pos.y)
        } else {
            (pos.x, pos.y)
        };
        Some(Position::planar(
            0,
            x + slot.shift as f64 * wf / 2.0,
            y + (slot.strip * h) as f64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChromaFormat, CompactVariant, GeometryType, InterpolationParams, VideoDescriptor};
    use crate::engine::test_util::paint_sphere;

    fn compact(kind: GeometryType, variant: CompactVariant, fmt: ChromaFormat) -> Geometry {
        let mut desc = VideoDescriptor::new(kind, 16, 14, fmt);
        desc.compact = variant;
        let params = InterpolationParams {
            chroma_format: fmt,
            ..Default::default()
        };
        Geometry::create(desc, params).unwrap()
    }

    /// Test: Pack then unpack with the same layout
    /// Validates: every footprint sample survives unchanged
    #[test]
    fn test_compact_round_trip() {
        for (kind, variant) in [
            (GeometryType::Octahedron, CompactVariant::Layout1),
            (GeometryType::Octahedron, CompactVariant::Layout2),
            (GeometryType::Icosahedron, CompactVariant::Layout1),
        ] {
            let mut g = compact(kind, variant, ChromaFormat::Yuv444);
            paint_sphere(&mut g);
            let mut raster = g.new_packed_raster(8).unwrap();
            g.frame_pack(&mut raster).unwrap();

            let mut back = compact(kind, variant, ChromaFormat::Yuv444);
            back.convert_yuv(&raster).unwrap();
            let layout = g.projection().compact_layout(variant).unwrap();
            let mut differing = 0;
            for face in 0..g.num_faces() {
                for y in 0..14 {
                    for x in 0..16 {
                        if !g.inside_face(face, x, y, 0, 0) {
                            continue;
                        }
                        if g.face(face, 0).at(x, y) != back.face(face, 0).at(x, y) {
                            differing += 1;
                        }
                    }
                }
            }
            assert_eq!(differing, 0, "{:?} {:?}", kind, variant);
            assert_eq!(raster.dim(), layout.raster_size(16, 14));
        }
    }

    /// Test: Unpack then pack a 4:2:0 compact raster
    /// Validates: every raster sample covered by a slot comes back unchanged
    #[test]
    fn test_compact_raster_round_trip_420() {
        for (kind, variant) in [
            (GeometryType::Octahedron, CompactVariant::Layout1),
            (GeometryType::Octahedron, CompactVariant::Layout2),
            (GeometryType::Icosahedron, CompactVariant::Layout1),
        ] {
            let mut g = compact(kind, variant, ChromaFormat::Yuv420);
            let mut input = g.new_packed_raster(8).unwrap();
            for ch in 0..3 {
                let (w, h) = input.plane(ch).dim();
                for y in 0..h {
                    for x in 0..w {
                        input.plane_mut(ch).set(x, y, ((x * 5 + y * 11 + ch * 29) % 251) as u16);
                    }
                }
            }
            g.convert_yuv(&input).unwrap();
            let mut out = g.new_packed_raster(8).unwrap();
            g.frame_pack(&mut out).unwrap();

            let layout = g.projection().compact_layout(variant).unwrap();
            for ch in 0..3 {
                let (fw, fh) = g.store().channel_dim(ch);
                let (pw, ph) = input.plane(ch).dim();
                let mut covered = 0;
                for slot in layout.slots {
                    for y in 0..fh {
                        for x in 0..fw {
                            if !slot.takes_column(x, fw) || !g.inside_face(slot.face, x as i64, y as i64, ch, ch) {
                                continue;
                            }
                            let (px, py) = slot.place(x, y, fw, fh);
                            if px < 0 || py < 0 || px as usize >= pw || py as usize >= ph {
                                continue;
                            }
                            let (px, py) = (px as usize, py as usize);
                            assert_eq!(
                                out.plane(ch).get(px, py),
                                input.plane(ch).get(px, py),
                                "{:?} {:?} ch {} at ({}, {})",
                                kind,
                                variant,
                                ch,
                                px,
                                py
                            );
                            covered += 1;
                        }
                    }
                }
                assert!(covered > 0);
            }
        }
    }

    #[test]
    fn test_monochrome_faces_pack_neutral_chroma() {
        let mut desc = VideoDescriptor::new(GeometryType::Octahedron, 16, 14, ChromaFormat::Yuv420);
        desc.compact = CompactVariant::Layout1;
        let params = InterpolationParams {
            chroma_format: ChromaFormat::Yuv400,
            output_bit_depth: 10,
            ..Default::default()
        };
        let g = Geometry::create(desc, params).unwrap();
        let mut raster = g.new_packed_raster(10).unwrap();
        raster.plane_mut(1).fill(0);
        g.frame_pack(&mut raster).unwrap();
        assert!(raster.plane(1).row(3).iter().all(|&v| v == 512));
        assert!(raster.plane(2).row(0).iter().all(|&v| v == 512));
    }

    #[test]
    fn test_compact_sizes() {
        let g = compact(GeometryType::Octahedron, CompactVariant::Layout1, ChromaFormat::Yuv420);
        assert_eq!(g.packed_size(), (32, 28));
        let g = compact(GeometryType::Octahedron, CompactVariant::Layout2, ChromaFormat::Yuv420);
        assert_eq!(g.packed_size(), (64, 14));
        let g = compact(GeometryType::Icosahedron, CompactVariant::Layout1, ChromaFormat::Yuv420);
        assert_eq!(g.packed_size(), (80, 28));
    }

    /// Test: Face-to-raster position agrees with the packed samples
    /// Validates: geo_to_frame_pack follows the same slot placement
    #[test]
    fn test_compact_position_matches_pixels() {
        let mut g = compact(GeometryType::Icosahedron, CompactVariant::Layout1, ChromaFormat::Yuv444);
        g.face_mut(7, 0).set(8, 10, 222);
        g.face_mut(0, 0).set(12, 12, 111);
        let mut raster = g.new_packed_raster(8).unwrap();
        g.frame_pack(&mut raster).unwrap();
        for (face, x, y, v) in [(7, 8.0, 10.0, 222), (0, 12.0, 12.0, 111)] {
            let p = g.geo_to_frame_pack(&Position::planar(face, x, y)).unwrap();
            assert_eq!(raster.plane(0).get(p.x as usize, p.y as usize), v);
        }
    }

    #[test]
    fn test_unpack_replicates_rows() {
        let mut g = compact(GeometryType::Octahedron, CompactVariant::Layout1, ChromaFormat::Yuv444);
        let mut raster = g.new_packed_raster(8).unwrap();
        raster.plane_mut(0).fill(60);
        g.convert_yuv(&raster).unwrap();
        // corner outside the triangle takes the row's edge value
        assert_eq!(g.face(2, 0).at(0, 0), 60);
        assert_eq!(g.face(2, 0).at(15, 13), 60);
    }

    #[test]
    fn test_fill_holes_weights_by_distance() {
        let mut p = Plane::new(4, 1).unwrap();
        p.set(0, 0, 100);
        p.set(3, 0, 40);
        let written = [true, false, false, true];
        fill_holes(&mut p, &written, 128);
        // x = 1: (100/1 + 40/2) / (1 + 1/2) = 80
        assert_eq!(p.get(1, 0), 80);
        assert_eq!(p.get(2, 0), 60);
    }
}
