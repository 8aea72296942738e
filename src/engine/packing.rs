//! Grid frame packing: faces <-> packed raster.
//!
//! The raster is a `rows x cols` grid of equal cells. Each cell shows one
//! face, optionally flipped horizontally and then rotated clockwise by a
//! multiple of 90 degrees. Chroma format and bit depth are converted per
//! face. Compact triangle layouts are handled in `compact` and dispatched
//! from here.

use log::{debug, warn};

use super::Geometry;
use crate::chroma::{convert_plane, shift_plane};
use crate::config::{CompactVariant, FaceSlot, Rotation, neutral_value};
use crate::error::{GeoError, GeoResult};
use crate::frame::{Plane, RasterFrame};
use crate::geometry::{Position, Projection};

/// Cell position of face sample (x, y) for a `w x h` face (integer samples).
#[inline]
fn place(slot: &FaceSlot, x: usize, y: usize, w: usize, h: usize) -> (usize, usize) {
    let x = if slot.flip { w - 1 - x } else { x };
    match slot.rotation {
        Rotation::R0 => (x, y),
        Rotation::R90 => (h - 1 - y, x),
        Rotation::R180 => (w - 1 - x, h - 1 - y),
        Rotation::R270 => (y, w - 1 - x),
    }
}

/// Continuous version of `place` for luma sample coordinates.
#[inline]
fn place_continuous(slot: &FaceSlot, x: f64, y: f64, w: f64, h: f64) -> (f64, f64) {
    let x = if slot.flip { w - 1.0 - x } else { x };
    match slot.rotation {
        Rotation::R0 => (x, y),
        Rotation::R90 => (h - 1.0 - y, x),
        Rotation::R180 => (w - 1.0 - x, h - 1.0 - y),
        Rotation::R270 => (y, w - 1.0 - x),
    }
}

impl Geometry {
    /// Luma (width, height) of one grid cell.
    fn cell_size(&self) -> (usize, usize) {
        let (w, h) = self.face_size();
        let transposed = self
            .desc
            .frame_pack
            .slots
            .iter()
            .flatten()
            .find(|s| s.face.is_some_and(|f| f < self.num_faces()))
            .is_some_and(|s| s.rotation.is_transposed());
        if transposed { (h, w) } else { (w, h) }
    }

    /// Luma size of the packed raster.
    pub fn packed_size(&self) -> (usize, usize) {
        if let Some(layout) = self.projection.compact_layout(self.desc.compact) {
            let (w, h) = self.face_size();
            return layout.raster_size(w, h);
        }
        let (cw, ch) = self.cell_size();
        let fp = &self.desc.frame_pack;
        (fp.cols * cw, fp.rows * ch)
    }

    /// Neutral raster sized and formatted for this geometry's packing.
    pub fn new_packed_raster(&self, bit_depth: u8) -> GeoResult<RasterFrame> {
        let (w, h) = self.packed_size();
        RasterFrame::new(w, h, self.desc.frame_pack.chroma_format, bit_depth)
    }

    pub(crate) fn check_raster(&self, raster: &RasterFrame) -> GeoResult<()> {
        let expected = self.packed_size();
        if raster.dim() != expected {
            return Err(GeoError::mismatch("packed raster", expected, raster.dim()));
        }
        Ok(())
    }

    /// Valid face id of a slot, None for empty cells.
    fn slot_face(&self, slot: &FaceSlot) -> Option<usize> {
        slot.face.filter(|&f| f < self.num_faces())
    }

    /// Unpack a raster into the face buffers, converting chroma format and
    /// bit depth to the internal representation. Margins become stale.
    pub fn convert_yuv(&mut self, raster: &RasterFrame) -> GeoResult<()> {
        self.check_raster(raster)?;
        if self.desc.compact != CompactVariant::Off {
            return self.compact_frame_pack_convert_yuv(raster);
        }
        let fp = self.desc.frame_pack.clone();
        let (cell_w, cell_h) = self.cell_size();
        let (w, h) = self.face_size();
        let fmt_in = raster.format();
        let fmt = self.store.format();
        let siting = self.params.chroma_siting();

        for (r, row) in fp.slots.iter().enumerate() {
            for (c, slot) in row.iter().enumerate() {
                let Some(face) = self.slot_face(slot) else {
                    continue;
                };
                for ch in 0..self.store.channel_count() {
                    if ch >= raster.channel_count() {
                        let neutral = neutral_value(self.bit_depth);
                        self.store.get_mut(face, ch).fill(neutral);
                        continue;
                    }
                    let (sx, sy) = fmt_in.scale(ch);
                    let (fw, fh) = (w / sx, h / sy);
                    let (ox, oy) = (c * cell_w / sx, r * cell_h / sy);
                    let src = raster.plane(ch);
                    let mut plane = Plane::new(fw, fh)?;
                    for y in 0..fh {
                        for x in 0..fw {
                            let (px, py) = place(slot, x, y, fw, fh);
                            plane.set(x, y, src.get(ox + px, oy + py));
                        }
                    }
                    shift_plane(&mut plane, raster.bit_depth(), self.bit_depth);
                    if ch > 0 && fmt_in != fmt {
                        plane = convert_plane(&plane, ch, fmt_in, fmt, siting, self.bit_depth)?;
                    }
                    let buf = self.store.get_mut(face, ch);
                    for y in 0..plane.height() {
                        buf.interior_row_mut(y).copy_from_slice(plane.row(y));
                    }
                }
            }
        }
        for face in 0..self.num_faces() {
            if fp.find(face).is_none() {
                warn!("Face {} has no frame pack slot, left unchanged", face);
            }
        }
        self.padded = false;
        debug!(
            "Unpacked {}x{} {:?} raster into {} faces",
            raster.width(),
            raster.height(),
            fmt_in,
            self.num_faces()
        );
        Ok(())
    }

    /// Pack the face buffers into a raster, converting to the raster's chroma
    /// format and bit depth. Samples outside a face footprint and empty cells
    /// are written neutral.
    pub fn frame_pack(&self, raster: &mut RasterFrame) -> GeoResult<()> {
        self.check_raster(raster)?;
        if self.desc.compact != CompactVariant::Off {
            return self.compact_frame_pack(raster);
        }
        let fp = &self.desc.frame_pack;
        let (cell_w, cell_h) = self.cell_size();
        let fmt_out = raster.format();
        let fmt = self.store.format();
        let out_bd = raster.bit_depth();
        let siting = self.params.chroma_siting();
        let rectangular = self.projection.is_rectangular();

        for (r, row) in fp.slots.iter().enumerate() {
            for (c, slot) in row.iter().enumerate() {
                for ch in 0..raster.channel_count() {
                    let (sx, sy) = fmt_out.scale(ch);
                    let (cw, chh) = (cell_w / sx, cell_h / sy);
                    let (ox, oy) = (c * cw, r * chh);
                    let face = match self.slot_face(slot) {
                        Some(f) if ch < self.store.channel_count() => f,
                        _ => {
                            let dst = raster.plane_mut(ch);
                            for y in 0..chh {
                                dst.row_mut(oy + y)[ox..ox + cw].fill(neutral_value(out_bd));
                            }
                            continue;
                        }
                    };

                    let buf = self.store.get(face, ch);
                    let mut plane = Plane::new(buf.width(), buf.height())?;
                    let neutral = neutral_value(self.bit_depth);
                    for y in 0..buf.height() {
                        plane.row_mut(y).copy_from_slice(buf.interior_row(y));
                        if !rectangular {
                            for x in 0..buf.width() {
                                if !self.inside_face(face, x as i64, y as i64, ch, ch) {
                                    plane.set(x, y, neutral);
                                }
                            }
                        }
                    }
                    if ch > 0 && fmt_out != fmt {
                        plane = convert_plane(&plane, ch, fmt, fmt_out, siting, self.bit_depth)?;
                    }
                    shift_plane(&mut plane, self.bit_depth, out_bd);

                    let (fw, fh) = plane.dim();
                    let dst = raster.plane_mut(ch);
                    for y in 0..fh {
                        for x in 0..fw {
                            let (px, py) = place(slot, x, y, fw, fh);
                            dst.set(ox + px, oy + py, plane.get(x, y));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Packed raster position of a face-local luma position, None when the
    /// face is not part of the packing.
    pub fn geo_to_frame_pack(&self, pos: &Position) -> Option<Position> {
        if let Some(layout) = self.projection.compact_layout(self.desc.compact) {
            return self.compact_geo_to_frame_pack(layout, pos);
        }
        let (r, c, slot) = self.desc.frame_pack.find(pos.face)?;
        let (w, h) = self.face_size();
        let (cell_w, cell_h) = self.cell_size();
        let (x, y) = place_continuous(&slot, pos.x, pos.y, w as f64, h as f64);
        Some(Position::planar(
            0,
            x + (c * cell_w) as f64,
            y + (r * cell_h) as f64,
        ))
    }
}
