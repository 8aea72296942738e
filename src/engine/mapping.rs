//! Weight maps and geometry-to-geometry resampling.
//!
//! A weight map is owned by the destination geometry. It has one entry per
//! destination sample (margin included, in buffer order) naming the source
//! face, the flat offset of the top-left filter tap in that face's buffer and
//! the weight cell to apply. The map records which source it was built for
//! and is rebuilt when a different source comes along.

use std::time::Instant;

use log::{debug, info, trace, warn};
use rayon::prelude::*;

use super::Geometry;
use crate::chroma::shift_bit_depth;
use crate::config::{ChromaFormat, GeometryType, ViewportParams, max_value, neutral_value};
use crate::error::{GeoError, GeoResult};
use crate::face_buffer::FaceBuffer;
use crate::filters::{InterpolationFilter, margin_for_taps};
use crate::geometry::{Position, Projection};

/// Everything about a source geometry that a weight map depends on.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SourceKey {
    pub geometry: GeometryType,
    pub face_size: (usize, usize),
    pub format: ChromaFormat,
    pub sample_loc: u8,
    pub margin: usize,
    pub rotation: [f64; 3],
    pub viewport: Option<ViewportParams>,
}

/// Where one output sample reads from.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MapEntry {
    pub face: u16,
    pub nearest: bool,
    pub cell: u32,
    /// Flat index of the top-left tap in the source face buffer
    pub offset: u32,
}

impl MapEntry {
    /// Read this entry's value from a channel's face buffers.
    #[inline]
    pub fn sample(&self, faces: &[&FaceBuffer], filter: &InterpolationFilter, max: i64) -> u16 {
        let buf = faces[self.face as usize];
        if self.nearest {
            buf.data()[self.offset as usize]
        } else {
            filter
                .apply(buf.data(), self.offset as usize, buf.stride(), self.cell)
                .clamp(0, max) as u16
        }
    }
}

/// Entries of one channel, one vector per destination face.
#[derive(Debug)]
struct ChannelMap {
    faces: Vec<Vec<MapEntry>>,
}

/// Destination-owned resampling map.
#[derive(Debug)]
pub(crate) struct WeightMap {
    source: SourceKey,
    /// None where the source lacks the channel
    channels: Vec<Option<ChannelMap>>,
}

/// Clamp channel coordinates into the face rectangle.
#[inline]
pub(crate) fn clamp_to_face(x: f64, y: f64, width: usize, height: usize) -> (f64, f64) {
    (
        x.clamp(-0.5, width as f64 - 0.5),
        y.clamp(-0.5, height as f64 - 0.5),
    )
}

impl WeightMap {
    /// Build the map that resamples `src` into `dst`.
    pub fn build(dst: &Geometry, src: &Geometry) -> GeoResult<Self> {
        let start = Instant::now();
        let to_src = src.rotation.transpose() * dst.rotation;
        let rotate = dst.desc.has_rotation() || src.desc.has_rotation();

        let mut channels = Vec::with_capacity(dst.store.channel_count());
        let mut total = 0usize;
        for ch in 0..dst.store.channel_count() {
            if ch >= src.store.channel_count() {
                channels.push(None);
                continue;
            }
            let filter = dst.filters.for_channel(ch);
            let needed = margin_for_taps(filter.taps());
            if needed > src.store.margin() {
                return Err(GeoError::unsupported(format!(
                    "{:?} filter needs source margin {}, source has {}",
                    filter.kind(),
                    needed,
                    src.store.margin()
                )));
            }

            let (sw, sh) = src.store.channel_dim(ch);
            let probe = src.store.get(0, ch);
            let mut faces = Vec::with_capacity(dst.num_faces());
            for face in 0..dst.num_faces() {
                let buf = dst.store.get(face, ch);
                let m = buf.margin() as i64;
                let (w, h) = (buf.width() as i64, buf.height() as i64);
                let rows: Vec<Vec<MapEntry>> = (-m..h + m)
                    .into_par_iter()
                    .map(|y| {
                        (-m..w + m)
                            .map(|x| {
                                let (lx, ly) = dst.channel_to_luma(ch, x as f64, y as f64);
                                let mut dir = dst.projection.map_2d_to_3d(&Position::planar(face, lx, ly)).vec3();
                                if rotate {
                                    dir = to_src * dir;
                                }
                                let q = src.projection.map_3d_to_2d(&Position::sphere(dir));
                                let (cx, cy) = src.luma_to_channel(ch, q.x, q.y);
                                let (cx, cy) = clamp_to_face(cx, cy, sw, sh);
                                let win = filter.locate(cx, cy);
                                MapEntry {
                                    face: q.face as u16,
                                    nearest: filter.taps() == 1,
                                    cell: win.cell,
                                    offset: probe.index(win.x0, win.y0) as u32,
                                }
                            })
                            .collect()
                    })
                    .collect();
                let entries: Vec<MapEntry> = rows.into_iter().flatten().collect();
                trace!("  face {} ch {}: {} entries", face, ch, entries.len());
                total += entries.len();
                faces.push(entries);
            }
            channels.push(Some(ChannelMap { faces }));
        }

        info!(
            "Built {} -> {} weight map: {} entries in {:.1} ms",
            src.desc.geometry.name(),
            dst.desc.geometry.name(),
            total,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(Self {
            source: src.source_key(),
            channels,
        })
    }

    /// Fill every destination buffer (margin included) from `src`.
    fn apply(&self, dst: &mut Geometry, src: &Geometry) {
        let src_max = max_value(src.bit_depth);
        for ch in 0..dst.store.channel_count() {
            let Some(map) = self.channels.get(ch).and_then(|c| c.as_ref()) else {
                let neutral = neutral_value(dst.bit_depth);
                for face in 0..dst.num_faces() {
                    dst.store.get_mut(face, ch).fill(neutral);
                }
                continue;
            };
            let src_faces = src.store.channel(ch);
            let filter = dst.filters.for_channel(ch);
            let (from, to) = (src.bit_depth, dst.bit_depth);
            for (face, entries) in map.faces.iter().enumerate() {
                dst.store
                    .get_mut(face, ch)
                    .data_mut()
                    .par_iter_mut()
                    .zip(entries.par_iter())
                    .for_each(|(out, e)| {
                        *out = shift_bit_depth(e.sample(&src_faces, filter, src_max), from, to);
                    });
            }
        }
    }
}

impl Geometry {
    /// Resample this geometry into `dst` through the sphere.
    ///
    /// Pads this geometry first if its margins are stale. The destination's
    /// weight map is built on first use and reused while the source stays the
    /// same; the destination counts as padded afterwards.
    pub fn geo_convert(&mut self, dst: &mut Geometry) -> GeoResult<()> {
        if !self.padded {
            self.sphere_padding(false)?;
        }
        let key = self.source_key();
        let map = match dst.convert_map.take() {
            Some(map) if map.source == key => map,
            Some(_) => {
                warn!(
                    "Source geometry changed ({}), rebuilding weight map",
                    self.desc.geometry.name()
                );
                WeightMap::build(dst, self)?
            }
            None => WeightMap::build(dst, self)?,
        };
        let start = Instant::now();
        map.apply(dst, self);
        dst.convert_map = Some(map);
        dst.padded = true;
        debug!(
            "geo_convert {} -> {} in {:.1} ms",
            self.desc.geometry.name(),
            dst.desc.geometry.name(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    }
}
