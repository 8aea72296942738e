//! Padded per-face sample storage.
//!
//! Each (face, channel) pair owns a `FaceBuffer`: a `width x height` sample
//! area surrounded by `margin` samples on every side. Coordinates are signed
//! and relative to the top-left interior sample, so the valid range is
//! `[-margin, width + margin)` on x (same for y). Accessors are bounds-checked;
//! the flat `index()` is what weight maps store.

use crate::config::ChromaFormat;
use crate::error::{GeoError, GeoResult, try_alloc};

#[derive(Debug, Clone, PartialEq)]
pub struct FaceBuffer {
    width: usize,
    height: usize,
    margin: usize,
    stride: usize,
    data: Vec<u16>,
}

impl FaceBuffer {
    pub fn new(width: usize, height: usize, margin: usize) -> GeoResult<Self> {
        let stride = width + 2 * margin;
        let rows = height + 2 * margin;
        let data = try_alloc(stride * rows)?;
        Ok(Self {
            width,
            height,
            margin,
            stride,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn margin(&self) -> usize {
        self.margin
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// True when (x, y) lies inside the padded extent.
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        let m = self.margin as i64;
        x >= -m && y >= -m && x < self.width as i64 + m && y < self.height as i64 + m
    }

    /// Flat data index of a signed coordinate. Panics outside the padded extent.
    #[inline]
    pub fn index(&self, x: i64, y: i64) -> usize {
        assert!(
            self.contains(x, y),
            "face buffer access ({}, {}) outside {}x{} + margin {}",
            x,
            y,
            self.width,
            self.height,
            self.margin
        );
        let m = self.margin as i64;
        ((y + m) as usize) * self.stride + (x + m) as usize
    }

    /// Signed coordinate of a flat data index.
    #[inline]
    pub fn coord(&self, index: usize) -> (i64, i64) {
        let m = self.margin as i64;
        (
            (index % self.stride) as i64 - m,
            (index / self.stride) as i64 - m,
        )
    }

    pub fn get(&self, x: i64, y: i64) -> Option<u16> {
        if self.contains(x, y) {
            Some(self.data[self.index(x, y)])
        } else {
            None
        }
    }

    #[inline]
    pub fn at(&self, x: i64, y: i64) -> u16 {
        self.data[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: i64, y: i64, v: u16) {
        let i = self.index(x, y);
        self.data[i] = v;
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u16] {
        &mut self.data
    }

    pub fn fill(&mut self, v: u16) {
        self.data.fill(v);
    }

    /// Interior row `y` (0-based), margin excluded
    pub fn interior_row(&self, y: usize) -> &[u16] {
        let start = self.index(0, y as i64);
        &self.data[start..start + self.width]
    }

    pub fn interior_row_mut(&mut self, y: usize) -> &mut [u16] {
        let start = self.index(0, y as i64);
        &mut self.data[start..start + self.width]
    }
}

/// All face buffers of one geometry instance, indexed [face][channel].
#[derive(Debug, Clone)]
pub struct FaceStore {
    faces: Vec<Vec<FaceBuffer>>,
    format: ChromaFormat,
    margin: usize,
}

impl FaceStore {
    pub fn new(
        num_faces: usize,
        face_width: usize,
        face_height: usize,
        format: ChromaFormat,
        margin: usize,
    ) -> GeoResult<Self> {
        let mut faces = Vec::new();
        faces
            .try_reserve_exact(num_faces)
            .map_err(|_| GeoError::Allocation {
                bytes: num_faces * std::mem::size_of::<Vec<FaceBuffer>>(),
            })?;
        for _ in 0..num_faces {
            let channels = (0..format.channel_count())
                .map(|ch| {
                    let (sx, sy) = format.scale(ch);
                    FaceBuffer::new(face_width / sx, face_height / sy, margin)
                })
                .collect::<GeoResult<Vec<_>>>()?;
            faces.push(channels);
        }
        Ok(Self {
            faces,
            format,
            margin,
        })
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn channel_count(&self) -> usize {
        self.format.channel_count()
    }

    pub fn format(&self) -> ChromaFormat {
        self.format
    }

    pub fn margin(&self) -> usize {
        self.margin
    }

    #[inline]
    pub fn get(&self, face: usize, channel: usize) -> &FaceBuffer {
        &self.faces[face][channel]
    }

    #[inline]
    pub fn get_mut(&mut self, face: usize, channel: usize) -> &mut FaceBuffer {
        &mut self.faces[face][channel]
    }

    /// (width, height) of a channel's buffers, margin excluded
    pub fn channel_dim(&self, channel: usize) -> (usize, usize) {
        let b = &self.faces[0][channel];
        (b.width(), b.height())
    }

    /// Buffers of every face for one channel.
    pub fn channel(&self, channel: usize) -> Vec<&FaceBuffer> {
        self.faces.iter().map(|f| &f[channel]).collect()
    }

    pub fn fill(&mut self, v: u16) {
        for face in &mut self.faces {
            for buf in face {
                buf.fill(v);
            }
        }
    }
}
