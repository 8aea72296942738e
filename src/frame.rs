//! Planar raster frames exchanged with the outside world.
//!
//! A `RasterFrame` is what gets packed into and unpacked from: one `Plane`
//! per channel, each with its own stride, plus the declared chroma format and
//! bit depth. Geometries never store their faces in this type; they only read
//! from and write into it.

use crate::config::{ChromaFormat, MAX_BIT_DEPTH, MIN_BIT_DEPTH, neutral_value};
use crate::error::{GeoError, GeoResult, try_alloc};

/// Single channel sample plane
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    width: usize,
    height: usize,
    stride: usize,
    data: Vec<u16>,
}

impl Plane {
    pub fn new(width: usize, height: usize) -> GeoResult<Self> {
        Self::with_stride(width, height, width)
    }

    pub fn with_stride(width: usize, height: usize, stride: usize) -> GeoResult<Self> {
        if stride < width {
            return Err(GeoError::mismatch("plane stride", (width, height), (stride, height)));
        }
        let data = try_alloc(stride * height)?;
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, value: u16) -> GeoResult<Self> {
        let mut p = Self::new(width, height)?;
        p.fill(value);
        Ok(p)
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
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn dim(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u16 {
        self.data[y * self.stride + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u16) {
        self.data[y * self.stride + x] = v;
    }

    /// Sample with coordinates clamped into the plane
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> u16 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.get(x, y)
    }

    pub fn row(&self, y: usize) -> &[u16] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u16] {
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    pub fn fill(&mut self, v: u16) {
        for y in 0..self.height {
            self.row_mut(y).fill(v);
        }
    }
}

/// Packed multi-plane raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterFrame {
    width: usize,
    height: usize,
    format: ChromaFormat,
    bit_depth: u8,
    planes: Vec<Plane>,
}

impl RasterFrame {
    /// Allocate a raster filled with the neutral value.
    pub fn new(width: usize, height: usize, format: ChromaFormat, bit_depth: u8) -> GeoResult<Self> {
        if !(MIN_BIT_DEPTH..=MAX_BIT_DEPTH).contains(&bit_depth) {
            return Err(GeoError::unsupported(format!("raster bit depth {}", bit_depth)));
        }
        let (sx, sy) = format.scale(1);
        if width % sx != 0 || height % sy != 0 {
            return Err(GeoError::unsupported(format!(
                "raster {}x{} not divisible by {:?} subsampling",
                width, height, format
            )));
        }
        let planes = (0..format.channel_count())
            .map(|ch| {
                let (sx, sy) = format.scale(ch);
                Plane::filled(width / sx, height / sy, neutral_value(bit_depth))
            })
            .collect::<GeoResult<Vec<_>>>()?;
        Ok(Self {
            width,
            height,
            format,
            bit_depth,
            planes,
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

    pub fn dim(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn format(&self) -> ChromaFormat {
        self.format
    }

    #[inline]
    pub fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    pub fn channel_count(&self) -> usize {
        self.planes.len()
    }

    pub fn scale(&self, channel: usize) -> (usize, usize) {
        self.format.scale(channel)
    }

    pub fn plane(&self, channel: usize) -> &Plane {
        &self.planes[channel]
    }

    pub fn plane_mut(&mut self, channel: usize) -> &mut Plane {
        &mut self.planes[channel]
    }

    /// Replace a plane; dimensions must match the existing one.
    pub fn set_plane(&mut self, channel: usize, plane: Plane) -> GeoResult<()> {
        let current = self.planes[channel].dim();
        if plane.dim() != current {
            return Err(GeoError::mismatch(
                format!("plane {}", channel),
                current,
                plane.dim(),
            ));
        }
        self.planes[channel] = plane;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: 4:2:0 raster allocation
    /// Validates: chroma planes are half size and neutral-filled
    #[test]
    fn test_raster_420() {
        let r = RasterFrame::new(16, 8, ChromaFormat::Yuv420, 10).unwrap();
        assert_eq!(r.channel_count(), 3);
        assert_eq!(r.plane(0).dim(), (16, 8));
        assert_eq!(r.plane(1).dim(), (8, 4));
        assert_eq!(r.plane(2).get(3, 3), 512);
    }

    #[test]
    fn test_raster_rejects_odd_420() {
        assert!(RasterFrame::new(15, 8, ChromaFormat::Yuv420, 8).is_err());
        assert!(RasterFrame::new(16, 8, ChromaFormat::Yuv420, 17).is_err());
    }

    #[test]
    fn test_plane_stride() {
        let mut p = Plane::with_stride(4, 2, 6).unwrap();
        p.set(3, 1, 7);
        assert_eq!(p.row(1), &[0, 0, 0, 7]);
        assert_eq!(p.get_clamped(10, 10), 7);
        assert!(Plane::with_stride(4, 2, 3).is_err());
    }

    #[test]
    fn test_set_plane_mismatch() {
        let mut r = RasterFrame::new(8, 8, ChromaFormat::Yuv444, 8).unwrap();
        let wrong = Plane::new(4, 4).unwrap();
        assert!(r.set_plane(1, wrong).is_err());
        let right = Plane::filled(8, 8, 3).unwrap();
        r.set_plane(1, right).unwrap();
        assert_eq!(r.plane(1).get(0, 0), 3);
    }
}
