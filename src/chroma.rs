//! Chroma up/down-sampling FIR filters and sample bit-depth conversion.
//!
//! Conversions between 4:2:0, 4:2:2 and 4:4:4 are separable: each axis whose
//! subsampling factor changes is filtered on its own. The kernel depends on
//! whether chroma samples are co-sited with luma or centred between two luma
//! samples on that axis (see `InterpolationParams::chroma_siting`).
//!
//! All taps sum to `1 << CHROMA_FILTER_BITS`; results are rounded and clipped
//! to the working bit depth after every pass.

use crate::config::{CHROMA_FILTER_BITS, ChromaFormat, max_value};
use crate::error::GeoResult;
use crate::frame::Plane;

const DOWN_COSITED: [i32; 3] = [16, 32, 16];
const DOWN_CENTERED: [i32; 2] = [32, 32];
const UP_COSITED_EVEN: [i32; 1] = [64];
const UP_COSITED_ODD: [i32; 8] = [-1, 4, -11, 40, 40, -11, 4, -1];
const UP_CENTERED_EVEN: [i32; 2] = [16, 48];
const UP_CENTERED_ODD: [i32; 2] = [48, 16];

/// Taps for one output sample: input index of the first tap plus weights.
#[derive(Debug, Clone, Copy)]
struct Phase {
    first: i64,
    taps: &'static [i32],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisMode {
    Keep,
    Down,
    Up,
}

impl AxisMode {
    fn between(from: usize, to: usize) -> Self {
        match from.cmp(&to) {
            std::cmp::Ordering::Equal => AxisMode::Keep,
            std::cmp::Ordering::Less => AxisMode::Down,
            std::cmp::Ordering::Greater => AxisMode::Up,
        }
    }

    fn out_len(&self, n: usize) -> usize {
        match self {
            AxisMode::Keep => n,
            AxisMode::Down => n / 2,
            AxisMode::Up => n * 2,
        }
    }
}

fn phase(mode: AxisMode, cosited: bool, out: i64) -> Phase {
    match (mode, cosited) {
        (AxisMode::Down, true) => Phase {
            first: 2 * out - 1,
            taps: &DOWN_COSITED,
        },
        (AxisMode::Down, false) => Phase {
            first: 2 * out,
            taps: &DOWN_CENTERED,
        },
        (AxisMode::Up, true) => {
            let i = out >> 1;
            if out & 1 == 0 {
                Phase {
                    first: i,
                    taps: &UP_COSITED_EVEN,
                }
            } else {
                Phase {
                    first: i - 3,
                    taps: &UP_COSITED_ODD,
                }
            }
        }
        (AxisMode::Up, false) => {
            let i = out >> 1;
            if out & 1 == 0 {
                Phase {
                    first: i - 1,
                    taps: &UP_CENTERED_EVEN,
                }
            } else {
                Phase {
                    first: i,
                    taps: &UP_CENTERED_ODD,
                }
            }
        }
        (AxisMode::Keep, _) => Phase {
            first: out,
            taps: &UP_COSITED_EVEN,
        },
    }
}

#[inline]
fn normalize(sum: i64, max: i64) -> u16 {
    let half = 1i64 << (CHROMA_FILTER_BITS - 1);
    ((sum + half) >> CHROMA_FILTER_BITS).clamp(0, max) as u16
}

fn filter_rows(src: &Plane, mode: AxisMode, cosited: bool, max: i64) -> GeoResult<Plane> {
    let out_w = mode.out_len(src.width());
    let mut dst = Plane::new(out_w, src.height())?;
    for y in 0..src.height() {
        for x in 0..out_w {
            let p = phase(mode, cosited, x as i64);
            let sum: i64 = p
                .taps
                .iter()
                .enumerate()
                .map(|(k, &c)| c as i64 * src.get_clamped(p.first + k as i64, y as i64) as i64)
                .sum();
            dst.set(x, y, normalize(sum, max));
        }
    }
    Ok(dst)
}

fn filter_cols(src: &Plane, mode: AxisMode, cosited: bool, max: i64) -> GeoResult<Plane> {
    let out_h = mode.out_len(src.height());
    let mut dst = Plane::new(src.width(), out_h)?;
    for y in 0..out_h {
        let p = phase(mode, cosited, y as i64);
        for x in 0..src.width() {
            let sum: i64 = p
                .taps
                .iter()
                .enumerate()
                .map(|(k, &c)| c as i64 * src.get_clamped(x as i64, p.first + k as i64) as i64)
                .sum();
            dst.set(x, y, normalize(sum, max));
        }
    }
    Ok(dst)
}

/// Resample one channel plane from one chroma format to another.
///
/// `channel` 0 (luma) and channels whose scale does not change are copied.
/// Both formats must carry the channel (monochrome is handled by callers).
pub fn convert_plane(
    src: &Plane,
    channel: usize,
    from: ChromaFormat,
    to: ChromaFormat,
    siting: (bool, bool),
    bit_depth: u8,
) -> GeoResult<Plane> {
    let (fx, fy) = from.scale(channel);
    let (tx, ty) = to.scale(channel);
    let h_mode = AxisMode::between(fx, tx);
    let v_mode = AxisMode::between(fy, ty);
    let max = max_value(bit_depth);

    let mut out = src.clone();
    if h_mode != AxisMode::Keep {
        out = filter_rows(&out, h_mode, siting.0, max)?;
    }
    if v_mode != AxisMode::Keep {
        out = filter_cols(&out, v_mode, siting.1, max)?;
    }
    Ok(out)
}

/// Change a sample's bit depth, rounding when precision drops.
#[inline]
pub fn shift_bit_depth(v: u16, from: u8, to: u8) -> u16 {
    if to >= from {
        ((v as u32) << (to - from)).min(max_value(to) as u32) as u16
    } else {
        let d = from - to;
        let r = ((v as u32) + (1u32 << (d - 1))) >> d;
        r.min(max_value(to) as u32) as u16
    }
}

/// Convert a whole plane's bit depth in place.
pub fn shift_plane(plane: &mut Plane, from: u8, to: u8) {
    if from == to {
        return;
    }
    for y in 0..plane.height() {
        for v in plane.row_mut(y) {
            *v = shift_bit_depth(*v, from, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(w: usize, h: usize) -> Plane {
        let mut p = Plane::new(w, h).unwrap();
        for y in 0..h {
            for x in 0..w {
                p.set(x, y, (x * 10 + y * 3) as u16);
            }
        }
        p
    }

    #[test]
    fn test_taps_sum_to_unit() {
        let unit = 1 << CHROMA_FILTER_BITS;
        for taps in [
            &DOWN_COSITED[..],
            &DOWN_CENTERED[..],
            &UP_COSITED_EVEN[..],
            &UP_COSITED_ODD[..],
            &UP_CENTERED_EVEN[..],
            &UP_CENTERED_ODD[..],
        ] {
            assert_eq!(taps.iter().sum::<i32>(), unit);
        }
    }

    /// Test: 4:4:4 -> 4:2:0 -> 4:4:4 on a flat plane
    /// Validates: flat content survives both directions unchanged
    #[test]
    fn test_flat_round_trip() {
        let flat = Plane::filled(16, 8, 300).unwrap();
        for loc in [(true, false), (false, false), (true, true), (false, true)] {
            let down =
                convert_plane(&flat, 1, ChromaFormat::Yuv444, ChromaFormat::Yuv420, loc, 10).unwrap();
            assert_eq!(down.dim(), (8, 4));
            assert!((0..4).all(|y| down.row(y).iter().all(|&v| v == 300)));
            let up =
                convert_plane(&down, 1, ChromaFormat::Yuv420, ChromaFormat::Yuv444, loc, 10).unwrap();
            assert_eq!(up.dim(), (16, 8));
            assert!((0..8).all(|y| up.row(y).iter().all(|&v| v == 300)));
        }
    }

    #[test]
    fn test_cosited_upsample_keeps_even_samples() {
        let src = ramp(8, 4);
        let up = convert_plane(&src, 1, ChromaFormat::Yuv422, ChromaFormat::Yuv444, (true, true), 10)
            .unwrap();
        assert_eq!(up.dim(), (16, 4));
        for y in 0..4 {
            for x in 0..8 {
                assert_eq!(up.get(2 * x, y), src.get(x, y));
            }
        }
        // Linear ramp: interior odd samples land half way
        assert_eq!(up.get(7, 1), (src.get(3, 1) + src.get(4, 1)) / 2);
    }

    #[test]
    fn test_luma_untouched() {
        let src = ramp(8, 8);
        let out =
            convert_plane(&src, 0, ChromaFormat::Yuv420, ChromaFormat::Yuv444, (true, false), 8).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn test_shift_bit_depth() {
        assert_eq!(shift_bit_depth(255, 8, 10), 1020);
        assert_eq!(shift_bit_depth(1023, 10, 8), 255);
        assert_eq!(shift_bit_depth(514, 10, 8), 129);
        assert_eq!(shift_bit_depth(77, 8, 8), 77);
    }
}
