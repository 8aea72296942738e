//! Geometry configuration: video descriptor, interpolation parameters, constants.
//!
//! Everything here is plain data. A `VideoDescriptor` plus an
//! `InterpolationParams` bundle is what `Geometry::create` consumes; both can
//! be loaded from JSON (`ProbeConfig`) and are validated before any buffer is
//! allocated.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GeoError, GeoResult};

// =============================================================================
// Constants
// =============================================================================

/// Fixed-point precision of one-dimensional interpolation taps.
pub const FILTER_PRECISION_BITS: u32 = 8;
/// Sum of every one-dimensional tap set.
pub const FILTER_UNIT_1D: i32 = 1 << FILTER_PRECISION_BITS;
/// Normalization shift of a two-dimensional weighted sum.
pub const WEIGHT_SHIFT: u32 = 2 * FILTER_PRECISION_BITS;
/// Sum of every two-dimensional weight cell.
pub const WEIGHT_UNIT: i32 = 1 << WEIGHT_SHIFT;
/// Fractional offsets are quantized to 1/FRAC_STEPS of a sample.
pub const FRAC_STEPS: usize = 100;
/// Fixed-point precision of chroma up/down-sampling taps.
pub const CHROMA_FILTER_BITS: u32 = 6;
/// Extra margin beyond half the widest filter window.
pub const MARGIN_SLACK: usize = 2;

pub const MIN_BIT_DEPTH: u8 = 8;
pub const MAX_BIT_DEPTH: u8 = 16;

/// Mid-gray sample value at the given bit depth.
#[inline]
pub fn neutral_value(bit_depth: u8) -> u16 {
    1u16 << (bit_depth - 1)
}

/// Largest sample value at the given bit depth.
#[inline]
pub fn max_value(bit_depth: u8) -> i64 {
    (1i64 << bit_depth) - 1
}

// =============================================================================
// Enums
// =============================================================================

/// Supported sphere projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    EquiRect,
    CubeMap,
    EqualArea,
    Octahedron,
    Icosahedron,
    Viewport,
    CrastersParabolic,
}

impl GeometryType {
    /// Numeric id used by external configuration files.
    pub fn id(&self) -> i32 {
        match self {
            GeometryType::EquiRect => 0,
            GeometryType::CubeMap => 1,
            GeometryType::EqualArea => 2,
            GeometryType::Octahedron => 3,
            GeometryType::Icosahedron => 4,
            GeometryType::Viewport => 5,
            GeometryType::CrastersParabolic => 6,
        }
    }

    pub fn face_count(&self) -> usize {
        match self {
            GeometryType::CubeMap => 6,
            GeometryType::Octahedron => 8,
            GeometryType::Icosahedron => 20,
            _ => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GeometryType::EquiRect => "equirectangular",
            GeometryType::CubeMap => "cubemap",
            GeometryType::EqualArea => "equal-area",
            GeometryType::Octahedron => "octahedron",
            GeometryType::Icosahedron => "icosahedron",
            GeometryType::Viewport => "viewport",
            GeometryType::CrastersParabolic => "crasters-parabolic",
        }
    }

    /// Faces are triangles inside a rectangular buffer
    pub fn is_triangular(&self) -> bool {
        matches!(self, GeometryType::Octahedron | GeometryType::Icosahedron)
    }
}

/// Chroma subsampling of a raster or of a geometry's face buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChromaFormat {
    Yuv400,
    Yuv420,
    Yuv422,
    Yuv444,
}

impl ChromaFormat {
    pub fn channel_count(&self) -> usize {
        match self {
            ChromaFormat::Yuv400 => 1,
            _ => 3,
        }
    }

    /// Subsampling factors (horizontal, vertical) of a channel.
    pub fn scale(&self, channel: usize) -> (usize, usize) {
        if channel == 0 {
            return (1, 1);
        }
        match self {
            ChromaFormat::Yuv420 => (2, 2),
            ChromaFormat::Yuv422 => (2, 1),
            _ => (1, 1),
        }
    }

    pub fn is_subsampled(&self) -> bool {
        matches!(self, ChromaFormat::Yuv420 | ChromaFormat::Yuv422)
    }
}

/// Geometric interpolation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterpolationKind {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos,
}

/// Clockwise slot rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn from_degrees(deg: i32) -> Option<Self> {
        match deg.rem_euclid(360) {
            0 => Some(Rotation::R0),
            90 => Some(Rotation::R90),
            180 => Some(Rotation::R180),
            270 => Some(Rotation::R270),
            _ => None,
        }
    }

    pub fn degrees(&self) -> i32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Width and height swap
    pub fn is_transposed(&self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }
}

impl TryFrom<i32> for Rotation {
    type Error = String;

    fn try_from(deg: i32) -> Result<Self, Self::Error> {
        Rotation::from_degrees(deg).ok_or_else(|| format!("rotation {} is not a multiple of 90", deg))
    }
}

impl From<Rotation> for i32 {
    fn from(r: Rotation) -> i32 {
        r.degrees()
    }
}

/// Compact triangular packing selector (Octahedron / Icosahedron only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompactVariant {
    #[default]
    Off,
    Layout1,
    Layout2,
}

// =============================================================================
// Frame packing description
// =============================================================================

/// One cell of the frame-pack grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FaceSlot {
    /// Face id, None for an empty (neutral) cell
    pub face: Option<usize>,
    #[serde(default)]
    pub rotation: Rotation,
    /// Horizontal flip applied before rotation
    #[serde(default)]
    pub flip: bool,
}

impl FaceSlot {
    pub const fn new(face: usize, rotation: Rotation) -> Self {
        Self {
            face: Some(face),
            rotation,
            flip: false,
        }
    }

    pub const fn empty() -> Self {
        Self {
            face: None,
            rotation: Rotation::R0,
            flip: false,
        }
    }
}

/// Rows x cols grid of faces forming the packed raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePackStruct {
    /// 0 = use the geometry default layout
    #[serde(default)]
    pub rows: usize,
    #[serde(default)]
    pub cols: usize,
    pub chroma_format: ChromaFormat,
    #[serde(default)]
    pub slots: Vec<Vec<FaceSlot>>,
}

impl FramePackStruct {
    /// Layout left for the geometry to fill in.
    pub fn unset(chroma_format: ChromaFormat) -> Self {
        Self {
            rows: 0,
            cols: 0,
            chroma_format,
            slots: Vec::new(),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Build from a row-major table of (face, rotation degrees).
    pub fn from_table(chroma_format: ChromaFormat, table: &[&[(usize, Rotation)]]) -> Self {
        let slots: Vec<Vec<FaceSlot>> = table
            .iter()
            .map(|row| row.iter().map(|&(f, r)| FaceSlot::new(f, r)).collect())
            .collect();
        Self {
            rows: slots.len(),
            cols: slots.first().map_or(0, |r| r.len()),
            chroma_format,
            slots,
        }
    }

    pub fn slot(&self, row: usize, col: usize) -> FaceSlot {
        self.slots
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or_else(FaceSlot::empty)
    }

    /// Find the grid cell holding a face.
    pub fn find(&self, face: usize) -> Option<(usize, usize, FaceSlot)> {
        for (r, row) in self.slots.iter().enumerate() {
            for (c, slot) in row.iter().enumerate() {
                if slot.face == Some(face) {
                    return Some((r, c, *slot));
                }
            }
        }
        None
    }
}

/// Rectilinear viewport camera settings, all angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportParams {
    pub fov_x: f64,
    pub fov_y: f64,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub pitch: f64,
}

impl Default for ViewportParams {
    fn default() -> Self {
        Self {
            fov_x: 90.0,
            fov_y: 90.0,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

// =============================================================================
// Descriptor + parameters
// =============================================================================

/// Static description of one geometry instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    pub geometry: GeometryType,
    pub face_width: usize,
    pub face_height: usize,
    pub frame_pack: FramePackStruct,
    /// Whole-sphere rotation about x, y, z in degrees
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default)]
    pub compact: CompactVariant,
    #[serde(default)]
    pub viewport: Option<ViewportParams>,
}

impl VideoDescriptor {
    pub fn new(geometry: GeometryType, face_width: usize, face_height: usize, packed: ChromaFormat) -> Self {
        Self {
            geometry,
            face_width,
            face_height,
            frame_pack: FramePackStruct::unset(packed),
            rotation: [0.0; 3],
            compact: CompactVariant::Off,
            viewport: None,
        }
    }

    pub fn num_faces(&self) -> usize {
        self.geometry.face_count()
    }

    pub fn has_rotation(&self) -> bool {
        self.rotation.iter().any(|r| *r != 0.0)
    }

    /// Check face dims and layout against the interpolation parameters.
    pub fn validate(&self, params: &InterpolationParams) -> GeoResult<()> {
        if self.face_width == 0 || self.face_height == 0 {
            return Err(GeoError::unsupported(format!(
                "face size {}x{} must be non-zero",
                self.face_width, self.face_height
            )));
        }
        for fmt in [params.chroma_format, self.frame_pack.chroma_format] {
            let (sx, sy) = fmt.scale(1);
            if self.face_width % sx != 0 || self.face_height % sy != 0 {
                return Err(GeoError::unsupported(format!(
                    "face size {}x{} not divisible by chroma subsampling of {:?}",
                    self.face_width, self.face_height, fmt
                )));
            }
        }
        if self.geometry == GeometryType::Viewport && self.viewport.is_none() {
            return Err(GeoError::unsupported("viewport geometry needs viewport parameters"));
        }
        if self.compact != CompactVariant::Off {
            if !self.geometry.is_triangular() {
                return Err(GeoError::unsupported(format!(
                    "compact packing is not defined for {}",
                    self.geometry.name()
                )));
            }
            for fmt in [params.chroma_format, self.frame_pack.chroma_format] {
                let (sx, _) = fmt.scale(1);
                if self.face_width % (2 * sx) != 0 {
                    return Err(GeoError::unsupported(format!(
                        "compact packing needs face width divisible by {}",
                        2 * sx
                    )));
                }
            }
        } else if !self.frame_pack.is_unset() {
            self.validate_frame_pack()?;
        }
        Ok(())
    }

    fn validate_frame_pack(&self) -> GeoResult<()> {
        let fp = &self.frame_pack;
        if fp.slots.len() != fp.rows || fp.slots.iter().any(|r| r.len() != fp.cols) {
            return Err(GeoError::unsupported(format!(
                "frame pack table does not match {}x{} grid",
                fp.rows, fp.cols
            )));
        }
        // Square cells keep their size under any rotation
        let mixed_ok = self.face_width == self.face_height;
        let transposed = fp.slot(0, 0).rotation.is_transposed();
        for row in &fp.slots {
            for slot in row {
                if slot.face.is_some_and(|f| f >= self.num_faces()) {
                    // Treated as an empty cell when packing
                    continue;
                }
                if !mixed_ok && slot.face.is_some() && slot.rotation.is_transposed() != transposed {
                    return Err(GeoError::unsupported(
                        "frame pack mixes 0/180 and 90/270 slot rotations",
                    ));
                }
                if slot.rotation.is_transposed() && fp.chroma_format == ChromaFormat::Yuv422 {
                    return Err(GeoError::unsupported("4:2:2 raster with 90/270 slot rotation"));
                }
            }
        }
        Ok(())
    }
}

/// Interpolation and sample-format settings of one geometry instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpolationParams {
    pub input_bit_depth: u8,
    pub output_bit_depth: u8,
    /// Chroma format of the face buffers
    pub chroma_format: ChromaFormat,
    /// Chroma sample location type 0..=3
    #[serde(default)]
    pub chroma_sample_loc: u8,
    pub luma_filter: InterpolationKind,
    pub chroma_filter: InterpolationKind,
    /// Lanczos support radius A (2 or 3)
    #[serde(default = "default_lanczos_radius")]
    pub lanczos_radius: usize,
}

fn default_lanczos_radius() -> usize {
    3
}

impl Default for InterpolationParams {
    fn default() -> Self {
        Self {
            input_bit_depth: 8,
            output_bit_depth: 8,
            chroma_format: ChromaFormat::Yuv420,
            chroma_sample_loc: 0,
            luma_filter: InterpolationKind::Bicubic,
            chroma_filter: InterpolationKind::Bilinear,
            lanczos_radius: default_lanczos_radius(),
        }
    }
}

impl InterpolationParams {
    /// Bit depth of samples held in face buffers.
    pub fn internal_bit_depth(&self) -> u8 {
        self.input_bit_depth.max(self.output_bit_depth)
    }

    /// (horizontal co-sited, vertical co-sited) for the configured sample location.
    pub fn chroma_siting(&self) -> (bool, bool) {
        match self.chroma_sample_loc {
            0 => (true, false),
            1 => (false, false),
            2 => (true, true),
            _ => (false, true),
        }
    }

    pub fn validate(&self) -> GeoResult<()> {
        for bd in [self.input_bit_depth, self.output_bit_depth] {
            if !(MIN_BIT_DEPTH..=MAX_BIT_DEPTH).contains(&bd) {
                return Err(GeoError::unsupported(format!(
                    "bit depth {} outside {}..={}",
                    bd, MIN_BIT_DEPTH, MAX_BIT_DEPTH
                )));
            }
        }
        if self.chroma_sample_loc > 3 {
            return Err(GeoError::unsupported(format!(
                "chroma sample location type {}",
                self.chroma_sample_loc
            )));
        }
        let uses_lanczos = self.luma_filter == InterpolationKind::Lanczos
            || self.chroma_filter == InterpolationKind::Lanczos;
        if uses_lanczos && !(2..=3).contains(&self.lanczos_radius) {
            return Err(GeoError::unsupported(format!(
                "Lanczos radius {} (supported: 2, 3)",
                self.lanczos_radius
            )));
        }
        Ok(())
    }
}

/// Geometry descriptor + parameters as loaded by the probe tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub descriptor: VideoDescriptor,
    #[serde(default)]
    pub params: InterpolationParams,
}

impl ProbeConfig {
    pub fn from_json_str(json: &str) -> GeoResult<Self> {
        let cfg: ProbeConfig = serde_json::from_str(json)?;
        cfg.params.validate()?;
        cfg.descriptor.validate(&cfg.params)?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> GeoResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_ids_distinct() {
        let all = [
            GeometryType::EquiRect,
            GeometryType::CubeMap,
            GeometryType::EqualArea,
            GeometryType::Octahedron,
            GeometryType::Icosahedron,
            GeometryType::Viewport,
            GeometryType::CrastersParabolic,
        ];
        let ids: Vec<i32> = all.iter().map(|g| g.id()).collect();
        assert_eq!(ids, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_chroma_scale() {
        assert_eq!(ChromaFormat::Yuv420.scale(0), (1, 1));
        assert_eq!(ChromaFormat::Yuv420.scale(1), (2, 2));
        assert_eq!(ChromaFormat::Yuv422.scale(2), (2, 1));
        assert_eq!(ChromaFormat::Yuv444.scale(1), (1, 1));
        assert_eq!(ChromaFormat::Yuv400.channel_count(), 1);
    }

    #[test]
    fn test_rotation_parse() {
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::R270));
        assert_eq!(Rotation::from_degrees(45), None);
        assert!(Rotation::R90.is_transposed());
    }

    /// Test: Validation rejects odd faces for 4:2:0
    /// Validates: UnsupportedConfiguration before any allocation
    #[test]
    fn test_validate_odd_face() {
        let params = InterpolationParams::default();
        let desc = VideoDescriptor::new(GeometryType::CubeMap, 15, 15, ChromaFormat::Yuv420);
        assert!(desc.validate(&params).is_err());
    }

    #[test]
    fn test_validate_lanczos_radius() {
        let params = InterpolationParams {
            luma_filter: InterpolationKind::Lanczos,
            lanczos_radius: 4,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_validate_compact_on_cubemap() {
        let params = InterpolationParams::default();
        let mut desc = VideoDescriptor::new(GeometryType::CubeMap, 16, 16, ChromaFormat::Yuv420);
        desc.compact = CompactVariant::Layout1;
        assert!(desc.validate(&params).is_err());
    }

    /// Test: Mixed 0/180 and 90/270 slots
    /// Validates: allowed for square faces, rejected when the cell size would change
    #[test]
    fn test_validate_mixed_slot_rotations() {
        let params = InterpolationParams::default();
        let table: &[&[(usize, Rotation)]] = &[&[(0, Rotation::R0), (1, Rotation::R270)]];

        let mut cube = VideoDescriptor::new(GeometryType::CubeMap, 16, 16, ChromaFormat::Yuv420);
        cube.frame_pack = FramePackStruct::from_table(ChromaFormat::Yuv420, table);
        assert!(cube.validate(&params).is_ok());

        let mut octa = VideoDescriptor::new(GeometryType::Octahedron, 16, 14, ChromaFormat::Yuv420);
        octa.frame_pack = FramePackStruct::from_table(ChromaFormat::Yuv420, table);
        assert_eq!(
            octa.validate(&params).unwrap_err().kind(),
            crate::error::ErrorKind::UnsupportedConfiguration
        );

        cube.frame_pack.chroma_format = ChromaFormat::Yuv422;
        let params_422 = InterpolationParams {
            chroma_format: ChromaFormat::Yuv422,
            ..Default::default()
        };
        assert!(cube.validate(&params_422).is_err());
    }

    #[test]
    fn test_probe_config_json() {
        let json = r#"{
            "descriptor": {
                "geometry": "CubeMap",
                "face_width": 32,
                "face_height": 32,
                "frame_pack": { "chroma_format": "Yuv420" }
            },
            "params": {
                "input_bit_depth": 8,
                "output_bit_depth": 10,
                "chroma_format": "Yuv444",
                "luma_filter": "Lanczos",
                "chroma_filter": "Bilinear"
            }
        }"#;
        let cfg = ProbeConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.descriptor.geometry, GeometryType::CubeMap);
        assert!(cfg.descriptor.frame_pack.is_unset());
        assert_eq!(cfg.params.internal_bit_depth(), 10);
        assert_eq!(cfg.params.lanczos_radius, 3);
    }

    #[test]
    fn test_slot_rotation_json() {
        let slot: FaceSlot = serde_json::from_str(r#"{"face": 4, "rotation": 270}"#).unwrap();
        assert_eq!(slot.rotation, Rotation::R270);
        assert!(serde_json::from_str::<FaceSlot>(r#"{"face": 4, "rotation": 30}"#).is_err());
    }

    /// Test: Shipped demo configurations load
    /// Validates: demos/*.json stay in sync with the serde layout
    #[test]
    fn test_demo_configs() {
        let cube = ProbeConfig::from_json_str(include_str!("../demos/cube_420.json")).unwrap();
        assert_eq!(cube.descriptor.face_width, 256);
        assert_eq!(cube.params.luma_filter, InterpolationKind::Lanczos);

        let octa = ProbeConfig::from_json_str(include_str!("../demos/octa_compact.json")).unwrap();
        assert_eq!(octa.descriptor.compact, CompactVariant::Layout1);
        assert_eq!(octa.params, InterpolationParams::default());

        for cfg in [cube, octa] {
            let geo = crate::engine::Geometry::create(cfg.descriptor, cfg.params).unwrap();
            let (w, h) = geo.packed_size();
            assert!(w > 0 && h > 0);
        }
    }
}
