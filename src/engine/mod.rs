//! Geometry instances: face buffers plus everything that moves samples.
//!
//! A `Geometry` couples a projection (`GeometryKind`) with its padded face
//! buffers, interpolation filters and cached weight maps. The operations are
//! split by concern:
//!
//! | Module | Operations |
//! |--------|------------|
//! | `packing` | `convert_yuv`, `frame_pack`, `geo_to_frame_pack`, `packed_size` |
//! | `compact` | compact triangle packing in both directions |
//! | `padding` | `sphere_padding`, cube corner fill |
//! | `mapping` | weight maps and `geo_convert` |
//!
//! ## Typical flow
//!
//! ```text
//! src.convert_yuv(&raster_in)      unpack + format/bit-depth convert
//! src.geo_convert(&mut dst)        pads src on demand, resamples into dst
//! dst.frame_pack(&mut raster_out)  pack + convert to output format
//! ```

mod compact;
mod mapping;
mod packing;
mod padding;

use glam::{DMat3, EulerRot};
use log::{debug, info};

use crate::config::{
    ChromaFormat, FramePackStruct, GeometryType, InterpolationParams, VideoDescriptor,
    ViewportParams, neutral_value,
};
use crate::error::{GeoError, GeoResult};
use crate::face_buffer::{FaceBuffer, FaceStore};
use crate::filters::FilterBank;
use crate::geometry::{GeometryKind, Position, Projection};
use crate::sample_points::SpherePoint;

pub(crate) use mapping::{SourceKey, WeightMap};
pub(crate) use padding::PaddingMap;

/// Where a sphere point lands in a geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePosition {
    /// Face-local luma sample coordinates
    pub face: Position,
    /// Packed raster luma coordinates, None if the face is not packed
    pub packed: Option<Position>,
}

/// One geometry instance with its face buffers.
#[derive(Debug)]
pub struct Geometry {
    desc: VideoDescriptor,
    params: InterpolationParams,
    projection: GeometryKind,
    filters: FilterBank,
    store: FaceStore,
    bit_depth: u8,
    /// Local sphere to canonical sphere
    rotation: DMat3,
    padded: bool,
    padding_map: Option<PaddingMap>,
    convert_map: Option<WeightMap>,
}

impl Geometry {
    /// Validate the configuration and allocate neutral face buffers.
    pub fn create(desc: VideoDescriptor, params: InterpolationParams) -> GeoResult<Self> {
        params.validate()?;
        desc.validate(&params)?;
        let projection = GeometryKind::from_descriptor(&desc)?;

        let mut desc = desc;
        if desc.frame_pack.is_unset() {
            desc.frame_pack = projection.default_frame_pack(desc.frame_pack.chroma_format);
            desc.validate(&params)?;
        }

        let filters = FilterBank::new(&params);
        let margin = filters.margin();
        let bit_depth = params.internal_bit_depth();
        let mut store = FaceStore::new(
            desc.num_faces(),
            desc.face_width,
            desc.face_height,
            params.chroma_format,
            margin,
        )?;
        store.fill(neutral_value(bit_depth));

        let [rx, ry, rz] = desc.rotation;
        let rotation = DMat3::from_euler(
            EulerRot::XYZ,
            rx.to_radians(),
            ry.to_radians(),
            rz.to_radians(),
        );

        info!(
            "Geometry {}: {} faces {}x{}, {:?} @ {} bit, margin {}",
            desc.geometry.name(),
            desc.num_faces(),
            desc.face_width,
            desc.face_height,
            params.chroma_format,
            bit_depth,
            margin
        );
        debug!(
            "  filters luma {:?} chroma {:?}, packing {:?} {}x{}",
            params.luma_filter,
            params.chroma_filter,
            desc.compact,
            desc.frame_pack.cols,
            desc.frame_pack.rows
        );

        Ok(Self {
            desc,
            params,
            projection,
            filters,
            store,
            bit_depth,
            rotation,
            padded: false,
            padding_map: None,
            convert_map: None,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn descriptor(&self) -> &VideoDescriptor {
        &self.desc
    }

    pub fn params(&self) -> &InterpolationParams {
        &self.params
    }

    pub fn projection(&self) -> &GeometryKind {
        &self.projection
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.desc.geometry
    }

    pub fn num_faces(&self) -> usize {
        self.store.num_faces()
    }

    /// Luma face size
    pub fn face_size(&self) -> (usize, usize) {
        (self.desc.face_width, self.desc.face_height)
    }

    pub fn margin(&self) -> usize {
        self.store.margin()
    }

    /// Internal sample bit depth
    pub fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    /// Face buffer chroma format
    pub fn chroma_format(&self) -> ChromaFormat {
        self.store.format()
    }

    /// Resolved frame packing (the geometry default if none was configured).
    pub fn frame_pack_layout(&self) -> &FramePackStruct {
        &self.desc.frame_pack
    }

    pub fn store(&self) -> &FaceStore {
        &self.store
    }

    pub fn face(&self, face: usize, channel: usize) -> &FaceBuffer {
        self.store.get(face, channel)
    }

    /// Mutable face access; the margin counts as stale afterwards.
    pub fn face_mut(&mut self, face: usize, channel: usize) -> &mut FaceBuffer {
        self.padded = false;
        self.store.get_mut(face, channel)
    }

    /// Margins currently hold valid padding.
    pub fn is_padded(&self) -> bool {
        self.padded
    }

    // =========================================================================
    // Mapping
    // =========================================================================

    pub fn map_2d_to_3d(&self, pos: &Position) -> Position {
        self.projection.map_2d_to_3d(pos)
    }

    pub fn map_3d_to_2d(&self, pos: &Position) -> Position {
        self.projection.map_3d_to_2d(pos)
    }

    /// Continuous luma offset of a channel's sample grid on each axis.
    fn channel_phase(&self, channel: usize) -> (f64, f64, f64, f64) {
        let (sx, sy) = self.store.format().scale(channel);
        let (h_cosited, v_cosited) = self.params.chroma_siting();
        let phase = |s: usize, cosited: bool| {
            if s == 1 || cosited { 0.5 } else { s as f64 / 2.0 }
        };
        (sx as f64, sy as f64, phase(sx, h_cosited), phase(sy, v_cosited))
    }

    /// Channel sample index to luma sample coordinates.
    pub(crate) fn channel_to_luma(&self, channel: usize, x: f64, y: f64) -> (f64, f64) {
        let (sx, sy, px, py) = self.channel_phase(channel);
        (sx * x + px - 0.5, sy * y + py - 0.5)
    }

    /// Luma sample coordinates to channel sample coordinates.
    pub(crate) fn luma_to_channel(&self, channel: usize, x: f64, y: f64) -> (f64, f64) {
        let (sx, sy, px, py) = self.channel_phase(channel);
        ((x + 0.5 - px) / sx, (y + 0.5 - py) / sy)
    }

    /// Whether sample (x, y) of `channel` lies in the face footprint. When
    /// `src_channel` differs, the test uses the `src_channel` sample nearest
    /// to that position.
    pub fn inside_face(&self, face: usize, x: i64, y: i64, channel: usize, src_channel: usize) -> bool {
        let (mut lx, mut ly) = self.channel_to_luma(channel, x as f64, y as f64);
        if src_channel != channel {
            let (cx, cy) = self.luma_to_channel(src_channel, lx, ly);
            (lx, ly) = self.channel_to_luma(src_channel, cx.round(), cy.round());
        }
        self.projection.inside_footprint(face, lx + 0.5, ly + 0.5)
    }

    /// Identity of this geometry as a resampling source.
    pub(crate) fn source_key(&self) -> SourceKey {
        SourceKey {
            geometry: self.desc.geometry,
            face_size: self.face_size(),
            format: self.store.format(),
            sample_loc: self.params.chroma_sample_loc,
            margin: self.store.margin(),
            rotation: self.desc.rotation,
            viewport: self.desc.viewport,
        }
    }

    /// Change the camera of a viewport geometry. Cached weight maps are dropped.
    pub fn set_viewport(&mut self, params: ViewportParams) -> GeoResult<()> {
        let vp = self.projection.as_viewport_mut().ok_or_else(|| {
            GeoError::unsupported(format!(
                "set_viewport on {} geometry",
                self.desc.geometry.name()
            ))
        })?;
        vp.set_params(params)?;
        self.desc.viewport = Some(params);
        self.padding_map = None;
        self.convert_map = None;
        self.padded = false;
        Ok(())
    }

    /// Face and packed-raster position of a sphere point given in the
    /// canonical (unrotated) frame.
    pub fn sample_position(&self, point: &SpherePoint) -> SamplePosition {
        let local = self.rotation.transpose() * point.direction();
        let face = self.projection.map_3d_to_2d(&Position::sphere(local));
        SamplePosition {
            face,
            packed: self.geo_to_frame_pack(&face),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_util::geometry;
    use super::*;
    use crate::config::CompactVariant;

    #[test]
    fn test_create_allocates_neutral_faces() {
        let g = geometry(
            GeometryType::CubeMap,
            16,
            16,
            ChromaFormat::Yuv420,
            ChromaFormat::Yuv420,
        );
        assert_eq!(g.num_faces(), 6);
        assert_eq!(g.face(3, 1).width(), 8);
        assert_eq!(g.face(0, 0).at(5, 5), 128);
        assert!(!g.is_padded());
        assert_eq!(g.frame_pack_layout().rows, 2);
    }

    #[test]
    fn test_create_rejects_422_with_rotated_default() {
        let desc = VideoDescriptor::new(GeometryType::CubeMap, 16, 16, ChromaFormat::Yuv422);
        let err = Geometry::create(desc, InterpolationParams::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedConfiguration);
    }

    #[test]
    fn test_create_rejects_compact_without_layout() {
        let mut desc = VideoDescriptor::new(GeometryType::Icosahedron, 16, 14, ChromaFormat::Yuv420);
        desc.compact = CompactVariant::Layout2;
        assert!(Geometry::create(desc, InterpolationParams::default()).is_err());
    }

    #[test]
    fn test_channel_coordinates() {
        let g = geometry(
            GeometryType::EquiRect,
            16,
            8,
            ChromaFormat::Yuv420,
            ChromaFormat::Yuv420,
        );
        // sample location 0: horizontally co-sited, vertically centred
        assert_eq!(g.channel_to_luma(1, 3.0, 2.0), (6.0, 4.5));
        assert_eq!(g.luma_to_channel(1, 6.0, 4.5), (3.0, 2.0));
        assert_eq!(g.channel_to_luma(0, 3.0, 2.0), (3.0, 2.0));
    }

    #[test]
    fn test_inside_face_triangle() {
        let g = geometry(
            GeometryType::Octahedron,
            16,
            14,
            ChromaFormat::Yuv444,
            ChromaFormat::Yuv444,
        );
        assert!(g.inside_face(0, 8, 1, 0, 0));
        assert!(!g.inside_face(0, 0, 0, 0, 0));
        assert!(g.inside_face(0, 1, 13, 0, 0));
        assert!(!g.inside_face(0, 8, -1, 0, 0));
    }

    #[test]
    fn test_set_viewport() {
        let mut g = geometry(
            GeometryType::Viewport,
            32,
            32,
            ChromaFormat::Yuv420,
            ChromaFormat::Yuv420,
        );
        let params = ViewportParams {
            yaw: 90.0,
            ..Default::default()
        };
        g.set_viewport(params).unwrap();
        assert_eq!(g.descriptor().viewport, Some(params));
        let c = g.map_2d_to_3d(&Position::planar(0, 15.5, 15.5)).vec3();
        assert!((c.z + 1.0).abs() < 1e-12);

        let mut erp = geometry(
            GeometryType::EquiRect,
            32,
            16,
            ChromaFormat::Yuv420,
            ChromaFormat::Yuv420,
        );
        assert!(erp.set_viewport(params).is_err());
    }

    /// Test: Sample positions honour the sphere rotation
    /// Validates: a 90 degree yaw moves the ERP centre by a quarter width
    #[test]
    fn test_sample_position_rotation() {
        let mut desc = VideoDescriptor::new(GeometryType::EquiRect, 64, 32, ChromaFormat::Yuv420);
        desc.rotation = [0.0, 90.0, 0.0];
        let g = Geometry::create(desc, InterpolationParams::default()).unwrap();
        let front = SpherePoint { lon: 0.0, lat: 0.0 };
        let p = g.sample_position(&front);
        // canonical +x is local +z after a 90 degree turn about y
        assert!((p.face.x - 15.5).abs() < 1e-9, "{:?}", p.face);
        assert!((p.face.y - 15.5).abs() < 1e-9);
        let packed = p.packed.unwrap();
        assert_eq!(packed.face, 0);
        assert!((packed.x - p.face.x).abs() < 1e-9);
    }
}
