//! Rectilinear (pinhole) viewport.
//!
//! The camera looks along +x with picture-right = -z and picture-down = -y
//! before orientation; yaw turns it toward increasing longitude, pitch toward
//! the north pole. Intrinsics `K` and orientation `R` are cached and only
//! recomputed by `set_params`.

use glam::{DMat3, DVec3};

use super::{Position, Projection};
use crate::config::{ChromaFormat, FramePackStruct, GeometryType, Rotation, ViewportParams};
use crate::error::{GeoError, GeoResult};

/// Smallest forward component before a direction counts as behind the camera
const MIN_DEPTH: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct Viewport {
    width: usize,
    height: usize,
    params: ViewportParams,
    k: DMat3,
    k_inv: DMat3,
    /// Camera (right, down, forward) to world
    rot: DMat3,
}

impl Viewport {
    pub fn new(width: usize, height: usize, params: ViewportParams) -> GeoResult<Self> {
        let mut vp = Self {
            width,
            height,
            params,
            k: DMat3::IDENTITY,
            k_inv: DMat3::IDENTITY,
            rot: DMat3::IDENTITY,
        };
        vp.set_params(params)?;
        Ok(vp)
    }

    pub fn params(&self) -> ViewportParams {
        self.params
    }

    /// Replace camera parameters and recompute K and R.
    pub fn set_params(&mut self, params: ViewportParams) -> GeoResult<()> {
        for fov in [params.fov_x, params.fov_y] {
            if !(fov > 0.0 && fov < 180.0) {
                return Err(GeoError::unsupported(format!(
                    "viewport field of view {} outside (0, 180)",
                    fov
                )));
            }
        }
        let (w, h) = (self.width as f64, self.height as f64);
        let fx = (w / 2.0) / (params.fov_x.to_radians() / 2.0).tan();
        let fy = (h / 2.0) / (params.fov_y.to_radians() / 2.0).tan();
        self.k = DMat3::from_cols(
            DVec3::new(fx, 0.0, 0.0),
            DVec3::new(0.0, fy, 0.0),
            DVec3::new(w / 2.0, h / 2.0, 1.0),
        );
        self.k_inv = self.k.inverse();

        let base = DMat3::from_cols(-DVec3::Z, -DVec3::Y, DVec3::X);
        self.rot = DMat3::from_rotation_y(params.yaw.to_radians())
            * DMat3::from_rotation_z(params.pitch.to_radians())
            * base;
        self.params = params;
        log::debug!(
            "viewport {}x{} fov {:.1}x{:.1} yaw {:.1} pitch {:.1}",
            self.width,
            self.height,
            params.fov_x,
            params.fov_y,
            params.yaw,
            params.pitch
        );
        Ok(())
    }
}

impl Projection for Viewport {
    fn geometry_type(&self) -> GeometryType {
        GeometryType::Viewport
    }

    fn face_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn map_2d_to_3d(&self, pos: &Position) -> Position {
        let cam = self.k_inv * DVec3::new(pos.x + 0.5, pos.y + 0.5, 1.0);
        Position::sphere((self.rot * cam).normalize())
    }

    /// Directions behind the camera are pushed onto the image plane at the
    /// edge of the view; callers clamp into the face.
    fn map_3d_to_2d(&self, pos: &Position) -> Position {
        let mut cam = self.rot.transpose() * pos.vec3();
        if cam.z < MIN_DEPTH {
            cam.z = MIN_DEPTH;
        }
        let p = self.k * (cam / cam.z);
        Position::planar(0, p.x - 0.5, p.y - 0.5)
    }

    fn default_frame_pack(&self, chroma_format: ChromaFormat) -> FramePackStruct {
        FramePackStruct::from_table(chroma_format, &[&[(0, Rotation::R0)]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{angles, direction};

    #[test]
    fn test_centre_looks_forward() {
        let vp = Viewport::new(64, 48, ViewportParams::default()).unwrap();
        let c = vp.map_2d_to_3d(&Position::planar(0, 31.5, 23.5)).vec3();
        assert!((c - DVec3::X).length() < 1e-12);
        // picture right is -z, picture down is -y
        let r = vp.map_2d_to_3d(&Position::planar(0, 60.0, 23.5)).vec3();
        assert!(r.z < 0.0);
        let d = vp.map_2d_to_3d(&Position::planar(0, 31.5, 40.0)).vec3();
        assert!(d.y < 0.0);
    }

    #[test]
    fn test_edge_matches_fov() {
        let vp = Viewport::new(64, 64, ViewportParams::default()).unwrap();
        // continuous x = W is 45 degrees off axis for a 90 degree fov
        let e = vp.map_2d_to_3d(&Position::planar(0, 63.5, 31.5)).vec3();
        let (lon, lat) = angles(e);
        assert!((lon.to_degrees() - 45.0).abs() < 1e-9);
        assert!(lat.abs() < 1e-9);
    }

    /// Test: Yaw and pitch move the view centre
    /// Validates: centre direction equals (yaw, pitch) on the sphere
    #[test]
    fn test_orientation() {
        let params = ViewportParams {
            yaw: 30.0,
            pitch: 20.0,
            ..Default::default()
        };
        let vp = Viewport::new(32, 32, params).unwrap();
        let c = vp.map_2d_to_3d(&Position::planar(0, 15.5, 15.5)).vec3();
        let expected = direction(30f64.to_radians(), 20f64.to_radians());
        assert!((c - expected).length() < 1e-12);
    }

    #[test]
    fn test_behind_camera_clamps() {
        let vp = Viewport::new(32, 32, ViewportParams::default()).unwrap();
        let p = vp.map_3d_to_2d(&Position::sphere(-DVec3::X));
        assert!(p.x.is_finite() && p.y.is_finite());
    }

    #[test]
    fn test_rejects_bad_fov() {
        let params = ViewportParams {
            fov_x: 180.0,
            ..Default::default()
        };
        assert!(Viewport::new(32, 32, params).is_err());
    }
}
