use crate::camera::{CameraFrame, InstanceTransform};
use crate::clipping::{ClipSet, ClippingPlane};
use crate::data::validate::InputError;
use crate::renderer::pipelines::point_sphere::DepthMode;
use crate::shader::ShaderVariant;
use clap::{Parser, ValueEnum};
use glam::{Mat4, Vec3};

/// Projection used by the camera of the command-line renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Projection {
    Perspective,
    Orthographic,
}

impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Projection::Perspective => "perspective",
            Projection::Orthographic => "orthographic",
        };

        f.write_str(s)
    }
}

/// `sphere-points-render` - runs the point sphere shaders over a synthetic
/// point lattice and reports visibility, billboard extent and depth.
///
/// The CPU reference always runs; `--gpu` additionally builds every
/// pipeline variant on a headless device and draws `--frames` frames.
#[derive(Parser, Debug, Clone)]
#[command(name = "sphere-points-render", version, about, long_about = None)]
pub struct Config {
    /// Number of points in the synthetic lattice.
    #[arg(long, env = "SPHERE_POINTS_COUNT", default_value_t = 100_000)]
    pub points: u32,

    /// Edge length of the cube the lattice fills, in world units.
    #[arg(long, default_value_t = 20.0)]
    pub extent: f32,

    #[arg(long, value_enum, default_value_t = Projection::Perspective)]
    pub projection: Projection,

    /// Vertical field of view in degrees (perspective only).
    #[arg(long, default_value_t = 60.0)]
    pub fov_deg: f32,

    /// Half height of the view volume (orthographic only).
    #[arg(long, default_value_t = 15.0)]
    pub ortho_half_height: f32,

    #[arg(long, default_value_t = 0.1)]
    pub near: f32,

    /// Far plane. The reversed-Z perspective is infinite and ignores it.
    #[arg(long, default_value_t = 1000.0)]
    pub far: f32,

    /// Use standard [0, 1] depth instead of reversed-Z. The bulge only
    /// reads as a sphere with reversed-Z; under standard perspective depth
    /// the rim of every point lands in front of its centre.
    #[arg(long, default_value_t = false)]
    pub standard_depth: bool,

    /// Distance of the camera from the lattice centre along +Z.
    #[arg(long, default_value_t = 40.0)]
    pub camera_distance: f32,

    #[arg(long, env = "SPHERE_POINTS_WIDTH", default_value_t = 1280)]
    pub width: u32,

    #[arg(long, env = "SPHERE_POINTS_HEIGHT", default_value_t = 720)]
    pub height: u32,

    /// World-space point size.
    #[arg(long, default_value_t = 0.05)]
    pub point_size: f32,

    /// Clipping range `ox,oy,oz,nx,ny,nz,min,max`; repeat for up to 16.
    #[arg(long = "clip", value_parser = parse_clipping_range)]
    pub clip: Vec<ClippingPlane>,

    /// Enables keyframe animation with this interpolation factor.
    #[arg(long)]
    pub interpolation: Option<f32>,

    /// Give every point its own colour instead of the positional fallback.
    #[arg(long, default_value_t = false)]
    pub colored: bool,

    /// Discard fragments outside the unit disc.
    #[arg(long, default_value_t = false)]
    pub round: bool,

    /// Also build the GPU pipelines and draw on a headless device.
    #[arg(long, default_value_t = false)]
    pub gpu: bool,

    /// Frames drawn by `--gpu`. Animated clouds sweep the interpolation
    /// factor from 0 up to `--interpolation` across them.
    #[arg(long, default_value_t = 1)]
    pub frames: u32,

    /// Camera rotation about +Y between consecutive frames, in degrees.
    #[arg(long, default_value_t = 0.0)]
    pub orbit_deg: f32,

    /// Point size added per frame. The size never drops below zero.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub size_step: f32,

    /// Distance every clipping range slides along its normal per frame.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub clip_slide: f32,
}

impl Config {
    pub fn variant(&self) -> ShaderVariant {
        ShaderVariant {
            colored: self.colored,
            animated: self.interpolation.is_some(),
            round_footprint: self.round,
        }
    }

    pub fn camera_frame(&self) -> CameraFrame {
        self.camera_frame_at(0)
    }

    /// Camera of `frame`, orbited `frame * orbit_deg` about +Y.
    pub fn camera_frame_at(&self, frame: u32) -> CameraFrame {
        let angle = (frame as f32 * self.orbit_deg).to_radians();
        let eye = Mat4::from_rotation_y(angle).transform_point3(Vec3::Z * self.camera_distance);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let (w, h) = (self.width as f32, self.height as f32);
        let fov = self.fov_deg.to_radians();
        let half_height = self.ortho_half_height;
        match (self.projection, self.depth_mode()) {
            (Projection::Perspective, DepthMode::ReversedZ) => {
                CameraFrame::perspective_reversed_z(view, fov, self.near, w, h)
            }
            (Projection::Perspective, DepthMode::Standard) => {
                CameraFrame::perspective(view, fov, self.near, self.far, w, h)
            }
            (Projection::Orthographic, DepthMode::ReversedZ) => {
                CameraFrame::orthographic_reversed_z(view, half_height, self.near, self.far, w, h)
            }
            (Projection::Orthographic, DepthMode::Standard) => {
                CameraFrame::orthographic(view, half_height, self.near, self.far, w, h)
            }
        }
    }

    pub fn depth_mode(&self) -> DepthMode {
        if self.standard_depth {
            DepthMode::Standard
        } else {
            DepthMode::ReversedZ
        }
    }

    /// Interpolation factor of `frame`: a linear sweep from 0 that reaches
    /// `--interpolation` on the last frame.
    pub fn interpolation_at(&self, frame: u32) -> Option<f32> {
        let frames = self.frames.max(1);
        self.interpolation.map(|t| t * (frame + 1).min(frames) as f32 / frames as f32)
    }

    /// Model transform and point size of `frame`.
    pub fn instance_at(&self, frame: u32) -> InstanceTransform {
        let size = (self.point_size + frame as f32 * self.size_step).max(0.0);
        InstanceTransform::new(Mat4::IDENTITY, size)
    }

    pub fn clip_set(&self) -> Result<ClipSet, InputError> {
        self.clip_set_at(0)
    }

    /// Clip set of `frame`; only origins move, so a set valid on frame 0
    /// stays valid.
    pub fn clip_set_at(&self, frame: u32) -> Result<ClipSet, InputError> {
        let shift = frame as f32 * self.clip_slide;
        ClipSet::from_planes(self.clip.iter().map(|plane| ClippingPlane {
            origin: plane.origin + plane.unit_normal * shift,
            ..*plane
        }))
    }
}

/// Parses `ox,oy,oz,nx,ny,nz,min,max`. The normal is normalised.
pub fn parse_clipping_range(s: &str) -> Result<ClippingPlane, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|e| format!("'{}': {}", v.trim(), e)))
        .collect::<Result<Vec<f32>, String>>()?;
    let &[ox, oy, oz, nx, ny, nz, min, max] = values.as_slice() else {
        return Err(format!("expected 8 comma-separated numbers, got {}", values.len()));
    };
    let normal = Vec3::new(nx, ny, nz)
        .try_normalize()
        .ok_or_else(|| "clipping normal must be non-zero".to_string())?;
    Ok(ClippingPlane::new(Vec3::new(ox, oy, oz), normal, min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parses_clipping_ranges() {
        let plane = parse_clipping_range("1, 2, 3, 0, 0, 2, -0.5, 4").unwrap();
        assert_eq!(plane.origin, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(plane.unit_normal, Vec3::Z);
        assert_eq!((plane.min_sdist, plane.max_sdist), (-0.5, 4.0));

        assert!(parse_clipping_range("1,2,3").is_err());
        assert!(parse_clipping_range("0,0,0,0,0,0,0,1").is_err());
        assert!(parse_clipping_range("0,0,0,x,0,1,0,1").is_err());
    }

    #[test]
    fn command_line_selects_variant() {
        let cfg = Config::parse_from([
            "sphere-points-render",
            "--colored",
            "--interpolation",
            "0.5",
            "--projection",
            "orthographic",
            "--clip",
            "0,0,0,1,0,0,-1,1",
        ]);
        assert_eq!(
            cfg.variant(),
            ShaderVariant {
                colored: true,
                animated: true,
                round_footprint: false,
            }
        );
        assert_eq!(cfg.clip_set().unwrap().len(), 1);
        assert_eq!(cfg.depth_mode(), DepthMode::ReversedZ);
        assert!(cfg.camera_frame().projection.z_axis.z > 0.0);
        assert_eq!(
            cfg.camera_frame().projection_kind(),
            crate::camera::ProjectionKind::Orthographic
        );
    }

    #[test]
    fn depth_defaults_to_reversed_z() {
        let cfg = Config::parse_from(["sphere-points-render"]);
        assert_eq!(cfg.depth_mode(), DepthMode::ReversedZ);
        let projection = cfg.camera_frame().projection;
        assert_eq!(
            projection,
            Mat4::perspective_infinite_reverse_rh(
                cfg.fov_deg.to_radians(),
                cfg.width as f32 / cfg.height as f32,
                cfg.near,
            )
        );

        let cfg = Config::parse_from(["sphere-points-render", "--standard-depth"]);
        assert_eq!(cfg.depth_mode(), DepthMode::Standard);
        assert!(cfg.camera_frame().projection.z_axis.z < 0.0);
    }

    #[test]
    fn frames_sweep_interpolation_and_orbit() {
        let cfg = Config::parse_from([
            "sphere-points-render",
            "--interpolation",
            "0.8",
            "--frames",
            "4",
            "--orbit-deg",
            "90",
        ]);
        assert_eq!(cfg.interpolation_at(0), Some(0.2));
        assert_eq!(cfg.interpolation_at(3), Some(0.8));
        assert_eq!(cfg.interpolation_at(9), Some(0.8));

        let eye = cfg.camera_frame_at(1).view.inverse().w_axis.truncate();
        assert!(eye.abs_diff_eq(Vec3::X * cfg.camera_distance, 1e-3));

        let still = Config::parse_from(["sphere-points-render", "--frames", "3"]);
        assert_eq!(still.interpolation_at(1), None);
        assert_eq!(still.instance_at(2), still.instance_at(0));
    }

    #[test]
    fn frames_step_point_size_and_slide_clipping() {
        let cfg = Config::parse_from([
            "sphere-points-render",
            "--point-size",
            "0.5",
            "--size-step",
            "-0.2",
            "--clip",
            "0,0,0,0,2,0,-1,1",
            "--clip-slide",
            "0.25",
        ]);
        assert_eq!(cfg.instance_at(0).point_size_world_space, 0.5);
        assert_relative_eq!(cfg.instance_at(2).point_size_world_space, 0.1, epsilon = 1e-6);
        assert_eq!(cfg.instance_at(3).point_size_world_space, 0.0);

        let first = cfg.clip_set_at(0).unwrap();
        let moved = cfg.clip_set_at(4).unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved.ranges()[0].origin, Vec3::Y);
        assert_eq!(moved.ranges()[0].unit_normal, first.ranges()[0].unit_normal);
        assert!(first.contains(Vec3::new(0.0, -0.5, 0.0)));
        assert!(!moved.contains(Vec3::new(0.0, -0.5, 0.0)));
    }
}
