use crate::camera::{CameraFrame, InstanceTransform, ProjectionKind};
use glam::{Vec2, Vec3, Vec4};

/// Shape of the covered area of each billboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Footprint {
    /// The whole quad is opaque; the depth bulge keeps growing past r = 1.
    #[default]
    Square,
    /// Fragments with r > 1 are discarded.
    Round,
}

/// Inputs of one fragment invocation after rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentInput {
    pub uv: Vec2,
    pub color: Vec3,
    /// Framebuffer x/y, depth-buffer z, and `w` holding the reciprocal of
    /// the clip-space `w`.
    pub frag_coord: Vec4,
}

impl FragmentInput {
    /// Fixed-function step for a single sample: perspective divide and
    /// viewport mapping of a clip-space position. Returns `None` for
    /// positions the rasterizer would drop.
    pub fn from_clip(clip: Vec4, uv: Vec2, color: Vec3, viewport: Vec4) -> Option<Self> {
        if !clip.is_finite() || clip.w == 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let x = viewport.x + (0.5 * ndc.x + 0.5) * viewport.z;
        let y = viewport.y + (0.5 - 0.5 * ndc.y) * viewport.w;
        Some(Self {
            uv,
            color,
            frag_coord: Vec4::new(x, y, ndc.z, clip.w.recip()),
        })
    }
}

/// Outputs of one fragment invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentOutput {
    pub color: Vec4,
    /// Value written to the depth attachment.
    pub depth: f32,
    /// Same value, written to the linear depth target for later passes.
    pub linear_depth: f32,
}

/// CPU rendition of the fragment stage.
#[derive(Debug, Clone, Copy)]
pub struct FragmentShader {
    kind: ProjectionKind,
    /// `projection[2][2]`, i.e. `1 / (near - far)` for orthographic matrices.
    depth_scale: f32,
    point_size_world_space: f32,
    footprint: Footprint,
}

impl FragmentShader {
    pub fn new(camera: &CameraFrame, instance: &InstanceTransform, footprint: Footprint) -> Self {
        Self {
            kind: camera.projection_kind(),
            depth_scale: camera.projection.z_axis.z,
            point_size_world_space: instance.point_size_world_space,
            footprint,
        }
    }

    /// Shades one fragment. `None` means the fragment was discarded, which
    /// only happens with [`Footprint::Round`].
    pub fn shade(&self, input: &FragmentInput) -> Option<FragmentOutput> {
        let radius = input.uv.length();
        if self.footprint == Footprint::Round && radius > 1.0 {
            return None;
        }

        let depth = self.bulged_depth(input.frag_coord, radius);
        Some(FragmentOutput {
            color: input.color.extend(1.0),
            depth,
            linear_depth: depth,
        })
    }

    /// Depth of the rounded surface at `radius` from the billboard centre.
    ///
    /// The flat depth `frag_coord.z` is rescaled by `depth / (depth + size *
    /// offset)` where `depth = 1 / frag_coord.w` and the offset grows
    /// linearly with the radius.
    pub fn bulged_depth(&self, frag_coord: Vec4, radius: f32) -> f32 {
        let depth = frag_coord.w.recip();
        let depth_offset = match self.kind {
            ProjectionKind::Perspective => radius,
            ProjectionKind::Orthographic => radius * self.depth_scale,
        };
        let offset_depth = depth + self.point_size_world_space * depth_offset;
        if offset_depth == 0.0 {
            return frag_coord.z;
        }
        frag_coord.z * (depth / offset_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Mat4;

    fn perspective_shader(size: f32, footprint: Footprint) -> FragmentShader {
        let camera = CameraFrame::perspective(Mat4::IDENTITY, 1.0, 0.1, 100.0, 640.0, 480.0);
        FragmentShader::new(&camera, &InstanceTransform::new(Mat4::IDENTITY, size), footprint)
    }

    #[test]
    fn output_is_opaque_and_duplicated() {
        let shader = perspective_shader(0.5, Footprint::Square);
        let input = FragmentInput {
            uv: Vec2::new(0.3, -0.2),
            color: Vec3::new(0.2, 0.4, 0.6),
            frag_coord: Vec4::new(10.0, 10.0, 0.9, 0.25),
        };
        let out = shader.shade(&input).unwrap();
        assert_eq!(out.color, Vec4::new(0.2, 0.4, 0.6, 1.0));
        assert_eq!(out.depth, out.linear_depth);
    }

    #[test]
    fn corners_survive_only_with_square_footprint() {
        let input = FragmentInput {
            uv: Vec2::new(0.9, 0.9),
            color: Vec3::ONE,
            frag_coord: Vec4::new(0.0, 0.0, 0.5, 0.5),
        };
        assert!(perspective_shader(1.0, Footprint::Square).shade(&input).is_some());
        assert!(perspective_shader(1.0, Footprint::Round).shade(&input).is_none());
    }

    #[test]
    fn perspective_bulge_matches_closed_form() {
        let shader = perspective_shader(2.0, Footprint::Square);
        let frag = Vec4::new(0.0, 0.0, 0.8, 0.1);
        // depth = 10, offset_depth = 10 + 2 * 0.5 = 11
        assert_relative_eq!(shader.bulged_depth(frag, 0.5), 0.8 * 10.0 / 11.0, epsilon = 1e-6);
    }

    #[test]
    fn orthographic_offset_is_scaled_by_depth_range() {
        let camera = CameraFrame::orthographic(Mat4::IDENTITY, 5.0, 1.0, 11.0, 100.0, 100.0);
        let instance = InstanceTransform::new(Mat4::IDENTITY, 1.0);
        let shader = FragmentShader::new(&camera, &instance, Footprint::Square);
        let frag = Vec4::new(0.0, 0.0, 0.4, 1.0);
        // projection[2][2] = 1 / (1 - 11) = -0.1
        let expected = 0.4 * 1.0 / (1.0 + 1.0 * (1.0 * -0.1));
        assert_relative_eq!(shader.bulged_depth(frag, 1.0), expected, epsilon = 1e-6);
    }

    #[test]
    fn from_clip_maps_to_framebuffer() {
        let viewport = Vec4::new(0.0, 0.0, 200.0, 100.0);
        let clip = Vec4::new(2.0, 2.0, 1.0, 4.0);
        let input = FragmentInput::from_clip(clip, Vec2::ZERO, Vec3::ONE, viewport).unwrap();
        assert_relative_eq!(input.frag_coord.x, 150.0);
        assert_relative_eq!(input.frag_coord.y, 25.0);
        assert_relative_eq!(input.frag_coord.z, 0.25);
        assert_relative_eq!(input.frag_coord.w, 0.25);

        let clipped = Vec4::splat(f32::NAN);
        assert!(FragmentInput::from_clip(clipped, Vec2::ZERO, Vec3::ONE, viewport).is_none());
    }
}
