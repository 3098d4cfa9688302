//! CPU reference of the point sphere shaders.
//!
//! Mirrors `point_sphere.wgsl` step for step over the same uniform values,
//! so host code and tests can reason about visibility, billboard extent and
//! depth without a GPU. Every instance is independent; the batch helpers
//! map them in parallel over the shared, read-only inputs.

pub mod fragment;
pub mod vertex;

pub use self::fragment::{FragmentInput, FragmentOutput, FragmentShader, Footprint};
pub use self::vertex::{
    billboard_half_size, Displacement, Keyframes, Static, VertexExpander, VertexOutput,
    QUAD_CORNERS,
};

use crate::data::types::PointRecord;
use glam::{Vec2, Vec4};
use rayon::prelude::*;

impl<'a, P: PointRecord, D: Displacement> VertexExpander<'a, P, D> {
    /// Expands every instance in parallel.
    pub fn par_expand_all(&self) -> Vec<[VertexOutput; 4]> {
        (0..self.len())
            .into_par_iter()
            .map(|i| self.expand_instance(i))
            .collect()
    }

    /// Indices of instances that survive clipping, in order.
    pub fn visible_instances(&self) -> Vec<usize> {
        (0..self.len())
            .into_par_iter()
            .filter(|&i| !self.is_clipped(i))
            .collect()
    }
}

/// Interpolates a quad's vertex outputs at quad-local coordinate `uv`.
///
/// All four corners share the centre's clip `z` and `w`, so plain bilinear
/// weights agree with the rasterizer's perspective-correct interpolation.
/// Returns `None` if the quad was discarded.
pub fn interpolate_quad(quad: &[VertexOutput; 4], uv: Vec2) -> Option<VertexOutput> {
    if quad.iter().any(VertexOutput::is_discarded) {
        return None;
    }
    let s = 0.5 * (uv.x + 1.0);
    let t = 0.5 * (uv.y + 1.0);
    let weights = [(1.0 - s) * (1.0 - t), s * (1.0 - t), (1.0 - s) * t, s * t];

    let mut position = Vec4::ZERO;
    let mut local = Vec2::ZERO;
    let mut color = glam::Vec3::ZERO;
    for (v, w) in quad.iter().zip(weights) {
        position += v.position * w;
        local += v.uv * w;
        color += v.color * w;
    }
    Some(VertexOutput {
        position,
        uv: local,
        color,
    })
}

/// Runs both stages for the sample at `uv` on instance `index`.
pub fn shade_sample<P: PointRecord, D: Displacement>(
    expander: &VertexExpander<'_, P, D>,
    fragment: &FragmentShader,
    viewport: Vec4,
    index: usize,
    uv: Vec2,
) -> Option<FragmentOutput> {
    let quad = expander.expand_instance(index);
    let v = interpolate_quad(&quad, uv)?;
    let input = FragmentInput::from_clip(v.position, v.uv, v.color, viewport)?;
    fragment.shade(&input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraFrame, InstanceTransform};
    use crate::clipping::{ClipSet, ClippingPlane};
    use crate::data::types::PointXyz;
    use approx::assert_abs_diff_eq;
    use glam::{Mat4, Vec3};

    #[test]
    fn visible_instances_follow_clip_set() {
        let points: Vec<PointXyz> = (0..10)
            .map(|i| PointXyz { position: [i as f32, 0.0, -5.0] })
            .collect();
        let clip =
            ClipSet::from_planes([ClippingPlane::new(Vec3::ZERO, Vec3::X, 2.5, 6.5)]).unwrap();
        let camera = CameraFrame::perspective(Mat4::IDENTITY, 1.0, 0.1, 100.0, 100.0, 100.0);
        let instance = InstanceTransform::default();
        let expander = VertexExpander::new(&points, &clip, &camera, &instance);

        assert_eq!(expander.visible_instances(), vec![3, 4, 5, 6]);
        let quads = expander.par_expand_all();
        assert_eq!(quads.len(), 10);
        assert!(quads[2].iter().all(VertexOutput::is_discarded));
        assert!(quads[3].iter().all(|v| v.position.is_finite()));
    }

    #[test]
    fn interpolation_at_center_recovers_projected_point() {
        let points = [PointXyz { position: [0.5, 0.25, -3.0] }];
        let clip = ClipSet::new();
        let camera = CameraFrame::perspective(Mat4::IDENTITY, 1.0, 0.1, 100.0, 100.0, 100.0);
        let instance = InstanceTransform::new(Mat4::IDENTITY, 0.3);
        let expander = VertexExpander::new(&points, &clip, &camera, &instance);

        let quad = expander.expand_instance(0);
        let center = interpolate_quad(&quad, Vec2::ZERO).unwrap();
        let expected = camera.view_proj * Vec4::new(0.5, 0.25, -3.0, 1.0);
        assert_abs_diff_eq!(center.position.x, expected.x, epsilon = 1e-5);
        assert_abs_diff_eq!(center.position.y, expected.y, epsilon = 1e-5);
        assert_abs_diff_eq!(center.uv.length(), 0.0, epsilon = 1e-6);

        let edge = interpolate_quad(&quad, Vec2::new(1.0, 0.0)).unwrap();
        assert_abs_diff_eq!(edge.uv.x, 1.0, epsilon = 1e-6);
    }
}
