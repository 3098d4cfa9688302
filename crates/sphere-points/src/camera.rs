use crate::data::types::{InstanceUniform, ViewUniform};
use glam::{Mat4, Vec4};

/// How a projection matrix maps depth, decided by introspecting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    /// `projection[2][3] == -1`: clip `w` carries view-space depth.
    Perspective,
    /// Anything else; clip `w` stays 1.
    Orthographic,
}

impl ProjectionKind {
    /// Classifies `projection` by its `[2][3]` entry (column 2, row 3).
    ///
    /// Both standard and reversed-Z right-handed perspective matrices store
    /// exactly `-1.0` there.
    #[inline]
    pub fn of(projection: &Mat4) -> Self {
        if projection.z_axis.w == -1.0 {
            Self::Perspective
        } else {
            Self::Orthographic
        }
    }

    #[inline]
    pub fn is_perspective(self) -> bool {
        self == Self::Perspective
    }
}

/// Per-frame camera state supplied by the host renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub view: Mat4,
    pub projection: Mat4,
    /// Cached `projection * view`.
    pub view_proj: Mat4,
    /// x, y, width, height in physical pixels.
    pub viewport: Vec4,
}

impl CameraFrame {
    pub fn new(view: Mat4, projection: Mat4, viewport: Vec4) -> Self {
        Self {
            view,
            projection,
            view_proj: projection * view,
            viewport,
        }
    }

    /// Right-handed perspective camera with an infinite reversed-Z far plane,
    /// the convention of the host renderer the core was written for.
    pub fn perspective_reversed_z(
        view: Mat4,
        fov_y_rad: f32,
        near: f32,
        width: f32,
        height: f32,
    ) -> Self {
        let aspect = width / height.max(1.0);
        let proj = Mat4::perspective_infinite_reverse_rh(fov_y_rad, aspect, near);
        Self::new(view, proj, Vec4::new(0.0, 0.0, width, height))
    }

    /// Right-handed perspective camera with a finite far plane, depth in [0, 1].
    pub fn perspective(
        view: Mat4,
        fov_y_rad: f32,
        near: f32,
        far: f32,
        width: f32,
        height: f32,
    ) -> Self {
        let aspect = width / height.max(1.0);
        let proj = Mat4::perspective_rh(fov_y_rad, aspect, near, far);
        Self::new(view, proj, Vec4::new(0.0, 0.0, width, height))
    }

    /// Right-handed orthographic camera whose view volume is `half_height`
    /// tall above and below the view axis, widened to the viewport aspect.
    pub fn orthographic(
        view: Mat4,
        half_height: f32,
        near: f32,
        far: f32,
        width: f32,
        height: f32,
    ) -> Self {
        let half_width = half_height * width / height.max(1.0);
        let proj = Mat4::orthographic_rh(
            -half_width,
            half_width,
            -half_height,
            half_height,
            near,
            far,
        );
        Self::new(view, proj, Vec4::new(0.0, 0.0, width, height))
    }

    /// Orthographic camera with reversed depth: `near` maps to 1 and `far`
    /// to 0, pairing with the same depth test as [`Self::perspective_reversed_z`].
    pub fn orthographic_reversed_z(
        view: Mat4,
        half_height: f32,
        near: f32,
        far: f32,
        width: f32,
        height: f32,
    ) -> Self {
        Self::orthographic(view, half_height, far, near, width, height)
    }

    #[inline]
    pub fn projection_kind(&self) -> ProjectionKind {
        ProjectionKind::of(&self.projection)
    }

    /// Returns the view uniform block for the GPU.
    pub fn to_uniform(&self) -> ViewUniform {
        ViewUniform {
            view: self.view.to_cols_array_2d(),
            view_proj: self.view_proj.to_cols_array_2d(),
            projection: self.projection.to_cols_array_2d(),
            viewport: self.viewport.to_array(),
        }
    }
}

/// Per-draw model transform and point size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceTransform {
    pub model: Mat4,
    /// World-space point size; the billboard half-size derives from it.
    pub point_size_world_space: f32,
}

impl Default for InstanceTransform {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            point_size_world_space: 1.0,
        }
    }
}

impl InstanceTransform {
    pub fn new(model: Mat4, point_size_world_space: f32) -> Self {
        Self {
            model,
            point_size_world_space,
        }
    }

    pub fn to_uniform(&self) -> InstanceUniform {
        InstanceUniform {
            model: self.model.to_cols_array_2d(),
            point_size_world_space: self.point_size_world_space,
            _pad: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_perspective_matrices() {
        let standard = Mat4::perspective_rh(1.0, 1.5, 0.1, 100.0);
        let reversed = Mat4::perspective_infinite_reverse_rh(1.0, 1.5, 0.1);
        assert_eq!(ProjectionKind::of(&standard), ProjectionKind::Perspective);
        assert_eq!(ProjectionKind::of(&reversed), ProjectionKind::Perspective);
    }

    #[test]
    fn detects_orthographic_matrices() {
        let ortho = Mat4::orthographic_rh(-2.0, 2.0, -1.0, 1.0, 0.1, 50.0);
        assert_eq!(ProjectionKind::of(&ortho), ProjectionKind::Orthographic);
        assert_eq!(ProjectionKind::of(&Mat4::IDENTITY), ProjectionKind::Orthographic);
    }

    #[test]
    fn uniform_keeps_column_major_order() {
        let frame = CameraFrame::perspective(Mat4::IDENTITY, 1.0, 0.1, 10.0, 800.0, 600.0);
        let u = frame.to_uniform();
        // WGSL `projection[2][3]` is column 2, row 3.
        assert_eq!(u.projection[2][3], -1.0);
        assert_eq!(u.viewport, [0.0, 0.0, 800.0, 600.0]);
    }

    #[test]
    fn reversed_orthographic_maps_near_to_one() {
        let frame =
            CameraFrame::orthographic_reversed_z(Mat4::IDENTITY, 5.0, 1.0, 11.0, 100.0, 100.0);
        let depth = |d: f32| {
            let clip = frame.view_proj * Vec4::new(0.0, 0.0, -d, 1.0);
            clip.z / clip.w
        };
        assert!((depth(1.0) - 1.0).abs() < 1e-6);
        assert!(depth(11.0).abs() < 1e-6);
        assert!(frame.projection.z_axis.z > 0.0);
        assert_eq!(frame.projection_kind(), ProjectionKind::Orthographic);
    }
}
