use crate::camera::{CameraFrame, InstanceTransform, ProjectionKind};
use crate::clipping::ClipSet;
use crate::data::types::{KeyframeOffset, PointRecord};
use glam::{Vec2, Vec3, Vec4};

/// Corners of the per-instance quad, in triangle-strip order.
pub const QUAD_CORNERS: [Vec2; 4] = [
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(-1.0, 1.0),
    Vec2::new(1.0, 1.0),
];

/// Per-point positional displacement applied before the model transform.
pub trait Displacement: Sync {
    fn displace(&self, index: usize, position: Vec3) -> Vec3;
}

/// Static points: positions are used as stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Static;

impl Displacement for Static {
    #[inline(always)]
    fn displace(&self, _index: usize, position: Vec3) -> Vec3 {
        position
    }
}

/// Two keyframes of offsets and the shared interpolation factor.
#[derive(Debug, Clone, Copy)]
pub struct Keyframes<'a> {
    pub prev: &'a [KeyframeOffset],
    pub next: &'a [KeyframeOffset],
    pub interpolation: f32,
}

impl Keyframes<'_> {
    /// `prev + (next - prev) * t`.
    #[inline]
    pub fn offset(&self, index: usize) -> Vec3 {
        let prev = Vec3::from(self.prev[index].offset);
        let next = Vec3::from(self.next[index].offset);
        prev + (next - prev) * self.interpolation
    }
}

impl Displacement for Keyframes<'_> {
    #[inline]
    fn displace(&self, index: usize, position: Vec3) -> Vec3 {
        position + self.offset(index)
    }
}

/// Output of one vertex invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexOutput {
    /// Clip-space position, or all-NaN when the point was clipped.
    pub position: Vec4,
    /// Quad-local coordinate in [-1, 1]².
    pub uv: Vec2,
    pub color: Vec3,
}

impl VertexOutput {
    fn discarded(corner: Vec2) -> Self {
        Self {
            position: Vec4::splat(f32::NAN),
            uv: corner,
            color: Vec3::ZERO,
        }
    }

    #[inline]
    pub fn is_discarded(&self) -> bool {
        self.position.is_nan()
    }
}

/// Clip-space half-size of a billboard before the perspective divide.
///
/// Perspective projections yield a size that the divide by `w` later
/// shrinks with distance; orthographic ones a constant size normalised by
/// the wider of the two view-volume axes. The vertical component is
/// stretched by the viewport's width/height so the quad stays square on
/// screen.
pub fn billboard_half_size(camera: &CameraFrame, point_size_world_space: f32) -> Vec2 {
    let proj = &camera.projection;
    let size = match ProjectionKind::of(proj) {
        ProjectionKind::Perspective => 0.5 * point_size_world_space / proj.y_axis.y,
        ProjectionKind::Orthographic => {
            let scale = (2.0 / proj.x_axis.x).abs().max((2.0 / proj.y_axis.y).abs());
            point_size_world_space / scale
        }
    };
    Vec2::new(size, size * camera.viewport.z / camera.viewport.w)
}

/// CPU rendition of the vertex stage.
///
/// The point layout `P` and displacement `D` are type parameters, so the
/// coloured/fallback and animated/static choices are monomorphised the same
/// way the GPU side compiles one shader per variant.
pub struct VertexExpander<'a, P, D = Static> {
    points: &'a [P],
    displacement: D,
    clip: &'a ClipSet,
    camera: &'a CameraFrame,
    instance: &'a InstanceTransform,
    half_size: Vec2,
}

impl<'a, P: PointRecord> VertexExpander<'a, P, Static> {
    pub fn new(
        points: &'a [P],
        clip: &'a ClipSet,
        camera: &'a CameraFrame,
        instance: &'a InstanceTransform,
    ) -> Self {
        Self {
            points,
            displacement: Static,
            clip,
            camera,
            instance,
            half_size: billboard_half_size(camera, instance.point_size_world_space),
        }
    }

    /// Switches to the animated variant.
    pub fn animated(self, keyframes: Keyframes<'a>) -> VertexExpander<'a, P, Keyframes<'a>> {
        VertexExpander {
            points: self.points,
            displacement: keyframes,
            clip: self.clip,
            camera: self.camera,
            instance: self.instance,
            half_size: self.half_size,
        }
    }
}

impl<'a, P: PointRecord, D: Displacement> VertexExpander<'a, P, D> {
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn half_size(&self) -> Vec2 {
        self.half_size
    }

    /// Model-space position after displacement.
    #[inline]
    pub fn effective_position(&self, index: usize) -> Vec3 {
        self.displacement
            .displace(index, self.points[index].position())
    }

    /// Homogeneous world-space position.
    #[inline]
    pub fn world_position(&self, index: usize) -> Vec4 {
        self.instance.model * self.effective_position(index).extend(1.0)
    }

    /// True if any active clipping range rejects the point.
    pub fn is_clipped(&self, index: usize) -> bool {
        self.clipped_world(self.world_position(index))
    }

    #[inline]
    fn clipped_world(&self, world: Vec4) -> bool {
        if self.clip.is_empty() {
            return false;
        }
        !self.clip.contains(world.truncate() / world.w)
    }

    /// Runs the vertex stage for one quad corner of instance `index`.
    pub fn expand(&self, index: usize, corner: Vec2) -> VertexOutput {
        let local = self.effective_position(index);
        let world = self.instance.model * local.extend(1.0);
        if self.clipped_world(world) {
            return VertexOutput::discarded(corner);
        }

        let center = self.camera.view_proj * world;
        let offset = corner * self.half_size;
        VertexOutput {
            position: center + Vec4::new(offset.x, offset.y, 0.0, 0.0),
            uv: corner,
            color: self.points[index].color(local),
        }
    }

    /// All four corners of instance `index`.
    pub fn expand_instance(&self, index: usize) -> [VertexOutput; 4] {
        QUAD_CORNERS.map(|corner| self.expand(index, corner))
    }
}
