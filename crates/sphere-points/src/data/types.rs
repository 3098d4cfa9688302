//! GPU data layouts shared by the host and `point_sphere.wgsl`.
//!
//! Every struct here mirrors a WGSL declaration byte for byte; the size
//! checks at the bottom keep the two sides from drifting apart.

use glam::Vec3;

/// Maximum number of clipping ranges evaluated per draw.
pub const MAX_CLIPPING_RANGES: usize = 16;

/// Point record of the uncoloured layout. Stored as three tightly packed
/// floats so the storage buffer can be read as `array<f32>`.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, Default, PartialEq)]
pub struct PointXyz {
    pub position: [f32; 3],
}

/// Point record of the coloured layout: position followed by linear RGB.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, Default, PartialEq)]
pub struct PointXyzRgb {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Positional offset of one point in one keyframe.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, Default, PartialEq)]
pub struct KeyframeOffset {
    pub offset: [f32; 3],
}

/// A point layout the pipeline can be built for.
///
/// Implemented by the two record types above. The associated constant is
/// what selects the coloured or fallback-coloured pipeline variant, so the
/// choice is made once per draw at the type level.
pub trait PointRecord: bytemuck::Pod + Send + Sync {
    /// Whether records carry their own colour.
    const COLORED: bool;

    fn position(&self) -> Vec3;

    /// Colour emitted by the vertex stage. `effective` is the model-space
    /// position after keyframe interpolation.
    fn color(&self, effective: Vec3) -> Vec3;

    /// Stored colour, if this layout has one.
    fn stored_color(&self) -> Option<Vec3>;
}

impl PointRecord for PointXyz {
    const COLORED: bool = false;

    #[inline]
    fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    /// Debug colouring from the fractional part of each coordinate.
    #[inline]
    fn color(&self, effective: Vec3) -> Vec3 {
        fallback_color(effective)
    }

    #[inline]
    fn stored_color(&self) -> Option<Vec3> {
        None
    }
}

impl PointRecord for PointXyzRgb {
    const COLORED: bool = true;

    #[inline]
    fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    #[inline]
    fn color(&self, _effective: Vec3) -> Vec3 {
        Vec3::from(self.color)
    }

    #[inline]
    fn stored_color(&self) -> Option<Vec3> {
        Some(Vec3::from(self.color))
    }
}

/// `position mod 1.0` per axis, using the floor convention of WGSL's
/// `fract` so negative coordinates still land in [0, 1).
#[inline]
pub fn fallback_color(position: Vec3) -> Vec3 {
    position - position.floor()
}

/// Per-frame view data. Must match `View` in `point_sphere.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct ViewUniform {
    pub view: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// x, y, width, height in physical pixels.
    pub viewport: [f32; 4],
}

/// Per-draw transform data. Must match `Instance` in `point_sphere.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct InstanceUniform {
    pub model: [[f32; 4]; 4],
    pub point_size_world_space: f32,
    pub _pad: [f32; 3],
}

/// One clipping range, packed so each scalar fills the tail of a vec3 slot.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, Default, PartialEq)]
pub struct ClippingRangeStd140 {
    pub origin: [f32; 3],
    pub min_sdist: f32,
    pub unit_normal: [f32; 3],
    pub max_sdist: f32,
}

/// Fixed-capacity clip set. Must match `ClippingRanges` in `point_sphere.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct ClippingRangesStd140 {
    pub ranges: [ClippingRangeStd140; MAX_CLIPPING_RANGES],
    pub num_ranges: u32,
    pub _pad: [u32; 3],
}

impl Default for ClippingRangesStd140 {
    fn default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

/// Header of a keyframe storage buffer. The offsets follow it as a runtime
/// sized `array<f32>`; see `Keyframe` in `point_sphere.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, Default)]
pub struct KeyframeHeader {
    pub interpolation: f32,
}

// Compile-time safety checks: buffer sizes must match WGSL-reflected sizes.
const _: [(); 12] = [(); core::mem::size_of::<PointXyz>()];
const _: [(); 24] = [(); core::mem::size_of::<PointXyzRgb>()];
const _: [(); 12] = [(); core::mem::size_of::<KeyframeOffset>()];
const _: [(); 208] = [(); core::mem::size_of::<ViewUniform>()];
const _: [(); 80] = [(); core::mem::size_of::<InstanceUniform>()];
const _: [(); 32] = [(); core::mem::size_of::<ClippingRangeStd140>()];
const _: [(); 528] = [(); core::mem::size_of::<ClippingRangesStd140>()];
const _: [(); 4] = [(); core::mem::size_of::<KeyframeHeader>()];
