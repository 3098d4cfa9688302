//! Slab clipping: a point survives only if its signed distance to every
//! active plane lies inside that plane's interval.

use crate::data::types::{ClippingRangeStd140, ClippingRangesStd140, MAX_CLIPPING_RANGES};
use crate::data::validate::InputError;
use glam::Vec3;

/// A plane plus the signed-distance interval points must fall into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippingPlane {
    pub origin: Vec3,
    /// Must be unit length.
    pub unit_normal: Vec3,
    pub min_sdist: f32,
    pub max_sdist: f32,
}

impl ClippingPlane {
    pub fn new(origin: Vec3, unit_normal: Vec3, min_sdist: f32, max_sdist: f32) -> Self {
        Self {
            origin,
            unit_normal,
            min_sdist,
            max_sdist,
        }
    }

    /// Keeps everything on the positive side of the plane.
    pub fn half_space(origin: Vec3, unit_normal: Vec3) -> Self {
        Self::new(origin, unit_normal, 0.0, f32::INFINITY)
    }

    /// Keeps a slab of `thickness` centred on the plane.
    pub fn slab(origin: Vec3, unit_normal: Vec3, thickness: f32) -> Self {
        let half = 0.5 * thickness;
        Self::new(origin, unit_normal, -half, half)
    }

    #[inline]
    pub fn signed_distance(&self, world_pos: Vec3) -> f32 {
        (world_pos - self.origin).dot(self.unit_normal)
    }

    /// Inclusive on both ends, like the shader's `<`/`>` rejection test.
    #[inline]
    pub fn contains(&self, world_pos: Vec3) -> bool {
        let d = self.signed_distance(world_pos);
        !(d < self.min_sdist || d > self.max_sdist)
    }

    fn to_std140(self) -> ClippingRangeStd140 {
        ClippingRangeStd140 {
            origin: self.origin.to_array(),
            min_sdist: self.min_sdist,
            unit_normal: self.unit_normal.to_array(),
            max_sdist: self.max_sdist,
        }
    }
}

/// Ordered clip set of up to [`MAX_CLIPPING_RANGES`] planes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipSet {
    ranges: Vec<ClippingPlane>,
}

impl ClipSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_planes(
        planes: impl IntoIterator<Item = ClippingPlane>,
    ) -> Result<Self, InputError> {
        let mut set = Self::new();
        for plane in planes {
            set.push(plane)?;
        }
        Ok(set)
    }

    /// Appends a range; fails once the set is full.
    pub fn push(&mut self, plane: ClippingPlane) -> Result<(), InputError> {
        if self.ranges.len() >= MAX_CLIPPING_RANGES {
            return Err(InputError::TooManyClippingRanges {
                count: self.ranges.len() + 1,
            });
        }
        self.ranges.push(plane);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    #[inline]
    pub fn ranges(&self) -> &[ClippingPlane] {
        &self.ranges
    }

    /// Index of the first range rejecting `world_pos`, in evaluation order.
    pub fn first_rejecting(&self, world_pos: Vec3) -> Option<usize> {
        self.ranges.iter().position(|r| !r.contains(world_pos))
    }

    /// True if `world_pos` lies inside the intersection of all ranges.
    #[inline]
    pub fn contains(&self, world_pos: Vec3) -> bool {
        self.first_rejecting(world_pos).is_none()
    }

    pub fn to_uniform(&self) -> ClippingRangesStd140 {
        let mut out = ClippingRangesStd140::default();
        for (slot, range) in out.ranges.iter_mut().zip(&self.ranges) {
            *slot = range.to_std140();
        }
        out.num_ranges = self.ranges.len() as u32;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_distance_follows_normal() {
        let plane = ClippingPlane::half_space(Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        assert_eq!(plane.signed_distance(Vec3::new(3.0, 4.0, -2.0)), 3.0);
        assert_eq!(plane.signed_distance(Vec3::ZERO), -1.0);
        assert!(plane.contains(Vec3::new(0.0, 1.0, 0.0)));
        assert!(!plane.contains(Vec3::ZERO));
    }

    #[test]
    fn every_range_must_accept() {
        let set = ClipSet::from_planes([
            ClippingPlane::slab(Vec3::ZERO, Vec3::X, 2.0),
            ClippingPlane::slab(Vec3::ZERO, Vec3::Y, 2.0),
        ])
        .unwrap();
        assert!(set.contains(Vec3::new(0.5, 0.5, 100.0)));
        assert_eq!(set.first_rejecting(Vec3::new(0.5, 3.0, 0.0)), Some(1));
        assert_eq!(set.first_rejecting(Vec3::new(3.0, 3.0, 0.0)), Some(0));
    }

    #[test]
    fn capacity_is_enforced() {
        let mut set = ClipSet::new();
        for _ in 0..MAX_CLIPPING_RANGES {
            set.push(ClippingPlane::half_space(Vec3::ZERO, Vec3::Z)).unwrap();
        }
        let err = set
            .push(ClippingPlane::half_space(Vec3::ZERO, Vec3::Z))
            .unwrap_err();
        assert!(matches!(err, InputError::TooManyClippingRanges { count: 17 }));
    }

    #[test]
    fn uniform_zeroes_inactive_slots() {
        let set =
            ClipSet::from_planes([ClippingPlane::new(Vec3::ONE, Vec3::X, -1.0, 2.0)]).unwrap();
        let u = set.to_uniform();
        assert_eq!(u.num_ranges, 1);
        assert_eq!(u.ranges[0].origin, [1.0, 1.0, 1.0]);
        assert_eq!(u.ranges[0].max_sdist, 2.0);
        assert_eq!(u.ranges[1], ClippingRangeStd140::default());
    }
}
