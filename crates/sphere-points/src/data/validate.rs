//! Host-boundary checks for the invariants the shaders assume but cannot
//! detect. Run [`validate_draw`] once before expanding or uploading; the
//! CPU reference and the GPU path never re-check.

use crate::camera::{CameraFrame, InstanceTransform};
use crate::clipping::ClipSet;
use crate::data::types::{KeyframeOffset, PointRecord, MAX_CLIPPING_RANGES};
use crate::reference::Keyframes;
use thiserror::Error;

/// Allowed deviation of a clip normal's length from 1.
pub const UNIT_NORMAL_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("keyframe buffers must match the point count {points} (prev = {prev}, next = {next})")]
    KeyframeLengthMismatch { points: usize, prev: usize, next: usize },

    #[error("at most 16 clipping ranges are supported, got {count}")]
    TooManyClippingRanges { count: usize },

    #[error("clipping range {index} has a non-unit normal (length {length})")]
    NonUnitNormal { index: usize, length: f32 },

    #[error("clipping range {index} has min_sdist {min} greater than max_sdist {max}")]
    InvertedClippingRange { index: usize, min: f32, max: f32 },

    #[error("point size must be finite and non-negative, got {0}")]
    InvalidPointSize(f32),

    #[error("point {index} has a non-finite position")]
    NonFinitePosition { index: usize },

    #[error("point {index} has a colour component outside [0, 1]")]
    ColorOutOfRange { index: usize },

    #[error("viewport must have a positive width and height, got {width}x{height}")]
    EmptyViewport { width: f32, height: f32 },
}

/// Checks every point record for finite positions and, for coloured
/// layouts, colours in [0, 1].
pub fn validate_points<P: PointRecord>(points: &[P]) -> Result<(), InputError> {
    for (index, p) in points.iter().enumerate() {
        if !p.position().is_finite() {
            return Err(InputError::NonFinitePosition { index });
        }
        if let Some(c) = p.stored_color() {
            if c.cmplt(glam::Vec3::ZERO).any() || c.cmpgt(glam::Vec3::ONE).any() || !c.is_finite() {
                return Err(InputError::ColorOutOfRange { index });
            }
        }
    }
    Ok(())
}

/// Checks that both keyframe buffers line up with the point buffer.
/// An interpolation factor outside [0, 1] is only logged.
pub fn validate_keyframes(
    points: usize,
    prev: &[KeyframeOffset],
    next: &[KeyframeOffset],
    interpolation: f32,
) -> Result<(), InputError> {
    if prev.len() != points || next.len() != points {
        return Err(InputError::KeyframeLengthMismatch {
            points,
            prev: prev.len(),
            next: next.len(),
        });
    }
    warn_if_extrapolating(interpolation);
    Ok(())
}

/// Factors outside [0, 1] extrapolate past the keyframes; allowed, but logged.
pub fn warn_if_extrapolating(interpolation: f32) {
    if !(0.0..=1.0).contains(&interpolation) {
        log::warn!(
            "Keyframe interpolation factor {} is outside [0, 1]; extrapolating.",
            interpolation
        );
    }
}

pub fn validate_clip_set(clip: &ClipSet) -> Result<(), InputError> {
    if clip.len() > MAX_CLIPPING_RANGES {
        return Err(InputError::TooManyClippingRanges { count: clip.len() });
    }
    for (index, range) in clip.ranges().iter().enumerate() {
        let length = range.unit_normal.length();
        if !((length - 1.0).abs() <= UNIT_NORMAL_TOLERANCE) {
            return Err(InputError::NonUnitNormal { index, length });
        }
        if range.min_sdist > range.max_sdist {
            return Err(InputError::InvertedClippingRange {
                index,
                min: range.min_sdist,
                max: range.max_sdist,
            });
        }
    }
    Ok(())
}

pub fn validate_instance(instance: &InstanceTransform) -> Result<(), InputError> {
    let size = instance.point_size_world_space;
    if !size.is_finite() || size < 0.0 {
        return Err(InputError::InvalidPointSize(size));
    }
    Ok(())
}

pub fn validate_camera(camera: &CameraFrame) -> Result<(), InputError> {
    let (width, height) = (camera.viewport.z, camera.viewport.w);
    if !(width > 0.0 && height > 0.0) {
        return Err(InputError::EmptyViewport { width, height });
    }
    Ok(())
}

/// Every check one draw needs, in the order the vertex stage consumes its
/// inputs.
pub fn validate_draw<P: PointRecord>(
    points: &[P],
    keyframes: Option<&Keyframes<'_>>,
    clip: &ClipSet,
    instance: &InstanceTransform,
    camera: &CameraFrame,
) -> Result<(), InputError> {
    validate_points(points)?;
    if let Some(kf) = keyframes {
        validate_keyframes(points.len(), kf.prev, kf.next, kf.interpolation)?;
    }
    validate_clip_set(clip)?;
    validate_instance(instance)?;
    validate_camera(camera)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipping::ClippingPlane;
    use crate::data::types::{PointXyz, PointXyzRgb};
    use glam::{Mat4, Vec3, Vec4};

    #[test]
    fn rejects_mismatched_keyframes() {
        let prev = vec![KeyframeOffset::default(); 3];
        let next = vec![KeyframeOffset::default(); 2];
        assert_eq!(
            validate_keyframes(3, &prev, &next, 0.5),
            Err(InputError::KeyframeLengthMismatch { points: 3, prev: 3, next: 2 })
        );
        assert!(validate_keyframes(3, &prev, &prev, 1.5).is_ok());
    }

    #[test]
    fn rejects_bad_clipping_ranges() {
        let skewed =
            ClipSet::from_planes([ClippingPlane::half_space(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0))])
                .unwrap();
        assert!(matches!(
            validate_clip_set(&skewed),
            Err(InputError::NonUnitNormal { index: 0, .. })
        ));

        let inverted = ClipSet::from_planes([
            ClippingPlane::half_space(Vec3::ZERO, Vec3::X),
            ClippingPlane::new(Vec3::ZERO, Vec3::Y, 1.0, -1.0),
        ])
        .unwrap();
        assert_eq!(
            validate_clip_set(&inverted),
            Err(InputError::InvertedClippingRange { index: 1, min: 1.0, max: -1.0 })
        );
    }

    #[test]
    fn rejects_bad_points() {
        let pts = [PointXyz { position: [0.0, f32::NAN, 0.0] }];
        assert_eq!(validate_points(&pts), Err(InputError::NonFinitePosition { index: 0 }));

        let colored = [
            PointXyzRgb { position: [0.0; 3], color: [0.5; 3] },
            PointXyzRgb { position: [0.0; 3], color: [1.5, 0.0, 0.0] },
        ];
        assert_eq!(validate_points(&colored), Err(InputError::ColorOutOfRange { index: 1 }));
    }

    #[test]
    fn rejects_negative_point_size_and_empty_viewport() {
        let inst = InstanceTransform::new(Mat4::IDENTITY, -0.5);
        assert_eq!(validate_instance(&inst), Err(InputError::InvalidPointSize(-0.5)));
        assert!(validate_instance(&InstanceTransform::new(Mat4::IDENTITY, 0.0)).is_ok());

        let cam = CameraFrame::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec4::new(0.0, 0.0, 0.0, 10.0));
        assert!(matches!(validate_camera(&cam), Err(InputError::EmptyViewport { .. })));
    }

    #[test]
    fn draw_check_covers_every_input() {
        let pts = [PointXyz { position: [1.0, 2.0, 3.0] }; 2];
        let offsets = [KeyframeOffset::default(); 2];
        let keyframes = Keyframes {
            prev: &offsets,
            next: &offsets,
            interpolation: 0.5,
        };
        let clip = ClipSet::new();
        let instance = InstanceTransform::default();
        let camera = CameraFrame::perspective(Mat4::IDENTITY, 1.0, 0.1, 10.0, 64.0, 64.0);
        assert!(validate_draw(&pts, Some(&keyframes), &clip, &instance, &camera).is_ok());

        let short = Keyframes {
            next: &offsets[..1],
            ..keyframes
        };
        assert!(matches!(
            validate_draw(&pts, Some(&short), &clip, &instance, &camera),
            Err(InputError::KeyframeLengthMismatch { .. })
        ));

        let unbounded = InstanceTransform::new(Mat4::IDENTITY, f32::INFINITY);
        assert_eq!(
            validate_draw(&pts, None, &clip, &unbounded, &camera),
            Err(InputError::InvalidPointSize(f32::INFINITY))
        );

        let flat = CameraFrame {
            viewport: Vec4::new(0.0, 0.0, 64.0, 0.0),
            ..camera
        };
        assert!(matches!(
            validate_draw(&pts, None, &clip, &instance, &flat),
            Err(InputError::EmptyViewport { .. })
        ));
    }
}
