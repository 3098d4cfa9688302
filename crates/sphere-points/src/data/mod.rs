// src/data/mod.rs
//! Data handling for the point sphere renderer.
//!
//! This module provides:
//! - The GPU buffer layouts shared with the shader.
//! - Host-boundary validation of point, keyframe and clip inputs.
//! - Upload of validated inputs into GPU buffers and bind groups.

pub mod point_cloud;
pub mod types;
pub mod validate;

// Re-export commonly used types for convenience.
pub use self::point_cloud::{upload_point_cloud, PointCloudGpu};
pub use self::types::{KeyframeOffset, PointRecord, PointXyz, PointXyzRgb, MAX_CLIPPING_RANGES};
pub use self::validate::InputError;
