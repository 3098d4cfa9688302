//! Render pipelines of the point sphere renderer.

pub mod point_sphere;
