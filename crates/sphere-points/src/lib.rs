// src/lib.rs
//! Point cloud rendering with sphere billboards.
//!
//! Every point is drawn as a camera-facing quad sized in world units. Its
//! depth recedes from the centre towards the rim, so with a reversed-Z
//! depth buffer overlapping points intersect like spheres. The GPU path
//! lives in [`renderer`] and [`shader`]; [`reference`] runs the same stages
//! on the CPU.

pub mod camera;
pub mod clipping;
pub mod config;
pub mod data;
pub mod reference;
pub mod renderer;
pub mod shader;
