use crate::camera::InstanceTransform;
use crate::clipping::ClipSet;
use crate::data::types::{KeyframeHeader, KeyframeOffset, PointRecord};
use crate::data::validate::warn_if_extrapolating;
use crate::reference::Keyframes;
use crate::renderer::pipelines::point_sphere::PointSpherePipeline;
use crate::shader::ShaderVariant;
use anyhow::{bail, Result};
use wgpu::util::DeviceExt;

/// Smallest storage buffer we create; empty clouds still need a valid binding.
const MIN_STORAGE_BYTES: usize = 16;

/// All GPU resources of one uploaded point cloud draw.
#[derive(Debug)]
pub struct PointCloudGpu {
    pub variant: ShaderVariant,
    pub num_points: u32,

    /// Storage buffer of packed point records.
    pub points: wgpu::Buffer,
    /// Uniform buffer holding `InstanceUniform`.
    pub instance_ubo: wgpu::Buffer,
    /// Uniform buffer holding `ClippingRangesStd140`.
    pub clip_ubo: wgpu::Buffer,
    /// `prev` and `next` keyframe storage buffers, animated variants only.
    pub keyframes: Option<(wgpu::Buffer, wgpu::Buffer)>,
    /// Bind group @group(1) of the pipeline.
    pub bind: wgpu::BindGroup,
}

fn storage_contents(floats: &[f32]) -> Vec<u8> {
    let mut bytes = bytemuck::cast_slice::<f32, u8>(floats).to_vec();
    if bytes.len() < MIN_STORAGE_BYTES {
        bytes.resize(MIN_STORAGE_BYTES, 0);
    }
    bytes
}

/// Bytes at offset 0 of a keyframe buffer; rewriting them alone changes
/// the interpolation factor.
fn keyframe_header(interpolation: f32) -> [u8; 4] {
    bytemuck::cast(KeyframeHeader { interpolation })
}

/// Header followed by the flattened offsets, as read by `Keyframe` in WGSL.
fn keyframe_contents(interpolation: f32, offsets: &[KeyframeOffset]) -> Vec<u8> {
    let mut bytes = keyframe_header(interpolation).to_vec();
    bytes.extend_from_slice(bytemuck::cast_slice::<KeyframeOffset, u8>(offsets));
    if bytes.len() < MIN_STORAGE_BYTES {
        bytes.resize(MIN_STORAGE_BYTES, 0);
    }
    bytes
}

/// Uploads the inputs of one draw for `pipeline`. Inputs are expected to
/// have passed [`validate_draw`](crate::data::validate::validate_draw).
///
/// The point layout and the presence of keyframes must match the variant
/// the pipeline was built for.
pub fn upload_point_cloud<P: PointRecord>(
    device: &wgpu::Device,
    pipeline: &PointSpherePipeline,
    points: &[P],
    keyframes: Option<Keyframes<'_>>,
    clip: &ClipSet,
    instance: &InstanceTransform,
) -> Result<PointCloudGpu> {
    let variant = pipeline.variant;
    if variant.colored != P::COLORED {
        bail!(
            "point layout (colored = {}) does not match pipeline variant {}",
            P::COLORED,
            variant
        );
    }
    if variant.animated != keyframes.is_some() {
        bail!(
            "keyframes {} but pipeline variant is {}",
            if keyframes.is_some() { "supplied" } else { "missing" },
            variant
        );
    }

    let num_points = u32::try_from(points.len())?;

    let points_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Point Sphere Points"),
        contents: &storage_contents(bytemuck::cast_slice::<P, f32>(points)),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
    });

    let instance_ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Point Sphere Instance UBO"),
        contents: bytemuck::bytes_of(&instance.to_uniform()),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let clip_ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Point Sphere Clipping UBO"),
        contents: bytemuck::bytes_of(&clip.to_uniform()),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let keyframe_bufs = keyframes.map(|kf| {
        let make = |label: &str, offsets: &[KeyframeOffset]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: &keyframe_contents(kf.interpolation, offsets),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            })
        };
        (
            make("Point Sphere Prev Keyframe", kf.prev),
            make("Point Sphere Next Keyframe", kf.next),
        )
    });

    let mut entries = vec![
        wgpu::BindGroupEntry {
            binding: 0,
            resource: instance_ubo.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
            binding: 1,
            resource: points_buf.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
            binding: 2,
            resource: clip_ubo.as_entire_binding(),
        },
    ];
    if let Some((prev, next)) = &keyframe_bufs {
        entries.push(wgpu::BindGroupEntry {
            binding: 3,
            resource: prev.as_entire_binding(),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: 4,
            resource: next.as_entire_binding(),
        });
    }

    let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Point Sphere Cloud BindGroup"),
        layout: &pipeline.cloud_layout,
        entries: &entries,
    });

    log::debug!(
        "Uploaded point cloud: variant={}, points={}, clip_ranges={}",
        variant,
        num_points,
        clip.len()
    );

    Ok(PointCloudGpu {
        variant,
        num_points,
        points: points_buf,
        instance_ubo,
        clip_ubo,
        keyframes: keyframe_bufs,
        bind,
    })
}

impl PointCloudGpu {
    /// Rewrites the model transform and point size.
    pub fn update_instance(&self, queue: &wgpu::Queue, instance: &InstanceTransform) {
        queue.write_buffer(&self.instance_ubo, 0, bytemuck::bytes_of(&instance.to_uniform()));
    }

    /// Rewrites the clip set.
    pub fn update_clipping(&self, queue: &wgpu::Queue, clip: &ClipSet) {
        queue.write_buffer(&self.clip_ubo, 0, bytemuck::bytes_of(&clip.to_uniform()));
    }

    /// Writes a new interpolation factor into both keyframe headers.
    pub fn set_interpolation(&self, queue: &wgpu::Queue, interpolation: f32) -> Result<()> {
        let Some((prev, next)) = &self.keyframes else {
            bail!("point cloud variant {} has no keyframes", self.variant);
        };
        warn_if_extrapolating(interpolation);
        let header = keyframe_header(interpolation);
        queue.write_buffer(prev, 0, &header);
        queue.write_buffer(next, 0, &header);
        Ok(())
    }
}
