//! GPU side of the point sphere renderer. Owns the per-frame view binding
//! and one pipeline per requested shader variant, and records the pass
//! that draws uploaded point clouds into the render targets.

pub mod context;
pub mod pipelines;
pub mod targets;

use self::{
    pipelines::point_sphere::{DepthMode, PipelineConfig, PointSpherePipeline},
    targets::Targets,
};
use crate::camera::CameraFrame;
use crate::data::{point_cloud::PointCloudGpu, types::ViewUniform};
use crate::shader::ShaderVariant;
use anyhow::Result;
use wgpu::util::DeviceExt;

/// Layout of @group(0), shared by every pipeline variant.
pub fn create_view_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Point Sphere View Layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(
                    std::mem::size_of::<ViewUniform>() as u64,
                ),
            },
            count: None,
        }],
    })
}

/// Per-frame camera uniform and its bind group.
pub struct ViewBinding {
    pub ubo: wgpu::Buffer,
    pub bind: wgpu::BindGroup,
}

impl ViewBinding {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        camera: &CameraFrame,
    ) -> Self {
        let ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point Sphere View UBO"),
            contents: bytemuck::bytes_of(&camera.to_uniform()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Point Sphere View BindGroup"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });
        Self { ubo, bind }
    }

    pub fn update(&self, queue: &wgpu::Queue, camera: &CameraFrame) {
        queue.write_buffer(&self.ubo, 0, bytemuck::bytes_of(&camera.to_uniform()));
    }
}

/// Owns the pipelines and view state needed to draw point clouds.
pub struct PointSphereRenderer {
    pub view_layout: wgpu::BindGroupLayout,
    pub view: ViewBinding,
    pub pipelines: Vec<PointSpherePipeline>,
    pub depth_mode: DepthMode,
}

impl PointSphereRenderer {
    /// Builds one pipeline for each of `variants` against `targets`' formats.
    pub fn new(
        device: &wgpu::Device,
        targets: &Targets,
        camera: &CameraFrame,
        variants: &[ShaderVariant],
        depth_mode: DepthMode,
    ) -> Result<Self> {
        let view_layout = create_view_layout(device);
        let view = ViewBinding::new(device, &view_layout, camera);

        let mut pipelines: Vec<PointSpherePipeline> = Vec::with_capacity(variants.len());
        for &variant in variants {
            if pipelines.iter().any(|p| p.variant == variant) {
                continue;
            }
            let config = PipelineConfig {
                variant,
                color_fmt: targets.color_fmt,
                depth_fmt: targets.depth_fmt,
                dlin_fmt: targets.dlin_fmt,
                depth_mode,
            };
            pipelines.push(PointSpherePipeline::new(device, &view_layout, &config)?);
        }

        Ok(Self {
            view_layout,
            view,
            pipelines,
            depth_mode,
        })
    }

    pub fn pipeline(&self, variant: ShaderVariant) -> Option<&PointSpherePipeline> {
        self.pipelines.iter().find(|p| p.variant == variant)
    }

    /// Records the point sphere pass: clears the targets, then draws every
    /// non-empty cloud with the pipeline of its variant.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &Targets,
        clouds: &[PointCloudGpu],
    ) {
        let clear_depth = self.depth_mode.clear_value();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Point Sphere Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: &targets.color,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 }),
                        store: wgpu::StoreOp::Store,
                    },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &targets.dlin,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear_depth as f64,
                            g: 0.0,
                            b: 0.0,
                            a: 0.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_depth),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for cloud in clouds {
            if cloud.num_points == 0 {
                continue;
            }
            match self.pipeline(cloud.variant) {
                Some(pipeline) => pipeline.draw(&mut pass, &self.view, cloud),
                None => log::warn!(
                    "No pipeline built for variant {}; skipping cloud.",
                    cloud.variant
                ),
            }
        }
    }
}
