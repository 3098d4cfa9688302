use crate::data::point_cloud::PointCloudGpu;
use crate::data::types::{ClippingRangesStd140, InstanceUniform};
use crate::renderer::ViewBinding;
use crate::shader::{ShaderVariant, FRAGMENT_ENTRY, VERTEX_ENTRY};
use anyhow::Result;
use wgpu::util::DeviceExt;

/// Depth-buffer convention of the host renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthMode {
    /// Near maps to 0, far to 1. Compare: LessEqual. Clear: 1.0.
    Standard,
    /// Near maps to 1, far to 0. Compare: GreaterEqual. Clear: 0.0.
    #[default]
    ReversedZ,
}

impl DepthMode {
    pub fn compare(self) -> wgpu::CompareFunction {
        match self {
            Self::Standard => wgpu::CompareFunction::LessEqual,
            Self::ReversedZ => wgpu::CompareFunction::GreaterEqual,
        }
    }

    /// Value the depth buffer is cleared to; the farthest representable depth.
    pub fn clear_value(self) -> f32 {
        match self {
            Self::Standard => 1.0,
            Self::ReversedZ => 0.0,
        }
    }
}

/// Everything a pipeline variant is specialised on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub variant: ShaderVariant,
    pub color_fmt: wgpu::TextureFormat,
    pub depth_fmt: wgpu::TextureFormat,
    pub dlin_fmt: wgpu::TextureFormat,
    pub depth_mode: DepthMode,
}

/// Quad corners drawn as a four-vertex triangle strip.
const QUAD_STRIP: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    size: usize,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(size as u64),
        },
        count: None,
    }
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Layout entries of @group(1) for `variant`.
pub fn cloud_layout_entries(variant: ShaderVariant) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = vec![
        uniform_entry(
            0,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            std::mem::size_of::<InstanceUniform>(),
        ),
        storage_entry(1),
        uniform_entry(
            2,
            wgpu::ShaderStages::VERTEX,
            std::mem::size_of::<ClippingRangesStd140>(),
        ),
    ];
    if variant.animated {
        entries.push(storage_entry(3));
        entries.push(storage_entry(4));
    }
    entries
}

/// One compiled variant of the point sphere pipeline.
pub struct PointSpherePipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub cloud_layout: wgpu::BindGroupLayout,
    pub variant: ShaderVariant,
    quad_vb: wgpu::Buffer,
}

impl PointSpherePipeline {
    pub fn new(
        device: &wgpu::Device,
        view_layout: &wgpu::BindGroupLayout,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let variant = config.variant;

        let cloud_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Point Sphere Cloud Layout"),
            entries: &cloud_layout_entries(variant),
        });

        let source = variant.source()?;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shaders/point_sphere.wgsl"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let quad_vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point Sphere Quad VB"),
            contents: bytemuck::cast_slice(&QUAD_STRIP),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // Only the quad corner is a vertex attribute; points come from storage.
        let vbuf_layouts = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                shader_location: 0,
                offset: 0,
                format: wgpu::VertexFormat::Float32x2,
            }],
        }];

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Point Sphere PipelineLayout"),
            bind_group_layouts: &[view_layout, &cloud_layout],
            push_constant_ranges: &[],
        });

        let label = format!("Point Sphere Pipeline ({})", variant);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: VERTEX_ENTRY,
                buffers: &vbuf_layouts,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: config.depth_fmt,
                depth_write_enabled: true,
                depth_compare: config.depth_mode.compare(),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: FRAGMENT_ENTRY,
                targets: &[
                    Some(wgpu::ColorTargetState {
                        format: config.color_fmt,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                    Some(wgpu::ColorTargetState {
                        format: config.dlin_fmt,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        log::info!("Built point sphere pipeline variant {}", variant);

        Ok(Self {
            pipeline,
            cloud_layout,
            variant,
            quad_vb,
        })
    }

    /// Draws one quad per point: four strip vertices, one instance per point.
    pub fn draw<'a>(
        &'a self,
        rpass: &mut wgpu::RenderPass<'a>,
        view: &'a ViewBinding,
        cloud: &'a PointCloudGpu,
    ) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &view.bind, &[]);
        rpass.set_bind_group(1, &cloud.bind, &[]);
        rpass.set_vertex_buffer(0, self.quad_vb.slice(..));
        rpass.draw(0..4, 0..cloud.num_points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_modes_pair_compare_and_clear() {
        assert_eq!(DepthMode::default(), DepthMode::ReversedZ);
        assert_eq!(DepthMode::ReversedZ.compare(), wgpu::CompareFunction::GreaterEqual);
        assert_eq!(DepthMode::ReversedZ.clear_value(), 0.0);
        assert_eq!(DepthMode::Standard.compare(), wgpu::CompareFunction::LessEqual);
        assert_eq!(DepthMode::Standard.clear_value(), 1.0);
    }

    #[test]
    fn animated_layouts_bind_both_keyframes() {
        let plain = cloud_layout_entries(ShaderVariant::default());
        let animated = cloud_layout_entries(ShaderVariant {
            animated: true,
            ..Default::default()
        });
        assert_eq!(plain.len(), 3);
        assert_eq!(animated.len(), 5);
        assert_eq!(animated[3].binding, 3);
        assert_eq!(animated[4].binding, 4);
    }

    #[test]
    fn quad_strip_matches_reference_corners() {
        for (strip, corner) in QUAD_STRIP.iter().zip(crate::reference::QUAD_CORNERS) {
            assert_eq!(*strip, corner.to_array());
        }
    }
}
