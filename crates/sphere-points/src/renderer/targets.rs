//! Render targets written by the point sphere pass.

pub struct Targets {
    // Private textures – keep alive for the lifetime of the views.
    _color_tex: wgpu::Texture,
    _depth_tex: wgpu::Texture,
    _dlin_tex: wgpu::Texture,

    // Public texture views used by the pass and by later passes.
    pub color: wgpu::TextureView,
    pub depth: wgpu::TextureView,
    /// Duplicate of the written depth, readable by later passes.
    pub dlin: wgpu::TextureView,

    // Formats required by pipeline creation.
    pub color_fmt: wgpu::TextureFormat,
    pub depth_fmt: wgpu::TextureFormat,
    pub dlin_fmt: wgpu::TextureFormat,

    pub width: u32,
    pub height: u32,
}

impl Targets {
    pub const COLOR_FMT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
    pub const DEPTH_FMT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    pub const DLIN_FMT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        // Ensure non‑zero dimensions.
        let width = width.max(1);
        let height = height.max(1);

        let tex_size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let create_tex = |label: &str, format, usage| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: tex_size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
        };

        let color_tex = create_tex(
            "Point Sphere Color Target",
            Self::COLOR_FMT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );

        let depth_tex = create_tex(
            "Point Sphere Depth Target",
            Self::DEPTH_FMT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );

        let dlin_tex = create_tex(
            "Point Sphere Linear Depth Target",
            Self::DLIN_FMT,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
        );

        Self {
            color: color_tex.create_view(&wgpu::TextureViewDescriptor::default()),
            depth: depth_tex.create_view(&wgpu::TextureViewDescriptor::default()),
            dlin: dlin_tex.create_view(&wgpu::TextureViewDescriptor::default()),
            _color_tex: color_tex,
            _depth_tex: depth_tex,
            _dlin_tex: dlin_tex,
            color_fmt: Self::COLOR_FMT,
            depth_fmt: Self::DEPTH_FMT,
            dlin_fmt: Self::DLIN_FMT,
            width,
            height,
        }
    }
}
