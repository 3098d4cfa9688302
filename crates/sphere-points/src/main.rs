//! Entry point of `sphere-points-render`.

use anyhow::{anyhow, Result};
use clap::Parser;
use glam::{Vec2, Vec3};
use sphere_points::{
    camera::{CameraFrame, InstanceTransform},
    clipping::ClipSet,
    config::Config,
    data::{
        types::{KeyframeOffset, PointRecord, PointXyz, PointXyzRgb},
        upload_point_cloud,
        validate::validate_draw,
    },
    reference::{shade_sample, Displacement, Footprint, FragmentShader, Keyframes, VertexExpander},
    renderer::{context::GfxContext, targets::Targets, PointSphereRenderer},
    shader::ShaderVariant,
};
use std::time::Instant;

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Config::parse();

    let camera = cfg.camera_frame();
    let instance = cfg.instance_at(0);
    let clip = cfg.clip_set()?;

    let grid = lattice(cfg.points, cfg.extent);
    log::info!(
        "Rendering {} points, variant {}, {:?} projection, {} clipping range(s).",
        grid.len(),
        cfg.variant(),
        camera.projection_kind(),
        clip.len()
    );

    let (prev, next) = match cfg.interpolation {
        Some(_) => swirl_keyframes(&grid),
        None => (Vec::new(), Vec::new()),
    };
    let keyframes = cfg.interpolation_at(0).map(|interpolation| Keyframes {
        prev: &prev,
        next: &next,
        interpolation,
    });

    let footprint = if cfg.round { Footprint::Round } else { Footprint::Square };
    let fragment = FragmentShader::new(&camera, &instance, footprint);

    if cfg.colored {
        let points: Vec<PointXyzRgb> = grid
            .iter()
            .map(|&(position, color)| PointXyzRgb {
                position: position.to_array(),
                color: color.to_array(),
            })
            .collect();
        run(&cfg, &points, keyframes, &clip, &camera, &instance, &fragment)
    } else {
        let points: Vec<PointXyz> = grid
            .iter()
            .map(|&(position, _)| PointXyz { position: position.to_array() })
            .collect();
        run(&cfg, &points, keyframes, &clip, &camera, &instance, &fragment)
    }
}

fn run<P: PointRecord>(
    cfg: &Config,
    points: &[P],
    keyframes: Option<Keyframes<'_>>,
    clip: &ClipSet,
    camera: &CameraFrame,
    instance: &InstanceTransform,
    fragment: &FragmentShader,
) -> Result<()> {
    validate_draw(points, keyframes.as_ref(), clip, instance, camera)?;

    let expander = VertexExpander::new(points, clip, camera, instance);
    match keyframes {
        Some(kf) => report(&expander.animated(kf), fragment, camera),
        None => report(&expander, fragment, camera),
    }

    if cfg.gpu {
        draw_on_gpu(cfg, points, keyframes, clip, camera, instance)?;
    }
    Ok(())
}

/// Runs the CPU reference over every point and logs what the GPU would draw.
fn report<P: PointRecord, D: Displacement>(
    expander: &VertexExpander<'_, P, D>,
    fragment: &FragmentShader,
    camera: &CameraFrame,
) {
    let start = Instant::now();
    let quads = expander.par_expand_all();
    let visible: Vec<usize> = quads
        .iter()
        .enumerate()
        .filter(|(_, quad)| !quad[0].is_discarded())
        .map(|(i, _)| i)
        .collect();
    log::info!(
        "Expanded {} quads in {:.2?}: {} visible, {} clipped.",
        quads.len(),
        start.elapsed(),
        visible.len(),
        quads.len() - visible.len()
    );

    let half = expander.half_size();
    log::info!("Billboard half-size in clip units: {:.6} x {:.6}", half.x, half.y);

    let Some(&first) = visible.first() else {
        log::warn!("Every point was clipped; nothing to shade.");
        return;
    };
    let rim = Vec2::splat(std::f32::consts::FRAC_1_SQRT_2);
    let centre = shade_sample(expander, fragment, camera.viewport, first, Vec2::ZERO);
    let edge = shade_sample(expander, fragment, camera.viewport, first, rim);
    match (centre, edge) {
        (Some(c), Some(e)) => log::info!(
            "Point {}: centre depth {:.7}, rim depth {:.7}, colour {:?}",
            first,
            c.depth,
            e.depth,
            c.color.truncate()
        ),
        _ => log::info!("Point {} lies behind the camera.", first),
    }
}

/// Builds every pipeline variant on a headless device and draws
/// `cfg.frames` frames. Between frames the camera, interpolation factor,
/// point size and clipping ranges move as configured.
fn draw_on_gpu<P: PointRecord>(
    cfg: &Config,
    points: &[P],
    keyframes: Option<Keyframes<'_>>,
    clip: &ClipSet,
    camera: &CameraFrame,
    instance: &InstanceTransform,
) -> Result<()> {
    let gfx = pollster::block_on(GfxContext::new())?;
    let targets = Targets::new(&gfx.device, cfg.width, cfg.height);

    let start = Instant::now();
    let variants: Vec<ShaderVariant> = ShaderVariant::all().collect();
    let renderer =
        PointSphereRenderer::new(&gfx.device, &targets, camera, &variants, cfg.depth_mode())?;
    log::info!("Built {} pipelines in {:.2?}", renderer.pipelines.len(), start.elapsed());

    let pipeline = renderer
        .pipeline(cfg.variant())
        .ok_or_else(|| anyhow!("no pipeline for variant {}", cfg.variant()))?;
    let cloud = upload_point_cloud(&gfx.device, pipeline, points, keyframes, clip, instance)?;

    let frames = cfg.frames.max(1);
    let start = Instant::now();
    for frame in 0..frames {
        if frame > 0 {
            renderer.view.update(&gfx.queue, &cfg.camera_frame_at(frame));
            if let Some(t) = cfg.interpolation_at(frame) {
                cloud.set_interpolation(&gfx.queue, t)?;
            }
            if cfg.size_step != 0.0 {
                cloud.update_instance(&gfx.queue, &cfg.instance_at(frame));
            }
            if cfg.clip_slide != 0.0 {
                cloud.update_clipping(&gfx.queue, &cfg.clip_set_at(frame)?);
            }
        }

        let mut encoder = gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Point Sphere Render Encoder"),
            });
        renderer.record(&mut encoder, &targets, std::slice::from_ref(&cloud));
        gfx.queue.submit(Some(encoder.finish()));
    }
    let _ = gfx.device.poll(wgpu::Maintain::Wait);
    log::info!(
        "Drew {} frame(s) of {} points into {}x{} targets in {:.2?}",
        frames,
        cloud.num_points,
        targets.width,
        targets.height,
        start.elapsed()
    );
    Ok(())
}

/// `count` points on a cubic lattice of edge `extent` centred on the origin,
/// each paired with its normalised lattice coordinate as a colour.
fn lattice(count: u32, extent: f32) -> Vec<(Vec3, Vec3)> {
    let side = (count as f32).cbrt().ceil().max(2.0) as u32;
    let step = 1.0 / (side - 1) as f32;
    (0..count)
        .map(|i| {
            let cell = Vec3::new(
                (i % side) as f32,
                (i / side % side) as f32,
                (i / (side * side)) as f32,
            ) * step;
            ((cell - 0.5) * extent, cell)
        })
        .collect()
}

/// Rest pose and a quarter-strength swirl about +Z.
fn swirl_keyframes(grid: &[(Vec3, Vec3)]) -> (Vec<KeyframeOffset>, Vec<KeyframeOffset>) {
    let prev = vec![KeyframeOffset { offset: [0.0; 3] }; grid.len()];
    let next = grid
        .iter()
        .map(|&(p, _)| KeyframeOffset {
            offset: (Vec3::new(-p.y, p.x, 0.0) * 0.25).to_array(),
        })
        .collect();
    (prev, next)
}
