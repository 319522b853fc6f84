use std::sync::{
    OnceLock,
    atomic::{AtomicBool, Ordering},
    mpsc,
};

use image::Rgb32FImage;
use tracing::{debug, warn};

use super::pipeline::Prepared;
use super::shader::{WORKGROUP_SIZE, emit_program, pack_uniforms};

/// Rgba32Float texel size.
const BYTES_PER_PIXEL: u32 = 16;
/// Storage bindings may not be empty; stands in for an absent LUT.
static EMPTY_LUT: [f32; 4] = [0.0; 4];

struct PipelineBundle {
    pipeline: wgpu::ComputePipeline,
    bgl: wgpu::BindGroupLayout,
}

struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    render: PipelineBundle,
}

static GPU_CONTEXT: OnceLock<Option<GpuContext>> = OnceLock::new();
static GPU_FALLBACK_REPORTED: AtomicBool = AtomicBool::new(false);

/// Renders a float image with the emitted WGSL program.
///
/// Returns `None` when no suitable adapter exists, the image exceeds the
/// device's texture limits, or readback fails. Callers fall back to
/// [`super::render::render_rgb32f`].
pub fn try_render(img: &Rgb32FImage, prepared: &Prepared) -> Option<Rgb32FImage> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Some(img.clone());
    }

    let max_dim = max_texture_dimension();
    if max_dim > 0 && (width > max_dim || height > max_dim) {
        debug!(width, height, max_dim, "image exceeds GPU texture limits");
        return None;
    }

    render_gpu(img, prepared)
}

/// Returns whether the GPU path is available.
pub fn is_available() -> bool {
    gpu_context().is_some()
}

/// Returns the device's maximum 2D texture dimension, or 0 if GPU is unavailable.
pub fn max_texture_dimension() -> u32 {
    gpu_context()
        .map(|ctx| ctx.device.limits().max_texture_dimension_2d)
        .unwrap_or(0)
}

/// Interleaved RGBA with alpha 1.0, the layout of the source texture.
fn to_rgba_texels(img: &Rgb32FImage) -> Vec<f32> {
    let mut texels = Vec::with_capacity(img.as_raw().len() / 3 * 4);
    for px in img.as_raw().chunks_exact(3) {
        texels.extend([px[0], px[1], px[2], 1.0]);
    }
    texels
}

fn padded_row_bytes(width: u32) -> u32 {
    let unpadded = width.saturating_mul(BYTES_PER_PIXEL);
    unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

fn create_storage_buffer(ctx: &GpuContext, label: &str, values: &[f32]) -> wgpu::Buffer {
    let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of_val(values) as u64,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    ctx.queue.write_buffer(&buffer, 0, f32s_as_bytes(values));
    buffer
}

fn render_gpu(img: &Rgb32FImage, prepared: &Prepared) -> Option<Rgb32FImage> {
    let Some(ctx) = gpu_context() else {
        report_gpu_fallback_once();
        return None;
    };
    let (width, height) = img.dimensions();
    let extent = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let src_texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("gpu_pipeline_src"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    ctx.queue.write_texture(
        src_texture.as_image_copy(),
        f32s_as_bytes(&to_rgba_texels(img)),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width.saturating_mul(BYTES_PER_PIXEL)),
            rows_per_image: Some(height),
        },
        extent,
    );

    let out_texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("gpu_pipeline_out"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba32Float,
        usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });

    let uniforms = pack_uniforms(prepared, width, height);
    let params_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("gpu_pipeline_params"),
        size: std::mem::size_of_val(uniforms.as_slice()) as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    ctx.queue
        .write_buffer(&params_buffer, 0, f32s_as_bytes(&uniforms));

    let curves_buffer =
        create_storage_buffer(ctx, "gpu_pipeline_curves", prepared.curves.fine_tables());
    let lut_values = prepared
        .lut
        .as_ref()
        .map_or(EMPTY_LUT.as_slice(), |lut| lut.data.as_slice());
    let lut_buffer = create_storage_buffer(ctx, "gpu_pipeline_lut", lut_values);

    let src_view = src_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let out_view = out_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("gpu_pipeline_bg"),
        layout: &ctx.render.bgl,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&src_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&out_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: curves_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: lut_buffer.as_entire_binding(),
            },
        ],
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("gpu_pipeline_encoder"),
        });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("gpu_pipeline_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&ctx.render.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(
            width.div_ceil(WORKGROUP_SIZE),
            height.div_ceil(WORKGROUP_SIZE),
            1,
        );
    }

    let unpadded_bytes_per_row = width.saturating_mul(BYTES_PER_PIXEL);
    let padded_bytes_per_row = padded_row_bytes(width);
    let readback = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("gpu_pipeline_readback"),
        size: padded_bytes_per_row as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    encoder.copy_texture_to_buffer(
        out_texture.as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer: &readback,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        extent,
    );

    ctx.queue.submit([encoder.finish()]);
    let slice = readback.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = ctx.device.poll(wgpu::Maintain::wait());
    let map_result = rx.recv().ok()?;
    if map_result.is_err() {
        report_gpu_fallback_once();
        return None;
    }

    let mapped = slice.get_mapped_range();
    let unpadded = unpadded_bytes_per_row as usize;
    let padded = padded_bytes_per_row as usize;
    let mut out = Vec::with_capacity(width as usize * height as usize * 3);
    for row in 0..height as usize {
        let bytes = &mapped[row * padded..row * padded + unpadded];
        for texel in bytes.chunks_exact(BYTES_PER_PIXEL as usize) {
            for channel in texel.chunks_exact(4).take(3) {
                out.push(f32::from_ne_bytes([
                    channel[0], channel[1], channel[2], channel[3],
                ]));
            }
        }
    }
    drop(mapped);
    readback.unmap();

    let output = Rgb32FImage::from_raw(width, height, out);
    if output.is_none() {
        report_gpu_fallback_once();
    }
    output
}

fn gpu_context() -> Option<&'static GpuContext> {
    GPU_CONTEXT.get_or_init(init_gpu_context).as_ref()
}

fn create_pipeline_bundle(
    device: &wgpu::Device,
    label: &str,
    shader_src: &str,
    bgl_entries: &[wgpu::BindGroupLayoutEntry],
) -> PipelineBundle {
    let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: bgl_entries,
    });
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(shader_src.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[&bgl],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        module: &shader,
        entry_point: Some("main"),
        cache: None,
        compilation_options: wgpu::PipelineCompilationOptions::default(),
    });
    PipelineBundle { pipeline, bgl }
}

fn storage_buffer_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Source texture, output storage texture, uniform block, curve tables, LUT.
fn render_entries() -> [wgpu::BindGroupLayoutEntry; 5] {
    [
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: wgpu::TextureFormat::Rgba32Float,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
        storage_buffer_entry(3),
        storage_buffer_entry(4),
    ]
}

fn init_gpu_context() -> Option<GpuContext> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::VULKAN,
        ..Default::default()
    });
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        force_fallback_adapter: false,
        compatible_surface: None,
    }))?;
    let adapter_info = adapter.get_info();
    if adapter_info.backend != wgpu::Backend::Vulkan {
        return None;
    }
    if adapter_info.device_type != wgpu::DeviceType::DiscreteGpu {
        debug!(adapter = %adapter_info.name, "skipping non-discrete adapter");
        return None;
    }
    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("gpu_pipeline_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
        },
        None,
    ))
    .ok()?;

    let render = create_pipeline_bundle(&device, "gpu_render", &emit_program(), &render_entries());
    debug!(
        adapter = %adapter_info.name,
        vendor = adapter_info.vendor,
        driver = %adapter_info.driver,
        "initialized GPU pipeline"
    );

    Some(GpuContext {
        device,
        queue,
        render,
    })
}

fn report_gpu_fallback_once() {
    if !GPU_FALLBACK_REPORTED.swap(true, Ordering::Relaxed) {
        warn!("GPU pipeline unavailable or failed; rendering on the CPU float path");
    }
}

fn f32s_as_bytes(values: &[f32]) -> &[u8] {
    // f32 has no invalid bit patterns; reinterpreting as bytes is safe.
    unsafe {
        std::slice::from_raw_parts(values.as_ptr().cast::<u8>(), std::mem::size_of_val(values))
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, Rgb32FImage};

    use super::*;
    use crate::params::{ControlPoint, HslChannel, InversionMode, RenderParams};
    use crate::processing::lut3d::Lut3d;
    use crate::processing::pipeline::{PipelineConfig, PixelPipeline, process_pixel_float};

    fn prepare(params: &RenderParams) -> Prepared {
        PixelPipeline::new(PipelineConfig::default()).prepare(params)
    }

    fn test_image() -> Rgb32FImage {
        Rgb32FImage::from_fn(37, 23, |x, y| {
            Rgb([
                ((x * 7 + y * 3) % 64) as f32 / 63.0,
                ((x * 11 + y * 5) % 64) as f32 / 63.0,
                ((x * 13 + y * 17) % 64) as f32 / 63.0,
            ])
        })
    }

    fn assert_matches_float_path(params: &RenderParams, tolerance: f32) {
        let prepared = prepare(params);
        let img = test_image();
        let gpu = try_render(&img, &prepared).expect("gpu render should succeed");
        assert_eq!(gpu.dimensions(), img.dimensions());
        for (src, out) in img.pixels().zip(gpu.pixels()) {
            let cpu = process_pixel_float(src.0, &prepared);
            for c in 0..3 {
                let d = (cpu[c] - out.0[c]).abs();
                assert!(
                    d <= tolerance,
                    "channel {} differed by {} (input={:?}, cpu={:?}, gpu={:?})",
                    c,
                    d,
                    src.0,
                    cpu,
                    out.0
                );
            }
        }
    }

    #[test]
    fn padded_rows_meet_copy_alignment() {
        assert_eq!(padded_row_bytes(1), wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        assert_eq!(padded_row_bytes(16), 256);
        assert_eq!(padded_row_bytes(17), 512);
    }

    #[test]
    fn texels_carry_opaque_alpha() {
        let img = Rgb32FImage::from_pixel(2, 1, Rgb([0.1, 0.2, 0.3]));
        assert_eq!(
            to_rgba_texels(&img),
            vec![0.1, 0.2, 0.3, 1.0, 0.1, 0.2, 0.3, 1.0]
        );
        assert_eq!(f32s_as_bytes(&EMPTY_LUT).len(), 16);
    }

    #[test]
    fn layout_has_one_entry_per_program_binding() {
        let entries = render_entries();
        let program = emit_program();
        for entry in &entries {
            assert!(program.contains(&format!("@binding({})", entry.binding)));
        }
        assert!(matches!(
            entries[3].ty,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                ..
            }
        ));
    }

    #[test]
    fn empty_image_needs_no_device() {
        let img = Rgb32FImage::new(0, 0);
        let out = try_render(&img, &prepare(&RenderParams::default()))
            .expect("empty image should be handled");
        assert_eq!(out.dimensions(), (0, 0));
    }

    #[test]
    fn parity_with_float_path_for_default_params() {
        if !is_available() {
            return;
        }
        assert_matches_float_path(&RenderParams::default(), 1e-5);
    }

    #[test]
    fn parity_with_float_path_for_negative_scan() {
        if !is_available() {
            return;
        }
        let mut params = RenderParams::default();
        params.inversion.enabled = true;
        params.inversion.mode = InversionMode::Log;
        params.film_curve.enabled = true;
        params.film_curve.toe = 0.4;
        params.film_curve.shoulder = 0.3;
        params.film_curve.channel_gamma = Some([0.55, 0.6, 0.65]);
        params.base_correction.mode = crate::params::BaseCorrectionMode::Log;
        params.base_correction.densities = [0.25, 0.4, 0.55];
        params.density_levels.enabled = true;
        assert_matches_float_path(&params, 2.0 / 255.0);
    }

    #[test]
    fn parity_with_float_path_for_grading_stages() {
        if !is_available() {
            return;
        }
        let mut params = RenderParams::default();
        params.inversion.enabled = true;
        params.white_balance.temp = 20.0;
        params.white_balance.tint = -10.0;
        params.tone.exposure = 15.0;
        params.tone.contrast = 25.0;
        params.tone.shadows = 30.0;
        params.tone.highlights = -20.0;
        params.tone.blacks = 10.0;
        params.tone.highlight_rolloff = true;
        params.curves.rgb = vec![
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(70.0, 60.0),
            ControlPoint::new(190.0, 205.0),
            ControlPoint::new(255.0, 255.0),
        ];
        params.curves.blue = vec![ControlPoint::new(0.0, 10.0), ControlPoint::new(255.0, 240.0)];
        params.hsl.orange = HslChannel {
            hue: 8.0,
            saturation: 25.0,
            luminance: -10.0,
        };
        params.hsl.blue.saturation = -40.0;
        params.split_tone.shadow_saturation = 30.0;
        params.split_tone.highlight_saturation = 20.0;
        params.split_tone.balance = 25.0;
        let mut lut = Lut3d::identity(9);
        for px in lut.data.chunks_exact_mut(3) {
            px[1] *= 0.9;
        }
        lut.intensity = 0.7;
        params.lut3d.lut1 = Some(lut);
        assert_matches_float_path(&params, 2.0 / 255.0);
    }
}
