use std::time::Instant;

use anyhow::{Context, Result};
use image::{Rgb, Rgb32FImage, RgbImage};

use filmrender::params::{ControlPoint, HslChannel, InversionMode, RenderParams};
use filmrender::processing::{gpu_pipeline, render};
use filmrender::{PipelineConfig, PixelPipeline};

const DEFAULT_SIZE: u32 = 2048;
const DEFAULT_ROUNDS: usize = 5;

fn median_ms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) * 0.5
    } else {
        sorted[mid]
    }
}

/// Negative scan with every stage active.
fn build_params() -> RenderParams {
    let mut p = RenderParams::default();
    p.inversion.enabled = true;
    p.inversion.mode = InversionMode::Log;
    p.film_curve.enabled = true;
    p.film_curve.toe = 0.3;
    p.film_curve.shoulder = 0.2;
    p.white_balance.temp = 12.0;
    p.tone.exposure = 20.0;
    p.tone.contrast = 15.0;
    p.tone.shadows = 10.0;
    p.tone.highlight_rolloff = true;
    p.curves.rgb = vec![
        ControlPoint::new(0.0, 0.0),
        ControlPoint::new(80.0, 70.0),
        ControlPoint::new(180.0, 196.0),
        ControlPoint::new(255.0, 255.0),
    ];
    p.hsl.orange = HslChannel {
        hue: 5.0,
        saturation: 15.0,
        luminance: 5.0,
    };
    p.split_tone.shadow_saturation = 20.0;
    p.split_tone.highlight_saturation = 10.0;
    p
}

fn gradient(size: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        Rgb([
            (x * 255 / size.max(1)) as u8,
            (y * 255 / size.max(1)) as u8,
            ((x + y) * 127 / size.max(1)) as u8,
        ])
    })
}

fn time_rounds(rounds: usize, mut f: impl FnMut()) -> Vec<f64> {
    (0..rounds)
        .map(|_| {
            let t0 = Instant::now();
            f();
            t0.elapsed().as_secs_f64() * 1000.0
        })
        .collect()
}

fn megapixels_per_sec(pixels: u64, ms: f64) -> f64 {
    pixels as f64 / 1e6 / (ms / 1000.0).max(1e-9)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let size = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("usage: perf_probe [size] [rounds]; bad size {:?}", raw))?,
        None => DEFAULT_SIZE,
    };
    let rounds = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("usage: perf_probe [size] [rounds]; bad rounds {:?}", raw))?,
        None => DEFAULT_ROUNDS,
    };

    let prepared = PixelPipeline::new(PipelineConfig::default()).prepare(&build_params());
    let img8 = gradient(size);
    let img32: Rgb32FImage = image::DynamicImage::ImageRgb8(img8.clone()).to_rgb32f();
    let pixels = size as u64 * size as u64;
    eprintln!("Rendering {}x{} gradient, {} rounds", size, size, rounds);

    let int_samples = time_rounds(rounds, || {
        let _out = render::render_rgb8(&img8, &prepared);
    });
    let float_samples = time_rounds(rounds, || {
        let _out = render::render_rgb32f(&img32, &prepared);
    });

    let int_ms = median_ms(&int_samples);
    let float_ms = median_ms(&float_samples);
    println!("METRIC pixel_count={}", pixels);
    println!("METRIC int_ms_median={:.2}", int_ms);
    println!("METRIC int_mpix_per_sec={:.2}", megapixels_per_sec(pixels, int_ms));
    println!("METRIC float_ms_median={:.2}", float_ms);
    println!("METRIC float_mpix_per_sec={:.2}", megapixels_per_sec(pixels, float_ms));

    if gpu_pipeline::is_available() {
        let gpu_samples = time_rounds(rounds, || {
            let _out = gpu_pipeline::try_render(&img32, &prepared);
        });
        let gpu_ms = median_ms(&gpu_samples);
        println!("METRIC gpu_ms_median={:.2}", gpu_ms);
        println!("METRIC gpu_mpix_per_sec={:.2}", megapixels_per_sec(pixels, gpu_ms));
    } else {
        println!("METRIC gpu_available=false");
    }

    Ok(())
}
