use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::{debug, info, warn};

use filmrender::config::{RenderBackend, RenderConfig};
use filmrender::params::{RenderParams, sidecar_path};
use filmrender::processing::{gpu_pipeline, render};
use filmrender::profiles::FilmProfiles;
use filmrender::{PixelPipeline, Prepared, normalize_with, source};

const USAGE: &str = "usage: filmrender <input> [params.json] <output>";

struct Args {
    input: PathBuf,
    params: Option<PathBuf>,
    output: PathBuf,
}

fn parse_args(args: &[String]) -> Result<Args> {
    match args {
        [input, output] => Ok(Args {
            input: input.into(),
            params: None,
            output: output.into(),
        }),
        [input, params, output] => Ok(Args {
            input: input.into(),
            params: Some(params.into()),
            output: output.into(),
        }),
        _ => anyhow::bail!(USAGE),
    }
}

fn read_params_file(path: &Path, profiles: &FilmProfiles) -> Result<RenderParams> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read params {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse params {}", path.display()))?;
    Ok(normalize_with(&value, profiles))
}

/// Explicit params file, else the image's sidecar, else defaults.
fn load_params(args: &Args, profiles: &FilmProfiles) -> Result<RenderParams> {
    if let Some(path) = &args.params {
        return read_params_file(path, profiles);
    }
    let sidecar = sidecar_path(&args.input);
    if sidecar.is_file() {
        match read_params_file(&sidecar, profiles) {
            Ok(params) => return Ok(params),
            Err(err) => warn!(sidecar = %sidecar.display(), "ignoring sidecar: {:#}", err),
        }
    }
    Ok(RenderParams::default())
}

fn render_image(img: &DynamicImage, prepared: &Prepared, backend: RenderBackend) -> DynamicImage {
    if backend != RenderBackend::Cpu {
        if let Some(out) = gpu_pipeline::try_render(&img.to_rgb32f(), prepared) {
            return DynamicImage::ImageRgb32F(out);
        }
        if backend == RenderBackend::Gpu {
            warn!("gpu backend requested but unavailable; using cpu");
        }
    }
    render::render_dynamic(img, prepared)
}

/// Float results are written at 16 bits for formats that cannot hold f32.
fn encodable(img: DynamicImage, output: &Path) -> DynamicImage {
    let is_float = matches!(img, DynamicImage::ImageRgb32F(_));
    let keeps_float = output
        .extension()
        .map(|e| {
            let ext = e.to_string_lossy();
            ext.eq_ignore_ascii_case("exr") || ext.eq_ignore_ascii_case("hdr")
        })
        .unwrap_or(false);
    if !is_float || keeps_float {
        return img;
    }
    let supports_16 = output
        .extension()
        .map(|e| {
            let ext = e.to_string_lossy();
            ["png", "tif", "tiff"]
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false);
    if supports_16 {
        DynamicImage::ImageRgb16(img.to_rgb16())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

fn run(args: &Args) -> Result<()> {
    let config = RenderConfig::load();
    let profiles = config.profiles();
    let backend = config.backend();
    debug!(?backend, "resolved render backend");

    let img = source::open_image(&args.input)?;
    let params = load_params(args, &profiles)?;
    let prepared = PixelPipeline::new(config.pipeline_config()).prepare(&params);

    let rendered = render_image(&img, &prepared, backend);
    encodable(rendered, &args.output)
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(output = %args.output.display(), "rendered image");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&raw)?;
    run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn params_file_is_optional() {
        let args = parse_args(&strings(&["in.tif", "out.png"])).expect("two args");
        assert!(args.params.is_none());
        assert_eq!(args.output, PathBuf::from("out.png"));

        let args = parse_args(&strings(&["in.tif", "p.json", "out.png"])).expect("three args");
        assert_eq!(args.params, Some(PathBuf::from("p.json")));
    }

    #[test]
    fn wrong_arity_reports_usage() {
        let err = parse_args(&strings(&["only.tif"])).err().expect("one arg fails");
        assert!(err.to_string().contains("usage"));
    }

    #[test]
    fn missing_sidecar_falls_back_to_defaults() {
        let args = Args {
            input: PathBuf::from("/nonexistent/filmrender/frame.tif"),
            params: None,
            output: PathBuf::from("out.png"),
        };
        let params = load_params(&args, &FilmProfiles::builtin()).expect("defaults");
        assert_eq!(params, RenderParams::default());
    }

    #[test]
    fn float_output_is_narrowed_for_integer_formats() {
        let img = DynamicImage::ImageRgb32F(image::Rgb32FImage::new(1, 1));
        assert!(matches!(
            encodable(img.clone(), Path::new("out.png")),
            DynamicImage::ImageRgb16(_)
        ));
        assert!(matches!(
            encodable(img.clone(), Path::new("out.jpg")),
            DynamicImage::ImageRgb8(_)
        ));
        assert!(matches!(
            encodable(img, Path::new("out.exr")),
            DynamicImage::ImageRgb32F(_)
        ));
    }
}
