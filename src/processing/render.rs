//! Whole-image rendering on the CPU paths.

use image::{DynamicImage, Rgb32FImage, RgbImage};
use rayon::prelude::*;

use super::pipeline::{Prepared, process_pixel, process_pixel_float};

/// Below this many pixels rows are processed on the calling thread.
pub const PARALLEL_THRESHOLD: usize = 30_000;

/// Runs `f` over every interleaved RGB triple, row-parallel for large images.
fn for_each_pixel<T, F>(data: &mut [T], width: usize, f: F)
where
    T: Send,
    F: Fn(&mut [T]) + Sync,
{
    let row_len = width * 3;
    if row_len == 0 {
        return;
    }
    if data.len() / 3 >= PARALLEL_THRESHOLD {
        data.par_chunks_mut(row_len).for_each(|row| {
            row.chunks_exact_mut(3).for_each(&f);
        });
    } else {
        data.chunks_exact_mut(3).for_each(f);
    }
}

/// Integer path over an 8-bit image.
pub fn render_rgb8(img: &RgbImage, prepared: &Prepared) -> RgbImage {
    let mut out = img.clone();
    let width = out.width() as usize;
    for_each_pixel(&mut out, width, |px| {
        let rendered = process_pixel([px[0], px[1], px[2]], prepared);
        px.copy_from_slice(&rendered);
    });
    out
}

/// Float path over a 32-bit float image.
pub fn render_rgb32f(img: &Rgb32FImage, prepared: &Prepared) -> Rgb32FImage {
    let mut out = img.clone();
    let width = out.width() as usize;
    for_each_pixel(&mut out, width, |px| {
        let rendered = process_pixel_float([px[0], px[1], px[2]], prepared);
        px.copy_from_slice(&rendered);
    });
    out
}

/// Picks the path from the source bit depth: 8-bit sources take the integer
/// path, everything deeper takes the float path. Alpha is dropped.
pub fn render_dynamic(img: &DynamicImage, prepared: &Prepared) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => {
            DynamicImage::ImageRgb8(render_rgb8(&img.to_rgb8(), prepared))
        }
        _ => DynamicImage::ImageRgb32F(render_rgb32f(&img.to_rgb32f(), prepared)),
    }
}
