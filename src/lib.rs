//! Deterministic film-scan color rendering.
//!
//! Every pixel runs through the same fixed stage order on three paths: the
//! integer path ([`processing::pipeline::process_pixel`]), the float path
//! ([`processing::pipeline::process_pixel_float`]) and the WGSL program
//! produced by [`processing::shader::emit_program`].

pub mod config;
pub mod normalize;
pub mod params;
pub mod processing;
pub mod profiles;
pub mod source;

pub use normalize::{normalize, normalize_with};
pub use params::RenderParams;
pub use processing::pipeline::{
    PipelineConfig, PixelPipeline, Prepared, process_pixel, process_pixel_float,
};
