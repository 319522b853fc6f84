use std::path::Path;

use anyhow::Context;
use image::DynamicImage;

static RAW_EXTS: &[&str] = &["raf", "dng", "nef", "cr2", "arw"];

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy()) else {
        return false;
    };
    exts.iter().any(|known| ext.eq_ignore_ascii_case(known))
}

pub fn is_raw_image(path: &Path) -> bool {
    has_extension(path, RAW_EXTS)
}

/// Opens a scan, developing RAW files with `rawler`.
///
/// RAW development yields a 16-bit or float image, so RAW sources always
/// take the float rendering path.
pub fn open_image(path: &Path) -> anyhow::Result<DynamicImage> {
    if !is_raw_image(path) {
        return image::open(path).with_context(|| format!("failed to decode {}", path.display()));
    }

    let raw = rawler::decode_file(path)
        .with_context(|| format!("failed to decode raw file {}", path.display()))?;
    let develop = rawler::imgop::develop::RawDevelop::default();
    let intermediate = develop
        .develop_intermediate(&raw)
        .with_context(|| format!("failed to develop raw file {}", path.display()))?;
    intermediate
        .to_dynamic_image()
        .ok_or_else(|| anyhow::anyhow!("raw develop produced invalid image"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_extensions_match_case_insensitively() {
        assert!(is_raw_image(Path::new("/scans/roll_3/frame.DNG")));
        assert!(is_raw_image(Path::new("frame.nef")));
        assert!(!is_raw_image(Path::new("frame.tif")));
        assert!(!is_raw_image(Path::new("frame")));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = open_image(Path::new("/nonexistent/filmrender/scan.png"))
            .expect_err("missing file should fail");
        assert!(format!("{:#}", err).contains("scan.png"));
    }
}
