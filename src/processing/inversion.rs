use crate::params::{Inversion, InversionMode};

/// `ln(256)`: log inversion is defined on the 8-bit code scale in every path.
pub const LOG_CODE_DENOM: f32 = 5.545_177_444_479_562;

pub fn invert_linear_float(v: f32) -> f32 {
    (1.0 - v).clamp(0.0, 1.0)
}

/// `1 − ln(255·v + 1) / ln 256`: compresses highlights of the negative,
/// keeping shadow separation in the positive.
pub fn invert_log_float(v: f32) -> f32 {
    let code = (v * 255.0).max(0.0);
    (1.0 - (code + 1.0).ln() / LOG_CODE_DENOM).clamp(0.0, 1.0)
}

pub fn invert_linear(v: u8) -> u8 {
    255 - v
}

pub fn invert_log(v: u8) -> u8 {
    super::to_code(invert_log_float(super::from_code(v)))
}

pub fn apply(v: f32, inversion: &Inversion) -> f32 {
    if !inversion.enabled {
        return v;
    }
    match inversion.mode {
        InversionMode::Linear => invert_linear_float(v),
        InversionMode::Log => invert_log_float(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_endpoints() {
        assert_eq!(invert_linear(0), 255);
        assert_eq!(invert_linear(255), 0);
        assert_eq!(invert_linear(100), 155);
    }

    #[test]
    fn log_endpoints() {
        assert_eq!(invert_log(0), 255);
        assert_eq!(invert_log(255), 0);
    }

    #[test]
    fn log_inversion_sits_below_linear_for_dense_negative_areas() {
        // Dense negative areas (bright scan values) become shadows; log keeps them lower.
        for v in [128_u8, 192, 230] {
            assert!(invert_log(v) < invert_linear(v), "code {}", v);
        }
    }

    #[test]
    fn disabled_inversion_passes_through() {
        let inversion = Inversion {
            enabled: false,
            mode: InversionMode::Log,
        };
        assert_eq!(apply(0.3, &inversion), 0.3);
    }

    #[test]
    fn log_denominator_is_ln_256() {
        assert!((LOG_CODE_DENOM - 256.0_f32.ln()).abs() < 1e-6);
    }
}
