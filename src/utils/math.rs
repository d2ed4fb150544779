//! Numeric helpers shared by the drivers.

use micromath::F32Ext;

/// Affine map of `x` from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// No clamping is applied; callers clamp the input first.
#[inline]
pub fn map_range(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Round to two decimal digits, ties away from zero.
#[inline]
pub fn round2(x: f32) -> f32 {
    F32Ext::round(x * 100.0) / 100.0
}
