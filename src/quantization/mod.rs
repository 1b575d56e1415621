//! Symmetric linear quantization between unit-range floats and int8.
//!
//! Embedding producers store unit-normalized vectors as int8 to cut payload
//! size by 4x; consumers undo the scale at scoring time. The mapping is lossy
//! by design: the worst-case round-trip error for an in-range component is
//! half a quantization step (1/254).

#[cfg(test)]
mod tests;

/// Scale factor mapping [-1.0, 1.0] onto [-127, 127].
pub const QUANTIZATION_SCALE: f32 = 127.0;

/// Quantizes a unit-range float to a signed byte.
///
/// Out-of-range inputs are clamped to [-1.0, 1.0], never wrapped. Rounding is
/// half-away-from-zero (`f32::round`), matching the stored corpus fixtures;
/// switching to half-to-even would change quantized output bit-for-bit.
#[inline]
#[must_use]
pub fn quantize(x: f32) -> i8 {
    (x.clamp(-1.0, 1.0) * QUANTIZATION_SCALE).round() as i8
}

/// Recovers the approximate float value of a quantized component.
#[inline]
#[must_use]
pub fn dequantize(q: i8) -> f32 {
    f32::from(q) / QUANTIZATION_SCALE
}

/// Quantizes a full vector. Producer-side convenience.
#[inline]
#[must_use]
pub fn quantize_vector(values: &[f32]) -> Vec<i8> {
    values.iter().map(|&x| quantize(x)).collect()
}

/// Dequantizes a full vector.
#[inline]
#[must_use]
pub fn dequantize_vector(values: &[i8]) -> Vec<f32> {
    values.iter().map(|&q| dequantize(q)).collect()
}
