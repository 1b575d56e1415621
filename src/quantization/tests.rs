use super::*;

#[test]
fn rounding_is_half_away_from_zero() {
    // 0.5 * 127 = 63.5, which must round up to 64, not down to the even 63.
    assert_eq!(quantize(0.5), 64);
    assert_eq!(quantize(-0.5), -64);
    assert_eq!(quantize(1.0), 127);
    assert_eq!(quantize(-1.0), -127);
    assert_eq!(quantize(0.0), 0);
}

#[test]
fn out_of_range_inputs_clamp() {
    assert_eq!(quantize(1.5), quantize(1.0));
    assert_eq!(quantize(100.0), 127);
    assert_eq!(quantize(-2.0), quantize(-1.0));
    assert_eq!(quantize(f32::INFINITY), 127);
    assert_eq!(quantize(f32::NEG_INFINITY), -127);
}

#[test]
fn dequantize_undoes_scale() {
    assert_eq!(dequantize(127), 1.0);
    assert_eq!(dequantize(-127), -1.0);
    assert_eq!(dequantize(0), 0.0);
    assert!((dequantize(64) - 0.503_937).abs() < 1e-6);
}

#[test]
fn round_trip_error_is_bounded() {
    // Half a quantization step, plus float slack.
    let bound = 1.0 / 254.0 + 1e-6;
    let mut x = -1.0f32;
    while x <= 1.0 {
        let recovered = dequantize(quantize(x));
        assert!(
            (recovered - x).abs() <= bound,
            "round trip error for {x} was {}",
            (recovered - x).abs()
        );
        x += 0.001;
    }
}

#[test]
fn vector_helpers_match_scalar_codec() {
    let values = [0.0, 0.25, -0.75, 1.0, -1.0, 2.0];
    let quantized = quantize_vector(&values);
    assert_eq!(quantized, vec![0, 32, -95, 127, -127, 127]);

    let recovered = dequantize_vector(&quantized);
    for (q, r) in quantized.iter().zip(&recovered) {
        assert_eq!(dequantize(*q), *r);
    }
}
